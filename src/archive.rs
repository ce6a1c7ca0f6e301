use crate::error::QueryError;
use crate::models::{DatasetKind, YearMonth};
use crate::partition;
use glob::glob;
use regex::Regex;
use std::path::{Path, PathBuf};

/// One partition actually present on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub kind: DatasetKind,
    pub token: YearMonth,
    pub path: PathBuf,
}

/// Read-only inventory of the partitions under `All_Data`, sorted by kind
/// and month. Files that do not follow either archive naming shape are
/// ignored; populating the directory is the downloader's job, not ours.
pub fn inventory(data_root: &Path) -> Result<Vec<ArchiveEntry>, QueryError> {
    let dir = partition::partition_dir(data_root)?;
    let pattern = dir.join("*.parquet");
    let pattern = pattern
        .to_str()
        .ok_or_else(|| QueryError::ArchiveScan(format!("non-utf8 path {:?}", dir)))?;

    // Archive years are two-digit and the data only exists from 2000 on.
    let cmg_name = Regex::new(r"^CMg_(\d{2})_(\d{2})_def\.parquet$")
        .map_err(|e| QueryError::ArchiveScan(e.to_string()))?;
    let ivt_name = Regex::new(r"^IVT_(\d{2})_(\d{2})\.parquet$")
        .map_err(|e| QueryError::ArchiveScan(e.to_string()))?;

    let mut entries = Vec::new();
    let paths = glob(pattern).map_err(|e| QueryError::ArchiveScan(e.to_string()))?;
    for path in paths.filter_map(Result::ok) {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let parsed = cmg_name
            .captures(name)
            .map(|c| (DatasetKind::Cmg, c))
            .or_else(|| ivt_name.captures(name).map(|c| (DatasetKind::Ivt, c)));
        let Some((kind, captures)) = parsed else {
            continue;
        };
        let Some(token) = token_from_captures(&captures) else {
            continue;
        };
        entries.push(ArchiveEntry { kind, token, path });
    }

    entries.sort_by_key(|entry| (entry.kind != DatasetKind::Cmg, entry.token));
    Ok(entries)
}

fn token_from_captures(captures: &regex::Captures<'_>) -> Option<YearMonth> {
    let year: i32 = captures.get(1)?.as_str().parse().ok()?;
    let month: u32 = captures.get(2)?.as_str().parse().ok()?;
    if !(1..=12).contains(&month) {
        return None;
    }
    Some(YearMonth::new(2000 + year, month))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn lists_both_kinds_and_ignores_strangers() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("All_Data");
        fs::create_dir_all(&archive).unwrap();
        for name in [
            "CMg_23_02_def.parquet",
            "CMg_23_01_def.parquet",
            "IVT_23_01.parquet",
            "CMg_23_01.parquet",
            "IVT_23_13.parquet",
            "notes.txt",
        ] {
            fs::write(archive.join(name), b"x").unwrap();
        }

        let data_root = dir.path().join("BBDD");
        let entries = inventory(&data_root).unwrap();
        let listed: Vec<(DatasetKind, YearMonth)> =
            entries.iter().map(|e| (e.kind, e.token)).collect();
        assert_eq!(
            listed,
            vec![
                (DatasetKind::Cmg, YearMonth::new(2023, 1)),
                (DatasetKind::Cmg, YearMonth::new(2023, 2)),
                (DatasetKind::Ivt, YearMonth::new(2023, 1)),
            ]
        );
    }

    #[test]
    fn missing_archive_directory_lists_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let data_root = dir.path().join("BBDD");
        let entries = inventory(&data_root).unwrap();
        assert!(entries.is_empty());
    }
}
