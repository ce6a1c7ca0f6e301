use crate::date_range::DateRange;
use crate::error::QueryError;
use crate::models::{DatasetKind, YearMonth};
use crate::schema;
use log::warn;
use polars::prelude::*;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Sibling folder of the data root that holds every monthly partition.
pub const ARCHIVE_DIR_NAME: &str = "All_Data";

/// Result of attempting to read one monthly partition. Absence and
/// corruption are ordinary outcomes the caller records and moves past,
/// never reasons to abort a range walk.
#[derive(Debug)]
pub enum LoadOutcome {
    Loaded(DataFrame),
    Absent,
    Failed(String),
}

/// Exact archive file name for a `(kind, token)` pair. The shapes are fixed
/// by the existing archives and must not change:
/// `CMg_{yy}_{mm}_def.parquet` and `IVT_{yy}_{mm}.parquet`.
pub fn partition_file_name(kind: DatasetKind, token: YearMonth) -> String {
    match kind {
        DatasetKind::Cmg => format!(
            "CMg_{:02}_{:02}_def.parquet",
            token.short_year(),
            token.month
        ),
        DatasetKind::Ivt => {
            format!("IVT_{:02}_{:02}.parquet", token.short_year(), token.month)
        }
    }
}

/// The archive directory for a data root: `root.parent / All_Data`. The
/// indirection through the parent is part of the on-disk contract.
pub fn partition_dir(data_root: &Path) -> Result<PathBuf, QueryError> {
    let parent = data_root
        .parent()
        .ok_or_else(|| QueryError::BadDataRoot(data_root.to_path_buf()))?;
    Ok(parent.join(ARCHIVE_DIR_NAME))
}

/// Full path of one partition. Pure computation, no I/O.
pub fn partition_path(
    kind: DatasetKind,
    token: YearMonth,
    data_root: &Path,
) -> Result<PathBuf, QueryError> {
    Ok(partition_dir(data_root)?.join(partition_file_name(kind, token)))
}

/// Read one partition eagerly. The file handle is opened, fully consumed and
/// closed before this returns, so a range walk never holds two partitions
/// open. The loaded frame comes back with drifted column names already
/// normalized and its key columns verified.
pub fn load_partition(path: &Path, kind: DatasetKind) -> LoadOutcome {
    if !path.exists() {
        warn!("partition not found: {}", path.display());
        return LoadOutcome::Absent;
    }

    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) => {
            warn!("cannot open {}: {}", path.display(), e);
            return LoadOutcome::Failed(e.to_string());
        }
    };

    let mut df = match ParquetReader::new(file).finish() {
        Ok(df) => df,
        Err(e) => {
            warn!("cannot read {}: {}", path.display(), e);
            return LoadOutcome::Failed(e.to_string());
        }
    };

    if let Err(e) = schema::normalize_columns(&mut df) {
        warn!("cannot normalize {}: {}", path.display(), e);
        return LoadOutcome::Failed(e.to_string());
    }

    if let Some(column) = schema::missing_required(&df, kind) {
        let reason = format!("missing required column '{}'", column);
        warn!("{}: {}", path.display(), reason);
        return LoadOutcome::Failed(reason);
    }

    LoadOutcome::Loaded(df)
}

/// Walk a range one partition at a time, in ascending token order. Lazy:
/// each token's file is opened only when the iterator is advanced, which
/// gives callers a natural cancellation boundary between months.
pub fn scan_range<'a>(
    kind: DatasetKind,
    range: &DateRange,
    dir: &'a Path,
) -> impl Iterator<Item = (YearMonth, LoadOutcome)> + 'a {
    range.months().map(move |token| {
        let path = dir.join(partition_file_name(kind, token));
        log::debug!("reading {}", path.display());
        (token, load_partition(&path, kind))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn cmg_file_name_matches_archive_convention() {
        let name = partition_file_name(DatasetKind::Cmg, YearMonth::new(2023, 7));
        assert_eq!(name, "CMg_23_07_def.parquet");
    }

    #[test]
    fn ivt_file_name_matches_archive_convention() {
        let name = partition_file_name(DatasetKind::Ivt, YearMonth::new(2020, 1));
        assert_eq!(name, "IVT_20_01.parquet");
    }

    #[test]
    fn early_century_years_keep_two_digits() {
        let name = partition_file_name(DatasetKind::Cmg, YearMonth::new(2005, 12));
        assert_eq!(name, "CMg_05_12_def.parquet");
    }

    #[test]
    fn partition_lives_under_sibling_all_data() {
        let path = partition_path(
            DatasetKind::Cmg,
            YearMonth::new(2023, 7),
            Path::new("/data/BBDD"),
        )
        .unwrap();
        assert_eq!(path, Path::new("/data/All_Data/CMg_23_07_def.parquet"));
    }

    #[test]
    fn rootless_path_is_rejected() {
        let err = partition_dir(Path::new("/")).unwrap_err();
        assert!(matches!(err, QueryError::BadDataRoot(_)));
    }

    #[test]
    fn absent_file_is_reported_not_raised() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("CMg_23_01_def.parquet");
        assert!(matches!(
            load_partition(&path, DatasetKind::Cmg),
            LoadOutcome::Absent
        ));
    }

    #[test]
    fn garbage_file_fails_with_reason() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("CMg_23_01_def.parquet");
        let mut file = File::create(&path).unwrap();
        file.write_all(b"not a parquet file").unwrap();
        drop(file);
        match load_partition(&path, DatasetKind::Cmg) {
            LoadOutcome::Failed(reason) => assert!(!reason.is_empty()),
            other => panic!("expected Failed, got {:?}", other),
        }
    }

    #[test]
    fn loaded_partition_is_normalized_and_validated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("IVT_23_01.parquet");
        let mut df = df!(
            "Fecha" => ["2023-01"],
            "Cliente" => ["MINERA ALFA"],
            "nombre_barra" => ["ALFA_220"],
            "Energia [kWh]" => [120.5],
        )
        .unwrap();
        ParquetWriter::new(File::create(&path).unwrap())
            .finish(&mut df)
            .unwrap();

        match load_partition(&path, DatasetKind::Ivt) {
            LoadOutcome::Loaded(loaded) => {
                assert!(loaded.get_column_names().iter().any(|c| c.as_str() == "Barra"));
                assert!(loaded
                    .get_column_names()
                    .iter()
                    .any(|c| c.as_str() == "Energia kWh"));
            }
            other => panic!("expected Loaded, got {:?}", other),
        }
    }

    #[test]
    fn partition_without_key_columns_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("CMg_23_01_def.parquet");
        let mut df = df!("Fecha" => ["2023-01"], "CMg [USD/MWh]" => [41.2]).unwrap();
        ParquetWriter::new(File::create(&path).unwrap())
            .finish(&mut df)
            .unwrap();

        match load_partition(&path, DatasetKind::Cmg) {
            LoadOutcome::Failed(reason) => assert!(reason.contains("Barra")),
            other => panic!("expected Failed, got {:?}", other),
        }
    }
}
