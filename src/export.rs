use crate::models::SkippedPartition;
use crate::schema;
use anyhow::{Context, Result};
use polars::prelude::*;
use serde::Serialize;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Output folder created next to `All_Data`, mirroring the archive layout
/// consumers already expect.
pub const OUTPUT_DIR_NAME: &str = "CarpetaOut";

/// Where one exported result landed.
#[derive(Debug, Clone)]
pub struct ExportPaths {
    pub parquet: PathBuf,
    pub csv: PathBuf,
}

/// What a query did, alongside the files it produced. Serialized next to the
/// exports so a consumer can tell "zero rows" from "months were skipped"
/// without re-running anything.
#[derive(Debug, Serialize)]
pub struct QueryReport<'a> {
    pub rows: usize,
    pub column_rules_version: u32,
    pub skipped: &'a [SkippedPartition],
}

impl<'a> QueryReport<'a> {
    pub fn new(rows: usize, skipped: &'a [SkippedPartition]) -> Self {
        Self {
            rows,
            column_rules_version: schema::COLUMN_RULES_VERSION,
            skipped,
        }
    }
}

/// Materialize a finished frame as parquet and CSV under
/// `root.parent / CarpetaOut / {Parquet,CSV} / {stem}.{ext}`. Rows are
/// sorted by `Fecha` first; stacking order is not chronological when months
/// were skipped, and spreadsheets should read top-to-bottom in time.
pub fn export_frame(df: &DataFrame, data_root: &Path, stem: &str) -> Result<ExportPaths> {
    let parent = data_root
        .parent()
        .with_context(|| format!("data root '{}' has no parent", data_root.display()))?;

    let parquet_dir = parent.join(OUTPUT_DIR_NAME).join("Parquet");
    let csv_dir = parent.join(OUTPUT_DIR_NAME).join("CSV");
    std::fs::create_dir_all(&parquet_dir)
        .with_context(|| format!("cannot create {}", parquet_dir.display()))?;
    std::fs::create_dir_all(&csv_dir)
        .with_context(|| format!("cannot create {}", csv_dir.display()))?;

    let mut sorted = if df.get_column_names().iter().any(|c| c.as_str() == schema::FECHA) {
        df.sort(vec![schema::FECHA], SortMultipleOptions::default())?
    } else {
        df.clone()
    };

    let parquet_path = parquet_dir.join(format!("{}.parquet", stem));
    ParquetWriter::new(
        File::create(&parquet_path)
            .with_context(|| format!("cannot create {}", parquet_path.display()))?,
    )
    .finish(&mut sorted)?;

    let csv_path = csv_dir.join(format!("{}.csv", stem));
    CsvWriter::new(
        File::create(&csv_path).with_context(|| format!("cannot create {}", csv_path.display()))?,
    )
    .finish(&mut sorted)?;

    Ok(ExportPaths {
        parquet: parquet_path,
        csv: csv_path,
    })
}

/// Write the query report as pretty JSON under `CarpetaOut`.
pub fn write_report(report: &QueryReport<'_>, data_root: &Path, stem: &str) -> Result<PathBuf> {
    let parent = data_root
        .parent()
        .with_context(|| format!("data root '{}' has no parent", data_root.display()))?;
    let out_dir = parent.join(OUTPUT_DIR_NAME);
    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("cannot create {}", out_dir.display()))?;

    let path = out_dir.join(format!("{}_report.json", stem));
    let file =
        File::create(&path).with_context(|| format!("cannot create {}", path.display()))?;
    serde_json::to_writer_pretty(file, report)
        .with_context(|| format!("cannot write {}", path.display()))?;
    Ok(path)
}
