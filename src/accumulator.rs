use crate::date_range::DateRange;
use crate::error::QueryError;
use crate::filter::EntityPattern;
use crate::models::{CmgQuery, DatasetKind, IvtQuery, SkipReason, SkippedPartition};
use crate::partition::{self, LoadOutcome};
use crate::schema;
use log::warn;
use polars::prelude::*;
use std::path::Path;

/// Row-level outcome of a range query. `Empty` covers both "every partition
/// was skipped" and "partitions loaded but nothing matched" — callers render
/// it as "no matches", never as a failure.
#[derive(Debug)]
pub enum SeriesRows {
    Rows(DataFrame),
    Empty,
}

/// A stacked result table plus the ledger of partitions that contributed
/// nothing and why.
#[derive(Debug)]
pub struct SeriesResult {
    pub rows: SeriesRows,
    pub skipped: Vec<SkippedPartition>,
}

impl SeriesResult {
    pub fn frame(&self) -> Option<&DataFrame> {
        match &self.rows {
            SeriesRows::Rows(df) => Some(df),
            SeriesRows::Empty => None,
        }
    }

    pub fn into_frame(self) -> Option<DataFrame> {
        match self.rows {
            SeriesRows::Rows(df) => Some(df),
            SeriesRows::Empty => None,
        }
    }

    pub fn row_count(&self) -> usize {
        self.frame().map_or(0, DataFrame::height)
    }
}

/// Marginal-cost rows for every bar matching the query pattern, stacked
/// across the requested months.
pub fn fetch_cmg(query: &CmgQuery) -> Result<SeriesResult, QueryError> {
    let range = DateRange::parse(&query.date_i, &query.date_f)?;
    let pattern = EntityPattern::compile(&query.barras)?;
    let dir = partition::partition_dir(&query.data_root)?;
    stack_range(DatasetKind::Cmg, &range, &dir, |df| {
        pattern.filter(df, schema::BARRA)
    })
}

/// Consumption rows for clients matching one pattern at bars matching
/// another; a row must satisfy both.
pub fn fetch_ivt(query: &IvtQuery) -> Result<SeriesResult, QueryError> {
    let range = DateRange::parse(&query.date_i, &query.date_f)?;
    let clientes = EntityPattern::compile(&query.clientes)?;
    let barras = EntityPattern::compile(&query.barra)?;
    let dir = partition::partition_dir(&query.data_root)?;
    stack_range(DatasetKind::Ivt, &range, &dir, |df| {
        df.lazy()
            .filter(clientes.expr(schema::CLIENTE).and(barras.expr(schema::BARRA)))
            .collect()
    })
}

/// Walk the range in ascending order, filter each loaded partition and fold
/// the survivors into one frame. Absent, unreadable and post-normalization
/// mismatched partitions become skip entries; they never abort the walk.
fn stack_range<F>(
    kind: DatasetKind,
    range: &DateRange,
    dir: &Path,
    filter: F,
) -> Result<SeriesResult, QueryError>
where
    F: Fn(DataFrame) -> PolarsResult<DataFrame>,
{
    let mut skipped = Vec::new();
    let mut accumulated: Option<DataFrame> = None;

    for (token, outcome) in partition::scan_range(kind, range, dir) {
        let df = match outcome {
            LoadOutcome::Loaded(df) => df,
            LoadOutcome::Absent => {
                skipped.push(SkippedPartition {
                    kind,
                    token,
                    reason: SkipReason::Missing,
                });
                continue;
            }
            LoadOutcome::Failed(reason) => {
                skipped.push(SkippedPartition {
                    kind,
                    token,
                    reason: SkipReason::Unreadable(reason),
                });
                continue;
            }
        };

        let filtered = match filter(df) {
            Ok(filtered) => filtered,
            Err(e) => {
                warn!("filter failed for {} {}: {}", kind, token, e);
                skipped.push(SkippedPartition {
                    kind,
                    token,
                    reason: SkipReason::Unreadable(format!("filter failed: {}", e)),
                });
                continue;
            }
        };

        accumulated = Some(match accumulated.take() {
            None => filtered,
            Some(acc) => match stack(&acc, filtered) {
                Ok(stacked) => stacked,
                Err(reason) => {
                    warn!("cannot stack {} {}: {}", kind, token, reason);
                    skipped.push(SkippedPartition {
                        kind,
                        token,
                        reason: SkipReason::Unreadable(reason),
                    });
                    acc
                }
            },
        });
    }

    let rows = match accumulated {
        Some(df) if df.height() > 0 => SeriesRows::Rows(df),
        _ => SeriesRows::Empty,
    };
    Ok(SeriesResult { rows, skipped })
}

/// Vertically concatenate one filtered partition onto the accumulated frame.
/// Column sets must agree after normalization; order may differ and is
/// reconciled here.
fn stack(acc: &DataFrame, part: DataFrame) -> Result<DataFrame, String> {
    let acc_cols = acc.get_column_names();
    let mut acc_sorted = acc_cols.clone();
    acc_sorted.sort_unstable();
    let mut part_sorted = part.get_column_names();
    part_sorted.sort_unstable();
    if acc_sorted != part_sorted {
        return Err(format!(
            "column set {:?} does not match accumulated {:?}",
            part_sorted, acc_sorted
        ));
    }

    let part = part
        .select(acc_cols.iter().map(|c| (*c).clone()))
        .map_err(|e| e.to_string())?;
    acc.vstack(&part).map_err(|e| e.to_string())
}
