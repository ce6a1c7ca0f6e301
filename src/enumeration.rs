use crate::date_range::DateRange;
use crate::error::QueryError;
use crate::filter::EntityPattern;
use crate::models::{
    BarClientsLookup, BarraLookup, ClienteBarra, ClienteLookup, DatasetKind, SkipReason,
    SkippedPartition, YearMonth,
};
use crate::partition::{self, LoadOutcome};
use crate::schema;
use log::warn;
use polars::prelude::*;
use std::collections::BTreeSet;

/// Ordered distinct values plus the skip ledger of the walk that produced
/// them.
#[derive(Debug)]
pub struct DistinctValues {
    pub values: Vec<String>,
    pub skipped: Vec<SkippedPartition>,
}

/// Ordered distinct `(Cliente, Barra)` pairs plus the walk's skip ledger.
#[derive(Debug)]
pub struct DistinctPairs {
    pub pairs: Vec<ClienteBarra>,
    pub skipped: Vec<SkippedPartition>,
}

/// Distinct bar names in the marginal-cost archive matching the pattern.
/// Only the name column is retained per partition; full rows are never
/// materialized for an enumeration.
pub fn list_barras(lookup: &BarraLookup) -> Result<DistinctValues, QueryError> {
    let range = DateRange::parse(&lookup.date_i, &lookup.date_f)?;
    let pattern = EntityPattern::compile(&lookup.barras)?;
    let dir = partition::partition_dir(&lookup.data_root)?;

    let mut found = BTreeSet::new();
    let mut skipped = Vec::new();
    for (token, outcome) in partition::scan_range(DatasetKind::Cmg, &range, &dir) {
        let Some(df) = unwrap_loaded(DatasetKind::Cmg, token, outcome, &mut skipped) else {
            continue;
        };
        if let Err(e) = collect_matching(&df, schema::BARRA, &pattern, &mut found) {
            record_unreadable(DatasetKind::Cmg, token, &e, &mut skipped);
        }
    }

    Ok(DistinctValues {
        values: found.into_iter().collect(),
        skipped,
    })
}

/// Distinct `(Cliente, Barra)` pairs in the consumption archive whose client
/// name matches the pattern. A matching row with a null bar is kept under
/// the `"Sin Barra"` placeholder rather than dropped.
pub fn list_clientes(lookup: &ClienteLookup) -> Result<DistinctPairs, QueryError> {
    let range = DateRange::parse(&lookup.date_i, &lookup.date_f)?;
    let pattern = EntityPattern::compile(&lookup.clientes)?;
    let dir = partition::partition_dir(&lookup.data_root)?;

    let mut found = BTreeSet::new();
    let mut skipped = Vec::new();
    for (token, outcome) in partition::scan_range(DatasetKind::Ivt, &range, &dir) {
        let Some(df) = unwrap_loaded(DatasetKind::Ivt, token, outcome, &mut skipped) else {
            continue;
        };
        if let Err(e) = collect_pairs(&df, &pattern, &mut found) {
            record_unreadable(DatasetKind::Ivt, token, &e, &mut skipped);
        }
    }

    Ok(DistinctPairs {
        pairs: found.into_iter().collect(),
        skipped,
    })
}

/// Distinct clients drawing from one exact bar. The bar comparison is
/// trimmed, upper-cased equality, not a substring test: this lookup answers
/// "who is on this bar", not "who is on bars like this".
pub fn clientes_for_barra(lookup: &BarClientsLookup) -> Result<DistinctValues, QueryError> {
    let range = DateRange::parse(&lookup.date_i, &lookup.date_f)?;
    let wanted = lookup.barra.trim().to_uppercase();
    if wanted.is_empty() {
        return Err(QueryError::EmptyPattern);
    }
    let dir = partition::partition_dir(&lookup.data_root)?;

    let mut found = BTreeSet::new();
    let mut skipped = Vec::new();
    for (token, outcome) in partition::scan_range(DatasetKind::Ivt, &range, &dir) {
        let Some(df) = unwrap_loaded(DatasetKind::Ivt, token, outcome, &mut skipped) else {
            continue;
        };
        if let Err(e) = collect_clients_at_bar(&df, &wanted, &mut found) {
            record_unreadable(DatasetKind::Ivt, token, &e, &mut skipped);
        }
    }

    Ok(DistinctValues {
        values: found.into_iter().collect(),
        skipped,
    })
}

fn unwrap_loaded(
    kind: DatasetKind,
    token: YearMonth,
    outcome: LoadOutcome,
    skipped: &mut Vec<SkippedPartition>,
) -> Option<DataFrame> {
    match outcome {
        LoadOutcome::Loaded(df) => Some(df),
        LoadOutcome::Absent => {
            skipped.push(SkippedPartition {
                kind,
                token,
                reason: SkipReason::Missing,
            });
            None
        }
        LoadOutcome::Failed(reason) => {
            skipped.push(SkippedPartition {
                kind,
                token,
                reason: SkipReason::Unreadable(reason),
            });
            None
        }
    }
}

fn record_unreadable(
    kind: DatasetKind,
    token: YearMonth,
    error: &PolarsError,
    skipped: &mut Vec<SkippedPartition>,
) {
    warn!("cannot enumerate {} {}: {}", kind, token, error);
    skipped.push(SkippedPartition {
        kind,
        token,
        reason: SkipReason::Unreadable(error.to_string()),
    });
}

fn collect_matching(
    df: &DataFrame,
    column: &str,
    pattern: &EntityPattern,
    out: &mut BTreeSet<String>,
) -> PolarsResult<()> {
    let values = df.column(column)?.str()?;
    for value in values.into_iter().flatten() {
        if pattern.matches(value) {
            out.insert(value.to_string());
        }
    }
    Ok(())
}

fn collect_pairs(
    df: &DataFrame,
    pattern: &EntityPattern,
    out: &mut BTreeSet<ClienteBarra>,
) -> PolarsResult<()> {
    let clientes = df.column(schema::CLIENTE)?.str()?;
    let barras = df.column(schema::BARRA)?.str()?;
    for idx in 0..df.height() {
        let Some(cliente) = clientes.get(idx) else {
            continue;
        };
        if !pattern.matches(cliente) {
            continue;
        }
        let barra = barras.get(idx).unwrap_or("Sin Barra");
        out.insert(ClienteBarra {
            cliente: cliente.to_string(),
            barra: barra.to_string(),
        });
    }
    Ok(())
}

fn collect_clients_at_bar(
    df: &DataFrame,
    wanted: &str,
    out: &mut BTreeSet<String>,
) -> PolarsResult<()> {
    let clientes = df.column(schema::CLIENTE)?.str()?;
    let barras = df.column(schema::BARRA)?.str()?;
    for idx in 0..df.height() {
        let Some(barra) = barras.get(idx) else {
            continue;
        };
        if barra.trim().to_uppercase() != wanted {
            continue;
        }
        if let Some(cliente) = clientes.get(idx) {
            out.insert(cliente.to_string());
        }
    }
    Ok(())
}
