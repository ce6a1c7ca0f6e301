use crate::accumulator::{fetch_cmg, fetch_ivt};
use crate::error::QueryError;
use crate::models::{CmgQuery, CombinedQuery, IvtQuery, SkippedPartition};
use crate::schema;
use log::warn;
use polars::prelude::*;
use serde::Serialize;

/// Join keys shared by the two datasets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKeys {
    /// Month key only. Both sides may keep their own bar columns.
    Date,
    /// Month and bar, for the per-client comparison where consumption and
    /// withdrawal prices sit on the same bar.
    DateAndBar,
}

impl JoinKeys {
    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            JoinKeys::Date => &[schema::FECHA],
            JoinKeys::DateAndBar => &[schema::FECHA, schema::BARRA],
        }
    }
}

/// Which input of a join carried no rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum JoinSide {
    Prices,
    Consumption,
}

/// Outcome of a dataset join. An empty input is an explicit signal, not an
/// error and not an identity join against nothing.
#[derive(Debug)]
pub enum JoinOutcome {
    Joined(DataFrame),
    EmptyInput(JoinSide),
}

/// Role a marginal-cost table plays in a combined extract; decides the label
/// its value column gets so the two price series stay distinguishable after
/// joining.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceRole {
    Injection,
    Withdrawal,
}

impl PriceRole {
    pub fn column_label(&self) -> &'static str {
        match self {
            PriceRole::Injection => schema::CMG_INY,
            PriceRole::Withdrawal => schema::CMG_RETIRO,
        }
    }
}

/// Rename the canonical marginal-cost value column to its role label, if
/// present. Partitions without the value column are left untouched.
pub fn label_price_column(df: &mut DataFrame, role: PriceRole) -> Result<(), QueryError> {
    if df.get_column_names().iter().any(|c| c.as_str() == schema::CMG_VALUE) {
        df.rename(schema::CMG_VALUE, role.column_label().into())?;
    }
    Ok(())
}

/// Inner-join consumption rows with marginal-cost rows on the shared keys.
/// Rows lacking either side are dropped: an observation without both a
/// price and a consumption value is unusable downstream, and must not
/// surface as a partially-null row. Non-key columns present on both sides
/// keep the left value and get a `_right` twin for the price side.
pub fn join_price_consumption(
    prices: &DataFrame,
    consumption: &DataFrame,
    keys: JoinKeys,
) -> Result<JoinOutcome, QueryError> {
    if prices.height() == 0 {
        return Ok(JoinOutcome::EmptyInput(JoinSide::Prices));
    }
    if consumption.height() == 0 {
        return Ok(JoinOutcome::EmptyInput(JoinSide::Consumption));
    }
    let on = keys.columns().to_vec();
    let joined = consumption.join(prices, on.clone(), on, JoinArgs::new(JoinType::Inner))?;
    Ok(JoinOutcome::Joined(joined))
}

/// Combined extract plus the union of the three per-range skip ledgers.
#[derive(Debug)]
pub struct CombinedResult {
    pub outcome: JoinOutcome,
    pub skipped: Vec<SkippedPartition>,
}

/// The per-client comparison extract: consumption for one client at its
/// withdrawal bar, joined with withdrawal-bar prices on `(Fecha, Barra)`,
/// then with injection-bar prices on `Fecha`. The injection side's bar
/// column is relabelled `Barra Iny` so the combined table keeps both node
/// identities.
pub fn combined_extract(query: &CombinedQuery) -> Result<CombinedResult, QueryError> {
    let consumption = fetch_ivt(&IvtQuery {
        data_root: query.data_root.clone(),
        date_i: query.date_i.clone(),
        date_f: query.date_f.clone(),
        clientes: query.cliente.clone(),
        barra: query.barra_retiro.clone(),
    })?;

    let withdrawal = fetch_cmg(&CmgQuery {
        data_root: query.data_root.clone(),
        date_i: query.date_i.clone(),
        date_f: query.date_f.clone(),
        barras: query.barra_retiro.clone(),
    })?;

    let injection = fetch_cmg(&CmgQuery {
        data_root: query.data_root.clone(),
        date_i: query.date_i.clone(),
        date_f: query.date_f.clone(),
        barras: query.barra_iny.clone(),
    })?;

    let mut skipped = consumption.skipped.clone();
    skipped.extend(withdrawal.skipped.clone());
    skipped.extend(injection.skipped.clone());

    let Some(consumption_df) = consumption.into_frame() else {
        warn!("no consumption rows for client '{}'", query.cliente);
        return Ok(CombinedResult {
            outcome: JoinOutcome::EmptyInput(JoinSide::Consumption),
            skipped,
        });
    };
    let Some(mut withdrawal_df) = withdrawal.into_frame() else {
        warn!(
            "no marginal-cost rows for withdrawal bar '{}'",
            query.barra_retiro
        );
        return Ok(CombinedResult {
            outcome: JoinOutcome::EmptyInput(JoinSide::Prices),
            skipped,
        });
    };
    let Some(mut injection_df) = injection.into_frame() else {
        warn!(
            "no marginal-cost rows for injection bar '{}'",
            query.barra_iny
        );
        return Ok(CombinedResult {
            outcome: JoinOutcome::EmptyInput(JoinSide::Prices),
            skipped,
        });
    };

    label_price_column(&mut withdrawal_df, PriceRole::Withdrawal)?;
    label_price_column(&mut injection_df, PriceRole::Injection)?;
    injection_df.rename(schema::BARRA, "Barra Iny".into())?;

    let with_withdrawal =
        match join_price_consumption(&withdrawal_df, &consumption_df, JoinKeys::DateAndBar)? {
            JoinOutcome::Joined(df) => df,
            outcome @ JoinOutcome::EmptyInput(_) => {
                return Ok(CombinedResult { outcome, skipped })
            }
        };

    let outcome = join_price_consumption(&injection_df, &with_withdrawal, JoinKeys::Date)?;
    Ok(CombinedResult { outcome, skipped })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn price_frame(rows: &[(&str, &str, f64)]) -> DataFrame {
        let fechas: Vec<&str> = rows.iter().map(|r| r.0).collect();
        let barras: Vec<&str> = rows.iter().map(|r| r.1).collect();
        let values: Vec<f64> = rows.iter().map(|r| r.2).collect();
        df!(
            schema::FECHA => fechas,
            schema::BARRA => barras,
            schema::CMG_VALUE => values,
        )
        .unwrap()
    }

    fn consumption_frame(rows: &[(&str, &str, &str, f64)]) -> DataFrame {
        let fechas: Vec<&str> = rows.iter().map(|r| r.0).collect();
        let clientes: Vec<&str> = rows.iter().map(|r| r.1).collect();
        let barras: Vec<&str> = rows.iter().map(|r| r.2).collect();
        let values: Vec<f64> = rows.iter().map(|r| r.3).collect();
        df!(
            schema::FECHA => fechas,
            schema::CLIENTE => clientes,
            schema::BARRA => barras,
            "Energia kWh" => values,
        )
        .unwrap()
    }

    #[test]
    fn inner_join_keeps_only_shared_keys() {
        // 10 price rows and 10 consumption rows, 7 sharing (Fecha, Barra)
        let mut price_rows = Vec::new();
        let mut consumption_rows = Vec::new();
        for i in 0..7 {
            let fecha = format!("2023-{:02}", i + 1);
            price_rows.push((fecha.clone(), "ALFA_220".to_string(), 40.0 + i as f64));
            consumption_rows.push((
                fecha,
                "MINERA ALFA".to_string(),
                "ALFA_220".to_string(),
                100.0 + i as f64,
            ));
        }
        for i in 0..3 {
            let fecha = format!("2023-{:02}", i + 8);
            price_rows.push((fecha.clone(), "SOLO_PRECIO".to_string(), 50.0));
            consumption_rows.push((
                fecha,
                "MINERA ALFA".to_string(),
                "SOLO_CONSUMO".to_string(),
                200.0,
            ));
        }

        let prices = price_frame(
            &price_rows
                .iter()
                .map(|r| (r.0.as_str(), r.1.as_str(), r.2))
                .collect::<Vec<_>>(),
        );
        let consumption = consumption_frame(
            &consumption_rows
                .iter()
                .map(|r| (r.0.as_str(), r.1.as_str(), r.2.as_str(), r.3))
                .collect::<Vec<_>>(),
        );
        assert_eq!(prices.height(), 10);
        assert_eq!(consumption.height(), 10);

        match join_price_consumption(&prices, &consumption, JoinKeys::DateAndBar).unwrap() {
            JoinOutcome::Joined(df) => {
                assert_eq!(df.height(), 7);
                assert!(df
                    .get_column_names()
                    .iter()
                    .any(|c| c.as_str() == schema::CMG_VALUE));
                assert!(df
                    .get_column_names()
                    .iter()
                    .any(|c| c.as_str() == "Energia kWh"));
            }
            other => panic!("expected Joined, got {:?}", other),
        }
    }

    #[test]
    fn join_keys_are_deduplicated_in_output() {
        let prices = price_frame(&[("2023-01", "ALFA_220", 41.2)]);
        let consumption = consumption_frame(&[("2023-01", "MINERA ALFA", "ALFA_220", 120.5)]);
        match join_price_consumption(&prices, &consumption, JoinKeys::DateAndBar).unwrap() {
            JoinOutcome::Joined(df) => {
                let names = df.get_column_names();
                assert_eq!(names.iter().filter(|&&n| n == schema::FECHA).count(), 1);
                assert_eq!(names.iter().filter(|&&n| n == schema::BARRA).count(), 1);
            }
            other => panic!("expected Joined, got {:?}", other),
        }
    }

    #[test]
    fn empty_sides_short_circuit() {
        let prices = price_frame(&[("2023-01", "ALFA_220", 41.2)]);
        let consumption = consumption_frame(&[("2023-01", "MINERA ALFA", "ALFA_220", 120.5)]);
        let empty_prices = price_frame(&[]);
        let empty_consumption = consumption_frame(&[]);

        assert!(matches!(
            join_price_consumption(&empty_prices, &consumption, JoinKeys::Date).unwrap(),
            JoinOutcome::EmptyInput(JoinSide::Prices)
        ));
        assert!(matches!(
            join_price_consumption(&prices, &empty_consumption, JoinKeys::Date).unwrap(),
            JoinOutcome::EmptyInput(JoinSide::Consumption)
        ));
    }

    #[test]
    fn price_roles_relabel_the_value_column() {
        let mut df = price_frame(&[("2023-01", "ALFA_220", 41.2)]);
        label_price_column(&mut df, PriceRole::Withdrawal).unwrap();
        assert!(df
            .get_column_names()
            .iter()
            .any(|c| c.as_str() == schema::CMG_RETIRO));

        let mut df = price_frame(&[("2023-01", "INY_500", 38.9)]);
        label_price_column(&mut df, PriceRole::Injection).unwrap();
        assert!(df
            .get_column_names()
            .iter()
            .any(|c| c.as_str() == schema::CMG_INY));
    }
}
