use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// One month of the archive calendar. Totally ordered by `(year, month)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Self {
        debug_assert!((1..=12).contains(&month));
        Self { year, month }
    }

    /// Two-digit year as it appears in partition file names.
    pub fn short_year(&self) -> i32 {
        self.year.rem_euclid(100)
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// The two series stored in the archive: nodal marginal costs and
/// per-client consumption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DatasetKind {
    Cmg,
    Ivt,
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatasetKind::Cmg => write!(f, "CMg"),
            DatasetKind::Ivt => write!(f, "IVT"),
        }
    }
}

/// Why a partition contributed no rows to a query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SkipReason {
    Missing,
    Unreadable(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Missing => write!(f, "file not found"),
            SkipReason::Unreadable(msg) => write!(f, "{}", msg),
        }
    }
}

/// Ledger entry for a partition that was skipped while walking a range.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedPartition {
    pub kind: DatasetKind,
    pub token: YearMonth,
    pub reason: SkipReason,
}

/// Marginal-cost rows for bars matching a comma-separated pattern.
#[derive(Debug, Clone)]
pub struct CmgQuery {
    /// Base folder; its parent holds the `All_Data` archive.
    pub data_root: PathBuf,
    /// Inclusive start, `"YYYY-MM"`.
    pub date_i: String,
    /// Inclusive end, `"YYYY-MM"`.
    pub date_f: String,
    /// Comma-separated bar name fragments.
    pub barras: String,
}

/// Consumption rows for clients matching a pattern at bars matching another.
#[derive(Debug, Clone)]
pub struct IvtQuery {
    pub data_root: PathBuf,
    pub date_i: String,
    pub date_f: String,
    /// Comma-separated client name fragments.
    pub clientes: String,
    /// Comma-separated bar name fragments; rows must match both.
    pub barra: String,
}

/// The per-client comparison extract: consumption joined with withdrawal-bar
/// and injection-bar marginal costs.
#[derive(Debug, Clone)]
pub struct CombinedQuery {
    pub data_root: PathBuf,
    pub date_i: String,
    pub date_f: String,
    pub cliente: String,
    /// Withdrawal bar serving the client.
    pub barra_retiro: String,
    /// Injection bar whose prices are compared against.
    pub barra_iny: String,
}

/// Distinct bar names matching a pattern.
#[derive(Debug, Clone)]
pub struct BarraLookup {
    pub data_root: PathBuf,
    pub date_i: String,
    pub date_f: String,
    pub barras: String,
}

/// Distinct `(Cliente, Barra)` pairs for clients matching a pattern.
#[derive(Debug, Clone)]
pub struct ClienteLookup {
    pub data_root: PathBuf,
    pub date_i: String,
    pub date_f: String,
    pub clientes: String,
}

/// Distinct clients attached to one exact bar name.
#[derive(Debug, Clone)]
pub struct BarClientsLookup {
    pub data_root: PathBuf,
    pub date_i: String,
    pub date_f: String,
    /// Exact bar name; compared trimmed and upper-cased, not as a substring.
    pub barra: String,
}

/// A client and the bar it draws from.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct ClienteBarra {
    pub cliente: String,
    pub barra: String,
}

impl fmt::Display for ClienteBarra {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Barra: {})", self.cliente, self.barra)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn year_month_orders_by_year_then_month() {
        let a = YearMonth::new(2022, 12);
        let b = YearMonth::new(2023, 1);
        let c = YearMonth::new(2023, 2);
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn year_month_displays_zero_padded() {
        assert_eq!(YearMonth::new(2023, 7).to_string(), "2023-07");
        assert_eq!(YearMonth::new(2023, 11).to_string(), "2023-11");
    }

    #[test]
    fn short_year_is_two_digits() {
        assert_eq!(YearMonth::new(2023, 7).short_year(), 23);
        assert_eq!(YearMonth::new(2005, 1).short_year(), 5);
    }

    #[test]
    fn cliente_barra_display_matches_listing_format() {
        let pair = ClienteBarra {
            cliente: "MINERA ALFA".to_string(),
            barra: "ALFA_220".to_string(),
        };
        assert_eq!(pair.to_string(), "MINERA ALFA (Barra: ALFA_220)");
    }
}
