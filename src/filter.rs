use crate::error::QueryError;
use polars::prelude::*;

/// Compiled entity filter: comma-separated name fragments, trimmed and
/// upper-cased, matched as OR-of-substrings against the target column.
/// `"alfa, beta"` matches any value containing `ALFA` or `BETA`, whatever
/// the value's case — archive data is inconsistently cased.
#[derive(Debug, Clone)]
pub struct EntityPattern {
    fragments: Vec<String>,
}

impl EntityPattern {
    /// Compile a raw comma-separated pattern. An empty or all-blank input is
    /// rejected: matching everything by accident is worse than failing.
    pub fn compile(raw: &str) -> Result<Self, QueryError> {
        let fragments: Vec<String> = raw
            .split(',')
            .map(|fragment| fragment.trim().to_uppercase())
            .filter(|fragment| !fragment.is_empty())
            .collect();
        if fragments.is_empty() {
            return Err(QueryError::EmptyPattern);
        }
        Ok(Self { fragments })
    }

    pub fn fragments(&self) -> &[String] {
        &self.fragments
    }

    /// Substring test against one value, for set-based lookups that never
    /// build a frame.
    pub fn matches(&self, value: &str) -> bool {
        let value = value.to_uppercase();
        self.fragments
            .iter()
            .any(|fragment| value.contains(fragment.as_str()))
    }

    /// Regex alternation of the fragments, each escaped so metacharacters in
    /// entity names match literally.
    fn alternation(&self) -> String {
        self.fragments
            .iter()
            .map(|fragment| regex::escape(fragment))
            .collect::<Vec<_>>()
            .join("|")
    }

    /// Boolean expression selecting rows whose `column` matches the pattern.
    pub fn expr(&self, column: &str) -> Expr {
        col(column)
            .str()
            .to_uppercase()
            .str()
            .contains(lit(self.alternation()), false)
    }

    /// Keep only the rows of `df` whose `column` matches.
    pub fn filter(&self, df: DataFrame, column: &str) -> PolarsResult<DataFrame> {
        df.lazy().filter(self.expr(column)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_pattern_is_rejected() {
        assert!(matches!(
            EntityPattern::compile(""),
            Err(QueryError::EmptyPattern)
        ));
        assert!(matches!(
            EntityPattern::compile(" ,  , "),
            Err(QueryError::EmptyPattern)
        ));
    }

    #[test]
    fn fragments_are_trimmed_and_uppercased() {
        let pattern = EntityPattern::compile(" alfa , Beta ").unwrap();
        assert_eq!(pattern.fragments(), ["ALFA", "BETA"]);
    }

    #[test]
    fn matches_any_fragment_as_substring() {
        let pattern = EntityPattern::compile("alfa, beta").unwrap();
        assert!(pattern.matches("Alfalfa_220"));
        assert!(pattern.matches("beta_110"));
        assert!(pattern.matches("SUBESTACION BETA NORTE"));
        assert!(!pattern.matches("GAMMA_500"));
    }

    #[test]
    fn substring_not_equality() {
        let pattern = EntityPattern::compile("BAR").unwrap();
        assert!(pattern.matches("BARRA_1"));
    }

    #[test]
    fn metacharacters_match_literally() {
        let pattern = EntityPattern::compile("BAR.A").unwrap();
        assert!(pattern.matches("BAR.A_220"));
        assert!(!pattern.matches("BARRA_220"));
    }

    #[test]
    fn filters_frame_rows_case_insensitively() {
        let df = df!(
            "Fecha" => ["2023-01", "2023-01", "2023-01"],
            "Barra" => ["alfa_220", "BETA_110", "GAMMA_500"],
        )
        .unwrap();
        let pattern = EntityPattern::compile("ALFA, beta").unwrap();
        let filtered = pattern.filter(df, "Barra").unwrap();
        assert_eq!(filtered.height(), 2);
    }
}
