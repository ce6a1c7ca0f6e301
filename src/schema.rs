use crate::models::DatasetKind;
use polars::prelude::*;

/// Canonical column names shared by both datasets after normalization.
pub const FECHA: &str = "Fecha";
pub const BARRA: &str = "Barra";
pub const CLIENTE: &str = "Cliente";

/// Marginal-cost value column, brackets already stripped.
pub const CMG_VALUE: &str = "CMg USD/MWh";
pub const CMG_INY: &str = "CMg Iny USD/MWh";
pub const CMG_RETIRO: &str = "CMg Retiro USD/MWh";

/// Column-name reconciliation rules. All drift handling lives here; bump the
/// version when a rule is added so archived reports can state which rules
/// produced them.
pub const COLUMN_RULES_VERSION: u32 = 1;

/// Dataset-specific aliases mapped to their canonical names. The IVT archive
/// stores the bar under `nombre_barra`.
pub const COLUMN_ALIASES: &[(&str, &str)] = &[("nombre_barra", BARRA)];

/// Key columns a partition must carry (post-normalization) to be usable.
pub fn required_columns(kind: DatasetKind) -> &'static [&'static str] {
    match kind {
        DatasetKind::Cmg => &[FECHA, BARRA],
        DatasetKind::Ivt => &[FECHA, CLIENTE, BARRA],
    }
}

/// Canonical form of a raw column name, or `None` when it is already
/// canonical. Alias renames apply first, then bracket stripping: a value
/// column stored as `CMg [USD/MWh]` becomes `CMg USD/MWh`.
pub fn canonical_name(raw: &str) -> Option<String> {
    for (alias, canonical) in COLUMN_ALIASES {
        if raw == *alias {
            return Some((*canonical).to_string());
        }
    }
    if raw.contains('[') || raw.contains(']') {
        let stripped: String = raw.chars().filter(|c| *c != '[' && *c != ']').collect();
        let collapsed = stripped.split_whitespace().collect::<Vec<_>>().join(" ");
        if collapsed != raw {
            return Some(collapsed);
        }
    }
    None
}

/// Rename every drifted column of `df` to its canonical name.
pub fn normalize_columns(df: &mut DataFrame) -> PolarsResult<()> {
    let renames: Vec<(String, String)> = df
        .get_column_names()
        .iter()
        .filter_map(|name| canonical_name(name).map(|new| (name.to_string(), new)))
        .collect();
    for (old, new) in renames {
        df.rename(&old, new.as_str().into())?;
    }
    Ok(())
}

/// First key column `df` is missing for `kind`, if any.
pub fn missing_required(df: &DataFrame, kind: DatasetKind) -> Option<&'static str> {
    let present = df.get_column_names();
    required_columns(kind)
        .iter()
        .find(|required| !present.iter().any(|c| c.as_str() == **required))
        .copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_brackets_and_collapses_whitespace() {
        assert_eq!(
            canonical_name("CMg [USD/MWh]").as_deref(),
            Some("CMg USD/MWh")
        );
        assert_eq!(
            canonical_name("Energia  [kWh]").as_deref(),
            Some("Energia kWh")
        );
    }

    #[test]
    fn renames_known_aliases() {
        assert_eq!(canonical_name("nombre_barra").as_deref(), Some("Barra"));
    }

    #[test]
    fn canonical_names_pass_through() {
        assert_eq!(canonical_name("Fecha"), None);
        assert_eq!(canonical_name("Barra"), None);
        assert_eq!(canonical_name("CMg USD/MWh"), None);
    }

    #[test]
    fn normalizes_a_drifted_frame() {
        let mut df = df!(
            "Fecha" => ["2023-01"],
            "Cliente" => ["MINERA ALFA"],
            "nombre_barra" => ["ALFA_220"],
            "Energia [kWh]" => [120.5],
        )
        .unwrap();
        normalize_columns(&mut df).unwrap();
        let names = df.get_column_names();
        assert_eq!(names, vec!["Fecha", "Cliente", "Barra", "Energia kWh"]);
    }

    #[test]
    fn reports_first_missing_key_column() {
        let df = df!("Fecha" => ["2023-01"], "Barra" => ["ALFA_220"]).unwrap();
        assert_eq!(missing_required(&df, DatasetKind::Cmg), None);
        assert_eq!(missing_required(&df, DatasetKind::Ivt), Some(CLIENTE));
    }
}
