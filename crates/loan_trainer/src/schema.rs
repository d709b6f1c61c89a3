//! Schema validation
//!
//! Checked before any transform so a missing column is reported by name
//! rather than surfacing later from inside a derived computation.

use crate::dataset::Table;
use crate::errors::{PipelineError, Result};
use tracing::{debug, error};

/// Return `table` unchanged if every required column is present.
///
/// Header whitespace is ignored. All missing columns are reported together.
pub fn validate_columns<'a, S: AsRef<str>>(table: &'a Table, required: &[S]) -> Result<&'a Table> {
    let missing: Vec<String> = required
        .iter()
        .map(AsRef::as_ref)
        .filter(|column| !table.has_column(column))
        .map(str::to_string)
        .collect();

    if !missing.is_empty() {
        error!(missing = ?missing, "required columns absent");
        return Err(PipelineError::Schema(missing));
    }

    debug!(columns = required.len(), "schema validated");
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Table {
        Table::new(
            vec!["loan_id".into(), " education".into(), " loan_status ".into()],
            vec![],
        )
    }

    #[test]
    fn passes_through_when_complete() {
        let t = table();
        let out = validate_columns(&t, &["loan_id", "education", "loan_status"]).unwrap();
        assert_eq!(out, &t);
    }

    #[test]
    fn names_every_missing_column() {
        let t = table();
        let err = validate_columns(&t, &["loan_id", "cibil_score", "bank_asset_value"]).unwrap_err();
        match err {
            PipelineError::Schema(missing) => {
                assert_eq!(missing, vec!["cibil_score", "bank_asset_value"])
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
