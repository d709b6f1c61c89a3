//! Feature transformation over a whole table
//!
//! Fits the [`FeatureTransform`] (feature order plus one category mapping per
//! categorical column) from the training table, then encodes every row with
//! it. Row encoding goes through `FeatureTransform::encode_features`, the same
//! code inference uses.

use crate::config::DataConfig;
use crate::dataset::{EncodedDataset, Table};
use crate::errors::{PipelineError, Result};
use loan_model::record::is_null_cell;
use loan_model::{CategoryMapping, FeatureTransform};
use std::collections::BTreeMap;
use tracing::{debug, error, info, warn};

#[derive(Clone, Debug)]
pub struct FeatureTransformer {
    identifier: String,
    target: String,
    categorical: Vec<String>,
    asset_columns: Vec<String>,
    derived_column: String,
}

impl FeatureTransformer {
    pub fn new(config: &DataConfig) -> Self {
        Self {
            identifier: config.identifier.clone(),
            target: config.target.clone(),
            categorical: config.categorical.clone(),
            asset_columns: config.asset_columns.clone(),
            derived_column: config.derived_column.clone(),
        }
    }

    /// Fit the transform on `table` and encode every row
    pub fn fit_transform(&self, table: &Table) -> Result<(EncodedDataset, FeatureTransform)> {
        let mut table = table.clone();

        table.drop_column(&self.identifier).map_err(|e| {
            error!(column = %self.identifier, "identifier column absent");
            e
        })?;
        debug!(column = %self.identifier, "identifier column dropped");

        table.normalize_headers();
        debug!("column names stripped of whitespace");

        let missing: Vec<String> = self
            .asset_columns
            .iter()
            .chain(&self.categorical)
            .chain(std::iter::once(&self.target))
            .filter(|c| !table.has_column(c))
            .cloned()
            .collect();
        if !missing.is_empty() {
            error!(missing = ?missing, "columns needed by the transform are absent");
            return Err(PipelineError::Schema(missing));
        }

        let null_cells = table
            .rows
            .iter()
            .flatten()
            .filter(|cell| is_null_cell(cell))
            .count();
        debug!(null_cells, "missing values in dataset");

        let feature_names: Vec<String> = table
            .headers
            .iter()
            .filter(|h| **h != self.target && !self.asset_columns.contains(h))
            .cloned()
            .chain(std::iter::once(self.derived_column.clone()))
            .collect();
        debug!(
            derived = %self.derived_column,
            sources = ?self.asset_columns,
            "derived column created, source columns dropped"
        );

        let mut mappings = BTreeMap::new();
        for column in &self.categorical {
            let mapping = self.fit_mapping(&table, column)?;
            debug!(column = %column, categories = mapping.len(), "column encoded");
            mappings.insert(column.clone(), mapping);
        }

        let transform = FeatureTransform {
            identifier: self.identifier.clone(),
            target: self.target.clone(),
            asset_columns: self.asset_columns.clone(),
            derived_column: self.derived_column.clone(),
            feature_names,
            mappings,
        };
        transform.validate()?;

        let mut features = Vec::with_capacity(table.len());
        let mut labels = Vec::with_capacity(table.len());
        for idx in 0..table.len() {
            let record = table.record(idx);
            let row = idx + 1;
            let encoded = transform
                .encode_features(&record, row)
                .and_then(|f| Ok((f, transform.encode_target(&record, row)?)))
                .map_err(|e| {
                    let e = PipelineError::from(e);
                    error!(row, error = %e, "row failed to encode");
                    e
                })?;
            features.push(encoded.0);
            labels.push(encoded.1);
        }

        let n_classes = transform.target_mapping()?.len();
        if n_classes < 2 {
            warn!(target = %self.target, n_classes, "target has fewer than two classes");
        }

        info!(
            rows = features.len(),
            features = transform.n_features(),
            classes = n_classes,
            "feature transformation completed"
        );

        let dataset = EncodedDataset {
            feature_names: transform.feature_names.clone(),
            target: self.target.clone(),
            features,
            labels,
        };
        Ok((dataset, transform))
    }

    /// Independent mapping for one column; null cells are rejected
    fn fit_mapping(&self, table: &Table, column: &str) -> Result<CategoryMapping> {
        let values: Vec<&str> = table
            .column_values(column)
            .ok_or_else(|| PipelineError::Schema(vec![column.to_string()]))?
            .collect();

        if let Some(pos) = values.iter().position(|v| is_null_cell(v)) {
            error!(column = %column, row = pos + 1, "null in categorical column");
            return Err(PipelineError::DataQuality {
                column: column.to_string(),
                row: pos + 1,
            });
        }

        Ok(CategoryMapping::fit(column, values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "loan_id, no_of_dependents, education, self_employed, income_annum, loan_amount, loan_term, cibil_score, residential_assets_value, commercial_assets_value, luxury_assets_value, bank_asset_value, loan_status";

    fn table(rows: &[&str]) -> Table {
        let mut csv = String::from(HEADER);
        for row in rows {
            csv.push('\n');
            csv.push_str(row);
        }
        Table::from_reader(csv.as_bytes()).unwrap()
    }

    fn transformer() -> FeatureTransformer {
        FeatureTransformer::new(&DataConfig::default())
    }

    fn sample() -> Table {
        table(&[
            "1, 2, Graduate, No, 9600000, 29900000, 12, 778, 100, 200, 50, 25, Approved",
            "2, 0, Not Graduate, Yes, 4100000, 12200000, 8, 417, 2700000, 2200000, 8800000, 3300000, Rejected",
            "3, 3, Graduate, No, 9100000, 29700000, 20, 506, 7100000, 4500000, 33300000, 12800000, Rejected",
        ])
    }

    #[test]
    fn drops_identifier_and_asset_sources() {
        let (dataset, transform) = transformer().fit_transform(&sample()).unwrap();

        assert_eq!(
            dataset.feature_names,
            vec![
                "no_of_dependents",
                "education",
                "self_employed",
                "income_annum",
                "loan_amount",
                "loan_term",
                "cibil_score",
                "Assets"
            ]
        );
        assert!(!dataset.feature_names.iter().any(|n| n == "loan_id"));
        assert_eq!(transform.mappings.len(), 3);
        assert_eq!(dataset.len(), 3);
    }

    #[test]
    fn assets_is_exact_sum() {
        let (dataset, _) = transformer().fit_transform(&sample()).unwrap();
        let assets = dataset.column("Assets").unwrap();
        assert_eq!(assets, vec![375.0, 17_000_000.0, 57_700_000.0]);
    }

    #[test]
    fn categorical_codes_are_independent_per_column() {
        let (dataset, transform) = transformer().fit_transform(&sample()).unwrap();

        assert_eq!(dataset.column("education").unwrap(), vec![0.0, 1.0, 0.0]);
        assert_eq!(dataset.column("self_employed").unwrap(), vec![0.0, 1.0, 0.0]);
        assert_eq!(dataset.labels, vec![0, 1, 1]);
        assert_eq!(transform.mapping("self_employed").unwrap().values, vec!["No", "Yes"]);
        assert_eq!(transform.decode_target(1).unwrap(), "Rejected");
    }

    #[test]
    fn missing_identifier_is_schema_error() {
        let t = Table::from_reader("education,loan_status\nGraduate,Approved\n".as_bytes()).unwrap();
        assert!(matches!(
            transformer().fit_transform(&t),
            Err(PipelineError::Schema(cols)) if cols == vec!["loan_id".to_string()]
        ));
    }

    #[test]
    fn null_asset_is_data_quality_error() {
        let t = table(&[
            "1, 2, Graduate, No, 9600000, 29900000, 12, 778, 100, 200, 50, 25, Approved",
            "2, 0, Not Graduate, Yes, 4100000, 12200000, 8, 417, 2700000, , 8800000, 3300000, Rejected",
        ]);
        match transformer().fit_transform(&t) {
            Err(PipelineError::DataQuality { column, row }) => {
                assert_eq!(column, "commercial_assets_value");
                assert_eq!(row, 2);
            }
            other => panic!("expected data quality error, got {other:?}"),
        }
    }

    #[test]
    fn null_category_is_data_quality_error() {
        let t = table(&["1, 2, , No, 9600000, 29900000, 12, 778, 100, 200, 50, 25, Approved"]);
        assert!(matches!(
            transformer().fit_transform(&t),
            Err(PipelineError::DataQuality { ref column, row: 1 }) if column == "education"
        ));
    }

    #[test]
    fn non_numeric_cell_is_parse_error() {
        let t = table(&["1, two, Graduate, No, 9600000, 29900000, 12, 778, 100, 200, 50, 25, Approved"]);
        assert!(matches!(
            transformer().fit_transform(&t),
            Err(PipelineError::Parse(_))
        ));
    }
}
