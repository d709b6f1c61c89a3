//! CSV dataset loading
//!
//! `Table` holds the raw source file (header row plus untrimmed cells);
//! `EncodedDataset` is the numeric form the split, scaler and trainer work on.

use crate::errors::{PipelineError, Result};
use loan_model::RawRecord;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read};
use std::path::Path;
use tracing::debug;

/// Raw tabular dataset
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    /// Load a CSV file with a header row
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => PipelineError::NotFound(path.to_path_buf()),
            _ => PipelineError::Parse(format!("cannot open {}: {e}", path.display())),
        })?;

        let table = Self::from_reader(BufReader::new(file))?;
        debug!(
            path = %path.display(),
            rows = table.len(),
            columns = table.headers.len(),
            "csv loaded"
        );
        Ok(table)
    }

    /// Parse CSV from any reader. Rows with a different cell count than the
    /// header are rejected.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::None)
            .from_reader(reader);

        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        if headers.is_empty() || headers.iter().all(|h| h.trim().is_empty()) {
            return Err(PipelineError::Parse("missing header row".into()));
        }

        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        Ok(Self { headers, rows })
    }

    /// Number of data rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of a column, ignoring surrounding whitespace in the header
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h.trim() == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Remove a column from the header and every row
    pub fn drop_column(&mut self, name: &str) -> Result<()> {
        let idx = self
            .column_index(name)
            .ok_or_else(|| PipelineError::Schema(vec![name.to_string()]))?;
        self.headers.remove(idx);
        for row in &mut self.rows {
            if idx < row.len() {
                row.remove(idx);
            }
        }
        Ok(())
    }

    /// Trim whitespace from every header
    pub fn normalize_headers(&mut self) {
        for header in &mut self.headers {
            let trimmed = header.trim();
            if trimmed.len() != header.len() {
                *header = trimmed.to_string();
            }
        }
    }

    /// Cells of one column, in row order
    pub fn column_values<'a>(&'a self, name: &str) -> Option<impl Iterator<Item = &'a str> + 'a> {
        let idx = self.column_index(name)?;
        Some(
            self.rows
                .iter()
                .map(move |row| row.get(idx).map(String::as_str).unwrap_or("")),
        )
    }

    /// Row `idx` (0-based) as a record keyed by trimmed header
    pub fn record(&self, idx: usize) -> RawRecord {
        RawRecord::from_pairs(
            self.headers
                .iter()
                .zip(self.rows[idx].iter())
                .map(|(h, v)| (h.as_str(), v.as_str())),
        )
    }
}

/// Encoded Feature Set: numeric features plus integer class labels
#[derive(Clone, Debug, PartialEq)]
pub struct EncodedDataset {
    pub feature_names: Vec<String>,
    pub target: String,
    pub features: Vec<Vec<f64>>,
    pub labels: Vec<u32>,
}

impl EncodedDataset {
    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    /// Rows at `indices`, in the given order
    pub fn subset(&self, indices: &[usize]) -> Self {
        Self {
            feature_names: self.feature_names.clone(),
            target: self.target.clone(),
            features: indices.iter().map(|&i| self.features[i].clone()).collect(),
            labels: indices.iter().map(|&i| self.labels[i]).collect(),
        }
    }

    /// Values of one feature column
    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let idx = self.feature_names.iter().position(|n| n == name)?;
        Some(self.features.iter().map(|row| row[idx]).collect())
    }

    /// Write as CSV: feature columns, then the target column
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let persistence = |source: io::Error| PipelineError::Persistence {
            path: path.to_path_buf(),
            source,
        };

        let file = File::create(path).map_err(persistence)?;
        let mut writer = csv::Writer::from_writer(BufWriter::new(file));

        let mut header: Vec<&str> = self.feature_names.iter().map(String::as_str).collect();
        header.push(&self.target);
        writer
            .write_record(&header)
            .map_err(|e| persistence(e.into()))?;

        for (row, label) in self.features.iter().zip(&self.labels) {
            let mut cells: Vec<String> = row.iter().map(|v| v.to_string()).collect();
            cells.push(label.to_string());
            writer
                .write_record(&cells)
                .map_err(|e| persistence(e.into()))?;
        }

        writer.flush().map_err(persistence)?;
        debug!(path = %path.display(), rows = self.len(), "processed csv written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_test_csv() -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "loan_id, education, loan_status").unwrap();
        writeln!(file, "1, Graduate, Approved").unwrap();
        writeln!(file, "2, Not Graduate, Rejected").unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_csv() {
        let file = create_test_csv();
        let table = Table::from_csv(file.path()).unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.headers, vec!["loan_id", " education", " loan_status"]);
        assert_eq!(table.column_index("education"), Some(1));
        assert_eq!(
            table.column_values("education").unwrap().collect::<Vec<_>>(),
            vec![" Graduate", " Not Graduate"]
        );
        assert_eq!(table.record(1).require("education", 2).unwrap(), "Not Graduate");
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            Table::from_csv("/definitely/not/here.csv"),
            Err(PipelineError::NotFound(_))
        ));
    }

    #[test]
    fn test_ragged_rows_are_parse_errors() {
        let data = "a,b\n1,2\n3\n";
        assert!(matches!(
            Table::from_reader(data.as_bytes()),
            Err(PipelineError::Parse(_))
        ));
    }

    #[test]
    fn test_drop_and_normalize() {
        let mut table = Table::from_reader("loan_id , x \n1,2\n".as_bytes()).unwrap();
        table.drop_column("loan_id").unwrap();
        table.normalize_headers();
        assert_eq!(table.headers, vec!["x"]);
        assert_eq!(table.rows, vec![vec!["2".to_string()]]);
        assert!(matches!(
            table.drop_column("loan_id"),
            Err(PipelineError::Schema(cols)) if cols == vec!["loan_id".to_string()]
        ));
    }

    #[test]
    fn test_write_encoded_csv() {
        let dataset = EncodedDataset {
            feature_names: vec!["education".into(), "Assets".into()],
            target: "loan_status".into(),
            features: vec![vec![0.0, 375.0], vec![1.0, 12.5]],
            labels: vec![1, 0],
        };
        let file = NamedTempFile::new().unwrap();
        dataset.write_csv(file.path()).unwrap();

        let written = std::fs::read_to_string(file.path()).unwrap();
        assert_eq!(written, "education,Assets,loan_status\n0,375,1\n1,12.5,0\n");

        let subset = dataset.subset(&[1]);
        assert_eq!(subset.labels, vec![0]);
        assert_eq!(dataset.column("Assets").unwrap(), vec![375.0, 12.5]);
    }
}
