//! Held-out evaluation
//!
//! Scores a fitted forest on the test subset. The report is logged and
//! returned to the caller; it is never written to disk.

use crate::errors::{PipelineError, Result};
use loan_model::RandomForest;
use std::fmt;
use tracing::info;

/// Precision, recall and F1 for one class
#[derive(Clone, Debug, PartialEq)]
pub struct ClassMetrics {
    pub name: String,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Averaged metrics over all classes
#[derive(Clone, Debug, PartialEq)]
pub struct AverageMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Held-out metrics.
///
/// `classes` has one row per entry of the target mapping, in code order,
/// including classes absent from both truth and predictions. Those rows
/// report zero support and 0.0 metrics and still count toward the macro
/// average.
#[derive(Clone, Debug, PartialEq)]
pub struct EvaluationReport {
    pub predictions: Vec<u32>,
    pub accuracy: f64,
    pub classes: Vec<ClassMetrics>,
    pub macro_avg: AverageMetrics,
    pub weighted_avg: AverageMetrics,
    /// `confusion[true][predicted]`
    pub confusion: Vec<Vec<usize>>,
}

/// `num / den`, or 0.0 when `den` is zero
fn ratio(num: f64, den: f64) -> f64 {
    if den == 0.0 {
        0.0
    } else {
        num / den
    }
}

/// Score `model` on `features` against `labels`
pub fn evaluate(
    model: &RandomForest,
    features: &[Vec<f64>],
    labels: &[u32],
    class_names: &[String],
) -> Result<EvaluationReport> {
    if features.is_empty() {
        return Err(PipelineError::InvalidInput("empty test set".into()));
    }
    if features.len() != labels.len() {
        return Err(PipelineError::InvalidInput(format!(
            "{} feature rows but {} labels",
            features.len(),
            labels.len()
        )));
    }
    if class_names.len() != model.n_classes {
        return Err(PipelineError::InvalidInput(format!(
            "{} class names for a {}-class model",
            class_names.len(),
            model.n_classes
        )));
    }

    let predictions = model.predict(features)?;
    let report = EvaluationReport::from_predictions(predictions, labels, class_names)?;
    info!(
        accuracy = report.accuracy,
        macro_f1 = report.macro_avg.f1,
        rows = labels.len(),
        "evaluation completed"
    );
    Ok(report)
}

impl EvaluationReport {
    /// Metrics for precomputed predictions
    pub fn from_predictions(predictions: Vec<u32>, labels: &[u32], class_names: &[String]) -> Result<Self> {
        if predictions.len() != labels.len() {
            return Err(PipelineError::InvalidInput(format!(
                "{} predictions but {} labels",
                predictions.len(),
                labels.len()
            )));
        }
        if labels.is_empty() {
            return Err(PipelineError::InvalidInput("empty test set".into()));
        }

        let k = class_names.len();
        let mut confusion = vec![vec![0usize; k]; k];
        for (&truth, &pred) in labels.iter().zip(&predictions) {
            let (t, p) = (truth as usize, pred as usize);
            if t >= k || p >= k {
                return Err(PipelineError::InvalidInput(format!(
                    "class code {} outside {k} classes",
                    t.max(p)
                )));
            }
            confusion[t][p] += 1;
        }

        let total = labels.len();
        let correct: usize = (0..k).map(|c| confusion[c][c]).sum();

        let classes: Vec<ClassMetrics> = class_names
            .iter()
            .enumerate()
            .map(|(c, name)| {
                let tp = confusion[c][c] as f64;
                let predicted: usize = confusion.iter().map(|row| row[c]).sum();
                let support: usize = confusion[c].iter().sum();
                let precision = ratio(tp, predicted as f64);
                let recall = ratio(tp, support as f64);
                ClassMetrics {
                    name: name.clone(),
                    precision,
                    recall,
                    f1: ratio(2.0 * precision * recall, precision + recall),
                    support,
                }
            })
            .collect();

        let macro_avg = AverageMetrics {
            precision: ratio(classes.iter().map(|m| m.precision).sum(), k as f64),
            recall: ratio(classes.iter().map(|m| m.recall).sum(), k as f64),
            f1: ratio(classes.iter().map(|m| m.f1).sum(), k as f64),
            support: total,
        };
        let weighted = |metric: fn(&ClassMetrics) -> f64| {
            ratio(
                classes.iter().map(|m| metric(m) * m.support as f64).sum(),
                total as f64,
            )
        };
        let weighted_avg = AverageMetrics {
            precision: weighted(|m| m.precision),
            recall: weighted(|m| m.recall),
            f1: weighted(|m| m.f1),
            support: total,
        };

        Ok(Self {
            predictions,
            accuracy: correct as f64 / total as f64,
            classes,
            macro_avg,
            weighted_avg,
            confusion,
        })
    }
}

impl fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .classes
            .iter()
            .map(|c| c.name.len())
            .chain(["weighted avg".len()])
            .max()
            .unwrap_or(12);

        writeln!(
            f,
            "{:>width$} {:>9} {:>9} {:>9} {:>9}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        writeln!(f)?;
        for class in &self.classes {
            writeln!(
                f,
                "{:>width$} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                class.name, class.precision, class.recall, class.f1, class.support
            )?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{:>width$} {:>9} {:>9} {:>9.2} {:>9}",
            "accuracy", "", "", self.accuracy, self.macro_avg.support
        )?;
        for (label, avg) in [("macro avg", &self.macro_avg), ("weighted avg", &self.weighted_avg)] {
            writeln!(
                f,
                "{:>width$} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                label, avg.precision, avg.recall, avg.f1, avg.support
            )?;
        }

        writeln!(f)?;
        writeln!(f, "confusion matrix (rows: true, columns: predicted)")?;
        for (class, row) in self.classes.iter().zip(&self.confusion) {
            let cells: Vec<String> = row.iter().map(|c| format!("{c:>7}")).collect();
            writeln!(f, "{:>width$} {}", class.name, cells.join(""))?;
        }
        Ok(())
    }
}
