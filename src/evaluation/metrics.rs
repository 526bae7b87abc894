//! Classification metrics
//!
//! Labels are the sorted union of true and predicted values. A ratio with a
//! zero denominator is reported as 0.

use serde::{Deserialize, Serialize};
use std::fmt::Write;

use crate::error::{ErrorCode, PipelineError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub label: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub support: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AverageMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub support: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub accuracy: f64,
    /// Support-weighted precision
    pub precision: f64,
    pub per_class: Vec<ClassMetrics>,
    pub macro_avg: AverageMetrics,
    pub weighted_avg: AverageMetrics,
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

fn f1(precision: f64, recall: f64) -> f64 {
    if precision + recall == 0.0 {
        0.0
    } else {
        2.0 * precision * recall / (precision + recall)
    }
}

/// Score predictions against the truth
pub fn compute(y_true: &[f64], y_pred: &[f64]) -> Result<Metrics> {
    if y_true.len() != y_pred.len() {
        return Err(PipelineError::invalid_input_with_code(
            ErrorCode::DATA_SHAPE_MISMATCH,
            format!("{} true labels but {} predictions", y_true.len(), y_pred.len()),
            None,
        ));
    }
    if y_true.is_empty() {
        return Err(PipelineError::invalid_input_with_code(
            ErrorCode::DATA_TOO_SMALL,
            "cannot evaluate on an empty test set",
            None,
        ));
    }

    let mut labels: Vec<f64> = y_true.iter().chain(y_pred).copied().collect();
    labels.sort_by(f64::total_cmp);
    labels.dedup();

    let total = y_true.len();
    let correct = y_true.iter().zip(y_pred).filter(|(t, p)| t == p).count();

    let per_class: Vec<ClassMetrics> = labels
        .iter()
        .map(|&label| {
            let tp = y_true
                .iter()
                .zip(y_pred)
                .filter(|(t, p)| **t == label && **p == label)
                .count();
            let predicted = y_pred.iter().filter(|p| **p == label).count();
            let support = y_true.iter().filter(|t| **t == label).count();
            let precision = ratio(tp, predicted);
            let recall = ratio(tp, support);
            ClassMetrics {
                label,
                precision,
                recall,
                f1_score: f1(precision, recall),
                support,
            }
        })
        .collect();

    let k = per_class.len() as f64;
    let macro_avg = AverageMetrics {
        precision: per_class.iter().map(|c| c.precision).sum::<f64>() / k,
        recall: per_class.iter().map(|c| c.recall).sum::<f64>() / k,
        f1_score: per_class.iter().map(|c| c.f1_score).sum::<f64>() / k,
        support: total,
    };
    let weighted = |f: fn(&ClassMetrics) -> f64| {
        per_class
            .iter()
            .map(|c| f(c) * c.support as f64)
            .sum::<f64>()
            / total as f64
    };
    let weighted_avg = AverageMetrics {
        precision: weighted(|c| c.precision),
        recall: weighted(|c| c.recall),
        f1_score: weighted(|c| c.f1_score),
        support: total,
    };

    Ok(Metrics {
        accuracy: ratio(correct, total),
        precision: weighted_avg.precision,
        per_class,
        macro_avg,
        weighted_avg,
    })
}

/// Plain-text table in the familiar precision/recall/f1/support layout
pub fn classification_report(metrics: &Metrics) -> String {
    let names: Vec<String> = metrics.per_class.iter().map(|c| format!("{:?}", c.label)).collect();
    let width = names
        .iter()
        .map(String::len)
        .chain(["weighted avg".len()])
        .max()
        .unwrap_or(12);

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>width$} {:>9} {:>9} {:>9} {:>9}\n",
        "", "precision", "recall", "f1-score", "support"
    );
    for (name, c) in names.iter().zip(&metrics.per_class) {
        let _ = writeln!(
            out,
            "{:>width$} {:>9.2} {:>9.2} {:>9.2} {:>9}",
            name, c.precision, c.recall, c.f1_score, c.support
        );
    }
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "{:>width$} {:>9} {:>9} {:>9.2} {:>9}",
        "accuracy", "", "", metrics.accuracy, metrics.macro_avg.support
    );
    for (name, avg) in [("macro avg", &metrics.macro_avg), ("weighted avg", &metrics.weighted_avg)] {
        let _ = writeln!(
            out,
            "{:>width$} {:>9.2} {:>9.2} {:>9.2} {:>9}",
            name, avg.precision, avg.recall, avg.f1_score, avg.support
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perfect_predictions() {
        let y = [0.0, 1.0, 1.0, 0.0];
        let m = compute(&y, &y).unwrap();
        assert_eq!(m.accuracy, 1.0);
        assert_eq!(m.precision, 1.0);
        assert!(m.per_class.iter().all(|c| c.f1_score == 1.0));
    }

    #[test]
    fn test_weighted_precision_with_zero_division() {
        // Class 1 is never predicted: its precision counts as 0
        let y_true = [0.0, 0.0, 0.0, 1.0];
        let y_pred = [0.0, 0.0, 0.0, 0.0];
        let m = compute(&y_true, &y_pred).unwrap();

        assert_eq!(m.accuracy, 0.75);
        assert_eq!(m.per_class[0].precision, 0.75);
        assert_eq!(m.per_class[1].precision, 0.0);
        assert!((m.precision - 0.75 * 0.75).abs() < 1e-12);
        assert_eq!(m.per_class[1].support, 1);
        assert!((m.macro_avg.recall - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_labels_include_predicted_only_classes() {
        let m = compute(&[0.0, 0.0], &[0.0, 2.0]).unwrap();
        let labels: Vec<f64> = m.per_class.iter().map(|c| c.label).collect();
        assert_eq!(labels, vec![0.0, 2.0]);
        assert_eq!(m.per_class[1].support, 0);
    }

    #[test]
    fn test_length_mismatch_and_empty() {
        assert!(compute(&[1.0], &[]).is_err());
        assert!(compute(&[], &[]).is_err());
    }

    #[test]
    fn test_report_layout() {
        let m = compute(&[0.0, 1.0, 1.0], &[0.0, 1.0, 0.0]).unwrap();
        let text = classification_report(&m);
        assert!(text.contains("precision"));
        assert!(text.contains("0.0"));
        assert!(text.contains("accuracy"));
        assert!(text.contains("weighted avg"));
        assert!(text.lines().any(|l| l.trim_start().starts_with("macro avg")));
    }
}
