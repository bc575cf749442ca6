//! Confusion matrix and per-class classification metrics.

use std::fmt;

use crate::error::ForestError;
use crate::forest::index_names;

/// A multi-class confusion matrix.
///
/// `matrix[t][p]` counts samples of true class `t` predicted as class `p`.
/// Rows and columns follow class index order, which is also the order of
/// `class_names`.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfusionMatrix {
    matrix: Vec<Vec<usize>>,
    class_names: Vec<String>,
}

/// Precision, recall, F1 and support for one class.
#[derive(Debug, Clone)]
pub struct ClassMetrics {
    /// Class index.
    pub class: usize,
    /// TP / (TP + FP); 0.0 when the class is never predicted.
    pub precision: f64,
    /// TP / (TP + FN); 0.0 when the class has no true samples.
    pub recall: f64,
    /// Harmonic mean of precision and recall; 0.0 when both are zero.
    pub f1: f64,
    /// True samples of this class.
    pub support: usize,
}

impl ConfusionMatrix {
    /// Count (true, predicted) pairs into an `n_classes × n_classes` matrix.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ForestError::EmptyDataset`] | no labels |
    /// | [`ForestError::LengthMismatch`] | the two slices differ in length |
    /// | [`ForestError::LabelOutOfRange`] | a label is `>= n_classes` |
    pub fn from_labels(truth: &[usize], predicted: &[usize], n_classes: usize) -> Result<Self, ForestError> {
        if truth.is_empty() {
            return Err(ForestError::EmptyDataset);
        }
        if truth.len() != predicted.len() {
            return Err(ForestError::LengthMismatch {
                predicted: predicted.len(),
                actual: truth.len(),
            });
        }
        let mut matrix = vec![vec![0usize; n_classes]; n_classes];
        for (position, (&t, &p)) in truth.iter().zip(predicted).enumerate() {
            let label = t.max(p);
            if label >= n_classes {
                return Err(ForestError::LabelOutOfRange {
                    label,
                    position,
                    n_classes,
                });
            }
            matrix[t][p] += 1;
        }
        Ok(Self {
            matrix,
            class_names: index_names(n_classes),
        })
    }

    /// Replace the default index names with class names.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::ClassNameCountMismatch`] unless one name per class is given.
    pub fn with_class_names(mut self, class_names: Vec<String>) -> Result<Self, ForestError> {
        if class_names.len() != self.n_classes() {
            return Err(ForestError::ClassNameCountMismatch {
                n_classes: self.n_classes(),
                got: class_names.len(),
            });
        }
        self.class_names = class_names;
        Ok(self)
    }

    /// Share of samples on the diagonal.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        let correct: usize = (0..self.n_classes()).map(|i| self.matrix[i][i]).sum();
        match self.total() {
            0 => 0.0,
            total => correct as f64 / total as f64,
        }
    }

    /// Total number of counted samples.
    #[must_use]
    pub fn total(&self) -> usize {
        self.matrix.iter().flatten().sum()
    }

    /// Each row divided by its sum, so row `t` is the prediction
    /// distribution of true class `t`. Empty rows stay zero.
    #[must_use]
    pub fn normalized(&self) -> Vec<Vec<f64>> {
        self.matrix
            .iter()
            .map(|row| {
                let sum: usize = row.iter().sum();
                row.iter()
                    .map(|&c| if sum == 0 { 0.0 } else { c as f64 / sum as f64 })
                    .collect()
            })
            .collect()
    }

    /// Per-class precision, recall, F1 and support.
    #[must_use]
    pub fn class_metrics(&self) -> Vec<ClassMetrics> {
        let n = self.n_classes();
        (0..n)
            .map(|c| {
                let tp = self.matrix[c][c];
                let predicted: usize = (0..n).map(|t| self.matrix[t][c]).sum();
                let support: usize = self.matrix[c].iter().sum();
                let precision = ratio(tp, predicted);
                let recall = ratio(tp, support);
                let f1 = if precision + recall == 0.0 {
                    0.0
                } else {
                    2.0 * precision * recall / (precision + recall)
                };
                ClassMetrics {
                    class: c,
                    precision,
                    recall,
                    f1,
                    support,
                }
            })
            .collect()
    }

    /// Return the count rows.
    #[must_use]
    pub fn as_rows(&self) -> &[Vec<usize>] {
        &self.matrix
    }

    /// Return the class names labelling rows and columns.
    #[must_use]
    pub fn class_names(&self) -> &[String] {
        &self.class_names
    }

    /// Return the number of classes.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.matrix.len()
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label_width = self.class_names.iter().map(String::len).max().unwrap_or(0).max(4);
        let cell_width = label_width.max(
            self.matrix.iter().flatten().map(|c| c.to_string().len()).max().unwrap_or(1),
        );

        write!(f, "{:>label_width$}", "")?;
        for name in &self.class_names {
            write!(f, " {name:>cell_width$}")?;
        }
        writeln!(f)?;
        for (name, row) in self.class_names.iter().zip(&self.matrix) {
            write!(f, "{name:>label_width$}")?;
            for count in row {
                write!(f, " {count:>cell_width$}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_matrix_metrics() {
        let truth = vec![0, 0, 0, 1, 1, 1, 2, 2, 2];
        let predicted = vec![0, 0, 1, 1, 1, 2, 2, 2, 0];
        let cm = ConfusionMatrix::from_labels(&truth, &predicted, 3).unwrap();

        assert_eq!(cm.as_rows(), &[vec![2, 1, 0], vec![0, 2, 1], vec![1, 0, 2]]);
        assert_eq!(cm.total(), 9);
        assert!((cm.accuracy() - 6.0 / 9.0).abs() < 1e-12);

        let metrics = cm.class_metrics();
        assert!((metrics[0].precision - 2.0 / 3.0).abs() < 1e-12);
        assert!((metrics[0].recall - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(metrics[0].support, 3);
    }

    #[test]
    fn normalized_rows_sum_to_one() {
        let cm = ConfusionMatrix::from_labels(&[0, 0, 0, 0, 1], &[0, 0, 0, 1, 1], 3).unwrap();
        let norm = cm.normalized();
        assert!((norm[0][0] - 0.75).abs() < 1e-12);
        assert!((norm[1].iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!(norm[2].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn absent_class_has_zero_metrics() {
        let cm = ConfusionMatrix::from_labels(&[0, 0, 1, 1], &[0, 0, 1, 1], 3).unwrap();
        let metrics = cm.class_metrics();
        assert_eq!(metrics[2].support, 0);
        assert_eq!(metrics[2].precision, 0.0);
        assert_eq!(metrics[2].f1, 0.0);
    }

    #[test]
    fn rejects_bad_input() {
        assert!(matches!(
            ConfusionMatrix::from_labels(&[], &[], 3).unwrap_err(),
            ForestError::EmptyDataset
        ));
        assert!(matches!(
            ConfusionMatrix::from_labels(&[0, 1], &[0], 2).unwrap_err(),
            ForestError::LengthMismatch { predicted: 1, actual: 2 }
        ));
        assert!(matches!(
            ConfusionMatrix::from_labels(&[0, 1], &[0, 2], 2).unwrap_err(),
            ForestError::LabelOutOfRange { label: 2, position: 1, .. }
        ));
    }

    #[test]
    fn display_uses_class_names() {
        let cm = ConfusionMatrix::from_labels(&[0, 1, 2], &[0, 2, 2], 3)
            .unwrap()
            .with_class_names(vec!["elliptical".into(), "merger".into(), "spiral".into()])
            .unwrap();
        let text = cm.to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].contains("elliptical") && lines[0].contains("spiral"));
        assert!(lines[2].trim_start().starts_with("merger"));
    }

    #[test]
    fn class_name_count_checked() {
        let cm = ConfusionMatrix::from_labels(&[0, 1], &[0, 1], 2).unwrap();
        assert!(cm.with_class_names(vec!["only".into()]).is_err());
    }
}
