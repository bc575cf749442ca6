use crate::error::ForestError;

/// Shape of a validated training set.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TrainingShape {
    pub(crate) n_samples: usize,
    pub(crate) n_features: usize,
    pub(crate) n_classes: usize,
}

/// Check that there is exactly one feature name per column.
pub(crate) fn validate_feature_names(feature_names: &[String], n_features: usize) -> Result<(), ForestError> {
    if feature_names.len() != n_features {
        return Err(ForestError::FeatureNameCountMismatch {
            expected: n_features,
            got: feature_names.len(),
        });
    }
    Ok(())
}

/// Check that a row-major training set is rectangular, finite, and that every
/// label fits in the class range.
///
/// `n_classes` of `None` derives the class count as `max(label) + 1`.
pub(crate) fn validate(
    features: &[Vec<f64>],
    labels: &[usize],
    n_classes: Option<usize>,
) -> Result<TrainingShape, ForestError> {
    let Some(first) = features.first() else {
        return Err(ForestError::EmptyDataset);
    };
    let n_features = first.len();
    if n_features == 0 {
        return Err(ForestError::ZeroFeatures);
    }
    if labels.len() != features.len() {
        return Err(ForestError::LabelCountMismatch {
            n_features_rows: features.len(),
            n_labels: labels.len(),
        });
    }

    for (sample_index, row) in features.iter().enumerate() {
        if row.len() != n_features {
            return Err(ForestError::FeatureCountMismatch {
                expected: n_features,
                got: row.len(),
                sample_index,
            });
        }
        if let Some(feature_index) = row.iter().position(|v| !v.is_finite()) {
            return Err(ForestError::NonFiniteValue {
                sample_index,
                feature_index,
            });
        }
    }

    let derived = labels.iter().max().map_or(0, |&m| m + 1);
    let n_classes = n_classes.unwrap_or(derived);
    if let Some((position, &label)) = labels.iter().enumerate().find(|&(_, &l)| l >= n_classes) {
        return Err(ForestError::LabelOutOfRange {
            label,
            position,
            n_classes,
        });
    }

    Ok(TrainingShape {
        n_samples: features.len(),
        n_features,
        n_classes,
    })
}

/// Convert row-major rows into feature columns.
pub(crate) fn to_columns(features: &[Vec<f64>], n_features: usize) -> Vec<Vec<f64>> {
    (0..n_features)
        .map(|f| features.iter().map(|row| row[f]).collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_class_count_from_labels() {
        let shape = validate(&[vec![1.0], vec![2.0]], &[0, 2], None).unwrap();
        assert_eq!(shape.n_classes, 3);
        assert_eq!(shape.n_samples, 2);
        assert_eq!(shape.n_features, 1);
    }

    #[test]
    fn explicit_class_count_rejects_large_label() {
        let err = validate(&[vec![1.0], vec![2.0]], &[0, 3], Some(3)).unwrap_err();
        assert!(matches!(err, ForestError::LabelOutOfRange { label: 3, position: 1, .. }));
    }

    #[test]
    fn label_count_must_match_rows() {
        let err = validate(&[vec![1.0], vec![2.0]], &[0], None).unwrap_err();
        assert!(matches!(err, ForestError::LabelCountMismatch { .. }));
    }

    #[test]
    fn feature_names_match_columns() {
        let names = vec!["u-g".to_string(), "g-r".to_string()];
        assert!(validate_feature_names(&names, 2).is_ok());
        let err = validate_feature_names(&names[..1], 2).unwrap_err();
        assert!(matches!(err, ForestError::FeatureNameCountMismatch { expected: 2, got: 1 }));
    }

    #[test]
    fn columns_transpose_rows() {
        let cols = to_columns(&[vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]], 2);
        assert_eq!(cols, vec![vec![1.0, 3.0, 5.0], vec![2.0, 4.0, 6.0]]);
    }
}
