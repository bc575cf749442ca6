use crate::error::ForestError;

/// Fraction of positions where `predicted` and `actual` hold equal elements.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`ForestError::EmptyDataset`] | both sequences are empty |
/// | [`ForestError::LengthMismatch`] | the sequences differ in length |
pub fn accuracy<T: PartialEq>(predicted: &[T], actual: &[T]) -> Result<f64, ForestError> {
    if predicted.len() != actual.len() {
        return Err(ForestError::LengthMismatch {
            predicted: predicted.len(),
            actual: actual.len(),
        });
    }
    if actual.is_empty() {
        return Err(ForestError::EmptyDataset);
    }
    let correct = predicted.iter().zip(actual).filter(|(p, a)| p == a).count();
    Ok(correct as f64 / actual.len() as f64)
}

/// Mean and population standard deviation.
pub(crate) fn mean_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_sequences_score_one() {
        let labels = ["spiral", "merger", "elliptical"];
        assert_eq!(accuracy(&labels, &labels).unwrap(), 1.0);
    }

    #[test]
    fn counts_equal_positions() {
        let predicted = [0, 1, 2, 2];
        let actual = [0, 1, 1, 0];
        assert!((accuracy(&predicted, &actual).unwrap() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn works_on_strings() {
        let predicted = vec!["spiral".to_string(), "merger".to_string()];
        let actual = vec!["spiral".to_string(), "spiral".to_string()];
        assert!((accuracy(&predicted, &actual).unwrap() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn length_mismatch_is_an_error() {
        let err = accuracy(&[0, 1], &[0]).unwrap_err();
        assert!(matches!(err, ForestError::LengthMismatch { predicted: 2, actual: 1 }));
    }

    #[test]
    fn empty_is_an_error() {
        let empty: [usize; 0] = [];
        assert!(matches!(accuracy(&empty, &empty).unwrap_err(), ForestError::EmptyDataset));
    }

    #[test]
    fn mean_std_of_constant_is_zero_spread() {
        let (mean, std) = mean_std(&[0.8, 0.8, 0.8]);
        assert!((mean - 0.8).abs() < 1e-12);
        assert!(std.abs() < 1e-12);
    }
}
