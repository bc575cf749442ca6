//! Out-of-bag (OOB) evaluation.

use crate::confusion::ConfusionMatrix;
use crate::error::ForestError;
use crate::forest::RandomForest;

/// Accuracy of the forest on samples each tree never saw.
#[derive(Debug, Clone)]
pub struct OobScore {
    /// Fraction of OOB-scored samples predicted correctly.
    pub accuracy: f64,
    /// OOB confusion matrix over the scored samples.
    pub confusion_matrix: ConfusionMatrix,
    /// Samples left out of at least one bootstrap draw.
    pub n_oob_samples: usize,
}

/// Score each sample by majority vote of the trees whose bootstrap missed it.
///
/// Samples that every tree saw are skipped.
pub(crate) fn compute_oob(
    forest: &RandomForest,
    features: &[Vec<f64>],
    labels: &[usize],
    oob_indices_per_tree: &[Vec<usize>],
) -> Result<OobScore, ForestError> {
    let n_classes = forest.n_classes;
    let mut votes: Vec<Vec<usize>> = vec![vec![0; n_classes]; features.len()];

    for (tree, oob_indices) in forest.trees.iter().zip(oob_indices_per_tree) {
        for &sample in oob_indices {
            votes[sample][tree.predict(&features[sample])?] += 1;
        }
    }

    let (truth, predicted): (Vec<usize>, Vec<usize>) = votes
        .iter()
        .zip(labels)
        .filter(|(v, _)| v.iter().any(|&c| c > 0))
        .map(|(v, &label)| {
            let winner = v
                .iter()
                .enumerate()
                .fold((0, 0), |best, (class, &count)| if count > best.1 { (class, count) } else { best })
                .0;
            (label, winner)
        })
        .unzip();

    if truth.is_empty() {
        return Err(ForestError::OobEvaluationFailed {
            reason: "no sample has any OOB tree".to_string(),
        });
    }

    let confusion_matrix = ConfusionMatrix::from_labels(&truth, &predicted, n_classes)?;
    Ok(OobScore {
        accuracy: confusion_matrix.accuracy(),
        n_oob_samples: truth.len(),
        confusion_matrix,
    })
}
