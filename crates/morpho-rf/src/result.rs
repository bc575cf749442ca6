//! Training result types.

use crate::forest::RandomForest;
use crate::importance::RankedFeature;
use crate::oob::OobScore;

/// Shape of the training run.
#[derive(Debug, Clone)]
pub struct TrainingMetadata {
    /// Trees trained.
    pub n_trees: usize,
    /// Feature columns.
    pub n_features: usize,
    /// Classes the leaf distributions cover.
    pub n_classes: usize,
    /// Training rows.
    pub n_samples: usize,
    /// Features considered per split.
    pub max_features_resolved: usize,
}

/// A fitted forest with its importances, optional OOB score and metadata.
#[derive(Debug)]
pub struct RandomForestResult {
    forest: RandomForest,
    importances: Vec<RankedFeature>,
    oob_score: Option<OobScore>,
    metadata: TrainingMetadata,
}

impl RandomForestResult {
    pub(crate) fn new(
        forest: RandomForest,
        importances: Vec<RankedFeature>,
        oob_score: Option<OobScore>,
        metadata: TrainingMetadata,
    ) -> Self {
        Self {
            forest,
            importances,
            oob_score,
            metadata,
        }
    }

    /// Borrow the fitted forest.
    #[must_use]
    pub fn forest(&self) -> &RandomForest {
        &self.forest
    }

    /// Take the fitted forest.
    #[must_use]
    pub fn into_forest(self) -> RandomForest {
        self.forest
    }

    /// Return features ranked by importance.
    #[must_use]
    pub fn importances(&self) -> &[RankedFeature] {
        &self.importances
    }

    /// Return the OOB score, if it was computed.
    #[must_use]
    pub fn oob_score(&self) -> Option<&OobScore> {
        self.oob_score.as_ref()
    }

    /// Return training metadata.
    #[must_use]
    pub fn metadata(&self) -> &TrainingMetadata {
        &self.metadata
    }
}
