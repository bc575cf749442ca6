//! Feature importance aggregation across trees.

/// A feature with its normalized importance and 1-based rank.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedFeature {
    /// Feature name.
    pub name: String,
    /// Mean decrease in impurity, normalized across features.
    pub importance: f64,
    /// 1 is the most important.
    pub rank: usize,
}

/// Sum per-tree importances, normalize to 1 and rank descending.
///
/// Equal importances keep their column order.
pub(crate) fn aggregate_importances(per_tree: &[Vec<f64>], names: &[String]) -> Vec<RankedFeature> {
    if per_tree.is_empty() || names.is_empty() {
        return Vec::new();
    }

    let mut totals = vec![0.0f64; names.len()];
    for tree in per_tree {
        for (total, &value) in totals.iter_mut().zip(tree) {
            *total += value;
        }
    }
    let sum: f64 = totals.iter().sum();
    if sum > 0.0 {
        totals.iter_mut().for_each(|v| *v /= sum);
    }

    let mut ranked: Vec<RankedFeature> = names
        .iter()
        .zip(totals)
        .map(|(name, importance)| RankedFeature {
            name: name.clone(),
            importance,
            rank: 0,
        })
        .collect();
    ranked.sort_by(|a, b| b.importance.total_cmp(&a.importance));
    for (i, feature) in ranked.iter_mut().enumerate() {
        feature.rank = i + 1;
    }
    ranked
}
