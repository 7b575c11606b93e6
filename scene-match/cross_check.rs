use scene_core::{Correspondence, DescriptorSet};

use crate::matching::CorrespondenceFinder;

/// Keep only mutual nearest neighbours: a forward pair `q -> r` survives
/// when the backward search from `r` lands on `q` again. The result is in
/// forward-scan order of `query`.
pub fn cross_validate<F: CorrespondenceFinder + ?Sized>(
    finder: &F,
    query: &DescriptorSet,
    reference: &DescriptorSet,
) -> Vec<Correspondence> {
    let forward = finder.nearest_neighbors(query, reference);
    let backward = finder.nearest_neighbors(reference, query);

    let mut back_to_query: Vec<Option<usize>> = vec![None; reference.len()];
    for c in &backward {
        if let Some(slot) = back_to_query.get_mut(c.query_idx) {
            *slot = Some(c.reference_idx);
        }
    }

    forward
        .into_iter()
        .filter(|c| back_to_query.get(c.reference_idx).copied().flatten() == Some(c.query_idx))
        .collect()
}
