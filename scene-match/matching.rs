use rayon::prelude::*;
use scene_core::{hamming_distance, Correspondence, Descriptor, DescriptorSet};

/// Nearest-neighbour search between two descriptor sets
pub trait CorrespondenceFinder: Send + Sync {
    /// One correspondence per query element that has a neighbour, in query
    /// order. `query_idx` indexes `query`, `reference_idx` indexes `target`.
    fn nearest_neighbors(&self, query: &DescriptorSet, target: &DescriptorSet) -> Vec<Correspondence>;
}

/// Exhaustive Hamming search. Ties go to the lowest target index.
#[derive(Debug, Clone, Copy, Default)]
pub struct BruteForceMatcher;

impl BruteForceMatcher {
    fn nearest(descriptor: &Descriptor, targets: &[Descriptor]) -> Option<(usize, u32)> {
        let mut best: Option<(usize, u32)> = None;
        for (i, t) in targets.iter().enumerate() {
            let d = hamming_distance(descriptor, t);
            if best.map_or(true, |(_, bd)| d < bd) {
                best = Some((i, d));
                if d == 0 {
                    break;
                }
            }
        }
        best
    }
}

impl CorrespondenceFinder for BruteForceMatcher {
    fn nearest_neighbors(&self, query: &DescriptorSet, target: &DescriptorSet) -> Vec<Correspondence> {
        let targets = target.descriptors();
        if targets.is_empty() {
            return Vec::new();
        }

        query
            .descriptors()
            .par_iter()
            .enumerate()
            .filter_map(|(qi, d)| {
                Self::nearest(d, targets).map(|(ri, dist)| Correspondence::new(qi, ri, dist as f32))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{desc, set_of};

    #[test]
    fn test_nearest_neighbors_basic() {
        let query = set_of(vec![desc(0b0000_0001), desc(0b1111_0000)]);
        let target = set_of(vec![desc(0b1111_0001), desc(0b0000_0011), desc(0b1110_0000)]);
        let matches = BruteForceMatcher.nearest_neighbors(&query, &target);
        assert_eq!(
            matches,
            vec![Correspondence::new(0, 1, 1.0), Correspondence::new(1, 0, 1.0)]
        );
    }

    #[test]
    fn test_tie_goes_to_lowest_index() {
        let query = set_of(vec![desc(0b0000_0000)]);
        let target = set_of(vec![desc(0b0000_0011), desc(0b0000_0001), desc(0b0000_0010)]);
        let matches = BruteForceMatcher.nearest_neighbors(&query, &target);
        assert_eq!(matches, vec![Correspondence::new(0, 1, 1.0)]);
    }

    #[test]
    fn test_empty_sets() {
        let some = set_of(vec![desc(1)]);
        let empty = DescriptorSet::default();
        assert!(BruteForceMatcher.nearest_neighbors(&some, &empty).is_empty());
        assert!(BruteForceMatcher.nearest_neighbors(&empty, &some).is_empty());
    }

    #[test]
    fn test_one_match_per_query_in_order() {
        let query = set_of((0..40u8).map(desc).collect());
        let target = set_of((0..10u8).map(|b| desc(b * 25)).collect());
        let matches = BruteForceMatcher.nearest_neighbors(&query, &target);
        assert_eq!(matches.len(), 40);
        for (i, m) in matches.iter().enumerate() {
            assert_eq!(m.query_idx, i);
            assert!(m.reference_idx < 10);
        }
    }
}
