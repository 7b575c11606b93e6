/// Best and runner-up of a score list (lower is better)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ranking {
    pub best: usize,
    pub best_score: f32,
    /// Lowest score other than the best entry's, capped at the failure score
    pub second_score: f32,
    /// `second_score - best_score`, never negative
    pub confidence: f32,
}

/// Select the minimum and the runner-up in one pass.
///
/// Ties go to the lowest index. The runner-up never exceeds
/// `failure_score`, so a single entry is ranked against the failure score.
/// `None` for an empty list.
pub fn rank(scores: &[f32], failure_score: f32) -> Option<Ranking> {
    let mut best: Option<(usize, f32)> = None;
    let mut second = failure_score;

    for (i, &score) in scores.iter().enumerate() {
        match best {
            Some((_, b)) if score >= b => second = second.min(score),
            _ => {
                if let Some((_, previous)) = best {
                    second = second.min(previous);
                }
                best = Some((i, score));
            }
        }
    }

    best.map(|(best, best_score)| {
        let second_score = second.max(best_score);
        Ranking {
            best,
            best_score,
            second_score,
            confidence: second_score - best_score,
        }
    })
}
