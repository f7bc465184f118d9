//! Response confidence.

/// Overall confidence: the lowest per-question top score.
///
/// Callers pass 0 for questions with no retrieved documents, so a single
/// unanswered question pulls confidence to 0. An empty input is 0.
pub fn score_confidence(top_scores: &[f32]) -> f32 {
    top_scores
        .iter()
        .copied()
        .reduce(f32::min)
        .unwrap_or(0.0)
        .clamp(0.0, 1.0)
}
