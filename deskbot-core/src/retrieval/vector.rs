//! Similarity math over embeddings.

/// Cosine similarity of two vectors.
///
/// Returns `0.0` when either vector has zero magnitude or the lengths
/// differ. The result is clamped to `[-1, 1]`.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let (mut dot, mut norm_a, mut norm_b) = (0.0f64, 0.0f64, 0.0f64);
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let magnitude = norm_a.sqrt() * norm_b.sqrt();
    if magnitude == 0.0 || !magnitude.is_finite() {
        return 0.0;
    }

    let similarity = (dot / magnitude).clamp(-1.0, 1.0);
    if similarity.is_nan() {
        0.0
    } else {
        similarity as f32
    }
}

/// Indices of candidates scoring at least `threshold` against `query`,
/// highest first. Ties keep candidate order.
pub fn nearest<'a, I>(query: &[f32], candidates: I, threshold: f32) -> Vec<(usize, f32)>
where
    I: IntoIterator<Item = (usize, &'a [f32])>,
{
    let mut scored: Vec<(usize, f32)> = candidates
        .into_iter()
        .map(|(index, vector)| (index, cosine_similarity(query, vector)))
        .filter(|(_, score)| *score >= threshold)
        .collect();
    // sort_by is stable
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored
}
