//! Per-segment ranking of a probability row.

use super::catalog::Segment;

/// Indices of the `n` most probable tags of a segment, best first.
///
/// `row` is one full prediction vector. Returned indices are catalog
/// positions. `n` is clamped to the segment size. The sort is stable, so
/// probabilities that compare equal (including `-0.0` and `0.0`) keep
/// catalog order. NaN ranks after every number.
pub fn rank_segment(row: &[f32], segment: Segment, n: usize) -> Vec<usize> {
    let mut indices: Vec<usize> = segment.range().collect();
    indices.sort_by(|&a, &b| {
        row[b]
            .partial_cmp(&row[a])
            .unwrap_or_else(|| row[a].is_nan().cmp(&row[b].is_nan()))
    });
    indices.truncate(n);
    indices
}
