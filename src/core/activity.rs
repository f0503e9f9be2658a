//! Activity of a mini-column against an input vector.
//!
//! Every live memory is compared with the input. A similarity above the zero-point `k0`
//! attracts and one below repels; the two sides are averaged separately so a single very
//! dissimilar memory cannot cancel out a crowd of good matches. Similarities that come out
//! NaN (a zero-norm vector on either side) are skipped.

use super::memory::MemoryStore;

/// Positive and negative activity of one mini-column for one input.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ActivityPair {
    /// Mean of the above-zero-point similarities, shifted by `k0`. Never negative.
    pub positive: f32,

    /// Mean of the below-zero-point similarities, shifted by `k0`. Never positive.
    pub negative: f32,

    /// Memories that produced a usable similarity.
    pub count: usize,
}

impl ActivityPair {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Similarity measure between an input and a stored memory.
pub type SimilarityFn = fn(&[f32], &[f32]) -> f32;

/// Cosine similarity in `[-1, 1]`. NaN when either vector has zero norm.
#[inline]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let (dot, na, nb) = a
        .iter()
        .zip(b)
        .fold((0.0f32, 0.0f32, 0.0f32), |(dot, na, nb), (&x, &y)| {
            (x.mul_add(y, dot), x.mul_add(x, na), y.mul_add(y, nb))
        });
    let denom = (na * nb).sqrt();
    if denom == 0.0 {
        return f32::NAN;
    }
    (dot / denom).clamp(-1.0, 1.0)
}

/// Euclidean distance between two memory vectors.
#[inline]
pub fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(&x, &y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

/// Computes the activity of `store` against `input`.
///
/// An empty store, or one whose similarities are all NaN, yields `(0, 0, 0)`.
pub fn evaluate(
    store: &MemoryStore,
    input: &[f32],
    k0: f32,
    similarity: SimilarityFn,
) -> ActivityPair {
    let mut pos_sum = 0.0f32;
    let mut pos_count = 0usize;
    let mut neg_sum = 0.0f32;
    let mut neg_count = 0usize;

    for memory in store.iter() {
        let s = similarity(input, &memory.vector);
        if !s.is_finite() {
            continue;
        }
        let a = s - k0;
        if a >= 0.0 {
            pos_sum += a;
            pos_count += 1;
        } else {
            neg_sum += a;
            neg_count += 1;
        }
    }

    ActivityPair {
        positive: if pos_count > 0 { pos_sum / pos_count as f32 } else { 0.0 },
        negative: if neg_count > 0 { neg_sum / neg_count as f32 } else { 0.0 },
        count: pos_count + neg_count,
    }
}
