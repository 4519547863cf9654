use super::labels::LabelTable;
use super::ClassificationResult;
use crate::error::ClassifierError;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

#[derive(Debug)]
struct Candidate {
    score: f32,
    index: usize,
}

// Higher score wins; between equal scores the earlier index wins, which
// keeps the selection deterministic.
impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .total_cmp(&other.score)
            .then_with(|| other.index.cmp(&self.index))
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

/// Partial top-K selection over a confidence vector.
///
/// Returns at most `k` results with `score > threshold`, ordered by
/// descending score, ties broken by ascending original index. Fewer than
/// `k` passing entries yield exactly that many, possibly none.
///
/// A bounded min-heap of size `k` keeps this O(n log k); the score vector
/// (typically ~1000 entries) is never fully sorted.
pub fn select_top_k(
    scores: &[f32],
    labels: &LabelTable,
    k: usize,
    threshold: f32,
) -> Result<Vec<ClassificationResult>, ClassifierError> {
    if scores.len() != labels.len() {
        return Err(ClassifierError::InvalidLabelTable {
            details: format!(
                "{} scores against {} labels",
                scores.len(),
                labels.len()
            ),
        });
    }
    if k == 0 {
        return Ok(Vec::new());
    }

    let mut heap: BinaryHeap<Reverse<Candidate>> = BinaryHeap::with_capacity(k);
    for (index, &score) in scores.iter().enumerate() {
        if !(score > threshold) {
            continue;
        }
        let candidate = Candidate { score, index };
        if heap.len() < k {
            heap.push(Reverse(candidate));
        } else {
            // Strictly better only: an equal score with a later index
            // never displaces the first-seen entry.
            let displaces = heap
                .peek()
                .map(|Reverse(worst)| candidate > *worst)
                .unwrap_or(false);
            if displaces {
                heap.pop();
                heap.push(Reverse(candidate));
            }
        }
    }

    let results = heap
        .into_sorted_vec()
        .into_iter()
        .map(|Reverse(candidate)| ClassificationResult {
            label: labels.as_slice()[candidate.index].clone(),
            confidence: candidate.score,
        })
        .collect();

    Ok(results)
}
