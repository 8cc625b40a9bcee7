//! Brute-force descriptor matching.
//!
//! Two policies, selected by the detector family rather than by the data:
//! floating-point descriptors go through a 2-nearest-neighbor search with
//! Lowe's ratio test, binary descriptors through a plain nearest-neighbor
//! search whose output is sorted by Hamming distance. Both are exhaustive
//! O(|A|·|B|) scans; the descriptor sets of a single image pair are small
//! enough that nothing smarter is warranted.

use itertools::{izip, Itertools};
use ndarray::ArrayView2;

/// A correspondence between descriptor row `query_idx` of image A and
/// descriptor row `train_idx` of image B.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Match {
    pub query_idx: usize,
    pub train_idx: usize,
    /// Euclidean distance for float descriptors, bit mismatch count for
    /// binary descriptors. Always non-negative.
    pub distance: f32,
}

/// 2-NN matching under Euclidean distance with Lowe's ratio test.
///
/// A query is kept only if its best match is clearly better than its second
/// best: `d_best < ratio_thresh * d_second`. With a single candidate in `b`
/// there is no second neighbor to compare against and the best match is kept
/// as unambiguous. The output is ordered by query index and deliberately not
/// re-sorted by distance.
pub(crate) fn match_ratio_test(
    a: &ArrayView2<f32>,
    b: &ArrayView2<f32>,
    ratio_thresh: f32,
) -> Vec<Match> {
    let mut matches = Vec::new();
    for (query_idx, va) in a.rows().into_iter().enumerate() {
        let mut best_idx = 0;
        let mut best_sq = f32::INFINITY;
        let mut second_sq = f32::INFINITY;
        for (train_idx, vb) in b.rows().into_iter().enumerate() {
            let d_sq: f32 = izip!(va.iter(), vb.iter())
                .map(|(x, y)| (x - y) * (x - y))
                .sum();
            if d_sq < best_sq {
                second_sq = best_sq;
                best_sq = d_sq;
                best_idx = train_idx;
            } else if d_sq < second_sq {
                second_sq = d_sq;
            }
        }
        let distance = best_sq.sqrt();
        if distance < ratio_thresh * second_sq.sqrt() {
            matches.push(Match {
                query_idx,
                train_idx: best_idx,
                distance,
            });
        }
    }
    matches
}

/// 1-NN matching under Hamming distance, no filtering.
///
/// Every query row produces exactly one match (ties broken by the lowest
/// train index). The output is sorted ascending by distance so that the best
/// correspondences come first.
pub(crate) fn match_hamming(a: &ArrayView2<u8>, b: &ArrayView2<u8>) -> Vec<Match> {
    a.rows()
        .into_iter()
        .enumerate()
        .map(|(query_idx, va)| {
            let mut best_idx = 0;
            let mut best_dist = u32::MAX;
            for (train_idx, vb) in b.rows().into_iter().enumerate() {
                let dist: u32 = izip!(va.iter(), vb.iter())
                    .map(|(x, y)| (x ^ y).count_ones())
                    .sum();
                if dist < best_dist {
                    best_dist = dist;
                    best_idx = train_idx;
                }
            }
            Match {
                query_idx,
                train_idx: best_idx,
                distance: best_dist as f32,
            }
        })
        .sorted_by(|m, n| m.distance.total_cmp(&n.distance))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};

    fn float_set() -> Array2<f32> {
        array![
            [0.0, 0.0, 1.0],
            [10.0, 0.0, 0.0],
            [0.0, 5.0, 5.0],
            [3.0, 3.0, 3.0],
        ]
    }

    #[test]
    fn ratio_test_invariant_holds_for_every_retained_match() {
        let a = float_set();
        let b = array![
            [0.1, 0.0, 1.0],
            [9.0, 1.0, 0.0],
            [0.0, 5.0, 4.0],
            [50.0, 50.0, 50.0],
        ];
        let thresh = 0.8;
        let matches = match_ratio_test(&a.view(), &b.view(), thresh);
        assert!(!matches.is_empty());
        for m in &matches {
            let va = a.row(m.query_idx);
            // Recompute the two smallest distances independently.
            let mut dists: Vec<f32> = b
                .rows()
                .into_iter()
                .map(|vb| {
                    izip!(va.iter(), vb.iter())
                        .map(|(x, y)| (x - y) * (x - y))
                        .sum::<f32>()
                        .sqrt()
                })
                .collect();
            dists.sort_by(f32::total_cmp);
            assert!((m.distance - dists[0]).abs() < 1e-5);
            assert!(m.distance < thresh * dists[1]);
        }
    }

    #[test]
    fn ratio_test_output_is_in_query_order() {
        let a = float_set();
        let b = float_set();
        let matches = match_ratio_test(&a.view(), &b.view(), 0.6);
        let idxs: Vec<usize> = matches.iter().map(|m| m.query_idx).collect();
        let mut sorted = idxs.clone();
        sorted.sort_unstable();
        assert_eq!(idxs, sorted);
    }

    #[test]
    fn raising_the_threshold_never_loses_matches() {
        let a = float_set();
        let b = array![
            [0.2, 0.1, 1.0],
            [8.0, 1.0, 1.0],
            [1.0, 4.0, 5.0],
            [2.0, 4.0, 2.0],
            [3.5, 2.5, 3.0],
        ];
        let mut previous = 0;
        for thresh in [0.1, 0.3, 0.5, 0.6, 0.75, 0.9, 0.99] {
            let count = match_ratio_test(&a.view(), &b.view(), thresh).len();
            assert!(
                count >= previous,
                "count dropped from {previous} to {count} at thresh {thresh}"
            );
            previous = count;
        }
    }

    #[test]
    fn identical_sets_self_match_at_zero_distance() {
        let a = float_set();
        let matches = match_ratio_test(&a.view(), &a.view(), 0.6);
        assert_eq!(matches.len(), a.nrows());
        for (i, m) in matches.iter().enumerate() {
            assert_eq!(m.query_idx, i);
            assert_eq!(m.train_idx, i);
            assert_eq!(m.distance, 0.0);
        }
    }

    #[test]
    fn single_candidate_is_kept_without_a_second_neighbor() {
        let a = array![[1.0f32, 2.0], [3.0, 4.0]];
        let b = array![[1.0f32, 2.5]];
        let matches = match_ratio_test(&a.view(), &b.view(), 0.6);
        assert_eq!(matches.len(), 2);
        assert!(matches.iter().all(|m| m.train_idx == 0));
    }

    #[test]
    fn hamming_matches_every_query_and_sorts_by_distance() {
        let a = array![[0b1111_0000u8, 0x00], [0x00, 0x01], [0xff, 0xff]];
        let b = array![[0x00u8, 0x00], [0xff, 0x0f]];
        let matches = match_hamming(&a.view(), &b.view());
        assert_eq!(matches.len(), a.nrows());
        for w in matches.windows(2) {
            assert!(w[0].distance <= w[1].distance);
        }
        // Every query index appears exactly once.
        let mut queries: Vec<usize> = matches.iter().map(|m| m.query_idx).collect();
        queries.sort_unstable();
        assert_eq!(queries, vec![0, 1, 2]);
    }

    #[test]
    fn hamming_distance_counts_bit_mismatches() {
        let a = array![[0b1010_1010u8]];
        let b = array![[0b0101_0101u8], [0b1010_1011]];
        let matches = match_hamming(&a.view(), &b.view());
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].train_idx, 1);
        assert_eq!(matches[0].distance, 1.0);
    }

    #[test]
    fn hamming_ties_break_to_the_lowest_train_index() {
        let a = array![[0x0fu8]];
        let b = array![[0x1fu8], [0x0e], [0x0f]];
        // Exact match at index 2 wins; equal distances elsewhere prefer the
        // earlier row.
        let matches = match_hamming(&a.view(), &b.view());
        assert_eq!(matches[0].train_idx, 2);

        let b_ties = array![[0x1fu8], [0x0e]];
        let matches = match_hamming(&a.view(), &b_ties.view());
        assert_eq!(matches[0].train_idx, 0);
    }

    #[test]
    fn hamming_result_is_never_filtered() {
        let far_a: Array2<u8> = Array2::zeros((3, 4));
        let far_b = Array2::from_elem((2, 4), 0xffu8);
        let matches = match_hamming(&far_a.view(), &far_b.view());
        assert_eq!(matches.len(), 3);
        assert!(matches.iter().all(|m| m.distance == 32.0));
    }
}
