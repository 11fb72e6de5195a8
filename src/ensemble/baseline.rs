//! Majority-vote baseline.

use crate::primitives::Matrix;

/// Labels an instance outlier when more than half of its votes say so.
///
/// ```
/// use autood::ensemble::majority_vote;
/// use autood::primitives::Matrix;
///
/// let votes = Matrix::from_vec(3, 4, vec![1, 1, 1, 0, 1, 1, 0, 0, 0, 0, 0, 1])
///     .expect("3x4 votes");
/// assert_eq!(majority_vote(&votes), vec![1, 0, 0]);
/// ```
#[must_use]
pub fn majority_vote(votes: &Matrix<u8>) -> Vec<usize> {
    let n_columns = votes.n_cols();
    votes
        .row_sums()
        .into_iter()
        .map(|sum| usize::from(2 * sum > n_columns))
        .collect()
}
