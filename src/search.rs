use crate::config::KMeansConfig;
use crate::dataset::{Catalog, MseHistory};
use crate::elbow::Elbow;
use crate::error::{ClusterError, Result};
use crate::logmeans::LogMeans;
use crate::profiler::Profiler;
use ndarray::ArrayView2;
use std::ops::RangeInclusive;

/// Outcome of a cluster-count search.
#[derive(Debug, Clone)]
pub struct SearchResult {
    /// Clustering at the selected k
    pub catalog: Catalog,
    /// Every `(k, mse)` evaluated, in evaluation order
    pub history: MseHistory,
    /// Index into `history` of the selected `(k, mse)`
    pub answer: usize,
}

impl SearchResult {
    /// The selected `(k, mse)` pair.
    pub fn best(&self) -> (usize, f64) {
        self.history[self.answer]
    }

    /// The selected number of clusters.
    pub fn k(&self) -> usize {
        self.best().0
    }

    /// The error at the selected number of clusters.
    pub fn mse(&self) -> f64 {
        self.best().1
    }
}

/// Check a search range against the number of points and return its bounds.
pub(crate) fn validate_range(k_range: &RangeInclusive<usize>, n_points: usize) -> Result<(usize, usize)> {
    let (min_k, max_k) = (*k_range.start(), *k_range.end());

    if min_k == 0 {
        return Err(ClusterError::InvalidK(
            "minimum k must be greater than 0".to_string(),
        ));
    }

    if min_k > max_k {
        return Err(ClusterError::InvalidRange(format!(
            "minimum k ({}) exceeds maximum k ({})",
            min_k, max_k
        )));
    }

    if max_k > n_points {
        return Err(ClusterError::InsufficientData(format!(
            "Number of points ({}) is less than maximum k ({})",
            n_points, max_k
        )));
    }

    Ok((min_k, max_k))
}

/// Cluster-count search strategy, selectable at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Evaluate every k in the range.
    Elbow,
    /// Heap-driven refinement of the most promising interval.
    LogMeans,
    /// Single-frontier halving toward the steeper side.
    BinarySearch,
}

impl Strategy {
    /// Run this strategy, recording into `profiler`.
    pub fn run(
        self,
        config: KMeansConfig,
        profiler: Profiler,
        data: &ArrayView2<f64>,
        k_range: RangeInclusive<usize>,
    ) -> Result<SearchResult> {
        match self {
            Strategy::Elbow => Elbow::with_profiler(config, profiler).search(data, k_range),
            Strategy::LogMeans => LogMeans::with_profiler(config, profiler).search(data, k_range),
            Strategy::BinarySearch => {
                LogMeans::with_profiler(config, profiler).binary_search(data, k_range)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_range() {
        assert_eq!(validate_range(&(2..=5), 10).unwrap(), (2, 5));
        assert_eq!(validate_range(&(3..=3), 3).unwrap(), (3, 3));

        assert!(matches!(
            validate_range(&(0..=5), 10),
            Err(ClusterError::InvalidK(_))
        ));
        assert!(matches!(
            validate_range(&(6..=5), 10),
            Err(ClusterError::InvalidRange(_))
        ));
        assert!(matches!(
            validate_range(&(2..=11), 10),
            Err(ClusterError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_search_result_best() {
        let result = SearchResult {
            catalog: Catalog::zeros(4),
            history: vec![(2, 1.0), (8, 0.25), (5, 0.5)],
            answer: 2,
        };
        assert_eq!(result.best(), (5, 0.5));
        assert_eq!(result.k(), 5);
        assert_eq!(result.mse(), 0.5);
    }
}
