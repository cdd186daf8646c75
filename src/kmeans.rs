use crate::algorithm::{lloyd, KMeansResult};
use crate::config::KMeansConfig;
use crate::error::Result;
use crate::profiler::Profiler;
use ndarray::ArrayView2;

/// Lloyd's k-means engine.
///
/// The number of clusters is chosen per call, so one engine can be driven
/// through a whole range of k by the cluster-count searches. Every run is
/// bracketed by a `KMeans` scope on the engine's [`Profiler`].
///
/// # Example
///
/// ```
/// use logmeans_rs::KMeans;
/// use ndarray::Array2;
/// use ndarray_rand::RandomExt;
/// use ndarray_rand::rand_distr::Uniform;
///
/// // 8 dimensions, 500 points (one per column)
/// let data = Array2::random((8, 500), Uniform::new(-1.0, 1.0));
///
/// let kmeans = KMeans::new();
/// let result = kmeans.run(&data.view(), 10).unwrap();
/// assert_eq!(result.catalog.len(), 500);
/// ```
#[derive(Debug, Clone, Default)]
pub struct KMeans {
    /// Model configuration
    config: KMeansConfig,

    /// Trace every run records into
    profiler: Profiler,
}

impl KMeans {
    /// Create an engine with default configuration and its own trace.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an engine with custom configuration and its own trace.
    pub fn with_config(config: KMeansConfig) -> Self {
        Self {
            config,
            profiler: Profiler::new(),
        }
    }

    /// Create an engine that records into an existing trace.
    pub fn with_profiler(config: KMeansConfig, profiler: Profiler) -> Self {
        Self { config, profiler }
    }

    /// Cluster `data` (points as columns) into `k` groups.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `k` is 0
    /// - There are fewer points than `k`
    /// - The dataset has no dimensions
    pub fn run(&self, data: &ArrayView2<f64>, k: usize) -> Result<KMeansResult> {
        let _scope = self.profiler.scope("KMeans");
        lloyd(data, k, &self.config, &self.profiler)
    }

    /// Get the configuration.
    pub fn config(&self) -> &KMeansConfig {
        &self.config
    }

    /// Get the trace this engine records into.
    pub fn profiler(&self) -> &Profiler {
        &self.profiler
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClusterError;
    use crate::profiler::{Info, ENTER, LEAVE};
    use ndarray::Array2;
    use ndarray_rand::rand_distr::Uniform;
    use ndarray_rand::RandomExt;

    #[test]
    fn test_kmeans_run() {
        let data = Array2::random((16, 300), Uniform::new(-1.0, 1.0));
        let kmeans = KMeans::new();

        let result = kmeans.run(&data.view(), 5).unwrap();

        assert_eq!(result.catalog.len(), 300);
        assert_eq!(result.centers.dim(), (5, 16));
        assert!(result.catalog.iter().all(|&c| c < 5));
    }

    #[test]
    fn test_kmeans_run_is_scoped() {
        let data = Array2::random((2, 50), Uniform::new(-1.0, 1.0));
        let kmeans = KMeans::new();
        kmeans.run(&data.view(), 3).unwrap();

        let entries: Vec<_> = kmeans.profiler().iter().collect();
        let newest = entries.first().unwrap();
        let oldest = entries.last().unwrap();
        assert_eq!(newest.tag(), "KMeans");
        assert_eq!(newest.info(), Some(&Info::Static(LEAVE)));
        assert_eq!(oldest.tag(), "KMeans");
        assert_eq!(oldest.info(), Some(&Info::Static(ENTER)));
    }

    #[test]
    fn test_kmeans_error_still_leaves_scope() {
        let data = Array2::random((2, 3), Uniform::new(-1.0, 1.0));
        let kmeans = KMeans::new();

        let result = kmeans.run(&data.view(), 4);
        assert!(matches!(result, Err(ClusterError::InsufficientData(_))));
        assert_eq!(kmeans.profiler().len(), 2);
    }

    #[test]
    fn test_kmeans_shares_profiler() {
        let profiler = Profiler::new();
        let kmeans = KMeans::with_profiler(KMeansConfig::default(), profiler.clone());
        let data = Array2::random((2, 40), Uniform::new(-1.0, 1.0));

        kmeans.run(&data.view(), 2).unwrap();

        assert!(profiler.shares_chain_with(kmeans.profiler()));
        assert_eq!(profiler.len(), kmeans.profiler().len());
        assert!(profiler.len() >= 4);
    }

    #[test]
    fn test_kmeans_seed_is_reproducible() {
        let data = Array2::random((4, 400), Uniform::new(-1.0, 1.0));
        let config = KMeansConfig::default().with_seed(42);

        let a = KMeans::with_config(config.clone()).run(&data.view(), 6).unwrap();
        let b = KMeans::with_config(config).run(&data.view(), 6).unwrap();

        assert_eq!(a.catalog, b.catalog);
        assert_eq!(a.mse, b.mse);
        assert_eq!(a.n_iterations, b.n_iterations);
    }
}
