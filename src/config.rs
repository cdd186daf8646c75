/// Configuration for a single Lloyd's k-means run
///
/// The number of clusters is not part of the configuration: the cluster-count
/// searches drive one [`KMeans`](crate::KMeans) through many values of k.
#[derive(Debug, Clone)]
pub struct KMeansConfig {
    /// Convergence tolerance. A run stops once the Frobenius norm of the
    /// centre displacement between two iterations drops below this threshold.
    pub tol: f64,

    /// Optional hard cap on the number of Lloyd iterations.
    ///
    /// `None` (the default) loops until `tol` is met, which on pathological
    /// inputs may never happen.
    pub max_iters: Option<usize>,

    /// Random seed for centre initialization and empty-cluster reseeding
    pub seed: u64,
}

impl Default for KMeansConfig {
    fn default() -> Self {
        Self {
            tol: 1e-6,
            max_iters: None,
            seed: 0,
        }
    }
}

impl KMeansConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the convergence tolerance
    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    /// Set (or clear) the iteration cap
    pub fn with_max_iters(mut self, max_iters: Option<usize>) -> Self {
        self.max_iters = max_iters;
        self
    }

    /// Set the random seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}
