//! # logmeans-rs
//!
//! Lloyd's k-means clustering with cluster-count search, compatible with ndarray.
//!
//! ## Features
//!
//! - **Lloyd's k-means**: band-seeded centres, parallel assignment with an
//!   ordered reduction, empty-cluster reseeding
//! - **Elbow search**: evaluates every k of a range and picks the largest
//!   `mse(k - 1) / mse(k)` improvement
//! - **LogMeans search**: heap-driven bisection of the most promising k-interval,
//!   plus a single-frontier binary-search variant
//! - **Lock-free profiler**: concurrent, append-only timing trace with scoped
//!   ENTER/LEAVE markers and a JSON form
//!
//! Datasets are `dims × n` matrices: column j is point j.
//!
//! ## Example
//!
//! ```rust
//! use logmeans_rs::{LogMeans, KMeansConfig};
//! use ndarray::Array2;
//! use ndarray_rand::RandomExt;
//! use ndarray_rand::rand_distr::Uniform;
//!
//! // 10 dimensions, 100 points
//! let data = Array2::random((10, 100), Uniform::new(-1.0, 1.0));
//!
//! let logmeans = LogMeans::new(KMeansConfig::default());
//! let result = logmeans.search(&data.view(), 2..=50).unwrap();
//!
//! let (k, mse) = result.best();
//! assert!((2..=50).contains(&k));
//! assert_eq!(result.catalog.len(), 100);
//! println!("selected k = {} (mse {})", k, mse);
//!
//! // Timing trace of the whole search, oldest first
//! let trace = logmeans.profiler().to_json();
//! assert!(trace.as_array().unwrap().len() > 0);
//! ```
//!
//! ## Custom Configuration
//!
//! ```rust
//! use logmeans_rs::{Elbow, KMeansConfig};
//! use ndarray::Array2;
//! use ndarray_rand::RandomExt;
//! use ndarray_rand::rand_distr::Uniform;
//!
//! let data = Array2::random((4, 200), Uniform::new(-1.0, 1.0));
//!
//! let config = KMeansConfig::new()
//!     .with_tol(1e-8)
//!     .with_max_iters(Some(100))
//!     .with_seed(42);
//!
//! let result = Elbow::new(config).search(&data.view(), 1..=8).unwrap();
//! assert_eq!(result.history.len(), 8);
//! ```

mod algorithm;
mod config;
pub mod dataset;
mod distance;
mod elbow;
mod error;
mod heap;
pub mod io;
mod kmeans;
mod logmeans;
pub mod profiler;
mod search;

pub use algorithm::KMeansResult;
pub use config::KMeansConfig;
pub use dataset::{Catalog, DataSet, MseHistory};
pub use elbow::Elbow;
pub use error::{ClusterError, Result};
pub use kmeans::KMeans;
pub use logmeans::LogMeans;
pub use profiler::{Profiler, Scope, TraceReporter};
pub use search::{SearchResult, Strategy};

use ndarray::ArrayView2;
use std::ops::RangeInclusive;

/// Cluster `data` into `k` groups with the default configuration.
///
/// Returns the catalog and the mean point-to-centre distance.
pub fn kmeans(data: &ArrayView2<f64>, k: usize) -> Result<(Catalog, f64)> {
    let result = KMeans::new().run(data, k)?;
    Ok((result.catalog, result.mse))
}

/// Elbow scan over `k_range` with the default configuration.
pub fn elbow(data: &ArrayView2<f64>, k_range: RangeInclusive<usize>) -> Result<SearchResult> {
    Elbow::default().search(data, k_range)
}

/// Heap-driven LogMeans search over `k_range` with the default configuration.
pub fn logmeans(data: &ArrayView2<f64>, k_range: RangeInclusive<usize>) -> Result<SearchResult> {
    LogMeans::default().search(data, k_range)
}

/// Binary-search LogMeans over `k_range` with the default configuration.
pub fn logmeans_binary_search(
    data: &ArrayView2<f64>,
    k_range: RangeInclusive<usize>,
) -> Result<SearchResult> {
    LogMeans::default().binary_search(data, k_range)
}
