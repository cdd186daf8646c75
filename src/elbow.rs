use crate::config::KMeansConfig;
use crate::dataset::MseHistory;
use crate::error::Result;
use crate::kmeans::KMeans;
use crate::profiler::{Info, Profiler};
use crate::search::{validate_range, SearchResult};
use ndarray::ArrayView2;
use std::ops::RangeInclusive;
use tracing::{debug, info};

/// Linear elbow scan.
///
/// Runs k-means at every k of the range and selects the k with the largest
/// improvement ratio `mse(k - 1) / mse(k)`. The first k of the range has no
/// predecessor and is only selected when the range holds a single value.
#[derive(Debug, Clone)]
pub struct Elbow {
    kmeans: KMeans,
    profiler: Profiler,
}

impl Default for Elbow {
    fn default() -> Self {
        Self::new(KMeansConfig::default())
    }
}

impl Elbow {
    pub fn new(config: KMeansConfig) -> Self {
        Self::with_profiler(config, Profiler::new())
    }

    /// Record the scan, and every inner k-means run, into `profiler`.
    pub fn with_profiler(config: KMeansConfig, profiler: Profiler) -> Self {
        Self {
            kmeans: KMeans::with_profiler(config, profiler.clone()),
            profiler,
        }
    }

    pub fn profiler(&self) -> &Profiler {
        &self.profiler
    }

    pub fn search(&self, data: &ArrayView2<f64>, k_range: RangeInclusive<usize>) -> Result<SearchResult> {
        let (min_k, max_k) = validate_range(&k_range, data.ncols())?;
        let _scope = self.profiler.scope("Elbow");

        let mut history = MseHistory::with_capacity(max_k - min_k + 1);

        let first = self.kmeans.run(data, min_k)?;
        history.push((min_k, first.mse));
        let mut catalog = first.catalog;
        let mut answer = 0;
        let mut best_ratio = f64::NEG_INFINITY;

        for k in min_k + 1..=max_k {
            let prev_mse = history[history.len() - 1].1;
            let result = self.kmeans.run(data, k)?;
            let ratio = prev_mse / result.mse;

            history.push((k, result.mse));
            if ratio > best_ratio {
                best_ratio = ratio;
                answer = history.len() - 1;
                catalog = result.catalog;
            }

            debug!(k, mse = result.mse, ratio, "elbow step");
            self.profiler
                .time("Elbow-iter", Some(Info::Text(format!("{} {}", k, result.mse))));
        }

        let (k, mse) = history[answer];
        info!(k, mse, evaluations = history.len(), "elbow selected k");

        Ok(SearchResult {
            catalog,
            history,
            answer,
        })
    }
}
