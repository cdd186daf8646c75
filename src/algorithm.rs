use crate::config::KMeansConfig;
use crate::dataset::Catalog;
use crate::distance::{center_shift, nearest_center};
use crate::error::{ClusterError, Result};
use crate::profiler::{Info, Profiler};
use ndarray::{Array1, Array2, ArrayView2};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use std::time::Instant;
use tracing::{debug, warn};

/// Points handled by one parallel task of the assignment pass
const CHUNK_POINTS: usize = 4096;

/// Result of one Lloyd's run
#[derive(Debug, Clone)]
pub struct KMeansResult {
    /// Cluster id of every point
    pub catalog: Catalog,
    /// Mean distance from each point to its assigned centre
    pub mse: f64,
    /// Final centres, one per row, shape `(k, dims)`
    pub centers: Array2<f64>,
    pub n_iterations: usize,
    /// False only when the run stopped on `max_iters`
    pub converged: bool,
}

/// Per-chunk accumulators of the assignment pass
struct Partial {
    sums: Array2<f64>,
    counts: Vec<usize>,
    distance: f64,
}

impl Partial {
    fn zeros(k: usize, dims: usize) -> Self {
        Self {
            sums: Array2::zeros((k, dims)),
            counts: vec![0; k],
            distance: 0.0,
        }
    }

    fn merge(mut self, other: Partial) -> Self {
        self.sums += &other.sums;
        for (count, other_count) in self.counts.iter_mut().zip(other.counts) {
            *count += other_count;
        }
        self.distance += other.distance;
        self
    }
}

/// Run Lloyd's algorithm for a fixed `k` on `data` (points as columns).
///
/// Records `KMeans-init` once the centres are seeded and `KMeans-iter` (with
/// the iteration index and current mse as info) after every iteration.
///
/// Without `config.max_iters` the loop only ends when the centre shift falls
/// below `config.tol`.
#[tracing::instrument(level = "debug", skip(data, config, profiler))]
pub fn lloyd(
    data: &ArrayView2<f64>,
    k: usize,
    config: &KMeansConfig,
    profiler: &Profiler,
) -> Result<KMeansResult> {
    let dims = data.nrows();
    let n_points = data.ncols();

    // Validate inputs
    if dims == 0 {
        return Err(ClusterError::InvalidDimensions(
            "dataset must have at least one dimension".to_string(),
        ));
    }

    if k == 0 {
        return Err(ClusterError::InvalidK(
            "k must be greater than 0".to_string(),
        ));
    }

    if n_points < k {
        return Err(ClusterError::InsufficientData(format!(
            "Number of points ({}) is less than k ({})",
            n_points, k
        )));
    }

    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let mut centers = initialize_centers(data, k, &mut rng);
    profiler.mark("KMeans-init");

    let mut labels = vec![0u32; n_points];
    let mut n_iterations = 0;

    let (mse, converged) = loop {
        let iter_start = Instant::now();

        let partial = assign_points(data, &centers.view(), &mut labels);
        let mse = partial.distance / n_points as f64;

        // Compute new centres
        let mut new_centers = partial.sums;
        let mut empty_clusters = 0;
        for (c, &count) in partial.counts.iter().enumerate() {
            if count > 0 {
                new_centers
                    .row_mut(c)
                    .mapv_inplace(|v| v / count as f64);
            } else {
                let j = rng.gen_range(0..n_points);
                new_centers.row_mut(c).assign(&data.column(j));
                empty_clusters += 1;
            }
        }

        if empty_clusters > 0 {
            debug!(k, empty_clusters, "reseeded empty clusters");
        }

        let shift = center_shift(&centers.view(), &new_centers.view());
        centers = new_centers;

        profiler.time(
            "KMeans-iter",
            Some(Info::Text(format!("{} {}", n_iterations, mse))),
        );
        debug!(
            k,
            iteration = n_iterations,
            mse,
            shift,
            secs = iter_start.elapsed().as_secs_f64(),
            "lloyd iteration"
        );
        n_iterations += 1;

        // Check convergence
        if shift < config.tol {
            debug!(k, n_iterations, mse, "converged");
            break (mse, true);
        }

        if config.max_iters.is_some_and(|max| n_iterations >= max) {
            warn!(k, n_iterations, shift, "stopped on iteration cap before converging");
            break (mse, false);
        }
    };

    Ok(KMeansResult {
        catalog: Array1::from_vec(labels),
        mse,
        centers,
        n_iterations,
        converged,
    })
}

/// Seed one centre per contiguous band of points.
///
/// Band i covers `[i*n/k, (i+1)*n/k)`, so a sorted or grouped dataset still
/// yields k distinct seeds.
fn initialize_centers(data: &ArrayView2<f64>, k: usize, rng: &mut ChaCha8Rng) -> Array2<f64> {
    let n_points = data.ncols();
    let dims = data.nrows();

    let mut centers = Array2::zeros((k, dims));
    for (i, mut center) in centers.outer_iter_mut().enumerate() {
        let lo = i * n_points / k;
        let hi = (i + 1) * n_points / k;
        let j = rng.gen_range(lo..hi);
        center.assign(&data.column(j));
    }

    centers
}

/// Assign every point to its nearest centre, writing `labels` in place, and
/// accumulate per-cluster sums, counts and total distance.
///
/// Chunks run in parallel and are merged in index order.
fn assign_points(data: &ArrayView2<f64>, centers: &ArrayView2<f64>, labels: &mut [u32]) -> Partial {
    let k = centers.nrows();
    let dims = centers.ncols();

    let partials: Vec<Partial> = labels
        .par_chunks_mut(CHUNK_POINTS)
        .enumerate()
        .map(|(chunk_idx, chunk)| {
            let start = chunk_idx * CHUNK_POINTS;
            let mut acc = Partial::zeros(k, dims);
            for (offset, label) in chunk.iter_mut().enumerate() {
                let point = data.column(start + offset);
                let (c, dist) = nearest_center(&point, centers);
                *label = c as u32;
                acc.counts[c] += 1;
                acc.sums
                    .row_mut(c)
                    .zip_mut_with(&point, |sum, &x| *sum += x);
                acc.distance += dist;
            }
            acc
        })
        .collect();

    partials
        .into_iter()
        .fold(Partial::zeros(k, dims), Partial::merge)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::{array, Array2};
    use ndarray_rand::rand_distr::Uniform;
    use ndarray_rand::RandomExt;

    fn one_to_fifteen() -> Array2<f64> {
        // 3 dims x 5 points, column-major 1..15
        Array2::from_shape_fn((3, 5), |(r, c)| (c * 3 + r + 1) as f64)
    }

    #[test]
    fn test_initialize_centers_one_per_band() {
        // Sorted 1-d points: 0..10
        let data = Array2::from_shape_fn((1, 10), |(_, c)| c as f64);
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        let centers = initialize_centers(&data.view(), 5, &mut rng);

        assert_eq!(centers.dim(), (5, 1));
        for (i, center) in centers.outer_iter().enumerate() {
            let v = center[0] as usize;
            assert!((2 * i..2 * i + 2).contains(&v), "centre {} = {}", i, v);
        }
    }

    #[test]
    fn test_lloyd_small_scenario() {
        let data = one_to_fifteen();
        let result = lloyd(&data.view(), 2, &KMeansConfig::default(), &Profiler::new()).unwrap();

        assert_eq!(result.catalog.len(), 5);
        assert!(result.catalog.iter().all(|&c| c < 2));
        assert!(result.mse.is_finite() && result.mse >= 0.0);
        assert!(result.converged);
    }

    #[test]
    fn test_lloyd_two_obvious_groups() {
        let data = array![[0.0, 0.1, 0.2, 10.0, 10.1, 10.2]];
        let result = lloyd(&data.view(), 2, &KMeansConfig::default(), &Profiler::new()).unwrap();

        let c = &result.catalog;
        assert_eq!(c[0], c[1]);
        assert_eq!(c[1], c[2]);
        assert_eq!(c[3], c[4]);
        assert_eq!(c[4], c[5]);
        assert_ne!(c[0], c[3]);
        // Each point sits 0.1 or 0 from its group mean
        assert_relative_eq!(result.mse, 0.4 / 6.0, epsilon = 1e-9);
    }

    #[test]
    fn test_lloyd_k_equals_n_has_zero_mse() {
        let data = Array2::random((4, 10), Uniform::new(-1.0, 1.0));
        let result = lloyd(&data.view(), 10, &KMeansConfig::default(), &Profiler::new()).unwrap();

        assert_relative_eq!(result.mse, 0.0, epsilon = 1e-12);
        let mut labels = result.catalog.to_vec();
        labels.sort_unstable();
        assert_eq!(labels, (0..10).collect::<Vec<u32>>());
    }

    #[test]
    fn test_lloyd_records_profile_marks() {
        let data = Array2::random((3, 200), Uniform::new(-1.0, 1.0));
        let profiler = Profiler::new();
        let result = lloyd(&data.view(), 4, &KMeansConfig::default(), &profiler).unwrap();

        let inits = profiler.iter().filter(|e| e.tag() == "KMeans-init").count();
        let iters: Vec<_> = profiler.iter().filter(|e| e.tag() == "KMeans-iter").collect();
        assert_eq!(inits, 1);
        assert_eq!(iters.len(), result.n_iterations);

        // Newest iteration carries the final index and mse
        let info = iters[0].info().unwrap().text();
        assert_eq!(info, format!("{} {}", result.n_iterations - 1, result.mse));
    }

    #[test]
    fn test_lloyd_iteration_cap() {
        let data = Array2::random((8, 500), Uniform::new(-1.0, 1.0));
        let config = KMeansConfig::default().with_tol(-1.0).with_max_iters(Some(3));
        let result = lloyd(&data.view(), 5, &config, &Profiler::new()).unwrap();

        assert_eq!(result.n_iterations, 3);
        assert!(!result.converged);
    }

    #[test]
    fn test_lloyd_rejects_bad_k() {
        let data = one_to_fifteen();
        let profiler = Profiler::new();

        let zero = lloyd(&data.view(), 0, &KMeansConfig::default(), &profiler);
        assert!(matches!(zero, Err(ClusterError::InvalidK(_))));

        let too_many = lloyd(&data.view(), 6, &KMeansConfig::default(), &profiler);
        assert!(matches!(too_many, Err(ClusterError::InsufficientData(_))));

        // Nothing was recorded for rejected runs
        assert!(profiler.is_empty());
    }

    #[test]
    fn test_lloyd_rejects_empty_dims() {
        let data = Array2::<f64>::zeros((0, 5));
        let result = lloyd(&data.view(), 2, &KMeansConfig::default(), &Profiler::new());
        assert!(matches!(result, Err(ClusterError::InvalidDimensions(_))));
    }

    #[test]
    fn test_assignment_spans_many_chunks() {
        let n = CHUNK_POINTS * 2 + 17;
        let data = Array2::from_shape_fn((1, n), |(_, c)| if c % 2 == 0 { 0.0 } else { 100.0 });
        let centers = array![[0.0], [100.0]];
        let mut labels = vec![0u32; n];

        let partial = assign_points(&data.view(), &centers.view(), &mut labels);

        assert_eq!(partial.counts.iter().sum::<usize>(), n);
        assert_eq!(partial.counts[0], (n + 1) / 2);
        assert_relative_eq!(partial.distance, 0.0);
        assert!(labels.iter().enumerate().all(|(j, &l)| l as usize == j % 2));
    }
}
