//! Basic example demonstrating logmeans-rs usage
//!
//! Run with: cargo run --example basic --release

use logmeans_rs::{Elbow, KMeans, KMeansConfig, LogMeans};
use ndarray::Array2;
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;

fn main() {
    println!("=== logmeans-rs example ===\n");

    // Synthetic data: 3 clusters in 2D, one point per column
    let n_samples = 300;
    let n_features = 2;
    let n_clusters = 3;

    println!("Generating {} samples with {} features...", n_samples, n_features);

    let centers = [[-5.0, -5.0], [0.0, 5.0], [5.0, -5.0]];
    let noise = Array2::random((n_features, n_samples), Uniform::new(-1.0, 1.0));
    let data = Array2::from_shape_fn((n_features, n_samples), |(r, c)| {
        centers[c % n_clusters][r] + noise[[r, c]]
    });

    println!("True cluster centers:");
    for (i, center) in centers.iter().enumerate() {
        println!("  Cluster {}: ({:.2}, {:.2})", i, center[0], center[1]);
    }
    println!();

    let config = KMeansConfig::new().with_tol(1e-6).with_seed(42);

    // Fixed k
    println!("Running k-means with k={}...", n_clusters);
    let result = KMeans::with_config(config.clone())
        .run(&data.view(), n_clusters)
        .expect("k-means failed");
    println!(
        "  {} iterations, mse {:.4}, converged: {}",
        result.n_iterations, result.mse, result.converged
    );
    for (i, centroid) in result.centers.outer_iter().enumerate() {
        println!("  Centroid {}: ({:.4}, {:.4})", i, centroid[0], centroid[1]);
    }

    let mut cluster_counts = vec![0usize; n_clusters];
    for &label in result.catalog.iter() {
        cluster_counts[label as usize] += 1;
    }
    println!("Cluster distribution:");
    for (i, count) in cluster_counts.iter().enumerate() {
        println!(
            "  Cluster {}: {} samples ({:.1}%)",
            i,
            count,
            (*count as f64 / n_samples as f64) * 100.0
        );
    }
    println!();

    // Search k without knowing it
    let range = 2..=30;
    println!("Searching k in {:?}...", range);

    let elbow = Elbow::new(config.clone())
        .search(&data.view(), range.clone())
        .expect("elbow failed");
    println!(
        "  Elbow:    k = {} after {} k-means runs",
        elbow.k(),
        elbow.history.len()
    );

    let logmeans = LogMeans::new(config);
    let found = logmeans
        .search(&data.view(), range)
        .expect("logmeans failed");
    println!(
        "  LogMeans: k = {} after {} k-means runs",
        found.k(),
        found.history.len()
    );
    for (k, mse) in &found.history {
        println!("    k = {:>2}  mse = {:.4}", k, mse);
    }

    println!("\nLogMeans trace:");
    print!("{}", logmeans.profiler());

    println!("\n=== Done! ===");
}
