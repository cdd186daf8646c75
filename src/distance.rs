use ndarray::{ArrayView1, ArrayView2, Zip};
use rayon::prelude::*;

/// Euclidean distance between two points of the same dimension
#[inline]
pub fn euclidean(a: &ArrayView1<f64>, b: &ArrayView1<f64>) -> f64 {
    Zip::from(a)
        .and(b)
        .fold(0.0f64, |acc, &x, &y| {
            let d = x - y;
            acc + d * d
        })
        .sqrt()
}

/// Find the nearest centre for one point
///
/// `centers` holds one centre per row, shape `(k, dims)`. Ties go to the lowest
/// centre index since only a strictly smaller distance replaces the current best.
///
/// # Returns
/// * `(label, distance)` of the nearest centre
#[inline]
pub fn nearest_center(point: &ArrayView1<f64>, centers: &ArrayView2<f64>) -> (usize, f64) {
    let mut best_label = 0;
    let mut best_dist = f64::INFINITY;

    for (c, center) in centers.outer_iter().enumerate() {
        let dist = euclidean(point, &center);
        if dist < best_dist {
            best_dist = dist;
            best_label = c;
        }
    }

    (best_label, best_dist)
}

/// Compute centre shift: the Frobenius norm of `new_centers - old_centers`
pub fn center_shift(old_centers: &ArrayView2<f64>, new_centers: &ArrayView2<f64>) -> f64 {
    let k = old_centers.nrows();

    // Rows in parallel, summed in order so the result does not depend on scheduling
    let row_sq: Vec<f64> = (0..k)
        .into_par_iter()
        .map(|i| {
            let old_c = old_centers.row(i);
            let new_c = new_centers.row(i);

            Zip::from(&old_c).and(&new_c).fold(0.0f64, |acc, &o, &n| {
                let d = n - o;
                acc + d * d
            })
        })
        .collect();

    row_sq.iter().sum::<f64>().sqrt()
}
