use crate::config::KMeansConfig;
use crate::dataset::{Catalog, MseHistory};
use crate::error::Result;
use crate::heap::{Interval, IntervalHeap};
use crate::kmeans::KMeans;
use crate::profiler::Profiler;
use crate::search::{validate_range, SearchResult};
use ndarray::ArrayView2;
use std::collections::HashMap;
use std::ops::RangeInclusive;
use tracing::{debug, info};

/// LogMeans cluster-count search.
///
/// Evaluates the two ends of the range, then repeatedly bisects the open
/// interval with the steepest error drop `mse(left) / mse(right)`. Intervals
/// that are not refined stay in a max-heap and are picked up again whenever
/// they become the most promising. The search ends when the chosen interval
/// spans two adjacent k; its right end is the answer.
///
/// [`binary_search`](Self::binary_search) is the single-frontier variant.
#[derive(Debug, Clone)]
pub struct LogMeans {
    kmeans: KMeans,
    profiler: Profiler,
}

/// Memoized evaluations, keyed by k. `measure` clusters the data at a given
/// k and returns its mse and catalog.
struct Evaluator<F> {
    measure: F,
    history: MseHistory,
    catalogs: Vec<Catalog>,
    index_of: HashMap<usize, usize>,
    hits: usize,
}

impl<F> Evaluator<F>
where
    F: FnMut(usize) -> Result<(f64, Catalog)>,
{
    fn new(measure: F) -> Self {
        Self {
            measure,
            history: MseHistory::new(),
            catalogs: Vec::new(),
            index_of: HashMap::new(),
            hits: 0,
        }
    }

    /// History index of `k`, running k-means only the first time `k` is seen.
    fn eval(&mut self, k: usize) -> Result<usize> {
        if let Some(&index) = self.index_of.get(&k) {
            self.hits += 1;
            return Ok(index);
        }

        let (mse, catalog) = (self.measure)(k)?;
        let index = self.history.len();
        self.history.push((k, mse));
        self.catalogs.push(catalog);
        self.index_of.insert(k, index);

        debug!(k, mse, index, "logmeans evaluated k");
        Ok(index)
    }

    fn k(&self, index: usize) -> usize {
        self.history[index].0
    }

    fn mse(&self, index: usize) -> f64 {
        self.history[index].1
    }

    fn finish(mut self, answer: usize) -> SearchResult {
        let catalog = self.catalogs.swap_remove(answer);
        SearchResult {
            catalog,
            history: self.history,
            answer,
        }
    }
}

impl Default for LogMeans {
    fn default() -> Self {
        Self::new(KMeansConfig::default())
    }
}

impl LogMeans {
    pub fn new(config: KMeansConfig) -> Self {
        Self::with_profiler(config, Profiler::new())
    }

    /// Record the search, and every inner k-means run, into `profiler`.
    pub fn with_profiler(config: KMeansConfig, profiler: Profiler) -> Self {
        Self {
            kmeans: KMeans::with_profiler(config, profiler.clone()),
            profiler,
        }
    }

    pub fn profiler(&self) -> &Profiler {
        &self.profiler
    }

    /// Heap-driven search over `k_range`.
    pub fn search(&self, data: &ArrayView2<f64>, k_range: RangeInclusive<usize>) -> Result<SearchResult> {
        let (min_k, max_k) = validate_range(&k_range, data.ncols())?;
        let _scope = self.profiler.scope("LogMeans");

        let mut eval = Evaluator::new(|k: usize| -> Result<(f64, Catalog)> {
            let result = self.kmeans.run(data, k)?;
            Ok((result.mse, result.catalog))
        });
        let answer = refine(&mut eval, min_k, max_k, &self.profiler)?;

        info!(
            k = eval.k(answer),
            mse = eval.mse(answer),
            evaluations = eval.history.len(),
            "logmeans selected k"
        );
        Ok(eval.finish(answer))
    }

    /// Binary-search variant: keep one interval and, at every step, keep the
    /// half whose error drop is steeper.
    ///
    /// Evaluates the two ends plus one midpoint per halving. The answer is the
    /// last k evaluated: the final midpoint, or an end of the range when it is
    /// too narrow to halve.
    pub fn binary_search(&self, data: &ArrayView2<f64>, k_range: RangeInclusive<usize>) -> Result<SearchResult> {
        let (min_k, max_k) = validate_range(&k_range, data.ncols())?;
        let _scope = self.profiler.scope("LogMeans.bs");

        let mut eval = Evaluator::new(|k: usize| -> Result<(f64, Catalog)> {
            let result = self.kmeans.run(data, k)?;
            Ok((result.mse, result.catalog))
        });
        let mut lft = eval.eval(min_k)?;
        let mut rht = eval.eval(max_k)?;

        while eval.k(rht) - eval.k(lft) > 1 {
            let mid = eval.eval((eval.k(lft) + eval.k(rht)) / 2)?;

            let left_drop = eval.mse(lft) / eval.mse(mid);
            let right_drop = eval.mse(mid) / eval.mse(rht);
            if left_drop > right_drop {
                rht = mid;
            } else {
                lft = mid;
            }

            self.profiler.mark("LogMeans.bs-iter");
        }

        let answer = eval.history.len() - 1;
        info!(
            k = eval.k(answer),
            mse = eval.mse(answer),
            evaluations = eval.history.len(),
            "logmeans binary search selected k"
        );
        Ok(eval.finish(answer))
    }
}

/// Heap-driven refinement of `[min_k, max_k]`. Returns the history index of
/// the answer: the right end of the first adjacent interval popped.
fn refine<F>(eval: &mut Evaluator<F>, min_k: usize, max_k: usize, profiler: &Profiler) -> Result<usize>
where
    F: FnMut(usize) -> Result<(f64, Catalog)>,
{
    let mut lft = eval.eval(min_k)?;
    let mut rht = eval.eval(max_k)?;

    profiler.mark("LogMeans-iterstart");

    let mut heap = IntervalHeap::new();
    while eval.k(rht) - eval.k(lft) > 1 {
        let mid = eval.eval((eval.k(lft) + eval.k(rht)) / 2)?;

        heap.push(Interval { left: lft, right: mid }, &eval.history);
        heap.push(Interval { left: mid, right: rht }, &eval.history);

        let Some(top) = heap.pop(&eval.history) else {
            break;
        };
        lft = top.left;
        rht = top.right;

        profiler.mark("LogMeans-iter");
    }

    debug!(pending = heap.len(), "logmeans refinement done");
    Ok(rht)
}
