//! Command-line front end for logmeans-rs
//!
//! Reads an input JSON document, clusters its dataset (for a fixed k or by
//! searching a k range) and writes an output JSON document holding the
//! catalog, the selected k and mse, the mse history and the timing trace.
//!
//! Usage: `logmeans <kmeans|elbow|logmeans|bisect> <input.json> <output.json> ...`
//!
//! Run `logmeans example-1` for a sample input document.

use clap::{Args, Parser, Subcommand};
use logmeans_rs::io::{Input, Output};
use logmeans_rs::{dataset, KMeans, KMeansConfig, MseHistory, Profiler, Strategy, TraceReporter};
use ndarray::Array2;
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::{fmt, EnvFilter};

/// K-means clustering with Elbow and LogMeans cluster-count search
#[derive(Parser)]
#[command(name = "logmeans")]
#[command(version, about)]
#[command(propagate_version = true)]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct IoArgs {
    /// Input JSON path
    input: PathBuf,

    /// Output JSON path
    output: PathBuf,
}

#[derive(Args)]
struct EngineArgs {
    /// Convergence tolerance on the centre shift
    #[arg(long, default_value_t = 1e-6)]
    tol: f64,

    /// Stop a run after this many iterations even if it has not converged
    #[arg(long)]
    max_iters: Option<usize>,

    /// Random seed
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Log profiler entries whose tag contains this pattern (shown with -v)
    #[arg(long, env = "LOGMEANS_REPORT")]
    report: Option<String>,
}

impl EngineArgs {
    fn config(&self) -> KMeansConfig {
        KMeansConfig::new()
            .with_tol(self.tol)
            .with_max_iters(self.max_iters)
            .with_seed(self.seed)
    }

    fn profiler(&self) -> Profiler {
        match &self.report {
            Some(pattern) => Profiler::with_reporter(Arc::new(TraceReporter::matching(pattern.clone()))),
            None => Profiler::new(),
        }
    }
}

#[derive(Args)]
struct RangeArgs {
    /// Smallest number of clusters to consider
    #[arg(long, default_value_t = 2)]
    min_k: usize,

    /// Largest number of clusters to consider [default: number of points - 1]
    #[arg(long)]
    max_k: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// Manual k-means clustering
    Kmeans {
        #[command(flatten)]
        io: IoArgs,

        /// Number of clusters
        k: usize,

        #[command(flatten)]
        engine: EngineArgs,
    },
    /// Elbow algorithm
    Elbow {
        #[command(flatten)]
        io: IoArgs,

        #[command(flatten)]
        range: RangeArgs,

        #[command(flatten)]
        engine: EngineArgs,
    },
    /// Log Means algorithm
    Logmeans {
        #[command(flatten)]
        io: IoArgs,

        #[command(flatten)]
        range: RangeArgs,

        #[command(flatten)]
        engine: EngineArgs,
    },
    /// Log Means algorithm, binary-search variant
    Bisect {
        #[command(flatten)]
        io: IoArgs,

        #[command(flatten)]
        range: RangeArgs,

        #[command(flatten)]
        engine: EngineArgs,
    },
    /// Print input example 1 (inline dataset)
    #[command(name = "example-1")]
    Example1,
    /// Write a random 10 x 100 dataset and print input example 2 pointing at it
    #[command(name = "example-2")]
    Example2 {
        /// Where to write the binary dataset
        #[arg(default_value = "data.matx")]
        path: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    let filter = match cli.verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("ERROR! {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands) -> logmeans_rs::Result<()> {
    match command {
        Commands::Kmeans { io, k, engine } => {
            let input = Input::read(&io.input)?;
            let data = input.load_dataset()?;
            eprintln!("Loaded data: {} dims x {} points", data.nrows(), data.ncols());

            let profiler = engine.profiler();
            let kmeans = KMeans::with_profiler(engine.config(), profiler.clone());
            let result = kmeans.run(&data.view(), k)?;
            tracing::debug!("trace:\n{}", profiler);

            Output::new(
                &result.catalog,
                input.cata.as_deref(),
                k,
                result.mse,
                MseHistory::new(),
                &profiler,
            )?
            .write(&io.output)
        }
        Commands::Elbow { io, range, engine } => search(Strategy::Elbow, io, range, engine),
        Commands::Logmeans { io, range, engine } => search(Strategy::LogMeans, io, range, engine),
        Commands::Bisect { io, range, engine } => search(Strategy::BinarySearch, io, range, engine),
        Commands::Example1 => {
            println!("{}", serde_json::to_string_pretty(&Input::example_inline())?);
            Ok(())
        }
        Commands::Example2 { path } => {
            let data = Array2::random((10, 100), Uniform::new(-1.0, 1.0));
            dataset::dump_dataset(&data, &path)?;
            println!("{}", serde_json::to_string_pretty(&Input::example_binary(path))?);
            Ok(())
        }
    }
}

fn search(strategy: Strategy, io: IoArgs, range: RangeArgs, engine: EngineArgs) -> logmeans_rs::Result<()> {
    let input = Input::read(&io.input)?;
    let data = input.load_dataset()?;

    let max_k = range
        .max_k
        .unwrap_or_else(|| data.ncols().saturating_sub(1))
        .max(range.min_k);
    eprintln!(
        "Loaded data: {} dims x {} points, searching k in {}..={}",
        data.nrows(),
        data.ncols(),
        range.min_k,
        max_k
    );

    let profiler = engine.profiler();
    let result = strategy.run(engine.config(), profiler.clone(), &data.view(), range.min_k..=max_k)?;
    tracing::debug!("trace:\n{}", profiler);

    let (k, mse) = result.best();
    eprintln!("Selected k = {} (mse {:.6}) after {} evaluations", k, mse, result.history.len());

    Output::new(
        &result.catalog,
        input.cata.as_deref(),
        k,
        mse,
        result.history,
        &profiler,
    )?
    .write(&io.output)
}
