//! CLI for sharded brute-force kNN search and prediction.
//!
//! Without `--peers`, every worker runs as a thread of this process. With
//! `--peers`, this process is worker `--rank` of a TCP mesh, and one process
//! must be started for each address in the list.

use std::{net::SocketAddr, path::PathBuf, time::Duration};

use clap::Parser;

use shard_knn::{cluster, mesh::TcpMesh, KnnConfig, Norm, Prediction, Worker};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the training file: rows of `dim` features, each followed by
    /// its output value, as little-endian f64.
    train_path: PathBuf,

    /// Path to the query file, in the same layout as the training file.
    query_path: PathBuf,

    /// Dimensionality of every point.
    #[arg(short('d'), long, default_value = "2")]
    dim: usize,

    /// Number of neighbors per query.
    #[arg(short('k'), long, default_value = "32")]
    k: usize,

    /// The norm used to rank neighbors: chebyshev, manhattan, euclidean-sq
    /// or minkowski-<p>.
    #[arg(short('n'), long, default_value = "euclidean-sq")]
    norm: Norm,

    /// How to combine neighbor outputs: mean, inverse-distance or nearest.
    #[arg(short('p'), long, default_value = "mean")]
    prediction: Prediction,

    /// Number of training rows. Inferred from the file length if omitted.
    #[arg(long)]
    train_count: Option<usize>,

    /// Number of query rows. Inferred from the file length if omitted.
    #[arg(long)]
    query_count: Option<usize>,

    /// The rows carry no trailing output value.
    #[arg(long)]
    no_surrogates: bool,

    /// Threads per worker. Defaults to every core.
    #[arg(short('t'), long)]
    threads: Option<usize>,

    /// Number of in-process workers. Ignored with `--peers`.
    #[arg(short('w'), long, default_value = "1")]
    workers: usize,

    /// This process's worker number in the TCP mesh.
    #[arg(short('r'), long, requires = "peers")]
    rank: Option<usize>,

    /// Comma-separated listen addresses of every worker of the TCP mesh, in
    /// worker order.
    #[arg(long, value_delimiter = ',')]
    peers: Vec<SocketAddr>,

    /// Seconds to wait for any one message before giving up. Waits forever
    /// if omitted.
    #[arg(long)]
    timeout: Option<u64>,

    /// Seconds to wait for the TCP mesh to form.
    #[arg(long, default_value = "60")]
    connect_timeout: u64,

    /// Write one line per query (true value, prediction, percentage error)
    /// to this file.
    #[arg(long)]
    predictions: Option<PathBuf>,

    /// Name of the log file. TCP workers append their rank.
    #[arg(long, default_value = "knn")]
    log_name: String,

    /// Directory for log files.
    #[arg(long, default_value = "logs")]
    logs_dir: PathBuf,
}

impl Args {
    /// The run configuration described by the arguments.
    fn config(&self) -> KnnConfig {
        let mut config = KnnConfig::new(self.dim, self.k)
            .with_norm(self.norm)
            .with_prediction(self.prediction)
            .with_surrogates(!self.no_surrogates);
        config.train_count = self.train_count;
        config.query_count = self.query_count;
        if let Some(threads) = self.threads {
            config = config.with_threads(threads);
        }
        if let Some(secs) = self.timeout {
            config = config.with_recv_timeout(Duration::from_secs(secs));
        }
        config
    }
}

fn main() -> Result<(), String> {
    let args = Args::parse();
    let rank = if args.peers.is_empty() { None } else { args.rank };
    let (_guard, log_path) = knn_shell::configure_logger(&args.logs_dir, &knn_shell::log_stem(&args.log_name, rank))?;

    let config = args.config();
    config.validate().map_err(|e| e.to_string())?;
    ftlog::info!("Args: {args:?}");
    ftlog::info!("Config: {config:?}, logging to {log_path:?}");

    let summary = if args.peers.is_empty() {
        let outputs = cluster::run_files(
            &config,
            &args.train_path,
            &args.query_path,
            args.predictions.as_ref(),
            args.workers,
        )
        .map_err(|e| e.to_string())?;
        outputs.into_iter().find_map(|o| o.summary)
    } else {
        let rank = args.rank.ok_or("--rank is required with --peers")?;
        let mesh = TcpMesh::connect(rank, &args.peers, Duration::from_secs(args.connect_timeout))
            .map_err(|e| e.to_string())?;
        let mut worker =
            Worker::load(config, &args.train_path, &args.query_path, mesh).map_err(|e| e.to_string())?;
        if let Some(path) = &args.predictions {
            worker = worker.with_predictions_path(path);
        }
        worker.run().map_err(|e| e.to_string())?.summary
    };

    if let Some(summary) = summary {
        println!("{summary}");
    }

    Ok(())
}
