//! Writes a synthetic training file and query file for `knn`.

use std::path::{Path, PathBuf};

use clap::Parser;
use rand::prelude::*;

use shard_knn::{
    data::io,
    synthetic::{random_rows, TestFunction, LOWER, UPPER},
};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Directory to write `train.bin` and `query.bin` into.
    out_dir: PathBuf,

    /// Dimensionality of every point.
    #[arg(short('d'), long, default_value = "2")]
    dim: usize,

    /// Number of training rows.
    #[arg(long, default_value = "131072")]
    train_rows: usize,

    /// Number of query rows.
    #[arg(long, default_value = "1024")]
    query_rows: usize,

    /// The function giving each point its output: circle, himmelblau,
    /// rosenbrock or rastrigin.
    #[arg(short('f'), long, default_value = "circle")]
    function: TestFunction,

    /// Lower bound of every coordinate.
    #[arg(long, default_value_t = LOWER, allow_negative_numbers = true)]
    lower: f64,

    /// Upper bound of every coordinate.
    #[arg(long, default_value_t = UPPER, allow_negative_numbers = true)]
    upper: f64,

    /// The random seed to use.
    #[arg(short('s'), long, default_value = "42")]
    seed: u64,
}

fn main() -> Result<(), String> {
    let args = Args::parse();
    let (_guard, _) = knn_shell::configure_logger(Path::new("logs"), "knn-gen")?;

    if args.dim == 0 {
        return Err("dim must be positive".to_string());
    }
    if args.lower >= args.upper {
        return Err(format!("lower bound {} is not below upper bound {}", args.lower, args.upper));
    }
    if !args.out_dir.exists() {
        std::fs::create_dir_all(&args.out_dir).map_err(|e| e.to_string())?;
    }

    let mut rng = StdRng::seed_from_u64(args.seed);
    for (name, rows) in [("train.bin", args.train_rows), ("query.bin", args.query_rows)] {
        let path = args.out_dir.join(name);
        ftlog::info!("Writing {rows} rows of {} with {} to {path:?}...", args.dim, args.function);
        let data = random_rows(rows, args.dim, (args.lower, args.upper), args.function, &mut rng);
        io::store_binary(&path, &data).map_err(|e| e.to_string())?;
        println!("Wrote {rows} rows to {}", path.display());
    }

    Ok(())
}
