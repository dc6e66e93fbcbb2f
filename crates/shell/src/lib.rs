//! Shared setup for the `knn` and `knn-gen` binaries.

use std::path::{Path, PathBuf};

use ftlog::{
    appender::{FileAppender, Period},
    LevelFilter, LoggerGuard,
};

/// The log file stem for one process. Workers of a TCP mesh are often
/// started from the same directory, so each rank gets its own file.
#[must_use]
pub fn log_stem(name: &str, rank: Option<usize>) -> String {
    rank.map_or_else(|| name.to_string(), |rank| format!("{name}-rank-{rank}"))
}

/// Configures the logger to write to `<logs_dir>/<stem>.log`, rotating daily,
/// with the appender's own errors in `<stem>.err.log` beside it.
///
/// The returned guard must be kept alive for as long as logs should be
/// written.
///
/// # Errors
///
/// - If the logs directory could not be created or resolved.
/// - If the logger could not be initialized.
pub fn configure_logger(logs_dir: &Path, stem: &str) -> Result<(LoggerGuard, PathBuf), String> {
    std::fs::create_dir_all(logs_dir).map_err(|e| format!("create {logs_dir:?}: {e}"))?;
    let logs_dir = logs_dir.canonicalize().map_err(|e| e.to_string())?;
    let log_path = logs_dir.join(format!("{stem}.log"));
    let err_path = log_path.with_extension("err.log");

    let guard = ftlog::Builder::new()
        .max_log_level(LevelFilter::Info)
        .root(FileAppender::builder().path(&log_path).rotate(Period::Day).build())
        .filter("ftlog::appender", "ftlog-appender", LevelFilter::Debug)
        .appender("ftlog-appender", FileAppender::new(err_path))
        .try_init()
        .map_err(|e| e.to_string())?;

    Ok((guard, log_path))
}

#[cfg(test)]
mod tests {
    use super::log_stem;

    #[test]
    fn ranks_get_their_own_file() {
        assert_eq!(log_stem("knn", None), "knn");
        assert_eq!(log_stem("knn", Some(0)), "knn-rank-0");
        assert_ne!(log_stem("knn", Some(1)), log_stem("knn", Some(2)));
    }
}
