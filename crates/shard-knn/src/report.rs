//! The human-readable report and the per-query prediction dump.

use core::fmt::{Display, Write};
use std::path::Path;

use crate::{
    data::io::write_bytes_at,
    mesh::{Mailbox, Transport},
    metrics::{percentage_error, Summary},
    Result,
};

impl Display for Summary {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        writeln!(f, "Results for {} query points", self.queries)?;
        match self.mape {
            Some(mape) => writeln!(f, "APE = {mape:.2} %")?,
            None => writeln!(f, "APE = undefined (every true value is zero)")?,
        }
        if self.zero_truth > 0 {
            writeln!(f, "  ({} queries with a zero true value left out of APE)", self.zero_truth)?;
        }
        writeln!(f, "MSE = {:.6}", self.mse)?;
        match self.r2 {
            Some(r2) => writeln!(f, "R2 = 1 - (MSE/Var) = {r2:.6}")?,
            None => writeln!(f, "R2 = undefined (true values have zero variance)")?,
        }
        writeln!(f)?;
        writeln!(f, "Total Computing time = {:.6} secs", self.elapsed.as_secs_f64())?;
        writeln!(f, "Average time for 1st query = {:.6} secs", self.mean_first_query().as_secs_f64())?;
        writeln!(f, "Time for 2..N queries = {:.6} secs", self.steady_state().as_secs_f64())?;
        write!(f, "Average time/query = {:.6} secs", self.per_query().as_secs_f64())
    }
}

/// One line per query: the true value, the prediction, and the percentage
/// error, or `nan` where the true value is zero.
#[must_use]
pub fn format_predictions(truths: &[f64], predictions: &[f64]) -> String {
    let mut text = String::with_capacity(predictions.len() * 32);
    for (&truth, &prediction) in truths.iter().zip(predictions) {
        // Writing to a String cannot fail.
        let _ = match percentage_error(truth, prediction) {
            Some(ape) => writeln!(text, "{truth:.5} {prediction:.5} {ape:.2}"),
            None => writeln!(text, "{truth:.5} {prediction:.5} nan"),
        };
    }
    text
}

/// Writes this worker's lines of the prediction dump into the shared file
/// at `path`.
///
/// Workers agree on byte offsets with an exclusive scan of their text
/// lengths, so the lines land in query order without overlapping. The last
/// worker also cuts the file to the total length, dropping anything left
/// over from an earlier, longer dump.
///
/// # Errors
///
/// * See [`Mailbox::exclusive_scan`].
/// * If the file cannot be written.
pub fn write_predictions<T: Transport, P: AsRef<Path>>(mailbox: &mut Mailbox<T>, path: P, text: &str) -> Result<()> {
    let len = text.len() as u64;
    let offset = mailbox.exclusive_scan(len)?;
    let is_last = mailbox.worker() + 1 == mailbox.num_workers();

    write_bytes_at(&path, text.as_bytes(), offset, is_last.then_some(offset + len))?;
    ftlog::info!(
        "Worker {} wrote {len} bytes of predictions at offset {offset} of {:?}",
        mailbox.worker(),
        path.as_ref()
    );
    Ok(())
}
