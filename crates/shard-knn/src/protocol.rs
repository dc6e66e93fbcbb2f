//! Exchanging candidate sets so that every query ends up with its global
//! top-k on the worker that owns it.
//!
//! Every worker scans every query. For each query it does not own, it sends
//! its candidate set to the owner and forgets about it. Each owner then
//! waits for exactly one set per peer for each of its queries, in whatever
//! order they arrive, and folds them into its own. Folding is the same
//! replace-the-maximum rule the scanner uses, so the result does not depend
//! on arrival order up to ties at the k-th distance.
//!
//! A peer that never sends stalls its owners, unless the mailbox was built
//! with a timeout.

use core::time::Duration;
use std::time::Instant;

use crate::{
    mesh::{Mailbox, Message, Transport},
    CandidateSet, KnnError, Ownership, Result, TopK,
};

/// Sends a candidate set to the worker that owns its query.
///
/// # Errors
///
/// See [`Transport::send`].
pub fn send_to_owner<T: Transport>(mailbox: &Mailbox<T>, ownership: &Ownership, set: CandidateSet) -> Result<()> {
    mailbox.send(ownership.owner(set.query), Message::Candidates(set))
}

/// Receives one candidate set from every peer for every query this worker
/// owns, and merges each into `owned`, the local selectors of those
/// queries in query order.
///
/// Returns how long the first owned query waited until every peer's set for
/// it had been merged. This is zero when the worker owns nothing or has no
/// peers.
///
/// # Errors
///
/// * [`KnnError::Protocol`] for a set about a query this worker does not
///   own, a set from this worker itself, a set whose claimed sender differs
///   from its actual sender, or a second set from the same peer for the
///   same query.
/// * See [`Mailbox::recv_where`].
pub fn gather_candidates<T: Transport>(
    mailbox: &mut Mailbox<T>,
    ownership: &Ownership,
    owned: &mut [TopK],
) -> Result<Duration> {
    let start = Instant::now();
    let me = mailbox.worker();
    let workers = ownership.workers();
    let range = ownership.owned_by(me);
    if owned.len() != range.count {
        return Err(KnnError::size(format!("selectors owned by worker {me}"), range.count, owned.len()));
    }

    let violation = |reason: String| KnnError::Protocol { worker: me, reason };

    let expected = (workers - 1) * range.count;
    let mut first_pending = if range.count == 0 { 0 } else { workers - 1 };
    let mut first_wait = Duration::ZERO;
    let mut seen = vec![false; workers * range.count];
    for received in 0..expected {
        let envelope = mailbox.recv_where(&format!("candidate set {} of {expected}", received + 1), |e| {
            matches!(e.message, Message::Candidates(_))
        })?;
        let from = envelope.from;
        let Message::Candidates(set) = envelope.message else {
            return Err(violation(format!("expected candidates from worker {from}")));
        };

        if from == me || from >= workers {
            return Err(violation(format!("candidate set for query {} from worker {from}", set.query)));
        }
        if set.worker != from {
            return Err(violation(format!(
                "worker {from} sent a candidate set labeled as coming from worker {}",
                set.worker
            )));
        }
        if !range.contains(set.query) {
            return Err(violation(format!(
                "worker {from} sent query {} which is owned by worker {}",
                set.query,
                ownership.owner(set.query)
            )));
        }

        let local = set.query - range.offset;
        let slot = &mut seen[local * workers + from];
        if *slot {
            return Err(violation(format!("worker {from} sent query {} twice", set.query)));
        }
        *slot = true;

        owned[local].merge(&set.neighbors);
        if local == 0 {
            first_pending -= 1;
            if first_pending == 0 {
                first_wait = start.elapsed();
            }
        }
    }

    ftlog::debug!("Worker {me} merged {expected} candidate sets, the first query after {first_wait:.3?}");
    Ok(first_wait)
}

/// The outcome of [`exchange`] on one worker.
#[derive(Debug)]
pub struct Merged {
    /// The merged selectors of the owned queries, in query order.
    pub owned: Vec<TopK>,
    /// How long the first owned query waited on its peers after the local
    /// sends. See [`gather_candidates`].
    pub first_wait: Duration,
}

/// Runs the whole exchange for one worker: sends every non-owned selector in
/// `local` (one per query, in query order) to its owner, then gathers and
/// merges the sets for the owned queries.
///
/// # Errors
///
/// See [`send_to_owner`] and [`gather_candidates`].
pub fn exchange<T: Transport>(mailbox: &mut Mailbox<T>, ownership: &Ownership, local: Vec<TopK>) -> Result<Merged> {
    let me = mailbox.worker();
    if local.len() != ownership.queries() {
        return Err(KnnError::size("local candidate sets", ownership.queries(), local.len()));
    }
    if mailbox.num_workers() != ownership.workers() {
        return Err(KnnError::Config(format!(
            "the mesh has {} workers but queries are split among {}",
            mailbox.num_workers(),
            ownership.workers()
        )));
    }

    let range = ownership.owned_by(me);
    let mut owned = Vec::with_capacity(range.count);
    for (query, top_k) in local.into_iter().enumerate() {
        if range.contains(query) {
            owned.push(top_k);
        } else {
            send_to_owner(mailbox, ownership, CandidateSet::new(query, me, top_k))?;
        }
    }

    let first_wait = gather_candidates(mailbox, ownership, &mut owned)?;
    Ok(Merged { owned, first_wait })
}
