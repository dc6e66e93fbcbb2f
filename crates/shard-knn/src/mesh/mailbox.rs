//! Phase-aware receiving on top of a [`Transport`].

use core::time::Duration;
use std::{collections::VecDeque, time::Instant};

use super::{Envelope, Message, Transport, COORDINATOR};
use crate::{metrics::PartialMetrics, KnnError, Result};

/// Wraps a transport and holds on to messages that arrive before the phase
/// that consumes them.
///
/// Peers run ahead of each other, so a worker still merging candidates may
/// already be receiving metric partials or barrier notices. Those wait in
/// the stash until a later [`Mailbox::recv_where`] asks for them.
pub struct Mailbox<T: Transport> {
    /// The underlying transport.
    transport: T,
    /// Messages received but not yet consumed, in arrival order.
    stash: VecDeque<Envelope>,
    /// Bound on each wait. `None` waits forever.
    timeout: Option<Duration>,
}

impl<T: Transport> Mailbox<T> {
    /// Wraps `transport`, bounding every wait by `timeout` if given.
    pub const fn new(transport: T, timeout: Option<Duration>) -> Self {
        Self {
            transport,
            stash: VecDeque::new(),
            timeout,
        }
    }

    /// This worker's number.
    pub fn worker(&self) -> usize {
        self.transport.worker()
    }

    /// The number of workers in the mesh.
    pub fn num_workers(&self) -> usize {
        self.transport.num_workers()
    }

    /// Number of messages waiting in the stash.
    pub fn stashed(&self) -> usize {
        self.stash.len()
    }

    /// Sends `message` to worker `to`.
    ///
    /// # Errors
    ///
    /// See [`Transport::send`].
    pub fn send(&self, to: usize, message: Message) -> Result<()> {
        self.transport.send(to, message)
    }

    /// Returns the first message, stashed or new, for which `wanted` holds.
    /// Anything else that arrives meanwhile is stashed.
    ///
    /// # Errors
    ///
    /// * [`KnnError::Timeout`] if the wait is bounded and expires.
    /// * Any error from [`Transport::recv`].
    pub fn recv_where<F>(&mut self, waiting_for: &str, wanted: F) -> Result<Envelope>
    where
        F: Fn(&Envelope) -> bool,
    {
        if let Some(i) = self.stash.iter().position(&wanted) {
            if let Some(envelope) = self.stash.remove(i) {
                return Ok(envelope);
            }
        }

        let deadline = self.timeout.map(|t| Instant::now() + t);
        loop {
            let remaining = deadline.map(|d| d.saturating_duration_since(Instant::now()));
            let envelope = match remaining {
                Some(r) if r.is_zero() => None,
                _ => self.transport.recv(remaining)?,
            };

            match envelope {
                Some(envelope) if wanted(&envelope) => return Ok(envelope),
                Some(envelope) => self.stash.push_back(envelope),
                None => {
                    let worker = self.worker();
                    ftlog::warn!("Worker {worker} timed out waiting for {waiting_for}");
                    return Err(KnnError::Timeout {
                        worker,
                        waited: self.timeout.unwrap_or_default(),
                        waiting_for: waiting_for.to_string(),
                    });
                }
            }
        }
    }

    /// Blocks until every worker has called `barrier`.
    ///
    /// Workers report to the coordinator, which releases them once all have
    /// arrived.
    ///
    /// # Errors
    ///
    /// See [`Mailbox::recv_where`] and [`Transport::send`].
    pub fn barrier(&mut self) -> Result<()> {
        let workers = self.num_workers();
        if self.worker() == COORDINATOR {
            for peer in (0..workers).filter(|&p| p != COORDINATOR) {
                self.recv_where(&format!("barrier from worker {peer}"), |e| {
                    e.from == peer && e.message == Message::Barrier
                })?;
            }
            for peer in (0..workers).filter(|&p| p != COORDINATOR) {
                self.send(peer, Message::Release)?;
            }
        } else {
            self.send(COORDINATOR, Message::Barrier)?;
            self.recv_where("barrier release", |e| {
                e.from == COORDINATOR && e.message == Message::Release
            })?;
        }
        Ok(())
    }

    /// Exclusive prefix sum of `bytes` over the workers, in worker order:
    /// worker `i` gets the sum of the values given by workers `0..i`.
    ///
    /// # Errors
    ///
    /// See [`Mailbox::recv_where`] and [`Transport::send`].
    pub fn exclusive_scan(&mut self, bytes: u64) -> Result<u64> {
        let me = self.worker();
        for later in me + 1..self.num_workers() {
            self.send(later, Message::Extent { bytes })?;
        }

        let mut offset = 0;
        for earlier in 0..me {
            let envelope = self.recv_where(&format!("dump extent from worker {earlier}"), |e| {
                e.from == earlier && matches!(e.message, Message::Extent { .. })
            })?;
            if let Message::Extent { bytes } = envelope.message {
                offset += bytes;
            }
        }
        Ok(offset)
    }

    /// Combines every worker's partial on the coordinator, in worker order.
    /// Returns the combined metrics on the coordinator and `None` elsewhere.
    ///
    /// # Errors
    ///
    /// See [`Mailbox::recv_where`] and [`Transport::send`].
    pub fn reduce_to_coordinator(&mut self, partial: PartialMetrics) -> Result<Option<PartialMetrics>> {
        if self.worker() != COORDINATOR {
            self.send(COORDINATOR, Message::Partial(partial))?;
            return Ok(None);
        }

        let mut total = partial;
        for peer in (0..self.num_workers()).filter(|&p| p != COORDINATOR) {
            let envelope = self.recv_where(&format!("metrics from worker {peer}"), |e| {
                e.from == peer && matches!(e.message, Message::Partial(_))
            })?;
            if let Message::Partial(p) = envelope.message {
                total = total.combine(&p);
            }
        }
        Ok(Some(total))
    }
}
