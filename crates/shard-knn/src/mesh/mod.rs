//! Message passing between workers.
//!
//! Workers share nothing but the messages below. A [`Transport`] moves them
//! point to point, and a [`Mailbox`] layered on top gives the named
//! collective steps a run needs: barrier, exclusive scan and reduction to
//! the coordinator.

mod channel;
mod mailbox;
mod tcp;

use core::time::Duration;

use serde::{Deserialize, Serialize};

pub use channel::ChannelMesh;
pub use mailbox::Mailbox;
pub use tcp::TcpMesh;

use crate::{metrics::PartialMetrics, CandidateSet, Result};

/// The worker that receives metric partials and prints the report.
pub const COORDINATOR: usize = 0;

/// Everything one worker can say to another.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Message {
    /// A candidate set for a query owned by the receiver.
    Candidates(CandidateSet),
    /// The sender's metric partial, bound for the coordinator.
    Partial(PartialMetrics),
    /// The length in bytes of the sender's share of the prediction dump.
    Extent {
        /// Byte count.
        bytes: u64,
    },
    /// The sender has reached the barrier.
    Barrier,
    /// The coordinator lets everyone past the barrier.
    Release,
}

impl Message {
    /// A short name for logs and errors.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Candidates(_) => "candidates",
            Self::Partial(_) => "metrics partial",
            Self::Extent { .. } => "dump extent",
            Self::Barrier => "barrier",
            Self::Release => "release",
        }
    }
}

/// A message together with the worker that sent it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// The sender.
    pub from: usize,
    /// The payload.
    pub message: Message,
}

/// Point-to-point delivery between a fixed set of workers.
///
/// Membership is fixed when the transport is built: workers are numbered
/// `0..num_workers()` and none join or leave during a run.
pub trait Transport: Send {
    /// This worker's number.
    fn worker(&self) -> usize;

    /// The number of workers in the mesh.
    fn num_workers(&self) -> usize;

    /// Queues `message` for worker `to` and returns without waiting for
    /// delivery.
    ///
    /// # Errors
    ///
    /// * If `to` is not a peer of this worker.
    /// * If the peer has hung up.
    fn send(&self, to: usize, message: Message) -> Result<()>;

    /// Blocks until a message arrives from any peer, or until `timeout`
    /// expires. `Ok(None)` means the wait timed out; a `None` timeout waits
    /// forever.
    ///
    /// # Errors
    ///
    /// If every peer has hung up, or a message could not be decoded.
    fn recv(&self, timeout: Option<Duration>) -> Result<Option<Envelope>>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn worker(&self) -> usize {
        (**self).worker()
    }

    fn num_workers(&self) -> usize {
        (**self).num_workers()
    }

    fn send(&self, to: usize, message: Message) -> Result<()> {
        (**self).send(to, message)
    }

    fn recv(&self, timeout: Option<Duration>) -> Result<Option<Envelope>> {
        (**self).recv(timeout)
    }
}
