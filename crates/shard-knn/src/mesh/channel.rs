//! An in-process mesh: one endpoint per worker thread.

use core::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

use super::{Envelope, Message, Transport};
use crate::{KnnError, Result};

/// One worker's endpoint of an in-process mesh built on unbounded
/// `crossbeam` channels.
///
/// An endpoint holds a sender to every peer but not to itself, so once every
/// peer has dropped its endpoint a blocked receive fails instead of hanging.
pub struct ChannelMesh {
    /// This worker's number.
    worker: usize,
    /// Senders to each worker's inbox, `None` at this worker's own slot.
    peers: Vec<Option<Sender<Envelope>>>,
    /// This worker's inbox.
    inbox: Receiver<Envelope>,
}

impl ChannelMesh {
    /// Builds a fully connected mesh of `workers` endpoints. Endpoint `i`
    /// belongs to worker `i`.
    #[must_use]
    pub fn build(workers: usize) -> Vec<Self> {
        let (senders, receivers): (Vec<_>, Vec<_>) = (0..workers).map(|_| crossbeam_channel::unbounded()).unzip();

        receivers
            .into_iter()
            .enumerate()
            .map(|(worker, inbox)| {
                let peers = senders
                    .iter()
                    .enumerate()
                    .map(|(to, s)| if to == worker { None } else { Some(s.clone()) })
                    .collect();
                Self { worker, peers, inbox }
            })
            .collect()
    }
}

impl Transport for ChannelMesh {
    fn worker(&self) -> usize {
        self.worker
    }

    fn num_workers(&self) -> usize {
        self.peers.len()
    }

    fn send(&self, to: usize, message: Message) -> Result<()> {
        let peer = self
            .peers
            .get(to)
            .and_then(Option::as_ref)
            .ok_or_else(|| KnnError::Transport(format!("worker {} has no peer {to}", self.worker)))?;

        peer.send(Envelope {
            from: self.worker,
            message,
        })
        .map_err(|_| KnnError::Transport(format!("worker {to} hung up before worker {} could send", self.worker)))
    }

    fn recv(&self, timeout: Option<Duration>) -> Result<Option<Envelope>> {
        let hung_up = || KnnError::Transport(format!("every peer of worker {} has hung up", self.worker));
        match timeout {
            None => self.inbox.recv().map(Some).map_err(|_| hung_up()),
            Some(t) => match self.inbox.recv_timeout(t) {
                Ok(envelope) => Ok(Some(envelope)),
                Err(RecvTimeoutError::Timeout) => Ok(None),
                Err(RecvTimeoutError::Disconnected) => Err(hung_up()),
            },
        }
    }
}
