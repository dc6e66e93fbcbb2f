//! A mesh of worker processes connected over TCP.
//!
//! Every worker listens on its own address and dials every peer, so each
//! pair of workers shares two connections: the dialed one carries messages
//! from the dialer and the accepted one carries messages to it. A dialer
//! opens with an 8-byte little-endian hello giving its worker number. After
//! that, every message is one frame: a `u32` little-endian payload length
//! followed by the `bitcode` encoding of a [`Message`].

use core::time::Duration;
use std::{
    io::{ErrorKind, Read, Write},
    net::{SocketAddr, TcpListener, TcpStream},
    thread::JoinHandle,
    time::Instant,
};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

use super::{Envelope, Message, Transport};
use crate::{KnnError, Result};

/// Pause between attempts to dial a peer that is not listening yet, and
/// between polls for incoming connections.
const RETRY_INTERVAL: Duration = Duration::from_millis(25);

/// The largest payload a frame may carry, 64 MiB. Lengths above this are
/// treated as a corrupt stream rather than allocated.
const MAX_FRAME_LEN: u32 = 1 << 26;

/// One worker's endpoint of a TCP mesh.
///
/// Sends are handed to a writer thread per peer and return at once. A
/// reader thread per peer decodes incoming frames into a shared inbox.
/// Dropping the endpoint flushes every queued frame before closing.
pub struct TcpMesh {
    /// This worker's number.
    worker: usize,
    /// Frame queues for each peer's writer thread, `None` at this worker's
    /// own slot.
    writers: Vec<Option<Sender<Vec<u8>>>>,
    /// The writer threads.
    handles: Vec<JoinHandle<()>>,
    /// Decoded messages, or the error that stopped a reader.
    inbox: Receiver<Result<Envelope>>,
}

impl TcpMesh {
    /// Binds `peers[worker]` and connects to every other address in
    /// `peers`. Worker `i` must be listening on `peers[i]`.
    ///
    /// # Errors
    ///
    /// * If `worker` is out of range for `peers`.
    /// * If the address cannot be bound.
    /// * See [`TcpMesh::with_listener`].
    pub fn connect(worker: usize, peers: &[SocketAddr], connect_timeout: Duration) -> Result<Self> {
        let addr = peers
            .get(worker)
            .ok_or_else(|| KnnError::Config(format!("worker {worker} is not among {} peers", peers.len())))?;
        let listener = TcpListener::bind(addr).map_err(|e| KnnError::Transport(format!("bind {addr}: {e}")))?;
        Self::with_listener(worker, listener, peers, connect_timeout)
    }

    /// Like [`TcpMesh::connect`], but with this worker's listener already
    /// bound.
    ///
    /// # Errors
    ///
    /// * If a peer cannot be reached, or does not dial in, before
    ///   `connect_timeout` runs out.
    /// * If a peer sends a bad hello.
    pub fn with_listener(
        worker: usize,
        listener: TcpListener,
        peers: &[SocketAddr],
        connect_timeout: Duration,
    ) -> Result<Self> {
        let workers = peers.len();
        if worker >= workers {
            return Err(KnnError::Config(format!("worker {worker} is not among {workers} peers")));
        }
        let deadline = Instant::now() + connect_timeout;

        let mut writers = Vec::with_capacity(workers);
        let mut handles = Vec::with_capacity(workers);
        for (peer, addr) in peers.iter().enumerate() {
            if peer == worker {
                writers.push(None);
                continue;
            }
            let mut stream = dial(*addr, deadline)?;
            stream
                .write_all(&(worker as u64).to_le_bytes())
                .map_err(|e| KnnError::Transport(format!("hello to worker {peer}: {e}")))?;

            let (tx, rx) = crossbeam_channel::unbounded::<Vec<u8>>();
            writers.push(Some(tx));
            handles.push(std::thread::spawn(move || write_frames(stream, peer, &rx)));
        }

        let (inbox_tx, inbox) = crossbeam_channel::unbounded();
        for (peer, stream) in accept_peers(&listener, worker, workers, deadline)? {
            let tx = inbox_tx.clone();
            std::thread::spawn(move || read_frames(stream, peer, &tx));
        }

        ftlog::info!("Worker {worker} connected to {} peers", workers.saturating_sub(1));

        Ok(Self {
            worker,
            writers,
            handles,
            inbox,
        })
    }
}

impl Transport for TcpMesh {
    fn worker(&self) -> usize {
        self.worker
    }

    fn num_workers(&self) -> usize {
        self.writers.len()
    }

    fn send(&self, to: usize, message: Message) -> Result<()> {
        let writer = self
            .writers
            .get(to)
            .and_then(Option::as_ref)
            .ok_or_else(|| KnnError::Transport(format!("worker {} has no peer {to}", self.worker)))?;

        writer
            .send(encode_frame(&message)?)
            .map_err(|_| KnnError::Transport(format!("connection from worker {} to worker {to} is closed", self.worker)))
    }

    fn recv(&self, timeout: Option<Duration>) -> Result<Option<Envelope>> {
        let hung_up = || KnnError::Transport(format!("every peer of worker {} has hung up", self.worker));
        match timeout {
            None => self.inbox.recv().map_err(|_| hung_up())?.map(Some),
            Some(t) => match self.inbox.recv_timeout(t) {
                Ok(envelope) => envelope.map(Some),
                Err(RecvTimeoutError::Timeout) => Ok(None),
                Err(RecvTimeoutError::Disconnected) => Err(hung_up()),
            },
        }
    }
}

impl Drop for TcpMesh {
    fn drop(&mut self) {
        self.writers.clear();
        for handle in self.handles.drain(..) {
            if handle.join().is_err() {
                ftlog::warn!("A writer thread of worker {} panicked", self.worker);
            }
        }
    }
}

/// Encodes `message` as a length-prefixed frame.
fn encode_frame(message: &Message) -> Result<Vec<u8>> {
    let payload = bitcode::serialize(message).map_err(|e| KnnError::Transport(format!("encode {}: {e}", message.kind())))?;
    let len = u32::try_from(payload.len())
        .ok()
        .filter(|&len| len <= MAX_FRAME_LEN)
        .ok_or_else(|| KnnError::Transport(format!("{} of {} bytes is too large to frame", message.kind(), payload.len())))?;

    let mut frame = Vec::with_capacity(4 + payload.len());
    frame.extend_from_slice(&len.to_le_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

/// Reads one frame, returning `None` on a clean end of stream.
fn decode_frame<R: Read>(reader: &mut R) -> Result<Option<Message>> {
    let mut len = [0_u8; 4];
    match reader.read_exact(&mut len) {
        Ok(()) => (),
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(KnnError::Transport(format!("read frame length: {e}"))),
    }

    let len = u32::from_le_bytes(len);
    if len > MAX_FRAME_LEN {
        return Err(KnnError::Transport(format!(
            "frame of {len} bytes exceeds the limit of {MAX_FRAME_LEN}"
        )));
    }
    let mut payload = vec![0_u8; len as usize];
    reader
        .read_exact(&mut payload)
        .map_err(|e| KnnError::Transport(format!("read frame payload: {e}")))?;
    bitcode::deserialize(&payload)
        .map(Some)
        .map_err(|e| KnnError::Transport(format!("decode frame: {e}")))
}

/// Dials `addr` until it answers or `deadline` passes.
fn dial(addr: SocketAddr, deadline: Instant) -> Result<TcpStream> {
    loop {
        match TcpStream::connect(addr) {
            Ok(stream) => {
                // Frames are small and latency bound.
                stream.set_nodelay(true).ok();
                return Ok(stream);
            }
            Err(e) if Instant::now() >= deadline => {
                return Err(KnnError::Transport(format!("connect to {addr}: {e}")));
            }
            Err(_) => std::thread::sleep(RETRY_INTERVAL),
        }
    }
}

/// Accepts one connection from every peer and reads its hello. Returns the
/// streams with the peer numbers they came from.
fn accept_peers(listener: &TcpListener, worker: usize, workers: usize, deadline: Instant) -> Result<Vec<(usize, TcpStream)>> {
    listener
        .set_nonblocking(true)
        .map_err(|e| KnnError::Transport(format!("listen: {e}")))?;

    let mut seen = vec![false; workers];
    seen[worker] = true;
    let mut accepted = Vec::with_capacity(workers.saturating_sub(1));

    while accepted.len() + 1 < workers {
        match listener.accept() {
            Ok((mut stream, from)) => {
                stream
                    .set_nonblocking(false)
                    .map_err(|e| KnnError::Transport(format!("accept {from}: {e}")))?;
                stream
                    .set_read_timeout(Some(deadline.saturating_duration_since(Instant::now()).max(RETRY_INTERVAL)))
                    .map_err(|e| KnnError::Transport(format!("accept {from}: {e}")))?;

                let mut hello = [0_u8; 8];
                stream
                    .read_exact(&mut hello)
                    .map_err(|e| KnnError::Transport(format!("hello from {from}: {e}")))?;
                let peer = usize::try_from(u64::from_le_bytes(hello)).unwrap_or(usize::MAX);
                if peer >= workers || seen[peer] {
                    return Err(KnnError::Protocol {
                        worker,
                        reason: format!("unexpected hello from {from} claiming to be worker {peer}"),
                    });
                }
                seen[peer] = true;

                stream
                    .set_read_timeout(None)
                    .map_err(|e| KnnError::Transport(format!("accept {from}: {e}")))?;
                accepted.push((peer, stream));
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock => {
                if Instant::now() >= deadline {
                    let missing = (0..workers).filter(|&p| !seen[p]).collect::<Vec<_>>();
                    return Err(KnnError::Transport(format!(
                        "worker {worker} gave up waiting for workers {missing:?} to connect"
                    )));
                }
                std::thread::sleep(RETRY_INTERVAL);
            }
            Err(e) => return Err(KnnError::Transport(format!("accept: {e}"))),
        }
    }

    Ok(accepted)
}

/// Writes queued frames to `stream` until the queue closes.
fn write_frames(mut stream: TcpStream, peer: usize, frames: &Receiver<Vec<u8>>) {
    for frame in frames {
        if let Err(e) = stream.write_all(&frame) {
            ftlog::warn!("Lost connection to worker {peer}: {e}");
            return;
        }
    }
    stream.flush().ok();
    stream.shutdown(std::net::Shutdown::Write).ok();
}

/// Decodes frames from `stream` into the inbox until the peer closes.
fn read_frames(mut stream: TcpStream, peer: usize, inbox: &Sender<Result<Envelope>>) {
    loop {
        match decode_frame(&mut stream) {
            Ok(Some(message)) => {
                if inbox.send(Ok(Envelope { from: peer, message })).is_err() {
                    return;
                }
            }
            Ok(None) => return,
            Err(e) => {
                inbox.send(Err(e)).ok();
                return;
            }
        }
    }
}
