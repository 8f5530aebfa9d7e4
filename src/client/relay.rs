//! The two forwarding loops that run once the handshake is done.
//!
//! Data read from the local connection is wrapped into application data records and written to
//! the remote; records read from the remote are unwrapped and their payloads written to the local
//! connection. When either loop stops, for whatever reason, it closes the [`PipeCloser`] and the
//! other loop stops too, so both connections go down together.

use std::{io, rc::Rc};

use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf},
    select,
    sync::watch,
    task::JoinHandle,
};
use tracing::{debug, warn, Instrument, Span};

use crate::{
    config::RelayCapacities,
    tls::record::{add_record_layer_into, framed_len, read_record, ContentType, ProtocolVersion},
};

/// Shared by both directions of a relay. Closing it tells both to stop. Closing more than once
/// does nothing.
pub struct PipeCloser {
    closed: watch::Sender<bool>,
}

impl PipeCloser {
    pub fn new() -> Self {
        let (closed, _) = watch::channel(false);
        Self { closed }
    }

    pub fn close(&self) {
        self.closed.send_replace(true);
    }

    #[cfg(test)]
    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    /// Gets a receiver that's notified once the pipe closes.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.closed.subscribe()
    }
}

/// Waits until the pipe is closed, or returns immediately if it already is.
async fn wait_closed(closed: &mut watch::Receiver<bool>) {
    let _ = closed.wait_for(|closed| *closed).await;
}

/// The running relay tasks of one session.
pub struct RelayTasks {
    local_to_remote: JoinHandle<u64>,
    remote_to_local: JoinHandle<u64>,
}

impl RelayTasks {
    /// Waits for both directions to stop, returning how many payload bytes were sent to the remote
    /// and received from it. A direction whose task failed counts as zero bytes.
    pub async fn join(self) -> (u64, u64) {
        let sent = join_direction("local to remote", self.local_to_remote).await;
        let received = join_direction("remote to local", self.remote_to_local).await;
        (sent, received)
    }
}

async fn join_direction(direction: &str, handle: JoinHandle<u64>) -> u64 {
    handle.await.unwrap_or_else(|error| {
        warn!(direction, %error, "Relay task failed");
        0
    })
}

/// Starts relaying between the local and remote connections. Must be called from within a
/// `LocalSet`.
pub fn start_relay<L, R>(local: L, remote: R, capacities: RelayCapacities) -> RelayTasks
where
    L: AsyncRead + AsyncWrite + 'static,
    R: AsyncRead + AsyncWrite + 'static,
{
    let (local_read, local_write) = tokio::io::split(local);
    let (remote_read, remote_write) = tokio::io::split(remote);

    let pipe = Rc::new(PipeCloser::new());
    let span = Span::current();

    let local_to_remote = tokio::task::spawn_local(
        forward_local_to_remote(local_read, remote_write, capacities.local_read, Rc::clone(&pipe)).instrument(span.clone()),
    );

    let remote_to_local =
        tokio::task::spawn_local(forward_remote_to_local(remote_read, local_write, capacities.remote_read, pipe).instrument(span));

    RelayTasks {
        local_to_remote,
        remote_to_local,
    }
}

fn log_direction_end(direction: &str, result: io::Result<()>) {
    match result {
        Ok(()) => debug!(direction, "Connection closed"),
        Err(error) => debug!(direction, %error, "Relay stopped with error"),
    }
}

async fn forward_local_to_remote<L, R>(mut local: ReadHalf<L>, mut remote: WriteHalf<R>, capacity: usize, pipe: Rc<PipeCloser>) -> u64
where
    L: AsyncRead,
    R: AsyncWrite,
{
    let mut closed = pipe.subscribe();
    let mut buf = vec![0u8; capacity];
    let mut framed = Vec::with_capacity(framed_len(capacity));
    let mut total = 0;

    let result = loop {
        let read_result = select! {
            _ = wait_closed(&mut closed) => break Ok(()),
            result = local.read(&mut buf) => result,
        };

        let read = match read_result {
            Ok(0) => break Ok(()),
            Ok(read) => read,
            Err(error) => break Err(error),
        };

        framed.clear();
        add_record_layer_into(&mut framed, &buf[..read], ContentType::ApplicationData, ProtocolVersion::TLS12);

        let write_result = select! {
            _ = wait_closed(&mut closed) => break Ok(()),
            result = remote.write_all(&framed) => result,
        };

        if let Err(error) = write_result {
            break Err(error);
        }

        total += read as u64;
    };

    log_direction_end("local to remote", result);
    pipe.close();
    total
}

async fn forward_remote_to_local<R, L>(mut remote: ReadHalf<R>, mut local: WriteHalf<L>, capacity: usize, pipe: Rc<PipeCloser>) -> u64
where
    R: AsyncRead,
    L: AsyncWrite,
{
    let mut closed = pipe.subscribe();
    let mut buf = vec![0u8; capacity];
    let mut total = 0;

    let result = loop {
        let read_result = select! {
            _ = wait_closed(&mut closed) => break Ok(()),
            result = read_record(&mut remote, &mut buf) => result,
        };

        let payload = match read_result {
            Ok(payload) => payload,
            Err(error) if error.kind() == io::ErrorKind::UnexpectedEof => break Ok(()),
            Err(error) => break Err(error),
        };

        let write_result = select! {
            _ = wait_closed(&mut closed) => break Ok(()),
            result = local.write_all(payload) => result,
        };

        if let Err(error) = write_result {
            break Err(error);
        }

        total += payload.len() as u64;
    };

    log_direction_end("remote to local", result);
    pipe.close();
    total
}
