use std::{
    io::{self, Error, ErrorKind},
    net::SocketAddr,
    time::Duration,
};

use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::{lookup_host, TcpListener};
use tracing::{debug, warn};

use super::fast_open::enable_fast_open_listen;

const LISTEN_BACKLOG: i32 = 1024;

/// How long to stop accepting after running out of file descriptors or memory.
pub const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

fn bind_address(address: SocketAddr, fast_open: bool) -> io::Result<TcpListener> {
    let socket = Socket::new(Domain::for_address(address), Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_address(true)?;

    if fast_open {
        if let Err(error) = enable_fast_open_listen(&socket) {
            warn!(%error, "Could not enable TCP fast open on the listener");
        }
    }

    socket.bind(&address.into())?;
    socket.listen(LISTEN_BACKLOG)?;
    socket.set_nonblocking(true)?;
    TcpListener::from_std(socket.into())
}

/// Binds a listening socket on the first address `host` resolves to that accepts it.
pub async fn bind_listener(host: &str, port: u16, fast_open: bool) -> io::Result<TcpListener> {
    let mut last_error = None;

    for address in lookup_host((host, port)).await? {
        match bind_address(address, fast_open) {
            Ok(listener) => return Ok(listener),
            Err(error) => {
                debug!(%address, %error, "Failed to bind");
                last_error = Some(error);
            }
        }
    }

    Err(last_error.unwrap_or_else(|| Error::new(ErrorKind::NotFound, format!("{host} resolved to no addresses"))))
}

/// Returns whether an error returned by `accept` means the listener itself can't go on, as
/// opposed to a problem with a single incoming connection or a temporary lack of resources.
#[cfg(unix)]
pub fn is_listener_broken(error: &io::Error) -> bool {
    matches!(error.raw_os_error(), Some(libc::EBADF | libc::EINVAL | libc::ENOTSOCK))
}

#[cfg(not(unix))]
pub fn is_listener_broken(_error: &io::Error) -> bool {
    false
}

/// Returns how long to wait before accepting again after `error`, or `None` to retry right away.
/// A pending connection stays queued while we're out of descriptors, so retrying immediately
/// would fail the same way in a loop.
#[cfg(unix)]
pub fn accept_backoff(error: &io::Error) -> Option<Duration> {
    match error.raw_os_error() {
        Some(libc::EMFILE | libc::ENFILE | libc::ENOBUFS | libc::ENOMEM) => Some(ACCEPT_BACKOFF),
        _ => None,
    }
}

#[cfg(not(unix))]
pub fn accept_backoff(_error: &io::Error) -> Option<Duration> {
    None
}
