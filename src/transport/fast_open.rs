//! TCP Fast Open, which lets the first bytes of a connection ride on its SYN. Only supported on
//! Linux; elsewhere enabling it fails and callers fall back to a regular connection.

use std::io;

use socket2::Socket;

/// How many pending fast open requests a listener may queue.
pub const LISTEN_QUEUE_LEN: i32 = 5;

#[cfg(target_os = "linux")]
fn set_tcp_option(socket: &Socket, option: libc::c_int, value: libc::c_int) -> io::Result<()> {
    use std::os::fd::AsRawFd;

    // SAFETY: the pointer and length describe `value`, which outlives the call.
    let result = unsafe {
        libc::setsockopt(
            socket.as_raw_fd(),
            libc::IPPROTO_TCP,
            option,
            &value as *const libc::c_int as *const libc::c_void,
            std::mem::size_of::<libc::c_int>() as libc::socklen_t,
        )
    };

    match result {
        0 => Ok(()),
        _ => Err(io::Error::last_os_error()),
    }
}

/// Makes `connect` return immediately and defer the SYN until the first write.
#[cfg(target_os = "linux")]
pub fn enable_fast_open_connect(socket: &Socket) -> io::Result<()> {
    set_tcp_option(socket, libc::TCP_FASTOPEN_CONNECT, 1)
}

/// Lets a listener accept data carried on incoming SYNs.
#[cfg(target_os = "linux")]
pub fn enable_fast_open_listen(socket: &Socket) -> io::Result<()> {
    set_tcp_option(socket, libc::TCP_FASTOPEN, LISTEN_QUEUE_LEN)
}

#[cfg(not(target_os = "linux"))]
pub fn enable_fast_open_connect(_socket: &Socket) -> io::Result<()> {
    Err(io::Error::new(io::ErrorKind::Unsupported, "TCP fast open is only supported on Linux"))
}

#[cfg(not(target_os = "linux"))]
pub fn enable_fast_open_listen(_socket: &Socket) -> io::Result<()> {
    Err(io::Error::new(io::ErrorKind::Unsupported, "TCP fast open is only supported on Linux"))
}

/// Returns whether a write failed only because a deferred connection is still being set up.
#[cfg(unix)]
pub fn is_connect_in_progress(error: &io::Error) -> bool {
    error.raw_os_error() == Some(libc::EINPROGRESS) || error.kind() == io::ErrorKind::WouldBlock
}

#[cfg(not(unix))]
pub fn is_connect_in_progress(error: &io::Error) -> bool {
    error.kind() == io::ErrorKind::WouldBlock
}
