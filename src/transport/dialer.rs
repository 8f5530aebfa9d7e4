use std::{
    io::{self, Error, ErrorKind},
    net::SocketAddr,
};

use socket2::{Domain, Protocol, SockRef, Socket, Type};
use tokio::{
    io::{AsyncRead, AsyncWrite, AsyncWriteExt, Interest},
    net::{lookup_host, TcpStream},
};
use tracing::{debug, warn};

use super::{
    fast_open::{enable_fast_open_connect, is_connect_in_progress},
    ConnectionProtector, NoProtection,
};

/// Opens connections to the remote proxy server.
#[allow(async_fn_in_trait)]
pub trait Dialer {
    type Stream: AsyncRead + AsyncWrite + Unpin + 'static;

    /// Whether `dial` can send early data along with the connection's establishment. When it
    /// can't, callers should dial without early data and write it afterwards.
    fn is_fast_open(&self) -> bool;

    /// Connects to the remote, sending `early_data` as the first bytes of the stream.
    async fn dial(&self, early_data: Option<&[u8]>) -> io::Result<Self::Stream>;
}

/// Dials a host and port over TCP, trying every address the host resolves to.
pub struct TcpDialer<P = NoProtection> {
    host: String,
    port: u16,
    fast_open: bool,
    protector: P,
}

impl TcpDialer {
    pub fn new(host: String, port: u16, fast_open: bool) -> Self {
        Self {
            host,
            port,
            fast_open,
            protector: NoProtection,
        }
    }
}

impl<P: ConnectionProtector> TcpDialer<P> {
    pub fn with_protector<Q: ConnectionProtector>(self, protector: Q) -> TcpDialer<Q> {
        TcpDialer {
            host: self.host,
            port: self.port,
            fast_open: self.fast_open,
            protector,
        }
    }

    fn create_socket(&self, address: SocketAddr) -> io::Result<Socket> {
        let socket = Socket::new(Domain::for_address(address), Type::STREAM, Some(Protocol::TCP))?;
        self.protector.protect(&socket)?;
        socket.set_nodelay(true)?;
        socket.set_nonblocking(true)?;
        Ok(socket)
    }

    async fn connect_to(&self, address: SocketAddr, early_data: Option<&[u8]>) -> io::Result<TcpStream> {
        let socket = self.create_socket(address)?;

        let use_fast_open = self.fast_open && early_data.is_some() && {
            match enable_fast_open_connect(&socket) {
                Ok(()) => true,
                Err(error) => {
                    warn!(%error, "Could not enable TCP fast open, falling back to a regular connection");
                    false
                }
            }
        };

        match socket.connect(&address.into()) {
            Ok(()) => {}
            Err(error) if is_connect_in_progress(&error) => {}
            Err(error) => return Err(error),
        }

        let std_stream: std::net::TcpStream = socket.into();
        let mut stream = TcpStream::from_std(std_stream)?;

        match (use_fast_open, early_data) {
            (true, Some(data)) => send_on_syn(&stream, data).await?,
            (_, maybe_data) => {
                stream.writable().await?;
                if let Some(error) = stream.take_error()? {
                    return Err(error);
                }

                if let Some(data) = maybe_data {
                    stream.write_all(data).await?;
                }
            }
        }

        Ok(stream)
    }
}

/// Writes the first bytes on a socket whose connection was deferred by fast open. The first send
/// is what triggers the SYN, and may report the connection as in progress if the data didn't fit
/// in it, in which case we wait for it to be established and try again.
async fn send_on_syn(stream: &TcpStream, mut data: &[u8]) -> io::Result<()> {
    while !data.is_empty() {
        stream.writable().await?;

        let result = stream.try_io(Interest::WRITABLE, || {
            SockRef::from(stream).send(data).map_err(|error| match is_connect_in_progress(&error) {
                true => Error::from(ErrorKind::WouldBlock),
                false => error,
            })
        });

        match result {
            Ok(0) => return Err(Error::from(ErrorKind::WriteZero)),
            Ok(sent) => data = &data[sent..],
            Err(error) if error.kind() == ErrorKind::WouldBlock => {}
            Err(error) => return Err(error),
        }
    }

    Ok(())
}

impl<P: ConnectionProtector> Dialer for TcpDialer<P> {
    type Stream = TcpStream;

    fn is_fast_open(&self) -> bool {
        self.fast_open
    }

    async fn dial(&self, early_data: Option<&[u8]>) -> io::Result<TcpStream> {
        let mut last_error = None;

        for address in lookup_host((self.host.as_str(), self.port)).await? {
            match self.connect_to(address, early_data).await {
                Ok(stream) => return Ok(stream),
                Err(error) => {
                    debug!(%address, %error, "Failed to connect");
                    last_error = Some(error);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| Error::new(ErrorKind::NotFound, format!("{} resolved to no addresses", self.host))))
    }
}
