use std::{
    cell::{Cell, RefCell},
    collections::VecDeque,
    io::{self, Error, ErrorKind},
    pin::Pin,
    task::{Context, Poll},
    time::{Duration, SystemTime},
};

use tokio::io::{AsyncRead, AsyncWriteExt, DuplexStream, ReadBuf};

use crate::{
    config::{PluginConfig, Settings, State, TimeSource},
    transport::Dialer,
};

/// A reader that hands out its data one byte per read call.
pub struct TrickleReader {
    data: Vec<u8>,
    position: usize,
    read_calls: usize,
}

impl TrickleReader {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data,
            position: 0,
            read_calls: 0,
        }
    }

    pub fn read_calls(&self) -> usize {
        self.read_calls
    }
}

impl AsyncRead for TrickleReader {
    fn poll_read(mut self: Pin<&mut Self>, _cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        self.read_calls += 1;

        if self.position < self.data.len() && buf.remaining() != 0 {
            let byte = self.data[self.position];
            self.position += 1;
            buf.put_slice(&[byte]);
        }

        Poll::Ready(Ok(()))
    }
}

/// A clock that's always at the same time.
pub struct FixedClock(pub SystemTime);

impl TimeSource for FixedClock {
    fn now(&self) -> SystemTime {
        self.0
    }
}

/// Builds a state with the given key and window that thinks it's always `now`. The server name
/// is `example.com`, fast open is disabled.
pub fn test_state(key: &str, window_secs: u64, now: SystemTime) -> State {
    let settings = Settings {
        local_host: String::from("127.0.0.1"),
        local_port: Some(1),
        remote_host: Some(String::from("proxy.test")),
        remote_port: 443,
        plugin_options: String::new(),
    };

    let plugin = PluginConfig {
        server_name: String::from("example.com"),
        key: key.to_string(),
        ticket_time_hint: window_secs,
        ..Default::default()
    };

    State::new(settings, plugin, Box::new(FixedClock(now))).unwrap()
}

/// The time most tests run at.
pub fn test_time() -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000)
}

/// A dialer that connects to in-memory pipes prepared with [`MockDialer::prepare`], and fails
/// with [`ErrorKind::ConnectionRefused`] when none are left.
pub struct MockDialer {
    fast_open: bool,
    capacity: usize,
    pending: RefCell<VecDeque<DuplexStream>>,
    dials: Cell<usize>,
    early_data: RefCell<Vec<Vec<u8>>>,
}

impl MockDialer {
    pub fn new(fast_open: bool) -> Self {
        Self {
            fast_open,
            capacity: 64 * 1024,
            pending: RefCell::new(VecDeque::new()),
            dials: Cell::new(0),
            early_data: RefCell::new(Vec::new()),
        }
    }

    /// Prepares a connection for the next dial, returning the server's end of it.
    pub fn prepare(&self) -> DuplexStream {
        let (client, server) = tokio::io::duplex(self.capacity);
        self.pending.borrow_mut().push_back(client);
        server
    }

    /// How many times `dial` was called, successful or not.
    pub fn dials(&self) -> usize {
        self.dials.get()
    }

    /// The early data passed to each dial that had some.
    pub fn early_data(&self) -> Vec<Vec<u8>> {
        self.early_data.borrow().clone()
    }
}

impl Dialer for MockDialer {
    type Stream = DuplexStream;

    fn is_fast_open(&self) -> bool {
        self.fast_open
    }

    async fn dial(&self, early_data: Option<&[u8]>) -> io::Result<Self::Stream> {
        self.dials.set(self.dials.get() + 1);

        let maybe_stream = self.pending.borrow_mut().pop_front();
        let mut stream = match maybe_stream {
            Some(stream) => stream,
            None => return Err(Error::new(ErrorKind::ConnectionRefused, "No connection prepared")),
        };

        if let Some(data) = early_data {
            self.early_data.borrow_mut().push(data.to_vec());
            stream.write_all(data).await?;
        }

        Ok(stream)
    }
}
