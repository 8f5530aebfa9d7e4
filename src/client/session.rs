use std::{fmt, io};

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, trace};

use crate::{
    config::State,
    tls::{
        handshake::{compose_client_hello, compose_reply, DISCARDED_SERVER_MESSAGES},
        record::{add_record_layer, read_record, ContentType, ProtocolVersion},
    },
    transport::Dialer,
};

use super::relay::{start_relay, RelayTasks};

/// The steps a session goes through before relaying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStage {
    AwaitingFirstLocalData,
    Dialing,
    SendingGreeting,
    /// Reading the server message with this (zero-based) index.
    DiscardingServerMessage(usize),
    SendingReply,
    ForwardingFirstPayload,
}

impl fmt::Display for SessionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AwaitingFirstLocalData => write!(f, "awaiting first local data"),
            Self::Dialing => write!(f, "dialing remote"),
            Self::SendingGreeting => write!(f, "sending greeting"),
            Self::DiscardingServerMessage(index) => {
                write!(f, "discarding server message {} of {DISCARDED_SERVER_MESSAGES}", index + 1)
            }
            Self::SendingReply => write!(f, "sending reply"),
            Self::ForwardingFirstPayload => write!(f, "forwarding first payload"),
        }
    }
}

#[derive(Debug, Error)]
#[error("Session failed while {stage}: {source}")]
pub struct SessionError {
    pub stage: SessionStage,
    #[source]
    pub source: io::Error,
}

impl SessionError {
    fn at(stage: SessionStage) -> impl FnOnce(io::Error) -> Self {
        move |source| Self { stage, source }
    }
}

pub enum SessionOutcome {
    /// The local connection closed without sending anything, so the remote was never contacted.
    Empty,

    /// The handshake is done and the relay is running.
    Relaying(RelayTasks),
}

/// Takes a freshly accepted local connection through the handshake with the remote, and starts
/// relaying between them. Must be called from within a `LocalSet`.
///
/// If anything fails, both connections are dropped (and thus closed) before returning.
pub async fn initiate_session<L, D>(mut local: L, state: &State, dialer: &D) -> Result<SessionOutcome, SessionError>
where
    L: AsyncRead + AsyncWrite + Unpin + 'static,
    D: Dialer,
{
    let capacities = state.relay_capacities();

    let mut first_payload = vec![0u8; capacities.local_read];
    let read = local
        .read(&mut first_payload)
        .await
        .map_err(SessionError::at(SessionStage::AwaitingFirstLocalData))?;

    if read == 0 {
        if let Err(error) = local.shutdown().await {
            trace!(%error, "Failed to close local connection");
        }
        return Ok(SessionOutcome::Empty);
    }

    first_payload.truncate(read);
    trace!(read, "Got first local data");

    let greeting = compose_client_hello(state).map_err(SessionError::at(SessionStage::SendingGreeting))?;

    let mut remote = if dialer.is_fast_open() {
        dialer
            .dial(Some(&greeting))
            .await
            .map_err(SessionError::at(SessionStage::Dialing))?
    } else {
        let mut remote = dialer.dial(None).await.map_err(SessionError::at(SessionStage::Dialing))?;
        remote
            .write_all(&greeting)
            .await
            .map_err(SessionError::at(SessionStage::SendingGreeting))?;
        remote
    };

    debug!(len = greeting.len(), fast_open = dialer.is_fast_open(), "Sent greeting");

    let mut buf = vec![0u8; capacities.remote_read];
    for index in 0..DISCARDED_SERVER_MESSAGES {
        let message = read_record(&mut remote, &mut buf)
            .await
            .map_err(SessionError::at(SessionStage::DiscardingServerMessage(index)))?;
        trace!(index, len = message.len(), "Discarded server message");
    }
    drop(buf);

    let reply = compose_reply().map_err(SessionError::at(SessionStage::SendingReply))?;
    remote
        .write_all(&reply)
        .await
        .map_err(SessionError::at(SessionStage::SendingReply))?;

    let first_record = add_record_layer(&first_payload, ContentType::ApplicationData, ProtocolVersion::TLS12);
    remote
        .write_all(&first_record)
        .await
        .map_err(SessionError::at(SessionStage::ForwardingFirstPayload))?;

    Ok(SessionOutcome::Relaying(start_relay(local, remote, capacities)))
}
