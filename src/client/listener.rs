use std::{io, rc::Rc};

use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::TcpListener,
};
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::{
    config::State,
    transport::{accept_backoff, is_listener_broken, Dialer},
};

use super::session::{initiate_session, SessionOutcome};

/// Accepts local connections forever, running a session for each on its own task. Only returns
/// if the listener itself stops working. Must be called from within a `LocalSet`.
pub async fn run_listener<D>(listener: TcpListener, state: Rc<State>, dialer: Rc<D>) -> io::Result<()>
where
    D: Dialer + 'static,
{
    loop {
        let (stream, from) = match listener.accept().await {
            Ok(t) => t,
            Err(error) if is_listener_broken(&error) => {
                error!(%error, "Listener can no longer accept connections");
                return Err(error);
            }
            Err(error) => {
                warn!(%error, "Error accepting new incoming connection");
                if let Some(delay) = accept_backoff(&error) {
                    tokio::time::sleep(delay).await;
                }
                continue;
            }
        };

        if let Err(error) = stream.set_nodelay(true) {
            debug!(%from, %error, "Failed to set TCP_NODELAY");
        }

        let state = Rc::clone(&state);
        let dialer = Rc::clone(&dialer);
        let span = info_span!("session", peer = %from);
        tokio::task::spawn_local(handle_session(stream, state, dialer).instrument(span));
    }
}

/// Runs one session from start to end, logging how it went.
pub async fn handle_session<L, D>(local: L, state: Rc<State>, dialer: Rc<D>)
where
    L: AsyncRead + AsyncWrite + Unpin + 'static,
    D: Dialer,
{
    debug!("Accepted local connection");

    match initiate_session(local, &state, dialer.as_ref()).await {
        Ok(SessionOutcome::Empty) => debug!("Local connection closed without sending anything"),
        Ok(SessionOutcome::Relaying(tasks)) => {
            info!("Session established");
            let (sent, received) = tasks.join().await;
            info!(sent, received, "Session ended");
        }
        Err(error) => warn!(stage = %error.stage, error = %error.source, "Session failed"),
    }
}
