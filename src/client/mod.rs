//! The client side of a disguised session: accepting local connections, the handshake with the
//! remote, and the relay that follows it.

mod listener;
mod relay;
mod session;

pub use listener::run_listener;
