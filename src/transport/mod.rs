//! Everything that touches real sockets: dialing the remote, listening for local connections.

mod dialer;
pub mod fast_open;
mod listener;
mod protect;

pub use dialer::*;
pub use listener::*;
pub use protect::*;
