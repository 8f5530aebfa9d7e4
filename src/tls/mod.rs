//! The TLS camouflage: record framing and the forged handshake messages.
//!
//! No real TLS happens here. The messages only need to look right to an observer, and the
//! ClientHello needs to carry a token the server can authenticate.

mod browser;
pub mod client_hello;
pub mod handshake;
pub mod record;
pub mod token;

pub use browser::*;
