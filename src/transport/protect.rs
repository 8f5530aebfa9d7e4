use std::io;

use socket2::Socket;

/// A hook run on every outgoing socket before it connects. Some platforms require sockets to be
/// marked so their traffic isn't routed back into a VPN this program is part of.
pub trait ConnectionProtector {
    fn protect(&self, socket: &Socket) -> io::Result<()>;
}

/// Leaves sockets alone.
pub struct NoProtection;

impl ConnectionProtector for NoProtection {
    fn protect(&self, _socket: &Socket) -> io::Result<()> {
        Ok(())
    }
}
