//! Transport contracts consumed by the session driver.
//!
//! The N2 SCTP association and the kernel tun device are collaborators
//! outside the core; the driver only needs "one call, one frame"
//! semantics from both. The N3 side is plain UDP and gets a thin async
//! wrapper here.

use std::future::Future;
use std::net::SocketAddr;

use tokio::net::UdpSocket;

use crate::error::Error;

/// GTP-U well-known UDP port.
pub const GTPU_PORT: u16 = 2152;

/// A message-preserving N2 stream: one `send` or `recv` call moves
/// exactly one NGAP PDU (SCTP stream 0, PPID 60 at the transport).
pub trait N2Stream {
    /// Sends one NGAP PDU. A failure here is fatal for the session.
    fn send(&mut self, pdu: &[u8]) -> impl Future<Output = Result<(), Error>> + Send;

    /// Receives one NGAP PDU.
    fn recv(&mut self) -> impl Future<Output = Result<Vec<u8>, Error>> + Send;
}

/// A tun-like device moving whole IP datagrams. The futures must be
/// `Send` so the user-plane tasks can run on the multithreaded runtime.
pub trait TunDevice {
    /// Injects one IP datagram toward the UE's applications.
    fn write(&self, datagram: &[u8]) -> impl Future<Output = Result<(), Error>> + Send;

    /// Returns one IP datagram emitted by the UE's applications.
    fn read(&self, buf: &mut [u8]) -> impl Future<Output = Result<usize, Error>> + Send;
}

/// Async UDP wrapper for the N3 reference point.
pub struct UdpTransport {
    socket: UdpSocket,
}

impl UdpTransport {
    /// Binds a UDP socket to the given address.
    pub async fn bind(addr: SocketAddr) -> Result<Self, Error> {
        let socket = UdpSocket::bind(addr).await?;
        Ok(Self { socket })
    }

    /// Sends a datagram to `addr`.
    pub async fn send_to(&self, data: &[u8], addr: SocketAddr) -> Result<(), Error> {
        self.socket.send_to(data, addr).await?;
        Ok(())
    }

    /// Receives one datagram together with its source address.
    pub async fn recv_from(&self) -> Result<(Vec<u8>, SocketAddr), Error> {
        let mut buf = vec![0u8; 65535];
        let (len, addr) = self.socket.recv_from(&mut buf).await?;
        buf.truncate(len);
        Ok((buf, addr))
    }

    /// The bound local address.
    pub fn local_addr(&self) -> Result<SocketAddr, Error> {
        Ok(self.socket.local_addr()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_udp_round_trip() {
        let a = UdpTransport::bind("127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();
        let b = UdpTransport::bind("127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();

        a.send_to(b"gtp frame", b.local_addr().unwrap())
            .await
            .unwrap();
        let (data, src) = b.recv_from().await.unwrap();
        assert_eq!(data, b"gtp frame");
        assert_eq!(src, a.local_addr().unwrap());
    }
}
