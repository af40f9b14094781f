//! GTP-U tunnel descriptor and the user-plane forwarding tasks.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, warn};

use ransim_common::{Error, TunDevice, UdpTransport, GTPU_PORT};

use crate::codec::{GtpHeader, PduSessionContainer};

/// One established N3 tunnel.
///
/// Created at PDU-session-resource-setup-response time and read-only
/// afterwards; the uplink and downlink tasks share it freely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GtpTunnel {
    /// TEID the peer uses toward us.
    pub local_teid: u32,
    /// TEID we use toward the peer.
    pub peer_teid: u32,
    /// UPF address.
    pub peer_addr: Ipv4Addr,
    /// QoS flow of the session.
    pub qos_flow_id: u8,
    /// Whether uplink frames carry the PDU Session Container.
    pub has_extension_header: bool,
}

impl GtpTunnel {
    /// The peer's GTP-U socket address.
    pub fn peer_socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.peer_addr.into(), GTPU_PORT)
    }

    /// Encapsulates one uplink IP datagram.
    pub fn encap(&self, raw: &[u8]) -> Vec<u8> {
        let mut header = GtpHeader::new(self.peer_teid);
        if self.has_extension_header {
            header = header.with_pdu_session(PduSessionContainer::uplink(self.qos_flow_id));
        }
        header.encap(raw).to_vec()
    }

    /// Decapsulates one downlink frame, returning the inner datagram.
    pub fn decap<'a>(&self, frame: &'a [u8]) -> Result<&'a [u8], crate::codec::GtpError> {
        let (header, payload) = GtpHeader::decap(frame)?;
        if header.teid != self.local_teid {
            debug!(
                "frame for TEID {:#010x}, local is {:#010x}",
                header.teid, self.local_teid
            );
        }
        Ok(payload)
    }
}

/// Uplink task: tun -> encapsulate -> UDP.
///
/// Runs until the shutdown channel fires. The tun read only unblocks on
/// I/O, so the owner must close the device when cancelling.
pub async fn uplink_task<T: TunDevice>(
    tun: Arc<T>,
    udp: Arc<UdpTransport>,
    tunnel: GtpTunnel,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), Error> {
    let peer = tunnel.peer_socket_addr();
    let mut buf = vec![0u8; 2048];
    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                debug!("uplink task stopping");
                return Ok(());
            }
            read = tun.read(&mut buf) => {
                let n = read?;
                let frame = tunnel.encap(&buf[..n]);
                udp.send_to(&frame, peer).await?;
            }
        }
    }
}

/// Downlink task: UDP -> decapsulate -> tun.
pub async fn downlink_task<T: TunDevice>(
    tun: Arc<T>,
    udp: Arc<UdpTransport>,
    tunnel: GtpTunnel,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), Error> {
    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                debug!("downlink task stopping");
                return Ok(());
            }
            recv = udp.recv_from() => {
                let (frame, _peer) = recv?;
                match tunnel.decap(&frame) {
                    Ok(raw) => tun.write(raw).await?,
                    Err(err) => warn!("dropping malformed GTP-U frame: {err}"),
                }
            }
        }
    }
}
