//! GTPv1-U (TS 29.281) for the N3 reference point.
//!
//! A deliberately small slice of the protocol: the v1 header with the
//! PDU Session Container extension (TS 38.415), T-PDU encapsulation and
//! decapsulation, and the two async tasks moving user-plane traffic
//! between a tun device and the GTP-U UDP socket.

pub mod codec;
pub mod tunnel;

pub use codec::{GtpError, GtpHeader, PduDirection, PduSessionContainer};
pub use tunnel::{downlink_task, uplink_task, GtpTunnel};
