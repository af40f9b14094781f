//! Session driver: composes NAS -> NGAP -> N2 downward and
//! N2 -> NGAP -> NAS upward, sequencing the attach flow of one UE
//! against a real 5G core.
//!
//! The N2 transport (SCTP) and the tun device are collaborators behind
//! the [`ransim_common::N2Stream`] and [`ransim_common::TunDevice`]
//! contracts; the driver itself owns the UE, the gNB, the per-read
//! timeout policy and the user-plane tasks.

pub mod probe;
pub mod session;

pub use session::{Session, SessionError};
