//! NAS (Non-Access Stratum) codec and UE state machine
//!
//! Implements the 5GS mobility-management and session-management
//! messages of 3GPP TS 24.501 that a registering UE exchanges with a
//! real core: registration, authentication, NAS security mode, PDU
//! session establishment and UE-originating deregistration.
//!
//! The [`Ue`] type owns the subscriber identity, the long-term
//! credentials, the derived key hierarchy and the 5GMM/5GSM state, and
//! exposes two directions:
//!
//! - `make_*` methods producing uplink NAS PDUs,
//! - [`Ue::receive`] consuming downlink NAS PDUs and advancing the
//!   state machine; decode problems land in [`Ue::decode_error`].

pub mod enums;
pub mod ies;
mod mm;
mod sm;
pub mod security;
pub mod ue;

#[cfg(test)]
mod capture_tests;

pub use enums::{Epd, MmMessageType, MmState, RcvdState, SecurityHeaderType, SmMessageType};
pub use security::{SecurityKeys, NAS_BEARER};
pub use ue::{NasError, Ue};
