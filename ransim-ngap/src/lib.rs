//! NGAP (NG Application Protocol) message layer
//!
//! Implements the NGAP procedures of 3GPP TS 38.413 a registering gNB
//! drives against a real AMF, on top of the ALIGNED PER primitives of
//! `ransim-per`:
//!
//! - NG Setup Request (and the Response/Failure decode path)
//! - Initial UE Message
//! - Uplink / Downlink NAS Transport
//! - Initial Context Setup Request / Response
//! - PDU Session Resource Setup Request / Response
//!
//! The [`Gnb`] type owns the camper table: one camper per attached UE,
//! holding the RAN-side and AMF-side NGAP identifiers, the pending
//! uplink NAS PDU and the GTP-U endpoint learned at session setup.

pub mod gnb;
pub mod ids;
pub mod ies;
pub mod procedures;

#[cfg(test)]
mod capture_tests;

pub use gnb::{Camper, Gnb, GtpPeer, NgapError};
pub use ids::Criticality;
