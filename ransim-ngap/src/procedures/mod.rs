//! NGAP procedure encoders (TS 38.413 9.2).
//!
//! Each module contributes the uplink messages of one elementary
//! procedure as methods on [`crate::Gnb`]; downlink decoding is shared
//! and lives in the gNB's ProtocolIE walker.

mod initial_context_setup;
mod initial_ue_message;
mod nas_transport;
mod ng_setup;
mod pdu_session_resource;
