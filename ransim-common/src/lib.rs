//! Common types and utilities for ransim
//!
//! This crate provides the shared building blocks used by every other
//! ransim crate: the `BitField` type underpinning the PER codec, the
//! `OctetView` parsing cursor, configuration structures, logging setup,
//! and the transport contracts consumed by the session driver.

pub mod bit_field;
pub mod config;
pub mod error;
pub mod logging;
pub mod octet_view;
pub mod transport;
pub mod types;

pub use bit_field::{merge, BitField};
pub use config::{GlobalGnbId, GnbConfig, SessionConfig, UeConfig};
pub use error::Error;
pub use logging::{hex, init_logging, LogLevel};
pub use octet_view::OctetView;
pub use transport::{N2Stream, TunDevice, UdpTransport, GTPU_PORT};
pub use types::{parse_hex, BroadcastPlmn, PagingDrx, Plmn, SNssai, SupportedTa, Tai};
