//! ALIGNED PER codec for the ASN.1 primitives 3GPP NGAP needs.
//!
//! This is the subset of ITU-T X.691 that the NGAP message layer is
//! built on: constrained whole numbers, length determinants, integers,
//! enumerateds, bit strings, octet strings, sequence preambles,
//! sequence-of counts and choice indices. Everything composes through
//! [`ransim_common::BitField`] so sub-octet preambles and length
//! determinants pack without padding errors.
//!
//! Encoding is complete for the targeted messages; decoding is partial
//! by design (length determinants plus bit-level field extraction), the
//! way the NGAP layer consumes it.

mod decode;
mod encode;

pub use decode::{dec_constrained_whole_number, dec_length_determinant, BitReader};
pub use encode::{
    enc_bit_string, enc_choice, enc_constrained_whole_number, enc_enumerated, enc_integer,
    enc_length_determinant, enc_octet_string, enc_octet_string_unconstrained, enc_sequence,
    enc_sequence_of,
};

use thiserror::Error;

/// PER encoding/decoding errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PerError {
    /// A value fell outside its constraint.
    #[error("value {value} out of range {min}..={max}")]
    ValueOutOfRange {
        /// The offending value.
        value: u64,
        /// Lower constraint bound.
        min: u64,
        /// Upper constraint bound.
        max: u64,
    },

    /// A length fell outside its constraint.
    #[error("length {len} out of range {min}..={max}")]
    LengthOutOfRange {
        /// The offending length.
        len: usize,
        /// Lower constraint bound.
        min: usize,
        /// Upper constraint bound.
        max: usize,
    },

    /// Sequence preambles support at most 7 optional fields.
    #[error("sequence with {0} optional fields not supported")]
    TooManyOptions(usize),

    /// Fragmented length determinants (>= 16384) are not emitted;
    /// refusing beats producing a wrong PDU.
    #[error("length determinant {0} requires fragmentation")]
    FragmentationRequired(usize),

    /// Input ran out while decoding.
    #[error("truncated PER input")]
    Truncated,

    /// Malformed length determinant on decode.
    #[error("invalid length determinant octet {0:#04x}")]
    InvalidLengthDeterminant(u8),
}
