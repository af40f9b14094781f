//! GTP-U header encoding/decoding (TS 29.281).
//!
//! Header layout:
//!
//! ```text
//! | flags | type | length (u16) | TEID (u32) |
//! | seq (u16) | N-PDU (u8) | next ext type |   when E is set
//! | ext: len | content... | next ext type |
//! ```
//!
//! The length field covers everything after the TEID: the payload plus,
//! when the E flag is set, the sequence/N-PDU octets and the extension
//! headers. The only extension handled is the PDU Session Container
//! (type 0x85) carrying the PDU type and QoS flow identifier.

use bytes::{BufMut, BytesMut};
use thiserror::Error;

/// GTP version in the flags octet.
pub const GTP_VERSION: u8 = 1;

/// Protocol type bit: GTP (as opposed to GTP').
const FLAG_PT: u8 = 0x10;

/// Extension-header-present bit.
const FLAG_E: u8 = 0x04;

/// Message type for user data (T-PDU).
pub const MSG_TYPE_TPDU: u8 = 0xff;

/// PDU Session Container extension header type.
pub const EXT_TYPE_PDU_SESSION_CONTAINER: u8 = 0x85;

/// End of the extension header chain.
const EXT_TYPE_NONE: u8 = 0x00;

/// GTP-U codec errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GtpError {
    /// Frame shorter than its advertised or minimum length.
    #[error("frame too short: need {needed} octets, have {available}")]
    TooShort {
        /// Octets required.
        needed: usize,
        /// Octets present.
        available: usize,
    },

    /// Version field was not 1.
    #[error("unsupported GTP version {0}")]
    BadVersion(u8),

    /// Protocol type bit indicated GTP'.
    #[error("not a GTP-U frame (PT bit clear)")]
    NotGtpU,

    /// Extension header chain contained an unknown type.
    #[error("unsupported extension header type {0:#04x}")]
    UnsupportedExtension(u8),

    /// Extension header length inconsistent with the frame.
    #[error("invalid extension header length {0}")]
    BadExtensionLength(u8),
}

/// Direction carried in the PDU Session Container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PduDirection {
    /// Downlink PDU session information (PDU type 0).
    Downlink = 0,
    /// Uplink PDU session information (PDU type 1).
    Uplink = 1,
}

/// PDU Session Container content (TS 38.415): the PDU type nibble and
/// the QoS flow identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PduSessionContainer {
    /// Uplink or downlink information.
    pub direction: PduDirection,
    /// QoS Flow Identifier (0-63).
    pub qfi: u8,
}

impl PduSessionContainer {
    /// An uplink container for the given flow.
    pub fn uplink(qfi: u8) -> Self {
        Self {
            direction: PduDirection::Uplink,
            qfi: qfi & 0x3f,
        }
    }

    fn content(&self) -> [u8; 2] {
        [(self.direction as u8) << 4, self.qfi]
    }
}

/// A GTP-U T-PDU header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GtpHeader {
    /// Tunnel endpoint identifier of the receiving side.
    pub teid: u32,
    /// PDU Session Container, when present.
    pub pdu_session: Option<PduSessionContainer>,
}

impl GtpHeader {
    /// Fixed part of the header in octets.
    pub const MIN_SIZE: usize = 8;

    /// Header size with the single PDU Session Container extension.
    pub const EXT_SIZE: usize = 16;

    /// Creates a T-PDU header without extensions.
    pub fn new(teid: u32) -> Self {
        Self {
            teid,
            pdu_session: None,
        }
    }

    /// Adds a PDU Session Container.
    pub fn with_pdu_session(mut self, container: PduSessionContainer) -> Self {
        self.pdu_session = Some(container);
        self
    }

    fn header_len(&self) -> usize {
        if self.pdu_session.is_some() {
            Self::EXT_SIZE
        } else {
            Self::MIN_SIZE
        }
    }

    /// Encapsulates `payload` behind this header.
    pub fn encap(&self, payload: &[u8]) -> BytesMut {
        let mut buf = BytesMut::with_capacity(self.header_len() + payload.len());

        let mut flags = (GTP_VERSION << 5) | FLAG_PT;
        if self.pdu_session.is_some() {
            flags |= FLAG_E;
        }
        buf.put_u8(flags);
        buf.put_u8(MSG_TYPE_TPDU);

        // Length covers everything after the TEID.
        let length = payload.len() + self.header_len() - Self::MIN_SIZE;
        buf.put_u16(length as u16);
        buf.put_u32(self.teid);

        if let Some(container) = &self.pdu_session {
            // Sequence number and N-PDU number, unused.
            buf.put_slice(&[0, 0, 0]);
            buf.put_u8(EXT_TYPE_PDU_SESSION_CONTAINER);
            let content = container.content();
            // Extension length in 4-octet units, including the length
            // and next-type octets.
            buf.put_u8(((content.len() + 2) / 4) as u8);
            buf.put_slice(&content);
            buf.put_u8(EXT_TYPE_NONE);
        }

        buf.put_slice(payload);
        buf
    }

    /// Decapsulates a frame, returning the header and the payload
    /// slice. Malformed frames are an error, never an empty payload.
    pub fn decap(frame: &[u8]) -> Result<(GtpHeader, &[u8]), GtpError> {
        if frame.len() < Self::MIN_SIZE {
            return Err(GtpError::TooShort {
                needed: Self::MIN_SIZE,
                available: frame.len(),
            });
        }

        let flags = frame[0];
        let version = flags >> 5;
        if version != GTP_VERSION {
            return Err(GtpError::BadVersion(version));
        }
        if flags & FLAG_PT == 0 {
            return Err(GtpError::NotGtpU);
        }

        let length = usize::from(u16::from_be_bytes([frame[2], frame[3]]));
        let teid = u32::from_be_bytes([frame[4], frame[5], frame[6], frame[7]]);
        let end = Self::MIN_SIZE + length;
        if frame.len() < end {
            return Err(GtpError::TooShort {
                needed: end,
                available: frame.len(),
            });
        }

        let mut pdu_session = None;
        let mut offset = Self::MIN_SIZE;
        if flags & FLAG_E != 0 {
            // Skip sequence and N-PDU number, then walk the chain.
            if end < offset + 4 {
                return Err(GtpError::TooShort {
                    needed: offset + 4,
                    available: end,
                });
            }
            let mut next_type = frame[offset + 3];
            offset += 4;

            while next_type != EXT_TYPE_NONE {
                if next_type != EXT_TYPE_PDU_SESSION_CONTAINER {
                    return Err(GtpError::UnsupportedExtension(next_type));
                }
                if end < offset + 2 {
                    return Err(GtpError::TooShort {
                        needed: offset + 2,
                        available: end,
                    });
                }
                let ext_len = usize::from(frame[offset]) * 4;
                if ext_len == 0 || end < offset + ext_len {
                    return Err(GtpError::BadExtensionLength(frame[offset]));
                }
                let content = &frame[offset + 1..offset + ext_len - 1];
                if content.len() >= 2 {
                    let direction = if content[0] >> 4 == 0 {
                        PduDirection::Downlink
                    } else {
                        PduDirection::Uplink
                    };
                    pdu_session = Some(PduSessionContainer {
                        direction,
                        qfi: content[1] & 0x3f,
                    });
                }
                next_type = frame[offset + ext_len - 1];
                offset += ext_len;
            }
        }

        Ok((GtpHeader { teid, pdu_session }, &frame[offset..end]))
    }
}
