use crate::blocks::ofdm::OfdmError;

/// Header size in bytes
pub const HEADER_BYTES: usize = 4;
/// Longest payload the 12-bit length field can describe
pub const MAX_PAYLOAD_LEN: usize = 0x0fff;

/// Frame header.
///
/// Two copies of the same 16-bit field, sent big endian. The field holds the
/// payload length in the lower 12 bits and the whitener offset in the upper
/// 4 bits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameHeader {
    /// Payload length in bytes
    pub payload_len: u16,
    /// Whitener offset
    pub whitener_offset: u8,
}

impl FrameHeader {
    /// Create a header, checking that both fields fit.
    pub fn new(payload_len: usize, whitener_offset: u8) -> Result<Self, OfdmError> {
        if payload_len > MAX_PAYLOAD_LEN {
            return Err(OfdmError::PayloadOverrun {
                len: payload_len,
                max: MAX_PAYLOAD_LEN,
            });
        }
        if whitener_offset > 0x0f {
            return Err(OfdmError::InvalidParameter(format!(
                "whitener offset {whitener_offset} exceeds 4 bits"
            )));
        }
        Ok(FrameHeader {
            payload_len: payload_len as u16,
            whitener_offset,
        })
    }

    /// Decode the header fields from the upper copy.
    pub fn from_word(word: u32) -> Self {
        FrameHeader {
            payload_len: ((word >> 16) & 0x0fff) as u16,
            whitener_offset: ((word >> 28) & 0x0f) as u8,
        }
    }

    /// Both copies of the header agree.
    pub fn is_valid(word: u32) -> bool {
        (word >> 16) == (word & 0xffff)
    }

    /// Encode the header.
    pub fn to_word(&self) -> u32 {
        let x = ((self.whitener_offset as u32 & 0x0f) << 12) | (self.payload_len as u32 & 0x0fff);
        (x << 16) | x
    }

    /// Encoded header in transmission order.
    pub fn to_bytes(&self) -> [u8; HEADER_BYTES] {
        self.to_word().to_be_bytes()
    }
}
