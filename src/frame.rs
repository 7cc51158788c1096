//! Length-prefixed payload framing.
//!
//! Layout on the wire: a 32-bit big-endian byte count, then the payload bytes. Bits are
//! taken most significant first.

use bitvec::prelude::*;

use crate::error::{Result, StegoError};
use crate::qim::Bits;

pub const HEADER_LEN: usize = 4;
pub const HEADER_BITS: usize = HEADER_LEN * 8;

/// Header followed by payload, as a bit sequence.
pub fn frame(payload: &[u8]) -> Result<Bits> {
    let len = u32::try_from(payload.len()).map_err(|_| StegoError::PayloadTooLarge(payload.len()))?;
    let mut bytes = Vec::with_capacity(HEADER_LEN + payload.len());
    bytes.extend_from_slice(&len.to_be_bytes());
    bytes.extend_from_slice(payload);
    Ok(Bits::from_vec(bytes))
}

/// Payload length announced by the first [`HEADER_BITS`] bits.
pub fn parse_length(bits: &BitSlice<u8, Msb0>) -> Result<usize> {
    if bits.len() < HEADER_BITS {
        return Err(StegoError::Truncated {
            required: HEADER_BITS,
            available: bits.len(),
        });
    }
    Ok(bits[..HEADER_BITS].load_be::<u32>() as usize)
}

/// Inverse of [`frame`], returning the announced length and the payload. Bits past the
/// announced payload are ignored.
pub fn unframe(bits: &BitSlice<u8, Msb0>) -> Result<(usize, Vec<u8>)> {
    let len = parse_length(bits)?;
    let required = HEADER_BITS + len * 8;
    if bits.len() < required {
        return Err(StegoError::Truncated {
            required,
            available: bits.len(),
        });
    }
    let payload = bits[HEADER_BITS..required]
        .chunks(8)
        .map(|byte| byte.load_be::<u8>())
        .collect();
    Ok((len, payload))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_is_big_endian() {
        let bits = frame(b"Hi").unwrap();
        assert_eq!(bits.len(), 48);
        assert_eq!(bits.as_raw_slice(), &[0, 0, 0, 2, b'H', b'i']);
        assert_eq!(parse_length(&bits).unwrap(), 2);
        assert_eq!(unframe(&bits).unwrap(), (2, b"Hi".to_vec()));
    }

    #[test]
    fn empty_payload() {
        let bits = frame(&[]).unwrap();
        assert_eq!(bits.len(), HEADER_BITS);
        assert_eq!(unframe(&bits).unwrap(), (0, vec![]));
    }

    #[test]
    fn trailing_bits_are_ignored() {
        let mut bits = frame(&[0xA5, 0x0F]).unwrap();
        bits.extend_from_bitslice(bits![u8, Msb0; 1, 0, 1]);
        assert_eq!(unframe(&bits).unwrap().1, vec![0xA5, 0x0F]);
    }

    #[test]
    fn short_input_is_truncated() {
        let bits = frame(&[1, 2, 3]).unwrap();
        let err = unframe(&bits[..40]).unwrap_err();
        assert!(matches!(err, StegoError::Truncated { required: 56, available: 40 }));
        assert!(parse_length(&bits[..31]).is_err());
    }
}
