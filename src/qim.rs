//! Parity quantization index modulation on single coefficients.
//!
//! A bit is carried by the parity of `round(value / step)`. Embedding moves the value to the
//! nearest lattice point of the right parity, so the distortion per coefficient is at most
//! `1.5 * step` and a read-back survives any drift below `step / 2`.

use bitvec::prelude::*;

use crate::dwt::SubbandSet;
use crate::error::{Result, StegoError};
use crate::selection::CoefficientAddress;

pub type Bits = BitVec<u8, Msb0>;

/// Quantizes `value` so that its level parity equals `bit`.
pub fn embed_bit(value: f64, bit: bool, step: f64) -> f64 {
    let level = (value / step).round();
    let quantized = level * step;
    if parity(level) == bit {
        quantized
    } else if quantized >= 0.0 {
        quantized + step
    } else {
        quantized - step
    }
}

pub fn extract_bit(value: f64, step: f64) -> bool {
    parity((value / step).round())
}

fn parity(level: f64) -> bool {
    (level as i64).rem_euclid(2) == 1
}

fn coefficient_mut(bands: &mut SubbandSet, addr: CoefficientAddress) -> Result<&mut f64> {
    let band = bands.band_mut(addr.band);
    if addr.row >= band.rows() || addr.col >= band.cols() {
        return Err(StegoError::AddressOutOfRange(addr));
    }
    Ok(&mut band[(addr.row, addr.col)])
}

/// Writes `bits[i]` into `addresses[i]` in place. Extra addresses are left alone.
pub(crate) fn embed_into(
    bands: &mut SubbandSet,
    addresses: &[CoefficientAddress],
    bits: &BitSlice<u8, Msb0>,
    step: f64,
) -> Result<()> {
    if addresses.len() < bits.len() {
        return Err(StegoError::InsufficientCoefficients {
            required: bits.len(),
            available: addresses.len(),
        });
    }
    for (addr, bit) in addresses.iter().zip(bits.iter()) {
        let value = coefficient_mut(bands, *addr)?;
        *value = embed_bit(*value, *bit, step);
    }
    Ok(())
}

/// Copy of `bands` with `bits` embedded at `addresses`.
pub fn embed_sequence(
    bands: &SubbandSet,
    addresses: &[CoefficientAddress],
    bits: &BitSlice<u8, Msb0>,
    step: f64,
) -> Result<SubbandSet> {
    let mut out = bands.clone();
    embed_into(&mut out, addresses, bits, step)?;
    Ok(out)
}

/// One bit per address, in address order.
pub fn extract_sequence(
    bands: &SubbandSet,
    addresses: &[CoefficientAddress],
    step: f64,
) -> Result<Bits> {
    let mut bits = Bits::with_capacity(addresses.len());
    for addr in addresses {
        let value = bands
            .band(addr.band)
            .get(addr.row, addr.col)
            .ok_or(StegoError::AddressOutOfRange(*addr))?;
        bits.push(extract_bit(value, step));
    }
    Ok(bits)
}
