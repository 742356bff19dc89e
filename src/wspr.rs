//! WSPR Message Encoder
//!
//! Encodes a standard (type 1) WSPR message: callsign, 4-character locator
//! and power are packed into 50 bits, convolutionally encoded (K=32, r=1/2),
//! interleaved and merged with the sync vector into 162 four-level tones.

use core::fmt;

use crate::config::WSPR_SYMBOL_COUNT;
use crate::locator::Locator;
use crate::types::PowerDbm;

/// Convolutional code generator polynomials
const POLY_A: u32 = 0xF2D0_5351;
const POLY_B: u32 = 0xE461_3C47;

/// Packed message length in bytes (50 data bits plus the encoder tail)
const PACKED_LEN: usize = 11;

/// Pseudo-random synchronisation vector, one bit per symbol
const SYNC_VECTOR: [u8; WSPR_SYMBOL_COUNT] = [
    1, 1, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 1, 1, 1, 0, 0, 0, 1, 0, //
    0, 1, 0, 1, 1, 1, 1, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 1, 0, 1, //
    0, 0, 0, 0, 0, 0, 1, 0, 1, 1, 0, 0, 1, 1, 0, 1, 0, 0, 0, 1, //
    1, 0, 1, 0, 0, 0, 0, 1, 1, 0, 1, 0, 1, 0, 1, 0, 1, 0, 0, 1, //
    0, 0, 1, 0, 1, 1, 0, 0, 0, 1, 1, 0, 1, 0, 1, 0, 0, 0, 1, 0, //
    0, 0, 0, 0, 1, 0, 0, 1, 0, 0, 1, 1, 1, 0, 1, 1, 0, 0, 1, 1, //
    0, 1, 0, 0, 0, 1, 1, 1, 0, 0, 0, 0, 0, 1, 0, 1, 0, 0, 1, 1, //
    0, 0, 0, 0, 0, 0, 0, 1, 1, 0, 1, 0, 1, 1, 0, 0, 0, 1, 1, 0, //
    0, 0,
];

/// Why a message could not be encoded
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EncodeError {
    /// Callsign does not fit the type 1 format
    Callsign,
    /// Locator is not `[A-R][A-R][0-9][0-9]`
    Locator,
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Callsign => write!(f, "callsign not encodable"),
            Self::Locator => write!(f, "locator not encodable"),
        }
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for EncodeError {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Callsign => defmt::write!(f, "callsign not encodable"),
            Self::Locator => defmt::write!(f, "locator not encodable"),
        }
    }
}

/// One transmission's worth of tone indices (0-3)
#[derive(Clone, PartialEq, Eq)]
pub struct SymbolBuffer([u8; WSPR_SYMBOL_COUNT]);

impl SymbolBuffer {
    /// The tone indices in transmission order
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    /// Always `WSPR_SYMBOL_COUNT`
    #[must_use]
    pub const fn len(&self) -> usize {
        WSPR_SYMBOL_COUNT
    }

    /// Never empty
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }
}

impl fmt::Debug for SymbolBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SymbolBuffer({} symbols)", self.0.len())
    }
}

/// Turns a message into tone indices
pub trait SymbolEncoder {
    /// Encoding failure
    type Error;

    /// Encode callsign, locator and power
    fn encode(
        &self,
        callsign: &str,
        locator: &Locator,
        power: PowerDbm,
    ) -> Result<SymbolBuffer, Self::Error>;
}

/// Standard WSPR encoder
#[derive(Clone, Copy, Debug, Default)]
pub struct WsprEncoder;

impl WsprEncoder {
    /// Create the encoder
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl SymbolEncoder for WsprEncoder {
    type Error = EncodeError;

    fn encode(
        &self,
        callsign: &str,
        locator: &Locator,
        power: PowerDbm,
    ) -> Result<SymbolBuffer, EncodeError> {
        let n = pack_callsign(callsign)?;
        let m = pack_locator_power(locator.as_str(), power)?;

        let packed = pack_message(n, m);
        let coded = convolve(&packed);
        let data = interleave(&coded);

        let mut symbols = [0u8; WSPR_SYMBOL_COUNT];
        for (i, symbol) in symbols.iter_mut().enumerate() {
            *symbol = SYNC_VECTOR[i] + 2 * data[i];
        }
        Ok(SymbolBuffer(symbols))
    }
}

/// 0-9 -> 0-9, A-Z -> 10-35, space -> 36
fn char_value(c: u8) -> Option<u32> {
    match c {
        b'0'..=b'9' => Some(u32::from(c - b'0')),
        b'A'..=b'Z' => Some(u32::from(c - b'A') + 10),
        b' ' => Some(36),
        _ => None,
    }
}

/// Pad the callsign to six characters with the area digit in position 2
fn normalize_callsign(callsign: &str) -> Result<[u8; 6], EncodeError> {
    let bytes = callsign.as_bytes();
    let shift = usize::from(
        bytes.len() > 1 && bytes[1].is_ascii_digit() && !bytes.get(2).is_some_and(u8::is_ascii_digit),
    );
    if bytes.is_empty() || bytes.len() + shift > 6 {
        return Err(EncodeError::Callsign);
    }

    let mut call = [b' '; 6];
    for (slot, &c) in call[shift..].iter_mut().zip(bytes) {
        *slot = c.to_ascii_uppercase();
    }
    Ok(call)
}

/// Pack a callsign into 28 bits
///
/// # Errors
/// Returns `EncodeError::Callsign` if the callsign is empty, too long,
/// has no area digit in position 1 or 2, or uses other characters than
/// letters, digits and spaces in the wrong places.
pub fn pack_callsign(callsign: &str) -> Result<u32, EncodeError> {
    let call = normalize_callsign(callsign)?;

    let v0 = char_value(call[0]).ok_or(EncodeError::Callsign)?;
    let v1 = char_value(call[1]).filter(|&v| v < 36).ok_or(EncodeError::Callsign)?;
    let v2 = char_value(call[2]).filter(|&v| v < 10).ok_or(EncodeError::Callsign)?;

    let mut n = v0;
    n = n * 36 + v1;
    n = n * 10 + v2;
    // Suffix is letters or space only: A-Z -> 0-25, space -> 26
    for &c in &call[3..] {
        let v = char_value(c).filter(|&v| v >= 10).ok_or(EncodeError::Callsign)?;
        n = n * 27 + (v - 10);
    }
    Ok(n)
}

/// Pack a 4-character locator and power into 22 bits
///
/// # Errors
/// Returns `EncodeError::Locator` if the locator is malformed.
pub fn pack_locator_power(locator: &str, power: PowerDbm) -> Result<u32, EncodeError> {
    let loc = Locator::parse(locator).ok_or(EncodeError::Locator)?;
    let b = loc.as_bytes();
    let lon_field = u32::from(b[0] - b'A');
    let lat_field = u32::from(b[1] - b'A');
    let lon_square = u32::from(b[2] - b'0');
    let lat_square = u32::from(b[3] - b'0');

    let m = (179 - 10 * lon_field - lon_square) * 180 + 10 * lat_field + lat_square;
    Ok(m * 128 + u32::from(power.as_dbm()) + 64)
}

/// 28-bit callsign and 22-bit locator/power, MSB first, zero tail
fn pack_message(n: u32, m: u32) -> [u8; PACKED_LEN] {
    let mut c = [0u8; PACKED_LEN];
    c[0] = (n >> 20) as u8;
    c[1] = (n >> 12) as u8;
    c[2] = (n >> 4) as u8;
    c[3] = (((n & 0x0f) << 4) | ((m >> 18) & 0x0f)) as u8;
    c[4] = (m >> 10) as u8;
    c[5] = (m >> 2) as u8;
    c[6] = ((m & 0x03) << 6) as u8;
    c
}

fn parity(x: u32) -> u8 {
    (x.count_ones() & 1) as u8
}

/// Rate 1/2 convolutional code over the packed bits
fn convolve(packed: &[u8; PACKED_LEN]) -> [u8; WSPR_SYMBOL_COUNT] {
    let mut out = [0u8; WSPR_SYMBOL_COUNT];
    let mut reg: u32 = 0;
    let mut k = 0;

    'bytes: for &byte in packed {
        for bit in (0..8).rev() {
            reg = (reg << 1) | u32::from((byte >> bit) & 1);
            out[k] = parity(reg & POLY_A);
            out[k + 1] = parity(reg & POLY_B);
            k += 2;
            if k >= WSPR_SYMBOL_COUNT {
                break 'bytes;
            }
        }
    }
    out
}

/// Bit-reversal interleave: bit `i` goes to the `i`-th index whose 8-bit
/// reversal is below the symbol count
fn interleave(coded: &[u8; WSPR_SYMBOL_COUNT]) -> [u8; WSPR_SYMBOL_COUNT] {
    let mut out = [0u8; WSPR_SYMBOL_COUNT];
    let mut i = 0;
    for j in 0..=u8::MAX {
        let dest = usize::from(j.reverse_bits());
        if dest < WSPR_SYMBOL_COUNT {
            out[dest] = coded[i];
            i += 1;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sync_vector_is_binary() {
        assert!(SYNC_VECTOR.iter().all(|&s| s <= 1));
    }

    #[test]
    fn interleave_is_a_permutation() {
        let mut coded = [0u8; WSPR_SYMBOL_COUNT];
        coded[0] = 1;
        coded[1] = 1;
        let out = interleave(&coded);
        assert_eq!(out.iter().filter(|&&b| b == 1).count(), 2);
        // j = 0 and j = 128 reverse to 0 and 1
        assert_eq!(out[0], 1);
        assert_eq!(out[1], 1);
    }

    #[test]
    fn callsign_with_leading_digit_position_is_shifted() {
        assert_eq!(normalize_callsign("K1ABC"), Ok(*b" K1ABC"));
        assert_eq!(normalize_callsign("VK2XYZ"), Ok(*b"VK2XYZ"));
        assert_eq!(normalize_callsign("g4abc"), Ok(*b" G4ABC"));
        assert_eq!(normalize_callsign("N0CALL"), Err(EncodeError::Callsign));
    }

    #[test]
    fn message_bytes() {
        let packed = pack_message(259_047_992, 2_896_997);
        assert_eq!(packed, [247, 12, 35, 139, 13, 25, 64, 0, 0, 0, 0]);
    }
}
