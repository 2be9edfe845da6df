//! Single-character types in the three Unicode encoding widths.
//!
//! Each type carries exactly one Unicode scalar value, zero-padded to the
//! maximum unit count of its encoding (4 bytes for UTF-8, 2 units for
//! UTF-16). Conversions decode to a scalar value and re-encode into the
//! target width; ill-formed input fails with `InvalidEncoding`, never a
//! silent truncation.

use crate::{CdtError, CdtResult};

/// One character as 1-4 UTF-8 code units, zero-padded.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Char8(pub [u8; 4]);

/// One character as 1-2 UTF-16 code units, zero-padded.
/// Code points at or above U+10000 use a surrogate pair.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Char16(pub [u16; 2]);

/// One character as a single UTF-32 code unit.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Char32(pub u32);

fn utf8_seq_len(first: u8) -> Option<usize> {
    match first {
        0x00..=0x7F => Some(1),
        0xC2..=0xDF => Some(2),
        0xE0..=0xEF => Some(3),
        0xF0..=0xF4 => Some(4),
        _ => None,
    }
}

impl Char8 {
    /// Encode a scalar value.
    pub fn from_char(c: char) -> Self {
        let mut units = [0u8; 4];
        c.encode_utf8(&mut units);
        Char8(units)
    }

    /// Number of meaningful bytes, from the leading byte.
    pub fn len(&self) -> usize {
        utf8_seq_len(self.0[0]).unwrap_or(0)
    }

    /// Whether the leading byte does not start a valid sequence.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The meaningful bytes of the sequence; empty if the leading byte is
    /// invalid.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0[..self.len()]
    }

    /// Decode to a scalar value.
    pub fn to_char(&self) -> CdtResult<char> {
        let len = utf8_seq_len(self.0[0]).ok_or(CdtError::InvalidEncoding("UTF-8"))?;
        let s = std::str::from_utf8(&self.0[..len]).map_err(|_| CdtError::InvalidEncoding("UTF-8"))?;
        s.chars().next().ok_or(CdtError::InvalidEncoding("UTF-8"))
    }

    /// Re-encode as UTF-16.
    pub fn to_utf16(&self) -> CdtResult<Char16> {
        Ok(Char16::from_char(self.to_char()?))
    }

    /// Re-encode as UTF-32.
    pub fn to_utf32(&self) -> CdtResult<Char32> {
        Ok(Char32::from_char(self.to_char()?))
    }
}

impl Char16 {
    /// Encode a scalar value.
    pub fn from_char(c: char) -> Self {
        let mut units = [0u16; 2];
        c.encode_utf16(&mut units);
        Char16(units)
    }

    /// Number of meaningful units: 2 for a surrogate pair, otherwise 1.
    pub fn len(&self) -> usize {
        if (0xD800..=0xDBFF).contains(&self.0[0]) {
            2
        } else {
            1
        }
    }

    /// Always false; kept for symmetry with the slice-like accessors.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// The meaningful units of the sequence.
    pub fn as_units(&self) -> &[u16] {
        &self.0[..self.len()]
    }

    /// Decode to a scalar value. A lone or inverted surrogate is an error.
    pub fn to_char(&self) -> CdtResult<char> {
        char::decode_utf16(self.as_units().iter().copied())
            .next()
            .ok_or(CdtError::InvalidEncoding("UTF-16"))?
            .map_err(|_| CdtError::InvalidEncoding("UTF-16"))
    }

    /// Re-encode as UTF-8.
    pub fn to_utf8(&self) -> CdtResult<Char8> {
        Ok(Char8::from_char(self.to_char()?))
    }

    /// Re-encode as UTF-32.
    pub fn to_utf32(&self) -> CdtResult<Char32> {
        Ok(Char32::from_char(self.to_char()?))
    }
}

impl Char32 {
    /// Encode a scalar value.
    pub fn from_char(c: char) -> Self {
        Char32(c as u32)
    }

    /// Decode to a scalar value. Surrogate range and values above U+10FFFF
    /// are errors.
    pub fn to_char(&self) -> CdtResult<char> {
        char::from_u32(self.0).ok_or(CdtError::InvalidEncoding("UTF-32"))
    }

    /// Re-encode as UTF-8.
    pub fn to_utf8(&self) -> CdtResult<Char8> {
        Ok(Char8::from_char(self.to_char()?))
    }

    /// Re-encode as UTF-16.
    pub fn to_utf16(&self) -> CdtResult<Char16> {
        Ok(Char16::from_char(self.to_char()?))
    }
}
