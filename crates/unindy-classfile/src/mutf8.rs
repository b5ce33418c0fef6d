//! Modified UTF-8 as used by `CONSTANT_Utf8_info`.
//!
//! The encoding differs from standard UTF-8 in two ways: `U+0000` is written as the two
//! byte sequence `C0 80`, and supplementary characters are written as a pair of
//! three-byte encoded surrogates.

use crate::error::{Error, Result};

pub(crate) fn decode(bytes: &[u8]) -> Result<String> {
    let mut units = Vec::with_capacity(bytes.len());
    let mut idx = 0;
    while idx < bytes.len() {
        let b0 = bytes[idx];
        if b0 != 0 && b0 < 0x80 {
            units.push(b0 as u16);
            idx += 1;
        } else if b0 & 0xE0 == 0xC0 {
            let b1 = continuation(bytes, idx + 1)?;
            units.push((((b0 & 0x1F) as u16) << 6) | b1);
            idx += 2;
        } else if b0 & 0xF0 == 0xE0 {
            let b1 = continuation(bytes, idx + 1)?;
            let b2 = continuation(bytes, idx + 2)?;
            units.push((((b0 & 0x0F) as u16) << 12) | (b1 << 6) | b2);
            idx += 3;
        } else {
            return Err(Error::InvalidModifiedUtf8);
        }
    }
    String::from_utf16(&units).map_err(|_| Error::InvalidModifiedUtf8)
}

fn continuation(bytes: &[u8], idx: usize) -> Result<u16> {
    match bytes.get(idx) {
        Some(b) if b & 0xC0 == 0x80 => Ok((b & 0x3F) as u16),
        _ => Err(Error::InvalidModifiedUtf8),
    }
}

pub(crate) fn encode(value: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(value.len());
    for unit in value.encode_utf16() {
        match unit {
            0x0001..=0x007F => out.push(unit as u8),
            0x0000 | 0x0080..=0x07FF => {
                out.push(0xC0 | ((unit >> 6) & 0x1F) as u8);
                out.push(0x80 | (unit & 0x3F) as u8);
            }
            _ => {
                out.push(0xE0 | ((unit >> 12) & 0x0F) as u8);
                out.push(0x80 | ((unit >> 6) & 0x3F) as u8);
                out.push(0x80 | (unit & 0x3F) as u8);
            }
        }
    }
    out
}
