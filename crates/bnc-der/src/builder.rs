// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Barnacle Systems Inc.

//! Streaming DER builder with nested-length backpatching
//!
//! Constructed types are opened with a `start_*` call that records the
//! payload start offset on a small frame stack and writes only the tag
//! byte. When the matching [`DerBuilder::pop_nesting`] runs, the payload
//! span is measured, shifted right by the width of the definite-length
//! header, and the length is written into the gap. A complete top-level
//! structure therefore exists only when the nesting depth is back to 0.

use bnc_common::Error;
use core::fmt;

/// Maximum nesting depth of constructed types
pub const DER_MAX_NESTED: usize = 16;

/// Buffer size sufficient for any TBS structure this suite builds
pub const DER_MAX_TBS: usize = 1024;

/// Longest value length the 0x82 long form used here can express
const MAX_ENCODABLE_LEN: usize = 0xFFFF;

const TAG_BOOLEAN: u8 = 0x01;
const TAG_INTEGER: u8 = 0x02;
const TAG_BIT_STRING: u8 = 0x03;
const TAG_OCTET_STRING: u8 = 0x04;
const TAG_OID: u8 = 0x06;
const TAG_UTF8_STRING: u8 = 0x0C;
const TAG_UTC_TIME: u8 = 0x17;
const TAG_SEQUENCE: u8 = 0x30;
const TAG_SET: u8 = 0x31;
const TAG_CONTEXT_CONSTRUCTED: u8 = 0xA0;

/// Errors raised by the DER builder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DerError {
    /// Output buffer exhausted
    Overflow,
    /// Frame stack exhausted
    NestingOverflow,
    /// Pop with no open construction
    NestingUnderflow,
    /// Value cannot be encoded (too long, malformed)
    InvalidValue,
    /// Structure completed with open constructions
    Unbalanced,
    /// Builder already failed; encoding must be restarted
    Poisoned,
}

impl fmt::Display for DerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::Overflow => "DER buffer overflow",
            Self::NestingOverflow => "DER nesting too deep",
            Self::NestingUnderflow => "DER pop without start",
            Self::InvalidValue => "value not DER-encodable",
            Self::Unbalanced => "DER structure unbalanced",
            Self::Poisoned => "DER builder poisoned",
        };
        f.write_str(msg)
    }
}

impl From<DerError> for Error {
    fn from(e: DerError) -> Self {
        match e {
            DerError::Overflow => Error::DerOverflow,
            DerError::NestingOverflow => Error::DerNestingOverflow,
            DerError::NestingUnderflow => Error::DerNestingUnderflow,
            DerError::InvalidValue => Error::DerInvalidValue,
            DerError::Unbalanced => Error::DerUnbalanced,
            DerError::Poisoned => Error::InternalError,
        }
    }
}

type DerResult<T = ()> = core::result::Result<T, DerError>;

/// Width of the definite-length header encoding `len`
const fn len_header_size(len: usize) -> DerResult<usize> {
    match len {
        0..=0x7F => Ok(1),
        0x80..=0xFF => Ok(2),
        0x100..=MAX_ENCODABLE_LEN => Ok(3),
        _ => Err(DerError::InvalidValue),
    }
}

/// Streaming DER encoder over a caller-owned buffer
pub struct DerBuilder<'a> {
    buf: &'a mut [u8],
    pos: usize,
    frames: [usize; DER_MAX_NESTED],
    depth: usize,
    poisoned: bool,
}

impl<'a> DerBuilder<'a> {
    /// Create a builder over `buf`
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self {
            buf,
            pos: 0,
            frames: [0; DER_MAX_NESTED],
            depth: 0,
            poisoned: false,
        }
    }

    /// Bytes encoded so far
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.pos]
    }

    /// Current write position
    #[must_use]
    pub const fn position(&self) -> usize {
        self.pos
    }

    /// Number of open constructions
    #[must_use]
    pub const fn nesting_depth(&self) -> usize {
        self.depth
    }

    fn guard(&self) -> DerResult {
        if self.poisoned {
            Err(DerError::Poisoned)
        } else {
            Ok(())
        }
    }

    /// Run `f`; on failure, poison the builder
    fn tracked<T>(&mut self, f: impl FnOnce(&mut Self) -> DerResult<T>) -> DerResult<T> {
        self.guard()?;
        let result = f(self);
        if result.is_err() {
            self.poisoned = true;
        }
        result
    }

    fn put(&mut self, byte: u8) -> DerResult {
        if self.pos >= self.buf.len() {
            return Err(DerError::Overflow);
        }
        self.buf[self.pos] = byte;
        self.pos += 1;
        Ok(())
    }

    fn put_slice(&mut self, bytes: &[u8]) -> DerResult {
        if self.buf.len() - self.pos < bytes.len() {
            return Err(DerError::Overflow);
        }
        self.buf[self.pos..self.pos + bytes.len()].copy_from_slice(bytes);
        self.pos += bytes.len();
        Ok(())
    }

    /// Write a definite-length header at the current position
    fn put_len(&mut self, len: usize) -> DerResult {
        match len_header_size(len)? {
            1 => self.put(len as u8),
            2 => {
                self.put(0x81)?;
                self.put(len as u8)
            }
            _ => {
                self.put(0x82)?;
                self.put((len >> 8) as u8)?;
                self.put(len as u8)
            }
        }
    }

    fn push_frame(&mut self) -> DerResult {
        if self.depth >= DER_MAX_NESTED {
            return Err(DerError::NestingOverflow);
        }
        self.frames[self.depth] = self.pos;
        self.depth += 1;
        Ok(())
    }

    // =========================================================================
    // Primitive adders
    // =========================================================================

    /// Add an INTEGER from an unsigned 32-bit value
    pub fn add_integer(&mut self, val: u32) -> DerResult {
        self.add_integer_bytes(&val.to_be_bytes())
    }

    /// Add an INTEGER from unsigned big-endian bytes
    ///
    /// Leading zeros are trimmed; a zero byte is prepended when the most
    /// significant remaining bit is set, keeping the value non-negative.
    pub fn add_integer_bytes(&mut self, val: &[u8]) -> DerResult {
        self.tracked(|b| {
            if val.is_empty() || val.len() >= 128 {
                return Err(DerError::InvalidValue);
            }

            let leading = val.iter().take_while(|&&v| v == 0).count();
            let trimmed = if leading == val.len() {
                // Value zero: keep one zero octet.
                &val[val.len() - 1..]
            } else {
                &val[leading..]
            };
            let pad = trimmed[0] >= 0x80;

            b.put(TAG_INTEGER)?;
            b.put((trimmed.len() + usize::from(pad)) as u8)?;
            if pad {
                b.put(0x00)?;
            }
            b.put_slice(trimmed)
        })
    }

    /// Add `[0] { INTEGER }` with a short payload, the X.509 version field
    pub fn add_short_explicit_integer(&mut self, val: u32) -> DerResult {
        self.tracked(|b| {
            if val >= 127 {
                return Err(DerError::InvalidValue);
            }
            b.put(TAG_CONTEXT_CONSTRUCTED)?;
            // Payload is always `02 01 VV`.
            b.put(3)?;
            b.put(TAG_INTEGER)?;
            b.put(1)?;
            b.put(val as u8)
        })
    }

    /// Add a BOOLEAN
    pub fn add_boolean(&mut self, val: bool) -> DerResult {
        self.tracked(|b| {
            b.put(TAG_BOOLEAN)?;
            b.put(1)?;
            b.put(if val { 0xFF } else { 0x00 })
        })
    }

    /// Add an OBJECT IDENTIFIER from its arc values
    pub fn add_oid(&mut self, arcs: &[u32]) -> DerResult {
        self.tracked(|b| {
            if arcs.len() < 2 || arcs.len() > 16 {
                return Err(DerError::InvalidValue);
            }

            b.put(TAG_OID)?;
            let len_pos = b.pos;
            b.put(0)?; // patched below; short form only

            // First octet packs the first two arcs.
            let first = arcs[0]
                .checked_mul(40)
                .and_then(|v| v.checked_add(arcs[1]))
                .ok_or(DerError::InvalidValue)?;
            if first > 0xFF {
                return Err(DerError::InvalidValue);
            }
            b.put(first as u8)?;

            // Remaining arcs are base-128 with continuation bits.
            for &arc in &arcs[2..] {
                let mut digits = [0u8; 5];
                let mut count = 0;
                let mut val = arc;
                loop {
                    digits[count] = (val % 128) as u8;
                    count += 1;
                    val /= 128;
                    if val == 0 {
                        break;
                    }
                }
                for k in (0..count).rev() {
                    let mut byte = digits[k];
                    if k != 0 {
                        byte |= 0x80;
                    }
                    b.put(byte)?;
                }
            }

            let encoded = b.pos - len_pos - 1;
            if encoded >= 128 {
                return Err(DerError::InvalidValue);
            }
            b.buf[len_pos] = encoded as u8;
            Ok(())
        })
    }

    /// Add a UTCTime; the value must be exactly `YYMMDDhhmmssZ`
    pub fn add_utc_time(&mut self, time: &str) -> DerResult {
        self.tracked(|b| {
            if time.len() != 13 || !time.is_ascii() {
                return Err(DerError::InvalidValue);
            }
            b.put(TAG_UTC_TIME)?;
            b.put(13)?;
            b.put_slice(time.as_bytes())
        })
    }

    /// Add a UTF8String
    pub fn add_utf8_string(&mut self, s: &str) -> DerResult {
        self.tracked(|b| {
            if s.len() >= 127 {
                return Err(DerError::InvalidValue);
            }
            b.put(TAG_UTF8_STRING)?;
            b.put(s.len() as u8)?;
            b.put_slice(s.as_bytes())
        })
    }

    /// Add an OCTET STRING
    pub fn add_octet_string(&mut self, bytes: &[u8]) -> DerResult {
        self.tracked(|b| {
            b.put(TAG_OCTET_STRING)?;
            b.put_len(bytes.len())?;
            b.put_slice(bytes)
        })
    }

    /// Add a BIT STRING with no unused bits
    pub fn add_bit_string(&mut self, bytes: &[u8]) -> DerResult {
        self.tracked(|b| {
            b.put(TAG_BIT_STRING)?;
            b.put_len(bytes.len() + 1)?;
            b.put(0x00)?;
            b.put_slice(bytes)
        })
    }

    // =========================================================================
    // Structural markers
    // =========================================================================

    /// Open a SEQUENCE
    pub fn start_sequence(&mut self) -> DerResult {
        self.tracked(|b| {
            b.put(TAG_SEQUENCE)?;
            b.push_frame()
        })
    }

    /// Open a SET
    pub fn start_set(&mut self) -> DerResult {
        self.tracked(|b| {
            b.put(TAG_SET)?;
            b.push_frame()
        })
    }

    /// Open an explicit context tag `[num]`
    pub fn start_explicit(&mut self, num: u32) -> DerResult {
        self.tracked(|b| {
            if num > 30 {
                return Err(DerError::InvalidValue);
            }
            b.put(TAG_CONTEXT_CONSTRUCTED + num as u8)?;
            b.push_frame()
        })
    }

    /// Open an OCTET STRING that envelops further DER content
    pub fn start_enveloping_octet_string(&mut self) -> DerResult {
        self.tracked(|b| {
            b.put(TAG_OCTET_STRING)?;
            b.push_frame()
        })
    }

    /// Open a BIT STRING that envelops further DER content
    ///
    /// The unused-bits octet is part of the payload and is always zero.
    pub fn start_enveloping_bit_string(&mut self) -> DerResult {
        self.tracked(|b| {
            b.put(TAG_BIT_STRING)?;
            b.push_frame()?;
            b.put(0x00)
        })
    }

    /// Close the innermost open construction
    ///
    /// Measures the payload written since the matching `start_*`, shifts
    /// it right by the width of the length header, and writes the header
    /// into the gap.
    pub fn pop_nesting(&mut self) -> DerResult {
        self.tracked(|b| {
            if b.depth == 0 {
                return Err(DerError::NestingUnderflow);
            }

            let start = b.frames[b.depth - 1];
            let payload = b.pos - start;
            let header = len_header_size(payload)?;

            if b.buf.len() - b.pos < header {
                return Err(DerError::Overflow);
            }
            b.buf.copy_within(start..b.pos, start + header);

            let end = b.pos + header;
            b.pos = start;
            b.put_len(payload)?;
            b.pos = end;
            b.depth -= 1;
            Ok(())
        })
    }

    /// Wrap the completed top-level structure in a new outer SEQUENCE
    ///
    /// Turns a finished TBS into the first element of a certificate; the
    /// caller appends the signature algorithm and signature, then pops the
    /// outer sequence.
    pub fn tbs_to_cert(&mut self) -> DerResult {
        self.tracked(|b| {
            if b.depth != 0 {
                return Err(DerError::Unbalanced);
            }
            if b.pos == 0 || b.pos >= b.buf.len() {
                return Err(DerError::Overflow);
            }
            b.buf.copy_within(0..b.pos, 1);
            b.buf[0] = TAG_SEQUENCE;
            b.frames[0] = 1;
            b.depth = 1;
            b.pos += 1;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build<const N: usize>(f: impl FnOnce(&mut DerBuilder<'_>) -> DerResult) -> std::vec::Vec<u8> {
        let mut buf = [0u8; N];
        let mut der = DerBuilder::new(&mut buf);
        f(&mut der).unwrap();
        assert_eq!(der.nesting_depth(), 0);
        der.as_bytes().to_vec()
    }

    #[test]
    fn encodes_small_integer() {
        assert_eq!(build::<16>(|d| d.add_integer(5)), &[0x02, 0x01, 0x05]);
    }

    #[test]
    fn integer_high_bit_gets_leading_zero() {
        assert_eq!(
            build::<16>(|d| d.add_integer_bytes(&[0x80])),
            &[0x02, 0x02, 0x00, 0x80]
        );
    }

    #[test]
    fn integer_leading_zeros_trimmed() {
        assert_eq!(
            build::<16>(|d| d.add_integer_bytes(&[0x00, 0x00, 0x01, 0x02])),
            &[0x02, 0x02, 0x01, 0x02]
        );
    }

    #[test]
    fn integer_zero_is_single_octet() {
        assert_eq!(
            build::<16>(|d| d.add_integer_bytes(&[0x00, 0x00])),
            &[0x02, 0x01, 0x00]
        );
    }

    #[test]
    fn boolean_uses_ff() {
        assert_eq!(build::<8>(|d| d.add_boolean(true)), &[0x01, 0x01, 0xFF]);
        assert_eq!(build::<8>(|d| d.add_boolean(false)), &[0x01, 0x01, 0x00]);
    }

    #[test]
    fn oid_matches_known_encoding() {
        // ecdsa-with-SHA256: 1.2.840.10045.4.3.2
        assert_eq!(
            build::<16>(|d| d.add_oid(&[1, 2, 840, 10045, 4, 3, 2])),
            &[0x06, 0x08, 0x2A, 0x86, 0x48, 0xCE, 0x3D, 0x04, 0x03, 0x02]
        );
    }

    #[test]
    fn oid_two_arcs() {
        // joint-iso-itu-t(2) 23
        assert_eq!(build::<8>(|d| d.add_oid(&[2, 23])), &[0x06, 0x01, 0x67]);
    }

    #[test]
    fn bit_string_prepends_unused_bits() {
        assert_eq!(
            build::<16>(|d| d.add_bit_string(&[0xAA, 0xBB])),
            &[0x03, 0x03, 0x00, 0xAA, 0xBB]
        );
    }

    #[test]
    fn sequence_short_form() {
        let out = build::<32>(|d| {
            d.start_sequence()?;
            d.add_integer(1)?;
            d.add_integer(2)?;
            d.pop_nesting()
        });
        assert_eq!(out, &[0x30, 0x06, 0x02, 0x01, 0x01, 0x02, 0x01, 0x02]);
    }

    #[test]
    fn long_form_lengths_backpatch() {
        // 200-byte payload forces the 0x81 form on the enclosing sequence.
        let out = build::<512>(|d| {
            d.start_sequence()?;
            d.add_octet_string(&[0x55u8; 200])?;
            d.pop_nesting()
        });
        assert_eq!(&out[..2], &[0x30, 0x81]);
        assert_eq!(out[2] as usize, out.len() - 3);
        // Inner octet string also long-form.
        assert_eq!(&out[3..6], &[0x04, 0x81, 200]);
    }

    #[test]
    fn very_long_payload_uses_two_byte_length() {
        let out = build::<600>(|d| {
            d.start_sequence()?;
            d.add_octet_string(&[0u8; 300])?;
            d.pop_nesting()
        });
        assert_eq!(&out[..2], &[0x30, 0x82]);
        let len = ((out[2] as usize) << 8) | out[3] as usize;
        assert_eq!(len, out.len() - 4);
    }

    #[test]
    fn explicit_tag_number_in_tag_byte() {
        let out = build::<16>(|d| {
            d.start_explicit(3)?;
            d.add_boolean(true)?;
            d.pop_nesting()
        });
        assert_eq!(out[0], 0xA3);
    }

    #[test]
    fn short_explicit_integer_shape() {
        assert_eq!(
            build::<8>(|d| d.add_short_explicit_integer(2)),
            &[0xA0, 0x03, 0x02, 0x01, 0x02]
        );
    }

    #[test]
    fn enveloping_bit_string_has_zero_unused_octet() {
        let out = build::<16>(|d| {
            d.start_enveloping_bit_string()?;
            d.add_boolean(true)?;
            d.pop_nesting()
        });
        assert_eq!(out, &[0x03, 0x04, 0x00, 0x01, 0x01, 0xFF]);
    }

    #[test]
    fn pop_on_empty_stack_fails() {
        let mut buf = [0u8; 16];
        let mut der = DerBuilder::new(&mut buf);
        assert_eq!(der.pop_nesting(), Err(DerError::NestingUnderflow));
    }

    #[test]
    fn overflow_poisons_builder() {
        let mut buf = [0u8; 4];
        let mut der = DerBuilder::new(&mut buf);
        assert_eq!(der.add_octet_string(&[0u8; 8]), Err(DerError::Overflow));
        // Builder is unusable afterwards, even for operations that fit.
        assert_eq!(der.add_boolean(true), Err(DerError::Poisoned));
    }

    #[test]
    fn nesting_depth_tracks_frames() {
        let mut buf = [0u8; 64];
        let mut der = DerBuilder::new(&mut buf);
        der.start_sequence().unwrap();
        der.start_sequence().unwrap();
        assert_eq!(der.nesting_depth(), 2);
        der.pop_nesting().unwrap();
        assert_eq!(der.nesting_depth(), 1);
        der.pop_nesting().unwrap();
        assert_eq!(der.nesting_depth(), 0);
    }

    #[test]
    fn tbs_to_cert_wraps_in_outer_sequence() {
        let mut buf = [0u8; 64];
        let mut der = DerBuilder::new(&mut buf);
        der.start_sequence().unwrap();
        der.add_integer(7).unwrap();
        der.pop_nesting().unwrap();
        let tbs_len = der.position();

        der.tbs_to_cert().unwrap();
        assert_eq!(der.nesting_depth(), 1);
        der.pop_nesting().unwrap();

        let out = der.as_bytes();
        assert_eq!(out[0], 0x30);
        assert_eq!(out[1] as usize, tbs_len);
        assert_eq!(&out[2..], &[0x30, 0x03, 0x02, 0x01, 0x07]);
    }

    #[test]
    fn utc_time_requires_exact_format_length() {
        let mut buf = [0u8; 32];
        let mut der = DerBuilder::new(&mut buf);
        assert_eq!(der.add_utc_time("17010100000Z"), Err(DerError::InvalidValue));

        let mut buf = [0u8; 32];
        let mut der = DerBuilder::new(&mut buf);
        der.add_utc_time("170101000000Z").unwrap();
        assert_eq!(der.as_bytes()[..2], [0x17, 13]);
    }
}
