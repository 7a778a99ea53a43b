// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Barnacle Systems Inc.

//! PEM encoding and decoding
//!
//! Wraps a DER buffer in the textual PEM armor the agent-side consumers
//! expect: `-----BEGIN <label>-----`, Base64 body at 64 columns, and the
//! matching `END` line. Decoding is the exact inverse and tolerates both
//! LF and CRLF line endings.

use base64ct::{Base64, Encoding};
use bnc_common::Error;

/// Bytes of DER encoded per full Base64 output line
const BYTES_PER_LINE: usize = 48;

/// Base64 columns per full line
const COLS_PER_LINE: usize = 64;

/// PEM type labels supported by this suite
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PemLabel {
    /// X.509 certificate
    Certificate,
    /// PKCS#10 certificate signing request
    CertificateRequest,
    /// SubjectPublicKeyInfo
    PublicKey,
    /// RFC 5915 EC private key
    EcPrivateKey,
}

impl PemLabel {
    /// The label text between the dashes
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Certificate => "CERTIFICATE",
            Self::CertificateRequest => "CERTIFICATE REQUEST",
            Self::PublicKey => "PUBLIC KEY",
            Self::EcPrivateKey => "EC PRIVATE KEY",
        }
    }
}

/// Length of the PEM encoding of `der_len` bytes under `label`
#[must_use]
pub fn pem_encoded_len(label: PemLabel, der_len: usize) -> usize {
    let b64 = der_len.div_ceil(3) * 4;
    let lines = b64.div_ceil(COLS_PER_LINE);
    let name = label.as_str().len();
    // "-----BEGIN -----\n" + "-----END -----\n" + body + one newline per line
    (16 + name + 1) + (14 + name + 1) + b64 + lines
}

/// Encode `der` as PEM into `out`, returning the number of bytes written
///
/// # Errors
///
/// Returns `Error::PemOverflow` when `out` cannot hold the armor.
pub fn der_to_pem(der: &[u8], label: PemLabel, out: &mut [u8]) -> Result<usize, Error> {
    let required = pem_encoded_len(label, der.len());
    if out.len() < required {
        return Err(Error::PemOverflow);
    }

    fn put(out: &mut [u8], pos: &mut usize, bytes: &[u8]) {
        out[*pos..*pos + bytes.len()].copy_from_slice(bytes);
        *pos += bytes.len();
    }

    let mut pos = 0;
    put(out, &mut pos, b"-----BEGIN ");
    put(out, &mut pos, label.as_str().as_bytes());
    put(out, &mut pos, b"-----\n");

    for chunk in der.chunks(BYTES_PER_LINE) {
        let line_len = chunk.len().div_ceil(3) * 4;
        Base64::encode(chunk, &mut out[pos..pos + line_len])
            .map_err(|_| Error::PemOverflow)?;
        pos += line_len;
        out[pos] = b'\n';
        pos += 1;
    }

    put(out, &mut pos, b"-----END ");
    put(out, &mut pos, label.as_str().as_bytes());
    put(out, &mut pos, b"-----\n");

    debug_assert_eq!(pos, required);
    Ok(pos)
}

/// Decode a PEM block into `out`, returning the DER length
///
/// The label is checked against `label`. Input may carry trailing data
/// after the END line (NUL separators, further blocks); it is ignored.
///
/// # Errors
///
/// Returns `Error::PemMalformed` for bad armor or Base64, and
/// `Error::PemOverflow` when `out` is too small.
pub fn pem_to_der(pem: &[u8], label: PemLabel, out: &mut [u8]) -> Result<usize, Error> {
    let text = core::str::from_utf8(pem).map_err(|_| Error::PemMalformed)?;

    let mut begin = [0u8; 40];
    let begin_len = 11 + label.as_str().len() + 5;
    begin[..11].copy_from_slice(b"-----BEGIN ");
    begin[11..11 + label.as_str().len()].copy_from_slice(label.as_str().as_bytes());
    begin[11 + label.as_str().len()..begin_len].copy_from_slice(b"-----");
    let begin = core::str::from_utf8(&begin[..begin_len]).map_err(|_| Error::PemMalformed)?;

    let body_start = text.find(begin).ok_or(Error::PemMalformed)? + begin.len();
    let body_end = text[body_start..]
        .find("-----END ")
        .ok_or(Error::PemMalformed)?
        + body_start;

    // Collect base64 characters four at a time and decode per quantum so
    // no intermediate buffer scaled to the input is needed.
    let mut quantum = [0u8; 4];
    let mut filled = 0;
    let mut written = 0;

    for &byte in text[body_start..body_end].as_bytes() {
        if byte == b'\n' || byte == b'\r' {
            continue;
        }
        quantum[filled] = byte;
        filled += 1;
        if filled == 4 {
            let mut decoded = [0u8; 3];
            let chunk = Base64::decode(&quantum, &mut decoded)
                .map_err(|_| Error::PemMalformed)?;
            if out.len() - written < chunk.len() {
                return Err(Error::PemOverflow);
            }
            out[written..written + chunk.len()].copy_from_slice(chunk);
            written += chunk.len();
            filled = 0;
        }
    }

    if filled != 0 {
        return Err(Error::PemMalformed);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_produces_armor_and_64_columns() {
        let der = [0x30u8; 100];
        let mut pem = [0u8; 512];
        let len = der_to_pem(&der, PemLabel::Certificate, &mut pem).unwrap();

        let text = core::str::from_utf8(&pem[..len]).unwrap();
        assert!(text.starts_with("-----BEGIN CERTIFICATE-----\n"));
        assert!(text.ends_with("-----END CERTIFICATE-----\n"));

        let body: std::vec::Vec<&str> = text
            .lines()
            .filter(|l| !l.starts_with("-----"))
            .collect();
        assert!(body[..body.len() - 1].iter().all(|l| l.len() == 64));
        assert!(body.last().unwrap().len() <= 64);
    }

    #[test]
    fn round_trip_is_identity() {
        let mut der = [0u8; 300];
        for (i, b) in der.iter_mut().enumerate() {
            *b = (i % 251) as u8;
        }

        let mut pem = [0u8; 1024];
        let pem_len = der_to_pem(&der, PemLabel::Certificate, &mut pem).unwrap();

        let mut back = [0u8; 512];
        let der_len = pem_to_der(&pem[..pem_len], PemLabel::Certificate, &mut back).unwrap();
        assert_eq!(&back[..der_len], &der[..]);
    }

    #[test]
    fn round_trip_non_multiple_of_three() {
        for size in [1usize, 2, 3, 4, 47, 48, 49, 50] {
            let der: std::vec::Vec<u8> = (0..size).map(|i| i as u8).collect();
            let mut pem = [0u8; 256];
            let pem_len = der_to_pem(&der, PemLabel::PublicKey, &mut pem).unwrap();
            let mut back = [0u8; 64];
            let der_len = pem_to_der(&pem[..pem_len], PemLabel::PublicKey, &mut back).unwrap();
            assert_eq!(&back[..der_len], &der[..], "size {size}");
        }
    }

    #[test]
    fn encoded_len_is_exact() {
        for size in [0usize, 1, 2, 3, 48, 49, 100, 1000] {
            let der = std::vec![0u8; size];
            let mut pem = std::vec![0u8; 2048];
            let len = der_to_pem(&der, PemLabel::EcPrivateKey, &mut pem).unwrap();
            assert_eq!(len, pem_encoded_len(PemLabel::EcPrivateKey, size), "size {size}");
        }
    }

    #[test]
    fn undersized_output_rejected() {
        let der = [0u8; 100];
        let mut pem = [0u8; 32];
        assert_eq!(
            der_to_pem(&der, PemLabel::Certificate, &mut pem),
            Err(Error::PemOverflow)
        );
    }

    #[test]
    fn wrong_label_rejected() {
        let der = [0x30u8, 0x00];
        let mut pem = [0u8; 128];
        let len = der_to_pem(&der, PemLabel::Certificate, &mut pem).unwrap();
        let mut back = [0u8; 16];
        assert_eq!(
            pem_to_der(&pem[..len], PemLabel::PublicKey, &mut back),
            Err(Error::PemMalformed)
        );
    }

    #[test]
    fn trailing_nul_separator_tolerated() {
        let der = [0x30u8, 0x02, 0x01, 0x00];
        let mut pem = [0u8; 128];
        let len = der_to_pem(&der, PemLabel::Certificate, &mut pem).unwrap();
        pem[len] = 0;

        let mut back = [0u8; 16];
        let der_len = pem_to_der(&pem[..=len], PemLabel::Certificate, &mut back).unwrap();
        assert_eq!(&back[..der_len], &der);
    }
}
