// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Barnacle Systems Inc.

//! Integration tests for bnc-der
//!
//! Builds nested structures through the public API and checks that the
//! output is well-formed DER (via a minimal TLV walker) and that PEM
//! conversion is lossless.

use bnc_der::{der_to_pem, pem_to_der, DerBuilder, PemLabel};

/// Parse one TLV at `bytes[pos..]`, recursing into constructed types.
/// Returns the total encoded length, or `None` for malformed input.
fn parse_tlv(bytes: &[u8], pos: usize) -> Option<usize> {
    if pos + 2 > bytes.len() {
        return None;
    }

    let tag = bytes[pos];
    let constructed = tag & 0x20 != 0;

    let (header, len) = match bytes[pos + 1] {
        short @ 0x00..=0x7F => (2, short as usize),
        0x81 => (3, *bytes.get(pos + 2)? as usize),
        0x82 => {
            let hi = *bytes.get(pos + 2)? as usize;
            let lo = *bytes.get(pos + 3)? as usize;
            (4, (hi << 8) | lo)
        }
        _ => return None,
    };

    let end = pos + header + len;
    if end > bytes.len() {
        return None;
    }

    if constructed {
        let mut child = pos + header;
        while child < end {
            child += parse_tlv(bytes, child)?;
        }
        if child != end {
            return None;
        }
    }

    Some(header + len)
}

/// Whether `bytes` is exactly one well-formed DER structure
fn is_valid_der(bytes: &[u8]) -> bool {
    parse_tlv(bytes, 0) == Some(bytes.len())
}

#[test]
fn balanced_program_produces_valid_der() {
    let mut buf = [0u8; 512];
    let mut der = DerBuilder::new(&mut buf);

    der.start_sequence().unwrap();
    der.add_short_explicit_integer(2).unwrap();
    der.add_integer_bytes(&[0x01, 0x23, 0x45, 0x67, 0x89, 0xAB, 0xCD, 0xEF]).unwrap();
    der.start_sequence().unwrap();
    der.add_oid(&[1, 2, 840, 10045, 4, 3, 2]).unwrap();
    der.pop_nesting().unwrap();
    der.start_set().unwrap();
    der.start_sequence().unwrap();
    der.add_oid(&[2, 5, 4, 3]).unwrap();
    der.add_utf8_string("device").unwrap();
    der.pop_nesting().unwrap();
    der.pop_nesting().unwrap();
    der.start_explicit(3).unwrap();
    der.start_sequence().unwrap();
    der.add_boolean(true).unwrap();
    der.add_octet_string(&[0x11; 32]).unwrap();
    der.pop_nesting().unwrap();
    der.pop_nesting().unwrap();
    der.start_enveloping_bit_string().unwrap();
    der.start_sequence().unwrap();
    der.add_integer(42).unwrap();
    der.pop_nesting().unwrap();
    der.pop_nesting().unwrap();
    der.pop_nesting().unwrap();

    assert_eq!(der.nesting_depth(), 0);
    assert!(is_valid_der(der.as_bytes()));
}

#[test]
fn deep_nesting_stays_valid() {
    let mut buf = [0u8; 256];
    let mut der = DerBuilder::new(&mut buf);

    for _ in 0..10 {
        der.start_sequence().unwrap();
    }
    der.add_boolean(false).unwrap();
    for _ in 0..10 {
        der.pop_nesting().unwrap();
    }

    assert_eq!(der.nesting_depth(), 0);
    assert!(is_valid_der(der.as_bytes()));
}

#[test]
fn enveloping_octet_string_wraps_inner_der() {
    let mut buf = [0u8; 128];
    let mut der = DerBuilder::new(&mut buf);

    der.start_sequence().unwrap();
    der.add_oid(&[2, 5, 29, 19]).unwrap();
    der.start_enveloping_octet_string().unwrap();
    der.start_sequence().unwrap();
    der.add_boolean(true).unwrap();
    der.add_integer(1).unwrap();
    der.pop_nesting().unwrap();
    der.pop_nesting().unwrap();
    der.pop_nesting().unwrap();

    assert!(is_valid_der(der.as_bytes()));
}

#[test]
fn tbs_to_cert_output_is_valid_der() {
    let mut buf = [0u8; 256];
    let mut der = DerBuilder::new(&mut buf);

    der.start_sequence().unwrap();
    der.add_integer(7).unwrap();
    der.pop_nesting().unwrap();

    der.tbs_to_cert().unwrap();
    der.start_sequence().unwrap();
    der.add_oid(&[1, 2, 840, 10045, 4, 3, 2]).unwrap();
    der.pop_nesting().unwrap();
    der.add_bit_string(&[0xAA; 16]).unwrap();
    der.pop_nesting().unwrap();

    assert_eq!(der.nesting_depth(), 0);
    assert!(is_valid_der(der.as_bytes()));
}

#[test]
fn der_pem_der_round_trip_on_structured_input() {
    let mut buf = [0u8; 512];
    let mut der = DerBuilder::new(&mut buf);
    der.start_sequence().unwrap();
    der.add_octet_string(&[0x42; 120]).unwrap();
    der.add_integer(9000).unwrap();
    der.pop_nesting().unwrap();
    let original = der.as_bytes().to_vec();

    let mut pem = [0u8; 1024];
    let pem_len = der_to_pem(&original, PemLabel::Certificate, &mut pem).unwrap();

    let mut back = [0u8; 512];
    let back_len = pem_to_der(&pem[..pem_len], PemLabel::Certificate, &mut back).unwrap();

    assert_eq!(&back[..back_len], &original[..]);
}

#[test]
fn every_line_of_large_pem_is_wrapped() {
    let der_bytes = vec![0x5Au8; 700];
    let mut pem = vec![0u8; 2048];
    let len = der_to_pem(&der_bytes, PemLabel::Certificate, &mut pem).unwrap();

    let text = core::str::from_utf8(&pem[..len]).unwrap();
    for line in text.lines().filter(|l| !l.starts_with("-----")) {
        assert!(line.len() <= 64);
        assert!(!line.is_empty());
    }
}
