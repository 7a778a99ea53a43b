// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Barnacle Systems Inc.

//! TBS and certificate construction
//!
//! Each `*_tbs` function emits a complete to-be-signed structure into a
//! caller-owned [`DerBuilder`] and leaves the nesting depth at zero. The
//! caller signs the TBS bytes and hands the `(r, s)` signature to the
//! matching `make_*` function, which wraps the buffer into the final
//! signed certificate in place.

use base64ct::{Base64, Encoding};
use bnc_common::constants::{SERIAL_NUM_LEN, SHA1_LEN};
use bnc_common::Error;
use bnc_crypto::{EccPrivateKey, EccPublicKey, EccSignature};
use bnc_der::DerBuilder;
use sha1::{Digest, Sha1};

use crate::oid;

/// X.501 name: common name plus optional organization and country
#[derive(Debug, Clone, Copy)]
pub struct X501Name<'a> {
    /// Common name (CN)
    pub common: &'a str,
    /// Organization name (O)
    pub org: Option<&'a str>,
    /// Country name (C)
    pub country: Option<&'a str>,
}

impl<'a> X501Name<'a> {
    /// Name with only a common name component
    #[must_use]
    pub const fn common_only(common: &'a str) -> Self {
        Self { common, org: None, country: None }
    }
}

/// Inputs shared by every TBS structure
#[derive(Debug, Clone, Copy)]
pub struct X509TbsData<'a> {
    /// Certificate serial number, unsigned big-endian
    ///
    /// The first byte must already be forced into `[0x01, 0x7F]` so the
    /// DER integer is positive and nonzero.
    pub serial: [u8; SERIAL_NUM_LEN],
    /// Issuer name
    pub issuer: X501Name<'a>,
    /// Validity start, `YYMMDDhhmmssZ`
    pub valid_from: &'a str,
    /// Validity end, `YYMMDDhhmmssZ`
    pub valid_to: &'a str,
    /// Subject name; a common name of `"*"` is replaced by a
    /// device-unique pseudo-GUID in the alias certificate
    pub subject: X501Name<'a>,
}

fn add_x501_name(der: &mut DerBuilder<'_>, name: &X501Name<'_>) -> Result<(), Error> {
    der.start_sequence()?;

    der.start_set()?;
    der.start_sequence()?;
    der.add_oid(oid::COMMON_NAME)?;
    der.add_utf8_string(name.common)?;
    der.pop_nesting()?;
    der.pop_nesting()?;

    if let Some(country) = name.country {
        der.start_set()?;
        der.start_sequence()?;
        der.add_oid(oid::COUNTRY_NAME)?;
        der.add_utf8_string(country)?;
        der.pop_nesting()?;
        der.pop_nesting()?;
    }

    if let Some(org) = name.org {
        der.start_set()?;
        der.start_sequence()?;
        der.add_oid(oid::ORGANIZATION_NAME)?;
        der.add_utf8_string(org)?;
        der.pop_nesting()?;
        der.pop_nesting()?;
    }

    der.pop_nesting()?;
    Ok(())
}

/// SubjectPublicKeyInfo for the configured curve
fn add_spki(der: &mut DerBuilder<'_>, key: &EccPublicKey) -> Result<(), Error> {
    der.start_sequence()?;
    der.start_sequence()?;
    der.add_oid(oid::EC_PUBLIC_KEY)?;
    der.add_oid(oid::CURVE)?;
    der.pop_nesting()?;
    der.add_bit_string(&key.to_sec1_bytes())?;
    der.pop_nesting()?;
    Ok(())
}

fn add_validity(der: &mut DerBuilder<'_>, tbs: &X509TbsData<'_>) -> Result<(), Error> {
    der.start_sequence()?;
    der.add_utc_time(tbs.valid_from)?;
    der.add_utc_time(tbs.valid_to)?;
    der.pop_nesting()?;
    Ok(())
}

fn add_signature_algorithm(der: &mut DerBuilder<'_>) -> Result<(), Error> {
    der.start_sequence()?;
    der.add_oid(oid::ECDSA_WITH_SHA256)?;
    der.pop_nesting()?;
    Ok(())
}

fn add_key_usage_ext(der: &mut DerBuilder<'_>) -> Result<(), Error> {
    der.start_sequence()?;
    der.add_oid(oid::KEY_USAGE)?;
    der.start_enveloping_octet_string()?;
    der.add_bit_string(&[oid::KEY_USAGE_BITS])?;
    der.pop_nesting()?;
    der.pop_nesting()?;
    Ok(())
}

fn add_ext_key_usage_ext(der: &mut DerBuilder<'_>) -> Result<(), Error> {
    der.start_sequence()?;
    der.add_oid(oid::EXT_KEY_USAGE)?;
    der.start_enveloping_octet_string()?;
    der.start_sequence()?;
    der.add_oid(oid::CLIENT_AUTH)?;
    der.pop_nesting()?;
    der.pop_nesting()?;
    der.pop_nesting()?;
    Ok(())
}

fn add_basic_constraints_ext(der: &mut DerBuilder<'_>, path_len: u32) -> Result<(), Error> {
    der.start_sequence()?;
    der.add_oid(oid::BASIC_CONSTRAINTS)?;
    der.add_boolean(true)?; // critical
    der.start_enveloping_octet_string()?;
    der.start_sequence()?;
    der.add_boolean(true)?; // cA
    der.add_integer(path_len)?;
    der.pop_nesting()?;
    der.pop_nesting()?;
    der.pop_nesting()?;
    Ok(())
}

/// AuthorityKeyIdentifier: SHA-1 of the issuer's SEC1 public key
fn add_authority_key_id_ext(
    der: &mut DerBuilder<'_>,
    issuer_pub: &EccPublicKey,
) -> Result<(), Error> {
    let mut key_id = [0u8; SHA1_LEN];
    let digest = Sha1::digest(issuer_pub.to_sec1_bytes());
    key_id.copy_from_slice(&digest);

    der.start_sequence()?;
    der.add_oid(oid::AUTHORITY_KEY_IDENTIFIER)?;
    der.start_enveloping_octet_string()?;
    der.start_sequence()?;
    der.start_explicit(0)?;
    der.add_octet_string(&key_id)?;
    der.pop_nesting()?;
    der.pop_nesting()?;
    der.pop_nesting()?;
    der.pop_nesting()?;
    Ok(())
}

/// Firmware-measurement extension
///
/// `{ version=1, { { ecPublicKey, curve }, deviceIdPub }, { sha256, fwid } }`
/// binds the exact agent digest and the issuing device key into the alias
/// certificate.
fn add_firmware_id_ext(
    der: &mut DerBuilder<'_>,
    device_pub: &EccPublicKey,
    fwid: &[u8],
) -> Result<(), Error> {
    der.start_sequence()?;
    der.add_oid(oid::FIRMWARE_ID_EXT)?;
    der.start_enveloping_octet_string()?;
    der.start_sequence()?;
    der.add_integer(1)?;
    der.start_sequence()?;
    der.start_sequence()?;
    der.add_oid(oid::EC_PUBLIC_KEY)?;
    der.add_oid(oid::CURVE)?;
    der.pop_nesting()?;
    der.add_bit_string(&device_pub.to_sec1_bytes())?;
    der.pop_nesting()?;
    der.start_sequence()?;
    der.add_oid(oid::SHA256)?;
    der.add_octet_string(fwid)?;
    der.pop_nesting()?;
    der.pop_nesting()?;
    der.pop_nesting()?;
    der.pop_nesting()?;
    Ok(())
}

fn check_complete(der: &DerBuilder<'_>) -> Result<(), Error> {
    if der.nesting_depth() != 0 {
        return Err(Error::DerUnbalanced);
    }
    Ok(())
}

/// Pseudo-GUID for `"*"` subjects: base64(SHA-256(SEC1 pub))[..22]
///
/// Returns the GUID as ASCII bytes; 22 Base64 characters cover the first
/// 16 digest bytes, enough to be device-unique.
fn pseudo_guid(device_pub: &EccPublicKey) -> [u8; 22] {
    let digest = bnc_crypto::hash::sha256(&device_pub.to_sec1_bytes());
    let mut encoded = [0u8; 24];
    // 16 bytes always encode to 24 Base64 chars; cannot fail.
    let _ = Base64::encode(&digest[..16], &mut encoded);
    let mut guid = [0u8; 22];
    guid.copy_from_slice(&encoded[..22]);
    guid
}

// =============================================================================
// TBS builders
// =============================================================================

/// Root certificate TBS: subject == issuer, `cA=true, pathLen=2`
pub fn root_cert_tbs(
    der: &mut DerBuilder<'_>,
    tbs: &X509TbsData<'_>,
    root_pub: &EccPublicKey,
) -> Result<(), Error> {
    der.start_sequence()?;
    der.add_short_explicit_integer(2)?;
    der.add_integer_bytes(&tbs.serial)?;
    add_signature_algorithm(der)?;
    add_x501_name(der, &tbs.issuer)?;
    add_validity(der, tbs)?;
    add_x501_name(der, &tbs.subject)?;
    add_spki(der, root_pub)?;

    der.start_explicit(3)?;
    der.start_sequence()?;
    add_key_usage_ext(der)?;
    add_basic_constraints_ext(der, 2)?;
    der.pop_nesting()?;
    der.pop_nesting()?;

    der.pop_nesting()?;
    check_complete(der)
}

/// Device certificate TBS: `cA=true, pathLen=1`
///
/// When `root_pub` is given the certificate carries an authority key
/// identifier naming that root; a self-signed device certificate passes
/// its own public key.
pub fn device_cert_tbs(
    der: &mut DerBuilder<'_>,
    tbs: &X509TbsData<'_>,
    device_pub: &EccPublicKey,
    root_pub: Option<&EccPublicKey>,
) -> Result<(), Error> {
    der.start_sequence()?;
    der.add_short_explicit_integer(2)?;
    der.add_integer_bytes(&tbs.serial)?;
    add_signature_algorithm(der)?;
    add_x501_name(der, &tbs.issuer)?;
    add_validity(der, tbs)?;
    add_x501_name(der, &tbs.subject)?;
    add_spki(der, device_pub)?;

    der.start_explicit(3)?;
    der.start_sequence()?;
    add_key_usage_ext(der)?;
    add_ext_key_usage_ext(der)?;
    add_basic_constraints_ext(der, 1)?;
    if let Some(root_pub) = root_pub {
        add_authority_key_id_ext(der, root_pub)?;
    }
    der.pop_nesting()?;
    der.pop_nesting()?;

    der.pop_nesting()?;
    check_complete(der)
}

/// Alias certificate TBS
///
/// Subject is the compound (alias) key, issuer the device key, and the
/// firmware-measurement extension carries `fwid` verbatim.
pub fn alias_cert_tbs(
    der: &mut DerBuilder<'_>,
    tbs: &X509TbsData<'_>,
    alias_pub: &EccPublicKey,
    device_pub: &EccPublicKey,
    fwid: &[u8],
) -> Result<(), Error> {
    // "*" asks for a subject derived from the device identity.
    let guid;
    let mut subject = tbs.subject;
    if subject.common == "*" {
        guid = pseudo_guid(device_pub);
        subject.common = core::str::from_utf8(&guid).map_err(|_| Error::InternalError)?;
    }

    der.start_sequence()?;
    der.add_short_explicit_integer(2)?;
    der.add_integer_bytes(&tbs.serial)?;
    add_signature_algorithm(der)?;
    add_x501_name(der, &tbs.issuer)?;
    add_validity(der, tbs)?;
    add_x501_name(der, &subject)?;
    add_spki(der, alias_pub)?;

    der.start_explicit(3)?;
    der.start_sequence()?;
    add_key_usage_ext(der)?;
    add_ext_key_usage_ext(der)?;
    add_authority_key_id_ext(der, device_pub)?;
    add_firmware_id_ext(der, device_pub, fwid)?;
    der.pop_nesting()?;
    der.pop_nesting()?;

    der.pop_nesting()?;
    check_complete(der)
}

/// PKCS#10 certificate-request TBS: version 0, subject, SPKI, empty `[0]`
pub fn csr_tbs(
    der: &mut DerBuilder<'_>,
    tbs: &X509TbsData<'_>,
    subject_pub: &EccPublicKey,
) -> Result<(), Error> {
    der.start_sequence()?;
    der.add_integer(0)?;
    add_x501_name(der, &tbs.subject)?;
    add_spki(der, subject_pub)?;
    der.start_explicit(0)?;
    der.pop_nesting()?;
    der.pop_nesting()?;
    check_complete(der)
}

// =============================================================================
// Signed wrapping
// =============================================================================

/// Elevate a finished TBS into a signed structure:
/// `SEQ { tbs, SEQ { ecdsa-with-SHA256 }, BIT STRING { SEQ { r, s } } }`
fn attach_signature(der: &mut DerBuilder<'_>, sig: &EccSignature) -> Result<(), Error> {
    der.tbs_to_cert()?;
    add_signature_algorithm(der)?;
    der.start_enveloping_bit_string()?;
    der.start_sequence()?;
    der.add_integer_bytes(&sig.r)?;
    der.add_integer_bytes(&sig.s)?;
    der.pop_nesting()?;
    der.pop_nesting()?;
    der.pop_nesting()?;
    check_complete(der)
}

/// Wrap a root TBS and its signature into the final certificate
pub fn make_root_cert(der: &mut DerBuilder<'_>, sig: &EccSignature) -> Result<(), Error> {
    attach_signature(der, sig)
}

/// Wrap a device TBS and its signature into the final certificate
pub fn make_device_cert(der: &mut DerBuilder<'_>, sig: &EccSignature) -> Result<(), Error> {
    attach_signature(der, sig)
}

/// Wrap an alias TBS and its signature into the final certificate
pub fn make_alias_cert(der: &mut DerBuilder<'_>, sig: &EccSignature) -> Result<(), Error> {
    attach_signature(der, sig)
}

/// Wrap a CSR TBS and its signature into the final request
pub fn make_csr(der: &mut DerBuilder<'_>, sig: &EccSignature) -> Result<(), Error> {
    attach_signature(der, sig)
}

// =============================================================================
// Key material export
// =============================================================================

/// DER-encode a bare public key as SubjectPublicKeyInfo
pub fn ec_public_key_der(
    der: &mut DerBuilder<'_>,
    public: &EccPublicKey,
) -> Result<(), Error> {
    add_spki(der, public)?;
    check_complete(der)
}

/// DER-encode a key pair as an RFC 5915 ECPrivateKey
pub fn ec_private_key_der(
    der: &mut DerBuilder<'_>,
    public: &EccPublicKey,
    private: &EccPrivateKey,
) -> Result<(), Error> {
    der.start_sequence()?;
    der.add_integer(1)?;
    der.add_octet_string(private.as_bytes())?;
    der.start_explicit(0)?;
    der.add_oid(oid::CURVE)?;
    der.pop_nesting()?;
    der.start_explicit(1)?;
    der.add_bit_string(&public.to_sec1_bytes())?;
    der.pop_nesting()?;
    der.pop_nesting()?;
    check_complete(der)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bnc_der::DER_MAX_TBS;

    fn test_tbs_data() -> X509TbsData<'static> {
        X509TbsData {
            serial: [0x01, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88],
            issuer: X501Name {
                common: "Barnacle Device",
                org: Some("Barnacle Systems"),
                country: Some("US"),
            },
            valid_from: "170101000000Z",
            valid_to: "370101000000Z",
            subject: X501Name {
                common: "Barnacle Device",
                org: Some("Barnacle Systems"),
                country: Some("US"),
            },
        }
    }

    fn device_key() -> (EccPublicKey, EccPrivateKey) {
        bnc_crypto::ecc::derive_ecc_key(b"x509 unit test device", b"Identity").unwrap()
    }

    #[test]
    fn device_tbs_is_balanced_sequence() {
        let (public, _) = device_key();
        let mut buf = [0u8; DER_MAX_TBS];
        let mut der = DerBuilder::new(&mut buf);
        device_cert_tbs(&mut der, &test_tbs_data(), &public, Some(&public)).unwrap();
        assert_eq!(der.nesting_depth(), 0);
        assert_eq!(der.as_bytes()[0], 0x30);
    }

    #[test]
    fn alias_tbs_embeds_fwid_bytes() {
        let (public, _) = device_key();
        let fwid = [0xA5u8; 32];
        let mut buf = [0u8; DER_MAX_TBS];
        let mut der = DerBuilder::new(&mut buf);
        let mut tbs = test_tbs_data();
        tbs.subject = X501Name::common_only("agent");
        alias_cert_tbs(&mut der, &tbs, &public, &public, &fwid).unwrap();

        let bytes = der.as_bytes();
        assert!(
            bytes.windows(fwid.len()).any(|w| w == fwid),
            "FWID must appear verbatim in the TBS"
        );
    }

    #[test]
    fn star_subject_replaced_with_guid() {
        let (public, _) = device_key();
        let mut buf = [0u8; DER_MAX_TBS];
        let mut der = DerBuilder::new(&mut buf);
        let mut tbs = test_tbs_data();
        tbs.subject = X501Name::common_only("*");
        alias_cert_tbs(&mut der, &tbs, &public, &public, &[0u8; 32]).unwrap();

        let expected = pseudo_guid(&public);
        let bytes = der.as_bytes();
        assert!(bytes.windows(expected.len()).any(|w| w == expected));
        // The literal "*" must be gone.
        assert!(!bytes.windows(3).any(|w| w == [0x0C, 0x01, b'*']));
    }

    #[test]
    fn pseudo_guid_is_printable_and_stable() {
        let (public, _) = device_key();
        let a = pseudo_guid(&public);
        let b = pseudo_guid(&public);
        assert_eq!(a, b);
        assert!(a.iter().all(|c| c.is_ascii_graphic()));
    }

    #[test]
    fn csr_tbs_has_version_zero() {
        let (public, _) = device_key();
        let mut buf = [0u8; DER_MAX_TBS];
        let mut der = DerBuilder::new(&mut buf);
        csr_tbs(&mut der, &test_tbs_data(), &public).unwrap();
        // SEQ header, then INTEGER 0.
        let bytes = der.as_bytes();
        let version_off = if bytes[1] & 0x80 != 0 {
            2 + (bytes[1] & 0x7F) as usize
        } else {
            2
        };
        assert_eq!(&bytes[version_off..version_off + 3], &[0x02, 0x01, 0x00]);
    }

    #[test]
    fn private_key_der_contains_scalar() {
        let (public, private) = device_key();
        let mut buf = [0u8; DER_MAX_TBS];
        let mut der = DerBuilder::new(&mut buf);
        ec_private_key_der(&mut der, &public, &private).unwrap();
        let bytes = der.as_bytes();
        let d = private.as_bytes();
        assert!(bytes.windows(d.len()).any(|w| w == &d[..]));
    }
}
