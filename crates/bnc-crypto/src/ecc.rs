// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Barnacle Systems Inc.

//! ECC key derivation and ECDSA
//!
//! All asymmetric material in the identity chain lives on one NIST curve
//! selected at build time. Keys are held as fixed-size big-endian
//! coordinate arrays so that flash region images can embed them without
//! further encoding; conversion to the curve library's types happens only
//! inside this module.
//!
//! Key derivation is deterministic: the same `(seed, label)` pair always
//! produces the same key pair. Candidate scalars come from HKDF expansion
//! with a rejection counter, so the output is uniform over the scalar
//! field without modular-bias shortcuts.

use crate::error::CryptoError;
use crate::kdf::kdf_sha256;
use zeroize::Zeroize;

#[cfg(feature = "p256")]
use p256 as curve;
#[cfg(feature = "p384")]
use p384 as curve;
#[cfg(feature = "p521")]
use p521 as curve;

use curve::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use curve::ecdsa::{Signature, SigningKey, VerifyingKey};
use curve::elliptic_curve::sec1::ToEncodedPoint;
use curve::{EncodedPoint, FieldBytes, NonZeroScalar};

/// Curve coordinate length in bytes
#[cfg(feature = "p256")]
pub const COORD_LEN: usize = 32;
/// Curve coordinate length in bytes
#[cfg(feature = "p384")]
pub const COORD_LEN: usize = 48;
/// Curve coordinate length in bytes
#[cfg(feature = "p521")]
pub const COORD_LEN: usize = 66;

/// Uncompressed SEC1 public key length: `0x04 || X || Y`
pub const SEC1_PUB_LEN: usize = 1 + 2 * COORD_LEN;

/// Rejection budget for deterministic scalar derivation
///
/// For NIST curves a candidate is invalid with probability < 2^-32, so a
/// budget of 255 makes derivation failure a non-event in practice.
const DERIVE_MAX_TRIES: u8 = 255;

/// ECC public key as raw affine coordinates (big-endian)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EccPublicKey {
    /// X coordinate
    pub x: [u8; COORD_LEN],
    /// Y coordinate
    pub y: [u8; COORD_LEN],
}

impl EccPublicKey {
    /// All-zero placeholder, used for unpopulated key slots
    #[must_use]
    pub const fn zeroed() -> Self {
        Self { x: [0u8; COORD_LEN], y: [0u8; COORD_LEN] }
    }

    /// Whether this is the all-zero placeholder
    #[must_use]
    pub fn is_zeroed(&self) -> bool {
        self.x.iter().chain(self.y.iter()).all(|&b| b == 0)
    }

    /// Export as uncompressed SEC1 bytes `0x04 || X || Y`
    #[must_use]
    pub fn to_sec1_bytes(&self) -> [u8; SEC1_PUB_LEN] {
        let mut out = [0u8; SEC1_PUB_LEN];
        out[0] = 0x04;
        out[1..1 + COORD_LEN].copy_from_slice(&self.x);
        out[1 + COORD_LEN..].copy_from_slice(&self.y);
        out
    }

    fn to_verifying_key(self) -> Result<VerifyingKey, CryptoError> {
        let x = FieldBytes::clone_from_slice(&self.x);
        let y = FieldBytes::clone_from_slice(&self.y);
        let point = EncodedPoint::from_affine_coordinates(&x, &y, false);
        VerifyingKey::from_encoded_point(&point).map_err(|_| CryptoError::InvalidKey)
    }
}

/// ECC private key (big-endian scalar), zeroized on drop
#[derive(Clone)]
pub struct EccPrivateKey {
    d: [u8; COORD_LEN],
}

impl EccPrivateKey {
    /// Rebuild from raw scalar bytes (e.g. a persisted region image)
    #[must_use]
    pub const fn from_bytes(d: [u8; COORD_LEN]) -> Self {
        Self { d }
    }

    /// Raw scalar bytes
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; COORD_LEN] {
        &self.d
    }

    fn to_signing_key(&self) -> Result<SigningKey, CryptoError> {
        SigningKey::from_bytes(FieldBytes::from_slice(&self.d))
            .map_err(|_| CryptoError::InvalidKey)
    }
}

impl Zeroize for EccPrivateKey {
    fn zeroize(&mut self) {
        self.d.zeroize();
    }
}

impl Drop for EccPrivateKey {
    fn drop(&mut self) {
        self.zeroize();
    }
}

/// ECDSA signature as raw scalar pair (big-endian, left-padded)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EccSignature {
    /// R component
    pub r: [u8; COORD_LEN],
    /// S component
    pub s: [u8; COORD_LEN],
}

impl EccSignature {
    /// All-zero placeholder, used for unsigned agent headers
    #[must_use]
    pub const fn zeroed() -> Self {
        Self { r: [0u8; COORD_LEN], s: [0u8; COORD_LEN] }
    }
}

/// Derive an ECC key pair deterministically from `seed` under `label`
///
/// # Errors
///
/// Fails if the label exceeds the internal info buffer or the rejection
/// budget is exhausted (cryptographically negligible).
pub fn derive_ecc_key(
    seed: &[u8],
    label: &[u8],
) -> Result<(EccPublicKey, EccPrivateKey), CryptoError> {
    // info = label || counter, so each rejection re-expands fresh bytes.
    const MAX_LABEL: usize = 32;
    if label.len() > MAX_LABEL {
        return Err(CryptoError::DerivationFailed);
    }
    let mut info = [0u8; MAX_LABEL + 1];
    info[..label.len()].copy_from_slice(label);

    for counter in 0..DERIVE_MAX_TRIES {
        info[label.len()] = counter;
        let mut candidate = [0u8; COORD_LEN];
        kdf_sha256(&mut candidate, seed, &[], &info[..label.len() + 1])?;

        let scalar_opt =
            NonZeroScalar::from_repr(FieldBytes::clone_from_slice(&candidate));
        if bool::from(scalar_opt.is_some()) {
            let private = EccPrivateKey::from_bytes(candidate);
            let signing = private.to_signing_key()?;
            let public = public_from_verifying_key(signing.verifying_key())?;
            return Ok((public, private));
        }
        candidate.zeroize();
    }

    Err(CryptoError::DerivationFailed)
}

fn public_from_verifying_key(vk: &VerifyingKey) -> Result<EccPublicKey, CryptoError> {
    let point = vk.to_encoded_point(false);
    let (Some(x), Some(y)) = (point.x(), point.y()) else {
        return Err(CryptoError::InvalidKey);
    };
    let mut public = EccPublicKey::zeroed();
    public.x.copy_from_slice(x.as_slice());
    public.y.copy_from_slice(y.as_slice());
    Ok(public)
}

/// Sign a prehashed digest (ECDSA, RFC 6979 deterministic nonce)
pub fn sign_digest(
    digest: &[u8],
    key: &EccPrivateKey,
) -> Result<EccSignature, CryptoError> {
    let signing = key.to_signing_key()?;
    let signature: Signature = signing
        .sign_prehash(digest)
        .map_err(|_| CryptoError::SignFailed)?;

    let (r, s) = signature.split_bytes();
    let mut out = EccSignature::zeroed();
    out.r.copy_from_slice(r.as_slice());
    out.s.copy_from_slice(s.as_slice());
    Ok(out)
}

/// Verify an ECDSA signature over a prehashed digest
pub fn verify_digest(
    digest: &[u8],
    signature: &EccSignature,
    key: &EccPublicKey,
) -> Result<(), CryptoError> {
    let vk = key.to_verifying_key()?;
    let sig = Signature::from_scalars(
        FieldBytes::clone_from_slice(&signature.r),
        FieldBytes::clone_from_slice(&signature.s),
    )
    .map_err(|_| CryptoError::InvalidSignatureEncoding)?;

    vk.verify_prehash(digest, &sig)
        .map_err(|_| CryptoError::InvalidSignature)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::sha256;

    #[test]
    fn derivation_is_deterministic() {
        let (pub_a, priv_a) = derive_ecc_key(b"seed material", b"Identity").unwrap();
        let (pub_b, priv_b) = derive_ecc_key(b"seed material", b"Identity").unwrap();
        assert_eq!(pub_a, pub_b);
        assert_eq!(priv_a.as_bytes(), priv_b.as_bytes());
    }

    #[test]
    fn seed_and_label_separate_keys() {
        let (pub_a, _) = derive_ecc_key(b"seed material", b"Identity").unwrap();
        let (pub_b, _) = derive_ecc_key(b"other material", b"Identity").unwrap();
        let (pub_c, _) = derive_ecc_key(b"seed material", b"Serial").unwrap();
        assert_ne!(pub_a, pub_b);
        assert_ne!(pub_a, pub_c);
    }

    #[test]
    fn sign_verify_round_trip() {
        let (public, private) = derive_ecc_key(b"signing seed", b"Identity").unwrap();
        let digest = sha256(b"message");

        let sig = sign_digest(&digest, &private).unwrap();
        verify_digest(&digest, &sig, &public).unwrap();
    }

    #[test]
    fn tampered_signature_rejected() {
        let (public, private) = derive_ecc_key(b"signing seed", b"Identity").unwrap();
        let digest = sha256(b"message");

        let mut sig = sign_digest(&digest, &private).unwrap();
        sig.r[0] ^= 0x01;
        assert!(verify_digest(&digest, &sig, &public).is_err());
    }

    #[test]
    fn wrong_digest_rejected() {
        let (public, private) = derive_ecc_key(b"signing seed", b"Identity").unwrap();
        let sig = sign_digest(&sha256(b"message"), &private).unwrap();
        assert_eq!(
            verify_digest(&sha256(b"other"), &sig, &public),
            Err(CryptoError::InvalidSignature)
        );
    }

    #[test]
    fn sec1_export_is_uncompressed() {
        let (public, _) = derive_ecc_key(b"export seed", b"Identity").unwrap();
        let sec1 = public.to_sec1_bytes();
        assert_eq!(sec1.len(), SEC1_PUB_LEN);
        assert_eq!(sec1[0], 0x04);
        assert_eq!(&sec1[1..1 + COORD_LEN], &public.x);
        assert_eq!(&sec1[1 + COORD_LEN..], &public.y);
    }

    #[test]
    fn zeroed_placeholder_detected() {
        assert!(EccPublicKey::zeroed().is_zeroed());
        let (public, _) = derive_ecc_key(b"export seed", b"Identity").unwrap();
        assert!(!public.is_zeroed());
    }
}
