// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Barnacle Systems Inc.

//! HKDF-SHA256 key derivation
//!
//! One-shot derivation used for certificate serial numbers and as the
//! expansion stage of deterministic ECC key derivation. The label is the
//! HKDF `info` parameter; the optional context acts as salt.

use crate::error::CryptoError;
use crate::traits::Kdf;
use hkdf::Hkdf;
use sha2::Sha256;

/// HKDF-SHA256 one-shot KDF
pub struct HkdfSha256;

impl Kdf for HkdfSha256 {
    fn derive(
        ikm: &[u8],
        context: &[u8],
        label: &[u8],
        output: &mut [u8],
    ) -> Result<(), CryptoError> {
        let salt = if context.is_empty() { None } else { Some(context) };
        let hk = Hkdf::<Sha256>::new(salt, ikm);
        hk.expand(label, output)
            .map_err(|_| CryptoError::DerivationFailed)
    }
}

/// Derive `output.len()` bytes from `ikm` under `label`
///
/// Convenience wrapper over [`HkdfSha256`].
pub fn kdf_sha256(
    output: &mut [u8],
    ikm: &[u8],
    context: &[u8],
    label: &[u8],
) -> Result<(), CryptoError> {
    HkdfSha256::derive(ikm, context, label, output)
}
