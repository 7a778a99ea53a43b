// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Barnacle Systems Inc.

//! SHA-256
//!
//! The single hash algorithm of the identity chain: agent measurement,
//! header digests, and serial derivation all run over SHA-256.

use crate::traits::Hash;
use sha2::{Digest, Sha256 as Sha256Impl};

/// SHA-256 digest output
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Sha256Output([u8; 32]);

impl Sha256Output {
    /// Create from raw bytes
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Raw digest bytes
    #[must_use]
    pub const fn into_bytes(self) -> [u8; 32] {
        self.0
    }
}

impl AsRef<[u8]> for Sha256Output {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 32]> for Sha256Output {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

/// SHA-256 hasher
pub struct Sha256 {
    inner: Sha256Impl,
}

impl Hash for Sha256 {
    const OUTPUT_SIZE: usize = 32;

    type Output = Sha256Output;

    fn hash(message: &[u8]) -> Self::Output {
        let result = Sha256Impl::digest(message);
        let mut output = [0u8; 32];
        output.copy_from_slice(&result);
        Sha256Output(output)
    }

    fn new() -> Self {
        Self { inner: Sha256Impl::new() }
    }

    fn update(&mut self, data: &[u8]) {
        Digest::update(&mut self.inner, data);
    }

    fn finalize(self) -> Self::Output {
        let result = self.inner.finalize();
        let mut output = [0u8; 32];
        output.copy_from_slice(&result);
        Sha256Output(output)
    }
}

impl Default for Sha256 {
    fn default() -> Self {
        <Self as Hash>::new()
    }
}

/// One-shot SHA-256 returning a plain byte array
#[must_use]
pub fn sha256(message: &[u8]) -> [u8; 32] {
    Sha256::hash(message).into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    // NIST FIPS 180-4 test vector for "abc"
    const ABC_DIGEST: [u8; 32] = [
        0xba, 0x78, 0x16, 0xbf, 0x8f, 0x01, 0xcf, 0xea, 0x41, 0x41, 0x40, 0xde, 0x5d, 0xae,
        0x22, 0x23, 0xb0, 0x03, 0x61, 0xa3, 0x96, 0x17, 0x7a, 0x9c, 0xb4, 0x10, 0xff, 0x61,
        0xf2, 0x00, 0x15, 0xad,
    ];

    #[test]
    fn one_shot_matches_test_vector() {
        assert_eq!(sha256(b"abc"), ABC_DIGEST);
    }

    #[test]
    fn incremental_matches_one_shot() {
        let mut hasher = <Sha256 as Hash>::new();
        hasher.update(b"a");
        hasher.update(b"bc");
        assert_eq!(hasher.finalize().into_bytes(), ABC_DIGEST);
    }
}
