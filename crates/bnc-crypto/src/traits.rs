// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Barnacle Systems Inc.

//! Core cryptographic traits
//!
//! Abstract interfaces for the primitives the boot core consumes. The
//! traits keep the boot logic independent of the concrete backends and
//! give tests a seam for deterministic substitution.

use crate::error::CryptoError;

/// Hash function trait
///
/// One-shot and incremental hashing over a fixed output size.
pub trait Hash: Sized {
    /// Output size in bytes
    const OUTPUT_SIZE: usize;

    /// Output type
    type Output: AsRef<[u8]> + Clone;

    /// Hash a message in one shot
    fn hash(message: &[u8]) -> Self::Output;

    /// Create a new incremental hasher
    fn new() -> Self;

    /// Update the hasher with data
    fn update(&mut self, data: &[u8]);

    /// Finalize and return the digest
    fn finalize(self) -> Self::Output;
}

/// Key derivation function trait
pub trait Kdf {
    /// Derive `output.len()` bytes from input key material
    ///
    /// # Arguments
    ///
    /// * `ikm` - Input key material
    /// * `context` - Optional context bytes (may be empty)
    /// * `label` - Domain-separation label
    /// * `output` - Output buffer for derived material
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::DerivationFailed` if the requested output
    /// length exceeds what the KDF can produce.
    fn derive(
        ikm: &[u8],
        context: &[u8],
        label: &[u8],
        output: &mut [u8],
    ) -> Result<(), CryptoError>;
}

/// Cryptographically secure random number generator trait
pub trait CryptoRng {
    /// Fill buffer with random bytes
    ///
    /// # Errors
    ///
    /// Fails when the underlying entropy source does.
    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), CryptoError>;
}

/// Constant-time byte-slice comparison
///
/// Length mismatch returns `false` immediately; equal-length inputs are
/// compared without data-dependent branches.
#[must_use]
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    use subtle::ConstantTimeEq;
    a.ct_eq(b).into()
}
