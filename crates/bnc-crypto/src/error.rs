// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Barnacle Systems Inc.

//! Crypto layer error type

use bnc_common::Error;
use core::fmt;

/// Errors raised by the cryptographic primitives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CryptoError {
    /// Key bytes are not a valid key for the configured curve
    InvalidKey,
    /// Signature did not verify
    InvalidSignature,
    /// Signature bytes are not valid scalars
    InvalidSignatureEncoding,
    /// Deterministic derivation exhausted its rejection budget
    DerivationFailed,
    /// Signing failed
    SignFailed,
    /// Output buffer too small
    BufferTooSmall,
}

impl fmt::Display for CryptoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::InvalidKey => "invalid key",
            Self::InvalidSignature => "invalid signature",
            Self::InvalidSignatureEncoding => "invalid signature encoding",
            Self::DerivationFailed => "key derivation failed",
            Self::SignFailed => "signing failed",
            Self::BufferTooSmall => "buffer too small",
        };
        f.write_str(msg)
    }
}

impl From<CryptoError> for Error {
    fn from(e: CryptoError) -> Self {
        match e {
            CryptoError::InvalidKey => Error::InvalidKey,
            CryptoError::InvalidSignature | CryptoError::InvalidSignatureEncoding => {
                Error::InvalidSignature
            }
            CryptoError::DerivationFailed => Error::KeyDerivationFailed,
            CryptoError::SignFailed => Error::SignFailed,
            CryptoError::BufferTooSmall => Error::BufferTooSmall,
        }
    }
}
