// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Barnacle Systems Inc.

//! Error types for the Barnacle boot suite
//!
//! One unified error enum covers every failure the boot core can hit.
//! Errors are `Copy`, no_std, and carry no payload; the stable 16-bit
//! code is what gets reported over the debug channel and persists in
//! field diagnostics.

use core::fmt;

/// Result type alias for Barnacle operations
pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for the Barnacle boot suite
///
/// Codes are grouped by category:
/// - `0x01xx`: cryptographic errors
/// - `0x02xx`: identity / provisioning errors
/// - `0x03xx`: flash and persistent-storage errors
/// - `0x04xx`: encoding errors (DER, PEM, cert store capacity)
/// - `0x05xx`: agent attestation errors
/// - `0x06xx`: hardware / firewall errors
/// - `0xFFxx`: general errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    // =========================================================================
    // Cryptographic Errors (0x01xx)
    // =========================================================================
    /// Key bytes do not form a valid key for the configured curve
    InvalidKey,
    /// Signature verification failed
    InvalidSignature,
    /// Hardware random number generator failure
    RngFailure,
    /// Deterministic key derivation failed
    KeyDerivationFailed,
    /// ECDSA signing failed
    SignFailed,

    // =========================================================================
    // Identity Errors (0x02xx)
    // =========================================================================
    /// Device identity region is not provisioned
    NotProvisioned,
    /// Device identity region is already provisioned (write-once)
    AlreadyProvisioned,
    /// First-boot provisioning failed
    ProvisioningFailed,

    // =========================================================================
    // Storage Errors (0x03xx)
    // =========================================================================
    /// Address or length violates flash alignment rules
    FlashAlignment,
    /// Flash page erase failed
    FlashEraseFailed,
    /// Flash programming failed or verified mismatch
    FlashProgramFailed,
    /// Access outside the configured flash layout
    FlashOutOfBounds,
    /// Image does not fit the destination region
    RegionTooSmall,
    /// Persistent region failed its integrity checks
    StorageCorrupted,

    // =========================================================================
    // Encoding Errors (0x04xx)
    // =========================================================================
    /// DER output buffer exhausted
    DerOverflow,
    /// Too many nested DER constructions
    DerNestingOverflow,
    /// DER pop with no open construction
    DerNestingUnderflow,
    /// DER structure finished with open constructions
    DerUnbalanced,
    /// Value cannot be DER-encoded (too long, malformed)
    DerInvalidValue,
    /// PEM output buffer exhausted
    PemOverflow,
    /// PEM input is not well-formed
    PemMalformed,
    /// Certificate store capacity exceeded
    CertStoreOverflow,

    // =========================================================================
    // Attestation Errors (0x05xx)
    // =========================================================================
    /// Agent header magic or format version rejected
    AgentHeaderInvalid,
    /// Agent code does not start where the header says it does
    AgentStartMismatch,
    /// Measured agent digest differs from the header digest
    AgentDigestMismatch,
    /// Author signature over the agent header is invalid
    AgentSignatureInvalid,
    /// Rollback detected and the active policy rejects it
    RollbackRejected,

    // =========================================================================
    // Hardware Errors (0x06xx)
    // =========================================================================
    /// Hardware peripheral initialization failed
    HardwareInitFailed,
    /// Firewall segment configuration rejected
    FirewallConfigFailed,
    /// Firewall enable had no effect
    FirewallEnableFailed,
    /// RNG not ready within its startup window
    RngNotReady,
    /// Hardware operation timed out
    Timeout,

    // =========================================================================
    // General Errors (0xFFxx)
    // =========================================================================
    /// Destination buffer is too small
    BufferTooSmall,
    /// Invalid parameter provided
    InvalidParameter,
    /// Internal error (should not occur)
    InternalError,
}

impl Error {
    /// Get the stable error code for this error
    #[must_use]
    pub const fn code(&self) -> u16 {
        match self {
            // Crypto (0x01xx)
            Self::InvalidKey => 0x0101,
            Self::InvalidSignature => 0x0102,
            Self::RngFailure => 0x0103,
            Self::KeyDerivationFailed => 0x0104,
            Self::SignFailed => 0x0105,

            // Identity (0x02xx)
            Self::NotProvisioned => 0x0201,
            Self::AlreadyProvisioned => 0x0202,
            Self::ProvisioningFailed => 0x0203,

            // Storage (0x03xx)
            Self::FlashAlignment => 0x0301,
            Self::FlashEraseFailed => 0x0302,
            Self::FlashProgramFailed => 0x0303,
            Self::FlashOutOfBounds => 0x0304,
            Self::RegionTooSmall => 0x0305,
            Self::StorageCorrupted => 0x0306,

            // Encoding (0x04xx)
            Self::DerOverflow => 0x0401,
            Self::DerNestingOverflow => 0x0402,
            Self::DerNestingUnderflow => 0x0403,
            Self::DerUnbalanced => 0x0404,
            Self::DerInvalidValue => 0x0405,
            Self::PemOverflow => 0x0406,
            Self::PemMalformed => 0x0407,
            Self::CertStoreOverflow => 0x0408,

            // Attestation (0x05xx)
            Self::AgentHeaderInvalid => 0x0501,
            Self::AgentStartMismatch => 0x0502,
            Self::AgentDigestMismatch => 0x0503,
            Self::AgentSignatureInvalid => 0x0504,
            Self::RollbackRejected => 0x0505,

            // Hardware (0x06xx)
            Self::HardwareInitFailed => 0x0601,
            Self::FirewallConfigFailed => 0x0602,
            Self::FirewallEnableFailed => 0x0603,
            Self::RngNotReady => 0x0604,
            Self::Timeout => 0x0605,

            // General (0xFFxx)
            Self::BufferTooSmall => 0xFF01,
            Self::InvalidParameter => 0xFF02,
            Self::InternalError => 0xFFFF,
        }
    }

    /// Check if this error means an attestation or integrity guarantee broke
    ///
    /// Security errors must never result in a populated certificate store.
    #[must_use]
    pub const fn is_security_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidSignature
                | Self::AgentHeaderInvalid
                | Self::AgentStartMismatch
                | Self::AgentDigestMismatch
                | Self::AgentSignatureInvalid
                | Self::RollbackRejected
                | Self::StorageCorrupted
                | Self::FirewallEnableFailed
        )
    }

    /// Get a short description of the error
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::InvalidKey => "invalid key",
            Self::InvalidSignature => "signature verification failed",
            Self::RngFailure => "RNG failure",
            Self::KeyDerivationFailed => "key derivation failed",
            Self::SignFailed => "signing failed",
            Self::NotProvisioned => "identity not provisioned",
            Self::AlreadyProvisioned => "identity already provisioned",
            Self::ProvisioningFailed => "provisioning failed",
            Self::FlashAlignment => "flash alignment violation",
            Self::FlashEraseFailed => "flash erase failed",
            Self::FlashProgramFailed => "flash program failed",
            Self::FlashOutOfBounds => "flash access out of bounds",
            Self::RegionTooSmall => "region too small",
            Self::StorageCorrupted => "persistent region corrupted",
            Self::DerOverflow => "DER buffer overflow",
            Self::DerNestingOverflow => "DER nesting too deep",
            Self::DerNestingUnderflow => "DER pop without start",
            Self::DerUnbalanced => "DER structure unbalanced",
            Self::DerInvalidValue => "value not DER-encodable",
            Self::PemOverflow => "PEM buffer overflow",
            Self::PemMalformed => "PEM input malformed",
            Self::CertStoreOverflow => "certificate store overflow",
            Self::AgentHeaderInvalid => "invalid agent header",
            Self::AgentStartMismatch => "agent start address mismatch",
            Self::AgentDigestMismatch => "agent digest mismatch",
            Self::AgentSignatureInvalid => "agent signature invalid",
            Self::RollbackRejected => "rollback rejected by policy",
            Self::HardwareInitFailed => "hardware init failed",
            Self::FirewallConfigFailed => "firewall config failed",
            Self::FirewallEnableFailed => "firewall enable had no effect",
            Self::RngNotReady => "RNG not ready",
            Self::Timeout => "hardware timeout",
            Self::BufferTooSmall => "buffer too small",
            Self::InvalidParameter => "invalid parameter",
            Self::InternalError => "internal error",
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[0x{:04X}] {}", self.code(), self.description())
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "[0x{:04X}] {}", self.code(), self.description());
    }
}
