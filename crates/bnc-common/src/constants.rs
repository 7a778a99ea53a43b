// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Barnacle Systems Inc.

//! System-wide constants for the Barnacle boot suite

// =============================================================================
// Region Tags
// =============================================================================

/// Tag carried by every provisioned persistent region: "BNCL"
///
/// A region whose tag differs is unprovisioned, which is a legal state
/// only before the first successful provisioning.
pub const BARNACLE_MAGIC: u32 = 0x4C43_4E42;

/// Highest agent header format version this loader accepts
pub const AGENT_HDR_VERSION_MAX: u32 = 1;

// =============================================================================
// Cryptographic Sizes
// =============================================================================

/// SHA-256 digest length in bytes
pub const SHA256_LEN: usize = 32;

/// SHA-1 digest length in bytes (authority key identifiers)
pub const SHA1_LEN: usize = 20;

/// Certificate serial number length in bytes
pub const SERIAL_NUM_LEN: usize = 8;

// =============================================================================
// KDF Labels
// =============================================================================

/// KDF label for identity key derivation
pub const LABEL_IDENTITY: &[u8] = b"Identity";

/// KDF label for certificate serial number derivation
pub const LABEL_SERIAL: &[u8] = b"Serial";

// =============================================================================
// Agent Header
// =============================================================================

/// Fixed agent name field length in the agent header
pub const AGENT_NAME_LEN: usize = 32;

// =============================================================================
// Issued-Certs Flags
// =============================================================================

/// Factory provisioning completed
pub const ISSUED_FLAG_PROVISIONED: u32 = 0x1;

/// Author signature over the agent header is required at boot
pub const ISSUED_FLAG_AUTHENTICATED_BOOT: u32 = 0x2;

/// Issued-certs page is write-locked against DFU updates
pub const ISSUED_FLAG_WRITELOCK: u32 = 0x4;
