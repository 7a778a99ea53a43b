// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Barnacle Systems Inc.

//! Object identifiers used by the identity chain

/// TCG DICE firmware-measurement extension (tcg-kp-AttestLoc arc)
pub const FIRMWARE_ID_EXT: &[u32] = &[2, 23, 133, 5, 4, 1];

/// ecdsa-with-SHA256
pub const ECDSA_WITH_SHA256: &[u32] = &[1, 2, 840, 10045, 4, 3, 2];

/// id-ecPublicKey
pub const EC_PUBLIC_KEY: &[u32] = &[1, 2, 840, 10045, 2, 1];

/// id-ce-keyUsage
pub const KEY_USAGE: &[u32] = &[2, 5, 29, 15];

/// id-ce-extKeyUsage
pub const EXT_KEY_USAGE: &[u32] = &[2, 5, 29, 37];

/// id-ce-authorityKeyIdentifier
pub const AUTHORITY_KEY_IDENTIFIER: &[u32] = &[2, 5, 29, 35];

/// id-kp-clientAuth
pub const CLIENT_AUTH: &[u32] = &[1, 3, 6, 1, 5, 5, 7, 3, 2];

/// id-sha256
pub const SHA256: &[u32] = &[2, 16, 840, 1, 101, 3, 4, 2, 1];

/// id-at-commonName
pub const COMMON_NAME: &[u32] = &[2, 5, 4, 3];

/// id-at-countryName
pub const COUNTRY_NAME: &[u32] = &[2, 5, 4, 6];

/// id-at-organizationName
pub const ORGANIZATION_NAME: &[u32] = &[2, 5, 4, 10];

/// id-ce-basicConstraints
pub const BASIC_CONSTRAINTS: &[u32] = &[2, 5, 29, 19];

/// prime256v1
#[cfg(feature = "p256")]
pub const CURVE: &[u32] = &[1, 2, 840, 10045, 3, 1, 7];

/// secp384r1
#[cfg(feature = "p384")]
pub const CURVE: &[u32] = &[1, 3, 132, 0, 34];

/// secp521r1
#[cfg(feature = "p521")]
pub const CURVE: &[u32] = &[1, 3, 132, 0, 35];

/// KeyUsage bits: digitalSignature | keyCertSign
pub const KEY_USAGE_BITS: u8 = 0x84;
