// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Barnacle Systems Inc.

//! Barnacle X.509 Builder
//!
//! Builds the certificates of the DICE identity chain on top of the DER
//! encoder: Root, Device, and Alias TBS structures, PKCS#10 CSRs, and the
//! signed-certificate wrapping that attaches an ECDSA `(r, s)` signature.
//!
//! The alias certificate carries the firmware measurement (FWID) in a
//! dedicated extension, so a verifier can recover the exact agent digest
//! from the chain.

#![no_std]
#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

#[cfg(test)]
extern crate std;

pub mod builder;
pub mod oid;

pub use builder::{
    alias_cert_tbs, csr_tbs, device_cert_tbs, ec_private_key_der, ec_public_key_der,
    make_alias_cert, make_csr, make_device_cert, make_root_cert, root_cert_tbs, X501Name,
    X509TbsData,
};
