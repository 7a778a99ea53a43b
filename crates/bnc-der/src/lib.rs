// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Barnacle Systems Inc.

//! Barnacle DER Encoder
//!
//! A small streaming ASN.1/DER encoder, sufficient to build the X.509
//! certificates of the Barnacle identity chain, plus PEM conversion.
//!
//! Encoded types: SEQUENCE, SET, explicit tags, INTEGER, OID, BOOLEAN,
//! UTF8String, UTCTime, OCTET STRING, BIT STRING, and enveloping
//! OCTET/BIT STRING wrappers whose lengths are backpatched when the
//! matching [`DerBuilder::pop_nesting`] runs.
//!
//! The builder writes into a caller-owned buffer and never allocates.
//! Any error leaves the builder poisoned; the encoding must be restarted
//! with a fresh builder.

#![no_std]
#![warn(missing_docs)]
#![warn(clippy::all)]

#[cfg(test)]
extern crate std;

pub mod builder;
pub mod pem;

pub use builder::{DerBuilder, DerError, DER_MAX_NESTED, DER_MAX_TBS};
pub use pem::{der_to_pem, pem_to_der, PemLabel};
