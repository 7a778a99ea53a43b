// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Barnacle Systems Inc.

//! RAM hand-off structures
//!
//! [`CertStore`] is the agent-visible certificate chain: concatenated
//! PEM blocks, each followed by a single NUL so C-string consumers can
//! walk the bag. [`CompoundId`] is this boot's compound key pair; it is
//! returned to the platform entry code, which owns its placement, and it
//! zeroizes itself on drop.

use bnc_common::constants::BARNACLE_MAGIC;
use bnc_common::{CertTableEntry, Error};
use bnc_crypto::{EccPrivateKey, EccPublicKey};

/// Capacity of the RAM certificate bag
pub const CERT_STORE_CAPACITY: usize = 4800;

/// Slots of the RAM certificate store, in chain order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CertStoreSlot {
    /// Factory root certificate
    Root = 0,
    /// Device certificate
    Device = 1,
    /// Alias (loader-issued) certificate
    Loader = 2,
}

/// Number of certificate store slots
pub const CERT_STORE_SLOTS: usize = 3;

/// Agent-visible certificate chain
pub struct CertStore {
    /// Region tag
    pub magic: u32,
    /// Slot index into the byte bag
    pub table: [CertTableEntry; CERT_STORE_SLOTS],
    /// First free offset in the byte bag
    pub cursor: u32,
    /// Concatenated PEM blocks with NUL separators
    pub bag: [u8; CERT_STORE_CAPACITY],
}

impl CertStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self {
            magic: BARNACLE_MAGIC,
            table: [CertTableEntry::default(); CERT_STORE_SLOTS],
            cursor: 0,
            bag: [0u8; CERT_STORE_CAPACITY],
        }
    }

    /// Append a certificate PEM to a slot
    ///
    /// The capacity check runs before anything is copied; on overflow
    /// the store is unchanged and assembly must abort.
    pub fn append(&mut self, slot: CertStoreSlot, pem: &[u8]) -> Result<(), Error> {
        let cursor = self.cursor as usize;
        if cursor + pem.len() + 1 > CERT_STORE_CAPACITY || pem.len() > u16::MAX as usize {
            return Err(Error::CertStoreOverflow);
        }

        self.bag[cursor..cursor + pem.len()].copy_from_slice(pem);
        self.table[slot as usize] = CertTableEntry {
            start: self.cursor as u16,
            size: pem.len() as u16,
        };
        self.cursor += pem.len() as u32;
        self.bag[self.cursor as usize] = 0;
        self.cursor += 1;
        Ok(())
    }

    /// The certificate PEM in a slot, when populated
    #[must_use]
    pub fn pem(&self, slot: CertStoreSlot) -> Option<&[u8]> {
        let entry = self.table[slot as usize];
        if entry.is_empty() {
            return None;
        }
        Some(&self.bag[entry.start as usize..entry.start as usize + entry.size as usize])
    }

    /// The full bag contents written so far
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bag[..self.cursor as usize]
    }
}

impl Default for CertStore {
    fn default() -> Self {
        Self::new()
    }
}

/// This boot's compound identity
pub struct CompoundId {
    /// Region tag
    pub magic: u32,
    /// Compound public key
    pub public: EccPublicKey,
    /// Compound private key; zeroizes on drop
    pub private: EccPrivateKey,
}
