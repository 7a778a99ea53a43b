// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Barnacle Systems Inc.

//! Persistent region images
//!
//! The in-RAM shapes of the three managed flash images, with explicit
//! little-endian serialization. Every image leads with the region magic;
//! an image whose tag differs is unprovisioned. Byte bags are pre-filled
//! with `0xFF` so unwritten space stays in the erased state when the
//! image is programmed.

use bnc_common::constants::BARNACLE_MAGIC;
use bnc_common::{AgentVersion, CertTableEntry, Error, IssueTime};
use bnc_crypto::{EccPrivateKey, EccPublicKey, COORD_LEN};

/// Capacity for the cached alias certificate PEM
pub const ALIAS_CERT_PEM_CAPACITY: usize = 1536;

/// Capacity of the issued-certs PEM byte bag
pub const CERT_BAG_CAPACITY: usize = 3500;

/// Slots of the issued-certs table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssuedSlot {
    /// Factory root certificate
    Root = 0,
    /// Device certificate (factory-issued or self-signed)
    Device = 1,
}

/// Number of issued-certs table slots
pub const ISSUED_SLOTS: usize = 2;

fn read_u32(raw: &[u8], off: usize) -> u32 {
    u32::from_le_bytes([raw[off], raw[off + 1], raw[off + 2], raw[off + 3]])
}

fn read_public(raw: &[u8], off: usize) -> EccPublicKey {
    let mut public = EccPublicKey::zeroed();
    public.x.copy_from_slice(&raw[off..off + COORD_LEN]);
    public.y.copy_from_slice(&raw[off + COORD_LEN..off + 2 * COORD_LEN]);
    public
}

fn write_public(out: &mut [u8], off: usize, public: &EccPublicKey) {
    out[off..off + COORD_LEN].copy_from_slice(&public.x);
    out[off + COORD_LEN..off + 2 * COORD_LEN].copy_from_slice(&public.y);
}

// =============================================================================
// Device identity
// =============================================================================

/// `FwDeviceId` image: the write-once device key pair
pub struct DeviceIdImage {
    /// Region tag
    pub magic: u32,
    /// Device public key
    pub public: EccPublicKey,
    /// Device private key
    pub private: EccPrivateKey,
}

impl DeviceIdImage {
    /// Serialized size in bytes
    pub const WIRE_SIZE: usize = 4 + 3 * COORD_LEN;

    /// Whether the image carries a provisioned identity
    #[must_use]
    pub const fn is_provisioned(&self) -> bool {
        self.magic == BARNACLE_MAGIC
    }

    /// Serialize to the wire image
    pub fn to_bytes(&self, out: &mut [u8]) -> Result<usize, Error> {
        if out.len() < Self::WIRE_SIZE {
            return Err(Error::BufferTooSmall);
        }
        out[0..4].copy_from_slice(&self.magic.to_le_bytes());
        write_public(out, 4, &self.public);
        out[4 + 2 * COORD_LEN..Self::WIRE_SIZE].copy_from_slice(self.private.as_bytes());
        Ok(Self::WIRE_SIZE)
    }

    /// Deserialize from the wire image
    pub fn from_bytes(raw: &[u8]) -> Result<Self, Error> {
        if raw.len() < Self::WIRE_SIZE {
            return Err(Error::BufferTooSmall);
        }
        let mut d = [0u8; COORD_LEN];
        d.copy_from_slice(&raw[4 + 2 * COORD_LEN..Self::WIRE_SIZE]);
        Ok(Self {
            magic: read_u32(raw, 0),
            public: read_public(raw, 4),
            private: EccPrivateKey::from_bytes(d),
        })
    }
}

// =============================================================================
// Boot cache
// =============================================================================

/// `FwCache` image: last boot's compound identity and alias certificate
///
/// Rewritten only when the measured agent header digest changes.
pub struct CacheImage {
    /// Region tag
    pub magic: u32,
    /// Agent version seen when this cache was written
    pub last_version: AgentVersion,
    /// Agent issuance seen when this cache was written
    pub last_issued: IssueTime,
    /// SHA-256 of the agent header's signed region
    pub agent_hdr_digest: [u8; 32],
    /// Compound public key
    pub compound_public: EccPublicKey,
    /// Compound private key
    pub compound_private: EccPrivateKey,
    cert_len: u16,
    cert: [u8; ALIAS_CERT_PEM_CAPACITY],
}

impl CacheImage {
    /// Serialized size in bytes
    pub const WIRE_SIZE: usize = 4 + 4 + 4 + 32 + 3 * COORD_LEN + 2 + ALIAS_CERT_PEM_CAPACITY;

    const CERT_LEN_OFF: usize = 44 + 3 * COORD_LEN;
    const CERT_OFF: usize = Self::CERT_LEN_OFF + 2;

    /// Create an unprovisioned image with an erased certificate area
    #[must_use]
    pub fn new_blank() -> Self {
        Self {
            magic: 0,
            last_version: AgentVersion(0),
            last_issued: IssueTime(0),
            agent_hdr_digest: [0u8; 32],
            compound_public: EccPublicKey::zeroed(),
            compound_private: EccPrivateKey::from_bytes([0u8; COORD_LEN]),
            cert_len: 0,
            cert: [0xFF; ALIAS_CERT_PEM_CAPACITY],
        }
    }

    /// Whether the image carries a valid cache
    #[must_use]
    pub const fn is_provisioned(&self) -> bool {
        self.magic == BARNACLE_MAGIC
    }

    /// The cached alias certificate PEM
    #[must_use]
    pub fn cert(&self) -> &[u8] {
        &self.cert[..self.cert_len as usize]
    }

    /// Store the alias certificate PEM
    pub fn set_cert(&mut self, pem: &[u8]) -> Result<(), Error> {
        if pem.len() > ALIAS_CERT_PEM_CAPACITY {
            return Err(Error::CertStoreOverflow);
        }
        self.cert[..pem.len()].copy_from_slice(pem);
        self.cert_len = pem.len() as u16;
        Ok(())
    }

    /// Serialize to the wire image
    pub fn to_bytes(&self, out: &mut [u8]) -> Result<usize, Error> {
        if out.len() < Self::WIRE_SIZE {
            return Err(Error::BufferTooSmall);
        }
        out[0..4].copy_from_slice(&self.magic.to_le_bytes());
        out[4..8].copy_from_slice(&self.last_version.0.to_le_bytes());
        out[8..12].copy_from_slice(&self.last_issued.0.to_le_bytes());
        out[12..44].copy_from_slice(&self.agent_hdr_digest);
        write_public(out, 44, &self.compound_public);
        out[44 + 2 * COORD_LEN..44 + 3 * COORD_LEN]
            .copy_from_slice(self.compound_private.as_bytes());
        out[Self::CERT_LEN_OFF..Self::CERT_OFF].copy_from_slice(&self.cert_len.to_le_bytes());
        out[Self::CERT_OFF..Self::WIRE_SIZE].copy_from_slice(&self.cert);
        Ok(Self::WIRE_SIZE)
    }

    /// Deserialize from the wire image
    pub fn from_bytes(raw: &[u8]) -> Result<Self, Error> {
        if raw.len() < Self::WIRE_SIZE {
            return Err(Error::BufferTooSmall);
        }

        let mut image = Self::new_blank();
        image.magic = read_u32(raw, 0);
        image.last_version = AgentVersion(read_u32(raw, 4));
        image.last_issued = IssueTime(read_u32(raw, 8));
        image.agent_hdr_digest.copy_from_slice(&raw[12..44]);
        image.compound_public = read_public(raw, 44);

        let mut d = [0u8; COORD_LEN];
        d.copy_from_slice(&raw[44 + 2 * COORD_LEN..44 + 3 * COORD_LEN]);
        image.compound_private = EccPrivateKey::from_bytes(d);

        let cert_len =
            u16::from_le_bytes([raw[Self::CERT_LEN_OFF], raw[Self::CERT_LEN_OFF + 1]]);
        if cert_len as usize > ALIAS_CERT_PEM_CAPACITY {
            // An erased region decodes as not provisioned, not corrupt.
            if image.is_provisioned() {
                return Err(Error::StorageCorrupted);
            }
            image.cert_len = 0;
        } else {
            image.cert_len = cert_len;
        }
        image.cert.copy_from_slice(&raw[Self::CERT_OFF..Self::WIRE_SIZE]);

        Ok(image)
    }
}

// =============================================================================
// Issued certificates
// =============================================================================

/// `IssuedCerts` image: factory certificates, author key, and flags
pub struct IssuedCertsImage {
    /// Region tag
    pub magic: u32,
    /// `ISSUED_FLAG_*` bitfield
    pub flags: u32,
    /// Author-verification public key; all-zero when not populated
    pub code_auth_pub: EccPublicKey,
    /// Certificate table: root and device slots
    pub cert_table: [CertTableEntry; ISSUED_SLOTS],
    /// First free offset in the byte bag
    pub cursor: u16,
    cert_bag: [u8; CERT_BAG_CAPACITY],
}

impl IssuedCertsImage {
    /// Serialized size in bytes
    pub const WIRE_SIZE: usize =
        4 + 4 + 2 * COORD_LEN + ISSUED_SLOTS * CertTableEntry::WIRE_SIZE + 2 + CERT_BAG_CAPACITY;

    const TABLE_OFF: usize = 8 + 2 * COORD_LEN;
    const CURSOR_OFF: usize = Self::TABLE_OFF + ISSUED_SLOTS * CertTableEntry::WIRE_SIZE;
    const BAG_OFF: usize = Self::CURSOR_OFF + 2;

    /// Create an unprovisioned image with an erased byte bag
    #[must_use]
    pub fn new_blank() -> Self {
        Self {
            magic: 0,
            flags: 0,
            code_auth_pub: EccPublicKey::zeroed(),
            cert_table: [CertTableEntry::default(); ISSUED_SLOTS],
            cursor: 0,
            cert_bag: [0xFF; CERT_BAG_CAPACITY],
        }
    }

    /// Whether the image carries provisioned content
    #[must_use]
    pub const fn is_provisioned(&self) -> bool {
        self.magic == BARNACLE_MAGIC
    }

    /// Whether the author-verification key slot is populated
    #[must_use]
    pub fn has_code_auth_key(&self) -> bool {
        !self.code_auth_pub.is_zeroed()
    }

    /// Append a certificate PEM to a slot, NUL-terminated in the bag
    pub fn append_cert(&mut self, slot: IssuedSlot, pem: &[u8]) -> Result<(), Error> {
        let cursor = self.cursor as usize;
        if cursor + pem.len() + 1 > CERT_BAG_CAPACITY || pem.len() > u16::MAX as usize {
            return Err(Error::CertStoreOverflow);
        }

        self.cert_bag[cursor..cursor + pem.len()].copy_from_slice(pem);
        self.cert_table[slot as usize] = CertTableEntry {
            start: self.cursor,
            size: pem.len() as u16,
        };
        self.cursor += pem.len() as u16;
        self.cert_bag[self.cursor as usize] = 0;
        self.cursor += 1;
        Ok(())
    }

    /// The certificate PEM in a slot, when populated
    #[must_use]
    pub fn cert(&self, slot: IssuedSlot) -> Option<&[u8]> {
        let entry = self.cert_table[slot as usize];
        if entry.is_empty() {
            return None;
        }
        let start = entry.start as usize;
        let end = start + entry.size as usize;
        if end > CERT_BAG_CAPACITY {
            return None;
        }
        Some(&self.cert_bag[start..end])
    }

    /// Serialize to the wire image
    pub fn to_bytes(&self, out: &mut [u8]) -> Result<usize, Error> {
        if out.len() < Self::WIRE_SIZE {
            return Err(Error::BufferTooSmall);
        }
        out[0..4].copy_from_slice(&self.magic.to_le_bytes());
        out[4..8].copy_from_slice(&self.flags.to_le_bytes());
        write_public(out, 8, &self.code_auth_pub);
        for (i, entry) in self.cert_table.iter().enumerate() {
            let off = Self::TABLE_OFF + i * CertTableEntry::WIRE_SIZE;
            entry.write_to(&mut out[off..off + CertTableEntry::WIRE_SIZE]);
        }
        out[Self::CURSOR_OFF..Self::BAG_OFF].copy_from_slice(&self.cursor.to_le_bytes());
        out[Self::BAG_OFF..Self::WIRE_SIZE].copy_from_slice(&self.cert_bag);
        Ok(Self::WIRE_SIZE)
    }

    /// Deserialize from the wire image
    pub fn from_bytes(raw: &[u8]) -> Result<Self, Error> {
        if raw.len() < Self::WIRE_SIZE {
            return Err(Error::BufferTooSmall);
        }

        let mut image = Self::new_blank();
        image.magic = read_u32(raw, 0);
        image.flags = read_u32(raw, 4);
        image.code_auth_pub = read_public(raw, 8);
        for (i, entry) in image.cert_table.iter_mut().enumerate() {
            let off = Self::TABLE_OFF + i * CertTableEntry::WIRE_SIZE;
            *entry = CertTableEntry::read_from(&raw[off..off + CertTableEntry::WIRE_SIZE]);
        }
        image.cursor =
            u16::from_le_bytes([raw[Self::CURSOR_OFF], raw[Self::CURSOR_OFF + 1]]);
        image.cert_bag.copy_from_slice(&raw[Self::BAG_OFF..Self::WIRE_SIZE]);

        if image.is_provisioned() && image.cursor as usize > CERT_BAG_CAPACITY {
            return Err(Error::StorageCorrupted);
        }
        Ok(image)
    }
}
