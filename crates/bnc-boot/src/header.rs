// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Barnacle Systems Inc.

//! Agent header
//!
//! Wire layout (packed, little-endian):
//!
//! ```text
//! Offset  Size        Field
//! 0x00    4           Magic
//! 0x04    4           Header format version
//! 0x08    4           Bytes from header start to code start
//! 0x0C    32          Agent name (NUL-padded)
//! 0x2C    4           Agent version (major << 16 | minor)
//! 0x30    4           Issuance timestamp
//! 0x34    4           Agent code size
//! 0x38    32          SHA-256 of the agent code
//! 0x58    2*COORD     Author signature (r, s); zero when unsigned
//! ```
//!
//! Everything before the signature is the signed region; the author
//! signature (authenticated boot) covers its SHA-256 digest.

use bnc_common::constants::{AGENT_HDR_VERSION_MAX, AGENT_NAME_LEN, BARNACLE_MAGIC};
use bnc_common::{AgentVersion, Error, IssueTime};
use bnc_crypto::{EccSignature, COORD_LEN};

/// Offset where the signed region ends and the signature begins
pub const AGENT_HDR_SIGNED_LEN: usize = 0x58;

/// Full serialized header size
pub const AGENT_HDR_WIRE_SIZE: usize = AGENT_HDR_SIGNED_LEN + 2 * COORD_LEN;

/// Parsed agent header
#[derive(Clone)]
pub struct AgentHeader {
    /// Region tag; must equal [`BARNACLE_MAGIC`]
    pub magic: u32,
    /// Header format version
    pub version: u32,
    /// Bytes from header start to code start
    pub size: u32,
    /// Agent name, NUL-padded
    pub name: [u8; AGENT_NAME_LEN],
    /// Agent firmware version
    pub agent_version: AgentVersion,
    /// Agent issuance timestamp
    pub issued: IssueTime,
    /// Agent code size in bytes
    pub agent_size: u32,
    /// SHA-256 digest of the agent code
    pub digest: [u8; 32],
    /// Author signature over the signed region's digest; all-zero when
    /// the agent is unsigned
    pub signature: EccSignature,
}

impl AgentHeader {
    /// Parse a header from its wire image
    ///
    /// Only structural parsing happens here; semantic checks live in
    /// [`AgentHeader::validate`].
    pub fn parse(raw: &[u8]) -> Result<Self, Error> {
        if raw.len() < AGENT_HDR_WIRE_SIZE {
            return Err(Error::BufferTooSmall);
        }

        let u32_at = |off: usize| u32::from_le_bytes([raw[off], raw[off + 1], raw[off + 2], raw[off + 3]]);

        let mut name = [0u8; AGENT_NAME_LEN];
        name.copy_from_slice(&raw[0x0C..0x0C + AGENT_NAME_LEN]);

        let mut digest = [0u8; 32];
        digest.copy_from_slice(&raw[0x38..0x58]);

        let mut signature = EccSignature::zeroed();
        signature.r.copy_from_slice(&raw[0x58..0x58 + COORD_LEN]);
        signature
            .s
            .copy_from_slice(&raw[0x58 + COORD_LEN..AGENT_HDR_WIRE_SIZE]);

        Ok(Self {
            magic: u32_at(0x00),
            version: u32_at(0x04),
            size: u32_at(0x08),
            name,
            agent_version: AgentVersion(u32_at(0x2C)),
            issued: IssueTime(u32_at(0x30)),
            agent_size: u32_at(0x34),
            digest,
            signature,
        })
    }

    /// Serialize to the wire image
    pub fn write_to(&self, out: &mut [u8]) -> Result<usize, Error> {
        if out.len() < AGENT_HDR_WIRE_SIZE {
            return Err(Error::BufferTooSmall);
        }

        out[0x00..0x04].copy_from_slice(&self.magic.to_le_bytes());
        out[0x04..0x08].copy_from_slice(&self.version.to_le_bytes());
        out[0x08..0x0C].copy_from_slice(&self.size.to_le_bytes());
        out[0x0C..0x0C + AGENT_NAME_LEN].copy_from_slice(&self.name);
        out[0x2C..0x30].copy_from_slice(&self.agent_version.0.to_le_bytes());
        out[0x30..0x34].copy_from_slice(&self.issued.0.to_le_bytes());
        out[0x34..0x38].copy_from_slice(&self.agent_size.to_le_bytes());
        out[0x38..0x58].copy_from_slice(&self.digest);
        out[0x58..0x58 + COORD_LEN].copy_from_slice(&self.signature.r);
        out[0x58 + COORD_LEN..AGENT_HDR_WIRE_SIZE].copy_from_slice(&self.signature.s);

        Ok(AGENT_HDR_WIRE_SIZE)
    }

    /// Check magic and format version
    pub fn validate(&self) -> Result<(), Error> {
        if self.magic != BARNACLE_MAGIC || self.version > AGENT_HDR_VERSION_MAX {
            return Err(Error::AgentHeaderInvalid);
        }
        Ok(())
    }

    /// Agent name up to the first NUL, when valid UTF-8
    #[must_use]
    pub fn name_str(&self) -> Option<&str> {
        let end = self.name.iter().position(|&b| b == 0).unwrap_or(AGENT_NAME_LEN);
        core::str::from_utf8(&self.name[..end]).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_header() -> AgentHeader {
        let mut name = [0u8; AGENT_NAME_LEN];
        name[..5].copy_from_slice(b"agent");
        AgentHeader {
            magic: BARNACLE_MAGIC,
            version: 1,
            size: 0x800,
            name,
            agent_version: AgentVersion::new(1, 2),
            issued: IssueTime(1_700_000_000),
            agent_size: 4096,
            digest: [0x5A; 32],
            signature: EccSignature::zeroed(),
        }
    }

    #[test]
    fn wire_round_trip() {
        let header = sample_header();
        let mut raw = [0u8; AGENT_HDR_WIRE_SIZE];
        header.write_to(&mut raw).unwrap();

        let parsed = AgentHeader::parse(&raw).unwrap();
        assert_eq!(parsed.magic, header.magic);
        assert_eq!(parsed.version, header.version);
        assert_eq!(parsed.size, header.size);
        assert_eq!(parsed.name, header.name);
        assert_eq!(parsed.agent_version, header.agent_version);
        assert_eq!(parsed.issued, header.issued);
        assert_eq!(parsed.agent_size, header.agent_size);
        assert_eq!(parsed.digest, header.digest);
        assert_eq!(parsed.signature, header.signature);
    }

    #[test]
    fn validate_rejects_bad_magic() {
        let mut header = sample_header();
        header.magic = 0xDEAD_BEEF;
        assert_eq!(header.validate(), Err(Error::AgentHeaderInvalid));
    }

    #[test]
    fn validate_rejects_future_format_version() {
        let mut header = sample_header();
        header.version = AGENT_HDR_VERSION_MAX + 1;
        assert_eq!(header.validate(), Err(Error::AgentHeaderInvalid));
    }

    #[test]
    fn name_stops_at_nul() {
        let header = sample_header();
        assert_eq!(header.name_str(), Some("agent"));
    }

    #[test]
    fn short_input_rejected() {
        let raw = [0u8; AGENT_HDR_WIRE_SIZE - 1];
        assert_eq!(
            AgentHeader::parse(&raw).err(),
            Some(Error::BufferTooSmall)
        );
    }
}
