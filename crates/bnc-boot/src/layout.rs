// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Barnacle Systems Inc.

//! Flash region layout
//!
//! The partitioning of flash into the five managed regions is explicit
//! configuration: base and length per region, validated once against the
//! flash device's geometry. Placement order and adjacency are part of
//! the contract:
//!
//! ```text
//! [ AgentHdr | AgentCode | IssuedCerts | FwDeviceId | FwCache ]
//! ```
//!
//! Every region starts on an erase-page boundary so it can be rewritten
//! without touching its neighbors, and the agent area (header + code) is
//! a whole number of 4 KB DFU blocks.

use bnc_common::Error;
use bnc_hal::FlashInterface;

/// DFU update block size advertised to the host tool
pub const DFU_BLOCK_SIZE: u32 = 4096;

/// One flash region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    /// First byte address
    pub base: u32,
    /// Length in bytes
    pub len: u32,
}

impl Region {
    /// First address past the region
    #[must_use]
    pub const fn end(&self) -> u32 {
        self.base + self.len
    }

    /// Whether `[addr, addr+len)` lies inside the region
    #[must_use]
    pub const fn contains(&self, addr: u32, len: u32) -> bool {
        addr >= self.base && addr + len <= self.end()
    }
}

/// The five managed flash regions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionLayout {
    /// Agent header (one erase page)
    pub agent_hdr: Region,
    /// Agent instruction bytes
    pub agent_code: Region,
    /// Factory-issued certificates, author key, flags
    pub issued_certs: Region,
    /// Device identity key pair (write-once)
    pub device_id: Region,
    /// Per-agent-version cache: compound key, alias cert
    pub cache: Region,
}

impl RegionLayout {
    /// Default placement for the STM32L4 reference target (1 MB flash,
    /// 128 KB loader at the bottom)
    pub const STM32L4: Self = Self {
        agent_hdr: Region { base: 0x0802_0000, len: 0x0800 },
        agent_code: Region { base: 0x0802_0800, len: 0xD_D800 },
        issued_certs: Region { base: 0x080F_E000, len: 0x1000 },
        device_id: Region { base: 0x080F_F000, len: 0x0800 },
        cache: Region { base: 0x080F_F800, len: 0x0800 },
    };

    fn regions(&self) -> [&Region; 5] {
        [
            &self.agent_hdr,
            &self.agent_code,
            &self.issued_certs,
            &self.device_id,
            &self.cache,
        ]
    }

    /// Validate the layout against a flash device's geometry
    ///
    /// Checks page alignment of every region, the adjacency contract,
    /// device bounds, and the 4 KB DFU-block alignment of the agent area
    /// and the issued-certs page.
    pub fn validate<F: FlashInterface>(&self) -> Result<(), Error> {
        let page = F::PAGE_SIZE as u32;

        for region in self.regions() {
            if region.base % page != 0 || region.len % page != 0 || region.len == 0 {
                return Err(Error::FlashAlignment);
            }
        }

        // Placement order and adjacency.
        if self.agent_code.base != self.agent_hdr.end()
            || self.issued_certs.base != self.agent_code.end()
            || self.device_id.base != self.issued_certs.end()
            || self.cache.base != self.device_id.end()
        {
            return Err(Error::InvalidParameter);
        }

        // Device bounds.
        let flash_end = F::BASE_ADDRESS + F::TOTAL_SIZE as u32;
        if self.agent_hdr.base < F::BASE_ADDRESS || self.cache.end() > flash_end {
            return Err(Error::FlashOutOfBounds);
        }

        // The DFU descriptor speaks in 4 KB blocks.
        if self.agent_hdr.base % DFU_BLOCK_SIZE != 0
            || (self.issued_certs.base - self.agent_hdr.base) % DFU_BLOCK_SIZE != 0
        {
            return Err(Error::FlashAlignment);
        }

        Ok(())
    }

    /// Address span the firewall must cover: both private regions
    ///
    /// Returns `(start, len)` over `[device_id.base, cache.end())`.
    #[must_use]
    pub const fn firewall_span(&self) -> (u32, u32) {
        (self.device_id.base, self.cache.end() - self.device_id.base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bnc_hal::mock::MockFlash;

    type Flash = MockFlash<{ 1024 * 1024 }>;

    // Compact layout used across the boot tests.
    pub(crate) const TEST_LAYOUT: RegionLayout = RegionLayout {
        agent_hdr: Region { base: 0x0800_0000, len: 0x0800 },
        agent_code: Region { base: 0x0800_0800, len: 0x1800 },
        issued_certs: Region { base: 0x0800_2000, len: 0x1000 },
        device_id: Region { base: 0x0800_3000, len: 0x0800 },
        cache: Region { base: 0x0800_3800, len: 0x0800 },
    };

    #[test]
    fn test_layout_validates() {
        TEST_LAYOUT.validate::<Flash>().unwrap();
    }

    #[test]
    fn default_layout_validates_against_l4_geometry() {
        use bnc_hal::stm32l4::Stm32l4Flash;
        RegionLayout::STM32L4.validate::<Stm32l4Flash>().unwrap();
    }

    #[test]
    fn gap_in_layout_rejected() {
        let mut layout = TEST_LAYOUT;
        layout.issued_certs.base += 0x1000;
        assert_eq!(
            layout.validate::<Flash>(),
            Err(Error::InvalidParameter)
        );
    }

    #[test]
    fn unaligned_region_rejected() {
        let mut layout = TEST_LAYOUT;
        layout.cache.base += 4;
        assert!(layout.validate::<Flash>().is_err());
    }

    #[test]
    fn firewall_span_covers_both_private_regions() {
        let (start, len) = TEST_LAYOUT.firewall_span();
        assert_eq!(start, TEST_LAYOUT.device_id.base);
        assert_eq!(start + len, TEST_LAYOUT.cache.end());
    }
}
