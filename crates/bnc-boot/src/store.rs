// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Barnacle Systems Inc.

//! Persistent store
//!
//! Region-granular access to the managed flash layout. A region is never
//! updated in place: [`PersistentStore::write_region`] erases every page
//! the new image covers and then programs it, so a crash mid-write
//! leaves the region either fully updated or erased. Atomicity is
//! page-granular; the erased state reads as unprovisioned (no magic) and
//! a retry simply runs the same write again.

use bnc_common::Error;
use bnc_crypto::secure_zero;
use bnc_hal::FlashInterface;

use crate::layout::{Region, RegionLayout};
use crate::regions::{CacheImage, DeviceIdImage, IssuedCertsImage};

/// Persistent store over a flash device and a validated layout
pub struct PersistentStore<F: FlashInterface> {
    flash: F,
    layout: RegionLayout,
}

impl<F: FlashInterface> PersistentStore<F> {
    /// Create a store; validates the layout against the device geometry
    pub fn new(mut flash: F, layout: RegionLayout) -> Result<Self, Error> {
        layout.validate::<F>()?;
        flash.init().map_err(Error::from)?;
        Ok(Self { flash, layout })
    }

    /// The configured region layout
    #[must_use]
    pub const fn layout(&self) -> &RegionLayout {
        &self.layout
    }

    /// Direct access to the flash device
    pub fn flash(&self) -> &F {
        &self.flash
    }

    /// Mutable access to the flash device (tests, fault injection)
    pub fn flash_mut(&mut self) -> &mut F {
        &mut self.flash
    }

    /// Tear down into the underlying flash device
    pub fn into_flash(self) -> F {
        self.flash
    }

    /// Read `buf.len()` bytes from a region at `offset`
    pub fn read_region(&self, region: Region, offset: u32, buf: &mut [u8]) -> Result<(), Error> {
        if !region.contains(region.base + offset, buf.len() as u32) {
            return Err(Error::FlashOutOfBounds);
        }
        self.flash
            .read(region.base + offset, buf)
            .map_err(Error::from)
    }

    /// Erase a region's pages and program a new image
    ///
    /// Fails before any erase on alignment or size violations. The image
    /// is padded to the write granule with `0xFF` and verified after
    /// programming.
    pub fn write_region(&mut self, region: Region, data: &[u8]) -> Result<(), Error> {
        if data.is_empty() || data.len() as u32 > region.len {
            return Err(Error::RegionTooSmall);
        }
        if region.base % F::PAGE_SIZE as u32 != 0 {
            return Err(Error::FlashAlignment);
        }

        let end = region.base + data.len() as u32;
        self.flash
            .erase_range(region.base, end)
            .map_err(|_| Error::FlashEraseFailed)?;

        // Program whole granules; the tail is padded with the erased
        // value so it can be rewritten later without a new erase.
        let granule = F::WRITE_GRANULE;
        let full = data.len() - data.len() % granule;
        if full > 0 {
            self.flash
                .write(region.base, &data[..full])
                .map_err(|_| Error::FlashProgramFailed)?;
        }
        if full < data.len() {
            let mut tail = [0xFFu8; 16];
            debug_assert!(granule <= tail.len());
            tail[..data.len() - full].copy_from_slice(&data[full..]);
            self.flash
                .write(region.base + full as u32, &tail[..granule])
                .map_err(|_| Error::FlashProgramFailed)?;
        }

        match self.flash.verify(region.base, data) {
            Ok(true) => Ok(()),
            Ok(false) => Err(Error::FlashProgramFailed),
            Err(e) => Err(Error::from(e)),
        }
    }

    /// Whether a region's pages are fully erased
    pub fn is_blank(&self, region: Region) -> Result<bool, Error> {
        self.flash
            .is_blank(region.base, region.len as usize)
            .map_err(Error::from)
    }

    // =========================================================================
    // Typed image access
    // =========================================================================

    /// Load the device identity image
    pub fn load_device_id(&self) -> Result<DeviceIdImage, Error> {
        let mut raw = [0u8; DeviceIdImage::WIRE_SIZE];
        self.read_region(self.layout.device_id, 0, &mut raw)?;
        let image = DeviceIdImage::from_bytes(&raw);
        secure_zero(&mut raw);
        image
    }

    /// Persist the device identity image
    ///
    /// The identity is write-once: storing over a provisioned region is
    /// refused.
    pub fn store_device_id(&mut self, image: &DeviceIdImage) -> Result<(), Error> {
        if self.load_device_id()?.is_provisioned() {
            return Err(Error::AlreadyProvisioned);
        }

        let mut raw = [0u8; DeviceIdImage::WIRE_SIZE];
        image.to_bytes(&mut raw)?;
        let result = self.write_region(self.layout.device_id, &raw);
        secure_zero(&mut raw);
        result
    }

    /// Load the boot cache image
    pub fn load_cache(&self) -> Result<CacheImage, Error> {
        let mut raw = [0u8; CacheImage::WIRE_SIZE];
        self.read_region(self.layout.cache, 0, &mut raw)?;
        let image = CacheImage::from_bytes(&raw);
        secure_zero(&mut raw);
        image
    }

    /// Persist the boot cache image
    pub fn store_cache(&mut self, image: &CacheImage) -> Result<(), Error> {
        let mut raw = [0u8; CacheImage::WIRE_SIZE];
        image.to_bytes(&mut raw)?;
        let result = self.write_region(self.layout.cache, &raw);
        secure_zero(&mut raw);
        result
    }

    /// Load the issued-certs image
    pub fn load_issued_certs(&self) -> Result<IssuedCertsImage, Error> {
        let mut raw = [0u8; IssuedCertsImage::WIRE_SIZE];
        self.read_region(self.layout.issued_certs, 0, &mut raw)?;
        IssuedCertsImage::from_bytes(&raw)
    }

    /// Persist the issued-certs image
    pub fn store_issued_certs(&mut self, image: &IssuedCertsImage) -> Result<(), Error> {
        let mut raw = [0u8; IssuedCertsImage::WIRE_SIZE];
        image.to_bytes(&mut raw)?;
        self.write_region(self.layout.issued_certs, &raw)
    }
}
