// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Barnacle Systems Inc.

//! DFU region descriptor
//!
//! The DfuSe alt-setting string advertises the updatable flash area to
//! the host tool: runs of writable 4 KB blocks over the agent area,
//! then the issued-certs page, which turns read-only once the
//! write-lock flag is set.
//!
//! Example: `@Barnacle /0x08020000/99*004Kf,99*004Kf,24*004Kf,01*04Kg`

use bnc_common::constants::ISSUED_FLAG_WRITELOCK;
use core::fmt::Write;
use heapless::String;

use crate::layout::{RegionLayout, DFU_BLOCK_SIZE};

/// Maximum descriptor string length
pub const DFU_DESCRIPTOR_LEN: usize = 128;

/// Longest run of blocks one descriptor element can carry
const MAX_RUN: u32 = 99;

/// Build the DFU descriptor string for a layout and flags word
///
/// The terminal element describes the issued-certs page: mode `a`
/// (read-only) when `ISSUED_FLAG_WRITELOCK` is set, else `g` (writable).
#[must_use]
pub fn descriptor(layout: &RegionLayout, issued_flags: u32) -> String<DFU_DESCRIPTOR_LEN> {
    let mut out = String::new();

    let mut agent_blocks =
        (layout.issued_certs.base - layout.agent_hdr.base) / DFU_BLOCK_SIZE;

    // The string capacity covers any layout this loader accepts, so the
    // write failures below cannot fire.
    let _ = write!(out, "@Barnacle /0x{:08x}/", layout.agent_hdr.base);
    while agent_blocks > 0 {
        let run = agent_blocks.min(MAX_RUN);
        let _ = write!(out, "{run:02}*004Kf,");
        agent_blocks -= run;
    }

    let mode = if issued_flags & ISSUED_FLAG_WRITELOCK != 0 { 'a' } else { 'g' };
    let _ = write!(out, "01*04K{mode}");

    out
}
