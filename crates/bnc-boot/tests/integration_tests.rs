// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Barnacle Systems Inc.

//! End-to-end boot scenarios on the mock HAL
//!
//! Drives the full flow (provision, verify, seal) across simulated
//! power cycles: first boot on a blank device, warm boots, agent
//! updates, tampered agents, authenticated boot, and rollback.

use bnc_boot::boot::{Boot, BootConfig, RollbackPolicy};
use bnc_boot::certstore::CertStoreSlot;
use bnc_boot::header::{AgentHeader, AGENT_HDR_SIGNED_LEN, AGENT_HDR_WIRE_SIZE};
use bnc_boot::layout::{Region, RegionLayout};
use bnc_common::constants::{
    AGENT_NAME_LEN, BARNACLE_MAGIC, ISSUED_FLAG_AUTHENTICATED_BOOT, ISSUED_FLAG_PROVISIONED,
};
use bnc_common::log::LogLevel;
use bnc_common::{AgentVersion, Error, IssueTime};
use bnc_crypto::ecc::{derive_ecc_key, sign_digest};
use bnc_crypto::hash::sha256;
use bnc_crypto::{EccPrivateKey, EccPublicKey, EccSignature};
use bnc_hal::mock::{MockFirewall, MockFlash, MockRng};
use bnc_hal::FlashInterface;

const LAYOUT: RegionLayout = RegionLayout {
    agent_hdr: Region { base: 0x0800_0000, len: 0x0800 },
    agent_code: Region { base: 0x0800_0800, len: 0x1800 },
    issued_certs: Region { base: 0x0800_2000, len: 0x1000 },
    device_id: Region { base: 0x0800_3000, len: 0x0800 },
    cache: Region { base: 0x0800_3800, len: 0x0800 },
};

type Flash = MockFlash<0x4000>;
type TestBoot = Boot<Flash, MockRng, MockFirewall>;

/// A buildable agent image for the tests
struct AgentImage {
    name: &'static str,
    version: AgentVersion,
    issued: IssueTime,
    code: Vec<u8>,
    /// Sign the header with this author key
    author: Option<EccPrivateKey>,
    /// Corrupt the stored code digest after signing
    break_digest: bool,
    /// Corrupt the signature after signing
    break_signature: bool,
}

impl AgentImage {
    fn new(name: &'static str, version: (u16, u16), issued: u32, fill: u8) -> Self {
        Self {
            name,
            version: AgentVersion::new(version.0, version.1),
            issued: IssueTime(issued),
            code: vec![fill; 512],
            author: None,
            break_digest: false,
            break_signature: false,
        }
    }

    /// Program the image into the mock flash
    fn install(&self, flash: &mut Flash) {
        let mut name = [0u8; AGENT_NAME_LEN];
        name[..self.name.len()].copy_from_slice(self.name.as_bytes());

        let mut header = AgentHeader {
            magic: BARNACLE_MAGIC,
            version: 1,
            size: LAYOUT.agent_hdr.len,
            name,
            agent_version: self.version,
            issued: self.issued,
            agent_size: self.code.len() as u32,
            digest: sha256(&self.code),
            signature: EccSignature::zeroed(),
        };

        if self.break_digest {
            header.digest[0] ^= 0xFF;
        }

        let mut raw = [0u8; AGENT_HDR_WIRE_SIZE];
        header.write_to(&mut raw).unwrap();

        if let Some(author) = &self.author {
            let header_digest = sha256(&raw[..AGENT_HDR_SIGNED_LEN]);
            let mut sig = sign_digest(&header_digest, author).unwrap();
            if self.break_signature {
                sig.r[0] ^= 0x01;
            }
            header.signature = sig;
            header.write_to(&mut raw).unwrap();
        }

        flash.init().unwrap();
        flash
            .erase_range(LAYOUT.agent_hdr.base, LAYOUT.agent_code.end())
            .unwrap();
        flash.write(LAYOUT.agent_hdr.base, &raw).unwrap();
        flash.write(LAYOUT.agent_code.base, &self.code).unwrap();
    }
}

fn boot_with(flash: Flash, policy: RollbackPolicy) -> TestBoot {
    let config = BootConfig {
        layout: LAYOUT,
        rollback_policy: policy,
    };
    Boot::new(config, flash, MockRng::default(), MockFirewall::new()).unwrap()
}

fn fresh_device(agent: &AgentImage) -> TestBoot {
    let mut flash = Flash::new();
    agent.install(&mut flash);
    boot_with(flash, RollbackPolicy::ReportOnly)
}

/// Power-cycle: keep flash contents, renew RAM and peripherals
fn reboot(boot: TestBoot, policy: RollbackPolicy) -> TestBoot {
    let (flash, _, _) = boot.into_parts();
    boot_with(flash, policy)
}

fn log_contains(boot: &TestBoot, level: LogLevel, needle: &str) -> bool {
    boot.log()
        .iter()
        .any(|e| e.level == level && e.message.as_str().contains(needle))
}

// =============================================================================
// E1: blank device provisions and attests
// =============================================================================

#[test]
fn e1_blank_device_provisions_and_builds_chain() {
    let agent = AgentImage::new("agent", (1, 0), 1_000, 0xA1);
    let mut boot = fresh_device(&agent);

    let artifacts = boot.run().unwrap();

    // Device identity persisted.
    let device_id = boot.store().load_device_id().unwrap();
    assert!(device_id.is_provisioned());

    // Self-signed device certificate in the issued region.
    let issued = boot.store().load_issued_certs().unwrap();
    assert!(issued.is_provisioned());
    assert!(issued
        .cert(bnc_boot::regions::IssuedSlot::Device)
        .is_some());

    // Alias certificate cached.
    let cache = boot.store().load_cache().unwrap();
    assert!(cache.is_provisioned());
    assert!(!cache.cert().is_empty());

    // Chain: no root (not factory provisioned), device + alias present.
    assert!(artifacts.cert_store.pem(CertStoreSlot::Root).is_none());
    let device_pem = artifacts.cert_store.pem(CertStoreSlot::Device).unwrap();
    let alias_pem = artifacts.cert_store.pem(CertStoreSlot::Loader).unwrap();
    assert!(device_pem.starts_with(b"-----BEGIN CERTIFICATE-----"));
    assert!(alias_pem.starts_with(b"-----BEGIN CERTIFICATE-----"));

    // Compound identity is real key material.
    assert!(!artifacts.compound_id.public.is_zeroed());
    assert_eq!(artifacts.compound_id.magic, BARNACLE_MAGIC);
}

// =============================================================================
// E2: warm boot is read-only and byte-stable
// =============================================================================

#[test]
fn e2_same_agent_reboot_writes_nothing_and_chain_is_identical() {
    let agent = AgentImage::new("agent", (1, 0), 1_000, 0xA1);
    let mut boot = fresh_device(&agent);
    let first = boot.run().unwrap();
    let first_bytes = first.cert_store.as_bytes().to_vec();

    let mut boot = reboot(boot, RollbackPolicy::ReportOnly);
    boot.store_mut().flash_mut().reset_counters();

    let second = boot.run().unwrap();

    assert_eq!(second.cert_store.as_bytes(), &first_bytes[..]);
    assert_eq!(boot.store().flash().program_ops, 0, "no flash programs on warm boot");
    assert_eq!(boot.store().flash().erase_ops, 0, "no flash erases on warm boot");
}

// =============================================================================
// E3: agent update rotates the compound identity
// =============================================================================

#[test]
fn e3_new_agent_version_refreshes_cache_and_compound_key() {
    let agent_v1 = AgentImage::new("agent", (1, 0), 1_000, 0xA1);
    let mut boot = fresh_device(&agent_v1);
    let first = boot.run().unwrap();
    let first_alias = first.cert_store.pem(CertStoreSlot::Loader).unwrap().to_vec();

    // DFU update: new code, higher version and issuance.
    let agent_v2 = AgentImage::new("agent", (2, 0), 2_000, 0xB2);
    let mut boot = reboot(boot, RollbackPolicy::ReportOnly);
    agent_v2.install(boot.store_mut().flash_mut());

    let second = boot.run().unwrap();

    let cache = boot.store().load_cache().unwrap();
    assert_eq!(cache.last_version, AgentVersion::new(2, 0));
    assert_eq!(cache.last_issued, IssueTime(2_000));

    assert_ne!(
        second.compound_id.public, first.compound_id.public,
        "compound key must rotate with the agent digest"
    );
    assert_ne!(
        second.cert_store.pem(CertStoreSlot::Loader).unwrap(),
        &first_alias[..],
    );
    // The device certificate is untouched.
    assert_eq!(
        second.cert_store.pem(CertStoreSlot::Device),
        first.cert_store.pem(CertStoreSlot::Device),
    );
}

// =============================================================================
// E4: digest mismatch aborts before assembly
// =============================================================================

#[test]
fn e4_digest_mismatch_aborts_boot() {
    let agent = AgentImage::new("agent", (1, 0), 1_000, 0xA1);
    let mut boot = fresh_device(&agent);
    boot.run().unwrap();

    let mut tampered = AgentImage::new("agent", (1, 1), 1_100, 0xC3);
    tampered.break_digest = true;
    let mut boot = reboot(boot, RollbackPolicy::ReportOnly);
    tampered.install(boot.store_mut().flash_mut());

    assert_eq!(boot.run().map(|_| ()), Err(Error::AgentDigestMismatch));
    assert!(log_contains(&boot, LogLevel::Error, "digest mismatch"));

    // The tampered agent never reached the cache.
    let cache = boot.store().load_cache().unwrap();
    assert_eq!(cache.last_version, AgentVersion::new(1, 0));
}

// =============================================================================
// E5/E6: authenticated boot
// =============================================================================

fn arm_authenticated_boot(boot: &mut TestBoot, author_pub: &EccPublicKey) {
    let mut issued = boot.store().load_issued_certs().unwrap();
    issued.flags |= ISSUED_FLAG_PROVISIONED | ISSUED_FLAG_AUTHENTICATED_BOOT;
    issued.code_auth_pub = *author_pub;
    boot.store_mut().store_issued_certs(&issued).unwrap();
}

#[test]
fn e5_valid_author_signature_is_accepted() {
    let (author_pub, author_priv) = derive_ecc_key(b"author key seed", b"Identity").unwrap();

    let agent = AgentImage::new("agent", (1, 0), 1_000, 0xA1);
    let mut boot = fresh_device(&agent);
    boot.run().unwrap();

    arm_authenticated_boot(&mut boot, &author_pub);

    let mut signed = AgentImage::new("agent", (1, 1), 1_100, 0xD4);
    signed.author = Some(author_priv);
    let mut boot = reboot(boot, RollbackPolicy::ReportOnly);
    signed.install(boot.store_mut().flash_mut());

    let artifacts = boot.run().unwrap();
    assert!(artifacts.cert_store.pem(CertStoreSlot::Loader).is_some());
}

#[test]
fn e6_tampered_author_signature_aborts_boot() {
    let (author_pub, author_priv) = derive_ecc_key(b"author key seed", b"Identity").unwrap();

    let agent = AgentImage::new("agent", (1, 0), 1_000, 0xA1);
    let mut boot = fresh_device(&agent);
    boot.run().unwrap();

    arm_authenticated_boot(&mut boot, &author_pub);

    let mut tampered = AgentImage::new("agent", (1, 1), 1_100, 0xD4);
    tampered.author = Some(author_priv);
    tampered.break_signature = true;
    let mut boot = reboot(boot, RollbackPolicy::ReportOnly);
    tampered.install(boot.store_mut().flash_mut());

    assert_eq!(boot.run().map(|_| ()), Err(Error::AgentSignatureInvalid));
    assert!(log_contains(&boot, LogLevel::Error, "signature invalid"));
}

// =============================================================================
// E7: rollback policy
// =============================================================================

#[test]
fn e7_rollback_is_reported_and_boot_proceeds_by_default() {
    let agent_v2 = AgentImage::new("agent", (1, 5), 5_000, 0xA1);
    let mut boot = fresh_device(&agent_v2);
    boot.run().unwrap();

    // Older version, older issuance, different code.
    let agent_v1 = AgentImage::new("agent", (1, 4), 4_000, 0xB2);
    let mut boot = reboot(boot, RollbackPolicy::ReportOnly);
    agent_v1.install(boot.store_mut().flash_mut());

    let artifacts = boot.run().expect("report-only policy must not abort");
    assert!(artifacts.cert_store.pem(CertStoreSlot::Loader).is_some());
    assert!(log_contains(&boot, LogLevel::Warn, "rollback detected: version 1.5 -> 1.4"));
    assert!(log_contains(&boot, LogLevel::Warn, "rollback detected: issuance"));

    // The downgraded agent still becomes the cached version.
    let cache = boot.store().load_cache().unwrap();
    assert_eq!(cache.last_version, AgentVersion::new(1, 4));
}

#[test]
fn e7_rollback_aborts_under_strict_policy() {
    let agent_v2 = AgentImage::new("agent", (1, 5), 5_000, 0xA1);
    let mut boot = fresh_device(&agent_v2);
    boot.run().unwrap();

    let agent_v1 = AgentImage::new("agent", (1, 4), 4_000, 0xB2);
    let mut boot = reboot(boot, RollbackPolicy::Abort);
    agent_v1.install(boot.store_mut().flash_mut());

    assert_eq!(boot.run().map(|_| ()), Err(Error::RollbackRejected));
}

#[test]
fn same_version_reissue_counts_as_rollback() {
    // Equal version and issuance with different code is suspicious and
    // reported, but tolerated under the default policy.
    let agent_a = AgentImage::new("agent", (1, 0), 1_000, 0xA1);
    let mut boot = fresh_device(&agent_a);
    boot.run().unwrap();

    let agent_b = AgentImage::new("agent", (1, 0), 1_000, 0xE5);
    let mut boot = reboot(boot, RollbackPolicy::ReportOnly);
    agent_b.install(boot.store_mut().flash_mut());

    boot.run().unwrap();
    assert!(log_contains(&boot, LogLevel::Warn, "rollback detected"));
}

// =============================================================================
// Invariants
// =============================================================================

#[test]
fn provisioning_is_idempotent_and_write_once() {
    let agent = AgentImage::new("agent", (1, 0), 1_000, 0xA1);
    let mut boot = fresh_device(&agent);
    boot.run().unwrap();

    let device_id_before = boot.store().load_device_id().unwrap();

    // A second provisioning pass must not touch the identity.
    let mut boot = reboot(boot, RollbackPolicy::ReportOnly);
    boot.run().unwrap();
    let device_id_after = boot.store().load_device_id().unwrap();

    assert_eq!(device_id_before.public, device_id_after.public);
    assert_eq!(
        device_id_before.private.as_bytes(),
        device_id_after.private.as_bytes()
    );

    // Direct overwrite is refused.
    let image = bnc_boot::regions::DeviceIdImage {
        magic: BARNACLE_MAGIC,
        public: device_id_after.public,
        private: EccPrivateKey::from_bytes(*device_id_after.private.as_bytes()),
    };
    assert_eq!(
        boot.store_mut().store_device_id(&image),
        Err(Error::AlreadyProvisioned)
    );
}

#[test]
fn failed_boot_exposes_no_chain() {
    // Unprovisionable agent on a blank device: header magic wrong.
    let mut flash = Flash::new();
    flash.init().unwrap();
    // Leave the agent area erased entirely.
    let mut boot = boot_with(flash, RollbackPolicy::ReportOnly);

    let err = boot.run().map(|_| ()).unwrap_err();
    assert_eq!(err, Error::AgentHeaderInvalid);
    assert!(err.is_security_error());
}

#[test]
fn firewall_is_armed_after_successful_boot() {
    let agent = AgentImage::new("agent", (1, 0), 1_000, 0xA1);
    let mut boot = fresh_device(&agent);
    boot.run().unwrap();

    let (_, _, firewall) = boot.into_parts();
    use bnc_hal::FirewallInterface;
    assert!(firewall.is_enabled());
    let config = firewall.config.unwrap();
    assert_eq!(config.nv_data_start, LAYOUT.device_id.base);
    assert_eq!(config.nv_data_len, LAYOUT.cache.end() - LAYOUT.device_id.base);
}

#[test]
fn dfu_descriptor_reflects_write_lock() {
    use bnc_common::constants::ISSUED_FLAG_WRITELOCK;

    let unlocked = bnc_boot::dfu::descriptor(&LAYOUT, 0);
    assert_eq!(unlocked.as_str(), "@Barnacle /0x08000000/02*004Kf,01*04Kg");

    let locked = bnc_boot::dfu::descriptor(&LAYOUT, ISSUED_FLAG_WRITELOCK);
    assert_eq!(locked.as_str(), "@Barnacle /0x08000000/02*004Kf,01*04Ka");
}
