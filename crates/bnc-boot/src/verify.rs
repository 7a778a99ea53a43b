// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Barnacle Systems Inc.

//! Per-boot agent verification
//!
//! The attestation state machine:
//!
//! ```text
//! Start -> Measure -> CheckDigest -> MaybeAuth -> Compound
//!                                                   |  cache hit
//!                                  RefreshCache <---+---> Assemble -> Done
//!                                        \________________/
//! ```
//!
//! Any guard failure moves to `Failed` and no certificate store is
//! produced. The cache path keeps warm boots free of flash writes: the
//! compound key and alias certificate are rebuilt only when the measured
//! agent header digest changes.

use bnc_common::constants::{
    BARNACLE_MAGIC, ISSUED_FLAG_AUTHENTICATED_BOOT, ISSUED_FLAG_PROVISIONED, LABEL_IDENTITY,
};
use bnc_common::log::LogBuffer;
use bnc_common::{log_error, log_info, log_warn, Error};
use bnc_crypto::ecc::{derive_ecc_key, sign_digest, verify_digest};
use bnc_crypto::hash::sha256;
use bnc_crypto::traits::{constant_time_eq, Hash};
use bnc_crypto::Sha256;
use bnc_der::{der_to_pem, DerBuilder, PemLabel, DER_MAX_TBS};
use bnc_hal::FlashInterface;
use bnc_x509::{alias_cert_tbs, make_alias_cert, X501Name, X509TbsData};

use crate::certstore::{CertStore, CertStoreSlot, CompoundId};
use crate::header::{AgentHeader, AGENT_HDR_SIGNED_LEN, AGENT_HDR_WIRE_SIZE};
use crate::provision::{derive_serial, device_name, VALID_FROM, VALID_TO};
use crate::regions::{CacheImage, IssuedCertsImage, IssuedSlot, ALIAS_CERT_PEM_CAPACITY};
use crate::store::PersistentStore;

const MODULE: &str = "verify";

/// Chunk size for measuring agent code out of flash
const MEASURE_CHUNK: usize = 256;

/// What to do when a rollback is detected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RollbackPolicy {
    /// Log the event and continue booting (matches fielded behavior)
    #[default]
    ReportOnly,
    /// Fail the boot
    Abort,
}

/// RAM artifacts of a successful verification
pub struct BootArtifacts {
    /// This boot's compound identity
    pub compound_id: CompoundId,
    /// The agent-visible certificate chain
    pub cert_store: CertStore,
}

/// Verifier state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyState {
    /// Sniffing the agent header
    Start,
    /// Measuring the agent code
    Measure,
    /// Comparing the measurement against the header
    CheckDigest,
    /// Enforcing the author signature when authenticated boot is armed
    MaybeAuth,
    /// Deciding between the cache path and a refresh
    Compound,
    /// Deriving the compound key and issuing the alias certificate
    RefreshCache,
    /// Building the RAM certificate store and compound identity
    Assemble,
    /// Verification complete
    Done,
    /// Verification failed
    Failed(Error),
}

/// Per-boot agent verifier
pub struct AgentVerifier<'a, F: FlashInterface> {
    store: &'a mut PersistentStore<F>,
    log: &'a mut LogBuffer,
    policy: RollbackPolicy,
    state: VerifyState,
    header: Option<AgentHeader>,
    code_digest: [u8; 32],
    header_digest: [u8; 32],
    issued: Option<IssuedCertsImage>,
    cache: Option<CacheImage>,
    artifacts: Option<BootArtifacts>,
}

impl<'a, F: FlashInterface> AgentVerifier<'a, F> {
    /// Create a verifier in the `Start` state
    pub fn new(
        store: &'a mut PersistentStore<F>,
        log: &'a mut LogBuffer,
        policy: RollbackPolicy,
    ) -> Self {
        Self {
            store,
            log,
            policy,
            state: VerifyState::Start,
            header: None,
            code_digest: [0u8; 32],
            header_digest: [0u8; 32],
            issued: None,
            cache: None,
            artifacts: None,
        }
    }

    /// Current state
    #[must_use]
    pub const fn state(&self) -> VerifyState {
        self.state
    }

    /// Advance one state; returns `true` once terminal
    pub fn step(&mut self) -> bool {
        let result = match self.state {
            VerifyState::Start => self.on_start(),
            VerifyState::Measure => self.on_measure(),
            VerifyState::CheckDigest => self.on_check_digest(),
            VerifyState::MaybeAuth => self.on_maybe_auth(),
            VerifyState::Compound => self.on_compound(),
            VerifyState::RefreshCache => self.on_refresh_cache(),
            VerifyState::Assemble => self.on_assemble(),
            VerifyState::Done | VerifyState::Failed(_) => return true,
        };

        self.state = match result {
            Ok(next) => next,
            Err(e) => VerifyState::Failed(e),
        };
        matches!(self.state, VerifyState::Done | VerifyState::Failed(_))
    }

    /// Run to completion and hand back the RAM artifacts
    pub fn run(mut self) -> Result<BootArtifacts, Error> {
        while !self.step() {}

        match self.state {
            VerifyState::Done => self.artifacts.take().ok_or(Error::InternalError),
            VerifyState::Failed(e) => Err(e),
            _ => Err(Error::InternalError),
        }
    }

    fn on_start(&mut self) -> Result<VerifyState, Error> {
        let mut raw = [0u8; AGENT_HDR_WIRE_SIZE];
        self.store
            .read_region(self.store.layout().agent_hdr, 0, &mut raw)?;

        let header = AgentHeader::parse(&raw)?;
        if let Err(e) = header.validate() {
            log_error!(self.log, MODULE, "invalid agent present: {e}");
            return Err(e);
        }

        self.header = Some(header);
        Ok(VerifyState::Measure)
    }

    fn on_measure(&mut self) -> Result<VerifyState, Error> {
        let layout = *self.store.layout();
        let header = self.header.as_ref().ok_or(Error::InternalError)?;

        // The agent code must start exactly where the header says the
        // header ends.
        if layout.agent_hdr.base + header.size != layout.agent_code.base {
            log_error!(self.log, MODULE, "unexpected agent start address");
            return Err(Error::AgentStartMismatch);
        }
        if header.agent_size > layout.agent_code.len {
            log_error!(self.log, MODULE, "agent size exceeds code region");
            return Err(Error::AgentHeaderInvalid);
        }

        let agent_size = header.agent_size as usize;
        let mut hasher = <Sha256 as Hash>::new();
        let mut chunk = [0u8; MEASURE_CHUNK];
        let mut offset = 0usize;
        while offset < agent_size {
            let take = (agent_size - offset).min(MEASURE_CHUNK);
            self.store
                .read_region(layout.agent_code, offset as u32, &mut chunk[..take])?;
            hasher.update(&chunk[..take]);
            offset += take;
        }
        self.code_digest = hasher.finalize().into_bytes();

        Ok(VerifyState::CheckDigest)
    }

    fn on_check_digest(&mut self) -> Result<VerifyState, Error> {
        let digest_ok = {
            let header = self.header.as_ref().ok_or(Error::InternalError)?;
            constant_time_eq(&self.code_digest, &header.digest)
        };
        if !digest_ok {
            log_error!(self.log, MODULE, "agent digest mismatch");
            return Err(Error::AgentDigestMismatch);
        }

        // Digest of the signed header region, input to both the author
        // signature check and compound key derivation.
        let mut signed = [0u8; AGENT_HDR_SIGNED_LEN];
        self.store
            .read_region(self.store.layout().agent_hdr, 0, &mut signed)?;
        self.header_digest = sha256(&signed);

        Ok(VerifyState::MaybeAuth)
    }

    fn on_maybe_auth(&mut self) -> Result<VerifyState, Error> {
        let issued = self.store.load_issued_certs()?;

        let armed = issued.flags & ISSUED_FLAG_PROVISIONED != 0
            && issued.flags & ISSUED_FLAG_AUTHENTICATED_BOOT != 0
            && issued.has_code_auth_key();

        if armed {
            let header = self.header.as_ref().ok_or(Error::InternalError)?;
            if verify_digest(&self.header_digest, &header.signature, &issued.code_auth_pub)
                .is_err()
            {
                log_error!(self.log, MODULE, "agent author signature invalid");
                return Err(Error::AgentSignatureInvalid);
            }
        }

        self.issued = Some(issued);
        Ok(VerifyState::Compound)
    }

    fn on_compound(&mut self) -> Result<VerifyState, Error> {
        let cache = self.store.load_cache()?;

        let cache_hit = cache.is_provisioned()
            && constant_time_eq(&self.header_digest, &cache.agent_hdr_digest);
        if cache_hit {
            self.cache = Some(cache);
            return Ok(VerifyState::Assemble);
        }

        // First launch of this agent version. If a previous version was
        // cached, check it for rollback before reissuing.
        if cache.is_provisioned() {
            let header = self.header.as_ref().ok_or(Error::InternalError)?;

            if cache.last_version >= header.agent_version {
                log_warn!(
                    self.log,
                    MODULE,
                    "rollback detected: version {} -> {}",
                    cache.last_version,
                    header.agent_version
                );
                if self.policy == RollbackPolicy::Abort {
                    return Err(Error::RollbackRejected);
                }
            }
            if cache.last_issued >= header.issued {
                log_warn!(
                    self.log,
                    MODULE,
                    "rollback detected: issuance {} -> {}",
                    cache.last_issued,
                    header.issued
                );
                if self.policy == RollbackPolicy::Abort {
                    return Err(Error::RollbackRejected);
                }
            }
        }

        Ok(VerifyState::RefreshCache)
    }

    fn on_refresh_cache(&mut self) -> Result<VerifyState, Error> {
        let device_id = self.store.load_device_id()?;
        if !device_id.is_provisioned() {
            log_error!(self.log, MODULE, "device identity missing");
            return Err(Error::NotProvisioned);
        }

        let header = self.header.as_ref().ok_or(Error::InternalError)?;

        let (compound_public, compound_private) =
            match derive_ecc_key(&self.header_digest, LABEL_IDENTITY) {
                Ok(pair) => pair,
                Err(e) => {
                    let e = Error::from(e);
                    log_error!(self.log, MODULE, "compound key derivation failed: {e}");
                    return Err(e);
                }
            };

        let tbs_data = X509TbsData {
            serial: derive_serial(&compound_public)?,
            issuer: device_name(),
            valid_from: VALID_FROM,
            valid_to: VALID_TO,
            subject: X501Name::common_only(header.name_str().unwrap_or("*")),
        };

        let mut der_buf = [0u8; DER_MAX_TBS];
        let mut der = DerBuilder::new(&mut der_buf);
        alias_cert_tbs(
            &mut der,
            &tbs_data,
            &compound_public,
            &device_id.public,
            &header.digest,
        )?;

        let tbs_digest = sha256(der.as_bytes());
        let sig = match sign_digest(&tbs_digest, &device_id.private) {
            Ok(sig) => sig,
            Err(e) => {
                let e = Error::from(e);
                log_error!(self.log, MODULE, "alias certificate signing failed: {e}");
                return Err(e);
            }
        };
        make_alias_cert(&mut der, &sig)?;

        let mut pem = [0u8; ALIAS_CERT_PEM_CAPACITY];
        let pem_len = der_to_pem(der.as_bytes(), PemLabel::Certificate, &mut pem)?;

        let mut image = CacheImage::new_blank();
        image.magic = BARNACLE_MAGIC;
        image.last_version = header.agent_version;
        image.last_issued = header.issued;
        image.agent_hdr_digest = self.header_digest;
        image.compound_public = compound_public;
        image.compound_private = compound_private;
        image.set_cert(&pem[..pem_len])?;

        if let Err(e) = self.store.store_cache(&image) {
            log_error!(self.log, MODULE, "cache write failed: {e}");
            return Err(e);
        }

        log_info!(
            self.log,
            MODULE,
            "alias certificate issued for version {}",
            image.last_version
        );
        self.cache = Some(image);
        Ok(VerifyState::Assemble)
    }

    fn on_assemble(&mut self) -> Result<VerifyState, Error> {
        let issued = self.issued.as_ref().ok_or(Error::InternalError)?;
        let cache = self.cache.as_ref().ok_or(Error::InternalError)?;

        let mut cert_store = CertStore::new();

        if issued.flags & ISSUED_FLAG_PROVISIONED != 0 {
            if let Some(pem) = issued.cert(IssuedSlot::Root) {
                if let Err(e) = cert_store.append(CertStoreSlot::Root, pem) {
                    log_error!(self.log, MODULE, "cert store overflow on root");
                    return Err(e);
                }
            }
        }

        let Some(device_pem) = issued.cert(IssuedSlot::Device) else {
            log_error!(self.log, MODULE, "device certificate missing");
            return Err(Error::StorageCorrupted);
        };
        if let Err(e) = cert_store.append(CertStoreSlot::Device, device_pem) {
            log_error!(self.log, MODULE, "cert store overflow on device");
            return Err(e);
        }

        if let Err(e) = cert_store.append(CertStoreSlot::Loader, cache.cert()) {
            log_error!(self.log, MODULE, "cert store overflow on alias");
            return Err(e);
        }

        self.artifacts = Some(BootArtifacts {
            compound_id: CompoundId {
                magic: BARNACLE_MAGIC,
                public: cache.compound_public,
                private: cache.compound_private.clone(),
            },
            cert_store,
        });

        Ok(VerifyState::Done)
    }
}
