// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Barnacle Systems Inc.

//! First-boot identity provisioning
//!
//! Runs when the device identity region carries no magic: draws a CDI
//! from the hardware RNG, derives the device key pair, persists it, and
//! issues a self-signed device certificate into the issued-certs region
//! unless the factory already placed one there.
//!
//! Both writes go through the erase-then-program store, so a failure
//! leaves the affected region unprovisioned and the next boot simply
//! provisions again.

use bnc_common::constants::{BARNACLE_MAGIC, LABEL_IDENTITY, LABEL_SERIAL, SERIAL_NUM_LEN};
use bnc_common::log::LogBuffer;
use bnc_common::{log_error, log_info, Error};
use bnc_crypto::ecc::{derive_ecc_key, sign_digest};
use bnc_crypto::hash::sha256;
use bnc_crypto::kdf::kdf_sha256;
use bnc_crypto::{EccPublicKey, SecureBuffer};
use bnc_der::{der_to_pem, DerBuilder, PemLabel, DER_MAX_TBS};
use bnc_hal::{FlashInterface, RngInterface};
use bnc_x509::{device_cert_tbs, make_device_cert, X501Name, X509TbsData};

use crate::regions::{DeviceIdImage, IssuedCertsImage, IssuedSlot, ALIAS_CERT_PEM_CAPACITY};
use crate::store::PersistentStore;

const MODULE: &str = "provision";

/// Device certificate subject/issuer common name
pub(crate) const DEVICE_COMMON_NAME: &str = "Barnacle Device";
/// Certificate organization name
pub(crate) const ORG_NAME: &str = "Barnacle Systems";
/// Certificate country name
pub(crate) const COUNTRY_NAME: &str = "US";
/// Certificate validity start
pub(crate) const VALID_FROM: &str = "170101000000Z";
/// Certificate validity end
pub(crate) const VALID_TO: &str = "370101000000Z";

/// The X.501 name used for the device identity
pub(crate) const fn device_name() -> X501Name<'static> {
    X501Name {
        common: DEVICE_COMMON_NAME,
        org: Some(ORG_NAME),
        country: Some(COUNTRY_NAME),
    }
}

/// Derive a certificate serial number from a public key
///
/// The first byte is forced into `[0x01, 0x7F]` so the DER integer is
/// positive and nonzero.
pub(crate) fn derive_serial(public: &EccPublicKey) -> Result<[u8; SERIAL_NUM_LEN], Error> {
    let mut digest = [0u8; 32];
    kdf_sha256(&mut digest, &public.to_sec1_bytes(), &[], LABEL_SERIAL)
        .map_err(Error::from)?;

    digest[0] &= 0x7F;
    digest[0] |= 0x01;

    let mut serial = [0u8; SERIAL_NUM_LEN];
    serial.copy_from_slice(&digest[..SERIAL_NUM_LEN]);
    Ok(serial)
}

/// Provision the device identity and certificates if missing
///
/// Idempotent: a provisioned device returns without touching flash.
pub fn provision<F: FlashInterface, R: RngInterface>(
    store: &mut PersistentStore<F>,
    rng: &mut R,
    log: &mut LogBuffer,
) -> Result<(), Error> {
    let mut generate_certs = false;

    let mut device_id = store.load_device_id()?;
    if !device_id.is_provisioned() {
        let mut cdi = SecureBuffer::<32>::new();
        if let Err(e) = rng.fill_bytes(cdi.as_mut_slice()) {
            let e = Error::from(e);
            log_error!(log, MODULE, "CDI generation failed: {e}");
            return Err(e);
        }

        let (public, private) = match derive_ecc_key(cdi.as_slice(), LABEL_IDENTITY) {
            Ok(pair) => pair,
            Err(e) => {
                let e = Error::from(e);
                log_error!(log, MODULE, "device key derivation failed: {e}");
                return Err(e);
            }
        };

        device_id = DeviceIdImage { magic: BARNACLE_MAGIC, public, private };
        if let Err(e) = store.store_device_id(&device_id) {
            log_error!(log, MODULE, "device identity write failed: {e}");
            return Err(e);
        }

        log_info!(log, MODULE, "device identity provisioned");
        generate_certs = true;
    }

    let issued = store.load_issued_certs()?;
    if generate_certs || !issued.is_provisioned() {
        let mut image = IssuedCertsImage::new_blank();
        image.magic = BARNACLE_MAGIC;

        if let Err(e) = issue_device_cert(&device_id, &mut image) {
            log_error!(log, MODULE, "device certificate issuance failed: {e}");
            return Err(e);
        }

        if let Err(e) = store.store_issued_certs(&image) {
            log_error!(log, MODULE, "issued-certs write failed: {e}");
            return Err(e);
        }

        log_info!(log, MODULE, "self-signed device certificate issued");
    }

    Ok(())
}

/// Build the self-signed device certificate into the issued-certs image
fn issue_device_cert(
    device_id: &DeviceIdImage,
    image: &mut IssuedCertsImage,
) -> Result<(), Error> {
    let tbs_data = X509TbsData {
        serial: derive_serial(&device_id.public)?,
        issuer: device_name(),
        valid_from: VALID_FROM,
        valid_to: VALID_TO,
        subject: device_name(),
    };

    let mut der_buf = [0u8; DER_MAX_TBS];
    let mut der = DerBuilder::new(&mut der_buf);
    device_cert_tbs(&mut der, &tbs_data, &device_id.public, Some(&device_id.public))?;

    let digest = sha256(der.as_bytes());
    let sig = sign_digest(&digest, &device_id.private).map_err(Error::from)?;
    make_device_cert(&mut der, &sig)?;

    let mut pem = [0u8; ALIAS_CERT_PEM_CAPACITY];
    let pem_len = der_to_pem(der.as_bytes(), PemLabel::Certificate, &mut pem)?;
    image.append_cert(IssuedSlot::Device, &pem[..pem_len])
}
