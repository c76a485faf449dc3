/*
 * Copyright (c) Huawei Technologies Co., Ltd. 2025. All rights reserved.
 * Global Trust Authority is licensed under the Mulan PSL v2.
 * You can use this software according to the terms and conditions of the Mulan PSL v2.
 * You may obtain a copy of Mulan PSL v2 at:
 *     http://license.coscl.org.cn/MulanPSL2
 * THIS SOFTWARE IS PROVIDED ON AN "AS IS" BASIS, WITHOUT WARRANTIES OF ANY KIND, EITHER EXPRESS OR
 * IMPLIED, INCLUDING BUT NOT LIMITED TO NON-INFRINGEMENT, MERCHANTABILITY OR FIT FOR A PARTICULAR
 * PURPOSE.
 * See the Mulan PSL v2 for more details.
 */

//! The per-exchange attestation session: protocol capabilities, algorithm
//! selection, Diffie-Hellman key agreement and nonces, the secret
//! assessment value, AIK handling, the PCR set, and the Quote plane on
//! both sides of the exchange.

use std::fs;
use std::path::Path;

use bitflags::bitflags;
use log::{debug, trace, warn};
use zeroize::Zeroizing;

use crate::algorithm::{DhGroup, MeasAlgorithm};
use crate::crypto::{self, AikKey, DhExchange};
use crate::error::PtsError;
use crate::measure::{self, FileMeasurements, FileMetadata, PathStatus};
use crate::pcr::{PcrSet, PCR_LEN};
use crate::platform;
use crate::structure::{self, TpmVersionInfo};
use crate::tss::{QuoteKind, QuoteRequest, Tss};

bitflags! {
    /// Protocol capability flags advertised by an endpoint
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ProtoCaps: u8 {
        const C = 1 << 0;
        const V = 1 << 1;
        const D = 1 << 2;
        const T = 1 << 3;
        const X = 1 << 4;
    }
}

/// Side of the attestation exchange a session runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// The platform being attested
    Measurer,
    /// The peer challenging it
    Verifier,
}

/// State of one attestation exchange.
///
/// A session is a sequentially accessed state container; its methods are
/// not safe under concurrent mutation. Independent sessions may run in
/// parallel. Dropping the session zeroises the nonces, the derived secret
/// and the AIK blob.
pub struct PtsSession {
    role: Role,
    proto_caps: ProtoCaps,
    meas_algorithm: MeasAlgorithm,
    dh_hash_algorithm: MeasAlgorithm,
    dh: Option<DhExchange>,
    initiator_nonce: Zeroizing<Vec<u8>>,
    responder_nonce: Zeroizing<Vec<u8>>,
    secret: Zeroizing<Vec<u8>>,
    platform_info: Option<String>,
    has_tpm: bool,
    tpm_version_info: Option<Vec<u8>>,
    aik: Option<AikKey>,
    aik_blob: Option<Zeroizing<Vec<u8>>>,
    pcr_set: PcrSet,
    tss: Option<Box<dyn Tss>>,
}

impl PtsSession {
    /// Create an empty session for the given role.
    ///
    /// Both sides start out advertising verification; the verifier also
    /// advertises the TPM-backed capabilities up front.
    pub fn new(role: Role) -> Self {
        let mut proto_caps = ProtoCaps::V;
        if role == Role::Verifier {
            proto_caps |= ProtoCaps::T | ProtoCaps::D;
        }
        Self {
            role,
            proto_caps,
            meas_algorithm: MeasAlgorithm::Sha256,
            dh_hash_algorithm: MeasAlgorithm::Sha256,
            dh: None,
            initiator_nonce: Zeroizing::new(Vec::new()),
            responder_nonce: Zeroizing::new(Vec::new()),
            secret: Zeroizing::new(Vec::new()),
            platform_info: None,
            has_tpm: false,
            tpm_version_info: None,
            aik: None,
            aik_blob: None,
            pcr_set: PcrSet::new(),
            tss: None,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn get_proto_caps(&self) -> ProtoCaps {
        self.proto_caps
    }

    pub fn set_proto_caps(&mut self, flags: ProtoCaps) {
        self.proto_caps = flags;
        debug!("supported PTS protocol capabilities: {}", caps_string(flags));
    }

    pub fn get_meas_algorithm(&self) -> MeasAlgorithm {
        self.meas_algorithm
    }

    pub fn set_meas_algorithm(&mut self, algorithm: MeasAlgorithm) {
        debug!("selected PTS measurement algorithm is {}", algorithm);
        self.meas_algorithm = algorithm;
    }

    pub fn get_dh_hash_algorithm(&self) -> MeasAlgorithm {
        self.dh_hash_algorithm
    }

    pub fn set_dh_hash_algorithm(&mut self, algorithm: MeasAlgorithm) {
        debug!("selected DH hash algorithm is {}", algorithm);
        self.dh_hash_algorithm = algorithm;
    }

    /// Probe the TPM through the given TSS and adopt it when usable.
    ///
    /// A successful version-info query marks the TPM as present, stores
    /// the capability blob, fixes the register width and adds the
    /// TPM-backed capability flags. Returns whether the TPM is usable.
    pub fn attach_tss(&mut self, tss: Box<dyn Tss>) -> bool {
        match tss.version_info() {
            Ok(info) => {
                log_version_info(&info);
                self.tpm_version_info = Some(info);
                self.has_tpm = true;
                self.proto_caps |= ProtoCaps::T | ProtoCaps::D;
                self.tss = Some(tss);
                true
            }
            Err(e) => {
                warn!("{}", e);
                false
            }
        }
    }

    pub fn has_tpm(&self) -> bool {
        self.has_tpm
    }

    /// Width of the platform's PCR registers in bytes
    pub fn get_pcr_len(&self) -> usize {
        if self.pcr_set.pcr_len() != 0 {
            self.pcr_set.pcr_len()
        } else if self.has_tpm {
            PCR_LEN
        } else {
            0
        }
    }

    pub fn get_platform_info(&self) -> Option<&str> {
        self.platform_info.as_deref()
    }

    pub fn set_platform_info(&mut self, info: String) {
        self.platform_info = Some(info);
    }

    /// Derive the platform string from the local distribution release
    /// files. Failure is non-fatal; the session keeps an empty platform
    /// string.
    pub fn discover_platform_info(&mut self) -> Result<(), PtsError> {
        self.platform_info = Some(platform::extract_platform_info()?);
        Ok(())
    }

    pub fn get_tpm_version_info(&self) -> Result<&[u8], PtsError> {
        if !self.has_tpm {
            return Err(PtsError::MissingVersionInfo);
        }
        let info = self
            .tpm_version_info
            .as_deref()
            .ok_or(PtsError::MissingVersionInfo)?;
        log_version_info(info);
        Ok(info)
    }

    pub fn set_tpm_version_info(&mut self, info: Vec<u8>) {
        log_version_info(&info);
        self.tpm_version_info = Some(info);
    }

    pub fn get_aik(&self) -> Option<&AikKey> {
        self.aik.as_ref()
    }

    pub fn set_aik(&mut self, aik: AikKey) {
        self.aik = Some(aik);
    }

    /// Load the AIK from a certificate or a trusted public key file, the
    /// certificate having precedence over the public key when both are
    /// present
    pub fn load_aik(&mut self, cert_path: Option<&Path>, key_path: Option<&Path>) {
        if let Some(path) = cert_path {
            match AikKey::from_cert_file(path) {
                Ok(aik) => {
                    debug!("loaded AIK certificate from '{}'", path.display());
                    self.aik = Some(aik);
                    return;
                }
                Err(e) => debug!("{}", e),
            }
        }
        if let Some(path) = key_path {
            match AikKey::from_public_key_file(path) {
                Ok(aik) => {
                    debug!("loaded AIK public key from '{}'", path.display());
                    self.aik = Some(aik);
                    return;
                }
                Err(e) => debug!("{}", e),
            }
        }
        warn!("neither AIK certificate nor public key is available");
    }

    /// Load the TSS key blob needed to load the AIK, verbatim from a file
    pub fn load_aik_blob(&mut self, path: &Path) -> Result<(), PtsError> {
        let blob = fs::read(path).map_err(|e| PtsError::FileReadError {
            path: path.display().to_string(),
            source: e,
        })?;
        debug!("loaded AIK Blob from '{}'", path.display());
        trace!("AIK Blob: {}", hex::encode(&blob));
        self.aik_blob = Some(Zeroizing::new(blob));
        Ok(())
    }

    pub fn set_aik_blob(&mut self, blob: Vec<u8>) {
        self.aik_blob = Some(Zeroizing::new(blob));
    }

    /// SHA-1 key id of the AIK public key over its SubjectPublicKeyInfo
    pub fn get_aik_keyid(&self) -> Result<Vec<u8>, PtsError> {
        let aik = self.aik.as_ref().ok_or_else(|| {
            warn!("no AIK certificate available");
            PtsError::MissingAik
        })?;
        aik.keyid()
    }

    /// Create a fresh Diffie-Hellman exchange for the group and generate
    /// `nonce_len` strong random bytes into the role-appropriate nonce.
    /// The nonce length must be positive.
    pub fn create_dh_nonce(
        &mut self,
        group: DhGroup,
        nonce_len: usize,
    ) -> Result<(), PtsError> {
        debug!("selected PTS DH group is {}", group);
        self.dh = Some(DhExchange::new(group)?);

        debug!("nonce length is {}", nonce_len);
        let nonce = Zeroizing::new(crypto::nonce_bytes(nonce_len)?);
        match self.role {
            Role::Measurer => self.responder_nonce = nonce,
            Role::Verifier => self.initiator_nonce = nonce,
        }
        Ok(())
    }

    /// Own Diffie-Hellman public value and the local nonce
    pub fn my_public_value(&self) -> Result<(Vec<u8>, Vec<u8>), PtsError> {
        let dh = self.dh.as_ref().ok_or_else(no_dh)?;
        let nonce = match self.role {
            Role::Measurer => self.responder_nonce.to_vec(),
            Role::Verifier => self.initiator_nonce.to_vec(),
        };
        Ok((dh.my_public()?, nonce))
    }

    /// Store the peer's Diffie-Hellman public value and nonce
    pub fn set_peer_public_value(
        &mut self,
        value: &[u8],
        nonce: &[u8],
    ) -> Result<(), PtsError> {
        let dh = self.dh.as_mut().ok_or_else(no_dh)?;
        dh.set_peer_public(value)?;
        let nonce = Zeroizing::new(nonce.to_vec());
        match self.role {
            Role::Measurer => self.initiator_nonce = nonce,
            Role::Verifier => self.responder_nonce = nonce,
        }
        Ok(())
    }

    /// Derive the secret assessment value from both nonces and the shared
    /// Diffie-Hellman secret. The shared secret is zeroised right after
    /// use.
    pub fn calculate_secret(&mut self) -> Result<(), PtsError> {
        if self.initiator_nonce.is_empty() || self.responder_nonce.is_empty() {
            warn!("initiator and/or responder nonce is not available");
            return Err(PtsError::MissingNonce);
        }
        trace!("initiator nonce: {}", hex::encode(self.initiator_nonce.as_slice()));
        trace!("responder nonce: {}", hex::encode(self.responder_nonce.as_slice()));

        let dh = self.dh.as_ref().ok_or_else(no_dh)?;
        let shared_secret = Zeroizing::new(dh.shared_secret()?);

        self.secret = crypto::assessment_secret(
            self.dh_hash_algorithm,
            &self.initiator_nonce,
            &self.responder_nonce,
            &shared_secret,
        )?;
        trace!("secret assessment value: {}", hex::encode(self.secret.as_slice()));
        Ok(())
    }

    /// Validate a path ahead of a measurement request
    pub fn is_path_valid(&self, path: &Path) -> Result<PathStatus, PtsError> {
        measure::is_path_valid(path)
    }

    /// Stream-hash a single file with the session's measurement algorithm
    pub fn hash_file(&self, path: &Path) -> Result<Vec<u8>, PtsError> {
        measure::hash_file(self.meas_algorithm, path)
    }

    /// Measure a file or directory with the session's measurement
    /// algorithm
    pub fn measure(
        &self,
        request_id: u16,
        path: &Path,
        is_directory: bool,
    ) -> Result<FileMeasurements, PtsError> {
        measure::measure(self.meas_algorithm, request_id, path, is_directory)
    }

    /// Collect file metadata for a file or directory
    pub fn get_metadata(
        &self,
        path: &Path,
        is_directory: bool,
    ) -> Result<Vec<FileMetadata>, PtsError> {
        measure::metadata(path, is_directory)
    }

    pub fn pcr_set(&self) -> &PcrSet {
        &self.pcr_set
    }

    /// Mark a PCR register as selected
    pub fn select_pcr(&mut self, pcr_index: u32) -> Result<(), PtsError> {
        self.pcr_set.select(pcr_index)
    }

    /// Record the post-extension value of a PCR register
    pub fn add_pcr(
        &mut self,
        pcr_index: u32,
        pcr_before: &[u8],
        pcr_after: &[u8],
    ) -> Result<(), PtsError> {
        self.pcr_set.add(pcr_index, pcr_before, pcr_after)
    }

    /// Read the current value of a PCR register through the TSS
    pub fn read_pcr(&self, pcr_index: u32) -> Result<Vec<u8>, PtsError> {
        let tss = self.tss.as_ref().ok_or(PtsError::TpmUnavailable(0))?;
        let value = tss.read_pcr(pcr_index)?;
        trace!("PCR {} value: {}", pcr_index, hex::encode(&value));
        Ok(value)
    }

    /// Extend a PCR register by a 20-byte input through the TSS and return
    /// the resulting register value
    pub fn extend_pcr(&self, pcr_index: u32, input: &[u8]) -> Result<Vec<u8>, PtsError> {
        if input.len() != PCR_LEN {
            return Err(PtsError::PcrLengthMismatch {
                expected: PCR_LEN,
                actual: input.len(),
            });
        }
        let tss = self.tss.as_ref().ok_or(PtsError::TpmUnavailable(0))?;
        let value = tss.extend_pcr(pcr_index, input)?;
        trace!("PCR {} extended with:      {}", pcr_index, hex::encode(input));
        trace!("PCR {} value after extend: {}", pcr_index, hex::encode(&value));
        Ok(value)
    }

    /// Ask the TPM for a Quote or Quote2 over the selected PCR registers,
    /// bound to the secret assessment value.
    ///
    /// Returns the SHA-1 PCR composite hash extracted from the signed
    /// quote info and the signature verbatim. The PCR set is cleared on
    /// every path.
    pub fn quote_tpm(&mut self, kind: QuoteKind) -> Result<(Vec<u8>, Vec<u8>), PtsError> {
        let result = self.quote_tpm_inner(kind);
        self.pcr_set.clear();
        result
    }

    fn quote_tpm_inner(&self, kind: QuoteKind) -> Result<(Vec<u8>, Vec<u8>), PtsError> {
        if self.pcr_set.count() == 0 {
            warn!("no extended PCR entries available, unable to quote");
            return Err(PtsError::NoPcrSelected);
        }
        if self.secret.is_empty() {
            warn!("secret assessment value unavailable, unable to quote");
            return Err(PtsError::MissingSecret);
        }
        let aik_blob = self.aik_blob.as_ref().ok_or_else(|| {
            warn!("AIK Blob is not available");
            PtsError::MissingAik
        })?;
        let tss = self.tss.as_ref().ok_or(PtsError::TpmUnavailable(0))?;

        let request = QuoteRequest {
            kind,
            pcr_indices: self.pcr_set.selected_indices(),
            external_data: self.secret.to_vec(),
            aik_blob: aik_blob.to_vec(),
        };
        let response = tss.quote(&request)?;

        let composite_hash = structure::composite_hash_from_quote(kind, &response.quote_info)?;
        trace!("hash of PCR Composite: {}", hex::encode(composite_hash));
        trace!("TPM Quote Info: {}", hex::encode(&response.quote_info));
        trace!("TPM Quote Signature: {}", hex::encode(&response.signature));

        Ok((composite_hash.to_vec(), response.signature))
    }

    /// Construct the PCR Composite and the quote info structure the TPM
    /// would sign, so both sides can agree on the signed bytes.
    ///
    /// The first output is the composite hashed with `comp_hash_algo`, or
    /// the raw composite when no algorithm is given. The PCR set is
    /// cleared on every path.
    pub fn get_quote_info(
        &mut self,
        kind: QuoteKind,
        use_version_info: bool,
        comp_hash_algo: Option<MeasAlgorithm>,
    ) -> Result<(Vec<u8>, Vec<u8>), PtsError> {
        let result = self.get_quote_info_inner(kind, use_version_info, comp_hash_algo);
        self.pcr_set.clear();
        result
    }

    fn get_quote_info_inner(
        &self,
        kind: QuoteKind,
        use_version_info: bool,
        comp_hash_algo: Option<MeasAlgorithm>,
    ) -> Result<(Vec<u8>, Vec<u8>), PtsError> {
        if self.pcr_set.count() == 0 {
            warn!("no extended PCR entries available, unable to construct TPM Quote Info");
            return Err(PtsError::NoPcrSelected);
        }
        if self.secret.is_empty() {
            warn!("secret assessment value unavailable, unable to construct TPM Quote Info");
            return Err(PtsError::MissingSecret);
        }
        let version_info = if kind == QuoteKind::Quote2 && use_version_info {
            match self.tpm_version_info.as_deref() {
                Some(info) => Some(info),
                None => {
                    warn!("TPM version information unavailable, unable to construct TPM Quote Info2");
                    return Err(PtsError::MissingVersionInfo);
                }
            }
        } else {
            None
        };

        let pcr_comp = self.pcr_set.compose();
        trace!("constructed PCR Composite: {}", hex::encode(&pcr_comp));

        let out_pcr_comp = match comp_hash_algo {
            Some(algorithm) => crypto::digest(algorithm, &pcr_comp)?,
            None => pcr_comp.clone(),
        };

        let composite_hash = crypto::digest(MeasAlgorithm::Sha1, &pcr_comp)?;

        let quote_info = match kind {
            QuoteKind::Quote => structure::build_quote_info(&composite_hash, &self.secret),
            QuoteKind::Quote2 => structure::build_quote_info2(
                &self.secret,
                self.pcr_set.select_bytes(),
                &composite_hash,
                version_info,
            ),
        };
        trace!("constructed TPM Quote Info: {}", hex::encode(&quote_info));

        Ok((out_pcr_comp, quote_info))
    }

    /// Verify a quote signature with the AIK public key under RSA PKCS#1
    /// v1.5 with SHA-1. Any adapter failure returns false.
    pub fn verify_quote_signature(&self, data: &[u8], signature: &[u8]) -> bool {
        let aik = match &self.aik {
            Some(aik) => aik,
            None => {
                warn!("no AIK certificate available");
                return false;
            }
        };
        let verified = aik.verify(data, signature);
        if !verified {
            warn!("signature verification failed for TPM Quote Info");
        }
        verified
    }
}

fn no_dh() -> PtsError {
    PtsError::KeyAgreementFailed("no Diffie-Hellman exchange created".to_string())
}

fn caps_string(caps: ProtoCaps) -> String {
    let flag = |bit, letter| if caps.contains(bit) { letter } else { "." };
    format!(
        "{}{}{}{}{}",
        flag(ProtoCaps::C, "C"),
        flag(ProtoCaps::V, "V"),
        flag(ProtoCaps::D, "D"),
        flag(ProtoCaps::T, "T"),
        flag(ProtoCaps::X, "X"),
    )
}

fn log_version_info(info: &[u8]) {
    match TpmVersionInfo::parse(info) {
        Ok(parsed) => debug!("{}", parsed),
        Err(e) => warn!("could not parse tpm version info: {}", e),
    }
}
