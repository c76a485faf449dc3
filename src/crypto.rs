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

//! Crypto adapters consumed by the session: strong random nonces, hashing,
//! Diffie-Hellman key agreement and the Attestation Identity Key.

use std::fs;
use std::path::Path;

use log::{debug, warn};
use openssl::bn::{BigNum, BigNumContext};
use openssl::derive::Deriver;
use openssl::dh::Dh;
use openssl::ec::{EcGroup, EcKey, EcPoint, PointConversionForm};
use openssl::hash::{Hasher, MessageDigest};
use openssl::nid::Nid;
use openssl::pkey::{PKey, Private, Public};
use openssl::rand::rand_bytes;
use openssl::sign::Verifier;
use openssl::x509::X509;
use zeroize::Zeroizing;

use crate::algorithm::{DhGroup, MeasAlgorithm};
use crate::error::PtsError;

/// Length of the secret assessment value, fixed by the `externalData`
/// argument of the TPM Quote command
pub const ASSESSMENT_SECRET_LEN: usize = 20;

/// Fill a fresh buffer with `len` strong random bytes
pub fn nonce_bytes(len: usize) -> Result<Vec<u8>, PtsError> {
    let mut nonce = vec![0u8; len];
    rand_bytes(&mut nonce).map_err(|_| PtsError::NoRng)?;
    Ok(nonce)
}

/// One-shot digest of `data` under the given measurement algorithm
pub fn digest(algorithm: MeasAlgorithm, data: &[u8]) -> Result<Vec<u8>, PtsError> {
    let mut hasher = Hasher::new(algorithm.to_message_digest())
        .map_err(|_| PtsError::HasherUnavailable(algorithm.to_string()))?;
    hasher.update(data)?;
    Ok(hasher.finish()?.to_vec())
}

/// Derive the secret assessment value from the exchanged nonces and the
/// shared Diffie-Hellman secret:
/// `H("1" || initiator_nonce || responder_nonce || shared_secret)`,
/// truncated to 20 bytes to fit the TPM Quote `externalData` argument.
pub fn assessment_secret(
    algorithm: MeasAlgorithm,
    initiator_nonce: &[u8],
    responder_nonce: &[u8],
    shared_secret: &[u8],
) -> Result<Zeroizing<Vec<u8>>, PtsError> {
    let mut hasher = Hasher::new(algorithm.to_message_digest())
        .map_err(|_| PtsError::HasherUnavailable(algorithm.to_string()))?;
    hasher.update(b"1")?;
    hasher.update(initiator_nonce)?;
    hasher.update(responder_nonce)?;
    hasher.update(shared_secret)?;
    let digest = hasher.finish()?;
    let len = digest.len().min(ASSESSMENT_SECRET_LEN);
    Ok(Zeroizing::new(digest[..len].to_vec()))
}

enum DhKeypair {
    Modp {
        dh: Dh<Private>,
        peer: Option<BigNum>,
    },
    Ecp {
        pkey: PKey<Private>,
        public: Vec<u8>,
        peer: Option<PKey<Public>>,
    },
}

/// A Diffie-Hellman exchange bound to one group, owning its own keypair
pub struct DhExchange {
    group: DhGroup,
    inner: DhKeypair,
}

impl DhExchange {
    /// Create a fresh keypair for the given group
    pub fn new(group: DhGroup) -> Result<Self, PtsError> {
        let inner = match group {
            DhGroup::Modp1024
            | DhGroup::Modp1536
            | DhGroup::Modp2048
            | DhGroup::Modp3072
            | DhGroup::Modp4096 => {
                let prime = modp_prime(group).map_err(key_agreement_err)?;
                let generator = BigNum::from_u32(2).map_err(key_agreement_err)?;
                let dh = Dh::from_pqg(prime, None, generator)
                    .and_then(|params| params.generate_key())
                    .map_err(key_agreement_err)?;
                DhKeypair::Modp { dh, peer: None }
            }
            DhGroup::Ecp256 | DhGroup::Ecp384 => {
                let curve = ecp_group(group).map_err(key_agreement_err)?;
                let key = EcKey::generate(&curve).map_err(key_agreement_err)?;
                let mut ctx = BigNumContext::new().map_err(key_agreement_err)?;
                let public = key
                    .public_key()
                    .to_bytes(&curve, PointConversionForm::UNCOMPRESSED, &mut ctx)
                    .map_err(key_agreement_err)?;
                let pkey = PKey::from_ec_key(key).map_err(key_agreement_err)?;
                DhKeypair::Ecp { pkey, public, peer: None }
            }
        };
        Ok(Self { group, inner })
    }

    pub fn group(&self) -> DhGroup {
        self.group
    }

    /// Own public value in the group's wire encoding
    pub fn my_public(&self) -> Result<Vec<u8>, PtsError> {
        match &self.inner {
            DhKeypair::Modp { dh, .. } => Ok(dh.public_key().to_vec()),
            DhKeypair::Ecp { public, .. } => Ok(public.clone()),
        }
    }

    /// Import the peer's public value
    pub fn set_peer_public(&mut self, value: &[u8]) -> Result<(), PtsError> {
        match &mut self.inner {
            DhKeypair::Modp { peer, .. } => {
                *peer = Some(BigNum::from_slice(value).map_err(key_agreement_err)?);
            }
            DhKeypair::Ecp { peer, .. } => {
                let curve = ecp_group(self.group).map_err(key_agreement_err)?;
                let mut ctx = BigNumContext::new().map_err(key_agreement_err)?;
                let point =
                    EcPoint::from_bytes(&curve, value, &mut ctx).map_err(key_agreement_err)?;
                let key = EcKey::from_public_key(&curve, &point).map_err(key_agreement_err)?;
                *peer = Some(PKey::from_ec_key(key).map_err(key_agreement_err)?);
            }
        }
        Ok(())
    }

    /// Compute the shared secret; requires the peer public value
    pub fn shared_secret(&self) -> Result<Vec<u8>, PtsError> {
        match &self.inner {
            DhKeypair::Modp { dh, peer } => {
                let peer = peer
                    .as_ref()
                    .ok_or_else(|| PtsError::KeyAgreementFailed("peer public value not set".to_string()))?;
                dh.compute_key(peer).map_err(key_agreement_err)
            }
            DhKeypair::Ecp { pkey, peer, .. } => {
                let peer = peer
                    .as_ref()
                    .ok_or_else(|| PtsError::KeyAgreementFailed("peer public value not set".to_string()))?;
                let mut deriver = Deriver::new(pkey).map_err(key_agreement_err)?;
                deriver.set_peer(peer).map_err(key_agreement_err)?;
                deriver.derive_to_vec().map_err(key_agreement_err)
            }
        }
    }
}

fn key_agreement_err(e: openssl::error::ErrorStack) -> PtsError {
    PtsError::KeyAgreementFailed(e.to_string())
}

fn modp_prime(group: DhGroup) -> Result<BigNum, openssl::error::ErrorStack> {
    match group {
        DhGroup::Modp1024 => BigNum::get_rfc2409_prime_1024(),
        DhGroup::Modp1536 => BigNum::get_rfc3526_prime_1536(),
        DhGroup::Modp2048 => BigNum::get_rfc3526_prime_2048(),
        DhGroup::Modp3072 => BigNum::get_rfc3526_prime_3072(),
        _ => BigNum::get_rfc3526_prime_4096(),
    }
}

fn ecp_group(group: DhGroup) -> Result<EcGroup, openssl::error::ErrorStack> {
    let nid = match group {
        DhGroup::Ecp384 => Nid::SECP384R1,
        _ => Nid::X9_62_PRIME256V1,
    };
    EcGroup::from_curve_name(nid)
}

/// The Attestation Identity Key as presented by the peer or the local
/// credential store, the certificate having precedence over a bare public
/// key when both are configured
pub enum AikKey {
    Certificate(X509),
    PublicKey(PKey<Public>),
}

impl AikKey {
    /// Load an AIK certificate from a PEM or DER file
    pub fn from_cert_file(path: &Path) -> Result<Self, PtsError> {
        let bytes = fs::read(path).map_err(|e| PtsError::FileReadError {
            path: path.display().to_string(),
            source: e,
        })?;
        let cert = if bytes.starts_with(b"-----BEGIN") {
            X509::from_pem(&bytes)?
        } else {
            X509::from_der(&bytes)?
        };
        Ok(AikKey::Certificate(cert))
    }

    /// Load a trusted AIK public key from a PEM or DER file
    pub fn from_public_key_file(path: &Path) -> Result<Self, PtsError> {
        let bytes = fs::read(path).map_err(|e| PtsError::FileReadError {
            path: path.display().to_string(),
            source: e,
        })?;
        let key = if bytes.starts_with(b"-----BEGIN") {
            PKey::public_key_from_pem(&bytes)?
        } else {
            PKey::public_key_from_der(&bytes)?
        };
        Ok(AikKey::PublicKey(key))
    }

    /// The public key carried by the AIK
    pub fn public_key(&self) -> Result<PKey<Public>, PtsError> {
        match self {
            AikKey::Certificate(cert) => Ok(cert.public_key()?),
            AikKey::PublicKey(key) => {
                // owned copy via the SPKI encoding
                Ok(PKey::public_key_from_der(&key.public_key_to_der()?)?)
            }
        }
    }

    /// SHA-1 key id over the SubjectPublicKeyInfo encoding
    pub fn keyid(&self) -> Result<Vec<u8>, PtsError> {
        let key = self.public_key()?;
        let mut hasher = Hasher::new(MessageDigest::sha1())
            .map_err(|_| PtsError::HasherUnavailable("sha1".to_string()))?;
        hasher.update(&key.public_key_to_der()?)?;
        Ok(hasher.finish()?.to_vec())
    }

    /// Verify `signature` over `data` under RSA PKCS#1 v1.5 with SHA-1.
    /// Returns false on any adapter failure.
    pub fn verify(&self, data: &[u8], signature: &[u8]) -> bool {
        let key = match self.public_key() {
            Ok(key) => key,
            Err(e) => {
                warn!("failed to get public key from AIK: {}", e);
                return false;
            }
        };
        let mut verifier = match Verifier::new(MessageDigest::sha1(), &key) {
            Ok(verifier) => verifier,
            Err(e) => {
                debug!("failed to create verifier: {}", e);
                return false;
            }
        };
        if verifier.update(data).is_err() {
            return false;
        }
        verifier.verify(signature).unwrap_or(false)
    }
}
