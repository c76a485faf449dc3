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

use thiserror::Error;

use crate::pcr::PCR_MAX_NUM;

/// Error type for all fallible PTS engine operations
#[derive(Debug, Error)]
pub enum PtsError {
    /// A PCR index names a register beyond the TPM 1.2 range
    #[error("PCR {0}: number is larger than maximum of {}", PCR_MAX_NUM - 1)]
    PcrIndexOutOfRange(u32),

    /// A PCR value does not match the register width fixed by the first assignment
    #[error("PCR value length is {actual} bytes but should be {expected} bytes")]
    PcrLengthMismatch { expected: usize, actual: usize },

    /// Secret derivation was attempted before both nonces were exchanged
    #[error("initiator and/or responder nonce is not available")]
    MissingNonce,

    /// A quote operation was attempted before the assessment secret was derived
    #[error("secret assessment value is not available")]
    MissingSecret,

    /// No Attestation Identity Key (certificate, public key or key blob) is loaded
    #[error("no AIK certificate or public key available")]
    MissingAik,

    /// Quote2 with version info was requested without a TPM version info blob
    #[error("TPM version information is not available")]
    MissingVersionInfo,

    /// A quote structure was requested while no PCR register is selected
    #[error("no extended PCR entries available")]
    NoPcrSelected,

    /// No strong random source could be obtained
    #[error("no strong random source available")]
    NoRng,

    /// Diffie-Hellman handle creation, peer value import or secret computation failed
    #[error("Diffie-Hellman key agreement failed: {0}")]
    KeyAgreementFailed(String),

    /// The hasher for the selected algorithm could not be instantiated
    #[error("hasher {0} is not available")]
    HasherUnavailable(String),

    /// Any failure reported by the TCG Software Stack, carrying the TSS result code
    #[error("TPM not available: tss error 0x{0:x}")]
    TpmUnavailable(u32),

    /// A byte blob handed over by the TSS or the peer does not match its declared layout
    #[error("invalid TPM structure: {0}")]
    InvalidStructure(String),

    /// Path validation ran into an OS error other than the mapped errno values
    #[error("error occurred while validating path '{path}': {source}")]
    PathSystemError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A file to be measured could not be opened or read
    #[error("file '{path}' can not be opened: {source}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A directory to be measured could not be enumerated
    #[error("directory '{path}' can not be opened: {source}")]
    DirectoryEnumError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// No distribution release file yielded a usable platform description
    #[error("no distribution release information available")]
    PlatformInfoUnavailable,

    /// Carrier for OpenSSL failures outside the mapped taxonomy
    #[error("crypto operation failed: {0}")]
    Crypto(#[from] openssl::error::ErrorStack),
}
