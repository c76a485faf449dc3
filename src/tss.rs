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

//! Interaction contract with the TCG Software Stack of a TPM 1.2.
//!
//! Implementations own the TSS context lifetime: every method opens a
//! context, performs the command and releases the context before
//! returning, also on failure. Any TSS failure surfaces as
//! [`PtsError::TpmUnavailable`] carrying the TSS result code.

use mockall::automock;

use crate::error::PtsError;

/// Selects the TPM command producing the signed attestation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteKind {
    /// TPM_Quote over a default PCR composite
    Quote,
    /// TPM_Quote2 over a PCR_INFO_SHORT composite
    Quote2,
}

/// Input of a Quote invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteRequest {
    pub kind: QuoteKind,
    /// Ascending indices of the PCR registers to quote over
    pub pcr_indices: Vec<u32>,
    /// External data bound into the quote, the 20-byte assessment secret
    pub external_data: Vec<u8>,
    /// TSS key blob of the Attestation Identity Key
    pub aik_blob: Vec<u8>,
}

/// Output of a Quote invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteResponse {
    /// The raw quote info blob signed by the TPM (the validation data of
    /// the TSS, a TPM_QUOTE_INFO or TPM_QUOTE_INFO2 structure)
    pub quote_info: Vec<u8>,
    /// The signature over `quote_info`, verbatim
    pub signature: Vec<u8>,
    /// Version info returned by TPM_Quote2, when the TSS provides it
    pub version_info: Option<Vec<u8>>,
}

/// TCG Software Stack session contract.
///
/// A `quote` implementation is expected to load the Storage Root Key from
/// the system persistent store using the 20-byte well-known secret, load
/// the AIK from `aik_blob` under the SRK, build a PCR composite object of
/// the default kind for [`QuoteKind::Quote`] or the short-info kind for
/// [`QuoteKind::Quote2`] (selecting registers in release direction for the
/// latter), bind `external_data` into the validation data and invoke the
/// TPM command.
#[automock]
pub trait Tss {
    /// The TPM_CAP_VERSION_INFO capability blob; also serves as the
    /// usable-TPM probe
    fn version_info(&self) -> Result<Vec<u8>, PtsError>;

    /// Current value of a PCR register
    fn read_pcr(&self, pcr_index: u32) -> Result<Vec<u8>, PtsError>;

    /// Extend a PCR register by `input` and return the resulting value
    fn extend_pcr(&self, pcr_index: u32, input: &[u8]) -> Result<Vec<u8>, PtsError>;

    /// Produce a Quote or Quote2 over the requested PCR registers
    fn quote(&self, request: &QuoteRequest) -> Result<QuoteResponse, PtsError>;
}
