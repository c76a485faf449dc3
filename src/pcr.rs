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

//! PCR selection and value bookkeeping for a TPM 1.2, and construction of
//! the PCR Composite structure over the selected registers.

use log::{debug, warn};

use crate::error::PtsError;

/// Maximum number of PCR registers of a TPM 1.2
pub const PCR_MAX_NUM: u32 = 24;

/// Number of bytes held by one PCR register of a TPM 1.2
pub const PCR_LEN: usize = 20;

const SELECT_LEN: usize = (PCR_MAX_NUM / 8) as usize;

/// Set of selected PCR registers with their latest post-extension values.
///
/// The register width is fixed by the first stored value; the selection
/// bitmap uses little-endian bit order within each byte, bit `i % 8` of
/// byte `i / 8` standing for register `i`.
#[derive(Debug, Clone, Default)]
pub struct PcrSet {
    values: [Option<Vec<u8>>; PCR_MAX_NUM as usize],
    select: [u8; SELECT_LEN],
    pcr_len: usize,
    count: u32,
    max_index: u32,
}

impl PcrSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a register as selected. Idempotent.
    pub fn select(&mut self, pcr_index: u32) -> Result<(), PtsError> {
        if pcr_index >= PCR_MAX_NUM {
            warn!("PCR {}: number is larger than maximum of {}", pcr_index, PCR_MAX_NUM - 1);
            return Err(PtsError::PcrIndexOutOfRange(pcr_index));
        }
        let byte = (pcr_index / 8) as usize;
        let mask = 1u8 << (pcr_index % 8);
        if self.select[byte] & mask == 0 {
            self.select[byte] |= mask;
            self.max_index = self.max_index.max(pcr_index);
            self.count += 1;
        }
        Ok(())
    }

    /// Record the post-extension value of a register and select it.
    ///
    /// The first stored value fixes the register width for the whole set.
    /// When the register already holds a value, that value is compared to
    /// `pcr_before`; a mismatch is logged but the new value still replaces
    /// the stored one.
    pub fn add(
        &mut self,
        pcr_index: u32,
        pcr_before: &[u8],
        pcr_after: &[u8],
    ) -> Result<(), PtsError> {
        if pcr_index >= PCR_MAX_NUM {
            warn!("PCR {}: number is larger than maximum of {}", pcr_index, PCR_MAX_NUM - 1);
            return Err(PtsError::PcrIndexOutOfRange(pcr_index));
        }
        if self.pcr_len != 0 {
            if pcr_after.len() != self.pcr_len {
                warn!(
                    "PCR {:02}: length is {} bytes but should be {} bytes",
                    pcr_index,
                    pcr_after.len(),
                    self.pcr_len
                );
                return Err(PtsError::PcrLengthMismatch {
                    expected: self.pcr_len,
                    actual: pcr_after.len(),
                });
            }
        } else {
            self.pcr_len = pcr_after.len();
        }

        let slot = &mut self.values[pcr_index as usize];
        if let Some(stored) = slot {
            if stored.as_slice() != pcr_before {
                warn!(
                    "PCR {:02}: new pcr_before value does not equal old pcr_after value",
                    pcr_index
                );
            }
        } else {
            self.select[(pcr_index / 8) as usize] |= 1 << (pcr_index % 8);
            self.max_index = self.max_index.max(pcr_index);
            self.count += 1;
        }
        *slot = Some(pcr_after.to_vec());
        Ok(())
    }

    /// Drop all stored values and zero the selection
    pub fn clear(&mut self) {
        for slot in self.values.iter_mut() {
            *slot = None;
        }
        self.select = [0; SELECT_LEN];
        self.count = 0;
        self.max_index = 0;
    }

    pub fn is_selected(&self, pcr_index: u32) -> bool {
        if pcr_index >= PCR_MAX_NUM {
            return false;
        }
        self.select[(pcr_index / 8) as usize] & (1 << (pcr_index % 8)) != 0
    }

    /// Latest stored value of a register, if any
    pub fn value(&self, pcr_index: u32) -> Option<&[u8]> {
        self.values
            .get(pcr_index as usize)
            .and_then(|slot| slot.as_deref())
    }

    /// Ascending indices of all selected registers
    pub fn selected_indices(&self) -> Vec<u32> {
        (0..PCR_MAX_NUM).filter(|&i| self.is_selected(i)).collect()
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn max_index(&self) -> u32 {
        self.max_index
    }

    pub fn pcr_len(&self) -> usize {
        self.pcr_len
    }

    /// Length of the selection bitmap field; a TPM 1.2 has 24 registers, so
    /// the field used by the TSS is at least 3 bytes
    pub fn size_of_select(&self) -> usize {
        SELECT_LEN.max(1 + (self.max_index / 8) as usize)
    }

    /// The selection bitmap, truncated to `size_of_select` bytes
    pub fn select_bytes(&self) -> &[u8] {
        &self.select[..self.size_of_select().min(SELECT_LEN)]
    }

    /// Build the PCR Composite structure over the current selection:
    /// a big-endian 16-bit bitmap length, the bitmap, a 32-bit value-area
    /// size of `count * pcr_len`, and the stored register values in
    /// ascending index order.
    pub fn compose(&self) -> Vec<u8> {
        let size_of_select = self.size_of_select();
        let value_size = self.count * self.pcr_len as u32;
        let mut composite =
            Vec::with_capacity(2 + size_of_select + 4 + value_size as usize);

        composite.extend_from_slice(&(size_of_select as u16).to_be_bytes());
        composite.extend_from_slice(&self.select[..size_of_select.min(SELECT_LEN)]);
        composite.extend_from_slice(&value_size.to_be_bytes());
        for index in 0..(8 * size_of_select) as u32 {
            if let Some(value) = self.value(index) {
                composite.extend_from_slice(value);
            }
        }
        debug!("constructed PCR Composite of {} bytes", composite.len());
        composite
    }
}
