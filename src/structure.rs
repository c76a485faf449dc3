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

//! TPM 1.2 byte structures: TPM_QUOTE_INFO and TPM_QUOTE_INFO2
//! construction, composite-hash extraction from TSS quote blobs, and the
//! TPM_CAP_VERSION_INFO capability blob.
//!
//! All integers are big-endian.

use std::fmt;
use std::io::{Cursor, Read};

use byteorder::{BigEndian, ReadBytesExt};

use crate::error::PtsError;
use crate::tss::QuoteKind;

/// TPM structure tag of TPM_QUOTE_INFO2
pub const TPM_TAG_QUOTE_INFO2: u16 = 0x0036;

/// Locality selection written into TPM_QUOTE_INFO2 (locality zero)
pub const TPM_LOC_ZERO: u8 = 0x01;

/// Length of the SHA-1 PCR composite hash
pub const COMPOSITE_HASH_LEN: usize = 20;

const QUOTE_VERSION: [u8; 4] = [0x01, 0x01, 0x00, 0x00];
const QUOTE_MAGIC: &[u8; 4] = b"QUOT";
const QUOTE2_MAGIC: &[u8; 4] = b"QUT2";

/// TPM_QUOTE_INFO structure:
/// 4 bytes of version, 4 bytes 'Q' 'U' 'O' 'T', 20 byte SHA-1 of the PCR
/// Composite, 20 byte nonce.
pub fn build_quote_info(composite_hash: &[u8], nonce: &[u8]) -> Vec<u8> {
    let mut writer = Vec::with_capacity(4 + 4 + composite_hash.len() + nonce.len());
    writer.extend_from_slice(&QUOTE_VERSION);
    writer.extend_from_slice(QUOTE_MAGIC);
    writer.extend_from_slice(composite_hash);
    writer.extend_from_slice(nonce);
    writer
}

/// TPM_QUOTE_INFO2 structure:
/// 2 byte tag 0x0036, 4 bytes 'Q' 'U' 'T' '2', 20 byte nonce, the PCR
/// selection (16-bit length plus bitmap), the locality byte, 20 byte SHA-1
/// of the PCR Composite, and the TPM version info blob when requested.
pub fn build_quote_info2(
    nonce: &[u8],
    select: &[u8],
    composite_hash: &[u8],
    version_info: Option<&[u8]>,
) -> Vec<u8> {
    let mut writer = Vec::new();
    writer.extend_from_slice(&TPM_TAG_QUOTE_INFO2.to_be_bytes());
    writer.extend_from_slice(QUOTE2_MAGIC);
    writer.extend_from_slice(nonce);
    writer.extend_from_slice(&(select.len() as u16).to_be_bytes());
    writer.extend_from_slice(select);
    writer.push(TPM_LOC_ZERO);
    writer.extend_from_slice(composite_hash);
    if let Some(info) = version_info {
        writer.extend_from_slice(info);
    }
    writer
}

/// Extract the SHA-1 PCR composite hash from the quote info blob signed by
/// the TPM. For Quote it sits at bytes 8..28, after the version and the
/// 'QUOT' magic; for Quote2 it occupies the last 20 bytes of the blob.
pub fn composite_hash_from_quote(
    kind: QuoteKind,
    quote_info: &[u8],
) -> Result<[u8; COMPOSITE_HASH_LEN], PtsError> {
    let slice = match kind {
        QuoteKind::Quote => quote_info.get(8..8 + COMPOSITE_HASH_LEN),
        QuoteKind::Quote2 => quote_info
            .len()
            .checked_sub(COMPOSITE_HASH_LEN)
            .and_then(|start| quote_info.get(start..)),
    }
    .ok_or_else(|| {
        PtsError::InvalidStructure(format!(
            "quote info blob of {} bytes is too short for a composite hash",
            quote_info.len()
        ))
    })?;
    let mut hash = [0u8; COMPOSITE_HASH_LEN];
    hash.copy_from_slice(slice);
    Ok(hash)
}

/// Parsed TPM_CAP_VERSION_INFO capability blob of a TPM 1.2
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TpmVersionInfo {
    pub tag: u16,
    /// Chip version: major, minor, revMajor, revMinor
    pub version: [u8; 4],
    pub spec_level: u16,
    pub errata_rev: u8,
    pub vendor_id: [u8; 4],
    pub vendor_specific: Vec<u8>,
}

impl TpmVersionInfo {
    pub fn parse(data: &[u8]) -> Result<Self, PtsError> {
        let mut cursor = Cursor::new(data);
        let truncated =
            |_| PtsError::InvalidStructure("truncated TPM version info".to_string());

        let tag = cursor.read_u16::<BigEndian>().map_err(truncated)?;
        let mut version = [0u8; 4];
        cursor.read_exact(&mut version).map_err(truncated)?;
        let spec_level = cursor.read_u16::<BigEndian>().map_err(truncated)?;
        let errata_rev = cursor.read_u8().map_err(truncated)?;
        let mut vendor_id = [0u8; 4];
        cursor.read_exact(&mut vendor_id).map_err(truncated)?;
        let vendor_specific_size = cursor.read_u16::<BigEndian>().map_err(truncated)?;
        let mut vendor_specific = vec![0u8; vendor_specific_size as usize];
        cursor.read_exact(&mut vendor_specific).map_err(truncated)?;

        Ok(TpmVersionInfo {
            tag,
            version,
            spec_level,
            errata_rev,
            vendor_id,
            vendor_specific,
        })
    }
}

impl fmt::Display for TpmVersionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TPM 1.2 Version Info: Chip Version: {}.{}.{}.{}, Spec Level: {}, \
             Errata Rev: {}, Vendor ID: {}",
            self.version[0],
            self.version[1],
            self.version[2],
            self.version[3],
            self.spec_level,
            self.errata_rev,
            String::from_utf8_lossy(&self.vendor_id)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_blob() -> Vec<u8> {
        let mut blob = Vec::new();
        blob.extend_from_slice(&0x0030u16.to_be_bytes());
        blob.extend_from_slice(&[1, 2, 8, 16]);
        blob.extend_from_slice(&2u16.to_be_bytes());
        blob.push(3);
        blob.extend_from_slice(b"IBM ");
        blob.extend_from_slice(&2u16.to_be_bytes());
        blob.extend_from_slice(&[0xde, 0xad]);
        blob
    }

    #[test]
    fn parses_version_info_blob() {
        let info = TpmVersionInfo::parse(&sample_blob()).unwrap();
        assert_eq!(info.tag, 0x0030);
        assert_eq!(info.version, [1, 2, 8, 16]);
        assert_eq!(info.spec_level, 2);
        assert_eq!(info.errata_rev, 3);
        assert_eq!(&info.vendor_id, b"IBM ");
        assert_eq!(info.vendor_specific, vec![0xde, 0xad]);
        assert!(info.to_string().contains("Chip Version: 1.2.8.16"));
    }

    #[test]
    fn rejects_truncated_version_info() {
        let blob = sample_blob();
        assert!(TpmVersionInfo::parse(&blob[..blob.len() - 1]).is_err());
        assert!(TpmVersionInfo::parse(&[0x00]).is_err());
    }
}
