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

//! Measurement hash algorithms and Diffie-Hellman groups, with their
//! TCG PTS protocol codes.

use std::fmt;
use std::str::FromStr;

use openssl::hash::MessageDigest;
use serde::{Deserialize, Serialize};

use crate::error::PtsError;

/// Hash algorithms usable for file measurements and secret derivation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MeasAlgorithm {
    Sha1,
    Sha256,
    Sha384,
}

impl MeasAlgorithm {
    /// PTS protocol code of the algorithm (a one-bit selection mask)
    pub const fn code(&self) -> u16 {
        match self {
            MeasAlgorithm::Sha1 => 1 << 15,
            MeasAlgorithm::Sha256 => 1 << 14,
            MeasAlgorithm::Sha384 => 1 << 13,
        }
    }

    /// Map a PTS protocol code back to an algorithm, `None` for unknown codes
    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            c if c == 1 << 15 => Some(MeasAlgorithm::Sha1),
            c if c == 1 << 14 => Some(MeasAlgorithm::Sha256),
            c if c == 1 << 13 => Some(MeasAlgorithm::Sha384),
            _ => None,
        }
    }

    pub const fn digest_len(&self) -> usize {
        match self {
            MeasAlgorithm::Sha1 => 20,
            MeasAlgorithm::Sha256 => 32,
            MeasAlgorithm::Sha384 => 48,
        }
    }

    /// Get the OpenSSL MessageDigest for this algorithm
    pub fn to_message_digest(&self) -> MessageDigest {
        match self {
            MeasAlgorithm::Sha1 => MessageDigest::sha1(),
            MeasAlgorithm::Sha256 => MessageDigest::sha256(),
            MeasAlgorithm::Sha384 => MessageDigest::sha384(),
        }
    }
}

impl fmt::Display for MeasAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MeasAlgorithm::Sha1 => write!(f, "sha1"),
            MeasAlgorithm::Sha256 => write!(f, "sha256"),
            MeasAlgorithm::Sha384 => write!(f, "sha384"),
        }
    }
}

impl FromStr for MeasAlgorithm {
    type Err = PtsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sha1" => Ok(MeasAlgorithm::Sha1),
            "sha256" => Ok(MeasAlgorithm::Sha256),
            "sha384" => Ok(MeasAlgorithm::Sha384),
            alg => Err(PtsError::HasherUnavailable(alg.to_string())),
        }
    }
}

/// Diffie-Hellman groups of the PTS protocol, by their IKE equivalents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DhGroup {
    Modp1024,
    Modp1536,
    Modp2048,
    Modp3072,
    Modp4096,
    Ecp256,
    Ecp384,
}

impl DhGroup {
    /// PTS protocol code of the group (a one-bit selection mask)
    pub const fn code(&self) -> u16 {
        match self {
            DhGroup::Modp1024 => 1 << 15,
            DhGroup::Modp1536 => 1 << 14,
            DhGroup::Modp2048 => 1 << 13,
            DhGroup::Modp3072 => 1 << 12,
            DhGroup::Modp4096 => 1 << 11,
            DhGroup::Ecp256 => 1 << 10,
            DhGroup::Ecp384 => 1 << 9,
        }
    }

    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            c if c == 1 << 15 => Some(DhGroup::Modp1024),
            c if c == 1 << 14 => Some(DhGroup::Modp1536),
            c if c == 1 << 13 => Some(DhGroup::Modp2048),
            c if c == 1 << 12 => Some(DhGroup::Modp3072),
            c if c == 1 << 11 => Some(DhGroup::Modp4096),
            c if c == 1 << 10 => Some(DhGroup::Ecp256),
            c if c == 1 << 9 => Some(DhGroup::Ecp384),
            _ => None,
        }
    }
}

impl fmt::Display for DhGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DhGroup::Modp1024 => write!(f, "modp1024"),
            DhGroup::Modp1536 => write!(f, "modp1536"),
            DhGroup::Modp2048 => write!(f, "modp2048"),
            DhGroup::Modp3072 => write!(f, "modp3072"),
            DhGroup::Modp4096 => write!(f, "modp4096"),
            DhGroup::Ecp256 => write!(f, "ecp256"),
            DhGroup::Ecp384 => write!(f, "ecp384"),
        }
    }
}
