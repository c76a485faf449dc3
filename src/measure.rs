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

//! File measurement: streaming hashes over files and directory trees, and
//! file metadata collection with stable logical names.

use std::fs::{self, File, Metadata};
use std::io::Read;
use std::os::unix::fs::{FileTypeExt, MetadataExt};
use std::path::{Path, PathBuf};

use log::debug;
use nix::errno::Errno;
use openssl::hash::Hasher;
use serde::{Deserialize, Serialize};

use crate::algorithm::MeasAlgorithm;
use crate::error::PtsError;

const MEASUREMENT_BUF_SIZE: usize = 4096;

/// Outcome of validating a measurement path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathStatus {
    /// The path exists and can be measured
    Ok,
    /// The file or directory does not exist
    NotFound,
    /// The path address can not be evaluated
    InvalidPath,
}

/// File type of a metadata entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileType {
    Regular,
    Directory,
    CharSpec,
    BlockSpec,
    Fifo,
    SymLink,
    Socket,
    Other,
}

impl From<fs::FileType> for FileType {
    fn from(file_type: fs::FileType) -> Self {
        if file_type.is_file() {
            FileType::Regular
        } else if file_type.is_dir() {
            FileType::Directory
        } else if file_type.is_char_device() {
            FileType::CharSpec
        } else if file_type.is_block_device() {
            FileType::BlockSpec
        } else if file_type.is_fifo() {
            FileType::Fifo
        } else if file_type.is_symlink() {
            FileType::SymLink
        } else if file_type.is_socket() {
            FileType::Socket
        } else {
            FileType::Other
        }
    }
}

/// One measured file: its logical name and digest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Measurement {
    pub filename: String,
    #[serde(with = "hex")]
    pub digest: Vec<u8>,
}

/// Ordered file measurements produced for one measurement request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMeasurements {
    pub request_id: u16,
    pub algorithm: MeasAlgorithm,
    pub measurements: Vec<Measurement>,
}

impl FileMeasurements {
    pub fn new(request_id: u16, algorithm: MeasAlgorithm) -> Self {
        Self { request_id, algorithm, measurements: Vec::new() }
    }

    pub fn push(&mut self, filename: String, digest: Vec<u8>) {
        self.measurements.push(Measurement { filename, digest });
    }

    pub fn len(&self) -> usize {
        self.measurements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.measurements.is_empty()
    }

    pub fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    pub fn from_json(json: &serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(json.clone())
    }
}

/// Statistical information describing one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub filename: String,
    pub file_type: FileType,
    pub size: u64,
    pub created: i64,
    pub modified: i64,
    pub accessed: i64,
    pub owner: u32,
    pub group: u32,
}

/// Validate a path ahead of a measurement request.
///
/// Missing files and unevaluable addresses map to a [`PathStatus`]; any
/// other OS failure surfaces as [`PtsError::PathSystemError`], which the
/// caller may treat as non-fatal and skip the entry.
pub fn is_path_valid(path: &Path) -> Result<PathStatus, PtsError> {
    match fs::metadata(path) {
        Ok(_) => Ok(PathStatus::Ok),
        Err(e) => match e.raw_os_error() {
            Some(code)
                if code == Errno::ENOENT as i32 || code == Errno::ENOTDIR as i32 =>
            {
                debug!("file/directory does not exist {}", path.display());
                Ok(PathStatus::NotFound)
            }
            Some(code) if code == Errno::EFAULT as i32 => {
                debug!("bad address {}", path.display());
                Ok(PathStatus::InvalidPath)
            }
            _ => Err(PtsError::PathSystemError {
                path: path.display().to_string(),
                source: e,
            }),
        },
    }
}

/// Stream-hash a single file with a fixed 4 KiB buffer
pub fn hash_file(algorithm: MeasAlgorithm, path: &Path) -> Result<Vec<u8>, PtsError> {
    let mut hasher = Hasher::new(algorithm.to_message_digest())
        .map_err(|_| PtsError::HasherUnavailable(algorithm.to_string()))?;
    let read_error = |e| PtsError::FileReadError {
        path: path.display().to_string(),
        source: e,
    };
    let mut file = File::open(path).map_err(read_error)?;
    let mut buffer = [0u8; MEASUREMENT_BUF_SIZE];
    loop {
        let bytes_read = file.read(&mut buffer).map_err(read_error)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read])?;
    }
    Ok(hasher.finish()?.to_vec())
}

/// Measure a file or a directory one level deep.
///
/// Directories contribute every regular file whose name does not begin
/// with a dot, recorded under its relative name; a single file is recorded
/// under its base name. Fails atomically on any I/O error.
pub fn measure(
    algorithm: MeasAlgorithm,
    request_id: u16,
    path: &Path,
    is_directory: bool,
) -> Result<FileMeasurements, PtsError> {
    let mut measurements = FileMeasurements::new(request_id, algorithm);

    if is_directory {
        for (rel_name, abs_path, metadata) in enumerate_directory(path)? {
            // measure regular files only
            if !metadata.is_file() {
                continue;
            }
            let digest = hash_file(algorithm, &abs_path)?;
            debug!("  {} for '{}'", hex::encode(&digest), rel_name);
            measurements.push(rel_name, digest);
        }
    } else {
        let digest = hash_file(algorithm, path)?;
        let filename = base_name(path);
        debug!("  {} for '{}'", hex::encode(&digest), filename);
        measurements.push(filename, digest);
    }
    Ok(measurements)
}

/// Collect metadata for a file or a directory one level deep, with the
/// same iteration rule as [`measure`]
pub fn metadata(path: &Path, is_directory: bool) -> Result<Vec<FileMetadata>, PtsError> {
    let mut entries = Vec::new();

    if is_directory {
        for (rel_name, _abs_path, metadata) in enumerate_directory(path)? {
            if !metadata.is_file() {
                continue;
            }
            entries.push(file_metadata(rel_name, &metadata));
        }
    } else {
        let metadata = fs::metadata(path).map_err(|e| PtsError::PathSystemError {
            path: path.display().to_string(),
            source: e,
        })?;
        entries.push(file_metadata(base_name(path), &metadata));
    }
    Ok(entries)
}

/// Enumerate a directory one level deep, yielding the relative name, the
/// absolute path and the metadata of every entry whose name does not begin
/// with a dot
fn enumerate_directory(
    path: &Path,
) -> Result<Vec<(String, PathBuf, Metadata)>, PtsError> {
    let enum_error = |e| PtsError::DirectoryEnumError {
        path: path.display().to_string(),
        source: e,
    };
    let mut entries = Vec::new();
    for entry in fs::read_dir(path).map_err(enum_error)? {
        let entry = entry.map_err(enum_error)?;
        let rel_name = entry.file_name().to_string_lossy().into_owned();
        if rel_name.starts_with('.') {
            continue;
        }
        let abs_path = entry.path();
        let metadata = fs::metadata(&abs_path).map_err(enum_error)?;
        entries.push((rel_name, abs_path, metadata));
    }
    Ok(entries)
}

fn file_metadata(filename: String, metadata: &Metadata) -> FileMetadata {
    FileMetadata {
        filename,
        file_type: metadata.file_type().into(),
        size: metadata.size(),
        created: metadata.ctime(),
        modified: metadata.mtime(),
        accessed: metadata.atime(),
        owner: metadata.uid(),
        group: metadata.gid(),
    }
}

/// Relative filename of a fully qualified pathname
fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
