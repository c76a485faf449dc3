use std::collections::HashSet;
use std::fs;
use std::path::Path;

use openssl::hash::{Hasher, MessageDigest};
use pts_engine::{
    measure, FileMeasurements, FileType, MeasAlgorithm, PathStatus, PtsError, PtsSession, Role,
};
use tempfile::tempdir;

fn sha256(data: &[u8]) -> Vec<u8> {
    let mut hasher = Hasher::new(MessageDigest::sha256()).unwrap();
    hasher.update(data).unwrap();
    hasher.finish().unwrap().to_vec()
}

/// A directory with two regular files, a hidden file and a subdirectory
fn populate(dir: &Path) {
    fs::write(dir.join("alpha.bin"), b"abc").unwrap();
    // spans more than one 4 KiB read
    fs::write(dir.join("beta.bin"), vec![0xa5u8; 5000]).unwrap();
    fs::write(dir.join(".hidden"), b"do not measure").unwrap();
    fs::create_dir(dir.join("nested")).unwrap();
    fs::write(dir.join("nested").join("gamma.bin"), b"one level too deep").unwrap();
}

// Test Objective: Directory measurement covers regular non-hidden files
// one level deep and matches reference digests
// Expected Result: exactly alpha.bin and beta.bin with their SHA-256
// digests
#[test]
fn test_measure_directory() {
    let dir = tempdir().unwrap();
    populate(dir.path());

    let session = PtsSession::new(Role::Measurer);
    let measurements = session.measure(7, dir.path(), true).unwrap();

    assert_eq!(measurements.request_id, 7);
    assert_eq!(measurements.algorithm, MeasAlgorithm::Sha256);
    assert_eq!(measurements.len(), 2);

    let by_name: Vec<(&str, &[u8])> = measurements
        .measurements
        .iter()
        .map(|m| (m.filename.as_str(), m.digest.as_slice()))
        .collect();
    assert!(by_name.contains(&("alpha.bin", sha256(b"abc").as_slice())));
    assert!(by_name.contains(&("beta.bin", sha256(&vec![0xa5u8; 5000]).as_slice())));
}

// Test Objective: Measuring the same directory twice is deterministic
// Expected Result: identical sets of (name, digest) pairs
#[test]
fn test_measure_directory_deterministic() {
    let dir = tempdir().unwrap();
    populate(dir.path());

    let first = measure::measure(MeasAlgorithm::Sha1, 1, dir.path(), true).unwrap();
    let second = measure::measure(MeasAlgorithm::Sha1, 1, dir.path(), true).unwrap();

    let as_set = |m: &FileMeasurements| -> HashSet<(String, Vec<u8>)> {
        m.measurements
            .iter()
            .map(|e| (e.filename.clone(), e.digest.clone()))
            .collect()
    };
    assert_eq!(as_set(&first), as_set(&second));
    assert!(first.measurements.iter().all(|e| e.digest.len() == 20));
}

// Test Objective: A single file is recorded under its base name
// Expected Result: one entry named alpha.bin
#[test]
fn test_measure_single_file() {
    let dir = tempdir().unwrap();
    populate(dir.path());

    let measurements =
        measure::measure(MeasAlgorithm::Sha256, 3, &dir.path().join("alpha.bin"), false).unwrap();
    assert_eq!(measurements.len(), 1);
    assert_eq!(measurements.measurements[0].filename, "alpha.bin");
    assert_eq!(measurements.measurements[0].digest, sha256(b"abc"));
}

// Test Objective: Measurement failures are atomic
// Expected Result: a missing file yields FileReadError, a missing
// directory yields DirectoryEnumError
#[test]
fn test_measure_failures() {
    let missing = Path::new("/nonexistent/pts/file");
    assert!(matches!(
        measure::measure(MeasAlgorithm::Sha256, 1, missing, false),
        Err(PtsError::FileReadError { .. })
    ));
    assert!(matches!(
        measure::measure(MeasAlgorithm::Sha256, 1, missing, true),
        Err(PtsError::DirectoryEnumError { .. })
    ));
}

// Test Objective: Path validation maps missing paths without failing
// Expected Result: NotFound for an absent path, Ok for the root
#[test]
fn test_path_validation() {
    let session = PtsSession::new(Role::Verifier);
    assert_eq!(session.is_path_valid(Path::new("/nonexistent/x")).unwrap(), PathStatus::NotFound);
    assert_eq!(session.is_path_valid(Path::new("/")).unwrap(), PathStatus::Ok);
}

// Test Objective: Metadata collection follows the measurement iteration
// rule and carries stat information
// Expected Result: two regular entries with their sizes
#[test]
fn test_metadata_directory() {
    let dir = tempdir().unwrap();
    populate(dir.path());

    let entries = measure::metadata(dir.path(), true).unwrap();
    assert_eq!(entries.len(), 2);
    for entry in &entries {
        assert_eq!(entry.file_type, FileType::Regular);
        match entry.filename.as_str() {
            "alpha.bin" => assert_eq!(entry.size, 3),
            "beta.bin" => assert_eq!(entry.size, 5000),
            other => panic!("unexpected entry '{}'", other),
        }
    }
}

// Test Objective: Metadata of a single path reflects its file type
// Expected Result: a directory entry for the directory itself
#[test]
fn test_metadata_single_path() {
    let dir = tempdir().unwrap();
    populate(dir.path());

    let entries = measure::metadata(dir.path(), false).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].file_type, FileType::Directory);
}

// Test Objective: Measurements survive a JSON round-trip
// Expected Result: an equal FileMeasurements value
#[test]
fn test_measurements_json_roundtrip() {
    let dir = tempdir().unwrap();
    populate(dir.path());

    let measurements =
        measure::measure(MeasAlgorithm::Sha256, 9, &dir.path().join("alpha.bin"), false).unwrap();
    let json = measurements.to_json().unwrap();
    let restored = FileMeasurements::from_json(&json).unwrap();
    assert_eq!(restored, measurements);
}

// Test Objective: The streaming hash matches a one-shot reference over a
// buffer-spanning file
// Expected Result: equal digests
#[test]
fn test_hash_file_streaming() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("large.bin");
    let content: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
    fs::write(&path, &content).unwrap();

    let digest = measure::hash_file(MeasAlgorithm::Sha256, &path).unwrap();
    assert_eq!(digest, sha256(&content));
}
