//! Core engine of a Platform Trust Service for TPM 1.2 remote
//! attestation: the per-exchange session state machine, Diffie-Hellman
//! key agreement and assessment-secret derivation, file measurement, the
//! PCR model with its composite and quote info wire structures, and quote
//! signature verification on the challenging side.

mod algorithm;
mod crypto;
mod error;
mod platform;
mod session;
mod structure;

pub mod measure;
pub mod pcr;
pub mod tss;

pub use algorithm::{DhGroup, MeasAlgorithm};
pub use crypto::{assessment_secret, digest, nonce_bytes, AikKey, DhExchange, ASSESSMENT_SECRET_LEN};
pub use error::PtsError;
pub use measure::{FileMeasurements, FileMetadata, FileType, Measurement, PathStatus};
pub use pcr::{PcrSet, PCR_LEN, PCR_MAX_NUM};
pub use platform::extract_platform_info;
pub use session::{ProtoCaps, PtsSession, Role};
pub use structure::{
    build_quote_info, build_quote_info2, composite_hash_from_quote, TpmVersionInfo,
    COMPOSITE_HASH_LEN, TPM_LOC_ZERO, TPM_TAG_QUOTE_INFO2,
};
pub use tss::{QuoteKind, QuoteRequest, QuoteResponse, Tss};
