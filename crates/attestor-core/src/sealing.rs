//! # Cryptographic Sealing
//!
//! Three integrity gates over the run:
//!
//! - **Gate 1 (input)**: a SHA-512 content hash of the raw evidence bytes,
//!   stored in the record's metadata at ingestion. If the file cannot be
//!   read the record proceeds with a recorded gap; evidence is never
//!   silently dropped.
//! - **Gate 2 (processing)**: every module invocation is bracketed by audit
//!   entries carrying a hash of the serialized input evidence ids and a
//!   hash of the output summary. Hashes, never payloads: the audit log
//!   stays compact and never duplicates sensitive evidence.
//! - **Gate 3 (output)**: one SHA-512 hash over the canonical report bytes,
//!   a compact base64 attestation payload for external scanning, and a
//!   derived BLAKE3 watermark. The report is immutable from this point.
//!
//! Verification recomputes and compares; it is idempotent and
//! side-effect-free.

use crate::types::{
    AttestorError, EvidenceRecord, GeoPoint, IntegrityStatus, ModuleResult, Seal, now_ms,
};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use sha2::{Digest, Sha512};
use std::path::Path;

/// Attestation payload format version prefix.
pub const ATTESTATION_PREFIX: &str = "ATST1";

/// Hex length of the hash prefix embedded in attestation payloads.
pub const ATTESTATION_HASH_PREFIX_LEN: usize = 16;

// =============================================================================
// HASHING
// =============================================================================

/// SHA-512 of arbitrary bytes, lowercase hex.
#[must_use]
pub fn sha512_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha512::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Gate 1: hash the raw bytes of an evidence file.
///
/// An unreadable file is an `Io` error; the caller records the gap and
/// keeps the evidence (Zero-Loss Evidence Doctrine).
pub fn gate1_hash_file(path: &Path) -> Result<String, AttestorError> {
    let bytes = std::fs::read(path)
        .map_err(|e| AttestorError::Io(format!("cannot read '{}': {e}", path.display())))?;
    Ok(sha512_hex(&bytes))
}

/// Gate 2: hash of the serialized input evidence ids for one invocation.
#[must_use]
pub fn gate2_input_hash(evidence: &[EvidenceRecord]) -> String {
    let ids: Vec<u64> = evidence.iter().map(|e| e.id.0).collect();
    let bytes = postcard::to_stdvec(&ids).unwrap_or_default();
    sha512_hex(&bytes)
}

/// Gate 2: hash of a module's output summary (name, finding count,
/// confidence bits). Never the findings themselves.
#[must_use]
pub fn gate2_output_hash(result: &ModuleResult) -> String {
    let summary = (
        result.module.as_str(),
        result.findings.len() as u64,
        result.confidence.to_bits(),
    );
    let bytes = postcard::to_stdvec(&summary).unwrap_or_default();
    sha512_hex(&bytes)
}

// =============================================================================
// GATE 3: SEAL
// =============================================================================

/// Compute the final seal over the canonical report bytes.
///
/// Called exactly once per report, after all modules and synthesis have
/// completed. The attestation payload and watermark are both derived from
/// the content hash, so any later mutation invalidates all three.
#[must_use]
pub fn compute_seal(report_id: &str, canonical_bytes: &[u8], location: Option<GeoPoint>) -> Seal {
    let content_hash = sha512_hex(canonical_bytes);
    let sealed_at_ms = now_ms();
    let attestation = attestation_payload(report_id, &content_hash, sealed_at_ms, location);
    let watermark = watermark(&content_hash, sealed_at_ms);
    Seal {
        content_hash,
        sealed_at_ms,
        location,
        attestation,
        watermark,
    }
}

/// Build the compact attestation payload for external scanning:
/// `ATST1|<report id>|<hash prefix>|<timestamp>|<lat,lon or ->`, base64.
#[must_use]
pub fn attestation_payload(
    report_id: &str,
    content_hash: &str,
    sealed_at_ms: u64,
    location: Option<GeoPoint>,
) -> String {
    let prefix: String = content_hash.chars().take(ATTESTATION_HASH_PREFIX_LEN).collect();
    let coords = location.map_or_else(|| "-".to_string(), |g| format!("{:.6},{:.6}", g.lat, g.lon));
    let raw = format!("{ATTESTATION_PREFIX}|{report_id}|{prefix}|{sealed_at_ms}|{coords}");
    BASE64.encode(raw.as_bytes())
}

/// Decode an attestation payload back into its raw pipe-separated form.
pub fn decode_attestation(payload: &str) -> Result<String, AttestorError> {
    let bytes = BASE64
        .decode(payload)
        .map_err(|e| AttestorError::Serialization(format!("invalid attestation payload: {e}")))?;
    let raw = String::from_utf8(bytes)
        .map_err(|e| AttestorError::Serialization(format!("invalid attestation payload: {e}")))?;
    if !raw.starts_with(ATTESTATION_PREFIX) {
        return Err(AttestorError::Serialization(
            "unknown attestation version".to_string(),
        ));
    }
    Ok(raw)
}

/// Derived watermark: BLAKE3 over the content hash and sealing time.
#[must_use]
pub fn watermark(content_hash: &str, sealed_at_ms: u64) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(content_hash.as_bytes());
    hasher.update(&sealed_at_ms.to_le_bytes());
    hasher.finalize().to_hex().to_string()
}

// =============================================================================
// VERIFICATION
// =============================================================================

/// Verify a record's stored Gate-1 hash against current file bytes.
///
/// A record without a stored hash carries an ingestion-time integrity gap
/// and has nothing to verify against; it reports `Valid` here, and the gap
/// itself is visible via [`EvidenceRecord::has_integrity_gap`] and the
/// Gate-1 audit entry.
#[must_use]
pub fn verify_evidence(record: &EvidenceRecord) -> IntegrityStatus {
    let path = Path::new(&record.source);
    if !path.exists() {
        return IntegrityStatus::EvidenceMissing;
    }
    let Some(expected) = record.content_hash() else {
        // No Gate-1 hash to compare against; the gap is already recorded.
        return IntegrityStatus::Valid;
    };
    match gate1_hash_file(path) {
        Ok(actual) if actual == expected => IntegrityStatus::Valid,
        Ok(actual) => IntegrityStatus::Failed {
            expected: expected.to_string(),
            actual,
        },
        Err(_) => IntegrityStatus::EvidenceMissing,
    }
}

/// Verify a seal against freshly recomputed canonical bytes.
#[must_use]
pub fn verify_seal(seal: &Seal, canonical_bytes: &[u8]) -> bool {
    sha512_hex(canonical_bytes) == seal.content_hash
        && watermark(&seal.content_hash, seal.sealed_at_ms) == seal.watermark
}

// =============================================================================
// TESTS
// =============================================================================
