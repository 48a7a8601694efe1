//! # attestor-core
//!
//! The forensic evidence analysis pipeline - THE LOGIC.
//!
//! This crate implements the full analysis run: evidence ingestion with
//! Gate-1 sealing, eight independent analysis modules executing
//! concurrently behind a strict synthesis barrier, consensus-based
//! verdict synthesis, and Gate-3 cryptographic sealing of the final
//! report with an append-only audit trail throughout.
//!
//! ## Architectural Constraints
//!
//! - Module results are independent: no module sees another's output
//!   before synthesis.
//! - Everything downstream of the barrier is deterministic: the same
//!   nine results produce the same verdict regardless of completion
//!   order or thread scheduling.
//! - A module failure is never a run failure; it degrades into a
//!   critical finding and the pipeline continues.
//! - Canonical postcard bytes are the source of truth for seal
//!   verification; JSON output is a human-facing view only.

// =============================================================================
// MODULES
// =============================================================================

pub mod audit;
pub mod brain;
pub mod brains;
pub mod config;
pub mod ingest;
pub mod orchestrator;
pub mod report;
pub mod sealing;
pub mod storage;
pub mod synthesis;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    AttestorError, AuditAction, AuditEntry, ComplianceSummary, Contradiction, EvidenceId,
    EvidenceKind, EvidenceRecord, Finding, ForensicReport, GeoPoint, IngestionFailure,
    IntegrityStatus, META_CONTENT_HASH, MetaValue, ModuleResult, Seal, Severity,
    SynthesisVerdict, VerdictTier, now_ms,
};

// =============================================================================
// RE-EXPORTS: Pipeline
// =============================================================================

pub use audit::{AuditLog, export_text};
pub use brain::{Brain, BrainRegistry};
pub use config::{BrainConfig, PipelineConfig, SynthesisConfig};
pub use ingest::{IngestItem, IngestOutcome, Ingestor, MAX_EVIDENCE_FILE_SIZE};
pub use orchestrator::{Orchestrator, ProgressObserver, ProgressSnapshot, RunState};
pub use report::{ReportAssembler, canonical_bytes, report_canonical_bytes, verify_report};
pub use synthesis::{SYNTHESIS_MODULE, SynthesisEngine};

// =============================================================================
// RE-EXPORTS: Sealing & Storage
// =============================================================================

pub use sealing::{
    compute_seal, decode_attestation, gate1_hash_file, verify_evidence, verify_seal,
};
pub use storage::ReportStore;
