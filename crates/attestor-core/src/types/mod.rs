//! # Core Type Definitions
//!
//! This module contains all core types for the Attestor evidence pipeline:
//! - Evidence identifiers and records (`EvidenceId`, `EvidenceRecord`, `EvidenceKind`)
//! - Typed metadata values (`MetaValue`)
//! - Analysis output structures (`Severity`, `Finding`, `ModuleResult`)
//! - Synthesis output (`VerdictTier`, `Contradiction`, `SynthesisVerdict`)
//! - Sealing structures (`GeoPoint`, `Seal`, `AuditAction`, `AuditEntry`)
//! - The top-level artifact (`ComplianceSummary`, `ForensicReport`)
//! - Error types (`AttestorError`, `IngestionFailure`, `IntegrityStatus`)
//!
//! ## Immutability Guarantees
//!
//! Evidence records are read-only for the whole pipeline once ingested.
//! Findings and module results are immutable once emitted. A sealed report
//! is never mutated; any later change is detected by seal verification.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

// =============================================================================
// EVIDENCE IDENTIFIERS
// =============================================================================

/// Unique identifier for one piece of evidence within a run.
///
/// Assigned sequentially at ingestion. The Gate-1 content hash stored in the
/// record's metadata is the cross-run stable anchor for the same bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EvidenceId(pub u64);

/// Declared type of an evidence item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EvidenceKind {
    /// Textual or office document.
    Document,
    /// Still image.
    Image,
    /// Audio recording.
    Audio,
    /// Video recording.
    Video,
    /// Type could not be determined; still analyzed.
    Unknown,
}

impl EvidenceKind {
    /// Get the kind name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            EvidenceKind::Document => "document",
            EvidenceKind::Image => "image",
            EvidenceKind::Audio => "audio",
            EvidenceKind::Video => "video",
            EvidenceKind::Unknown => "unknown",
        }
    }
}

// =============================================================================
// METADATA VALUES
// =============================================================================

/// A typed metadata value.
///
/// Evidence metadata and finding details are open key→value maps, but the
/// values are tagged rather than untyped: read sites pattern-match instead
/// of casting, and brains stay decoupled without a rigid shared schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MetaValue {
    /// UTF-8 text.
    Text(String),
    /// Numeric value (counts, sizes, coordinates, ratios).
    Number(f64),
    /// Boolean flag.
    Bool(bool),
    /// Ordered list of values.
    List(Vec<MetaValue>),
    /// Nested map, sorted by key for deterministic serialization.
    Map(BTreeMap<String, MetaValue>),
}

impl MetaValue {
    /// Get the value as text, if it is text.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            MetaValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Get the value as a number, if it is numeric.
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            MetaValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Get the value as a boolean, if it is one.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            MetaValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl From<&str> for MetaValue {
    fn from(s: &str) -> Self {
        MetaValue::Text(s.to_string())
    }
}

impl From<String> for MetaValue {
    fn from(s: String) -> Self {
        MetaValue::Text(s)
    }
}

impl From<f64> for MetaValue {
    fn from(n: f64) -> Self {
        MetaValue::Number(n)
    }
}

impl From<u64> for MetaValue {
    fn from(n: u64) -> Self {
        MetaValue::Number(n as f64)
    }
}

impl From<bool> for MetaValue {
    fn from(b: bool) -> Self {
        MetaValue::Bool(b)
    }
}

/// Metadata key under which the Gate-1 content hash is stored.
pub const META_CONTENT_HASH: &str = "integrity.sha512";

// =============================================================================
// EVIDENCE RECORD
// =============================================================================

/// One immutable piece of evidence.
///
/// Produced by ingestion (Gate 1), read-only for the remainder of the
/// pipeline. No brain may mutate a record; the orchestrator hands out
/// shared references only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceRecord {
    /// Unique, stable identifier within the run.
    pub id: EvidenceId,
    /// Declared evidence type.
    pub kind: EvidenceKind,
    /// Storage reference (file path or URI) for the raw bytes.
    pub source: String,
    /// Declared size in bytes at ingestion time.
    pub declared_size: u64,
    /// Ingestion timestamp, unix milliseconds.
    pub ingested_at_ms: u64,
    /// Open typed metadata. The Gate-1 hash lives under
    /// [`META_CONTENT_HASH`] when it could be computed.
    pub metadata: BTreeMap<String, MetaValue>,
}

impl EvidenceRecord {
    /// The Gate-1 content hash, if one was computed at ingestion.
    #[must_use]
    pub fn content_hash(&self) -> Option<&str> {
        self.metadata.get(META_CONTENT_HASH).and_then(MetaValue::as_text)
    }

    /// Whether this record carries a recorded integrity gap
    /// (ingested without a computable Gate-1 hash).
    #[must_use]
    pub fn has_integrity_gap(&self) -> bool {
        self.content_hash().is_none()
    }
}

// =============================================================================
// FINDINGS
// =============================================================================

/// Severity of a finding. Ordered: Info < Low < Medium < High < Critical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    /// Informational; no trust impact.
    Info,
    /// Minor irregularity.
    Low,
    /// Notable irregularity.
    Medium,
    /// Strong tamper or inconsistency indicator.
    High,
    /// Definitive problem; drives contradiction extraction and verdicts.
    Critical,
}

impl Severity {
    /// Get the severity name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

/// A single typed finding emitted by a brain. Immutable once emitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    /// Severity of the finding.
    pub severity: Severity,
    /// Free-text category label. Findings across brains that share a
    /// category participate in contradiction extraction.
    pub category: String,
    /// Human-readable description.
    pub description: String,
    /// Confidence in [0, 1].
    pub confidence: f64,
    /// Open typed details.
    pub details: BTreeMap<String, MetaValue>,
}

impl Finding {
    /// Create a finding with no details.
    #[must_use]
    pub fn new(
        severity: Severity,
        category: impl Into<String>,
        description: impl Into<String>,
        confidence: f64,
    ) -> Self {
        Self {
            severity,
            category: category.into(),
            description: description.into(),
            confidence: confidence.clamp(0.0, 1.0),
            details: BTreeMap::new(),
        }
    }

    /// Attach a detail entry.
    #[must_use]
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<MetaValue>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }
}

// =============================================================================
// MODULE RESULT
// =============================================================================

/// The complete output of one brain for one run.
///
/// One is produced per brain per run; a run carries exactly eight of these
/// plus the synthesis engine's own result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleResult {
    /// Name of the producing module.
    pub module: String,
    /// Overall confidence in [0, 1]. Derived by the module; not
    /// necessarily the max of its findings.
    pub confidence: f64,
    /// Ordered findings.
    pub findings: Vec<Finding>,
    /// Completion timestamp, unix milliseconds.
    pub completed_at_ms: u64,
    /// Elapsed processing time in milliseconds.
    pub elapsed_ms: u64,
}

impl ModuleResult {
    /// Create a result from findings, stamping the current time.
    #[must_use]
    pub fn new(
        module: impl Into<String>,
        confidence: f64,
        findings: Vec<Finding>,
        elapsed_ms: u64,
    ) -> Self {
        Self {
            module: module.into(),
            confidence: confidence.clamp(0.0, 1.0),
            findings,
            completed_at_ms: now_ms(),
            elapsed_ms,
        }
    }

    /// Degraded result per the brain error policy: a module that cannot
    /// produce a meaningful result reports a single Critical finding with
    /// the failure reason, confidence 0. Never aborts the run.
    #[must_use]
    pub fn degraded(module: impl Into<String>, reason: impl Into<String>) -> Self {
        let module = module.into();
        let finding = Finding::new(
            Severity::Critical,
            "module-degraded",
            format!("module '{module}' produced no usable result"),
            0.0,
        )
        .with_detail("reason", reason.into());
        Self {
            module,
            confidence: 0.0,
            findings: vec![finding],
            completed_at_ms: now_ms(),
            elapsed_ms: 0,
        }
    }

    /// Whether any finding is Critical.
    #[must_use]
    pub fn has_critical(&self) -> bool {
        self.findings.iter().any(|f| f.severity == Severity::Critical)
    }
}

// =============================================================================
// SYNTHESIS OUTPUT
// =============================================================================

/// Final verdict tier, derived from trust index and consensus.
///
/// Ordered lowest-certainty first so that `min` between two candidate
/// tiers always picks the conservative one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum VerdictTier {
    /// Trust and consensus below the conditional thresholds.
    Inconclusive,
    /// Moderate trust and consensus.
    Conditional,
    /// High trust and cross-module agreement.
    Verified,
}

impl VerdictTier {
    /// Get the tier name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            VerdictTier::Inconclusive => "Inconclusive",
            VerdictTier::Conditional => "Conditional",
            VerdictTier::Verified => "Verified",
        }
    }
}

/// A pair of findings from different modules that disagree about severity
/// within the same category, with at least one Critical.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contradiction {
    /// The shared category label.
    pub category: String,
    /// First source module name.
    pub module_a: String,
    /// Severity reported by the first module.
    pub severity_a: Severity,
    /// Second source module name.
    pub module_b: String,
    /// Severity reported by the second module.
    pub severity_b: Severity,
}

/// Aggregate verdict computed by the synthesis engine from the eight
/// independent module results. Never persisted outside a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisVerdict {
    /// Aggregate trust index, 0–100.
    pub trust_index: f64,
    /// Verdict tier.
    pub tier: VerdictTier,
    /// Cross-module consensus score in [0, 1].
    pub consensus: f64,
    /// Key findings ranked by severity then confidence.
    pub key_findings: Vec<Finding>,
    /// Detected cross-module contradictions.
    pub contradictions: Vec<Contradiction>,
    /// Deterministic recommendations.
    pub recommendations: Vec<String>,
}

// =============================================================================
// AUDIT LOG ENTRIES
// =============================================================================

/// Action tag of an audit entry. One entry per gate transition is the
/// compliance requirement; run lifecycle events are logged alongside.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AuditAction {
    /// Run accepted and started.
    RunStarted,
    /// Gate 1: evidence content hash computed and stored.
    Gate1Sealed,
    /// Gate 1: hash could not be computed; integrity gap recorded.
    Gate1Gap,
    /// Gate 2: module invocation started (input hash recorded).
    Gate2Start,
    /// Gate 2: module invocation completed (output hash recorded).
    Gate2End,
    /// Gate 3: final report seal computed.
    Gate3Sealed,
    /// Run completed with a sealed report.
    RunCompleted,
    /// Run aborted by an orchestrator-level failure.
    RunFailed,
}

impl AuditAction {
    /// Get the action tag as text.
    #[must_use]
    pub fn tag(&self) -> &'static str {
        match self {
            AuditAction::RunStarted => "run-started",
            AuditAction::Gate1Sealed => "gate1-sealed",
            AuditAction::Gate1Gap => "gate1-gap",
            AuditAction::Gate2Start => "gate2-start",
            AuditAction::Gate2End => "gate2-end",
            AuditAction::Gate3Sealed => "gate3-sealed",
            AuditAction::RunCompleted => "run-completed",
            AuditAction::RunFailed => "run-failed",
        }
    }
}

/// One append-only audit entry. Never edited or deleted.
///
/// Total order is (timestamp, seq): wall clock first, with the insertion
/// sequence breaking ties between concurrent writers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Insertion sequence, unique per log.
    pub seq: u64,
    /// Wall-clock timestamp, unix milliseconds.
    pub timestamp_ms: u64,
    /// Action tag.
    pub action: AuditAction,
    /// Subject: evidence id, module name, or report id.
    pub subject: String,
    /// Free-text detail (hashes for Gate 2, reasons for gaps).
    pub detail: String,
}

// =============================================================================
// SEAL
// =============================================================================

/// A geolocation. Modeled explicitly as an optional field wherever it
/// appears, so a valid (0, 0) coordinate is never read as "absent".
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
}

/// The final tamper-evident seal, produced exactly once per report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Seal {
    /// SHA-512 hash (hex) over the canonical report bytes.
    pub content_hash: String,
    /// Sealing timestamp, unix milliseconds.
    pub sealed_at_ms: u64,
    /// Optional sealing location.
    pub location: Option<GeoPoint>,
    /// Compact attestation payload for external scanning.
    pub attestation: String,
    /// Derived BLAKE3 watermark.
    pub watermark: String,
}

// =============================================================================
// FORENSIC REPORT
// =============================================================================

/// Compliance-check summary, recomputed from the audit log and verdict.
/// Each field is a recorded fact; the overall flag is their logical AND.
/// A violation is surfaced as data, never thrown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceSummary {
    /// All eight non-synthesis modules ran (Gate-2 start/end pairs present).
    pub all_modules_ran: bool,
    /// Consensus reached the agreement threshold.
    pub consensus_reached: bool,
    /// Every gate has at least one corresponding audit entry.
    pub gates_logged: bool,
}

impl ComplianceSummary {
    /// Overall compliance: AND of all recorded checks.
    #[must_use]
    pub fn compliant(&self) -> bool {
        self.all_modules_ran && self.consensus_reached && self.gates_logged
    }
}

/// The top-level persisted artifact. Immutable once sealed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForensicReport {
    /// Report identifier.
    pub id: String,
    /// The analyzed evidence set.
    pub evidence: Vec<EvidenceRecord>,
    /// All nine module results (eight independent + synthesis).
    pub module_results: Vec<ModuleResult>,
    /// The synthesis verdict.
    pub verdict: SynthesisVerdict,
    /// The Gate-3 seal.
    pub seal: Seal,
    /// Generation timestamp, unix milliseconds.
    pub generated_at_ms: u64,
    /// Compliance-check summary.
    pub compliance: ComplianceSummary,
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Per-item ingestion failure reason, reported to the ingestion caller.
/// One failing item never blocks the others.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IngestionFailure {
    /// The evidence file could not be read.
    FileUnreadable,
    /// The declared type could not be mapped to a supported kind.
    UnsupportedType,
}

impl std::fmt::Display for IngestionFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IngestionFailure::FileUnreadable => write!(f, "file unreadable"),
            IngestionFailure::UnsupportedType => write!(f, "unsupported type"),
        }
    }
}

/// Outcome of verifying a stored Gate-1 hash against current file bytes.
///
/// All three outcomes are distinct and explicit; verification is idempotent
/// and side-effect-free.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntegrityStatus {
    /// Recomputed hash matches the stored one.
    Valid,
    /// Recomputed hash differs: detected-tamper event.
    Failed {
        /// Hash stored at Gate 1.
        expected: String,
        /// Hash recomputed from current bytes.
        actual: String,
    },
    /// The referenced file no longer exists.
    EvidenceMissing,
}

/// Errors that can cross the pipeline boundary.
///
/// Module-level problems never appear here: a failing brain is absorbed
/// into a degraded [`ModuleResult`]. Only structural failures propagate.
#[derive(Debug, Error)]
pub enum AttestorError {
    /// A structural orchestrator failure outside any module. The only
    /// error that aborts sealing; recorded audit entries are still kept.
    #[error("orchestrator failure: {0}")]
    Orchestrator(String),

    /// A serialization or canonicalization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// An I/O error.
    #[error("I/O error: {0}")]
    Io(String),

    /// A report-store error.
    #[error("storage error: {0}")]
    Storage(String),

    /// The requested report was not found in the store.
    #[error("report not found: {0}")]
    ReportNotFound(String),

    /// An attempt to overwrite a sealed, stored report.
    #[error("report already sealed and stored: {0}")]
    ReportAlreadySealed(String),
}

// =============================================================================
// TIME
// =============================================================================

/// Current wall-clock time as unix milliseconds.
///
/// Clocks before the epoch collapse to 0 rather than failing; audit entry
/// ordering then falls back to the insertion sequence.
#[must_use]
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_or(0, |d| d.as_millis() as u64)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn severity_is_ordered() {
        assert!(Severity::Info < Severity::Low);
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::High);
        assert!(Severity::High < Severity::Critical);
    }

    #[test]
    fn finding_confidence_is_clamped() {
        let high = Finding::new(Severity::Low, "c", "d", 1.7);
        let low = Finding::new(Severity::Low, "c", "d", -0.2);
        assert_eq!(high.confidence, 1.0);
        assert_eq!(low.confidence, 0.0);
    }

    #[test]
    fn degraded_result_is_critical_zero_confidence() {
        let result = ModuleResult::degraded("timeline", "deadline exceeded");
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.findings.len(), 1);
        assert_eq!(result.findings[0].severity, Severity::Critical);
        assert!(result.has_critical());
        assert_eq!(
            result.findings[0]
                .details
                .get("reason")
                .and_then(MetaValue::as_text),
            Some("deadline exceeded")
        );
    }

    #[test]
    fn meta_value_pattern_access() {
        let v = MetaValue::Number(42.0);
        assert_eq!(v.as_number(), Some(42.0));
        assert_eq!(v.as_text(), None);
        assert_eq!(MetaValue::from("x").as_text(), Some("x"));
        assert_eq!(MetaValue::from(true).as_bool(), Some(true));
    }

    #[test]
    fn content_hash_read_through_metadata() {
        let mut metadata = BTreeMap::new();
        metadata.insert(META_CONTENT_HASH.to_string(), MetaValue::from("abc123"));
        let record = EvidenceRecord {
            id: EvidenceId(1),
            kind: EvidenceKind::Image,
            source: "img.jpg".to_string(),
            declared_size: 10,
            ingested_at_ms: now_ms(),
            metadata,
        };
        assert_eq!(record.content_hash(), Some("abc123"));
        assert!(!record.has_integrity_gap());
    }

    #[test]
    fn compliance_is_logical_and() {
        let full = ComplianceSummary {
            all_modules_ran: true,
            consensus_reached: true,
            gates_logged: true,
        };
        assert!(full.compliant());

        let partial = ComplianceSummary {
            consensus_reached: false,
            ..full
        };
        assert!(!partial.compliant());
    }

    #[test]
    fn verdict_tier_min_is_conservative() {
        assert_eq!(
            VerdictTier::Verified.min(VerdictTier::Conditional),
            VerdictTier::Conditional
        );
        assert_eq!(
            VerdictTier::Conditional.min(VerdictTier::Inconclusive),
            VerdictTier::Inconclusive
        );
    }
}
