//! Evidence integrity coverage.
//!
//! Checks that each record carries its Gate-1 content hash and that the
//! declared size is sane. Records with an ingestion-time integrity gap are
//! reported High: the evidence is still analyzed, but downstream consensus
//! should know its provenance is weaker.

use crate::brain::Brain;
use crate::types::{EvidenceRecord, Finding, ModuleResult, Severity};

/// Brain checking Gate-1 hash coverage and declared sizes.
#[derive(Debug, Default)]
pub struct IntegrityBrain;

impl IntegrityBrain {
    /// Create the brain.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Brain for IntegrityBrain {
    fn name(&self) -> &'static str {
        "integrity"
    }

    fn analyze(&self, evidence: &[EvidenceRecord]) -> ModuleResult {
        let started = std::time::Instant::now();
        if evidence.is_empty() {
            return super::no_evidence_result(self.name(), started);
        }

        let mut findings = Vec::new();
        let mut hashed = 0usize;

        for record in evidence {
            if record.has_integrity_gap() {
                findings.push(
                    Finding::new(
                        Severity::High,
                        "integrity",
                        format!("evidence {} has no content hash (integrity gap)", record.id.0),
                        0.9,
                    )
                    .with_detail("evidence_id", record.id.0),
                );
            } else {
                hashed += 1;
            }

            if record.declared_size == 0 {
                findings.push(
                    Finding::new(
                        Severity::Low,
                        "integrity",
                        format!("evidence {} declares a zero-byte payload", record.id.0),
                        0.7,
                    )
                    .with_detail("evidence_id", record.id.0),
                );
            }
        }

        let coverage = hashed as f64 / evidence.len() as f64;
        ModuleResult::new(self.name(), coverage, findings, super::elapsed_ms(started))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EvidenceId, EvidenceKind, META_CONTENT_HASH, MetaValue, now_ms};
    use std::collections::BTreeMap;

    fn record(id: u64, hashed: bool, size: u64) -> EvidenceRecord {
        let mut metadata = BTreeMap::new();
        if hashed {
            metadata.insert(META_CONTENT_HASH.to_string(), MetaValue::from("deadbeef"));
        }
        EvidenceRecord {
            id: EvidenceId(id),
            kind: EvidenceKind::Document,
            source: format!("{id}.txt"),
            declared_size: size,
            ingested_at_ms: now_ms(),
            metadata,
        }
    }

    #[test]
    fn full_coverage_full_confidence() {
        let result = IntegrityBrain::new().analyze(&[record(0, true, 10), record(1, true, 20)]);
        assert_eq!(result.confidence, 1.0);
        assert!(result.findings.is_empty());
    }

    #[test]
    fn integrity_gap_is_high_severity() {
        let result = IntegrityBrain::new().analyze(&[record(0, false, 10)]);
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.findings[0].severity, Severity::High);
        assert_eq!(result.findings[0].category, "integrity");
    }

    #[test]
    fn zero_size_is_low_severity() {
        let result = IntegrityBrain::new().analyze(&[record(0, true, 0)]);
        assert!(result.findings.iter().any(|f| f.severity == Severity::Low));
    }

    #[test]
    fn confidence_is_hash_coverage_fraction() {
        let result = IntegrityBrain::new().analyze(&[
            record(0, true, 1),
            record(1, true, 1),
            record(2, false, 1),
            record(3, false, 1),
        ]);
        assert_eq!(result.confidence, 0.5);
    }
}
