//! Provenance and duplication checks.
//!
//! Two signals: identical Gate-1 hashes on records presented as distinct
//! evidence, and declared kinds that disagree with what the storage
//! reference's extension implies.

use crate::brain::Brain;
use crate::ingest::infer_kind;
use crate::types::{EvidenceKind, EvidenceRecord, Finding, ModuleResult, Severity};
use std::collections::BTreeMap;
use std::path::Path;

/// Brain checking duplicate content and type/extension agreement.
#[derive(Debug, Default)]
pub struct ProvenanceBrain;

impl ProvenanceBrain {
    /// Create the brain.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Brain for ProvenanceBrain {
    fn name(&self) -> &'static str {
        "provenance"
    }

    fn analyze(&self, evidence: &[EvidenceRecord]) -> ModuleResult {
        let started = std::time::Instant::now();
        if evidence.is_empty() {
            return super::no_evidence_result(self.name(), started);
        }

        let mut findings = Vec::new();

        // Duplicate content presented as distinct evidence.
        let mut by_hash: BTreeMap<&str, Vec<u64>> = BTreeMap::new();
        for record in evidence {
            if let Some(hash) = record.content_hash() {
                by_hash.entry(hash).or_default().push(record.id.0);
            }
        }
        for (hash, ids) in by_hash {
            if ids.len() > 1 {
                findings.push(
                    Finding::new(
                        Severity::High,
                        "provenance",
                        format!(
                            "{} evidence items share identical content (ids {:?})",
                            ids.len(),
                            ids
                        ),
                        0.9,
                    )
                    .with_detail("hash_prefix", hash.chars().take(16).collect::<String>()),
                );
            }
        }

        // Declared kind vs what the file extension implies.
        for record in evidence {
            let implied = infer_kind(Path::new(&record.source));
            if implied != EvidenceKind::Unknown
                && record.kind != EvidenceKind::Unknown
                && implied != record.kind
            {
                findings.push(
                    Finding::new(
                        Severity::Medium,
                        "provenance",
                        format!(
                            "evidence {} declared as {} but its reference implies {}",
                            record.id.0,
                            record.kind.name(),
                            implied.name()
                        ),
                        0.8,
                    )
                    .with_detail("evidence_id", record.id.0),
                );
            }
        }

        let confidence = (0.95 - 0.2 * findings.len() as f64).clamp(0.1, 1.0);
        ModuleResult::new(self.name(), confidence, findings, super::elapsed_ms(started))
    }
}
