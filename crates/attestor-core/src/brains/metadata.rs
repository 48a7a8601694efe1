//! Metadata completeness analysis.
//!
//! Scores each record against the metadata keys expected for its kind and
//! reports the overall completeness ratio. The ratio is exposed as a
//! finding detail so synthesis can fold it into recommendations without
//! re-reading the evidence.

use crate::brain::Brain;
use crate::types::{EvidenceKind, EvidenceRecord, Finding, ModuleResult, Severity};

/// Completeness ratio below which a record is flagged.
const SPARSE_THRESHOLD: f64 = 0.5;

/// Keys expected for every record regardless of kind.
const COMMON_KEYS: &[&str] = &["custody.acquired_by", "source.origin"];

/// Extra keys expected per kind.
fn expected_keys(kind: EvidenceKind) -> &'static [&'static str] {
    match kind {
        EvidenceKind::Image | EvidenceKind::Video => {
            &["exif.timestamp", "exif.device.make", "exif.device.model"]
        }
        EvidenceKind::Audio => &["exif.timestamp"],
        EvidenceKind::Document | EvidenceKind::Unknown => &[],
    }
}

/// Brain scoring metadata completeness per record.
#[derive(Debug, Default)]
pub struct MetadataBrain;

impl MetadataBrain {
    /// Create the brain.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Brain for MetadataBrain {
    fn name(&self) -> &'static str {
        "metadata"
    }

    fn analyze(&self, evidence: &[EvidenceRecord]) -> ModuleResult {
        let started = std::time::Instant::now();
        if evidence.is_empty() {
            return super::no_evidence_result(self.name(), started);
        }

        let mut findings = Vec::new();
        let mut ratio_sum = 0.0;

        for record in evidence {
            let expected: Vec<&str> = COMMON_KEYS
                .iter()
                .chain(expected_keys(record.kind))
                .copied()
                .collect();
            let present = expected
                .iter()
                .filter(|k| record.metadata.contains_key(**k))
                .count();
            let ratio = if expected.is_empty() {
                1.0
            } else {
                present as f64 / expected.len() as f64
            };
            ratio_sum += ratio;

            if ratio < SPARSE_THRESHOLD {
                findings.push(
                    Finding::new(
                        Severity::Low,
                        "metadata-completeness",
                        format!(
                            "evidence {} ({}) is missing most expected metadata",
                            record.id.0,
                            record.kind.name()
                        ),
                        0.8,
                    )
                    .with_detail("evidence_id", record.id.0)
                    .with_detail("completeness", ratio),
                );
            }
        }

        let overall = ratio_sum / evidence.len() as f64;
        findings.push(
            Finding::new(
                Severity::Info,
                "metadata-summary",
                format!("average metadata completeness {:.0}%", overall * 100.0),
                1.0,
            )
            .with_detail("completeness", overall),
        );

        // Confidence tracks how much metadata there is to reason about.
        let confidence = 0.5 + 0.5 * overall;
        ModuleResult::new(self.name(), confidence, findings, super::elapsed_ms(started))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EvidenceId, MetaValue, now_ms};
    use std::collections::BTreeMap;

    fn record(kind: EvidenceKind, keys: &[&str]) -> EvidenceRecord {
        let mut metadata = BTreeMap::new();
        for key in keys {
            metadata.insert((*key).to_string(), MetaValue::from("x"));
        }
        EvidenceRecord {
            id: EvidenceId(0),
            kind,
            source: "f".to_string(),
            declared_size: 1,
            ingested_at_ms: now_ms(),
            metadata,
        }
    }

    #[test]
    fn complete_image_scores_high() {
        let full = record(
            EvidenceKind::Image,
            &[
                "custody.acquired_by",
                "source.origin",
                "exif.timestamp",
                "exif.device.make",
                "exif.device.model",
            ],
        );
        let result = MetadataBrain::new().analyze(&[full]);
        assert_eq!(result.confidence, 1.0);
        // Only the summary finding.
        assert_eq!(result.findings.len(), 1);
        assert_eq!(result.findings[0].severity, Severity::Info);
    }

    #[test]
    fn sparse_record_is_flagged() {
        let sparse = record(EvidenceKind::Image, &[]);
        let result = MetadataBrain::new().analyze(&[sparse]);
        assert!(result.findings.iter().any(|f| f.category == "metadata-completeness"));
        assert!(result.confidence < 0.6);
    }

    #[test]
    fn summary_carries_completeness_detail() {
        let result = MetadataBrain::new().analyze(&[record(EvidenceKind::Document, &[])]);
        let summary = result
            .findings
            .iter()
            .find(|f| f.category == "metadata-summary")
            .expect("summary");
        assert!(summary.details.get("completeness").and_then(MetaValue::as_number).is_some());
    }

    #[test]
    fn empty_evidence_is_degraded_info() {
        let result = MetadataBrain::new().analyze(&[]);
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.findings[0].severity, Severity::Info);
    }
}
