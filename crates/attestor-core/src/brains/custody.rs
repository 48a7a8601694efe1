//! Chain-of-custody field checks.
//!
//! Evidence without a recorded acquirer and acquisition method has a weak
//! custody chain; an acquisition timestamp after ingestion is contradictory
//! and reported High.

use crate::brain::Brain;
use crate::types::{EvidenceRecord, Finding, MetaValue, ModuleResult, Severity};

/// Brain validating chain-of-custody metadata.
#[derive(Debug, Default)]
pub struct CustodyBrain;

impl CustodyBrain {
    /// Create the brain.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Brain for CustodyBrain {
    fn name(&self) -> &'static str {
        "custody"
    }

    fn analyze(&self, evidence: &[EvidenceRecord]) -> ModuleResult {
        let started = std::time::Instant::now();
        if evidence.is_empty() {
            return super::no_evidence_result(self.name(), started);
        }

        let mut findings = Vec::new();
        let mut documented = 0usize;

        for record in evidence {
            let has_acquirer = record.metadata.contains_key("custody.acquired_by");
            let has_method = record.metadata.contains_key("custody.method");

            if has_acquirer && has_method {
                documented += 1;
            } else {
                findings.push(
                    Finding::new(
                        Severity::Medium,
                        "chain-of-custody",
                        format!(
                            "evidence {} has an undocumented custody chain",
                            record.id.0
                        ),
                        0.8,
                    )
                    .with_detail("evidence_id", record.id.0)
                    .with_detail("has_acquirer", has_acquirer)
                    .with_detail("has_method", has_method),
                );
            }

            if let Some(acquired_s) = record
                .metadata
                .get("custody.acquired_at")
                .and_then(MetaValue::as_number)
            {
                let ingested_s = record.ingested_at_ms as f64 / 1000.0;
                if acquired_s > ingested_s {
                    findings.push(
                        Finding::new(
                            Severity::High,
                            "chain-of-custody",
                            format!(
                                "evidence {} claims acquisition after ingestion",
                                record.id.0
                            ),
                            0.9,
                        )
                        .with_detail("evidence_id", record.id.0),
                    );
                }
            }
        }

        let coverage = documented as f64 / evidence.len() as f64;
        let confidence = (0.3 + 0.7 * coverage).clamp(0.0, 1.0);
        ModuleResult::new(self.name(), confidence, findings, super::elapsed_ms(started))
    }
}
