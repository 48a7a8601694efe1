//! Capture-device consistency.
//!
//! Looks at EXIF device and software fields on image and video evidence.
//! Known editing software in the processing chain is a strong manipulation
//! indicator; missing device attribution weakens provenance.

use crate::brain::Brain;
use crate::types::{EvidenceKind, EvidenceRecord, Finding, MetaValue, ModuleResult, Severity};

/// Software names that indicate post-capture editing.
const EDITING_SOFTWARE: &[&str] = &["photoshop", "gimp", "lightroom", "affinity", "pixelmator"];

/// Brain checking EXIF device and software fields.
#[derive(Debug, Default)]
pub struct DeviceBrain;

impl DeviceBrain {
    /// Create the brain.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Brain for DeviceBrain {
    fn name(&self) -> &'static str {
        "device"
    }

    fn analyze(&self, evidence: &[EvidenceRecord]) -> ModuleResult {
        let started = std::time::Instant::now();
        if evidence.is_empty() {
            return super::no_evidence_result(self.name(), started);
        }

        let mut findings = Vec::new();
        let mut visual = 0usize;
        let mut attributed = 0usize;

        for record in evidence {
            if !matches!(record.kind, EvidenceKind::Image | EvidenceKind::Video) {
                continue;
            }
            visual += 1;

            let has_device = record.metadata.contains_key("exif.device.make")
                && record.metadata.contains_key("exif.device.model");
            if has_device {
                attributed += 1;
            } else {
                findings.push(
                    Finding::new(
                        Severity::Low,
                        "device",
                        format!("evidence {} lacks capture-device attribution", record.id.0),
                        0.7,
                    )
                    .with_detail("evidence_id", record.id.0),
                );
            }

            if let Some(software) = record.metadata.get("exif.software").and_then(MetaValue::as_text)
            {
                let lowered = software.to_ascii_lowercase();
                if EDITING_SOFTWARE.iter().any(|s| lowered.contains(s)) {
                    findings.push(
                        Finding::new(
                            Severity::High,
                            "manipulation",
                            format!(
                                "evidence {} was processed by editing software '{software}'",
                                record.id.0
                            ),
                            0.9,
                        )
                        .with_detail("evidence_id", record.id.0)
                        .with_detail("software", software),
                    );
                }
            }
        }

        // No visual evidence means nothing in scope: confident no-op.
        let confidence = if visual == 0 {
            0.9
        } else {
            let attribution = attributed as f64 / visual as f64;
            let edited = findings.iter().filter(|f| f.category == "manipulation").count();
            (0.4 + 0.6 * attribution - 0.2 * edited as f64).clamp(0.0, 1.0)
        };

        ModuleResult::new(self.name(), confidence, findings, super::elapsed_ms(started))
    }
}
