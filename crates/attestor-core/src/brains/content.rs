//! Textual metadata keyword scan.
//!
//! Scans every textual metadata value for terms that suggest fabricated or
//! manipulated material. The built-in list can be extended through
//! configuration; matching is case-insensitive substring search over a
//! bounded metadata volume, so the scan always terminates quickly.

use crate::brain::Brain;
use crate::types::{EvidenceRecord, Finding, MetaValue, ModuleResult, Severity};

/// Built-in suspicious terms.
const BUILTIN_KEYWORDS: &[&str] = &[
    "forged",
    "fabricated",
    "tampered",
    "deepfake",
    "synthetic",
    "spoofed",
    "staged",
];

/// Brain scanning textual metadata for suspicious keywords.
#[derive(Debug)]
pub struct ContentBrain {
    keywords: Vec<String>,
}

impl ContentBrain {
    /// Create the brain with extra keywords on top of the built-in list.
    #[must_use]
    pub fn new(extra: Vec<String>) -> Self {
        let mut keywords: Vec<String> =
            BUILTIN_KEYWORDS.iter().map(|s| (*s).to_string()).collect();
        keywords.extend(extra.into_iter().map(|s| s.to_ascii_lowercase()));
        Self { keywords }
    }
}

/// Collect all text leaves of a metadata value, lowercased.
fn text_leaves(value: &MetaValue, out: &mut Vec<String>) {
    match value {
        MetaValue::Text(s) => out.push(s.to_ascii_lowercase()),
        MetaValue::List(items) => {
            for item in items {
                text_leaves(item, out);
            }
        }
        MetaValue::Map(map) => {
            for item in map.values() {
                text_leaves(item, out);
            }
        }
        MetaValue::Number(_) | MetaValue::Bool(_) => {}
    }
}

impl Brain for ContentBrain {
    fn name(&self) -> &'static str {
        "content"
    }

    fn analyze(&self, evidence: &[EvidenceRecord]) -> ModuleResult {
        let started = std::time::Instant::now();
        if evidence.is_empty() {
            return super::no_evidence_result(self.name(), started);
        }

        let mut findings = Vec::new();

        for record in evidence {
            let mut leaves = Vec::new();
            for value in record.metadata.values() {
                text_leaves(value, &mut leaves);
            }
            for keyword in &self.keywords {
                if leaves.iter().any(|leaf| leaf.contains(keyword)) {
                    findings.push(
                        Finding::new(
                            Severity::Medium,
                            "content-keyword",
                            format!(
                                "evidence {} metadata mentions '{keyword}'",
                                record.id.0
                            ),
                            0.75,
                        )
                        .with_detail("evidence_id", record.id.0)
                        .with_detail("keyword", keyword.clone()),
                    );
                }
            }
        }

        let confidence = (0.9 - 0.15 * findings.len() as f64).clamp(0.1, 1.0);
        ModuleResult::new(self.name(), confidence, findings, super::elapsed_ms(started))
    }
}
