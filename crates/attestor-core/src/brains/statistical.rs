//! File-size outlier detection.
//!
//! Flags evidence whose declared size is a far outlier within its kind,
//! using the modified z-score over the median absolute deviation. Robust
//! to the small, skewed samples a typical evidence batch produces.

use crate::brain::Brain;
use crate::types::{EvidenceKind, EvidenceRecord, Finding, ModuleResult, Severity};
use std::collections::BTreeMap;

/// Modified z-score above which a size is an outlier.
const OUTLIER_Z: f64 = 3.5;

/// Scale factor relating MAD to the standard deviation of a normal sample.
const MAD_SCALE: f64 = 0.6745;

/// Brain detecting size outliers per evidence kind.
#[derive(Debug, Default)]
pub struct StatisticalBrain;

impl StatisticalBrain {
    /// Create the brain.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

/// Median of a non-empty, sorted slice.
fn median(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}

impl Brain for StatisticalBrain {
    fn name(&self) -> &'static str {
        "statistical"
    }

    fn analyze(&self, evidence: &[EvidenceRecord]) -> ModuleResult {
        let started = std::time::Instant::now();
        if evidence.is_empty() {
            return super::no_evidence_result(self.name(), started);
        }

        let mut by_kind: BTreeMap<EvidenceKind, Vec<&EvidenceRecord>> = BTreeMap::new();
        for record in evidence {
            by_kind.entry(record.kind).or_default().push(record);
        }

        let mut findings = Vec::new();
        let mut checked = 0usize;

        for (kind, group) in &by_kind {
            // Too few samples for a meaningful deviation.
            if group.len() < 4 {
                continue;
            }
            checked += group.len();

            let mut sizes: Vec<f64> = group.iter().map(|r| r.declared_size as f64).collect();
            sizes.sort_by(f64::total_cmp);
            let med = median(&sizes);
            let mut deviations: Vec<f64> = sizes.iter().map(|s| (s - med).abs()).collect();
            deviations.sort_by(f64::total_cmp);
            let mad = median(&deviations);
            if mad == 0.0 {
                continue;
            }

            for record in group {
                let z = MAD_SCALE * (record.declared_size as f64 - med).abs() / mad;
                if z > OUTLIER_Z {
                    findings.push(
                        Finding::new(
                            Severity::Medium,
                            "size-anomaly",
                            format!(
                                "evidence {} is a size outlier among {} items ({})",
                                record.id.0,
                                group.len(),
                                kind.name()
                            ),
                            0.7,
                        )
                        .with_detail("evidence_id", record.id.0)
                        .with_detail("modified_z", z)
                        .with_detail("median_bytes", med),
                    );
                }
            }
        }

        // Small batches give the statistics little to work with.
        let confidence = if checked == 0 {
            0.5
        } else {
            (0.9 - 0.1 * findings.len() as f64).clamp(0.2, 1.0)
        };
        ModuleResult::new(self.name(), confidence, findings, super::elapsed_ms(started))
    }
}
