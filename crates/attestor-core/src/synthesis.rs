//! # Synthesis / Consensus Engine
//!
//! The ninth module: consumes the eight independent module results and
//! produces the aggregate verdict. Everything here is a pure function of
//! the inputs and the configured thresholds; two runs over the same
//! results produce identical verdicts regardless of completion order.
//!
//! Design notes that must survive refactors:
//! - The trust index blends the mean confidence with the **minimum**
//!   confidence (default 0.7/0.3) so a single failing module cannot be
//!   diluted away by seven confident ones.
//! - Tier derivation is conservative: when the trust index and the
//!   consensus disagree about the tier, the lower tier wins.

use crate::config::SynthesisConfig;
use crate::types::{
    Contradiction, Finding, MetaValue, ModuleResult, Severity, SynthesisVerdict, VerdictTier,
    now_ms,
};

/// Module name the synthesis engine reports under.
pub const SYNTHESIS_MODULE: &str = "synthesis";

/// Maximum ranked key findings carried into the verdict.
const MAX_KEY_FINDINGS: usize = 10;

/// The consensus engine.
#[derive(Debug, Clone, Default)]
pub struct SynthesisEngine {
    config: SynthesisConfig,
}

impl SynthesisEngine {
    /// Create an engine with the given thresholds.
    #[must_use]
    pub fn new(config: SynthesisConfig) -> Self {
        Self { config }
    }

    /// Compute the verdict and the engine's own module result.
    #[must_use]
    pub fn synthesize(&self, results: &[ModuleResult]) -> (SynthesisVerdict, ModuleResult) {
        let started = std::time::Instant::now();

        let trust_index = self.trust_index(results);
        let consensus = self.consensus(results);
        let tier = self.tier(trust_index, consensus);
        let contradictions = extract_contradictions(results);
        let key_findings = rank_key_findings(results);
        let recommendations = self.recommendations(results, consensus, &contradictions);

        let verdict = SynthesisVerdict {
            trust_index,
            tier,
            consensus,
            key_findings,
            contradictions,
            recommendations,
        };

        let summary = Finding::new(
            Severity::Info,
            "synthesis-summary",
            format!(
                "trust index {:.1}, consensus {:.2}, verdict {}",
                verdict.trust_index,
                verdict.consensus,
                verdict.tier.name()
            ),
            1.0,
        )
        .with_detail("trust_index", verdict.trust_index)
        .with_detail("consensus", verdict.consensus);

        let result = ModuleResult {
            module: SYNTHESIS_MODULE.to_string(),
            confidence: consensus,
            findings: vec![summary],
            completed_at_ms: now_ms(),
            elapsed_ms: started.elapsed().as_millis() as u64,
        };

        (verdict, result)
    }

    /// Weighted mean/min combination, scaled to 0–100.
    ///
    /// Float addition is not associative, so the confidences are sorted
    /// before summing; the index is bit-identical for any ordering of the
    /// same results.
    #[must_use]
    pub fn trust_index(&self, results: &[ModuleResult]) -> f64 {
        if results.is_empty() {
            return 0.0;
        }
        let mut confidences: Vec<f64> = results.iter().map(|r| r.confidence).collect();
        confidences.sort_unstable_by(f64::total_cmp);
        let mean = confidences.iter().sum::<f64>() / confidences.len() as f64;
        let min = confidences[0];
        ((self.config.mean_weight * mean + self.config.min_weight * min) * 100.0).clamp(0.0, 100.0)
    }

    /// Consensus: mean of (fraction high-confidence, fraction without an
    /// independent Critical), plus a bonus once the high-confidence quorum
    /// is met. Clamped to [0, 1].
    #[must_use]
    pub fn consensus(&self, results: &[ModuleResult]) -> f64 {
        if results.is_empty() {
            return 0.0;
        }
        let n = results.len() as f64;
        let high = results
            .iter()
            .filter(|r| r.confidence >= self.config.high_confidence)
            .count();
        let without_critical = results.iter().filter(|r| !r.has_critical()).count() as f64;

        let mut consensus = (high as f64 / n + without_critical / n) / 2.0;
        if high >= self.config.consensus_quorum {
            consensus += self.config.consensus_bonus;
        }
        consensus.clamp(0.0, 1.0)
    }

    /// Tier with the conservative tie-break: the lower of the trust-implied
    /// and consensus-implied tiers.
    #[must_use]
    pub fn tier(&self, trust_index: f64, consensus: f64) -> VerdictTier {
        let by_trust = if trust_index >= self.config.verified_trust {
            VerdictTier::Verified
        } else if trust_index >= self.config.conditional_trust {
            VerdictTier::Conditional
        } else {
            VerdictTier::Inconclusive
        };
        let by_consensus = if consensus >= self.config.agreement_threshold {
            VerdictTier::Verified
        } else if consensus >= self.config.conditional_consensus {
            VerdictTier::Conditional
        } else {
            VerdictTier::Inconclusive
        };
        by_trust.min(by_consensus)
    }

    /// Whether consensus counts as agreement achieved.
    #[must_use]
    pub fn agreement_reached(&self, consensus: f64) -> bool {
        consensus >= self.config.agreement_threshold
    }

    /// Deterministic recommendations. No randomness: the same results
    /// always produce the same list, in the same order.
    fn recommendations(
        &self,
        results: &[ModuleResult],
        consensus: f64,
        contradictions: &[Contradiction],
    ) -> Vec<String> {
        let mut out = Vec::new();

        let critical_count: usize = results
            .iter()
            .flat_map(|r| &r.findings)
            .filter(|f| f.severity == Severity::Critical)
            .count();
        if critical_count > 0 {
            out.push(format!(
                "Escalate for manual review: {critical_count} critical finding(s) reported."
            ));
        }

        if let Some(completeness) = metadata_completeness(results) {
            if completeness < self.config.min_metadata_completeness {
                out.push(format!(
                    "Collect additional evidence metadata; average completeness is {:.0}%.",
                    completeness * 100.0
                ));
            }
        }

        if !contradictions.is_empty() {
            out.push(format!(
                "Resolve {} cross-module contradiction(s) before relying on this report.",
                contradictions.len()
            ));
        }

        if !self.agreement_reached(consensus) {
            out.push(
                "Cross-module agreement was not achieved; treat the verdict as provisional."
                    .to_string(),
            );
        }

        if out.is_empty() {
            out.push("No action required; the evidence set is internally consistent.".to_string());
        }
        out
    }
}

/// Pairwise contradiction scan: findings from different modules sharing a
/// category where severities differ and at least one is Critical.
/// Quadratic in total finding count, which stays small at eight bounded
/// modules.
#[must_use]
pub fn extract_contradictions(results: &[ModuleResult]) -> Vec<Contradiction> {
    let mut out = Vec::new();
    for (i, result_a) in results.iter().enumerate() {
        for result_b in results.iter().skip(i + 1) {
            for finding_a in &result_a.findings {
                for finding_b in &result_b.findings {
                    if finding_a.category == finding_b.category
                        && finding_a.severity != finding_b.severity
                        && (finding_a.severity == Severity::Critical
                            || finding_b.severity == Severity::Critical)
                    {
                        out.push(Contradiction {
                            category: finding_a.category.clone(),
                            module_a: result_a.module.clone(),
                            severity_a: finding_a.severity,
                            module_b: result_b.module.clone(),
                            severity_b: finding_b.severity,
                        });
                    }
                }
            }
        }
    }
    out
}

/// Rank findings by severity, then confidence, and keep the top few.
#[must_use]
pub fn rank_key_findings(results: &[ModuleResult]) -> Vec<Finding> {
    let mut findings: Vec<Finding> = results
        .iter()
        .flat_map(|r| r.findings.iter())
        .filter(|f| f.severity >= Severity::Medium)
        .cloned()
        .collect();
    findings.sort_by(|a, b| {
        b.severity
            .cmp(&a.severity)
            .then(b.confidence.total_cmp(&a.confidence))
            .then(a.category.cmp(&b.category))
    });
    findings.truncate(MAX_KEY_FINDINGS);
    findings
}

/// Average metadata completeness, read back from the metadata module's
/// summary finding detail. `None` when no module reported one.
#[must_use]
fn metadata_completeness(results: &[ModuleResult]) -> Option<f64> {
    results
        .iter()
        .flat_map(|r| &r.findings)
        .find(|f| f.category == "metadata-summary")
        .and_then(|f| f.details.get("completeness"))
        .and_then(MetaValue::as_number)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SynthesisConfig;

    fn result(module: &str, confidence: f64) -> ModuleResult {
        ModuleResult::new(module, confidence, Vec::new(), 1)
    }

    fn result_with_critical(module: &str, confidence: f64, category: &str) -> ModuleResult {
        let finding = Finding::new(Severity::Critical, category, "problem", 0.9);
        ModuleResult::new(module, confidence, vec![finding], 1)
    }

    fn engine() -> SynthesisEngine {
        SynthesisEngine::new(SynthesisConfig::default())
    }

    fn eight(confidence: f64) -> Vec<ModuleResult> {
        (0..8).map(|i| result(&format!("m{i}"), confidence)).collect()
    }

    #[test]
    fn all_confident_is_verified() {
        let results = eight(0.9);
        let (verdict, _) = engine().synthesize(&results);
        assert!((verdict.trust_index - 90.0).abs() < 1e-9);
        assert!(verdict.consensus >= 0.75);
        assert_eq!(verdict.tier, VerdictTier::Verified);
    }

    #[test]
    fn one_bad_module_downgrades_the_verdict() {
        let mut results = eight(0.9);
        results[3] = result_with_critical("m3", 0.1, "integrity");
        let (verdict, _) = engine().synthesize(&results);
        // The 0.3·min term keeps the bad module visible.
        assert!(verdict.trust_index < 80.0);
        assert!(verdict.tier <= VerdictTier::Conditional);
    }

    #[test]
    fn trust_index_uses_min_not_just_mean() {
        let mut results = eight(1.0);
        results[0] = result("m0", 0.0);
        let trust = engine().trust_index(&results);
        // Mean alone would give 87.5; the min term pulls it to 61.25.
        assert!((trust - 61.25).abs() < 1e-9);
    }

    #[test]
    fn consensus_bonus_needs_quorum() {
        let e = engine();
        // 5 high of 8: no bonus.
        let mut results = eight(0.9);
        for r in results.iter_mut().take(3) {
            r.confidence = 0.5;
        }
        let without = e.consensus(&results);
        assert!((without - (5.0 / 8.0 + 1.0) / 2.0).abs() < 1e-9);

        // 6 high of 8: bonus applies.
        let mut results = eight(0.9);
        for r in results.iter_mut().take(2) {
            r.confidence = 0.5;
        }
        let with = e.consensus(&results);
        assert!((with - ((6.0 / 8.0 + 1.0) / 2.0 + 0.1)).abs() < 1e-9);
    }

    #[test]
    fn tier_tie_break_is_conservative() {
        let e = engine();
        // High trust, weak consensus: consensus wins downward.
        assert_eq!(e.tier(95.0, 0.4), VerdictTier::Inconclusive);
        // Strong consensus, low trust: trust wins downward.
        assert_eq!(e.tier(50.0, 0.9), VerdictTier::Inconclusive);
        assert_eq!(e.tier(70.0, 0.6), VerdictTier::Conditional);
    }

    #[test]
    fn contradictions_require_shared_category_and_a_critical() {
        let a = result_with_critical("m0", 0.2, "integrity");
        let mut b = result("m1", 0.9);
        b.findings.push(Finding::new(Severity::Low, "integrity", "minor", 0.5));
        let mut c = result("m2", 0.9);
        c.findings.push(Finding::new(Severity::Low, "device", "minor", 0.5));

        let contradictions = extract_contradictions(&[a, b, c]);
        assert_eq!(contradictions.len(), 1);
        assert_eq!(contradictions[0].category, "integrity");
        assert_eq!(contradictions[0].module_a, "m0");
        assert_eq!(contradictions[0].module_b, "m1");
    }

    #[test]
    fn verdict_is_order_independent() {
        let mut results = eight(0.8);
        results[2] = result_with_critical("m2", 0.3, "timeline-geolocation");
        let (forward, _) = engine().synthesize(&results);
        results.reverse();
        let (backward, _) = engine().synthesize(&results);
        assert_eq!(forward.trust_index, backward.trust_index);
        assert_eq!(forward.consensus, backward.consensus);
        assert_eq!(forward.tier, backward.tier);
    }

    #[test]
    fn trust_index_is_bit_identical_under_rotation() {
        // Confidences chosen so naive left-to-right summation differs in
        // the last ulp between orderings.
        let confidences = [0.1, 0.3, 0.7, 0.123_456_789, 0.9, 0.2, 0.55, 0.05];
        let mut results: Vec<ModuleResult> = confidences
            .iter()
            .enumerate()
            .map(|(i, &c)| ModuleResult::new(format!("m{i}"), c, Vec::new(), 1))
            .collect();

        let baseline = engine().trust_index(&results);
        for _ in 0..results.len() {
            results.rotate_left(1);
            assert_eq!(engine().trust_index(&results), baseline);
        }
    }

    #[test]
    fn recommendations_are_deterministic_and_nonempty() {
        let results = eight(0.9);
        let (first, _) = engine().synthesize(&results);
        let (second, _) = engine().synthesize(&results);
        assert_eq!(first.recommendations, second.recommendations);
        assert!(!first.recommendations.is_empty());
    }

    #[test]
    fn key_findings_ranked_by_severity_then_confidence() {
        let mut a = result("m0", 0.9);
        a.findings.push(Finding::new(Severity::Medium, "x", "medium", 0.9));
        let mut b = result("m1", 0.9);
        b.findings.push(Finding::new(Severity::Critical, "y", "critical", 0.5));
        b.findings.push(Finding::new(Severity::Info, "z", "ignored", 1.0));

        let ranked = rank_key_findings(&[a, b]);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].severity, Severity::Critical);
        assert_eq!(ranked[1].severity, Severity::Medium);
    }

    #[test]
    fn synthesis_result_reports_under_its_own_name() {
        let (_, result) = engine().synthesize(&eight(0.9));
        assert_eq!(result.module, SYNTHESIS_MODULE);
        assert_eq!(result.findings.len(), 1);
    }
}
