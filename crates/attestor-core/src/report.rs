//! # Report Assembly
//!
//! Packages evidence, module results, and the verdict into the immutable
//! [`ForensicReport`], applies Gate 3, and computes the compliance summary.
//!
//! ## Canonical bytes
//!
//! The Gate-3 hash is computed over a bit-exact postcard serialization of
//! the report content: id, evidence, module results, verdict, and
//! generation timestamp. The seal itself and the compliance summary are
//! excluded: the seal cannot cover itself, and compliance is derived
//! data that verification recomputes from the audit log rather than
//! trusting as stored.

use crate::audit::AuditLog;
use crate::sealing::{compute_seal, verify_seal};
use crate::types::{
    AttestorError, AuditAction, ComplianceSummary, EvidenceRecord, ForensicReport, GeoPoint,
    ModuleResult, SynthesisVerdict, now_ms,
};

// =============================================================================
// CANONICAL SERIALIZATION
// =============================================================================

/// Canonical bytes over report content (excluding seal and compliance).
pub fn canonical_bytes(
    id: &str,
    evidence: &[EvidenceRecord],
    module_results: &[ModuleResult],
    verdict: &SynthesisVerdict,
    generated_at_ms: u64,
) -> Result<Vec<u8>, AttestorError> {
    postcard::to_stdvec(&(id, evidence, module_results, verdict, generated_at_ms))
        .map_err(|e| AttestorError::Serialization(e.to_string()))
}

/// Canonical bytes of an assembled report, for verification.
pub fn report_canonical_bytes(report: &ForensicReport) -> Result<Vec<u8>, AttestorError> {
    canonical_bytes(
        &report.id,
        &report.evidence,
        &report.module_results,
        &report.verdict,
        report.generated_at_ms,
    )
}

/// Recompute the Gate-3 hash of a report and compare against its seal.
pub fn verify_report(report: &ForensicReport) -> Result<bool, AttestorError> {
    let bytes = report_canonical_bytes(report)?;
    Ok(verify_seal(&report.seal, &bytes))
}

// =============================================================================
// COMPLIANCE
// =============================================================================

/// Recompute the compliance summary from facts already recorded.
///
/// - every one of the expected modules has a Gate-2 start/end pair
/// - cross-module agreement was achieved
/// - every gate has its audit entries: one Gate-1 entry (seal or gap) per
///   evidence item, the Gate-2 pairs, and exactly one Gate-3 entry
///
/// `from_seq` is the sequence number assigned at run start. The audit log
/// is shared across runs when the pipeline is reused, so only entries at
/// or after it count toward this run's gates.
#[must_use]
pub fn compute_compliance(
    audit: &AuditLog,
    module_names: &[&str],
    evidence_count: usize,
    agreement_reached: bool,
    from_seq: u64,
) -> ComplianceSummary {
    let all_modules_ran = module_names.iter().all(|name| {
        let subject = format!("module:{name}");
        audit.count_action_for_since(AuditAction::Gate2Start, &subject, from_seq) >= 1
            && audit.count_action_for_since(AuditAction::Gate2End, &subject, from_seq) >= 1
    });

    let gate1 = audit.count_action_since(AuditAction::Gate1Sealed, from_seq)
        + audit.count_action_since(AuditAction::Gate1Gap, from_seq);
    let gates_logged = gate1 >= evidence_count
        && all_modules_ran
        && audit.count_action_since(AuditAction::Gate3Sealed, from_seq) == 1;

    ComplianceSummary {
        all_modules_ran,
        consensus_reached: agreement_reached,
        gates_logged,
    }
}

// =============================================================================
// ASSEMBLER
// =============================================================================

/// Builds and seals the final report. Thin by design: all content is
/// produced upstream; this only packages, hashes, and records Gate 3.
#[derive(Debug, Default)]
pub struct ReportAssembler;

impl ReportAssembler {
    /// Assemble and seal a report.
    ///
    /// `module_results` is the full nine-result set (eight independent
    /// modules plus synthesis). The Gate-3 audit entry is written before
    /// compliance is computed so the summary can see all three gates.
    /// `run_from_seq` scopes compliance to the current run's audit
    /// entries.
    #[allow(clippy::too_many_arguments)]
    pub fn assemble(
        id: impl Into<String>,
        evidence: Vec<EvidenceRecord>,
        module_results: Vec<ModuleResult>,
        verdict: SynthesisVerdict,
        location: Option<GeoPoint>,
        audit: &AuditLog,
        module_names: &[&str],
        agreement_reached: bool,
        run_from_seq: u64,
    ) -> Result<ForensicReport, AttestorError> {
        let id = id.into();
        let generated_at_ms = now_ms();

        let bytes = canonical_bytes(&id, &evidence, &module_results, &verdict, generated_at_ms)?;
        let seal = compute_seal(&id, &bytes, location);

        audit.append(
            AuditAction::Gate3Sealed,
            format!("report:{id}"),
            format!("sha512={}", &seal.content_hash[..16]),
        );

        let compliance = compute_compliance(
            audit,
            module_names,
            evidence.len(),
            agreement_reached,
            run_from_seq,
        );

        tracing::info!(
            report = %id,
            compliant = compliance.compliant(),
            hash_prefix = &seal.content_hash[..16],
            "report sealed"
        );

        Ok(ForensicReport {
            id,
            evidence,
            module_results,
            verdict,
            seal,
            generated_at_ms,
            compliance,
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================
