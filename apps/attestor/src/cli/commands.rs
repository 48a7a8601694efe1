//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use attestor_core::{
    AttestorError, AuditLog, BrainRegistry, EvidenceRecord, ForensicReport, GeoPoint, IngestItem,
    IngestOutcome, Ingestor, IntegrityStatus, MAX_EVIDENCE_FILE_SIZE, Orchestrator, PipelineConfig,
    ProgressObserver, ReportStore, SynthesisEngine, now_ms, verify_evidence, verify_report,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

// =============================================================================
// PATH VALIDATION
// =============================================================================

/// Validate an evidence file path.
///
/// Canonicalizes the path to resolve symlinks and "..", ensures it exists
/// and is a regular file. Prevents path traversal through crafted inputs.
fn validate_file_path(path: &Path) -> Result<PathBuf, AttestorError> {
    let canonical = path.canonicalize().map_err(|e| {
        AttestorError::Io(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(AttestorError::Io(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

/// Validate an evidence file's size before handing it to ingestion.
fn validate_file_size(path: &Path) -> Result<(), AttestorError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| AttestorError::Io(format!("Cannot read file metadata: {e}")))?;

    if metadata.len() > MAX_EVIDENCE_FILE_SIZE {
        return Err(AttestorError::Io(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            MAX_EVIDENCE_FILE_SIZE
        )));
    }
    Ok(())
}

/// Validate an output path: the parent directory must exist.
fn validate_output_path(path: &Path) -> Result<PathBuf, AttestorError> {
    let parent = path.parent().unwrap_or(Path::new("."));

    let canonical_parent = parent.canonicalize().map_err(|e| {
        AttestorError::Io(format!(
            "Invalid output directory '{}': {}",
            parent.display(),
            e
        ))
    })?;

    if !canonical_parent.is_dir() {
        return Err(AttestorError::Io(format!(
            "Output directory '{}' is not a valid directory",
            parent.display()
        )));
    }

    let filename = path
        .file_name()
        .ok_or_else(|| AttestorError::Io("Output path has no filename".to_string()))?;

    Ok(canonical_parent.join(filename))
}

/// Load pipeline configuration from a TOML file, or defaults.
fn load_config(path: Option<&Path>) -> Result<PipelineConfig, AttestorError> {
    match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .map_err(|e| AttestorError::Io(format!("Cannot read config: {e}")))?;
            toml::from_str(&text)
                .map_err(|e| AttestorError::Serialization(format!("Invalid config: {e}")))
        }
        None => Ok(PipelineConfig::default()),
    }
}

// =============================================================================
// ANALYZE COMMAND
// =============================================================================

/// Run a full analysis over evidence files and seal the report.
#[allow(clippy::too_many_arguments)]
pub async fn cmd_analyze(
    db_path: &Path,
    json_mode: bool,
    quiet: bool,
    files: &[PathBuf],
    id: Option<String>,
    config_path: Option<&Path>,
    output: Option<&Path>,
    location: Option<(f64, f64)>,
) -> Result<(), AttestorError> {
    let config = load_config(config_path)?;
    let report_id = id.unwrap_or_else(|| format!("run-{}", now_ms()));
    let location = location.map(|(lat, lon)| GeoPoint { lat, lon });

    let mut items = Vec::with_capacity(files.len());
    for file in files {
        let path = validate_file_path(file)?;
        validate_file_size(&path)?;
        items.push(IngestItem::from_path(path));
    }

    let audit = Arc::new(AuditLog::new());
    let mut ingestor = Ingestor::new();
    let outcomes = ingestor.ingest(items, &audit);

    let mut evidence = Vec::new();
    for outcome in &outcomes {
        match outcome {
            IngestOutcome::Sealed(record) => evidence.push(record.clone()),
            IngestOutcome::Failed { path, reason } => {
                eprintln!("Skipped {}: {}", path.display(), reason);
            }
        }
    }
    if evidence.is_empty() {
        return Err(AttestorError::Io(
            "No evidence files could be ingested".to_string(),
        ));
    }

    let mut orchestrator = Orchestrator::new(
        BrainRegistry::standard(&config),
        SynthesisEngine::new(config.synthesis.clone()),
        Duration::from_millis(config.deadline_ms()),
        Arc::clone(&audit),
    );
    if !quiet && !json_mode {
        let observer: ProgressObserver = Arc::new(|snapshot| {
            if let Some(module) = &snapshot.active_module {
                println!(
                    "  [{}/{}] {} ({}%)",
                    snapshot.completed, snapshot.total, module, snapshot.percent
                );
            }
        });
        orchestrator = orchestrator.with_observer(observer);
    }

    let report = orchestrator.run(report_id, evidence, location).await?;

    let store = ReportStore::open(db_path)?;
    store.put_report(&report, &audit.snapshot())?;

    if let Some(output) = output {
        let output = validate_output_path(output)?;
        let json = serde_json::to_string_pretty(&report)
            .map_err(|e| AttestorError::Serialization(e.to_string()))?;
        std::fs::write(&output, json)
            .map_err(|e| AttestorError::Io(format!("Cannot write report: {e}")))?;
    }

    if json_mode {
        print_report_json(&report);
    } else {
        print_verdict_summary(&report);
    }
    Ok(())
}

// =============================================================================
// VERIFY COMMAND
// =============================================================================

/// Displayed outcome of checking one evidence record.
///
/// Distinct from [`IntegrityStatus`]: a record ingested with an integrity
/// gap has no stored hash, so there is nothing to verify and it must not
/// be shown as verified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EvidenceCheck {
    Verified,
    NeverHashed,
    HashMismatch,
    Missing,
}

impl EvidenceCheck {
    fn label(self) -> &'static str {
        match self {
            Self::Verified => "valid",
            Self::NeverHashed => "NO HASH RECORDED",
            Self::HashMismatch => "HASH MISMATCH",
            Self::Missing => "MISSING",
        }
    }

    /// Whether the outcome indicates tampering (as opposed to a recorded
    /// ingestion-time gap, which is not evidence of tampering).
    fn tampered(self) -> bool {
        matches!(self, Self::HashMismatch | Self::Missing)
    }
}

fn check_evidence(record: &EvidenceRecord) -> EvidenceCheck {
    if record.has_integrity_gap() {
        return EvidenceCheck::NeverHashed;
    }
    match verify_evidence(record) {
        IntegrityStatus::Valid => EvidenceCheck::Verified,
        IntegrityStatus::Failed { .. } => EvidenceCheck::HashMismatch,
        IntegrityStatus::EvidenceMissing => EvidenceCheck::Missing,
    }
}

/// Verify a stored report's seal and the evidence files it covers.
pub fn cmd_verify(db_path: &Path, json_mode: bool, id: &str) -> Result<(), AttestorError> {
    let store = ReportStore::open(db_path)?;
    let report = store.get_report(id)?;

    let seal_valid = verify_report(&report)?;
    let evidence_status: Vec<(String, EvidenceCheck)> = report
        .evidence
        .iter()
        .map(|record| (record.source.clone(), check_evidence(record)))
        .collect();
    let all_evidence_valid = evidence_status
        .iter()
        .all(|(_, check)| *check == EvidenceCheck::Verified);
    let any_tampered = evidence_status.iter().any(|(_, check)| check.tampered());
    let unhashed = evidence_status
        .iter()
        .filter(|(_, check)| *check == EvidenceCheck::NeverHashed)
        .count();

    if json_mode {
        let output = serde_json::json!({
            "report": id,
            "seal_valid": seal_valid,
            "evidence_valid": all_evidence_valid,
            "evidence": evidence_status.iter().map(|(source, check)| {
                serde_json::json!({ "source": source, "status": format!("{check:?}") })
            }).collect::<Vec<_>>(),
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_default()
        );
        return Ok(());
    }

    println!("Verification of report '{id}'");
    println!("=============================");
    println!(
        "Seal:     {}",
        if seal_valid { "VALID" } else { "BROKEN" }
    );
    println!();
    for (source, check) in &evidence_status {
        println!("  {source}: {}", check.label());
    }
    println!();
    let overall = if !seal_valid || any_tampered {
        "TAMPER DETECTED".to_string()
    } else if unhashed > 0 {
        format!("seal intact; {unhashed} evidence item(s) were never hashed")
    } else {
        "report and evidence intact".to_string()
    };
    println!("Overall:  {overall}");
    Ok(())
}

// =============================================================================
// REPORT COMMANDS
// =============================================================================

/// List all stored report ids.
pub fn cmd_report_list(db_path: &Path, json_mode: bool) -> Result<(), AttestorError> {
    let store = ReportStore::open(db_path)?;
    let ids = store.list_reports()?;

    if json_mode {
        let output = serde_json::json!({ "reports": ids });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_default()
        );
        return Ok(());
    }

    println!("Stored reports ({})", ids.len());
    println!("==================");
    for id in ids {
        println!("  {id}");
    }
    Ok(())
}

/// Show one stored report.
pub fn cmd_report_show(db_path: &Path, json_mode: bool, id: &str) -> Result<(), AttestorError> {
    let store = ReportStore::open(db_path)?;
    let report = store.get_report(id)?;

    if json_mode {
        print_report_json(&report);
        return Ok(());
    }
    print_verdict_summary(&report);
    Ok(())
}

// =============================================================================
// AUDIT COMMAND
// =============================================================================

/// Print a run's audit trail.
pub fn cmd_audit(db_path: &Path, json_mode: bool, id: &str) -> Result<(), AttestorError> {
    let store = ReportStore::open(db_path)?;
    let entries = store.audit_for_run(id)?;
    if entries.is_empty() {
        return Err(AttestorError::ReportNotFound(id.to_string()));
    }

    if json_mode {
        let output = serde_json::json!({
            "report": id,
            "entries": entries.iter().map(|e| serde_json::json!({
                "seq": e.seq,
                "timestamp_ms": e.timestamp_ms,
                "action": e.action.tag(),
                "subject": e.subject,
                "detail": e.detail,
            })).collect::<Vec<_>>(),
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_default()
        );
        return Ok(());
    }

    print!("{}", attestor_core::export_text(&entries));
    Ok(())
}

// =============================================================================
// OUTPUT HELPERS
// =============================================================================

fn print_report_json(report: &ForensicReport) {
    println!(
        "{}",
        serde_json::to_string_pretty(report).unwrap_or_default()
    );
}

fn print_verdict_summary(report: &ForensicReport) {
    println!();
    println!("Report '{}'", report.id);
    println!("==============================");
    println!("Verdict:     {}", report.verdict.tier.name());
    println!("Trust index: {:.1} / 100", report.verdict.trust_index);
    println!("Consensus:   {:.2}", report.verdict.consensus);
    println!(
        "Compliance:  {}",
        if report.compliance.compliant() {
            "compliant"
        } else {
            "NOT COMPLIANT"
        }
    );
    println!("Evidence:    {} item(s)", report.evidence.len());
    println!(
        "Sealed:      sha512 {}…",
        &report.seal.content_hash[..16.min(report.seal.content_hash.len())]
    );

    if !report.verdict.key_findings.is_empty() {
        println!();
        println!("Key findings:");
        for finding in &report.verdict.key_findings {
            println!(
                "  [{}] {}: {}",
                finding.severity.name(),
                finding.category,
                finding.description
            );
        }
    }

    if !report.verdict.contradictions.is_empty() {
        println!();
        println!("Contradictions:");
        for c in &report.verdict.contradictions {
            println!(
                "  {}: {} ({}) vs {} ({})",
                c.category,
                c.module_a,
                c.severity_a.name(),
                c.module_b,
                c.severity_b.name()
            );
        }
    }

    println!();
    println!("Recommendations:");
    for recommendation in &report.verdict.recommendations {
        println!("  - {recommendation}");
    }
}

// =============================================================================
// TESTS
// =============================================================================
