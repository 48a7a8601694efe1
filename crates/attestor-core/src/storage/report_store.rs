//! # redb-backed Report Store
//!
//! Persists sealed reports and their audit trails in an embedded redb
//! database, giving ACID transactions and crash safety with zero
//! configuration.
//!
//! Reports are write-once: a stored report was sealed at Gate 3 and is
//! never updated in place. The audit table is append-only by convention;
//! entries are keyed by `(run_id, seq)` so a run's trail reads back in
//! sequence order via a range query.

use crate::types::{AttestorError, AuditEntry, ForensicReport};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use std::path::Path;

/// Table for reports: report id -> serialized ForensicReport bytes.
const REPORTS: TableDefinition<&str, &[u8]> = TableDefinition::new("reports");

/// Table for audit trails: (run_id, seq) -> serialized AuditEntry bytes.
/// The composite key enables per-run range queries in seq order.
const AUDIT: TableDefinition<(&str, u64), &[u8]> = TableDefinition::new("audit");

/// A disk-backed store for sealed reports and audit trails.
pub struct ReportStore {
    db: Database,
}

impl std::fmt::Debug for ReportStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportStore").finish_non_exhaustive()
    }
}

impl ReportStore {
    /// Open or create a report store at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AttestorError> {
        let db = Database::create(path.as_ref())
            .map_err(|e| AttestorError::Storage(e.to_string()))?;

        // Initialize tables if they don't exist
        {
            let write_txn = db
                .begin_write()
                .map_err(|e| AttestorError::Storage(e.to_string()))?;
            let _ = write_txn
                .open_table(REPORTS)
                .map_err(|e| AttestorError::Storage(e.to_string()))?;
            let _ = write_txn
                .open_table(AUDIT)
                .map_err(|e| AttestorError::Storage(e.to_string()))?;
            write_txn
                .commit()
                .map_err(|e| AttestorError::Storage(e.to_string()))?;
        }

        Ok(Self { db })
    }

    /// Store a sealed report and its audit trail in one transaction.
    ///
    /// # Errors
    ///
    /// Returns [`AttestorError::ReportAlreadySealed`] if a report with
    /// the same id is already stored; nothing is written in that case.
    pub fn put_report(
        &self,
        report: &ForensicReport,
        audit_trail: &[AuditEntry],
    ) -> Result<(), AttestorError> {
        let report_bytes = postcard::to_allocvec(report)
            .map_err(|e| AttestorError::Serialization(e.to_string()))?;

        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| AttestorError::Storage(e.to_string()))?;
        {
            let mut reports_table = write_txn
                .open_table(REPORTS)
                .map_err(|e| AttestorError::Storage(e.to_string()))?;

            if reports_table
                .get(report.id.as_str())
                .map_err(|e| AttestorError::Storage(e.to_string()))?
                .is_some()
            {
                // Abort the transaction by dropping it uncommitted.
                return Err(AttestorError::ReportAlreadySealed(report.id.clone()));
            }

            reports_table
                .insert(report.id.as_str(), report_bytes.as_slice())
                .map_err(|e| AttestorError::Storage(e.to_string()))?;

            let mut audit_table = write_txn
                .open_table(AUDIT)
                .map_err(|e| AttestorError::Storage(e.to_string()))?;
            for entry in audit_trail {
                let entry_bytes = postcard::to_allocvec(entry)
                    .map_err(|e| AttestorError::Serialization(e.to_string()))?;
                audit_table
                    .insert((report.id.as_str(), entry.seq), entry_bytes.as_slice())
                    .map_err(|e| AttestorError::Storage(e.to_string()))?;
            }
        }
        write_txn
            .commit()
            .map_err(|e| AttestorError::Storage(e.to_string()))?;

        tracing::debug!(report = %report.id, entries = audit_trail.len(), "report stored");
        Ok(())
    }

    /// Fetch a stored report by id.
    ///
    /// # Errors
    ///
    /// Returns [`AttestorError::ReportNotFound`] if no report with this
    /// id is stored.
    pub fn get_report(&self, id: &str) -> Result<ForensicReport, AttestorError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| AttestorError::Storage(e.to_string()))?;
        let reports_table = read_txn
            .open_table(REPORTS)
            .map_err(|e| AttestorError::Storage(e.to_string()))?;

        match reports_table
            .get(id)
            .map_err(|e| AttestorError::Storage(e.to_string()))?
        {
            Some(data) => postcard::from_bytes(data.value())
                .map_err(|e| AttestorError::Serialization(e.to_string())),
            None => Err(AttestorError::ReportNotFound(id.to_string())),
        }
    }

    /// List all stored report ids in deterministic (lexicographic) order.
    pub fn list_reports(&self) -> Result<Vec<String>, AttestorError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| AttestorError::Storage(e.to_string()))?;
        let reports_table = read_txn
            .open_table(REPORTS)
            .map_err(|e| AttestorError::Storage(e.to_string()))?;

        let mut ids = Vec::new();
        for entry in reports_table
            .iter()
            .map_err(|e| AttestorError::Storage(e.to_string()))?
        {
            let (key, _) = entry.map_err(|e| AttestorError::Storage(e.to_string()))?;
            ids.push(key.value().to_string());
        }
        Ok(ids)
    }

    /// Read back the audit trail of a run in sequence order.
    pub fn audit_for_run(&self, run_id: &str) -> Result<Vec<AuditEntry>, AttestorError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| AttestorError::Storage(e.to_string()))?;
        let audit_table = read_txn
            .open_table(AUDIT)
            .map_err(|e| AttestorError::Storage(e.to_string()))?;

        let mut entries = Vec::new();
        for entry in audit_table
            .range((run_id, 0u64)..=(run_id, u64::MAX))
            .map_err(|e| AttestorError::Storage(e.to_string()))?
        {
            let (_, data) = entry.map_err(|e| AttestorError::Storage(e.to_string()))?;
            let audit_entry: AuditEntry = postcard::from_bytes(data.value())
                .map_err(|e| AttestorError::Serialization(e.to_string()))?;
            entries.push(audit_entry);
        }
        Ok(entries)
    }

    /// Number of stored reports.
    pub fn report_count(&self) -> Result<usize, AttestorError> {
        Ok(self.list_reports()?.len())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::types::{
        AuditAction, ComplianceSummary, Seal, SynthesisVerdict, VerdictTier,
    };
    use tempfile::tempdir;

    fn report(id: &str) -> ForensicReport {
        ForensicReport {
            id: id.to_string(),
            evidence: Vec::new(),
            module_results: Vec::new(),
            verdict: SynthesisVerdict {
                trust_index: 75.0,
                tier: VerdictTier::Conditional,
                consensus: 0.8,
                key_findings: Vec::new(),
                contradictions: Vec::new(),
                recommendations: vec!["none".to_string()],
            },
            seal: Seal {
                content_hash: "abc".to_string(),
                sealed_at_ms: 1,
                location: None,
                attestation: "ATST1".to_string(),
                watermark: "wm".to_string(),
            },
            generated_at_ms: 1,
            compliance: ComplianceSummary {
                all_modules_ran: true,
                consensus_reached: true,
                gates_logged: true,
            },
        }
    }

    fn trail(n: u64) -> Vec<AuditEntry> {
        (0..n)
            .map(|seq| AuditEntry {
                seq,
                timestamp_ms: 1000 + seq,
                action: AuditAction::RunStarted,
                subject: "run:test".to_string(),
                detail: format!("entry {seq}"),
            })
            .collect()
    }

    #[test]
    fn store_and_fetch_round_trip() {
        let temp = tempdir().expect("temp dir");
        let store = ReportStore::open(temp.path().join("test.redb")).expect("open");

        store.put_report(&report("r1"), &trail(3)).expect("put");

        let fetched = store.get_report("r1").expect("get");
        assert_eq!(fetched.id, "r1");
        assert_eq!(fetched.verdict.tier, VerdictTier::Conditional);

        let entries = store.audit_for_run("r1").expect("audit");
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].seq, 0);
        assert_eq!(entries[2].seq, 2);
    }

    #[test]
    fn stored_reports_are_write_once() {
        let temp = tempdir().expect("temp dir");
        let store = ReportStore::open(temp.path().join("test.redb")).expect("open");

        store.put_report(&report("r1"), &[]).expect("put");
        let second = store.put_report(&report("r1"), &[]);
        assert!(matches!(second, Err(AttestorError::ReportAlreadySealed(_))));

        // The original is untouched.
        assert_eq!(store.report_count().expect("count"), 1);
    }

    #[test]
    fn missing_report_is_not_found() {
        let temp = tempdir().expect("temp dir");
        let store = ReportStore::open(temp.path().join("test.redb")).expect("open");

        let missing = store.get_report("nope");
        assert!(matches!(missing, Err(AttestorError::ReportNotFound(_))));
    }

    #[test]
    fn list_is_lexicographic() {
        let temp = tempdir().expect("temp dir");
        let store = ReportStore::open(temp.path().join("test.redb")).expect("open");

        store.put_report(&report("b"), &[]).expect("put");
        store.put_report(&report("a"), &[]).expect("put");
        store.put_report(&report("c"), &[]).expect("put");

        assert_eq!(store.list_reports().expect("list"), vec!["a", "b", "c"]);
    }

    #[test]
    fn audit_trails_do_not_cross_runs() {
        let temp = tempdir().expect("temp dir");
        let store = ReportStore::open(temp.path().join("test.redb")).expect("open");

        store.put_report(&report("r1"), &trail(2)).expect("put");
        store.put_report(&report("r2"), &trail(5)).expect("put");

        assert_eq!(store.audit_for_run("r1").expect("audit").len(), 2);
        assert_eq!(store.audit_for_run("r2").expect("audit").len(), 5);
        assert!(store.audit_for_run("r3").expect("audit").is_empty());
    }

    #[test]
    fn persistence_across_reopen() {
        let temp = tempdir().expect("temp dir");
        let db_path = temp.path().join("test.redb");

        {
            let store = ReportStore::open(&db_path).expect("open");
            store.put_report(&report("r1"), &trail(4)).expect("put");
        }

        {
            let store = ReportStore::open(&db_path).expect("reopen");
            assert_eq!(store.report_count().expect("count"), 1);
            assert_eq!(store.audit_for_run("r1").expect("audit").len(), 4);
        }
    }
}
