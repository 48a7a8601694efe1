//! # Audit Log
//!
//! Append-only audit trail for the three-gate sealing protocol.
//!
//! The log is the only mutable state shared between concurrent module
//! tasks. Appends are serialized behind a mutex; each entry receives a
//! monotonically increasing sequence number inside the critical section,
//! so an entry is never half-written, lost, or duplicated. Ordering is by
//! wall-clock timestamp with the sequence number breaking ties.
//!
//! Entries are never edited or deleted; `snapshot` and the export helpers
//! copy without truncating.

use crate::types::{AuditAction, AuditEntry, now_ms};
use std::sync::{Mutex, PoisonError};

/// Thread-safe append-only audit log.
#[derive(Debug, Default)]
pub struct AuditLog {
    inner: Mutex<AuditState>,
}

#[derive(Debug, Default)]
struct AuditState {
    entries: Vec<AuditEntry>,
    next_seq: u64,
}

impl AuditLog {
    /// Create an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one entry, stamping the current time and the next sequence
    /// number. Returns the assigned sequence.
    ///
    /// A poisoned lock is recovered rather than propagated: losing an
    /// audit entry is worse than inheriting a panicked writer's state,
    /// and entries are plain data with no invariants to re-establish.
    pub fn append(
        &self,
        action: AuditAction,
        subject: impl Into<String>,
        detail: impl Into<String>,
    ) -> u64 {
        let mut state = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let seq = state.next_seq;
        state.next_seq = state.next_seq.saturating_add(1);
        let entry = AuditEntry {
            seq,
            timestamp_ms: now_ms(),
            action,
            subject: subject.into(),
            detail: detail.into(),
        };
        tracing::debug!(
            action = entry.action.tag(),
            subject = %entry.subject,
            seq,
            "audit entry"
        );
        state.entries.push(entry);
        seq
    }

    /// Ordered copy of all entries: (timestamp, seq) ascending.
    #[must_use]
    pub fn snapshot(&self) -> Vec<AuditEntry> {
        let state = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let mut entries = state.entries.clone();
        entries.sort_by_key(|e| (e.timestamp_ms, e.seq));
        entries
    }

    /// Number of entries recorded so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .len()
    }

    /// Whether the log is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Count entries with the given action tag.
    #[must_use]
    pub fn count_action(&self, action: AuditAction) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .iter()
            .filter(|e| e.action == action)
            .count()
    }

    /// Count entries with the given action for a specific subject.
    #[must_use]
    pub fn count_action_for(&self, action: AuditAction, subject: &str) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .iter()
            .filter(|e| e.action == action && e.subject == subject)
            .count()
    }

    /// Count entries with the given action at or after a sequence number.
    ///
    /// The log outlives a single run when the pipeline is reused, so
    /// per-run accounting filters on the sequence assigned at run start.
    #[must_use]
    pub fn count_action_since(&self, action: AuditAction, from_seq: u64) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .iter()
            .filter(|e| e.action == action && e.seq >= from_seq)
            .count()
    }

    /// Count entries with the given action and subject at or after a
    /// sequence number.
    #[must_use]
    pub fn count_action_for_since(
        &self,
        action: AuditAction,
        subject: &str,
        from_seq: u64,
    ) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .iter()
            .filter(|e| e.action == action && e.subject == subject && e.seq >= from_seq)
            .count()
    }
}

/// Render entries as plain text for external long-term storage,
/// one entry per line.
#[must_use]
pub fn export_text(entries: &[AuditEntry]) -> String {
    let mut out = String::new();
    for entry in entries {
        out.push_str(&format!(
            "{:08} {} {} [{}] {}\n",
            entry.seq,
            entry.timestamp_ms,
            entry.action.tag(),
            entry.subject,
            entry.detail
        ));
    }
    out
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn append_assigns_increasing_sequences() {
        let log = AuditLog::new();
        let a = log.append(AuditAction::RunStarted, "run", "");
        let b = log.append(AuditAction::Gate1Sealed, "evidence:1", "hash");
        assert_eq!(a, 0);
        assert_eq!(b, 1);
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn snapshot_is_ordered_and_nondestructive() {
        let log = AuditLog::new();
        for i in 0..5 {
            log.append(AuditAction::Gate2Start, format!("module:{i}"), "");
        }
        let first = log.snapshot();
        let second = log.snapshot();
        assert_eq!(first, second);
        assert_eq!(first.len(), 5);
        for window in first.windows(2) {
            assert!((window[0].timestamp_ms, window[0].seq) < (window[1].timestamp_ms, window[1].seq));
        }
    }

    #[test]
    fn concurrent_appends_lose_nothing() {
        let log = Arc::new(AuditLog::new());
        let mut handles = Vec::new();
        for t in 0..8 {
            let log = Arc::clone(&log);
            handles.push(std::thread::spawn(move || {
                for i in 0..50 {
                    log.append(AuditAction::Gate2Start, format!("module:{t}"), format!("{i}"));
                }
            }));
        }
        for handle in handles {
            handle.join().expect("writer thread");
        }
        assert_eq!(log.len(), 8 * 50);

        // Sequence numbers are unique.
        let mut seqs: Vec<u64> = log.snapshot().iter().map(|e| e.seq).collect();
        seqs.sort_unstable();
        seqs.dedup();
        assert_eq!(seqs.len(), 8 * 50);
    }

    #[test]
    fn count_by_action_and_subject() {
        let log = AuditLog::new();
        log.append(AuditAction::Gate2Start, "module:timeline", "");
        log.append(AuditAction::Gate2End, "module:timeline", "");
        log.append(AuditAction::Gate2Start, "module:content", "");
        assert_eq!(log.count_action(AuditAction::Gate2Start), 2);
        assert_eq!(log.count_action_for(AuditAction::Gate2End, "module:timeline"), 1);
        assert_eq!(log.count_action_for(AuditAction::Gate2End, "module:content"), 0);
    }

    #[test]
    fn since_counters_ignore_earlier_entries() {
        let log = AuditLog::new();
        log.append(AuditAction::Gate3Sealed, "report:r1", "");
        log.append(AuditAction::Gate2Start, "module:timeline", "");
        let mark = log.append(AuditAction::RunStarted, "run:r2", "");
        log.append(AuditAction::Gate3Sealed, "report:r2", "");
        log.append(AuditAction::Gate2Start, "module:timeline", "");

        assert_eq!(log.count_action(AuditAction::Gate3Sealed), 2);
        assert_eq!(log.count_action_since(AuditAction::Gate3Sealed, mark), 1);
        assert_eq!(
            log.count_action_for_since(AuditAction::Gate2Start, "module:timeline", mark),
            1
        );
    }

    #[test]
    fn text_export_one_line_per_entry() {
        let log = AuditLog::new();
        log.append(AuditAction::Gate3Sealed, "report:r1", "hash=aa");
        let text = export_text(&log.snapshot());
        assert_eq!(text.lines().count(), 1);
        assert!(text.contains("gate3-sealed"));
        assert!(text.contains("report:r1"));
    }
}
