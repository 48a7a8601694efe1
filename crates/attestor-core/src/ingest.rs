//! # Evidence Ingestion
//!
//! Turns raw `(file reference, declared type, metadata)` tuples into sealed
//! [`EvidenceRecord`]s, applying Gate 1 of the sealing protocol.
//!
//! Zero-Loss Evidence Doctrine:
//! - A per-item failure never blocks the other items.
//! - A file whose hash cannot be computed is still ingested; the gap is
//!   recorded as a Gate-1 audit entry and surfaces in compliance checks.
//! - Only a completely unreadable file or an unmappable declared type
//!   produces an explicit [`IngestionFailure`] for that item.

use crate::audit::AuditLog;
use crate::sealing::gate1_hash_file;
use crate::types::{
    AuditAction, EvidenceId, EvidenceKind, EvidenceRecord, IngestionFailure, META_CONTENT_HASH,
    MetaValue, now_ms,
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Maximum evidence file size accepted at ingestion (500 MB).
pub const MAX_EVIDENCE_FILE_SIZE: u64 = 500 * 1024 * 1024;

// =============================================================================
// INGESTION INPUT / OUTPUT
// =============================================================================

/// One item handed to ingestion by the external import layer.
#[derive(Debug, Clone)]
pub struct IngestItem {
    /// Path to the evidence file.
    pub path: PathBuf,
    /// Declared type as named by the importer. `None` means "infer from
    /// the file extension, else Unknown". A name the core cannot map is an
    /// `UnsupportedType` ingestion failure.
    pub declared_type: Option<String>,
    /// Free-form metadata supplied by the importer.
    pub metadata: BTreeMap<String, MetaValue>,
}

impl IngestItem {
    /// Item with no declared type and no metadata.
    #[must_use]
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            declared_type: None,
            metadata: BTreeMap::new(),
        }
    }
}

/// Map a declared type name to an evidence kind.
#[must_use]
pub fn kind_from_name(name: &str) -> Option<EvidenceKind> {
    match name.to_ascii_lowercase().as_str() {
        "document" | "doc" => Some(EvidenceKind::Document),
        "image" | "photo" => Some(EvidenceKind::Image),
        "audio" => Some(EvidenceKind::Audio),
        "video" => Some(EvidenceKind::Video),
        "unknown" => Some(EvidenceKind::Unknown),
        _ => None,
    }
}

/// Per-item ingestion outcome.
#[derive(Debug, Clone)]
pub enum IngestOutcome {
    /// The item was sealed into an evidence record.
    Sealed(EvidenceRecord),
    /// The item could not be ingested. Reported, never silently dropped.
    Failed {
        /// The offending file reference.
        path: PathBuf,
        /// Why ingestion failed.
        reason: IngestionFailure,
    },
}

impl IngestOutcome {
    /// The sealed record, if this outcome is one.
    #[must_use]
    pub fn record(&self) -> Option<&EvidenceRecord> {
        match self {
            IngestOutcome::Sealed(record) => Some(record),
            IngestOutcome::Failed { .. } => None,
        }
    }
}

// =============================================================================
// INGESTOR
// =============================================================================

/// The Ingestor validates items and applies Gate 1.
#[derive(Debug, Default)]
pub struct Ingestor {
    next_id: u64,
}

impl Ingestor {
    /// Create an ingestor starting at evidence id 0.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ingest a batch. Always returns one outcome per input item, in
    /// input order.
    pub fn ingest(&mut self, items: Vec<IngestItem>, audit: &AuditLog) -> Vec<IngestOutcome> {
        items.into_iter().map(|item| self.ingest_one(item, audit)).collect()
    }

    /// Ingest a single item.
    pub fn ingest_one(&mut self, item: IngestItem, audit: &AuditLog) -> IngestOutcome {
        let path = item.path;

        let kind = match item.declared_type.as_deref() {
            Some(name) => match kind_from_name(name) {
                Some(kind) => kind,
                None => {
                    tracing::warn!(path = %path.display(), declared = name, "unsupported declared type");
                    return IngestOutcome::Failed {
                        path,
                        reason: IngestionFailure::UnsupportedType,
                    };
                }
            },
            None => infer_kind(&path),
        };

        let Ok(file_meta) = std::fs::metadata(&path) else {
            tracing::warn!(path = %path.display(), "ingestion failed: file unreadable");
            return IngestOutcome::Failed {
                path,
                reason: IngestionFailure::FileUnreadable,
            };
        };
        if !file_meta.is_file() || file_meta.len() > MAX_EVIDENCE_FILE_SIZE {
            return IngestOutcome::Failed {
                path,
                reason: IngestionFailure::FileUnreadable,
            };
        }

        let id = EvidenceId(self.next_id);
        self.next_id = self.next_id.saturating_add(1);

        let mut metadata = item.metadata;

        // Gate 1: content hash of the raw bytes. An uncomputable hash is a
        // recorded gap, not a rejection.
        match gate1_hash_file(&path) {
            Ok(hash) => {
                audit.append(
                    AuditAction::Gate1Sealed,
                    format!("evidence:{}", id.0),
                    format!("sha512={}", &hash[..16.min(hash.len())]),
                );
                metadata.insert(META_CONTENT_HASH.to_string(), MetaValue::Text(hash));
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "gate1 hash unavailable");
                audit.append(
                    AuditAction::Gate1Gap,
                    format!("evidence:{}", id.0),
                    format!("integrity gap: {e}"),
                );
            }
        }

        IngestOutcome::Sealed(EvidenceRecord {
            id,
            kind,
            source: path.display().to_string(),
            declared_size: file_meta.len(),
            ingested_at_ms: now_ms(),
            metadata,
        })
    }
}

/// Map a file extension to an evidence kind. Anything unrecognized is
/// `Unknown`, which is still analyzed.
#[must_use]
pub fn infer_kind(path: &Path) -> EvidenceKind {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "txt" | "md" | "pdf" | "doc" | "docx" | "odt" | "rtf" => EvidenceKind::Document,
        "jpg" | "jpeg" | "png" | "gif" | "tiff" | "heic" | "webp" => EvidenceKind::Image,
        "mp3" | "wav" | "flac" | "ogg" | "m4a" => EvidenceKind::Audio,
        "mp4" | "mov" | "avi" | "mkv" | "webm" => EvidenceKind::Video,
        _ => EvidenceKind::Unknown,
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn write_file(dir: &tempfile::TempDir, name: &str, bytes: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, bytes).expect("write");
        path
    }

    #[test]
    fn ingest_seals_readable_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let audit = AuditLog::new();
        let path = write_file(&dir, "scene.jpg", b"jpeg bytes");

        let mut ingestor = Ingestor::new();
        let outcomes = ingestor.ingest(vec![IngestItem::from_path(&path)], &audit);

        assert_eq!(outcomes.len(), 1);
        let record = outcomes[0].record().expect("sealed");
        assert_eq!(record.kind, EvidenceKind::Image);
        assert_eq!(record.declared_size, 10);
        assert!(record.content_hash().is_some());
        assert_eq!(audit.count_action(AuditAction::Gate1Sealed), 1);
    }

    #[test]
    fn zero_loss_one_unreadable_among_five() {
        let dir = tempfile::tempdir().expect("tempdir");
        let audit = AuditLog::new();
        let mut items: Vec<IngestItem> = (0..4)
            .map(|i| IngestItem::from_path(write_file(&dir, &format!("e{i}.txt"), b"data")))
            .collect();
        items.insert(2, IngestItem::from_path(dir.path().join("missing.txt")));

        let mut ingestor = Ingestor::new();
        let outcomes = ingestor.ingest(items, &audit);

        assert_eq!(outcomes.len(), 5);
        let sealed = outcomes.iter().filter(|o| o.record().is_some()).count();
        assert_eq!(sealed, 4);
        assert!(matches!(
            outcomes[2],
            IngestOutcome::Failed { reason: IngestionFailure::FileUnreadable, .. }
        ));
    }

    #[test]
    fn evidence_ids_are_unique_and_sequential() {
        let dir = tempfile::tempdir().expect("tempdir");
        let audit = AuditLog::new();
        let items: Vec<IngestItem> = (0..3)
            .map(|i| IngestItem::from_path(write_file(&dir, &format!("d{i}.txt"), b"x")))
            .collect();

        let mut ingestor = Ingestor::new();
        let outcomes = ingestor.ingest(items, &audit);
        let ids: Vec<u64> = outcomes
            .iter()
            .filter_map(|o| o.record().map(|r| r.id.0))
            .collect();
        assert_eq!(ids, vec![0, 1, 2]);
    }

    #[test]
    fn declared_kind_wins_over_extension() {
        let dir = tempfile::tempdir().expect("tempdir");
        let audit = AuditLog::new();
        let path = write_file(&dir, "weird.bin", b"frames");
        let item = IngestItem {
            path,
            declared_type: Some("video".to_string()),
            metadata: BTreeMap::new(),
        };

        let mut ingestor = Ingestor::new();
        let outcome = ingestor.ingest_one(item, &audit);
        assert_eq!(outcome.record().expect("sealed").kind, EvidenceKind::Video);
    }

    #[test]
    fn unmappable_declared_type_is_unsupported() {
        let dir = tempfile::tempdir().expect("tempdir");
        let audit = AuditLog::new();
        let path = write_file(&dir, "hologram.hgx", b"bytes");
        let item = IngestItem {
            path,
            declared_type: Some("hologram".to_string()),
            metadata: BTreeMap::new(),
        };

        let mut ingestor = Ingestor::new();
        let outcome = ingestor.ingest_one(item, &audit);
        assert!(matches!(
            outcome,
            IngestOutcome::Failed { reason: IngestionFailure::UnsupportedType, .. }
        ));
    }

    #[test]
    fn kind_inference_from_extension() {
        assert_eq!(infer_kind(Path::new("a.PDF")), EvidenceKind::Document);
        assert_eq!(infer_kind(Path::new("a.heic")), EvidenceKind::Image);
        assert_eq!(infer_kind(Path::new("a.wav")), EvidenceKind::Audio);
        assert_eq!(infer_kind(Path::new("a.mkv")), EvidenceKind::Video);
        assert_eq!(infer_kind(Path::new("a.xyz")), EvidenceKind::Unknown);
        assert_eq!(infer_kind(Path::new("noext")), EvidenceKind::Unknown);
    }

    #[test]
    fn importer_metadata_is_preserved() {
        let dir = tempfile::tempdir().expect("tempdir");
        let audit = AuditLog::new();
        let path = write_file(&dir, "doc.txt", b"text");
        let mut metadata = BTreeMap::new();
        metadata.insert("custody.acquired_by".to_string(), MetaValue::from("officer-7"));

        let mut ingestor = Ingestor::new();
        let outcome = ingestor.ingest_one(
            IngestItem { path, declared_type: None, metadata },
            &audit,
        );
        let record = outcome.record().expect("sealed");
        assert_eq!(
            record.metadata.get("custody.acquired_by").and_then(MetaValue::as_text),
            Some("officer-7")
        );
    }
}
