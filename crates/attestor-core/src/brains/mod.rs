//! # Standard Analysis Brains
//!
//! The eight canonical analysis modules. Each is an independent, pure
//! implementation of the [`Brain`](crate::brain::Brain) contract over the
//! evidence metadata: no I/O, no shared state, no knowledge of any other
//! module. The heuristics here are the canonical defaults; they are
//! swappable through the registry without touching orchestration.

mod content;
mod custody;
mod device;
mod integrity;
mod metadata;
mod provenance;
mod statistical;
mod timeline;

pub use content::ContentBrain;
pub use custody::CustodyBrain;
pub use device::DeviceBrain;
pub use integrity::IntegrityBrain;
pub use metadata::MetadataBrain;
pub use provenance::ProvenanceBrain;
pub use statistical::StatisticalBrain;
pub use timeline::TimelineBrain;

use crate::types::{Finding, ModuleResult, Severity};

/// Result for a brain handed an empty evidence set: degraded condition
/// reported as an Info finding per the contract, never an abort.
#[must_use]
pub(crate) fn no_evidence_result(module: &'static str, started: std::time::Instant) -> ModuleResult {
    let finding = Finding::new(
        Severity::Info,
        "degraded-input",
        "no evidence supplied; nothing to analyze",
        0.0,
    );
    ModuleResult::new(module, 0.0, vec![finding], elapsed_ms(started))
}

/// Milliseconds since `started`, saturating.
#[must_use]
pub(crate) fn elapsed_ms(started: std::time::Instant) -> u64 {
    started.elapsed().as_millis() as u64
}
