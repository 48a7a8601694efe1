//! # Brain Contract
//!
//! The uniform interface every analysis module implements.
//!
//! Contract obligations:
//! - `analyze` must terminate; the orchestrator enforces a deadline on top.
//! - The evidence set is borrowed immutably and must not be mutated.
//! - A brain must be safely callable concurrently with any other brain:
//!   no shared mutable state, no inter-brain communication.
//! - A brain never aborts the run. A degraded condition is reported as an
//!   Info finding inside a normal result; a hard failure as a single
//!   Critical finding with confidence 0 ([`ModuleResult::degraded`]), so
//!   synthesis reacts deterministically instead of the orchestrator
//!   special-casing anything.

use crate::config::PipelineConfig;
use crate::types::{EvidenceRecord, ModuleResult};
use std::sync::Arc;

/// An independent analysis module.
pub trait Brain: Send + Sync {
    /// Stable module name, used in audit entries and results.
    fn name(&self) -> &'static str;

    /// Analyze the evidence set and produce one result.
    fn analyze(&self, evidence: &[EvidenceRecord]) -> ModuleResult;
}

// =============================================================================
// REGISTRY
// =============================================================================

/// A registry of brains, constructed once at startup and handed to the
/// orchestrator. Substituting or disabling a module is a registry edit;
/// orchestration code never names a concrete brain.
#[derive(Clone, Default)]
pub struct BrainRegistry {
    brains: Vec<Arc<dyn Brain>>,
}

impl std::fmt::Debug for BrainRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrainRegistry")
            .field("modules", &self.names())
            .finish()
    }
}

impl BrainRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard eight-module registry with the given thresholds.
    #[must_use]
    pub fn standard(config: &PipelineConfig) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(crate::brains::MetadataBrain::new()));
        registry.register(Arc::new(crate::brains::TimelineBrain::new(
            config.brains.impossible_travel_kmh,
        )));
        registry.register(Arc::new(crate::brains::IntegrityBrain::new()));
        registry.register(Arc::new(crate::brains::DeviceBrain::new()));
        registry.register(Arc::new(crate::brains::ContentBrain::new(
            config.brains.extra_keywords.clone(),
        )));
        registry.register(Arc::new(crate::brains::CustodyBrain::new()));
        registry.register(Arc::new(crate::brains::StatisticalBrain::new()));
        registry.register(Arc::new(crate::brains::ProvenanceBrain::new()));
        registry
    }

    /// Add a brain. Order is the canonical result order for the run.
    pub fn register(&mut self, brain: Arc<dyn Brain>) {
        self.brains.push(brain);
    }

    /// Registered brains in registration order.
    #[must_use]
    pub fn brains(&self) -> &[Arc<dyn Brain>] {
        &self.brains
    }

    /// Number of registered brains.
    #[must_use]
    pub fn len(&self) -> usize {
        self.brains.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.brains.is_empty()
    }

    /// Module names in registration order.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.brains.iter().map(|b| b.name()).collect()
    }
}

// =============================================================================
// TESTS
// =============================================================================
