//! # Pipeline Configuration
//!
//! Every numeric threshold in the pipeline is a configurable default, not a
//! load-bearing invariant. The defaults here are the canonical values; an
//! operator can override any of them from a TOML file in the app layer.
//!
//! The one deliberate design constant worth calling out: the trust index
//! mixes the mean confidence with the **minimum** confidence so that one
//! badly-performing module cannot be diluted away by seven confident ones.

use serde::Deserialize;

// =============================================================================
// SYNTHESIS DEFAULTS
// =============================================================================

/// Weight of the mean module confidence in the trust index.
pub const DEFAULT_MEAN_WEIGHT: f64 = 0.7;

/// Weight of the minimum module confidence in the trust index.
pub const DEFAULT_MIN_WEIGHT: f64 = 0.3;

/// Per-module confidence above which a module counts as high-confidence.
pub const DEFAULT_HIGH_CONFIDENCE: f64 = 0.7;

/// Consensus bonus granted once the high-confidence quorum is met.
pub const DEFAULT_CONSENSUS_BONUS: f64 = 0.1;

/// Minimum number of high-confidence modules for the consensus bonus.
pub const DEFAULT_CONSENSUS_QUORUM: usize = 6;

/// Consensus at or above this value counts as "agreement achieved".
pub const DEFAULT_AGREEMENT_THRESHOLD: f64 = 0.75;

/// Trust index threshold for the Verified tier.
pub const DEFAULT_VERIFIED_TRUST: f64 = 80.0;

/// Trust index threshold for the Conditional tier.
pub const DEFAULT_CONDITIONAL_TRUST: f64 = 60.0;

/// Consensus threshold for the Conditional tier.
pub const DEFAULT_CONDITIONAL_CONSENSUS: f64 = 0.5;

// =============================================================================
// ORCHESTRATOR / BRAIN DEFAULTS
// =============================================================================

/// Per-module deadline in milliseconds. A module that exceeds it is
/// treated as a degraded-output failure, never allowed to stall the run.
pub const DEFAULT_MODULE_DEADLINE_MS: u64 = 30_000;

/// Travel speed between consecutive GPS-tagged items above which the
/// timeline brain reports impossible travel.
pub const DEFAULT_IMPOSSIBLE_TRAVEL_KMH: f64 = 1000.0;

/// Metadata completeness ratio below which recommendations flag the
/// evidence set as thin.
pub const DEFAULT_MIN_METADATA_COMPLETENESS: f64 = 0.5;

// =============================================================================
// CONFIG STRUCTS
// =============================================================================

/// Synthesis engine thresholds.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SynthesisConfig {
    /// Weight of the mean confidence in the trust index.
    pub mean_weight: f64,
    /// Weight of the minimum confidence in the trust index.
    pub min_weight: f64,
    /// High-confidence threshold for consensus.
    pub high_confidence: f64,
    /// Bonus added to consensus once the quorum is met.
    pub consensus_bonus: f64,
    /// High-confidence module count required for the bonus.
    pub consensus_quorum: usize,
    /// Consensus level that counts as agreement achieved.
    pub agreement_threshold: f64,
    /// Trust index required for Verified.
    pub verified_trust: f64,
    /// Trust index required for Conditional.
    pub conditional_trust: f64,
    /// Consensus required for Conditional.
    pub conditional_consensus: f64,
    /// Metadata completeness ratio below which recommendations flag it.
    pub min_metadata_completeness: f64,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            mean_weight: DEFAULT_MEAN_WEIGHT,
            min_weight: DEFAULT_MIN_WEIGHT,
            high_confidence: DEFAULT_HIGH_CONFIDENCE,
            consensus_bonus: DEFAULT_CONSENSUS_BONUS,
            consensus_quorum: DEFAULT_CONSENSUS_QUORUM,
            agreement_threshold: DEFAULT_AGREEMENT_THRESHOLD,
            verified_trust: DEFAULT_VERIFIED_TRUST,
            conditional_trust: DEFAULT_CONDITIONAL_TRUST,
            conditional_consensus: DEFAULT_CONDITIONAL_CONSENSUS,
            min_metadata_completeness: DEFAULT_MIN_METADATA_COMPLETENESS,
        }
    }
}

/// Top-level pipeline configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Per-module deadline.
    pub module_deadline_ms: Option<u64>,
    /// Brain thresholds.
    pub brains: BrainConfig,
    /// Synthesis thresholds.
    pub synthesis: SynthesisConfig,
}

impl PipelineConfig {
    /// Effective per-module deadline in milliseconds.
    #[must_use]
    pub fn deadline_ms(&self) -> u64 {
        self.module_deadline_ms.unwrap_or(DEFAULT_MODULE_DEADLINE_MS)
    }
}

/// Thresholds used by individual brains.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BrainConfig {
    /// Impossible-travel speed threshold in km/h.
    pub impossible_travel_kmh: f64,
    /// Extra suspicious keywords on top of the built-in list.
    pub extra_keywords: Vec<String>,
}

impl Default for BrainConfig {
    fn default() -> Self {
        Self {
            impossible_travel_kmh: DEFAULT_IMPOSSIBLE_TRAVEL_KMH,
            extra_keywords: Vec::new(),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
