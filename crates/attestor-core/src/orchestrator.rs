//! # Orchestrator
//!
//! Drives one analysis run end to end:
//!
//! `Idle → Running → Synthesizing → Sealing → Done`, with `Failed`
//! reachable from `Running`/`Synthesizing` only on an orchestrator-level
//! error. Module-level problems never fail a run; they are absorbed into
//! degraded results per the brain contract.
//!
//! The eight registered brains run concurrently on the blocking pool, each
//! under a deadline. Synthesis is a strict barrier: it never observes a
//! partial result set, and results are re-ordered to registry order before
//! synthesis so completion order cannot influence the verdict.
//!
//! Cancellation: dropping the run future abandons in-flight module tasks;
//! they may finish on the pool but the run writes no seal. Audit appends
//! are atomic, so a cancelled run never leaves a half-written entry.

use crate::audit::AuditLog;
use crate::brain::{Brain, BrainRegistry};
use crate::report::ReportAssembler;
use crate::sealing::{gate2_input_hash, gate2_output_hash};
use crate::synthesis::SynthesisEngine;
use crate::types::{
    AttestorError, AuditAction, EvidenceRecord, ForensicReport, GeoPoint, ModuleResult,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

// =============================================================================
// PROGRESS
// =============================================================================

/// One progress snapshot delivered to the observer. Delivery is
/// at-least-once per module transition; consumers may coalesce.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressSnapshot {
    /// Modules completed so far.
    pub completed: usize,
    /// Total non-synthesis modules in this run.
    pub total: usize,
    /// Name of the module this snapshot is about, if any.
    pub active_module: Option<String>,
    /// Overall percent complete, 0–100.
    pub percent: u8,
}

/// Observer callback for progress snapshots. Called from module tasks
/// concurrently; implementations must be cheap and non-blocking.
pub type ProgressObserver = Arc<dyn Fn(ProgressSnapshot) + Send + Sync>;

// =============================================================================
// RUN STATE
// =============================================================================

/// Orchestrator state machine. Within `Running`, each module moves
/// Pending → Active → Complete on the pool; those sub-states surface
/// through progress snapshots rather than through this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// No run in progress.
    Idle,
    /// The eight modules are executing.
    Running,
    /// All module results collected; synthesis in progress.
    Synthesizing,
    /// Report assembly and Gate 3.
    Sealing,
    /// Run finished with a sealed report.
    Done,
    /// Orchestrator-level failure; no seal was produced.
    Failed,
}

// =============================================================================
// ORCHESTRATOR
// =============================================================================

/// Schedules the brains, enforces the synthesis barrier, and triggers
/// sealing. Construct once per pipeline and reuse across runs.
pub struct Orchestrator {
    registry: BrainRegistry,
    engine: SynthesisEngine,
    deadline: Duration,
    audit: Arc<AuditLog>,
    observer: Option<ProgressObserver>,
    state: Mutex<RunState>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("modules", &self.registry.names())
            .field("deadline", &self.deadline)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    /// Create an orchestrator over a registry and a shared audit log.
    #[must_use]
    pub fn new(
        registry: BrainRegistry,
        engine: SynthesisEngine,
        deadline: Duration,
        audit: Arc<AuditLog>,
    ) -> Self {
        Self {
            registry,
            engine,
            deadline,
            audit,
            observer: None,
            state: Mutex::new(RunState::Idle),
        }
    }

    /// Attach a progress observer.
    #[must_use]
    pub fn with_observer(mut self, observer: ProgressObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Current run state.
    #[must_use]
    pub fn state(&self) -> RunState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, state: RunState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }

    fn emit(&self, snapshot: ProgressSnapshot) {
        if let Some(observer) = &self.observer {
            observer(snapshot);
        }
    }

    /// Execute one full run over the evidence set.
    ///
    /// Returns the sealed report, or an [`AttestorError::Orchestrator`]
    /// if the run could not be driven at all. Already-recorded audit
    /// entries survive a failure.
    pub async fn run(
        &self,
        run_id: impl Into<String>,
        evidence: Vec<EvidenceRecord>,
        location: Option<GeoPoint>,
    ) -> Result<ForensicReport, AttestorError> {
        let run_id = run_id.into();
        if self.registry.is_empty() {
            self.set_state(RunState::Failed);
            self.audit
                .append(AuditAction::RunFailed, format!("run:{run_id}"), "empty registry");
            return Err(AttestorError::Orchestrator(
                "no analysis modules registered".to_string(),
            ));
        }

        self.set_state(RunState::Running);
        // Compliance counts only audit entries from this run onward; the
        // log itself is shared across runs of a reused orchestrator.
        let run_from_seq = self.audit.append(
            AuditAction::RunStarted,
            format!("run:{run_id}"),
            format!("{} evidence items, {} modules", evidence.len(), self.registry.len()),
        );
        tracing::info!(run = %run_id, modules = self.registry.len(), "run started");

        let total = self.registry.len();
        self.emit(ProgressSnapshot {
            completed: 0,
            total,
            active_module: None,
            percent: 0,
        });

        // Gate 1 check: one audit entry per record. A missing precomputed
        // hash never blocks the run; the gap is recorded and surfaces in
        // compliance checks.
        for record in &evidence {
            if record.has_integrity_gap() {
                self.audit.append(
                    AuditAction::Gate1Gap,
                    format!("evidence:{}", record.id.0),
                    "no precomputed hash; analyzing with recorded integrity gap",
                );
            } else {
                self.audit.append(
                    AuditAction::Gate1Sealed,
                    format!("evidence:{}", record.id.0),
                    "precomputed hash verified present",
                );
            }
        }

        // Fan-out: all eight modules at once, each under the deadline.
        let evidence = Arc::new(evidence);
        let completed = Arc::new(AtomicUsize::new(0));
        let mut tasks = tokio::task::JoinSet::new();

        for (index, brain) in self.registry.brains().iter().enumerate() {
            tasks.spawn(self.module_task(
                index,
                Arc::clone(brain),
                Arc::clone(&evidence),
                Arc::clone(&completed),
            ));
        }

        // Fan-in barrier: synthesis never sees fewer than all results.
        let mut slots: Vec<Option<ModuleResult>> = (0..total).map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, result)) => slots[index] = Some(result),
                Err(e) => {
                    self.set_state(RunState::Failed);
                    self.audit.append(
                        AuditAction::RunFailed,
                        format!("run:{run_id}"),
                        format!("module task lost: {e}"),
                    );
                    return Err(AttestorError::Orchestrator(format!(
                        "module task could not be joined: {e}"
                    )));
                }
            }
        }
        let mut results: Vec<ModuleResult> = Vec::with_capacity(total + 1);
        for (index, slot) in slots.into_iter().enumerate() {
            match slot {
                Some(result) => results.push(result),
                None => {
                    // Unreachable by construction; treated as structural.
                    self.set_state(RunState::Failed);
                    return Err(AttestorError::Orchestrator(format!(
                        "missing result for module index {index}"
                    )));
                }
            }
        }

        self.set_state(RunState::Synthesizing);
        let (verdict, synthesis_result) = self.engine.synthesize(&results);
        tracing::info!(
            run = %run_id,
            trust = verdict.trust_index,
            consensus = verdict.consensus,
            tier = verdict.tier.name(),
            "synthesis complete"
        );

        self.set_state(RunState::Sealing);
        let agreement = self.engine.agreement_reached(verdict.consensus);
        results.push(synthesis_result);
        let report = ReportAssembler::assemble(
            run_id.clone(),
            Arc::try_unwrap(evidence).unwrap_or_else(|shared| (*shared).clone()),
            results,
            verdict,
            location,
            &self.audit,
            &self.registry.names(),
            agreement,
            run_from_seq,
        )?;

        self.audit.append(
            AuditAction::RunCompleted,
            format!("run:{run_id}"),
            format!("tier={}", report.verdict.tier.name()),
        );
        self.emit(ProgressSnapshot {
            completed: total,
            total,
            active_module: None,
            percent: 100,
        });
        self.set_state(RunState::Done);
        Ok(report)
    }

    /// One module execution: Gate-2 bracketing, deadline enforcement,
    /// degraded-result absorption. Runs the brain on the blocking pool.
    fn module_task(
        &self,
        index: usize,
        brain: Arc<dyn Brain>,
        evidence: Arc<Vec<EvidenceRecord>>,
        completed: Arc<AtomicUsize>,
    ) -> impl std::future::Future<Output = (usize, ModuleResult)> + use<> {
        let audit = Arc::clone(&self.audit);
        let observer = self.observer.clone();
        let deadline = self.deadline;
        let total = self.registry.len();

        async move {
            let name = brain.name();
            audit.append(
                AuditAction::Gate2Start,
                format!("module:{name}"),
                format!("input=sha512:{}", &gate2_input_hash(&evidence)[..16]),
            );
            if let Some(observer) = &observer {
                observer(ProgressSnapshot {
                    completed: completed.load(Ordering::SeqCst),
                    total,
                    active_module: Some(name.to_string()),
                    percent: percent_of(completed.load(Ordering::SeqCst), total),
                });
            }

            let worker = tokio::task::spawn_blocking({
                let evidence = Arc::clone(&evidence);
                move || brain.analyze(&evidence)
            });

            let result = match tokio::time::timeout(deadline, worker).await {
                Ok(Ok(result)) => result,
                Ok(Err(e)) => {
                    tracing::warn!(module = name, error = %e, "module panicked; absorbing");
                    ModuleResult::degraded(name, format!("module task failed: {e}"))
                }
                Err(_) => {
                    tracing::warn!(module = name, ?deadline, "module deadline exceeded");
                    ModuleResult::degraded(name, format!("deadline of {deadline:?} exceeded"))
                }
            };

            audit.append(
                AuditAction::Gate2End,
                format!("module:{name}"),
                format!(
                    "output=sha512:{} findings={} confidence={:.2}",
                    &gate2_output_hash(&result)[..16],
                    result.findings.len(),
                    result.confidence
                ),
            );

            let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
            if let Some(observer) = &observer {
                observer(ProgressSnapshot {
                    completed: done,
                    total,
                    active_module: Some(name.to_string()),
                    percent: percent_of(done, total),
                });
            }
            (index, result)
        }
    }
}

/// Module progress as a percentage, reserving the last tranche for
/// synthesis and sealing.
fn percent_of(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    ((completed * 90) / total) as u8
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EvidenceId, EvidenceKind, Finding, Severity};
    use std::collections::BTreeMap;

    struct FixedBrain {
        name: &'static str,
        confidence: f64,
        delay: Duration,
    }

    impl Brain for FixedBrain {
        fn name(&self) -> &'static str {
            self.name
        }
        fn analyze(&self, _evidence: &[EvidenceRecord]) -> ModuleResult {
            std::thread::sleep(self.delay);
            let finding = Finding::new(Severity::Info, "fixed", "ok", self.confidence);
            ModuleResult::new(self.name, self.confidence, vec![finding], 1)
        }
    }

    fn registry_of(brains: Vec<FixedBrain>) -> BrainRegistry {
        let mut registry = BrainRegistry::new();
        for brain in brains {
            registry.register(Arc::new(brain));
        }
        registry
    }

    fn record(id: u64) -> EvidenceRecord {
        EvidenceRecord {
            id: EvidenceId(id),
            kind: EvidenceKind::Document,
            source: format!("{id}.txt"),
            declared_size: 1,
            ingested_at_ms: 0,
            metadata: BTreeMap::new(),
        }
    }

    fn names(n: usize) -> Vec<&'static str> {
        ["m0", "m1", "m2", "m3", "m4", "m5", "m6", "m7"][..n].to_vec()
    }

    fn orchestrator(brains: Vec<FixedBrain>, deadline: Duration) -> Orchestrator {
        Orchestrator::new(
            registry_of(brains),
            SynthesisEngine::default(),
            deadline,
            Arc::new(AuditLog::new()),
        )
    }

    fn eight_brains(confidence: f64) -> Vec<FixedBrain> {
        names(8)
            .into_iter()
            .map(|name| FixedBrain {
                name,
                confidence,
                delay: Duration::ZERO,
            })
            .collect()
    }

    #[tokio::test]
    async fn run_produces_a_sealed_compliant_report() {
        let orchestrator = orchestrator(eight_brains(0.9), Duration::from_secs(5));
        let report = orchestrator
            .run("t1", vec![record(0)], None)
            .await
            .expect("run");

        assert_eq!(orchestrator.state(), RunState::Done);
        assert_eq!(report.module_results.len(), 9);
        assert!(report.compliance.compliant());
        assert!(crate::report::verify_report(&report).expect("verify"));
    }

    #[tokio::test]
    async fn reused_orchestrator_stays_compliant_across_runs() {
        let audit = Arc::new(AuditLog::new());
        let orchestrator = Orchestrator::new(
            registry_of(eight_brains(0.9)),
            SynthesisEngine::default(),
            Duration::from_secs(5),
            Arc::clone(&audit),
        );
        let first = orchestrator
            .run("t1-a", vec![record(0)], None)
            .await
            .expect("first run");
        let second = orchestrator
            .run("t1-b", vec![record(1)], None)
            .await
            .expect("second run");

        // The shared audit log now holds two runs' worth of gate entries;
        // each report's compliance must reflect only its own run.
        assert!(first.compliance.compliant());
        assert!(second.compliance.compliant(), "{:?}", second.compliance);
        assert_eq!(audit.count_action(AuditAction::Gate3Sealed), 2);
    }

    #[tokio::test]
    async fn slow_module_is_degraded_not_blocking() {
        let mut brains = eight_brains(0.9);
        // Long enough to trip the deadline, short enough that runtime
        // shutdown (which waits for blocking tasks) stays quick.
        brains[4].delay = Duration::from_millis(500);
        let orchestrator = orchestrator(brains, Duration::from_millis(50));
        let report = orchestrator
            .run("t2", vec![record(0)], None)
            .await
            .expect("run");

        let degraded = &report.module_results[4];
        assert_eq!(degraded.module, "m4");
        assert_eq!(degraded.confidence, 0.0);
        assert!(degraded.has_critical());
    }

    #[tokio::test]
    async fn results_are_in_registry_order_regardless_of_completion() {
        let mut brains = eight_brains(0.9);
        // First module finishes last.
        brains[0].delay = Duration::from_millis(100);
        let orchestrator = orchestrator(brains, Duration::from_secs(5));
        let report = orchestrator
            .run("t3", vec![record(0)], None)
            .await
            .expect("run");

        let modules: Vec<&str> =
            report.module_results.iter().map(|r| r.module.as_str()).collect();
        assert_eq!(
            modules,
            vec!["m0", "m1", "m2", "m3", "m4", "m5", "m6", "m7", "synthesis"]
        );
    }

    #[tokio::test]
    async fn empty_registry_is_an_orchestrator_failure() {
        let orchestrator = Orchestrator::new(
            BrainRegistry::new(),
            SynthesisEngine::default(),
            Duration::from_secs(1),
            Arc::new(AuditLog::new()),
        );
        let err = orchestrator.run("t4", vec![record(0)], None).await;
        assert!(matches!(err, Err(AttestorError::Orchestrator(_))));
        assert_eq!(orchestrator.state(), RunState::Failed);
    }

    #[tokio::test]
    async fn progress_reaches_one_hundred_percent() {
        let snapshots: Arc<Mutex<Vec<ProgressSnapshot>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&snapshots);
        let observer: ProgressObserver = Arc::new(move |s| {
            sink.lock().unwrap_or_else(PoisonError::into_inner).push(s);
        });

        let orchestrator =
            orchestrator(eight_brains(0.9), Duration::from_secs(5)).with_observer(observer);
        orchestrator.run("t5", vec![record(0)], None).await.expect("run");

        let seen = snapshots.lock().unwrap_or_else(PoisonError::into_inner);
        assert!(seen.first().is_some_and(|s| s.percent == 0));
        assert!(seen.last().is_some_and(|s| s.percent == 100));
        // At least one transition snapshot per module start and end.
        assert!(seen.len() >= 2 + 8);
    }

    #[tokio::test]
    async fn audit_contains_gate2_pairs_for_every_module() {
        let audit = Arc::new(AuditLog::new());
        let orchestrator = Orchestrator::new(
            registry_of(eight_brains(0.9)),
            SynthesisEngine::default(),
            Duration::from_secs(5),
            Arc::clone(&audit),
        );
        orchestrator.run("t6", vec![record(0)], None).await.expect("run");

        for name in names(8) {
            let subject = format!("module:{name}");
            assert_eq!(audit.count_action_for(AuditAction::Gate2Start, &subject), 1);
            assert_eq!(audit.count_action_for(AuditAction::Gate2End, &subject), 1);
        }
        assert_eq!(audit.count_action(AuditAction::Gate3Sealed), 1);
        assert_eq!(audit.count_action(AuditAction::Gate1Sealed), 0);
        assert_eq!(audit.count_action(AuditAction::Gate1Gap), 1);
    }

    #[tokio::test]
    async fn deterministic_verdict_across_runs() {
        let evidence = vec![record(0), record(1)];
        let first = orchestrator(eight_brains(0.8), Duration::from_secs(5))
            .run("a", evidence.clone(), None)
            .await
            .expect("run");
        let second = orchestrator(eight_brains(0.8), Duration::from_secs(5))
            .run("b", evidence, None)
            .await
            .expect("run");

        assert_eq!(first.verdict.trust_index, second.verdict.trust_index);
        assert_eq!(first.verdict.consensus, second.verdict.consensus);
        assert_eq!(first.verdict.tier, second.verdict.tier);
    }
}
