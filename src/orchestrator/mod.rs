//! The multi-cycle analysis loop.
//!
//! An [`Orchestrator`] owns the run configuration and a [`CycleExecutor`].
//! Each call to [`Orchestrator::run`] builds a fresh [`RunState`], drives
//! cycles until the termination evaluator stops the run, then consolidates
//! everything into an [`AnalysisOutcome`].

pub mod consolidate;

pub use consolidate::{
    ArchitectureSummary, BestResult, ConsolidatedReport, ReportContext, RiskLevel,
};

use std::path::Path;
use std::time::{Duration, Instant};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::analyzers::AnalyzerSuite;
use crate::config::{Config, RunConfig};
use crate::cycle::{CycleExecutor, CycleParams, CycleResult, CycleType, ExecutionStrategy};
use crate::error::AppResult;
use crate::insights::Insight;
use crate::knowledge::{KnowledgeStore, ProjectSnapshot};
use crate::termination::{Decision, StopReason, TerminationEvaluator};
use crate::uncertainty::UncertaintySet;

// ============================================================================
// Run State
// ============================================================================

/// Everything a single run accumulates. Owned by the loop, never shared.
#[derive(Debug, Clone)]
pub struct RunState {
    pub knowledge: KnowledgeStore,
    /// Cycle results in execution order
    pub history: Vec<CycleResult>,
    pub uncertainties: UncertaintySet,
    pub stop_reason: Option<StopReason>,
}

impl RunState {
    pub fn new(knowledge: KnowledgeStore) -> Self {
        Self {
            knowledge,
            history: Vec::new(),
            uncertainties: UncertaintySet::new(),
            stop_reason: None,
        }
    }

    /// Merge a finished cycle into the knowledge store and history.
    pub fn absorb(&mut self, cycle: CycleResult) {
        self.knowledge.record(&cycle);
        self.uncertainties
            .extend(cycle.uncertainties.iter().cloned());
        self.history.push(cycle);
    }

    pub fn cycles_completed(&self) -> u32 {
        self.history.len() as u32
    }
}

// ============================================================================
// Outcome
// ============================================================================

/// Performance figures for a finished run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetrics {
    pub total_cycles: u32,
    pub total_time_secs: f64,
    pub avg_cycle_time_secs: f64,
    /// Average confidence of the last cycle minus that of the first
    pub confidence_improvement: f64,
    pub insights_per_cycle: f64,
}

/// What a run returns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisOutcome {
    pub report: ConsolidatedReport,
    pub cycles: Vec<CycleResult>,
    /// Every insight emitted during the run, in emission order
    pub insights: Vec<Insight>,
    pub metrics: RunMetrics,
}

// ============================================================================
// Orchestrator
// ============================================================================

pub struct Orchestrator {
    config: RunConfig,
    executor: CycleExecutor,
    evaluator: TerminationEvaluator,
}

impl Orchestrator {
    /// Create an orchestrator dispatching to `suite`, with each analyzer call
    /// bounded by `analyzer_timeout`.
    pub fn new(config: RunConfig, suite: AnalyzerSuite, analyzer_timeout: Duration) -> Self {
        let executor = CycleExecutor::new(suite, analyzer_timeout)
            .with_reuse(config.cache_results, config.cache_reuse_threshold);
        let evaluator = TerminationEvaluator::new(&config);
        Self {
            config,
            executor,
            evaluator,
        }
    }

    pub fn from_config(config: &Config, suite: AnalyzerSuite) -> Self {
        Self::new(config.run.clone(), suite, config.analyzers.timeout())
    }

    /// Run with the configured default strategy.
    pub async fn run_default(&self, project: &Path) -> AppResult<AnalysisOutcome> {
        self.run(project, self.config.strategy_default).await
    }

    /// Analyze `project` over as many cycles as the termination evaluator
    /// allows.
    ///
    /// Fails only when the configuration is invalid or the project location
    /// is unusable. Analyzer failures show up as degraded confidence and
    /// uncertainties in the outcome.
    pub async fn run(
        &self,
        project: &Path,
        strategy: ExecutionStrategy,
    ) -> AppResult<AnalysisOutcome> {
        self.config.validate()?;

        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let started = Instant::now();

        info!(
            run_id = %run_id,
            project = %project.display(),
            strategy = %strategy,
            max_cycles = self.config.max_cycles,
            "Starting analysis run"
        );

        let snapshot = ProjectSnapshot::capture(project).await?;
        debug!(
            root_files = snapshot.root_files.len(),
            directories = snapshot.directories.len(),
            "Captured project snapshot"
        );
        let mut state = RunState::new(KnowledgeStore::new(snapshot));

        for cycle_number in 1..=self.config.max_cycles {
            let cycle_type = CycleType::for_cycle(cycle_number);
            let depth = self
                .config
                .depth_policy
                .depth_for(cycle_number, self.config.deep_from_cycle);
            let params = CycleParams::for_cycle(cycle_number, cycle_type, depth);

            info!(
                cycle = cycle_number,
                cycle_type = %cycle_type,
                depth = %depth,
                "Starting cycle"
            );

            let cycle = self
                .executor
                .run_cycle(strategy, project, &params, &state.knowledge)
                .await;

            info!(
                cycle = cycle_number,
                duration_ms = cycle.duration().as_millis() as u64,
                avg_confidence = cycle.average_confidence(),
                insights = cycle.insight_count(),
                uncertainties = cycle.uncertainties.len(),
                "Cycle completed"
            );

            let decision = self.evaluator.evaluate(&cycle, started.elapsed());
            state.absorb(cycle);

            if let Decision::Stop(reason) = decision {
                info!(cycle = cycle_number, reason = %reason, "Stopping analysis");
                state.stop_reason = Some(reason);
                break;
            }
        }

        let total_time = started.elapsed();
        let report = consolidate::consolidate(
            ReportContext {
                run_id,
                project_location: project.to_path_buf(),
                strategy,
                started_at,
                completed_at: Utc::now(),
            },
            &state,
        );
        let metrics = metrics(&state, total_time);

        info!(
            run_id = %run_id,
            total_cycles = metrics.total_cycles,
            total_time_ms = total_time.as_millis() as u64,
            overall_confidence = report.overall_confidence,
            stop_reason = %report.stop_reason,
            "Analysis run completed"
        );

        Ok(AnalysisOutcome {
            report,
            insights: state.knowledge.insights().to_vec(),
            cycles: state.history,
            metrics,
        })
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn metrics(state: &RunState, total_time: Duration) -> RunMetrics {
    let total_cycles = state.cycles_completed();
    let total_time_secs = total_time.as_secs_f64();
    let per_cycle = |value: f64| {
        if total_cycles == 0 {
            0.0
        } else {
            value / total_cycles as f64
        }
    };

    RunMetrics {
        total_cycles,
        total_time_secs,
        avg_cycle_time_secs: per_cycle(total_time_secs),
        confidence_improvement: state.knowledge.confidence_improvement(),
        insights_per_cycle: per_cycle(state.knowledge.insights().len() as f64),
    }
}
