//! Dispatches one cycle's analyzers under an [`ExecutionStrategy`].
//!
//! Every analyzer call goes through a timeout guard that turns failures and
//! timeouts into error results, so nothing an analyzer does can abort a
//! cycle.

use std::collections::BTreeSet;
use std::future::Future;
use std::path::Path;
use std::time::{Duration, Instant};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{next_cycle_recommendations, AnalysisDepth, CycleParams, CycleResult, ResultMap};
use crate::analyzers::{
    AnalysisPayload, AnalyzerKind, AnalyzerResult, AnalyzerSuite, ArchitectureParams,
    ClassificationResult, ClassifyParams, ContextParams, DependencyParams,
};
use crate::error::{AnalyzerFailure, AnalyzerResultOf};
use crate::insights;
use crate::knowledge::KnowledgeStore;
use crate::scoring;
use crate::uncertainty;

/// Default confidence above which the adaptive strategy reuses a result.
pub const DEFAULT_REUSE_THRESHOLD: f64 = 0.9;

// ============================================================================
// Execution Strategy
// ============================================================================

/// How a cycle's analyzer calls are dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStrategy {
    /// One analyzer after another in dispatch order.
    Sequential,
    /// All scheduled analyzers at once.
    Concurrent,
    /// Sequential, reusing confident results from the previous cycle.
    Adaptive,
    /// Quick pass first, deep re-run of the uncertain analyzers.
    IterativeDeepening,
}

impl ExecutionStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStrategy::Sequential => "sequential",
            ExecutionStrategy::Concurrent => "concurrent",
            ExecutionStrategy::Adaptive => "adaptive",
            ExecutionStrategy::IterativeDeepening => "iterative_deepening",
        }
    }
}

impl std::fmt::Display for ExecutionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ExecutionStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "sequential" => Ok(ExecutionStrategy::Sequential),
            "concurrent" | "parallel" => Ok(ExecutionStrategy::Concurrent),
            "adaptive" => Ok(ExecutionStrategy::Adaptive),
            "iterative_deepening" | "deepening" => Ok(ExecutionStrategy::IterativeDeepening),
            _ => Err(format!("Unknown execution strategy: {}", s)),
        }
    }
}

// ============================================================================
// Cycle Executor
// ============================================================================

/// Runs the scheduled analyzers for one cycle and assembles its result.
#[derive(Debug, Clone)]
pub struct CycleExecutor {
    suite: AnalyzerSuite,
    timeout: Duration,
    cache_results: bool,
    reuse_threshold: f64,
}

impl CycleExecutor {
    /// Create an executor with result reuse enabled at the default threshold.
    pub fn new(suite: AnalyzerSuite, timeout: Duration) -> Self {
        Self {
            suite,
            timeout,
            cache_results: true,
            reuse_threshold: DEFAULT_REUSE_THRESHOLD,
        }
    }

    /// Configure adaptive reuse.
    pub fn with_reuse(mut self, cache_results: bool, reuse_threshold: f64) -> Self {
        self.cache_results = cache_results;
        self.reuse_threshold = reuse_threshold;
        self
    }

    /// Execute one cycle end to end: dispatch, scoring, insight extraction,
    /// uncertainty detection and next-cycle recommendations.
    pub async fn run_cycle(
        &self,
        strategy: ExecutionStrategy,
        project: &Path,
        params: &CycleParams,
        knowledge: &KnowledgeStore,
    ) -> CycleResult {
        let start_time = Utc::now();
        let started = Instant::now();

        let results = self.execute(strategy, project, params, knowledge).await;
        let confidence_scores = scoring::score_all(&results);
        let insights = insights::extract(&results, params.cycle_number);
        let uncertainties: Vec<String> = uncertainty::identify(&results, &confidence_scores)
            .into_iter()
            .map(|u| u.description)
            .collect();
        let recommendations = next_cycle_recommendations(&confidence_scores, &uncertainties);

        CycleResult {
            cycle_number: params.cycle_number,
            cycle_type: params.cycle_type,
            depth: params.depth,
            strategy,
            start_time,
            end_time: Utc::now(),
            duration_secs: started.elapsed().as_secs_f64(),
            results,
            confidence_scores,
            insights,
            uncertainties,
            recommendations,
        }
    }

    /// Dispatch the scheduled analyzers. Always returns one entry per
    /// scheduled analyzer.
    pub async fn execute(
        &self,
        strategy: ExecutionStrategy,
        project: &Path,
        params: &CycleParams,
        knowledge: &KnowledgeStore,
    ) -> ResultMap {
        debug!(
            cycle = params.cycle_number,
            strategy = %strategy,
            depth = %params.depth,
            "Dispatching analyzers"
        );

        match strategy {
            ExecutionStrategy::Sequential => {
                self.run_in_order(project, params, &params.scheduled(), None)
                    .await
            }
            ExecutionStrategy::Concurrent => self.run_concurrent(project, params).await,
            ExecutionStrategy::Adaptive => self.run_adaptive(project, params, knowledge).await,
            ExecutionStrategy::IterativeDeepening => self.run_deepening(project, params).await,
        }
    }

    // ========================================================================
    // Strategies
    // ========================================================================

    /// Run `kinds` one at a time. Architecture detection is seeded with the
    /// classification produced earlier in the same pass, or with `seed`.
    async fn run_in_order(
        &self,
        project: &Path,
        params: &CycleParams,
        kinds: &[AnalyzerKind],
        seed: Option<ClassificationResult>,
    ) -> ResultMap {
        let mut results = ResultMap::new();
        let mut prior = seed;

        for &kind in kinds {
            let result = self.invoke(kind, project, params, prior.clone()).await;
            if let Some(classification) = result.classification() {
                prior = Some(classification.clone());
            }
            results.insert(kind, result);
        }

        results
    }

    async fn run_concurrent(&self, project: &Path, params: &CycleParams) -> ResultMap {
        let (classification, architecture, dependencies, context) = tokio::join!(
            self.invoke_if_scheduled(AnalyzerKind::Classification, project, params),
            self.invoke_if_scheduled(AnalyzerKind::Architecture, project, params),
            self.invoke_if_scheduled(AnalyzerKind::Dependencies, project, params),
            self.invoke_if_scheduled(AnalyzerKind::Context, project, params),
        );

        [classification, architecture, dependencies, context]
            .into_iter()
            .flatten()
            .collect()
    }

    async fn run_adaptive(
        &self,
        project: &Path,
        params: &CycleParams,
        knowledge: &KnowledgeStore,
    ) -> ResultMap {
        let mut reused = ResultMap::new();
        let mut pending = Vec::new();

        for kind in params.scheduled() {
            match self.reusable(kind, params.cycle_number, knowledge) {
                Some(cached) => {
                    debug!(
                        cycle = params.cycle_number,
                        analyzer = %kind,
                        "Reusing previous cycle result"
                    );
                    reused.insert(kind, cached);
                }
                None => pending.push(kind),
            }
        }

        let seed = reused
            .get(&AnalyzerKind::Classification)
            .and_then(|r| r.classification().cloned());
        let mut results = self.run_in_order(project, params, &pending, seed).await;
        results.extend(reused);
        results
    }

    async fn run_deepening(&self, project: &Path, params: &CycleParams) -> ResultMap {
        let quick_params = params.with_depth(AnalysisDepth::Quick);
        let quick = self
            .run_in_order(project, &quick_params, &params.scheduled(), None)
            .await;
        let quick_scores = scoring::score_all(&quick);

        let uncertain: BTreeSet<AnalyzerKind> = uncertainty::identify(&quick, &quick_scores)
            .into_iter()
            .map(|u| u.analyzer)
            .collect();
        if uncertain.is_empty() {
            return quick;
        }

        let kinds: Vec<AnalyzerKind> = uncertain.into_iter().collect();
        debug!(
            cycle = params.cycle_number,
            analyzers = ?kinds,
            "Re-running uncertain analyzers at deep depth"
        );

        let seed = quick
            .get(&AnalyzerKind::Classification)
            .and_then(|r| r.classification().cloned());
        let deep_params = params.with_depth(AnalysisDepth::Deep);
        let deep = self.run_in_order(project, &deep_params, &kinds, seed).await;

        let mut merged = quick;
        for (kind, deep_result) in deep {
            let quick_confidence = quick_scores.get(&kind).copied().unwrap_or(0.0);
            if scoring::score(&deep_result) > quick_confidence {
                merged.insert(kind, deep_result);
            }
        }
        merged
    }

    /// The previous cycle's result for `kind`, if reuse is allowed and it
    /// was confident enough.
    fn reusable(
        &self,
        kind: AnalyzerKind,
        cycle_number: u32,
        knowledge: &KnowledgeStore,
    ) -> Option<AnalyzerResult> {
        if !self.cache_results || cycle_number <= 1 {
            return None;
        }

        let (result, confidence) = knowledge.result_for(cycle_number - 1, kind)?;
        if result.is_error() || confidence <= self.reuse_threshold {
            return None;
        }
        Some(result.clone().into_cached())
    }

    // ========================================================================
    // Analyzer Calls
    // ========================================================================

    async fn invoke_if_scheduled(
        &self,
        kind: AnalyzerKind,
        project: &Path,
        params: &CycleParams,
    ) -> Option<(AnalyzerKind, AnalyzerResult)> {
        if !params.is_scheduled(kind) {
            return None;
        }
        Some((kind, self.invoke(kind, project, params, None).await))
    }

    async fn invoke(
        &self,
        kind: AnalyzerKind,
        project: &Path,
        params: &CycleParams,
        prior_classification: Option<ClassificationResult>,
    ) -> AnalyzerResult {
        match kind {
            AnalyzerKind::Classification => {
                let port_params = ClassifyParams {
                    depth: params.depth,
                    include_dependencies: params.include_dependencies,
                };
                self.guarded(kind, self.suite.classifier.classify(project, &port_params))
                    .await
            }
            AnalyzerKind::Architecture => {
                let port_params = ArchitectureParams {
                    prior_classification,
                    framework_specific: params.framework_specific,
                };
                self.guarded(kind, self.suite.architecture.detect(project, &port_params))
                    .await
            }
            AnalyzerKind::Dependencies => {
                let port_params = DependencyParams {
                    include_transitive: params.include_transitive,
                    check_vulnerabilities: params.check_vulnerabilities,
                    check_licenses: params.check_licenses,
                };
                self.guarded(
                    kind,
                    self.suite.dependencies.map_dependencies(project, &port_params),
                )
                .await
            }
            AnalyzerKind::Context => {
                let port_params = ContextParams {
                    depth: params.depth,
                    include_developer_profiles: params.include_developer_profiles,
                };
                self.guarded(kind, self.suite.context.analyze_context(project, &port_params))
                    .await
            }
        }
    }

    /// Await one port call under the configured timeout.
    async fn guarded<T, F>(&self, kind: AnalyzerKind, call: F) -> AnalyzerResult
    where
        T: Into<AnalysisPayload>,
        F: Future<Output = AnalyzerResultOf<T>>,
    {
        let started = Instant::now();
        let timeout_ms = self.timeout.as_millis() as u64;

        match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(payload)) => {
                debug!(
                    analyzer = %kind,
                    latency_ms = started.elapsed().as_millis() as u64,
                    "Analyzer completed"
                );
                AnalyzerResult::completed(payload)
            }
            Ok(Err(failure)) => {
                warn!(
                    analyzer = %kind,
                    error = %failure,
                    latency_ms = started.elapsed().as_millis() as u64,
                    "Analyzer failed"
                );
                AnalyzerResult::failed(&failure)
            }
            Err(_) => {
                warn!(analyzer = %kind, timeout_ms, "Analyzer timed out");
                AnalyzerResult::failed(&AnalyzerFailure::Timeout { timeout_ms })
            }
        }
    }
}
