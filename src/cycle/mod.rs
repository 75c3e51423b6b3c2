//! Cycle vocabulary: cycle types, analysis depth, per-cycle parameters and
//! the immutable [`CycleResult`] each pass produces.
//!
//! The [`executor`] module dispatches one cycle's analyzers under an
//! [`ExecutionStrategy`].

pub mod executor;

pub use executor::{CycleExecutor, ExecutionStrategy};

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::analyzers::{AnalyzerKind, AnalyzerResult};
use crate::insights::Insight;
use crate::scoring;
use crate::uncertainty::LOW_CONFIDENCE_THRESHOLD;

/// Results of one cycle keyed by analyzer.
pub type ResultMap = BTreeMap<AnalyzerKind, AnalyzerResult>;

/// Confidence per analyzer for one cycle.
pub type ConfidenceMap = BTreeMap<AnalyzerKind, f64>;

// ============================================================================
// Cycle Type
// ============================================================================

/// Phase of the refinement sequence a cycle belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleType {
    InitialScan,
    DeepAnalysis,
    ContextAware,
    Optimization,
    Validation,
}

impl CycleType {
    /// The phase sequence cycles 1 through 5 walk through.
    pub const SEQUENCE: [CycleType; 5] = [
        CycleType::InitialScan,
        CycleType::DeepAnalysis,
        CycleType::ContextAware,
        CycleType::Optimization,
        CycleType::Validation,
    ];

    /// Cycle `n` (1-based) maps to `SEQUENCE[n - 1]`; later cycles optimize.
    pub fn for_cycle(cycle_number: u32) -> Self {
        match cycle_number {
            n @ 1..=5 => Self::SEQUENCE[(n - 1) as usize],
            _ => CycleType::Optimization,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CycleType::InitialScan => "initial_scan",
            CycleType::DeepAnalysis => "deep_analysis",
            CycleType::ContextAware => "context_aware",
            CycleType::Optimization => "optimization",
            CycleType::Validation => "validation",
        }
    }
}

impl std::fmt::Display for CycleType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Analysis Depth
// ============================================================================

/// How thoroughly analyzers should look at the project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisDepth {
    Quick,
    Standard,
    Deep,
}

impl AnalysisDepth {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisDepth::Quick => "quick",
            AnalysisDepth::Standard => "standard",
            AnalysisDepth::Deep => "deep",
        }
    }
}

impl std::fmt::Display for AnalysisDepth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for AnalysisDepth {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "quick" => Ok(AnalysisDepth::Quick),
            "standard" => Ok(AnalysisDepth::Standard),
            "deep" => Ok(AnalysisDepth::Deep),
            _ => Err(format!("Unknown analysis depth: {}", s)),
        }
    }
}

/// How depth evolves from cycle to cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepthPolicy {
    /// Quick first, deep from `deep_from_cycle` on, standard in between.
    Increasing,
    /// Same depth for every cycle.
    Fixed(AnalysisDepth),
}

impl DepthPolicy {
    /// Depth for the given (1-based) cycle.
    pub fn depth_for(&self, cycle_number: u32, deep_from_cycle: u32) -> AnalysisDepth {
        match self {
            DepthPolicy::Fixed(depth) => *depth,
            DepthPolicy::Increasing if cycle_number <= 1 => AnalysisDepth::Quick,
            DepthPolicy::Increasing if cycle_number >= deep_from_cycle => AnalysisDepth::Deep,
            DepthPolicy::Increasing => AnalysisDepth::Standard,
        }
    }
}

impl std::str::FromStr for DepthPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("increasing") {
            return Ok(DepthPolicy::Increasing);
        }
        s.parse::<AnalysisDepth>()
            .map(DepthPolicy::Fixed)
            .map_err(|_| format!("Unknown depth policy: {}", s))
    }
}

// ============================================================================
// Cycle Parameters
// ============================================================================

/// Which analyses a cycle runs and with which options.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleParams {
    pub cycle_number: u32,
    pub cycle_type: CycleType,
    pub depth: AnalysisDepth,
    pub include_dependencies: bool,
    pub include_transitive: bool,
    pub include_history: bool,
    pub include_developer_profiles: bool,
    pub framework_specific: bool,
    pub check_vulnerabilities: bool,
    pub check_licenses: bool,
}

impl CycleParams {
    /// Build the parameter set enabled by `cycle_type`.
    pub fn for_cycle(cycle_number: u32, cycle_type: CycleType, depth: AnalysisDepth) -> Self {
        let base = Self {
            cycle_number,
            cycle_type,
            depth,
            include_dependencies: false,
            include_transitive: false,
            include_history: false,
            include_developer_profiles: false,
            framework_specific: true,
            check_vulnerabilities: false,
            check_licenses: false,
        };

        match cycle_type {
            CycleType::InitialScan => base,
            CycleType::DeepAnalysis => Self {
                include_dependencies: true,
                include_transitive: true,
                include_history: true,
                ..base
            },
            CycleType::ContextAware => Self {
                include_history: true,
                include_developer_profiles: true,
                ..base
            },
            CycleType::Optimization => Self {
                include_dependencies: true,
                include_transitive: true,
                check_vulnerabilities: true,
                check_licenses: true,
                ..base
            },
            CycleType::Validation => Self {
                include_dependencies: true,
                include_transitive: true,
                include_history: true,
                include_developer_profiles: true,
                check_vulnerabilities: true,
                check_licenses: true,
                ..base
            },
        }
    }

    /// Same parameters at a different depth.
    pub fn with_depth(&self, depth: AnalysisDepth) -> Self {
        Self {
            depth,
            ..self.clone()
        }
    }

    /// Analyzers applicable this cycle, in dispatch order.
    pub fn scheduled(&self) -> Vec<AnalyzerKind> {
        AnalyzerKind::ALL
            .into_iter()
            .filter(|kind| self.is_scheduled(*kind))
            .collect()
    }

    pub fn is_scheduled(&self, kind: AnalyzerKind) -> bool {
        match kind {
            AnalyzerKind::Classification | AnalyzerKind::Architecture => true,
            AnalyzerKind::Dependencies => self.include_dependencies,
            AnalyzerKind::Context => self.include_history,
        }
    }
}

// ============================================================================
// Cycle Result
// ============================================================================

/// Everything one cycle produced. Never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleResult {
    pub cycle_number: u32,
    pub cycle_type: CycleType,
    pub depth: AnalysisDepth,
    pub strategy: ExecutionStrategy,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Wall-clock duration in seconds
    pub duration_secs: f64,
    pub results: ResultMap,
    pub confidence_scores: ConfidenceMap,
    pub insights: Vec<Insight>,
    pub uncertainties: Vec<String>,
    pub recommendations: Vec<String>,
}

impl CycleResult {
    /// Mean of this cycle's confidence scores (0.0 when nothing was scored).
    pub fn average_confidence(&self) -> f64 {
        scoring::average(&self.confidence_scores)
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.duration_secs.max(0.0))
    }

    pub fn insight_count(&self) -> usize {
        self.insights.len()
    }
}

/// Suggestions for the next cycle, derived from this cycle's scores and
/// uncertainties.
pub fn next_cycle_recommendations(scores: &ConfidenceMap, uncertainties: &[String]) -> Vec<String> {
    let mut recommendations = Vec::new();

    let low: Vec<&str> = scores
        .iter()
        .filter(|(_, confidence)| **confidence < LOW_CONFIDENCE_THRESHOLD)
        .map(|(kind, _)| kind.as_str())
        .collect();
    if !low.is_empty() {
        recommendations.push(format!("Focus on improving {} analysis", low.join(", ")));
    }

    if !uncertainties.is_empty() {
        let first: Vec<&str> = uncertainties.iter().take(3).map(String::as_str).collect();
        recommendations.push(format!("Address uncertainties: {}", first.join(", ")));
    }

    if scores.len() >= 3 {
        recommendations.push("Perform cross-analysis validation between components".to_string());
    }

    recommendations
}
