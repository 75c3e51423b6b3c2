//! End-of-run consolidation: best-of-all-cycles merge, quality scores,
//! risk level and final recommendations.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::RunState;
use crate::analyzers::{AnalyzerKind, AnalyzerResult};
use crate::cycle::{ConfidenceMap, CycleResult, ExecutionStrategy};
use crate::insights::{self, ImpactLevel, Insight};
use crate::knowledge::ProjectSnapshot;
use crate::termination::StopReason;
use crate::uncertainty::LOW_CONFIDENCE_THRESHOLD;

/// Variance of values spread over `[0, 1]` never exceeds this.
const MAX_VARIANCE: f64 = 0.25;

// ============================================================================
// Report Types
// ============================================================================

/// Overall project risk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The winning result for one analyzer across the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestResult {
    pub result: AnalyzerResult,
    pub confidence: f64,
    /// Cycle that produced it
    pub cycle_number: u32,
}

/// Architecture headline taken from the best architecture result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchitectureSummary {
    pub primary_pattern: String,
    pub framework: Option<String>,
    pub confidence: f64,
}

/// Best-of-all-cycles view of a finished run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsolidatedReport {
    pub run_id: Uuid,
    pub project_location: PathBuf,
    /// Root layout captured before the first cycle
    pub project: ProjectSnapshot,
    pub strategy: ExecutionStrategy,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub stop_reason: StopReason,
    pub project_type: Option<String>,
    pub complexity_score: u32,
    pub architecture: Option<ArchitectureSummary>,
    pub risk_level: RiskLevel,
    pub overall_confidence: f64,
    pub completeness_score: f64,
    pub consistency_score: f64,
    /// Per-analyzer confidence of every cycle, in cycle order
    pub confidence_trajectory: Vec<ConfidenceMap>,
    pub best_results: BTreeMap<AnalyzerKind, BestResult>,
    /// Deduplicated and ranked
    pub insights: Vec<Insight>,
    pub uncertainties: Vec<String>,
    pub recommendations: Vec<String>,
}

/// Run metadata the consolidated report is stamped with.
#[derive(Debug, Clone)]
pub struct ReportContext {
    pub run_id: Uuid,
    pub project_location: PathBuf,
    pub strategy: ExecutionStrategy,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

// ============================================================================
// Consolidation
// ============================================================================

/// Build the final report from a finished run.
pub fn consolidate(context: ReportContext, state: &RunState) -> ConsolidatedReport {
    let best_results = best_of_cycles(&state.history);
    let stop_reason = state.stop_reason.unwrap_or(StopReason::MaxCycles);

    let classification = best_results
        .get(&AnalyzerKind::Classification)
        .and_then(|best| best.result.classification());
    let architecture = best_results
        .get(&AnalyzerKind::Architecture)
        .and_then(|best| {
            best.result.architecture().map(|arch| ArchitectureSummary {
                primary_pattern: arch.primary_pattern.clone(),
                framework: arch.framework.clone(),
                confidence: best.confidence,
            })
        });

    let insights = insights::consolidate(state.knowledge.insights());
    let uncertainties: Vec<String> = state.uncertainties.iter().map(str::to_string).collect();
    let overall_confidence = overall_confidence(&best_results);
    let recommendations = final_recommendations(
        &best_results,
        overall_confidence,
        &uncertainties,
        &insights,
        stop_reason,
    );

    ConsolidatedReport {
        run_id: context.run_id,
        project_location: context.project_location,
        project: state.knowledge.project().clone(),
        strategy: context.strategy,
        started_at: context.started_at,
        completed_at: context.completed_at,
        stop_reason,
        project_type: classification.map(|c| c.project_type.clone()),
        complexity_score: classification.map(|c| c.complexity_score).unwrap_or(0),
        architecture,
        risk_level: risk_level(&best_results, &insights),
        overall_confidence,
        completeness_score: completeness(&best_results),
        consistency_score: consistency(&state.knowledge.all_confidences()),
        confidence_trajectory: state.knowledge.confidence_trajectory().to_vec(),
        best_results,
        insights,
        uncertainties,
        recommendations,
    }
}

/// Per analyzer, the highest-confidence result of any cycle. Ties keep the
/// earliest cycle.
pub fn best_of_cycles(history: &[CycleResult]) -> BTreeMap<AnalyzerKind, BestResult> {
    let mut best: BTreeMap<AnalyzerKind, BestResult> = BTreeMap::new();

    for cycle in history {
        for (kind, result) in &cycle.results {
            let confidence = cycle.confidence_scores.get(kind).copied().unwrap_or(0.0);
            let replace = best
                .get(kind)
                .map(|current| confidence > current.confidence)
                .unwrap_or(true);
            if replace {
                best.insert(
                    *kind,
                    BestResult {
                        result: result.clone(),
                        confidence,
                        cycle_number: cycle.cycle_number,
                    },
                );
            }
        }
    }

    best
}

/// Mean confidence of the best results.
pub fn overall_confidence(best: &BTreeMap<AnalyzerKind, BestResult>) -> f64 {
    if best.is_empty() {
        return 0.0;
    }
    best.values().map(|b| b.confidence).sum::<f64>() / best.len() as f64
}

/// Fraction of the four analyzer kinds with a non-error best result.
pub fn completeness(best: &BTreeMap<AnalyzerKind, BestResult>) -> f64 {
    let completed = AnalyzerKind::ALL
        .iter()
        .filter(|kind| best.get(*kind).is_some_and(|b| !b.result.is_error()))
        .count();
    completed as f64 / AnalyzerKind::ALL.len() as f64
}

/// `1 - variance / 0.25` over every recorded confidence, in `[0, 1]`.
/// Fewer than two values are trivially consistent.
pub fn consistency(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 1.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (1.0 - variance / MAX_VARIANCE).clamp(0.0, 1.0)
}

pub fn risk_level(best: &BTreeMap<AnalyzerKind, BestResult>, insights: &[Insight]) -> RiskLevel {
    let vulnerable = best
        .get(&AnalyzerKind::Dependencies)
        .and_then(|b| b.result.dependencies())
        .is_some_and(|deps| deps.summary.vulnerability_count > 0);

    if vulnerable {
        RiskLevel::High
    } else if insights.iter().any(|i| i.impact >= ImpactLevel::High) {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

/// Closing advice, each entry only when it applies.
pub fn final_recommendations(
    best: &BTreeMap<AnalyzerKind, BestResult>,
    overall_confidence: f64,
    uncertainties: &[String],
    insights: &[Insight],
    stop_reason: StopReason,
) -> Vec<String> {
    let mut recommendations = Vec::new();

    let weak: Vec<&str> = best
        .iter()
        .filter(|(_, b)| b.confidence < LOW_CONFIDENCE_THRESHOLD)
        .map(|(kind, _)| kind.as_str())
        .collect();
    if !weak.is_empty() {
        recommendations.push(format!(
            "Validate low confidence analyses: {}",
            weak.join(", ")
        ));
    }

    if overall_confidence < LOW_CONFIDENCE_THRESHOLD {
        recommendations
            .push("Consider additional manual analysis due to low confidence results".to_string());
    }

    if !uncertainties.is_empty() {
        let first: Vec<&str> = uncertainties.iter().take(3).map(String::as_str).collect();
        recommendations.push(format!(
            "Address these uncertainty areas: {}",
            first.join(", ")
        ));
    }

    if insights.iter().any(|i| i.impact == ImpactLevel::Critical) {
        recommendations.push("Immediately address critical insights for project health".to_string());
    }

    if stop_reason == StopReason::MaxCycles {
        recommendations.push("Consider increasing max cycles for more complex projects".to_string());
    }

    recommendations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::{
        ArchitectureResult, ClassificationResult, DependencyResult, DependencySummary,
    };
    use crate::cycle::{AnalysisDepth, CycleType, ResultMap};
    use crate::error::AnalyzerFailure;
    use crate::insights::InsightKind;
    use crate::scoring;
    use pretty_assertions::assert_eq;

    fn classification(confidence: f64, project_type: &str) -> AnalyzerResult {
        AnalyzerResult::completed(ClassificationResult {
            project_type: project_type.to_string(),
            confidence: Some(confidence),
            complexity_score: 5,
            tech_stack: vec![],
            indicators: vec![],
        })
    }

    fn cycle(number: u32, results: ResultMap) -> CycleResult {
        let confidence_scores = scoring::score_all(&results);
        CycleResult {
            cycle_number: number,
            cycle_type: CycleType::for_cycle(number),
            depth: AnalysisDepth::Standard,
            strategy: ExecutionStrategy::Sequential,
            start_time: Utc::now(),
            end_time: Utc::now(),
            duration_secs: 0.1,
            results,
            confidence_scores,
            insights: vec![],
            uncertainties: vec![],
            recommendations: vec![],
        }
    }

    fn single(kind: AnalyzerKind, result: AnalyzerResult) -> ResultMap {
        let mut map = ResultMap::new();
        map.insert(kind, result);
        map
    }

    #[test]
    fn test_best_of_cycles_picks_highest_confidence() {
        let history = vec![
            cycle(1, single(AnalyzerKind::Classification, classification(0.6, "prototype"))),
            cycle(2, single(AnalyzerKind::Classification, classification(0.9, "ongoing"))),
            cycle(3, single(AnalyzerKind::Classification, classification(0.7, "brownfield"))),
        ];
        let best = best_of_cycles(&history);
        let winner = &best[&AnalyzerKind::Classification];
        assert_eq!(winner.cycle_number, 2);
        assert_eq!(winner.confidence, 0.9);
        assert_eq!(
            winner.result.classification().map(|c| c.project_type.as_str()),
            Some("ongoing")
        );
    }

    #[test]
    fn test_best_of_cycles_keeps_earliest_on_tie() {
        let history = vec![
            cycle(1, single(AnalyzerKind::Classification, classification(0.8, "first"))),
            cycle(2, single(AnalyzerKind::Classification, classification(0.8, "second"))),
        ];
        assert_eq!(best_of_cycles(&history)[&AnalyzerKind::Classification].cycle_number, 1);
    }

    #[test]
    fn test_completeness_counts_non_error_results_of_four() {
        let mut results = ResultMap::new();
        results.insert(AnalyzerKind::Classification, classification(0.8, "ongoing"));
        results.insert(
            AnalyzerKind::Dependencies,
            AnalyzerResult::failed(&AnalyzerFailure::failed("offline")),
        );
        let best = best_of_cycles(&[cycle(1, results)]);
        assert_eq!(completeness(&best), 0.25);
        assert_eq!(completeness(&BTreeMap::new()), 0.0);
    }

    #[test]
    fn test_consistency() {
        assert_eq!(consistency(&[]), 1.0);
        assert_eq!(consistency(&[0.3]), 1.0);
        assert_eq!(consistency(&[0.8, 0.8, 0.8]), 1.0);
        // Maximum spread
        assert_eq!(consistency(&[0.0, 1.0]), 0.0);
        assert!((consistency(&[0.4, 0.6]) - 0.96).abs() < 1e-9);
    }

    #[test]
    fn test_risk_level() {
        let vulnerable = single(
            AnalyzerKind::Dependencies,
            AnalyzerResult::completed(DependencyResult {
                summary: DependencySummary {
                    total_direct_dependencies: 2,
                    total_transitive_dependencies: 4,
                    vulnerability_count: 1,
                    license_issues: 0,
                },
                ecosystems: vec![],
                confidence: None,
            }),
        );
        let best = best_of_cycles(&[cycle(1, vulnerable)]);
        assert_eq!(risk_level(&best, &[]), RiskLevel::High);

        let high = Insight {
            kind: InsightKind::Risk,
            description: "Low bus factor".to_string(),
            confidence: 0.8,
            evidence: vec![],
            cycle_discovered: 1,
            impact: ImpactLevel::High,
        };
        assert_eq!(risk_level(&BTreeMap::new(), &[high.clone()]), RiskLevel::Medium);

        let low = Insight {
            impact: ImpactLevel::Medium,
            ..high
        };
        assert_eq!(risk_level(&BTreeMap::new(), &[low]), RiskLevel::Low);
    }

    #[test]
    fn test_final_recommendations_all_applicable() {
        let mut results = ResultMap::new();
        results.insert(AnalyzerKind::Classification, classification(0.9, "ongoing"));
        results.insert(
            AnalyzerKind::Architecture,
            AnalyzerResult::completed(ArchitectureResult {
                primary_pattern: "monolithic".to_string(),
                secondary_patterns: vec![],
                confidence: Some(0.2),
                framework: None,
                concerns: vec![],
            }),
        );
        let best = best_of_cycles(&[cycle(1, results)]);
        let critical = Insight {
            kind: InsightKind::Security,
            description: "Found 3 potential security vulnerabilities".to_string(),
            confidence: 0.9,
            evidence: vec![],
            cycle_discovered: 1,
            impact: ImpactLevel::Critical,
        };
        let uncertainties: Vec<String> = ["a", "b", "c", "d"].iter().map(|s| s.to_string()).collect();

        let recs = final_recommendations(
            &best,
            overall_confidence(&best),
            &uncertainties,
            &[critical],
            StopReason::MaxCycles,
        );
        assert_eq!(
            recs,
            vec![
                "Validate low confidence analyses: architecture".to_string(),
                "Consider additional manual analysis due to low confidence results".to_string(),
                "Address these uncertainty areas: a, b, c".to_string(),
                "Immediately address critical insights for project health".to_string(),
                "Consider increasing max cycles for more complex projects".to_string(),
            ]
        );
    }

    #[test]
    fn test_final_recommendations_empty_for_confident_run() {
        let best = best_of_cycles(&[cycle(
            1,
            single(AnalyzerKind::Classification, classification(0.95, "ongoing")),
        )]);
        let recs = final_recommendations(
            &best,
            overall_confidence(&best),
            &[],
            &[],
            StopReason::ConfidenceThresholdMet,
        );
        assert!(recs.is_empty());
    }
}
