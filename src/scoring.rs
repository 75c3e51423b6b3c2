//! Confidence scoring for analyzer results.
//!
//! Precedence per result: an explicit confidence reported by the analyzer
//! wins; otherwise a per-kind rule applies. Errors always score 0.0.

use crate::analyzers::{AnalysisPayload, AnalyzerResult};
use crate::cycle::{ConfidenceMap, ResultMap};

/// Used when a classification or architecture result reports no confidence.
pub const DEFAULT_CONFIDENCE: f64 = 0.5;

/// Score a single analyzer result, clamped to `[0.0, 1.0]`.
pub fn score(result: &AnalyzerResult) -> f64 {
    let Some(payload) = result.payload() else {
        return 0.0;
    };

    if let Some(explicit) = payload.explicit_confidence() {
        return clamp(explicit);
    }

    let derived = match payload {
        AnalysisPayload::Classification(_) | AnalysisPayload::Architecture(_) => {
            DEFAULT_CONFIDENCE
        }
        AnalysisPayload::Dependencies(deps) => {
            let complete = deps.summary.total_direct_dependencies > 0
                && deps.summary.total_transitive_dependencies > 0;
            if complete {
                0.8
            } else {
                0.3
            }
        }
        AnalysisPayload::Context(ctx) => {
            if ctx.total_commits > 10 {
                0.7
            } else {
                0.4
            }
        }
    };

    clamp(derived)
}

/// Score every result of a cycle. One entry per result, errors included.
pub fn score_all(results: &ResultMap) -> ConfidenceMap {
    results
        .iter()
        .map(|(kind, result)| (*kind, score(result)))
        .collect()
}

/// Mean confidence; 0.0 for an empty map.
pub fn average(scores: &ConfidenceMap) -> f64 {
    if scores.is_empty() {
        return 0.0;
    }
    scores.values().sum::<f64>() / scores.len() as f64
}

fn clamp(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::{
        AnalyzerKind, ArchitectureResult, ClassificationResult, ContextResult, DependencyResult,
        DependencySummary,
    };
    use crate::error::AnalyzerFailure;

    fn classification(confidence: Option<f64>) -> AnalyzerResult {
        AnalyzerResult::completed(ClassificationResult {
            project_type: "ongoing".to_string(),
            confidence,
            complexity_score: 4,
            tech_stack: vec![],
            indicators: vec![],
        })
    }

    fn dependencies(direct: u32, transitive: u32, confidence: Option<f64>) -> AnalyzerResult {
        AnalyzerResult::completed(DependencyResult {
            summary: DependencySummary {
                total_direct_dependencies: direct,
                total_transitive_dependencies: transitive,
                vulnerability_count: 0,
                license_issues: 0,
            },
            ecosystems: vec![],
            confidence,
        })
    }

    fn context(commits: u64) -> AnalyzerResult {
        AnalyzerResult::completed(ContextResult {
            total_commits: commits,
            total_contributors: 2,
            bus_factor: 2,
            confidence: None,
        })
    }

    #[test]
    fn test_error_scores_zero() {
        let result = AnalyzerResult::failed(&AnalyzerFailure::failed("boom"));
        assert_eq!(score(&result), 0.0);
    }

    #[test]
    fn test_explicit_confidence_wins() {
        assert_eq!(score(&classification(Some(0.92))), 0.92);
        assert_eq!(score(&dependencies(0, 0, Some(0.66))), 0.66);
    }

    #[test]
    fn test_classification_and_architecture_default() {
        assert_eq!(score(&classification(None)), DEFAULT_CONFIDENCE);

        let arch = AnalyzerResult::completed(ArchitectureResult {
            primary_pattern: "mvc".to_string(),
            secondary_patterns: vec![],
            confidence: None,
            framework: None,
            concerns: vec![],
        });
        assert_eq!(score(&arch), DEFAULT_CONFIDENCE);
    }

    #[test]
    fn test_dependency_completeness_rule() {
        assert_eq!(score(&dependencies(12, 140, None)), 0.8);
        assert_eq!(score(&dependencies(12, 0, None)), 0.3);
        assert_eq!(score(&dependencies(0, 5, None)), 0.3);
    }

    #[test]
    fn test_context_richness_rule() {
        assert_eq!(score(&context(11)), 0.7);
        assert_eq!(score(&context(10)), 0.4);
        assert_eq!(score(&context(0)), 0.4);
    }

    #[test]
    fn test_out_of_range_confidence_is_clamped() {
        assert_eq!(score(&classification(Some(1.7))), 1.0);
        assert_eq!(score(&classification(Some(-0.2))), 0.0);
        assert_eq!(score(&classification(Some(f64::NAN))), 0.0);
    }

    #[test]
    fn test_score_all_has_entry_per_result() {
        let mut results = ResultMap::new();
        results.insert(AnalyzerKind::Classification, classification(Some(0.9)));
        results.insert(
            AnalyzerKind::Dependencies,
            AnalyzerResult::failed(&AnalyzerFailure::failed("offline")),
        );

        let scores = score_all(&results);
        assert_eq!(scores.len(), 2);
        assert_eq!(scores[&AnalyzerKind::Classification], 0.9);
        assert_eq!(scores[&AnalyzerKind::Dependencies], 0.0);
        assert!((average(&scores) - 0.45).abs() < 1e-9);
    }

    #[test]
    fn test_average_of_empty_is_zero() {
        assert_eq!(average(&ConfidenceMap::new()), 0.0);
    }
}
