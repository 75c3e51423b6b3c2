//! Insight model, per-cycle extraction and end-of-run consolidation.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::cycle::ResultMap;

/// How much an insight matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImpactLevel {
    Low = 0,
    Medium = 1,
    High = 2,
    Critical = 3,
}

impl ImpactLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImpactLevel::Low => "low",
            ImpactLevel::Medium => "medium",
            ImpactLevel::High => "high",
            ImpactLevel::Critical => "critical",
        }
    }
}

impl std::fmt::Display for ImpactLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Category of finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightKind {
    /// High project complexity.
    Complexity,
    /// Several architecture patterns coexist.
    Architecture,
    /// Known vulnerabilities in dependencies.
    Security,
    /// Knowledge concentrated in too few contributors.
    Risk,
}

impl InsightKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InsightKind::Complexity => "complexity",
            InsightKind::Architecture => "architecture",
            InsightKind::Security => "security",
            InsightKind::Risk => "risk",
        }
    }
}

impl std::fmt::Display for InsightKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A human-meaningful finding derived from analyzer results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    pub kind: InsightKind,
    pub description: String,
    pub confidence: f64,
    pub evidence: Vec<String>,
    pub cycle_discovered: u32,
    pub impact: ImpactLevel,
}

/// Complexity above this fires a complexity insight.
pub const HIGH_COMPLEXITY_THRESHOLD: u32 = 7;
/// More secondary patterns than this fires an architecture insight.
pub const MULTIPLE_PATTERNS_THRESHOLD: usize = 2;
/// A bus factor at or below this fires a risk insight.
pub const LOW_BUS_FACTOR: u32 = 1;

/// Scan one cycle's results. At most one insight per trigger.
pub fn extract(results: &ResultMap, cycle_number: u32) -> Vec<Insight> {
    let mut insights = Vec::new();

    for result in results.values() {
        if let Some(classification) = result.classification() {
            let complexity = classification.complexity_score;
            if complexity > HIGH_COMPLEXITY_THRESHOLD {
                insights.push(Insight {
                    kind: InsightKind::Complexity,
                    description: format!(
                        "High complexity project ({}/10) requires careful architecture",
                        complexity
                    ),
                    confidence: 0.8,
                    evidence: vec![format!("Complexity score: {}", complexity)],
                    cycle_discovered: cycle_number,
                    impact: ImpactLevel::High,
                });
            }
        }

        if let Some(architecture) = result.architecture() {
            let patterns = &architecture.secondary_patterns;
            if patterns.len() > MULTIPLE_PATTERNS_THRESHOLD {
                insights.push(Insight {
                    kind: InsightKind::Architecture,
                    description: format!(
                        "Multiple architectural patterns detected: {}",
                        patterns.join(", ")
                    ),
                    confidence: 0.7,
                    evidence: patterns.clone(),
                    cycle_discovered: cycle_number,
                    impact: ImpactLevel::Medium,
                });
            }
        }

        if let Some(dependencies) = result.dependencies() {
            let vulnerabilities = dependencies.summary.vulnerability_count;
            if vulnerabilities > 0 {
                insights.push(Insight {
                    kind: InsightKind::Security,
                    description: format!(
                        "Found {} potential security vulnerabilities",
                        vulnerabilities
                    ),
                    confidence: 0.9,
                    evidence: vec![format!("Vulnerability count: {}", vulnerabilities)],
                    cycle_discovered: cycle_number,
                    impact: ImpactLevel::Critical,
                });
            }
        }

        if let Some(context) = result.context() {
            if context.bus_factor <= LOW_BUS_FACTOR {
                insights.push(Insight {
                    kind: InsightKind::Risk,
                    description:
                        "Low bus factor - project knowledge concentrated in few developers"
                            .to_string(),
                    confidence: 0.8,
                    evidence: vec![format!("Bus factor: {}", context.bus_factor)],
                    cycle_discovered: cycle_number,
                    impact: ImpactLevel::High,
                });
            }
        }
    }

    insights
}

/// Deduplicate by `(kind, description)` keeping the most confident instance
/// (earliest cycle on ties), then rank by impact, confidence and cycle.
pub fn consolidate(insights: &[Insight]) -> Vec<Insight> {
    let mut best: HashMap<(InsightKind, &str), &Insight> = HashMap::new();

    for insight in insights {
        let key = (insight.kind, insight.description.as_str());
        match best.get(&key) {
            Some(existing) if !is_better(insight, existing) => {}
            _ => {
                best.insert(key, insight);
            }
        }
    }

    let mut ranked: Vec<Insight> = best.into_values().cloned().collect();
    ranked.sort_by(|a, b| {
        b.impact
            .cmp(&a.impact)
            .then_with(|| b.confidence.total_cmp(&a.confidence))
            .then_with(|| a.cycle_discovered.cmp(&b.cycle_discovered))
            .then_with(|| a.description.cmp(&b.description))
    });
    ranked
}

fn is_better(candidate: &Insight, existing: &Insight) -> bool {
    candidate.confidence > existing.confidence
        || (candidate.confidence == existing.confidence
            && candidate.cycle_discovered < existing.cycle_discovered)
}
