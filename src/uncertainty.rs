//! Uncertainty tracking: unresolved concerns found in a cycle and the
//! run-wide deduplicated set they accumulate into.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::analyzers::AnalyzerKind;
use crate::cycle::{ConfidenceMap, ResultMap};

/// Confidence below this is flagged as uncertain.
pub const LOW_CONFIDENCE_THRESHOLD: f64 = 0.7;

/// A concern attributed to the analyzer whose result raised it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Uncertainty {
    pub analyzer: AnalyzerKind,
    pub description: String,
}

impl std::fmt::Display for Uncertainty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description)
    }
}

/// Flag low confidence, errors and missing data in one cycle's results.
///
/// Results without a score are treated as confidence 0.0.
pub fn identify(results: &ResultMap, scores: &ConfidenceMap) -> Vec<Uncertainty> {
    let mut found = Vec::new();

    for (kind, result) in results {
        let confidence = scores.get(kind).copied().unwrap_or(0.0);
        let mut flag = |description: String| {
            found.push(Uncertainty {
                analyzer: *kind,
                description,
            })
        };

        if confidence < LOW_CONFIDENCE_THRESHOLD {
            flag(format!("low confidence in {}", kind));
        }

        if let Some(error) = result.error() {
            flag(format!("error in {}: {}", kind, error));
        }

        if let Some(deps) = result.dependencies() {
            if deps.summary.total_direct_dependencies == 0 {
                flag("no dependencies detected".to_string());
            }
        }

        if let Some(ctx) = result.context() {
            if ctx.total_commits == 0 {
                flag("no git history available".to_string());
            }
        }
    }

    found
}

/// Insertion-ordered set of uncertainty descriptions.
#[derive(Debug, Clone, Default)]
pub struct UncertaintySet {
    entries: Vec<String>,
    seen: HashSet<String>,
}

impl UncertaintySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry; returns `false` if it was already present.
    pub fn insert(&mut self, description: impl Into<String>) -> bool {
        let description = description.into();
        if self.seen.contains(&description) {
            return false;
        }
        self.seen.insert(description.clone());
        self.entries.push(description);
        true
    }

    pub fn extend<I, S>(&mut self, descriptions: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for description in descriptions {
            self.insert(description);
        }
    }

    pub fn contains(&self, description: &str) -> bool {
        self.seen.contains(description)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_vec(self) -> Vec<String> {
        self.entries
    }
}
