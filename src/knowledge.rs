//! Run-scoped knowledge accumulated across cycles.
//!
//! A [`KnowledgeStore`] is created when a run starts, appended to once per
//! cycle by the orchestrator, and dropped with the run. Strategies only ever
//! see it through a shared reference.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::analyzers::{AnalyzerKind, AnalyzerResult};
use crate::cycle::{ConfidenceMap, CycleResult, ResultMap};
use crate::error::SetupError;
use crate::insights::Insight;
use crate::scoring;

/// Top-level view of the project captured before the first cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectSnapshot {
    pub root: PathBuf,
    pub root_files: Vec<String>,
    /// Non-hidden directories directly under the root
    pub directories: Vec<String>,
    pub captured_at: DateTime<Utc>,
}

impl ProjectSnapshot {
    /// Inspect the project root. Any problem here is a setup failure.
    pub async fn capture(root: &Path) -> Result<Self, SetupError> {
        let metadata = tokio::fs::metadata(root).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => SetupError::NotFound {
                path: root.to_path_buf(),
            },
            _ => SetupError::Unreadable {
                path: root.to_path_buf(),
                message: e.to_string(),
            },
        })?;

        if !metadata.is_dir() {
            return Err(SetupError::NotADirectory {
                path: root.to_path_buf(),
            });
        }

        let unreadable = |e: std::io::Error| SetupError::Unreadable {
            path: root.to_path_buf(),
            message: e.to_string(),
        };

        let mut root_files = Vec::new();
        let mut directories = Vec::new();
        let mut entries = tokio::fs::read_dir(root).await.map_err(unreadable)?;
        while let Some(entry) = entries.next_entry().await.map_err(unreadable)? {
            let name = entry.file_name().to_string_lossy().into_owned();
            let file_type = entry.file_type().await.map_err(unreadable)?;
            if file_type.is_dir() {
                if !name.starts_with('.') {
                    directories.push(name);
                }
            } else {
                root_files.push(name);
            }
        }
        root_files.sort();
        directories.sort();

        Ok(Self {
            root: root.to_path_buf(),
            root_files,
            directories,
            captured_at: Utc::now(),
        })
    }
}

/// What the store remembers about one cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleKnowledge {
    pub results: ResultMap,
    pub confidence_scores: ConfidenceMap,
    pub insights: Vec<String>,
    pub recorded_at: DateTime<Utc>,
}

/// Accumulated cycle outputs, confidence trajectory and insights for one run.
#[derive(Debug, Clone)]
pub struct KnowledgeStore {
    project: ProjectSnapshot,
    cycles: BTreeMap<u32, CycleKnowledge>,
    confidence_trajectory: Vec<ConfidenceMap>,
    insights: Vec<Insight>,
}

impl KnowledgeStore {
    pub fn new(project: ProjectSnapshot) -> Self {
        Self {
            project,
            cycles: BTreeMap::new(),
            confidence_trajectory: Vec::new(),
            insights: Vec::new(),
        }
    }

    /// Merge a finished cycle. Insights are appended, never replaced.
    pub fn record(&mut self, cycle: &CycleResult) {
        self.cycles.insert(
            cycle.cycle_number,
            CycleKnowledge {
                results: cycle.results.clone(),
                confidence_scores: cycle.confidence_scores.clone(),
                insights: cycle.insights.iter().map(|i| i.description.clone()).collect(),
                recorded_at: cycle.end_time,
            },
        );
        self.confidence_trajectory
            .push(cycle.confidence_scores.clone());
        self.insights.extend(cycle.insights.iter().cloned());
    }

    pub fn project(&self) -> &ProjectSnapshot {
        &self.project
    }

    pub fn cycle(&self, cycle_number: u32) -> Option<&CycleKnowledge> {
        self.cycles.get(&cycle_number)
    }

    /// A recorded result and its confidence, if that analyzer ran in that cycle.
    pub fn result_for(&self, cycle_number: u32, kind: AnalyzerKind) -> Option<(&AnalyzerResult, f64)> {
        let cycle = self.cycles.get(&cycle_number)?;
        let result = cycle.results.get(&kind)?;
        let confidence = cycle.confidence_scores.get(&kind).copied().unwrap_or(0.0);
        Some((result, confidence))
    }

    pub fn cycles_recorded(&self) -> usize {
        self.cycles.len()
    }

    pub fn confidence_trajectory(&self) -> &[ConfidenceMap] {
        &self.confidence_trajectory
    }

    pub fn insights(&self) -> &[Insight] {
        &self.insights
    }

    /// Average of the last trajectory entry minus average of the first.
    pub fn confidence_improvement(&self) -> f64 {
        match (
            self.confidence_trajectory.first(),
            self.confidence_trajectory.last(),
        ) {
            (Some(first), Some(last)) if self.confidence_trajectory.len() >= 2 => {
                scoring::average(last) - scoring::average(first)
            }
            _ => 0.0,
        }
    }

    /// Every confidence value recorded so far, in cycle order.
    pub fn all_confidences(&self) -> Vec<f64> {
        self.confidence_trajectory
            .iter()
            .flat_map(|scores| scores.values().copied())
            .collect()
    }
}
