//! Analyzer ports and the results they produce.
//!
//! Each analyzer kind is consumed through its own async trait:
//! - [`Classifier`]: project type, complexity and tech stack
//! - [`ArchitectureDetector`]: primary and secondary architecture patterns
//! - [`DependencyMapper`]: direct/transitive dependency counts and advisories
//! - [`ContextAnalyzer`]: commit history and bus factor
//!
//! Implementations live outside the orchestration core. The [`builtin`] module
//! ships simple filesystem and git backed versions used by the binary.
//! Ports never see orchestrator state; they receive the project location and a
//! read-only parameter struct.

pub mod builtin;

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::cycle::AnalysisDepth;
use crate::error::{AnalyzerFailure, AnalyzerResultOf};

// ============================================================================
// Analyzer Kind
// ============================================================================

/// The four analyzer kinds, in sequential dispatch order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalyzerKind {
    /// Project classification.
    Classification,
    /// Architecture pattern detection.
    Architecture,
    /// Dependency mapping.
    Dependencies,
    /// Historical context mining.
    Context,
}

impl AnalyzerKind {
    /// Every analyzer kind, in dispatch order.
    pub const ALL: [AnalyzerKind; 4] = [
        AnalyzerKind::Classification,
        AnalyzerKind::Architecture,
        AnalyzerKind::Dependencies,
        AnalyzerKind::Context,
    ];

    /// Get the analyzer name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalyzerKind::Classification => "classification",
            AnalyzerKind::Architecture => "architecture",
            AnalyzerKind::Dependencies => "dependencies",
            AnalyzerKind::Context => "context",
        }
    }
}

impl std::fmt::Display for AnalyzerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for AnalyzerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "classification" => Ok(AnalyzerKind::Classification),
            "architecture" => Ok(AnalyzerKind::Architecture),
            "dependencies" => Ok(AnalyzerKind::Dependencies),
            "context" => Ok(AnalyzerKind::Context),
            _ => Err(format!("Unknown analyzer: {}", s)),
        }
    }
}

// ============================================================================
// Payloads
// ============================================================================

/// Output of a [`Classifier`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// Project type label (greenfield, brownfield, ...)
    pub project_type: String,
    /// Classifier's own confidence, if it reports one
    #[serde(rename = "confidence_score", default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    /// Complexity on a 1-10 scale
    pub complexity_score: u32,
    /// Detected languages, frameworks and tools
    #[serde(default)]
    pub tech_stack: Vec<String>,
    /// Evidence behind the classification
    #[serde(default)]
    pub indicators: Vec<String>,
}

/// Output of an [`ArchitectureDetector`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchitectureResult {
    pub primary_pattern: String,
    #[serde(default)]
    pub secondary_patterns: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub framework: Option<String>,
    #[serde(default)]
    pub concerns: Vec<String>,
}

/// Aggregate dependency counts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DependencySummary {
    pub total_direct_dependencies: u32,
    pub total_transitive_dependencies: u32,
    pub vulnerability_count: u32,
    #[serde(default)]
    pub license_issues: u32,
}

/// Output of a [`DependencyMapper`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyResult {
    pub summary: DependencySummary,
    /// Package ecosystems the counts were gathered from
    #[serde(default)]
    pub ecosystems: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

/// Output of a [`ContextAnalyzer`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextResult {
    pub total_commits: u64,
    #[serde(default)]
    pub total_contributors: u32,
    pub bus_factor: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

/// A successful analyzer output, tagged by analyzer kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnalysisPayload {
    Classification(ClassificationResult),
    Architecture(ArchitectureResult),
    Dependencies(DependencyResult),
    Context(ContextResult),
}

impl AnalysisPayload {
    /// The analyzer kind that produced this payload.
    pub fn kind(&self) -> AnalyzerKind {
        match self {
            AnalysisPayload::Classification(_) => AnalyzerKind::Classification,
            AnalysisPayload::Architecture(_) => AnalyzerKind::Architecture,
            AnalysisPayload::Dependencies(_) => AnalyzerKind::Dependencies,
            AnalysisPayload::Context(_) => AnalyzerKind::Context,
        }
    }

    /// Confidence the analyzer reported itself, if any.
    pub fn explicit_confidence(&self) -> Option<f64> {
        match self {
            AnalysisPayload::Classification(c) => c.confidence,
            AnalysisPayload::Architecture(a) => a.confidence,
            AnalysisPayload::Dependencies(d) => d.confidence,
            AnalysisPayload::Context(c) => c.confidence,
        }
    }
}

impl From<ClassificationResult> for AnalysisPayload {
    fn from(result: ClassificationResult) -> Self {
        AnalysisPayload::Classification(result)
    }
}

impl From<ArchitectureResult> for AnalysisPayload {
    fn from(result: ArchitectureResult) -> Self {
        AnalysisPayload::Architecture(result)
    }
}

impl From<DependencyResult> for AnalysisPayload {
    fn from(result: DependencyResult) -> Self {
        AnalysisPayload::Dependencies(result)
    }
}

impl From<ContextResult> for AnalysisPayload {
    fn from(result: ContextResult) -> Self {
        AnalysisPayload::Context(result)
    }
}

// ============================================================================
// Analyzer Result
// ============================================================================

/// Outcome of one analyzer invocation within a cycle: a payload or an
/// explicit error marker, never empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AnalyzerResult {
    Completed {
        payload: AnalysisPayload,
        /// Set when the adaptive strategy reused an earlier cycle's result
        #[serde(default)]
        from_cache: bool,
    },
    Failed {
        error: String,
    },
}

impl AnalyzerResult {
    /// Wrap a freshly computed payload.
    pub fn completed(payload: impl Into<AnalysisPayload>) -> Self {
        AnalyzerResult::Completed {
            payload: payload.into(),
            from_cache: false,
        }
    }

    /// Record a failed call.
    pub fn failed(failure: &AnalyzerFailure) -> Self {
        AnalyzerResult::Failed {
            error: failure.to_string(),
        }
    }

    /// Mark this result as reused from an earlier cycle.
    pub fn into_cached(self) -> Self {
        match self {
            AnalyzerResult::Completed { payload, .. } => AnalyzerResult::Completed {
                payload,
                from_cache: true,
            },
            failed => failed,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, AnalyzerResult::Failed { .. })
    }

    pub fn is_cached(&self) -> bool {
        matches!(self, AnalyzerResult::Completed { from_cache: true, .. })
    }

    pub fn payload(&self) -> Option<&AnalysisPayload> {
        match self {
            AnalyzerResult::Completed { payload, .. } => Some(payload),
            AnalyzerResult::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            AnalyzerResult::Failed { error } => Some(error),
            AnalyzerResult::Completed { .. } => None,
        }
    }

    pub fn classification(&self) -> Option<&ClassificationResult> {
        match self.payload() {
            Some(AnalysisPayload::Classification(c)) => Some(c),
            _ => None,
        }
    }

    pub fn architecture(&self) -> Option<&ArchitectureResult> {
        match self.payload() {
            Some(AnalysisPayload::Architecture(a)) => Some(a),
            _ => None,
        }
    }

    pub fn dependencies(&self) -> Option<&DependencyResult> {
        match self.payload() {
            Some(AnalysisPayload::Dependencies(d)) => Some(d),
            _ => None,
        }
    }

    pub fn context(&self) -> Option<&ContextResult> {
        match self.payload() {
            Some(AnalysisPayload::Context(c)) => Some(c),
            _ => None,
        }
    }
}

// ============================================================================
// Port Parameters
// ============================================================================

/// Parameters for [`Classifier::classify`].
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifyParams {
    pub depth: AnalysisDepth,
    pub include_dependencies: bool,
}

/// Parameters for [`ArchitectureDetector::detect`].
#[derive(Debug, Clone, PartialEq)]
pub struct ArchitectureParams {
    /// Same-cycle classification, when it ran first and succeeded
    pub prior_classification: Option<ClassificationResult>,
    pub framework_specific: bool,
}

/// Parameters for [`DependencyMapper::map_dependencies`].
#[derive(Debug, Clone, PartialEq)]
pub struct DependencyParams {
    pub include_transitive: bool,
    pub check_vulnerabilities: bool,
    pub check_licenses: bool,
}

/// Parameters for [`ContextAnalyzer::analyze_context`].
#[derive(Debug, Clone, PartialEq)]
pub struct ContextParams {
    pub depth: AnalysisDepth,
    pub include_developer_profiles: bool,
}

// ============================================================================
// Ports
// ============================================================================

/// Classifies a project.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(
        &self,
        project: &Path,
        params: &ClassifyParams,
    ) -> AnalyzerResultOf<ClassificationResult>;
}

/// Detects architecture patterns.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ArchitectureDetector: Send + Sync {
    async fn detect(
        &self,
        project: &Path,
        params: &ArchitectureParams,
    ) -> AnalyzerResultOf<ArchitectureResult>;
}

/// Maps project dependencies.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DependencyMapper: Send + Sync {
    async fn map_dependencies(
        &self,
        project: &Path,
        params: &DependencyParams,
    ) -> AnalyzerResultOf<DependencyResult>;
}

/// Mines historical context (commits, contributors).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContextAnalyzer: Send + Sync {
    async fn analyze_context(
        &self,
        project: &Path,
        params: &ContextParams,
    ) -> AnalyzerResultOf<ContextResult>;
}

/// The set of analyzers a run dispatches to.
#[derive(Clone)]
pub struct AnalyzerSuite {
    pub classifier: Arc<dyn Classifier>,
    pub architecture: Arc<dyn ArchitectureDetector>,
    pub dependencies: Arc<dyn DependencyMapper>,
    pub context: Arc<dyn ContextAnalyzer>,
}

impl AnalyzerSuite {
    /// Assemble a suite from four port implementations.
    pub fn new(
        classifier: Arc<dyn Classifier>,
        architecture: Arc<dyn ArchitectureDetector>,
        dependencies: Arc<dyn DependencyMapper>,
        context: Arc<dyn ContextAnalyzer>,
    ) -> Self {
        Self {
            classifier,
            architecture,
            dependencies,
            context,
        }
    }

    /// The filesystem and git backed analyzers from [`builtin`].
    pub fn builtin() -> Self {
        Self::new(
            Arc::new(builtin::FsClassifier),
            Arc::new(builtin::FsArchitectureDetector),
            Arc::new(builtin::ManifestDependencyMapper),
            Arc::new(builtin::GitContextAnalyzer::default()),
        )
    }
}

impl std::fmt::Debug for AnalyzerSuite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalyzerSuite").finish_non_exhaustive()
    }
}
