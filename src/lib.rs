//! # Specify Analysis
//!
//! A multi-cycle project analysis orchestrator. It runs four independent
//! analyzers (classification, architecture detection, dependency mapping and
//! historical context mining) over repeated refinement cycles, scores their
//! confidence, accumulates insights and uncertainties, and stops once the
//! results converge or a budget runs out.
//!
//! ## Features
//!
//! - **Execution strategies**: sequential, concurrent, adaptive (reuses
//!   confident results from the previous cycle) and iterative deepening
//! - **Partial-failure tolerance**: a failing or slow analyzer degrades
//!   confidence, it never aborts a run
//! - **Confidence-weighted termination**: time limit, confidence threshold,
//!   cycle cap and insight stagnation
//! - **Consolidation**: best-of-all-cycles report with quality scores, ranked
//!   insights and recommendations, rendered as JSON or Markdown
//!
//! ## Architecture
//!
//! ```text
//! Orchestrator → CycleExecutor → Analyzer ports (Classifier, ArchitectureDetector,
//!      ↓                          DependencyMapper, ContextAnalyzer)
//! KnowledgeStore / TerminationEvaluator → ConsolidatedReport
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use std::path::Path;
//! use specify_analysis::{AnalyzerSuite, Config, Orchestrator};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let orchestrator = Orchestrator::from_config(&config, AnalyzerSuite::builtin());
//!     let outcome = orchestrator.run_default(Path::new(".")).await?;
//!     println!("{}", specify_analysis::report::to_markdown(&outcome));
//!     Ok(())
//! }
//! ```

/// Analyzer ports, result payloads and the built-in analyzers.
pub mod analyzers;
/// Configuration loaded from the environment.
pub mod config;
/// Cycle types, parameters, results and the cycle executor.
pub mod cycle;
/// Error types and result aliases.
pub mod error;
/// Insight extraction and consolidation.
pub mod insights;
/// Run-scoped knowledge store and project snapshot.
pub mod knowledge;
/// The cycle loop and end-of-run consolidation.
pub mod orchestrator;
/// JSON and Markdown rendering of an analysis outcome.
pub mod report;
/// Confidence scoring of analyzer results.
pub mod scoring;
/// Stop conditions evaluated after each cycle.
pub mod termination;
/// Uncertainty detection and the run-wide uncertainty set.
pub mod uncertainty;

pub use analyzers::{AnalyzerKind, AnalyzerResult, AnalyzerSuite};
pub use config::Config;
pub use cycle::{CycleResult, ExecutionStrategy};
pub use error::{AnalyzerFailure, AppError, AppResult, SetupError};
pub use orchestrator::{AnalysisOutcome, ConsolidatedReport, Orchestrator, RunMetrics};
pub use termination::StopReason;
