//! Rendering of an [`AnalysisOutcome`] for humans and machines.

use std::fmt::{self, Write};

use crate::error::AppResult;
use crate::orchestrator::{AnalysisOutcome, ConsolidatedReport, RunMetrics};

/// Output format of a rendered report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Json,
    Markdown,
}

impl std::str::FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(ReportFormat::Json),
            "markdown" | "md" => Ok(ReportFormat::Markdown),
            _ => Err(format!("Unknown report format: {}", s)),
        }
    }
}

/// Render in the requested format.
pub fn render(outcome: &AnalysisOutcome, format: ReportFormat) -> AppResult<String> {
    match format {
        ReportFormat::Json => to_json(outcome),
        ReportFormat::Markdown => Ok(to_markdown(outcome)),
    }
}

/// The full outcome as pretty-printed JSON.
pub fn to_json(outcome: &AnalysisOutcome) -> AppResult<String> {
    Ok(serde_json::to_string_pretty(outcome)?)
}

/// A human-readable summary of the outcome.
pub fn to_markdown(outcome: &AnalysisOutcome) -> String {
    let mut out = String::new();
    // Writing to a String cannot fail.
    let _ = write_markdown(&mut out, outcome);
    out
}

fn write_markdown(out: &mut impl Write, outcome: &AnalysisOutcome) -> fmt::Result {
    let report = &outcome.report;

    write_headline(out, outcome)?;
    write_quality(out, report)?;
    write_architecture(out, report)?;
    write_insights(out, report)?;
    write_list(out, "Uncertainties", &report.uncertainties)?;
    write_list(out, "Recommendations", &report.recommendations)?;
    write_cycles(out, outcome)?;
    write_metrics(out, &outcome.metrics)
}

fn write_headline(out: &mut impl Write, outcome: &AnalysisOutcome) -> fmt::Result {
    let report = &outcome.report;

    writeln!(out, "# Project Analysis Report\n")?;
    writeln!(out, "- **Project:** `{}`", report.project_location.display())?;
    writeln!(
        out,
        "- **Layout:** {} root files, {} directories",
        report.project.root_files.len(),
        report.project.directories.len()
    )?;
    if !report.project.directories.is_empty() {
        writeln!(
            out,
            "- **Top-level directories:** {}",
            report.project.directories.join(", ")
        )?;
    }
    writeln!(out, "- **Run:** {}", report.run_id)?;
    writeln!(out, "- **Strategy:** {}", report.strategy)?;
    writeln!(
        out,
        "- **Cycles:** {} (stopped: {})",
        outcome.metrics.total_cycles, report.stop_reason
    )?;
    if let Some(project_type) = &report.project_type {
        writeln!(
            out,
            "- **Project type:** {} (complexity {}/10)",
            project_type, report.complexity_score
        )?;
    }
    writeln!(out, "- **Risk level:** {}", report.risk_level)
}

fn write_quality(out: &mut impl Write, report: &ConsolidatedReport) -> fmt::Result {
    writeln!(out, "\n## Analysis Quality\n")?;
    writeln!(out, "| Metric | Score |")?;
    writeln!(out, "|---|---|")?;
    writeln!(out, "| Overall confidence | {:.2} |", report.overall_confidence)?;
    writeln!(out, "| Completeness | {:.2} |", report.completeness_score)?;
    writeln!(out, "| Consistency | {:.2} |", report.consistency_score)?;
    for (kind, best) in &report.best_results {
        let status = if best.result.is_error() { " (error)" } else { "" };
        writeln!(
            out,
            "| {} (cycle {}){} | {:.2} |",
            kind, best.cycle_number, status, best.confidence
        )?;
    }
    Ok(())
}

fn write_architecture(out: &mut impl Write, report: &ConsolidatedReport) -> fmt::Result {
    let Some(architecture) = &report.architecture else {
        return Ok(());
    };

    writeln!(out, "\n## Architecture\n")?;
    writeln!(out, "- **Primary pattern:** {}", architecture.primary_pattern)?;
    if let Some(framework) = &architecture.framework {
        writeln!(out, "- **Framework:** {}", framework)?;
    }
    writeln!(out, "- **Confidence:** {:.2}", architecture.confidence)
}

fn write_insights(out: &mut impl Write, report: &ConsolidatedReport) -> fmt::Result {
    writeln!(out, "\n## Insights\n")?;
    if report.insights.is_empty() {
        return writeln!(out, "No insights discovered.");
    }

    writeln!(out, "| Impact | Kind | Description | Confidence | Cycle |")?;
    writeln!(out, "|---|---|---|---|---|")?;
    for insight in &report.insights {
        writeln!(
            out,
            "| {} | {} | {} | {:.2} | {} |",
            insight.impact,
            insight.kind,
            insight.description,
            insight.confidence,
            insight.cycle_discovered
        )?;
    }
    Ok(())
}

fn write_list(out: &mut impl Write, heading: &str, items: &[String]) -> fmt::Result {
    writeln!(out, "\n## {}\n", heading)?;
    if items.is_empty() {
        return writeln!(out, "None.");
    }
    for item in items {
        writeln!(out, "- {}", item)?;
    }
    Ok(())
}

fn write_cycles(out: &mut impl Write, outcome: &AnalysisOutcome) -> fmt::Result {
    writeln!(out, "\n## Cycles\n")?;
    writeln!(
        out,
        "| # | Type | Depth | Duration (s) | Avg confidence | Insights |"
    )?;
    writeln!(out, "|---|---|---|---|---|---|")?;
    for cycle in &outcome.cycles {
        writeln!(
            out,
            "| {} | {} | {} | {:.2} | {:.2} | {} |",
            cycle.cycle_number,
            cycle.cycle_type,
            cycle.depth,
            cycle.duration_secs,
            cycle.average_confidence(),
            cycle.insight_count()
        )?;
    }
    Ok(())
}

fn write_metrics(out: &mut impl Write, metrics: &RunMetrics) -> fmt::Result {
    writeln!(out, "\n## Metrics\n")?;
    writeln!(out, "- Total time: {:.2}s", metrics.total_time_secs)?;
    writeln!(out, "- Average cycle time: {:.2}s", metrics.avg_cycle_time_secs)?;
    writeln!(
        out,
        "- Confidence improvement: {:+.2}",
        metrics.confidence_improvement
    )?;
    writeln!(out, "- Insights per cycle: {:.2}", metrics.insights_per_cycle)
}
