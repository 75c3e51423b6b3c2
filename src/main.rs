use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use specify_analysis::{
    analyzers::AnalyzerSuite,
    config::{Config, LogFormat},
    report::{self, ReportFormat},
    ExecutionStrategy, Orchestrator,
};

/// Multi-cycle project analysis
#[derive(Debug, Parser)]
#[command(name = "specify-analysis", version, about)]
struct Cli {
    /// Project directory to analyze
    path: PathBuf,

    /// Execution strategy (sequential, concurrent, adaptive, iterative_deepening)
    #[arg(long, value_parser = parse_strategy)]
    strategy: Option<ExecutionStrategy>,

    /// Maximum number of analysis cycles
    #[arg(long)]
    max_cycles: Option<u32>,

    /// Average confidence at which to stop early
    #[arg(long)]
    min_confidence: Option<f64>,

    /// Wall-clock budget in seconds
    #[arg(long)]
    time_limit: Option<u64>,

    /// Report format (json or markdown)
    #[arg(long, default_value = "markdown", value_parser = parse_format)]
    format: ReportFormat,

    /// Write the report to a file instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,
}

fn parse_strategy(s: &str) -> Result<ExecutionStrategy, String> {
    s.parse()
}

fn parse_format(s: &str) -> Result<ReportFormat, String> {
    s.parse()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };
    apply_overrides(&mut config, &cli);
    if let Err(e) = config.run.validate() {
        eprintln!("{}", e);
        std::process::exit(1);
    }

    // Initialize logging
    init_logging(&config);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        project = %cli.path.display(),
        "specify-analysis starting..."
    );

    let orchestrator = Orchestrator::from_config(&config, AnalyzerSuite::builtin());
    let outcome = match orchestrator.run_default(&cli.path).await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!(error = %e, "Analysis failed");
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    let rendered = report::render(&outcome, cli.format)?;
    match &cli.output {
        Some(path) => {
            tokio::fs::write(path, rendered).await?;
            info!(path = %path.display(), "Report written");
        }
        None => println!("{}", rendered),
    }

    Ok(())
}

/// Command-line flags win over environment settings.
fn apply_overrides(config: &mut Config, cli: &Cli) {
    if let Some(strategy) = cli.strategy {
        config.run.strategy_default = strategy;
    }
    if let Some(max_cycles) = cli.max_cycles {
        config.run.max_cycles = max_cycles;
    }
    if let Some(min_confidence) = cli.min_confidence {
        config.run.min_confidence_threshold = min_confidence;
    }
    if let Some(time_limit) = cli.time_limit {
        config.run.time_limit_seconds = time_limit;
    }
}

/// Initialize tracing/logging
fn init_logging(config: &Config) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}
