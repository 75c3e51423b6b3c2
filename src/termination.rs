//! Decides after each cycle whether another one should run.
//!
//! Conditions are checked in a fixed order and the first that holds becomes
//! the run's stop reason: time limit, confidence threshold, cycle cap,
//! insight stagnation.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::RunConfig;
use crate::cycle::CycleResult;

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    TimeLimit,
    ConfidenceThresholdMet,
    MaxCycles,
    NoNewInsights,
}

impl StopReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            StopReason::TimeLimit => "time limit",
            StopReason::ConfidenceThresholdMet => "confidence threshold met",
            StopReason::MaxCycles => "max cycles",
            StopReason::NoNewInsights => "no new insights",
        }
    }
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of evaluating one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Continue,
    Stop(StopReason),
}

/// Cycles after which a cycle without insights ends the run.
pub const STAGNATION_GRACE_CYCLES: u32 = 2;

#[derive(Debug, Clone)]
pub struct TerminationEvaluator {
    time_limit: Duration,
    min_confidence_threshold: f64,
    max_cycles: u32,
}

impl TerminationEvaluator {
    pub fn new(config: &RunConfig) -> Self {
        Self {
            time_limit: config.time_limit(),
            min_confidence_threshold: config.min_confidence_threshold,
            max_cycles: config.max_cycles,
        }
    }

    /// Evaluate the cycle that just finished.
    ///
    /// `elapsed` is the run's wall-clock time so far; it is never shorter
    /// than the cycle's own duration. A zero budget is always exhausted.
    pub fn evaluate(&self, cycle: &CycleResult, elapsed: Duration) -> Decision {
        let elapsed = elapsed.max(cycle.duration());
        if self.time_limit.is_zero() || elapsed > self.time_limit {
            return Decision::Stop(StopReason::TimeLimit);
        }

        if cycle.average_confidence() >= self.min_confidence_threshold {
            return Decision::Stop(StopReason::ConfidenceThresholdMet);
        }

        if cycle.cycle_number >= self.max_cycles {
            return Decision::Stop(StopReason::MaxCycles);
        }

        if cycle.cycle_number > STAGNATION_GRACE_CYCLES && cycle.insight_count() == 0 {
            return Decision::Stop(StopReason::NoNewInsights);
        }

        Decision::Continue
    }
}
