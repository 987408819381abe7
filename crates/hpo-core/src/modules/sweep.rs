use super::traits::ShiftInvertSolver;
use crate::domain::ExecutionMode;
use crate::numerics::{ShiftSolveFailure, TridiagonalOperator};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScheduleError {
    #[error("shift schedule bounds must be finite, got start={start} stop={stop}")]
    NonFiniteBounds { start: f64, stop: f64 },
    #[error("shift step must be finite and positive, got {step}")]
    InvalidStep { step: f64 },
    #[error("shift schedule stop {stop} lies below start {start}")]
    Reversed { start: f64, stop: f64 },
}

/// Evenly spaced shifts from `start` up to and including `stop`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct ShiftSchedule {
    pub start: f64,
    pub stop: f64,
    pub step: f64,
}

impl ShiftSchedule {
    pub fn validate(&self) -> Result<(), ScheduleError> {
        if !self.start.is_finite() || !self.stop.is_finite() {
            return Err(ScheduleError::NonFiniteBounds {
                start: self.start,
                stop: self.stop,
            });
        }
        if !self.step.is_finite() || self.step <= 0.0 {
            return Err(ScheduleError::InvalidStep { step: self.step });
        }
        if self.stop < self.start {
            return Err(ScheduleError::Reversed {
                start: self.start,
                stop: self.stop,
            });
        }
        Ok(())
    }

    /// Expanded shift list; empty when the schedule is invalid.
    pub fn shifts(&self) -> Vec<f64> {
        if self.validate().is_err() {
            return Vec::new();
        }
        let span = (self.stop - self.start) / self.step;
        let count = (span + 1.0e-9).floor() as usize + 1;
        (0..count)
            .map(|index| self.start + index as f64 * self.step)
            .collect()
    }
}

/// Outcome of one shift window.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSpectrumSample {
    pub shift: f64,
    pub outcome: Result<Vec<f64>, ShiftSolveFailure>,
}

impl RawSpectrumSample {
    pub fn eigenvalues(&self) -> &[f64] {
        match &self.outcome {
            Ok(values) => values,
            Err(_) => &[],
        }
    }

    pub fn failure(&self) -> Option<&ShiftSolveFailure> {
        self.outcome.as_ref().err()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SweepResult {
    samples: Vec<RawSpectrumSample>,
}

impl SweepResult {
    pub fn from_samples(samples: Vec<RawSpectrumSample>) -> Self {
        Self { samples }
    }

    pub fn samples(&self) -> &[RawSpectrumSample] {
        &self.samples
    }

    pub fn solved_count(&self) -> usize {
        self.samples
            .iter()
            .filter(|sample| sample.outcome.is_ok())
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.samples.len() - self.solved_count()
    }

    pub fn eigenvalue_count(&self) -> usize {
        self.samples
            .iter()
            .map(|sample| sample.eigenvalues().len())
            .sum()
    }
}

/// Runs one shift-invert query per shift against a shared operator.
///
/// A failing shift contributes nothing; the sweep itself never fails.
pub struct SpectralSweepEngine<'a, S: ShiftInvertSolver> {
    solver: &'a S,
    eigenvalues_per_shift: usize,
    execution: ExecutionMode,
}

impl<'a, S: ShiftInvertSolver> SpectralSweepEngine<'a, S> {
    pub fn new(solver: &'a S, eigenvalues_per_shift: usize, execution: ExecutionMode) -> Self {
        Self {
            solver,
            eigenvalues_per_shift,
            execution,
        }
    }

    pub fn run(&self, operator: &TridiagonalOperator, shifts: &[f64]) -> SweepResult {
        let started = Instant::now();
        let samples: Vec<RawSpectrumSample> = match self.execution {
            ExecutionMode::Serial => shifts
                .iter()
                .map(|shift| self.solve_shift(operator, *shift))
                .collect(),
            ExecutionMode::Parallel => shifts
                .par_iter()
                .map(|shift| self.solve_shift(operator, *shift))
                .collect(),
        };

        let result = SweepResult::from_samples(samples);
        tracing::info!(
            shifts = shifts.len(),
            solved = result.solved_count(),
            failed = result.failed_count(),
            eigenvalues = result.eigenvalue_count(),
            execution = %self.execution,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "spectral sweep finished"
        );
        result
    }

    fn solve_shift(&self, operator: &TridiagonalOperator, shift: f64) -> RawSpectrumSample {
        let outcome = self
            .solver
            .eigenvalues_near(operator, shift, self.eigenvalues_per_shift);
        match &outcome {
            Ok(values) => {
                tracing::debug!(shift, count = values.len(), "shift solved");
            }
            Err(failure) => {
                tracing::warn!(shift, kind = failure.kind(), %failure, "shift failed; skipping");
            }
        }
        RawSpectrumSample { shift, outcome }
    }
}
