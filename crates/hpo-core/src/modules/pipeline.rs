//! One run: grid, potential, operator, sweep, aggregation, matching.

use super::aggregate::{AggregatedSpectrum, AggregationOptions, aggregate_spectrum};
use super::matching::{Matching, MatchingError, match_spectrum};
use super::sweep::{ScheduleError, SpectralSweepEngine, SweepResult};
use super::traits::ShiftInvertSolver;
use crate::common::config::{ConfigError, RunConfig};
use crate::common::reference::{ReferenceError, ReferenceSequence};
use crate::domain::{ExecutionMode, HpoError};
use crate::numerics::{Grid, GridError, OperatorError, Potential, PotentialError, TridiagonalOperator};
use std::time::Instant;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Grid(#[from] GridError),
    #[error(transparent)]
    Potential(#[from] PotentialError),
    #[error(transparent)]
    Operator(#[from] OperatorError),
    #[error(transparent)]
    Schedule(#[from] ScheduleError),
    #[error(transparent)]
    Reference(#[from] ReferenceError),
    #[error(transparent)]
    Matching(#[from] MatchingError),
}

impl PipelineError {
    pub fn to_hpo_error(&self) -> HpoError {
        let message = self.to_string();
        match self {
            Self::Config(ConfigError::Read { .. }) => {
                HpoError::io_system("IO.CONFIG_READ", message)
            }
            Self::Config(ConfigError::Parse { .. }) => {
                HpoError::input_validation("INPUT.CONFIG_PARSE", message)
            }
            Self::Config(ConfigError::Grid(_)) | Self::Grid(_) => {
                HpoError::input_validation("INPUT.GRID", message)
            }
            Self::Config(ConfigError::Series(_)) | Self::Potential(_) => {
                HpoError::input_validation("INPUT.POTENTIAL", message)
            }
            Self::Config(ConfigError::Schedule(_)) | Self::Schedule(_) => {
                HpoError::input_validation("INPUT.SHIFT_SCHEDULE", message)
            }
            Self::Config(ConfigError::Invalid { .. }) => {
                HpoError::input_validation("INPUT.CONFIG_INVALID", message)
            }
            Self::Reference(ReferenceError::Read { .. }) => {
                HpoError::io_system("IO.REFERENCE_READ", message)
            }
            Self::Reference(_) => HpoError::input_validation("INPUT.REFERENCE", message),
            Self::Operator(_) => HpoError::computation("RUN.OPERATOR_ASSEMBLY", message),
            Self::Matching(MatchingError::InsufficientSpectrum { .. }) => {
                HpoError::computation("RUN.INSUFFICIENT_SPECTRUM", message)
            }
            Self::Matching(MatchingError::EmptyReference) => {
                HpoError::input_validation("INPUT.REFERENCE", message)
            }
            Self::Matching(MatchingError::Assignment(_)) => {
                HpoError::computation("RUN.ASSIGNMENT", message)
            }
        }
    }
}

impl From<PipelineError> for HpoError {
    fn from(error: PipelineError) -> Self {
        error.to_hpo_error()
    }
}

/// Everything a run produced, kept for reporting.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub config: RunConfig,
    pub operator_dimension: usize,
    pub potential_raw_minimum: f64,
    pub shifts: Vec<f64>,
    pub sweep: SweepResult,
    pub spectrum: AggregatedSpectrum,
    pub reference: ReferenceSequence,
    pub matching: Matching,
}

/// Reference values for a run: the file named by the config, or the
/// built-in zeta-zero table, cut to `reference_count`.
pub fn load_reference(config: &RunConfig) -> Result<ReferenceSequence, ReferenceError> {
    match &config.reference_path {
        Some(path) => {
            let sequence = ReferenceSequence::from_json_file(path)?;
            if sequence.len() < config.reference_count {
                tracing::warn!(
                    path = %path.display(),
                    available = sequence.len(),
                    requested = config.reference_count,
                    "reference file is shorter than referenceCount; using all of it"
                );
                return Ok(sequence);
            }
            ReferenceSequence::new(sequence.values()[..config.reference_count].to_vec())
        }
        None => ReferenceSequence::first_zeta_zeros(config.reference_count),
    }
}

pub fn build_operator(config: &RunConfig) -> Result<(TridiagonalOperator, Potential), PipelineError> {
    let grid = Grid::new(config.length, config.dz)?;
    let potential = Potential::synthesize(grid.interior(), &config.harmonic_series())?;
    let operator = TridiagonalOperator::assemble(grid.interior(), potential.values(), grid.dz())?;
    tracing::info!(
        interior_points = grid.interior_len(),
        potential_raw_minimum = potential.raw_minimum(),
        "operator assembled"
    );
    Ok((operator, potential))
}

/// Runs the whole pipeline with the configured Lanczos solver.
pub fn run_pipeline(config: &RunConfig) -> Result<PipelineOutcome, PipelineError> {
    let solver = config.solver();
    run_pipeline_with(config, &solver)
}

/// Runs the whole pipeline with a caller-supplied eigensolver.
pub fn run_pipeline_with<S: ShiftInvertSolver>(
    config: &RunConfig,
    solver: &S,
) -> Result<PipelineOutcome, PipelineError> {
    let started = Instant::now();
    config.validate()?;
    let reference = load_reference(config)?;
    let (operator, potential) = build_operator(config)?;

    let shifts = config.sweep.shifts();
    if let Some(bytes) =
        solver.working_set_bytes(operator.dimension(), config.eigenvalues_per_shift)
    {
        let concurrent = match config.execution {
            ExecutionMode::Serial => 1,
            ExecutionMode::Parallel => rayon::current_num_threads().min(shifts.len().max(1)),
        };
        tracing::info!(
            per_solve_mib = bytes / (1 << 20),
            concurrent_solves = concurrent,
            peak_mib = bytes.saturating_mul(concurrent) / (1 << 20),
            "estimated Krylov basis memory"
        );
    }
    let engine = SpectralSweepEngine::new(solver, config.eigenvalues_per_shift, config.execution);
    let sweep = engine.run(&operator, &shifts);

    let spectrum = aggregate_spectrum(
        &sweep,
        AggregationOptions {
            dedup_tolerance: config.dedup_tolerance,
            negative_tolerance: config.negative_tolerance,
        },
    );
    let matching = match_spectrum(config.matching, reference.values(), spectrum.values())?;

    tracing::info!(
        elapsed_ms = started.elapsed().as_millis() as u64,
        "pipeline finished"
    );
    Ok(PipelineOutcome {
        config: config.clone(),
        operator_dimension: operator.dimension(),
        potential_raw_minimum: potential.raw_minimum(),
        shifts,
        sweep,
        spectrum,
        reference,
        matching,
    })
}
