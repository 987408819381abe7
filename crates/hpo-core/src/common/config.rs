//! Run configuration: one fixed parameter set per invocation.
//!
//! Files are JSON with camelCase keys. The matching policy has no default and
//! must be named explicitly; everything else not listed falls back to the
//! values below.

use crate::domain::{ExecutionMode, MatchingPolicy};
use crate::modules::sweep::{ScheduleError, ShiftSchedule};
use crate::numerics::{Grid, GridError, HarmonicSeries, LanczosShiftInvert, PotentialError};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_TOLERANCE: f64 = 1.0e-10;
pub const DEFAULT_DEDUP_TOLERANCE: f64 = 1.0e-8;
pub const DEFAULT_NEGATIVE_TOLERANCE: f64 = 1.0e-8;
pub const DEFAULT_CLOSE_MATCH_THRESHOLD: f64 = 0.01;
pub const DEFAULT_MAX_KRYLOV_FACTOR: usize = 3;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunConfig {
    pub length: f64,
    pub dz: f64,
    pub kappa: f64,
    pub beta: f64,
    pub nmax: usize,
    #[serde(default)]
    pub alpha: Option<f64>,
    pub sweep: ShiftSchedule,
    pub eigenvalues_per_shift: usize,
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
    pub matching: MatchingPolicy,
    #[serde(default = "default_reference_count")]
    pub reference_count: usize,
    #[serde(default)]
    pub reference_path: Option<PathBuf>,
    #[serde(default)]
    pub execution: ExecutionMode,
    #[serde(default = "default_dedup_tolerance")]
    pub dedup_tolerance: f64,
    #[serde(default = "default_negative_tolerance")]
    pub negative_tolerance: f64,
    #[serde(default = "default_close_match_threshold")]
    pub close_match_threshold: f64,
    #[serde(default = "default_max_krylov_factor")]
    pub max_krylov_factor: usize,
    #[serde(default)]
    pub max_solve_seconds: Option<f64>,
}

fn default_tolerance() -> f64 {
    DEFAULT_TOLERANCE
}

fn default_reference_count() -> usize {
    50
}

fn default_dedup_tolerance() -> f64 {
    DEFAULT_DEDUP_TOLERANCE
}

fn default_negative_tolerance() -> f64 {
    DEFAULT_NEGATIVE_TOLERANCE
}

fn default_close_match_threshold() -> f64 {
    DEFAULT_CLOSE_MATCH_THRESHOLD
}

fn default_max_krylov_factor() -> usize {
    DEFAULT_MAX_KRYLOV_FACTOR
}

impl Default for RunConfig {
    fn default() -> Self {
        Preset::Regularized.config()
    }
}

impl RunConfig {
    pub fn preset(preset: Preset) -> Self {
        preset.config()
    }

    pub fn harmonic_series(&self) -> HarmonicSeries {
        HarmonicSeries {
            length: self.length,
            kappa: self.kappa,
            beta: self.beta,
            nmax: self.nmax,
            alpha: self.alpha,
        }
    }

    pub fn solver(&self) -> LanczosShiftInvert {
        LanczosShiftInvert::default()
            .with_tolerance(self.tolerance)
            .with_max_krylov_factor(self.max_krylov_factor)
            .with_max_solve_time(
                self.max_solve_seconds
                    .and_then(|seconds| Duration::try_from_secs_f64(seconds).ok()),
            )
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        Grid::new(self.length, self.dz)?;
        self.harmonic_series().validate()?;
        self.sweep.validate()?;

        if self.eigenvalues_per_shift == 0 {
            return Err(ConfigError::invalid(
                "eigenvaluesPerShift",
                "at least one eigenvalue per shift is required",
            ));
        }
        if self.reference_count == 0 {
            return Err(ConfigError::invalid(
                "referenceCount",
                "at least one reference value is required",
            ));
        }
        if self.max_krylov_factor == 0 {
            return Err(ConfigError::invalid(
                "maxKrylovFactor",
                "Krylov budget factor must be at least 1",
            ));
        }
        for (field, value) in [
            ("tolerance", self.tolerance),
            ("dedupTolerance", self.dedup_tolerance),
            ("negativeTolerance", self.negative_tolerance),
            ("closeMatchThreshold", self.close_match_threshold),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::invalid(
                    field,
                    format!("must be finite and non-negative, got {value}"),
                ));
            }
        }
        if let Some(seconds) = self.max_solve_seconds {
            if !seconds.is_finite() || seconds <= 0.0 {
                return Err(ConfigError::invalid(
                    "maxSolveSeconds",
                    format!("must be finite and positive, got {seconds}"),
                ));
            }
            if let Err(error) = Duration::try_from_secs_f64(seconds) {
                return Err(ConfigError::invalid(
                    "maxSolveSeconds",
                    format!("{seconds} is not a representable duration: {error}"),
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read run configuration '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse run configuration '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("invalid '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },
    #[error(transparent)]
    Grid(#[from] GridError),
    #[error(transparent)]
    Series(#[from] PotentialError),
    #[error(transparent)]
    Schedule(#[from] ScheduleError),
}

impl ConfigError {
    fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

pub fn load_run_config(path: impl AsRef<Path>) -> Result<RunConfig, ConfigError> {
    let path = path.as_ref();
    let source = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config: RunConfig = serde_json::from_str(&source).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    config.validate()?;
    Ok(config)
}

/// Named parameter sets for the operator variants that have been studied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Preset {
    /// Regularized series on `[0, 400]`, sweep 2500..=5000, 50 references.
    Regularized,
    /// Same operator, wider sweep 2000..=8000 with 500 values per shift.
    WideSweep,
    /// Unregularized fine grid on `[0, 180]`, 7000 harmonics, 30 references.
    Precision,
}

impl Preset {
    pub const ALL: [Preset; 3] = [Self::Regularized, Self::WideSweep, Self::Precision];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Regularized => "regularized",
            Self::WideSweep => "wide-sweep",
            Self::Precision => "precision",
        }
    }

    pub fn parse(token: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|preset| preset.as_str().eq_ignore_ascii_case(token.trim()))
    }

    pub fn config(self) -> RunConfig {
        let regularized = RunConfig {
            length: 400.0,
            dz: 0.005,
            kappa: 9000.0,
            beta: 0.06,
            nmax: 2000,
            alpha: Some(6.0),
            sweep: ShiftSchedule {
                start: 2500.0,
                stop: 5000.0,
                step: 100.0,
            },
            eigenvalues_per_shift: 300,
            tolerance: DEFAULT_TOLERANCE,
            matching: MatchingPolicy::Optimal,
            reference_count: 50,
            reference_path: None,
            execution: ExecutionMode::Serial,
            dedup_tolerance: DEFAULT_DEDUP_TOLERANCE,
            negative_tolerance: DEFAULT_NEGATIVE_TOLERANCE,
            close_match_threshold: DEFAULT_CLOSE_MATCH_THRESHOLD,
            max_krylov_factor: DEFAULT_MAX_KRYLOV_FACTOR,
            max_solve_seconds: None,
        };

        match self {
            Self::Regularized => regularized,
            Self::WideSweep => RunConfig {
                sweep: ShiftSchedule {
                    start: 2000.0,
                    stop: 8000.0,
                    step: 100.0,
                },
                eigenvalues_per_shift: 500,
                ..regularized
            },
            Self::Precision => RunConfig {
                length: 180.0,
                dz: 0.00125,
                kappa: 1000.0,
                beta: 0.1,
                nmax: 7000,
                alpha: None,
                sweep: ShiftSchedule {
                    start: 200.0,
                    stop: 11500.0,
                    step: 100.0,
                },
                eigenvalues_per_shift: 40,
                matching: MatchingPolicy::Greedy,
                reference_count: 30,
                ..regularized
            },
        }
    }
}

impl Display for Preset {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}
