use super::CliError;
use anyhow::Context;
use hpo_core::common::config::{Preset, RunConfig, load_run_config};
use hpo_core::common::reference::{ReferenceError, ReferenceSequence, ZETA_ZERO_ORDINATES};
use hpo_core::domain::{ExecutionMode, HpoError, MatchingPolicy};
use hpo_core::modules::pipeline::{PipelineError, run_pipeline};
use hpo_core::modules::report::SpectralReport;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;

#[derive(clap::Args)]
pub(super) struct RunArgs {
    /// JSON run configuration; takes precedence over --preset
    #[arg(long)]
    config: Option<PathBuf>,

    /// Named parameter preset (regularized, wide-sweep, precision)
    #[arg(long, default_value = "regularized", value_parser = parse_preset)]
    preset: Preset,

    /// Matching policy override (greedy or optimal)
    #[arg(long, value_parser = parse_policy)]
    policy: Option<MatchingPolicy>,

    /// Solve shifts on the rayon thread pool
    #[arg(long)]
    parallel: bool,

    /// Reference values override (JSON array of numbers)
    #[arg(long)]
    reference: Option<PathBuf>,

    /// Number of reference values to match
    #[arg(long)]
    reference_count: Option<usize>,

    /// Write the JSON report here instead of stdout
    #[arg(long)]
    report: Option<PathBuf>,
}

impl RunArgs {
    fn resolve_config(&self) -> Result<RunConfig, CliError> {
        let mut config = match &self.config {
            Some(path) => load_run_config(path)
                .map_err(|error| CliError::Compute(PipelineError::from(error).to_hpo_error()))?,
            None => RunConfig::preset(self.preset),
        };
        if let Some(policy) = self.policy {
            config.matching = policy;
        }
        if self.parallel {
            config.execution = ExecutionMode::Parallel;
        }
        if let Some(path) = &self.reference {
            config.reference_path = Some(path.clone());
        }
        if let Some(count) = self.reference_count {
            config.reference_count = count;
        }
        Ok(config)
    }
}

#[derive(clap::Args)]
pub(super) struct ReferenceArgs {
    /// How many leading ordinates to print
    #[arg(long, default_value_t = ZETA_ZERO_ORDINATES.len())]
    count: usize,
}

fn parse_preset(token: &str) -> Result<Preset, String> {
    Preset::parse(token).ok_or_else(|| {
        let known: Vec<&str> = Preset::ALL.iter().map(|preset| preset.as_str()).collect();
        format!("unknown preset '{token}'; expected one of {}", known.join(", "))
    })
}

fn parse_policy(token: &str) -> Result<MatchingPolicy, String> {
    MatchingPolicy::parse(token)
        .ok_or_else(|| format!("unknown matching policy '{token}'; expected greedy or optimal"))
}

pub(super) fn run_spectral_command(args: RunArgs) -> Result<i32, CliError> {
    let config = args.resolve_config()?;
    tracing::info!(
        policy = %config.matching,
        execution = %config.execution,
        shifts = config.sweep.shifts().len(),
        eigenvalues_per_shift = config.eigenvalues_per_shift,
        "starting spectral run"
    );

    let outcome = run_pipeline(&config).map_err(|error| CliError::Compute(error.to_hpo_error()))?;
    let report = SpectralReport::from_outcome(&outcome);
    let rendered = report
        .to_json_pretty()
        .context("failed to serialize spectral report")?;

    match &args.report {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
                fs::create_dir_all(parent).with_context(|| {
                    format!("failed to create report directory '{}'", parent.display())
                })?;
            }
            fs::write(path, format!("{rendered}\n"))
                .with_context(|| format!("failed to write report '{}'", path.display()))?;
            tracing::info!(path = %path.display(), "report written");
        }
        None => println!("{rendered}"),
    }
    Ok(0)
}

pub(super) fn run_reference_command(args: ReferenceArgs) -> Result<i32, CliError> {
    let sequence = ReferenceSequence::first_zeta_zeros(args.count).map_err(reference_error)?;
    let rendered = serde_json::to_string_pretty(sequence.values())
        .context("failed to serialize reference table")?;
    println!("{rendered}");
    Ok(0)
}

fn reference_error(error: ReferenceError) -> CliError {
    CliError::Compute(HpoError::input_validation(
        "INPUT.REFERENCE",
        error.to_string(),
    ))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PresetListing {
    name: &'static str,
    shifts: usize,
    config: RunConfig,
}

pub(super) fn run_presets_command() -> Result<i32, CliError> {
    let listings: Vec<PresetListing> = Preset::ALL
        .into_iter()
        .map(|preset| {
            let config = preset.config();
            PresetListing {
                name: preset.as_str(),
                shifts: config.sweep.shifts().len(),
                config,
            }
        })
        .collect();
    let rendered =
        serde_json::to_string_pretty(&listings).context("failed to serialize preset listing")?;
    println!("{rendered}");
    Ok(0)
}
