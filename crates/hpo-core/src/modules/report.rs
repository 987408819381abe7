use super::aggregate::NumericAnomaly;
use super::matching::Matching;
use super::pipeline::PipelineOutcome;
use super::sweep::ShiftSchedule;
use crate::domain::ExecutionMode;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatorParameters {
    pub length: f64,
    pub dz: f64,
    pub kappa: f64,
    pub beta: f64,
    pub nmax: usize,
    pub alpha: Option<f64>,
    pub dimension: usize,
    pub potential_raw_minimum: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftFailureRecord {
    pub shift: f64,
    pub kind: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepStatistics {
    pub schedule: ShiftSchedule,
    pub eigenvalues_per_shift: usize,
    pub execution: ExecutionMode,
    pub shifts: usize,
    pub solved: usize,
    pub failed: usize,
    pub raw_eigenvalues: usize,
    pub failures: Vec<ShiftFailureRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpectrumSummary {
    pub distinct_values: usize,
    pub duplicates_collapsed: usize,
    pub lowest: Option<f64>,
    pub highest: Option<f64>,
    pub anomaly_count: usize,
    pub anomalies: Vec<NumericAnomaly>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchingSummary {
    pub reference_count: usize,
    pub close_match_threshold: f64,
    pub close_matches: usize,
    pub monotonic: bool,
    #[serde(flatten)]
    pub matching: Matching,
}

/// Serializable record of one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpectralReport {
    pub operator: OperatorParameters,
    pub sweep: SweepStatistics,
    pub spectrum: SpectrumSummary,
    pub matching: MatchingSummary,
}

impl SpectralReport {
    pub fn from_outcome(outcome: &PipelineOutcome) -> Self {
        let config = &outcome.config;
        let failures = outcome
            .sweep
            .samples()
            .iter()
            .filter_map(|sample| {
                sample.failure().map(|failure| ShiftFailureRecord {
                    shift: sample.shift,
                    kind: failure.kind(),
                    message: failure.to_string(),
                })
            })
            .collect();
        let values = outcome.spectrum.values();
        let threshold = config.close_match_threshold;

        Self {
            operator: OperatorParameters {
                length: config.length,
                dz: config.dz,
                kappa: config.kappa,
                beta: config.beta,
                nmax: config.nmax,
                alpha: config.alpha,
                dimension: outcome.operator_dimension,
                potential_raw_minimum: outcome.potential_raw_minimum,
            },
            sweep: SweepStatistics {
                schedule: config.sweep,
                eigenvalues_per_shift: config.eigenvalues_per_shift,
                execution: config.execution,
                shifts: outcome.shifts.len(),
                solved: outcome.sweep.solved_count(),
                failed: outcome.sweep.failed_count(),
                raw_eigenvalues: outcome.sweep.eigenvalue_count(),
                failures,
            },
            spectrum: SpectrumSummary {
                distinct_values: values.len(),
                duplicates_collapsed: outcome.spectrum.duplicates_collapsed(),
                lowest: values.first().copied(),
                highest: values.last().copied(),
                anomaly_count: outcome.spectrum.anomalies().len(),
                anomalies: outcome.spectrum.anomalies().to_vec(),
            },
            matching: MatchingSummary {
                reference_count: outcome.reference.len(),
                close_match_threshold: threshold,
                close_matches: outcome.matching.close_matches(threshold).len(),
                monotonic: outcome.matching.is_monotonic(),
                matching: outcome.matching.clone(),
            },
        }
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::SpectralReport;
    use crate::common::config::RunConfig;
    use crate::domain::MatchingPolicy;
    use crate::modules::pipeline::run_pipeline_with;
    use crate::modules::sweep::ShiftSchedule;
    use crate::modules::traits::ShiftInvertSolver;
    use crate::numerics::{ShiftSolveFailure, TridiagonalOperator};

    /// Three exact zeta-zero squares plus one negative value up to shift 100; fails above.
    struct Scripted;

    impl ShiftInvertSolver for Scripted {
        fn eigenvalues_near(
            &self,
            _operator: &TridiagonalOperator,
            shift: f64,
            _count: usize,
        ) -> Result<Vec<f64>, ShiftSolveFailure> {
            if shift > 100.0 {
                return Err(ShiftSolveFailure::SingularShift {
                    shift,
                    pivot_index: 7,
                });
            }
            Ok(vec![
                14.134725_f64.powi(2),
                21.02204_f64.powi(2),
                25.010858_f64.powi(2),
                -2.0,
            ])
        }
    }

    #[test]
    fn report_carries_sweep_statistics_and_anomalies() {
        let config = RunConfig {
            length: 4.0,
            dz: 0.1,
            kappa: 10.0,
            beta: 0.1,
            nmax: 8,
            alpha: None,
            sweep: ShiftSchedule {
                start: 50.0,
                stop: 150.0,
                step: 50.0,
            },
            eigenvalues_per_shift: 4,
            matching: MatchingPolicy::Greedy,
            reference_count: 3,
            ..RunConfig::default()
        };
        let outcome = run_pipeline_with(&config, &Scripted).expect("pipeline");
        let report = SpectralReport::from_outcome(&outcome);

        assert_eq!(report.operator.dimension, 39);
        assert_eq!(report.sweep.shifts, 3);
        assert_eq!(report.sweep.solved, 2);
        assert_eq!(report.sweep.failed, 1);
        assert_eq!(report.sweep.failures[0].kind, "singular_shift");
        assert_eq!(report.spectrum.distinct_values, 4);
        assert_eq!(report.spectrum.duplicates_collapsed, 4);
        assert_eq!(report.spectrum.anomaly_count, 2);
        assert_eq!(report.matching.close_matches, 3);
        assert!(report.matching.monotonic);

        let json: serde_json::Value =
            serde_json::from_str(&report.to_json_pretty().expect("serialize")).expect("parse");
        assert_eq!(json["matching"]["policy"], "greedy");
        assert_eq!(json["matching"]["pairs"].as_array().map(Vec::len), Some(3));
        assert_eq!(json["sweep"]["failures"][0]["shift"], 150.0);
        assert_eq!(json["spectrum"]["anomalies"][0]["kind"], "negative-eigenvalue");
    }
}
