use super::sweep::SweepResult;
use serde::Serialize;

/// Data-quality flag raised while pooling eigenvalues.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NumericAnomaly {
    pub shift: f64,
    pub eigenvalue: f64,
    pub kind: AnomalyKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnomalyKind {
    /// Below `-negative_tolerance`; pooled through its absolute value.
    NegativeEigenvalue,
    /// NaN or infinite; dropped.
    NonFinite,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AggregationOptions {
    pub dedup_tolerance: f64,
    pub negative_tolerance: f64,
}

impl Default for AggregationOptions {
    fn default() -> Self {
        Self {
            dedup_tolerance: crate::common::config::DEFAULT_DEDUP_TOLERANCE,
            negative_tolerance: crate::common::config::DEFAULT_NEGATIVE_TOLERANCE,
        }
    }
}

/// Strictly increasing `sqrt(|lambda|)` values pooled across a sweep.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedSpectrum {
    values: Vec<f64>,
    anomalies: Vec<NumericAnomaly>,
    duplicates_collapsed: usize,
}

impl AggregatedSpectrum {
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn anomalies(&self) -> &[NumericAnomaly] {
        &self.anomalies
    }

    pub fn duplicates_collapsed(&self) -> usize {
        self.duplicates_collapsed
    }
}

pub fn aggregate_spectrum(sweep: &SweepResult, options: AggregationOptions) -> AggregatedSpectrum {
    let mut pooled = Vec::with_capacity(sweep.eigenvalue_count());
    let mut anomalies = Vec::new();

    for sample in sweep.samples() {
        for &eigenvalue in sample.eigenvalues() {
            if !eigenvalue.is_finite() {
                tracing::warn!(shift = sample.shift, eigenvalue, "dropping non-finite eigenvalue");
                anomalies.push(NumericAnomaly {
                    shift: sample.shift,
                    eigenvalue,
                    kind: AnomalyKind::NonFinite,
                });
                continue;
            }
            if eigenvalue < -options.negative_tolerance {
                tracing::warn!(
                    shift = sample.shift,
                    eigenvalue,
                    "negative eigenvalue from a positive-definite operator"
                );
                anomalies.push(NumericAnomaly {
                    shift: sample.shift,
                    eigenvalue,
                    kind: AnomalyKind::NegativeEigenvalue,
                });
            }
            pooled.push(eigenvalue.abs().sqrt());
        }
    }

    pooled.sort_by(f64::total_cmp);
    let before = pooled.len();
    let values = collapse_near_duplicates(pooled, options.dedup_tolerance);
    let duplicates_collapsed = before - values.len();

    tracing::info!(
        distinct = values.len(),
        duplicates_collapsed,
        anomalies = anomalies.len(),
        "spectrum aggregated"
    );

    AggregatedSpectrum {
        values,
        anomalies,
        duplicates_collapsed,
    }
}

/// Keeps the first member of every run of values within `tolerance` of it.
/// Exact repeats always collapse, so the output is strictly increasing.
fn collapse_near_duplicates(sorted: Vec<f64>, tolerance: f64) -> Vec<f64> {
    let mut kept: Vec<f64> = Vec::with_capacity(sorted.len());
    for value in sorted {
        match kept.last() {
            Some(&anchor) if value - anchor <= tolerance => {}
            _ => kept.push(value),
        }
    }
    kept
}
