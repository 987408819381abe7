use std::f64::consts::PI;

/// Minimum value of every normalized potential.
pub const POTENTIAL_FLOOR: f64 = 1.0e-6;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PotentialError {
    #[error("potential requires at least one harmonic")]
    NoHarmonics,
    #[error("potential requires a non-empty grid")]
    EmptyGrid,
    #[error("potential parameter '{name}' must be finite, got {value}")]
    NonFiniteParameter { name: &'static str, value: f64 },
    #[error("interval length must be positive, got {length}")]
    InvalidLength { length: f64 },
    #[error("regularization strength must be non-negative, got {alpha}")]
    NegativeRegularization { alpha: f64 },
    #[error("potential sum is not finite at grid index {index}")]
    NonFiniteSum { index: usize },
}

/// Parameters of the damped cosine series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HarmonicSeries {
    pub length: f64,
    pub kappa: f64,
    pub beta: f64,
    pub nmax: usize,
    /// `None` keeps every harmonic at full weight; `Some(alpha)` applies
    /// `exp(-alpha (n / nmax)^2)`.
    pub alpha: Option<f64>,
}

impl HarmonicSeries {
    pub fn validate(&self) -> Result<(), PotentialError> {
        for (name, value) in [
            ("length", self.length),
            ("kappa", self.kappa),
            ("beta", self.beta),
        ] {
            if !value.is_finite() {
                return Err(PotentialError::NonFiniteParameter { name, value });
            }
        }
        if self.length <= 0.0 {
            return Err(PotentialError::InvalidLength {
                length: self.length,
            });
        }
        if self.nmax == 0 {
            return Err(PotentialError::NoHarmonics);
        }
        if let Some(alpha) = self.alpha {
            if !alpha.is_finite() {
                return Err(PotentialError::NonFiniteParameter {
                    name: "alpha",
                    value: alpha,
                });
            }
            if alpha < 0.0 {
                return Err(PotentialError::NegativeRegularization { alpha });
            }
        }
        Ok(())
    }

    pub fn weight(&self, n: usize) -> f64 {
        match self.alpha {
            None => 1.0,
            Some(alpha) => {
                let ratio = n as f64 / self.nmax as f64;
                (-alpha * ratio * ratio).exp()
            }
        }
    }

    /// Raw series value at one coordinate, before normalization.
    pub fn evaluate(&self, z: f64) -> f64 {
        let decay_rate = self.beta * z / self.length;
        let phase_rate = PI * z / self.length;

        let mut sum = 0.0_f64;
        for n in 1..=self.nmax {
            let order = n as f64;
            let amplitude = self.kappa / order * self.weight(n);
            sum += amplitude * (-decay_rate * order).exp() * (phase_rate * order).cos();
        }
        sum
    }
}

/// Potential sampled on the interior grid, shifted so its minimum is
/// [`POTENTIAL_FLOOR`].
#[derive(Debug, Clone, PartialEq)]
pub struct Potential {
    values: Vec<f64>,
    raw_minimum: f64,
}

impl Potential {
    pub fn synthesize(interior: &[f64], series: &HarmonicSeries) -> Result<Self, PotentialError> {
        series.validate()?;
        if interior.is_empty() {
            return Err(PotentialError::EmptyGrid);
        }

        let mut values = Vec::with_capacity(interior.len());
        for (index, z) in interior.iter().enumerate() {
            let value = series.evaluate(*z);
            if !value.is_finite() {
                return Err(PotentialError::NonFiniteSum { index });
            }
            values.push(value);
        }

        let raw_minimum = values.iter().copied().fold(f64::INFINITY, f64::min);
        for value in &mut values {
            *value = *value - raw_minimum + POTENTIAL_FLOOR;
        }

        Ok(Self {
            values,
            raw_minimum,
        })
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Minimum of the series before the shift was applied.
    pub fn raw_minimum(&self) -> f64 {
        self.raw_minimum
    }

    pub fn minimum(&self) -> f64 {
        self.values.iter().copied().fold(f64::INFINITY, f64::min)
    }
}
