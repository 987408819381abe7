#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GridError {
    #[error("grid length must be finite and positive, got {length}")]
    InvalidLength { length: f64 },
    #[error("grid step must be finite and positive, got {dz}")]
    InvalidStep { dz: f64 },
    #[error("grid step {dz} exceeds interval length {length}")]
    StepExceedsLength { length: f64, dz: f64 },
    #[error("grid over [0, {length}] with step {dz} has no interior points")]
    NoInteriorPoints { length: f64, dz: f64 },
}

/// Evenly spaced samples `z_i = i * dz` covering `[0, L]`.
///
/// The point count is `ceil(L / dz) + 1`, so when `dz` does not divide `L`
/// the last sample sits just past `L`.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    length: f64,
    dz: f64,
    points: Vec<f64>,
}

impl Grid {
    pub fn new(length: f64, dz: f64) -> Result<Self, GridError> {
        if !length.is_finite() || length <= 0.0 {
            return Err(GridError::InvalidLength { length });
        }
        if !dz.is_finite() || dz <= 0.0 {
            return Err(GridError::InvalidStep { dz });
        }
        if dz > length {
            return Err(GridError::StepExceedsLength { length, dz });
        }

        let point_count = step_count(length, dz) + 1;
        if point_count < 3 {
            return Err(GridError::NoInteriorPoints { length, dz });
        }

        let points = (0..point_count).map(|index| index as f64 * dz).collect();
        Ok(Self { length, dz, points })
    }

    pub fn length(&self) -> f64 {
        self.length
    }

    pub fn dz(&self) -> f64 {
        self.dz
    }

    pub fn points(&self) -> &[f64] {
        &self.points
    }

    /// Degrees of freedom of the operator: every point except the two ends.
    pub fn interior(&self) -> &[f64] {
        &self.points[1..self.points.len() - 1]
    }

    pub fn interior_len(&self) -> usize {
        self.points.len() - 2
    }
}

// Ratios that land within a few ulps of an integer are treated as exact so
// that e.g. 400 / 0.005 does not pick up a spurious extra point.
fn step_count(length: f64, dz: f64) -> usize {
    let ratio = length / dz;
    let nearest = ratio.round();
    if (ratio - nearest).abs() <= ratio.abs() * 1.0e-12 {
        nearest as usize
    } else {
        ratio.ceil() as usize
    }
}
