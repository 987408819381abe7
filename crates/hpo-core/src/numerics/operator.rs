use super::tridiagonal::sturm_count_below;
use faer::sparse::{SparseColMat, Triplet};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OperatorError {
    #[error("operator requires at least one interior point")]
    Empty,
    #[error("potential length {potential} does not match interior grid length {interior}")]
    LengthMismatch { interior: usize, potential: usize },
    #[error("off-diagonal length {actual} does not match dimension {dimension} - 1")]
    BandMismatch { dimension: usize, actual: usize },
    #[error("grid step must be finite and positive, got {dz}")]
    InvalidStep { dz: f64 },
    #[error("operator entry at ({row}, {col}) is not finite")]
    NonFiniteEntry { row: usize, col: usize },
    #[error("failed to build sparse operator: {message}")]
    SparseAssembly { message: String },
}

/// Symmetric tridiagonal matrix kept as its two distinct bands.
///
/// Assembled from the interior grid it is the Dirichlet second-difference
/// Laplacian plus a diagonal potential:
/// `diag[i] = 2 / dz^2 + V[i]`, `off[i] = -1 / dz^2`.
#[derive(Debug, Clone, PartialEq)]
pub struct TridiagonalOperator {
    diagonal: Vec<f64>,
    off_diagonal: Vec<f64>,
}

impl TridiagonalOperator {
    pub fn assemble(interior: &[f64], potential: &[f64], dz: f64) -> Result<Self, OperatorError> {
        if interior.is_empty() {
            return Err(OperatorError::Empty);
        }
        if potential.len() != interior.len() {
            return Err(OperatorError::LengthMismatch {
                interior: interior.len(),
                potential: potential.len(),
            });
        }
        if !dz.is_finite() || dz <= 0.0 {
            return Err(OperatorError::InvalidStep { dz });
        }

        let inverse_dz_sq = 1.0 / (dz * dz);
        let diagonal = potential
            .iter()
            .map(|value| 2.0 * inverse_dz_sq + value)
            .collect();
        let off_diagonal = vec![-inverse_dz_sq; interior.len() - 1];

        Self::from_bands(diagonal, off_diagonal)
    }

    pub fn from_bands(diagonal: Vec<f64>, off_diagonal: Vec<f64>) -> Result<Self, OperatorError> {
        let dimension = diagonal.len();
        if dimension == 0 {
            return Err(OperatorError::Empty);
        }
        if off_diagonal.len() + 1 != dimension {
            return Err(OperatorError::BandMismatch {
                dimension,
                actual: off_diagonal.len(),
            });
        }
        if let Some(index) = diagonal.iter().position(|value| !value.is_finite()) {
            return Err(OperatorError::NonFiniteEntry {
                row: index,
                col: index,
            });
        }
        if let Some(index) = off_diagonal.iter().position(|value| !value.is_finite()) {
            return Err(OperatorError::NonFiniteEntry {
                row: index + 1,
                col: index,
            });
        }

        Ok(Self {
            diagonal,
            off_diagonal,
        })
    }

    pub fn dimension(&self) -> usize {
        self.diagonal.len()
    }

    pub fn diagonal(&self) -> &[f64] {
        &self.diagonal
    }

    pub fn off_diagonal(&self) -> &[f64] {
        &self.off_diagonal
    }

    pub fn entry(&self, row: usize, col: usize) -> f64 {
        let dimension = self.dimension();
        if row >= dimension || col >= dimension {
            return 0.0;
        }
        match row.abs_diff(col) {
            0 => self.diagonal[row],
            1 => self.off_diagonal[row.min(col)],
            _ => 0.0,
        }
    }

    pub fn apply(&self, input: &[f64], output: &mut [f64]) {
        let dimension = self.dimension();
        debug_assert_eq!(input.len(), dimension);
        debug_assert_eq!(output.len(), dimension);

        for row in 0..dimension {
            let mut value = self.diagonal[row] * input[row];
            if row > 0 {
                value += self.off_diagonal[row - 1] * input[row - 1];
            }
            if row + 1 < dimension {
                value += self.off_diagonal[row] * input[row + 1];
            }
            output[row] = value;
        }
    }

    /// Gershgorin interval enclosing every eigenvalue.
    pub fn spectral_bounds(&self) -> (f64, f64) {
        let dimension = self.dimension();
        let mut lower = f64::INFINITY;
        let mut upper = f64::NEG_INFINITY;
        for row in 0..dimension {
            let mut radius = 0.0;
            if row > 0 {
                radius += self.off_diagonal[row - 1].abs();
            }
            if row + 1 < dimension {
                radius += self.off_diagonal[row].abs();
            }
            lower = lower.min(self.diagonal[row] - radius);
            upper = upper.max(self.diagonal[row] + radius);
        }
        (lower, upper)
    }

    /// Number of eigenvalues strictly below `shift` (Sylvester inertia).
    pub fn inertia_below(&self, shift: f64) -> usize {
        sturm_count_below(&self.diagonal, &self.off_diagonal, shift)
    }

    /// Column-compressed copy holding the three bands only.
    pub fn to_sparse(&self) -> Result<SparseColMat<usize, f64>, OperatorError> {
        let dimension = self.dimension();
        let mut triplets = Vec::with_capacity(3 * dimension - 2);
        for index in 0..dimension {
            if index > 0 {
                triplets.push(Triplet::new(index, index - 1, self.off_diagonal[index - 1]));
            }
            triplets.push(Triplet::new(index, index, self.diagonal[index]));
            if index + 1 < dimension {
                triplets.push(Triplet::new(index, index + 1, self.off_diagonal[index]));
            }
        }

        SparseColMat::try_new_from_triplets(dimension, dimension, &triplets).map_err(|error| {
            OperatorError::SparseAssembly {
                message: format!("{error:?}"),
            }
        })
    }
}
