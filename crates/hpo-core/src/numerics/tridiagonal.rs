//! Kernels for symmetric tridiagonal matrices given as bands.
//!
//! `diagonal` has length `n`, `off_diagonal` has length `n - 1` and couples
//! rows `i` and `i + 1`.

use faer::Mat;

const SINGULAR_RELATIVE_PIVOT_EPSILON: f64 = 1.0e-14;
const QL_MAX_SWEEPS_PER_EIGENVALUE: usize = 60;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FactorizationError {
    #[error("shifted matrix is singular at pivot index {pivot_index} (pivot {pivot:e})")]
    SingularPivot { pivot_index: usize, pivot: f64 },
    #[error("factorization produced a non-finite pivot at index {pivot_index}")]
    NonFinitePivot { pivot_index: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EigenError {
    #[error("eigen-decomposition requires a non-empty matrix")]
    EmptyMatrix,
    #[error("off-diagonal length {actual} does not match dimension {dimension} - 1")]
    BandMismatch { dimension: usize, actual: usize },
    #[error("implicit QL did not converge for eigenvalue {index}")]
    NoConvergence { index: usize },
}

/// `T - shift * I = L D L^T` with unit lower-bidiagonal `L`.
#[derive(Debug, Clone, PartialEq)]
pub struct ShiftedFactorization {
    shift: f64,
    pivots: Vec<f64>,
    multipliers: Vec<f64>,
}

impl ShiftedFactorization {
    pub fn factor(
        diagonal: &[f64],
        off_diagonal: &[f64],
        shift: f64,
    ) -> Result<Self, FactorizationError> {
        let dimension = diagonal.len();
        let scale = shifted_scale(diagonal, off_diagonal, shift).max(f64::MIN_POSITIVE);
        let threshold = scale * SINGULAR_RELATIVE_PIVOT_EPSILON;

        let mut pivots = Vec::with_capacity(dimension);
        let mut multipliers = Vec::with_capacity(dimension.saturating_sub(1));

        let mut pivot = diagonal[0] - shift;
        for index in 0..dimension {
            if !pivot.is_finite() {
                return Err(FactorizationError::NonFinitePivot { pivot_index: index });
            }
            if pivot.abs() <= threshold {
                return Err(FactorizationError::SingularPivot {
                    pivot_index: index,
                    pivot,
                });
            }
            pivots.push(pivot);

            if index + 1 < dimension {
                let coupling = off_diagonal[index];
                let multiplier = coupling / pivot;
                multipliers.push(multiplier);
                pivot = diagonal[index + 1] - shift - multiplier * coupling;
            }
        }

        Ok(Self {
            shift,
            pivots,
            multipliers,
        })
    }

    pub fn shift(&self) -> f64 {
        self.shift
    }

    pub fn dimension(&self) -> usize {
        self.pivots.len()
    }

    pub fn pivots(&self) -> &[f64] {
        &self.pivots
    }

    /// Eigenvalues of the unshifted matrix lying below the shift.
    pub fn negative_pivot_count(&self) -> usize {
        self.pivots.iter().filter(|pivot| **pivot < 0.0).count()
    }

    /// Solves `(T - shift * I) x = rhs` into `solution`.
    pub fn solve_into(&self, rhs: &[f64], solution: &mut [f64]) {
        let dimension = self.dimension();
        debug_assert_eq!(rhs.len(), dimension);
        debug_assert_eq!(solution.len(), dimension);

        solution[0] = rhs[0];
        for index in 1..dimension {
            solution[index] = rhs[index] - self.multipliers[index - 1] * solution[index - 1];
        }
        for index in 0..dimension {
            solution[index] /= self.pivots[index];
        }
        for index in (0..dimension.saturating_sub(1)).rev() {
            solution[index] -= self.multipliers[index] * solution[index + 1];
        }
    }
}

fn shifted_scale(diagonal: &[f64], off_diagonal: &[f64], shift: f64) -> f64 {
    let diagonal_max = diagonal
        .iter()
        .map(|value| (value - shift).abs())
        .fold(0.0, f64::max);
    let off_max = off_diagonal.iter().map(|value| value.abs()).fold(0.0, f64::max);
    diagonal_max + 2.0 * off_max
}

/// Sturm-sequence count of eigenvalues strictly below `shift`.
pub fn sturm_count_below(diagonal: &[f64], off_diagonal: &[f64], shift: f64) -> usize {
    let scale = shifted_scale(diagonal, off_diagonal, shift).max(f64::MIN_POSITIVE);
    let tiny = scale * f64::EPSILON;

    let mut count = 0;
    let mut q = 1.0_f64;
    for index in 0..diagonal.len() {
        let coupling_sq = if index == 0 {
            0.0
        } else {
            off_diagonal[index - 1] * off_diagonal[index - 1]
        };
        q = diagonal[index] - shift - if index == 0 { 0.0 } else { coupling_sq / q };
        if q.abs() < tiny {
            q = -tiny;
        }
        if q < 0.0 {
            count += 1;
        }
    }
    count
}

#[derive(Debug, Clone)]
pub struct TridiagonalEigen {
    eigenvalues: Vec<f64>,
    eigenvectors: Mat<f64>,
}

impl TridiagonalEigen {
    /// Ascending eigenvalues.
    pub fn eigenvalues(&self) -> &[f64] {
        &self.eigenvalues
    }

    /// Column `j` is the unit eigenvector of `eigenvalues()[j]`.
    pub fn eigenvectors(&self) -> &Mat<f64> {
        &self.eigenvectors
    }

    /// Last component of eigenvector `index`; scales the Lanczos residual.
    pub fn last_component(&self, index: usize) -> f64 {
        self.eigenvectors[(self.eigenvectors.nrows() - 1, index)]
    }
}

/// Full eigen-decomposition by implicit QL with Wilkinson-type shifts.
pub fn symmetric_tridiagonal_eigen(
    diagonal: &[f64],
    off_diagonal: &[f64],
) -> Result<TridiagonalEigen, EigenError> {
    let dimension = diagonal.len();
    if dimension == 0 {
        return Err(EigenError::EmptyMatrix);
    }
    if off_diagonal.len() + 1 != dimension {
        return Err(EigenError::BandMismatch {
            dimension,
            actual: off_diagonal.len(),
        });
    }

    let mut d = diagonal.to_vec();
    let mut e = off_diagonal.to_vec();
    e.push(0.0);
    let mut z = Mat::<f64>::identity(dimension, dimension);

    for l in 0..dimension {
        let mut sweeps = 0;
        loop {
            let mut m = l;
            while m + 1 < dimension {
                let dd = d[m].abs() + d[m + 1].abs();
                if e[m].abs() <= f64::EPSILON * dd {
                    break;
                }
                m += 1;
            }
            if m == l {
                break;
            }

            sweeps += 1;
            if sweeps > QL_MAX_SWEEPS_PER_EIGENVALUE {
                return Err(EigenError::NoConvergence { index: l });
            }

            let mut g = (d[l + 1] - d[l]) / (2.0 * e[l]);
            let mut r = g.hypot(1.0);
            g = d[m] - d[l] + e[l] / (g + r.copysign(g));

            let mut s = 1.0;
            let mut c = 1.0;
            let mut p = 0.0;
            let mut deflated = false;

            for i in (l..m).rev() {
                let f = s * e[i];
                let b = c * e[i];
                r = f.hypot(g);
                e[i + 1] = r;
                if r == 0.0 {
                    d[i + 1] -= p;
                    e[m] = 0.0;
                    deflated = true;
                    break;
                }
                s = f / r;
                c = g / r;
                g = d[i + 1] - p;
                r = (d[i] - g) * s + 2.0 * c * b;
                p = s * r;
                d[i + 1] = g + p;
                g = c * r - b;

                for k in 0..dimension {
                    let upper = z[(k, i + 1)];
                    z[(k, i + 1)] = s * z[(k, i)] + c * upper;
                    z[(k, i)] = c * z[(k, i)] - s * upper;
                }
            }

            if deflated {
                continue;
            }
            d[l] -= p;
            e[l] = g;
            e[m] = 0.0;
        }
    }

    let mut order: Vec<usize> = (0..dimension).collect();
    order.sort_by(|lhs, rhs| d[*lhs].total_cmp(&d[*rhs]));

    let eigenvalues = order.iter().map(|index| d[*index]).collect();
    let eigenvectors = Mat::from_fn(dimension, dimension, |row, col| z[(row, order[col])]);

    Ok(TridiagonalEigen {
        eigenvalues,
        eigenvectors,
    })
}
