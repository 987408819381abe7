pub mod assignment;
pub mod grid;
pub mod lanczos;
pub mod operator;
pub mod potential;
pub mod tridiagonal;

pub use assignment::{Assignment, AssignmentError, solve_assignment};
pub use grid::{Grid, GridError};
pub use lanczos::{LanczosShiftInvert, ShiftSolveFailure};
pub use operator::{OperatorError, TridiagonalOperator};
pub use potential::{HarmonicSeries, POTENTIAL_FLOOR, Potential, PotentialError};
pub use tridiagonal::{
    EigenError, FactorizationError, ShiftedFactorization, TridiagonalEigen, sturm_count_below,
    symmetric_tridiagonal_eigen,
};
