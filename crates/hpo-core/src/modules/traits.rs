use crate::numerics::{
    AssignmentError, LanczosShiftInvert, ShiftSolveFailure, TridiagonalOperator, solve_assignment,
};
use faer::Mat;

/// Eigensolver boundary of the sweep: up to `count` eigenvalues of
/// `operator` nearest `shift`, or a typed failure for that shift alone.
///
/// Implementations are shared across worker threads during a parallel sweep.
pub trait ShiftInvertSolver: Sync {
    fn eigenvalues_near(
        &self,
        operator: &TridiagonalOperator,
        shift: f64,
        count: usize,
    ) -> Result<Vec<f64>, ShiftSolveFailure>;

    /// Bytes one solve keeps alive, when the solver can bound them. A
    /// parallel sweep holds one such working set per rayon worker.
    fn working_set_bytes(&self, _dimension: usize, _count: usize) -> Option<usize> {
        None
    }
}

impl ShiftInvertSolver for LanczosShiftInvert {
    fn eigenvalues_near(
        &self,
        operator: &TridiagonalOperator,
        shift: f64,
        count: usize,
    ) -> Result<Vec<f64>, ShiftSolveFailure> {
        LanczosShiftInvert::eigenvalues_near(self, operator, shift, count)
    }

    fn working_set_bytes(&self, dimension: usize, count: usize) -> Option<usize> {
        Some(self.peak_basis_bytes(dimension, count))
    }
}

/// Assignment boundary of the matching step: one distinct column per row,
/// minimizing the summed cost.
pub trait AssignmentSolver {
    fn assign(&self, cost: &Mat<f64>) -> Result<Vec<usize>, AssignmentError>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HungarianAssignment;

impl AssignmentSolver for HungarianAssignment {
    fn assign(&self, cost: &Mat<f64>) -> Result<Vec<usize>, AssignmentError> {
        Ok(solve_assignment(cost)?.row_to_col().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::{AssignmentSolver, HungarianAssignment, ShiftInvertSolver};
    use crate::numerics::{LanczosShiftInvert, ShiftSolveFailure, TridiagonalOperator};
    use faer::Mat;

    struct AlwaysSingular;

    impl ShiftInvertSolver for AlwaysSingular {
        fn eigenvalues_near(
            &self,
            _operator: &TridiagonalOperator,
            shift: f64,
            _count: usize,
        ) -> Result<Vec<f64>, ShiftSolveFailure> {
            Err(ShiftSolveFailure::SingularShift {
                shift,
                pivot_index: 0,
            })
        }
    }

    #[test]
    fn solver_trait_objects_share_failure_type() {
        let operator =
            TridiagonalOperator::from_bands(vec![2.0, 3.0, 4.0, 5.0], vec![0.5, 0.5, 0.5])
                .expect("operator");
        let solvers: [&dyn ShiftInvertSolver; 2] = [&LanczosShiftInvert::default(), &AlwaysSingular];

        let found = solvers[0]
            .eigenvalues_near(&operator, 3.4, 2)
            .expect("lanczos should solve");
        assert_eq!(found.len(), 2);

        let error = solvers[1]
            .eigenvalues_near(&operator, 3.4, 2)
            .expect_err("stub should fail");
        assert_eq!(error.kind(), "singular_shift");

        assert_eq!(solvers[0].working_set_bytes(4, 2), Some(4 * 4 * 8));
        assert_eq!(solvers[1].working_set_bytes(4, 2), None);
    }

    #[test]
    fn hungarian_adapter_returns_row_to_column_map() {
        let cost = Mat::from_fn(2, 3, |row, col| ((row as f64) - (col as f64)).abs());
        let columns = HungarianAssignment.assign(&cost).expect("assignment");
        assert_eq!(columns, vec![0, 1]);
    }
}
