use faer::Mat;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AssignmentError {
    #[error("assignment requires at least one row")]
    EmptyCostMatrix,
    #[error("cannot assign {rows} rows to only {cols} columns")]
    TooFewColumns { rows: usize, cols: usize },
    #[error("cost at ({row}, {col}) is not finite")]
    NonFiniteCost { row: usize, col: usize },
    #[error("no augmenting path found for row {row}")]
    NoAugmentingPath { row: usize },
}

/// Rectangular minimum-cost assignment: every row gets a distinct column.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    row_to_col: Vec<usize>,
    total_cost: f64,
}

impl Assignment {
    pub fn row_to_col(&self) -> &[usize] {
        &self.row_to_col
    }

    pub fn total_cost(&self) -> f64 {
        self.total_cost
    }
}

/// Hungarian method in its shortest-augmenting-path form with row and
/// column potentials; `O(rows^2 * cols)`.
///
/// Ties between equally cheap columns go to the lowest column index, so the
/// result depends only on the cost matrix.
pub fn solve_assignment(cost: &Mat<f64>) -> Result<Assignment, AssignmentError> {
    let rows = cost.nrows();
    let cols = cost.ncols();
    if rows == 0 {
        return Err(AssignmentError::EmptyCostMatrix);
    }
    if rows > cols {
        return Err(AssignmentError::TooFewColumns { rows, cols });
    }
    for col in 0..cols {
        for row in 0..rows {
            if !cost[(row, col)].is_finite() {
                return Err(AssignmentError::NonFiniteCost { row, col });
            }
        }
    }

    // 1-based bookkeeping: column 0 and row 0 are sentinels.
    let mut row_potential = vec![0.0_f64; rows + 1];
    let mut col_potential = vec![0.0_f64; cols + 1];
    let mut col_owner = vec![0_usize; cols + 1];
    let mut way = vec![0_usize; cols + 1];

    for row in 1..=rows {
        col_owner[0] = row;
        let mut current_col = 0_usize;
        let mut min_reduced = vec![f64::INFINITY; cols + 1];
        let mut visited = vec![false; cols + 1];

        loop {
            visited[current_col] = true;
            let owner = col_owner[current_col];
            let mut delta = f64::INFINITY;
            let mut next_col = 0_usize;

            for col in 1..=cols {
                if visited[col] {
                    continue;
                }
                let reduced =
                    cost[(owner - 1, col - 1)] - row_potential[owner] - col_potential[col];
                if reduced < min_reduced[col] {
                    min_reduced[col] = reduced;
                    way[col] = current_col;
                }
                if min_reduced[col] < delta {
                    delta = min_reduced[col];
                    next_col = col;
                }
            }

            if next_col == 0 || !delta.is_finite() {
                return Err(AssignmentError::NoAugmentingPath { row: row - 1 });
            }

            for col in 0..=cols {
                if visited[col] {
                    row_potential[col_owner[col]] += delta;
                    col_potential[col] -= delta;
                } else {
                    min_reduced[col] -= delta;
                }
            }

            current_col = next_col;
            if col_owner[current_col] == 0 {
                break;
            }
        }

        loop {
            let previous = way[current_col];
            col_owner[current_col] = col_owner[previous];
            current_col = previous;
            if current_col == 0 {
                break;
            }
        }
    }

    let mut row_to_col = vec![0_usize; rows];
    for col in 1..=cols {
        let owner = col_owner[col];
        if owner != 0 {
            row_to_col[owner - 1] = col - 1;
        }
    }
    let total_cost = row_to_col
        .iter()
        .enumerate()
        .map(|(row, col)| cost[(row, *col)])
        .sum();

    Ok(Assignment {
        row_to_col,
        total_cost,
    })
}

#[cfg(test)]
mod tests {
    use super::{AssignmentError, solve_assignment};
    use faer::Mat;

    fn matrix(rows: &[&[f64]]) -> Mat<f64> {
        Mat::from_fn(rows.len(), rows[0].len(), |row, col| rows[row][col])
    }

    fn brute_force_minimum(cost: &Mat<f64>) -> f64 {
        fn recurse(cost: &Mat<f64>, row: usize, used: &mut Vec<bool>) -> f64 {
            if row == cost.nrows() {
                return 0.0;
            }
            let mut best = f64::INFINITY;
            for col in 0..cost.ncols() {
                if used[col] {
                    continue;
                }
                used[col] = true;
                best = best.min(cost[(row, col)] + recurse(cost, row + 1, used));
                used[col] = false;
            }
            best
        }
        recurse(cost, 0, &mut vec![false; cost.ncols()])
    }

    #[test]
    fn square_assignment_matches_known_optimum() {
        let cost = matrix(&[&[4.0, 1.0, 3.0], &[2.0, 0.0, 5.0], &[3.0, 2.0, 2.0]]);
        let assignment = solve_assignment(&cost).expect("assignment");
        assert_eq!(assignment.row_to_col(), &[1, 0, 2]);
        assert!((assignment.total_cost() - 5.0).abs() < 1.0e-12);
    }

    #[test]
    fn rectangular_assignment_is_optimal_and_injective() {
        let cost = Mat::from_fn(4, 7, |row, col| {
            ((row as f64 * 1.7 + 0.3) - (col as f64 * 1.1)).abs() + ((row * 7 + col * 3) % 5) as f64 * 0.1
        });
        let assignment = solve_assignment(&cost).expect("assignment");

        let mut columns = assignment.row_to_col().to_vec();
        columns.sort_unstable();
        columns.dedup();
        assert_eq!(columns.len(), 4);
        assert!((assignment.total_cost() - brute_force_minimum(&cost)).abs() < 1.0e-9);
    }

    #[test]
    fn degenerate_costs_are_resolved_deterministically() {
        let cost = Mat::from_fn(3, 5, |_, _| 1.0);
        let first = solve_assignment(&cost).expect("assignment");
        let second = solve_assignment(&cost).expect("assignment");
        assert_eq!(first, second);
        assert!((first.total_cost() - 3.0).abs() < 1.0e-12);
    }

    #[test]
    fn invalid_shapes_and_costs_are_rejected() {
        let tall = Mat::from_fn(3, 2, |_, _| 1.0);
        assert_eq!(
            solve_assignment(&tall).err(),
            Some(AssignmentError::TooFewColumns { rows: 3, cols: 2 })
        );
        let empty = Mat::<f64>::zeros(0, 4);
        assert_eq!(
            solve_assignment(&empty).err(),
            Some(AssignmentError::EmptyCostMatrix)
        );
        let poisoned = matrix(&[&[1.0, f64::NAN]]);
        assert_eq!(
            solve_assignment(&poisoned).err(),
            Some(AssignmentError::NonFiniteCost { row: 0, col: 1 })
        );
    }
}
