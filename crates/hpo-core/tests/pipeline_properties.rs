use hpo_core::common::config::{Preset, RunConfig};
use hpo_core::common::reference::{ReferenceSequence, ZETA_ZERO_ORDINATES};
use hpo_core::domain::{ExecutionMode, MatchingPolicy};
use hpo_core::modules::matching::{MatchingError, match_greedy, match_optimal, match_spectrum};
use hpo_core::modules::pipeline::{PipelineError, build_operator, run_pipeline, run_pipeline_with};
use hpo_core::modules::sweep::ShiftSchedule;
use hpo_core::modules::traits::{HungarianAssignment, ShiftInvertSolver};
use hpo_core::numerics::{
    Grid, HarmonicSeries, LanczosShiftInvert, POTENTIAL_FLOOR, Potential, ShiftSolveFailure,
    TridiagonalOperator,
};

fn small_config(matching: MatchingPolicy) -> RunConfig {
    RunConfig {
        length: 20.0,
        dz: 0.05,
        kappa: 60.0,
        beta: 0.06,
        nmax: 40,
        alpha: Some(6.0),
        sweep: ShiftSchedule {
            start: 100.0,
            stop: 2100.0,
            step: 250.0,
        },
        eigenvalues_per_shift: 20,
        matching,
        reference_count: 10,
        max_krylov_factor: 10,
        ..RunConfig::default()
    }
}

struct FailsEverywhere;

impl ShiftInvertSolver for FailsEverywhere {
    fn eigenvalues_near(
        &self,
        _operator: &TridiagonalOperator,
        shift: f64,
        _count: usize,
    ) -> Result<Vec<f64>, ShiftSolveFailure> {
        Err(ShiftSolveFailure::NumericalBreakdown {
            shift,
            reason: "forced failure".to_string(),
        })
    }
}

/// Returns the `count` tabulated eigenvalues nearest each shift.
struct TabulatedSpectrum {
    eigenvalues: Vec<f64>,
}

impl ShiftInvertSolver for TabulatedSpectrum {
    fn eigenvalues_near(
        &self,
        _operator: &TridiagonalOperator,
        shift: f64,
        count: usize,
    ) -> Result<Vec<f64>, ShiftSolveFailure> {
        let mut nearest = self.eigenvalues.clone();
        nearest.sort_by(|lhs, rhs| (lhs - shift).abs().total_cmp(&(rhs - shift).abs()));
        nearest.truncate(count);
        nearest.sort_by(f64::total_cmp);
        Ok(nearest)
    }
}

#[test]
fn potential_stays_above_floor_across_parameters() {
    let grid = Grid::new(30.0, 0.1).expect("grid");
    for (kappa, beta, nmax, alpha) in [
        (9000.0, 0.06, 200, Some(6.0)),
        (1000.0, 0.1, 300, None),
        (1.0, 0.0, 1, None),
        (250.0, 2.0, 50, Some(0.0)),
    ] {
        let series = HarmonicSeries {
            length: 30.0,
            kappa,
            beta,
            nmax,
            alpha,
        };
        let potential = Potential::synthesize(grid.interior(), &series).expect("potential");
        assert_eq!(potential.len(), grid.interior_len());
        assert!(
            potential
                .values()
                .iter()
                .all(|value| *value >= POTENTIAL_FLOOR * (1.0 - 1.0e-9)),
            "kappa={kappa} beta={beta} nmax={nmax}"
        );
    }
}

#[test]
fn operator_is_symmetric_and_positive_definite() {
    let (operator, _) = build_operator(&small_config(MatchingPolicy::Greedy)).expect("operator");
    let n = operator.dimension();
    for row in 0..n.min(50) {
        for col in 0..n.min(50) {
            assert_eq!(operator.entry(row, col), operator.entry(col, row));
        }
    }
    assert_eq!(operator.inertia_below(0.0), 0);

    let lowest = LanczosShiftInvert::default()
        .with_max_krylov_factor(10)
        .eigenvalues_near(&operator, 0.0, 3)
        .expect("lowest eigenvalues");
    assert!(lowest.iter().all(|value| *value > 0.0));
}

#[test]
fn lanczos_eigenvalues_agree_with_sturm_counts() {
    let (operator, _) = build_operator(&small_config(MatchingPolicy::Greedy)).expect("operator");
    let shift = 850.0;
    let found = LanczosShiftInvert::default()
        .with_tolerance(1.0e-10)
        .with_max_krylov_factor(10)
        .eigenvalues_near(&operator, shift, 8)
        .expect("solve");
    assert_eq!(found.len(), 8);
    for value in &found {
        let bracket =
            operator.inertia_below(value + 1.0e-4) - operator.inertia_below(value - 1.0e-4);
        assert_eq!(bracket, 1, "no eigenvalue brackets {value}");
    }
    let below = found.iter().filter(|value| **value < shift).count();
    let lowest = found[0];
    assert_eq!(
        operator.inertia_below(shift) - operator.inertia_below(lowest - 1.0e-4),
        below
    );
}

#[test]
fn aggregated_spectrum_is_strictly_increasing_without_near_duplicates() {
    let config = small_config(MatchingPolicy::Greedy);
    let outcome = run_pipeline(&config).expect("pipeline");
    let values = outcome.spectrum.values();
    assert!(values.len() >= config.reference_count);
    assert!(
        values
            .windows(2)
            .all(|pair| pair[1] - pair[0] > config.dedup_tolerance)
    );
    assert!(outcome.spectrum.anomalies().is_empty());
}

#[test]
fn optimal_matching_never_loses_to_greedy() {
    let outcome = run_pipeline(&small_config(MatchingPolicy::Greedy)).expect("pipeline");
    let reference = outcome.reference.values();
    let spectrum = outcome.spectrum.values();

    let greedy = match_greedy(reference, spectrum).expect("greedy");
    let optimal = match_optimal(reference, spectrum, &HungarianAssignment).expect("optimal");
    assert!(optimal.total_error <= greedy.total_error + 1.0e-9);
    assert_eq!(greedy, outcome.matching);
}

#[test]
fn repeated_runs_are_identical() {
    let config = small_config(MatchingPolicy::Optimal);
    let first = run_pipeline(&config).expect("first run");
    let second = run_pipeline(&config).expect("second run");
    assert_eq!(first.spectrum, second.spectrum);
    assert_eq!(first.matching, second.matching);
}

#[test]
fn parallel_execution_matches_serial_execution() {
    let serial = run_pipeline(&small_config(MatchingPolicy::Optimal)).expect("serial");
    let parallel = run_pipeline(&RunConfig {
        execution: ExecutionMode::Parallel,
        ..small_config(MatchingPolicy::Optimal)
    })
    .expect("parallel");
    assert_eq!(serial.sweep, parallel.sweep);
    assert_eq!(serial.spectrum, parallel.spectrum);
    assert_eq!(serial.matching, parallel.matching);
}

#[test]
fn spectrum_equal_to_reference_is_recovered_exactly() {
    let reference = ReferenceSequence::first_zeta_zeros(50).expect("table");
    for policy in [MatchingPolicy::Greedy, MatchingPolicy::Optimal] {
        let matching =
            match_spectrum(policy, reference.values(), reference.values()).expect("match");
        assert_eq!(matching.l2_error, 0.0);
        assert_eq!(matching.max_error, 0.0);
        assert!(matching.is_monotonic());
        assert!(
            matching
                .pairs
                .iter()
                .all(|pair| pair.spectrum_index == pair.index)
        );
    }
}

#[test]
fn all_shifts_failing_leaves_nothing_to_match() {
    let config = small_config(MatchingPolicy::Optimal);
    let error = run_pipeline_with(&config, &FailsEverywhere).expect_err("must fail");
    match error {
        PipelineError::Matching(MatchingError::InsufficientSpectrum {
            required,
            available,
        }) => {
            assert_eq!(required, 10);
            assert_eq!(available, 0);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn scenario_with_spectrum_narrower_than_reference_stays_monotonic() {
    // Twelve roots sit just above the leading zeros; the rest crowd in below
    // the thirteenth zero, so the upper eight references exceed every root.
    let fillers = [57.0, 57.5, 58.0, 58.5, 59.0, 59.2, 59.3, 59.34];
    let roots: Vec<f64> = ZETA_ZERO_ORDINATES[..12]
        .iter()
        .map(|zero| zero + 1.0e-3)
        .chain(fillers)
        .collect();
    let solver = TabulatedSpectrum {
        eigenvalues: roots.iter().map(|root| root * root).collect(),
    };
    let config = RunConfig {
        reference_count: 20,
        ..small_config(MatchingPolicy::Optimal)
    };

    let outcome = run_pipeline_with(&config, &solver).expect("pipeline");
    let spectrum = outcome.spectrum.values();
    assert_eq!(spectrum.len(), 20);
    assert!(spectrum[19] < outcome.reference.values()[12]);

    let matching = &outcome.matching;
    assert!(matching.is_monotonic());
    assert_eq!(matching.close_matches(0.01).len(), 12);
    let indices: Vec<usize> = matching.pairs.iter().map(|pair| pair.spectrum_index).collect();
    assert_eq!(indices, (0..20).collect::<Vec<_>>());

    let greedy = match_greedy(outcome.reference.values(), spectrum).expect("greedy");
    assert!(!greedy.is_monotonic());
    assert!(matching.total_error <= greedy.total_error + 1.0e-9);
}

#[test]
#[ignore = "full-size sweep over an 80k-point operator; run with --ignored --release"]
fn regularized_scenario_matches_zeta_zeros_monotonically() {
    let config = RunConfig {
        execution: ExecutionMode::Parallel,
        ..Preset::Regularized.config()
    };
    let outcome = run_pipeline(&config).expect("pipeline");
    assert_eq!(outcome.matching.pairs.len(), 50);
    assert!(outcome.matching.is_monotonic());
    assert!(!outcome.matching.close_matches(0.01).is_empty());
}
