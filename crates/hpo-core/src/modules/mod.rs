pub mod aggregate;
pub mod matching;
pub mod pipeline;
pub mod report;
pub mod sweep;
pub mod traits;

pub use aggregate::{
    AggregatedSpectrum, AggregationOptions, AnomalyKind, NumericAnomaly, aggregate_spectrum,
};
pub use matching::{
    MatchPair, Matching, MatchingError, match_greedy, match_optimal, match_spectrum,
};
pub use pipeline::{
    PipelineError, PipelineOutcome, build_operator, load_reference, run_pipeline,
    run_pipeline_with,
};
pub use report::SpectralReport;
pub use sweep::{
    RawSpectrumSample, ScheduleError, ShiftSchedule, SpectralSweepEngine, SweepResult,
};
pub use traits::{AssignmentSolver, HungarianAssignment, ShiftInvertSolver};
