pub mod aggregate;
pub mod evaluator;
pub mod grid;
pub mod report;

pub use aggregate::{RunningAggregate, SliceScore, Snapshot};
pub use evaluator::{evaluate, AbortHandle, BatchEvaluator};
pub use grid::SliceGrid;
pub use report::{EvalSummary, NoOpReporter, ProgressReporter, SliceRecord};
