pub mod cost;
pub mod optimizer;

pub use cost::{score, Bound, ControlBounds, ControlParams, CostBreakdown, Target};
pub use optimizer::{optimize, OptimizationResult, TrajectoryProblem, BOUND_PENALTY};
