pub mod config;
pub mod dynamics;
pub mod error;
pub mod guidance;
pub mod io;
pub mod mission;
pub mod sim;

pub mod types {
    pub use crate::config::{OptimizerConfig, ScenarioConfig, SolverConfig};
    pub use crate::dynamics::state::{Deriv, DisturbanceParams, State};
    pub use crate::guidance::{ControlBounds, ControlParams, CostBreakdown, Target};
    pub use crate::sim::{TimeGrid, TimeSpan, Trajectory};
}
