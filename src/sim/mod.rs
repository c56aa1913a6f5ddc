pub mod grid;
pub mod integrator;
pub mod runner;
pub mod trajectory;

pub use grid::{TimeGrid, TimeSpan};
pub use integrator::{dopri_step, DormandPrince, OdeSystem, StepController};
pub use runner::{simulate, simulate_with};
pub use trajectory::{SolverStats, Trajectory};
