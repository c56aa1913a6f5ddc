use crate::config::SolverConfig;
use crate::dynamics::{DisturbanceParams, State, UavModel};
use crate::error::IntegrationResult;

use super::grid::{TimeGrid, TimeSpan};
use super::integrator::{DormandPrince, OdeSystem};
use super::trajectory::Trajectory;

// ---------------------------------------------------------------------------
// Trajectory integration
// ---------------------------------------------------------------------------

/// Integrate any 5-state planar model from `initial` over `span`,
/// sampling one state per grid time.
pub fn simulate_with<S>(
    system: &S,
    initial: &State,
    span: &TimeSpan,
    grid: &TimeGrid,
    config: &SolverConfig,
) -> IntegrationResult<Trajectory>
where
    S: OdeSystem<5>,
{
    let solver = DormandPrince::new(*config);
    let (ys, stats) = solver.solve(system, span, &initial.to_vector(), grid)?;
    let states = ys.iter().map(State::from_vector).collect();
    Ok(Trajectory::new(grid.times().to_vec(), states, stats))
}

/// Integrate the UAV equations of motion under a fixed disturbance.
pub fn simulate(
    initial: &State,
    span: &TimeSpan,
    disturbance: &DisturbanceParams,
    grid: &TimeGrid,
    config: &SolverConfig,
) -> IntegrationResult<Trajectory> {
    simulate_with(&UavModel::new(*disturbance), initial, span, grid, config)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
