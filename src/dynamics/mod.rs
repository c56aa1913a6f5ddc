pub mod state;

pub use state::{Deriv, DisturbanceParams, State, DAMPING, ENERGY_DEPLETION, TERRAIN_FREQUENCY};

use nalgebra::Vector5;

use crate::sim::integrator::OdeSystem;

// ---------------------------------------------------------------------------
// Equations of motion (planar point mass with energy store)
// ---------------------------------------------------------------------------

/// Compute state derivatives for a given state and disturbance.
///
/// Terms modeled:
///   1. Damping: linear, opposing velocity on both axes
///   2. Wind   : constant acceleration along x
///   3. Terrain: vertical forcing `-k sin(c2 x)` that varies with x
///   4. Energy : drained in proportion to speed squared
///
/// `_t` is unused; the system is autonomous.
pub fn derivatives(_t: f64, state: &State, dist: &DisturbanceParams) -> Deriv {
    let vx = state.vel.x;
    let vy = state.vel.y;

    let ax = -DAMPING * vx + dist.wind_speed;
    let ay = -DAMPING * vy + terrain_accel(state.pos.x, dist.terrain_factor);

    Deriv {
        dpos: state.vel,
        dvel: nalgebra::Vector2::new(ax, ay),
        denergy: -ENERGY_DEPLETION * (vx * vx + vy * vy),
    }
}

/// Vertical acceleration contributed by terrain at downrange position `x`.
pub fn terrain_accel(x: f64, terrain_factor: f64) -> f64 {
    -terrain_factor * (TERRAIN_FREQUENCY * x).sin()
}

/// The UAV equations of motion bound to one disturbance, as an ODE right-hand side.
#[derive(Debug, Clone, Copy)]
pub struct UavModel {
    pub disturbance: DisturbanceParams,
}

impl UavModel {
    pub fn new(disturbance: DisturbanceParams) -> Self {
        Self { disturbance }
    }
}

impl OdeSystem<5> for UavModel {
    fn rhs(&self, t: f64, y: &Vector5<f64>) -> Vector5<f64> {
        derivatives(t, &State::from_vector(y), &self.disturbance).to_vector()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
