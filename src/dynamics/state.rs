use nalgebra::{Vector2, Vector5};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Model constants
// ---------------------------------------------------------------------------

pub const DAMPING: f64 = 0.01; // linear velocity damping, 1/s
pub const TERRAIN_FREQUENCY: f64 = 0.1; // terrain spatial frequency, rad/m
pub const ENERGY_DEPLETION: f64 = 0.05; // energy drain per unit speed^2

// ---------------------------------------------------------------------------
// Planar vehicle state: position, velocity, remaining energy
// ---------------------------------------------------------------------------

/// Instantaneous vehicle configuration.
/// Frame: planar, x downrange, y up. Energy is allowed to go negative.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct State {
    pub pos: Vector2<f64>, // [x, y]
    pub vel: Vector2<f64>, // [vx, vy]
    pub energy: f64,       // remaining stored energy
}

impl State {
    pub fn new(x: f64, y: f64, vx: f64, vy: f64, energy: f64) -> Self {
        Self {
            pos: Vector2::new(x, y),
            vel: Vector2::new(vx, vy),
            energy,
        }
    }

    /// Flat `(x, y, vx, vy, E)` layout used by the ODE solver.
    pub fn to_vector(&self) -> Vector5<f64> {
        Vector5::new(self.pos.x, self.pos.y, self.vel.x, self.vel.y, self.energy)
    }

    pub fn from_vector(v: &Vector5<f64>) -> Self {
        Self::new(v[0], v[1], v[2], v[3], v[4])
    }

    pub fn speed(&self) -> f64 {
        self.vel.norm()
    }

    pub fn is_finite(&self) -> bool {
        self.to_vector().iter().all(|c| c.is_finite())
    }
}

// ---------------------------------------------------------------------------
// State derivative
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Deriv {
    pub dpos: Vector2<f64>, // velocity
    pub dvel: Vector2<f64>, // acceleration
    pub denergy: f64,       // energy drain rate (never positive)
}

impl Deriv {
    pub fn to_vector(&self) -> Vector5<f64> {
        Vector5::new(
            self.dpos.x,
            self.dpos.y,
            self.dvel.x,
            self.dvel.y,
            self.denergy,
        )
    }
}

// ---------------------------------------------------------------------------
// Environment disturbance
// ---------------------------------------------------------------------------

/// Constant wind along x and terrain oscillation strength, fixed for one run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisturbanceParams {
    pub wind_speed: f64,
    pub terrain_factor: f64,
}

impl Default for DisturbanceParams {
    fn default() -> Self {
        Self {
            wind_speed: 0.5,
            terrain_factor: 0.2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vector_layout_matches_tuple_order() {
        let s = State::new(1.0, 2.0, 3.0, 4.0, 5.0);
        let v = s.to_vector();
        assert_eq!(v.as_slice(), &[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(State::from_vector(&v), s);
    }

    #[test]
    fn derivative_layout_matches_state_layout() {
        let d = Deriv {
            dpos: Vector2::new(2.0, 2.0),
            dvel: Vector2::new(0.5, -0.1),
            denergy: -0.4,
        };
        let s = State::new(0.0, 0.0, 2.0, 2.0, 100.0);
        let next = State::from_vector(&(s.to_vector() + d.to_vector() * 0.5));
        assert!((next.pos.x - 1.0).abs() < 1e-12);
        assert!((next.vel.x - 2.25).abs() < 1e-12);
        assert!((next.energy - 99.8).abs() < 1e-12);
    }
}
