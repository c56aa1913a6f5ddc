use serde::{Deserialize, Serialize};

use crate::dynamics::State;

// ---------------------------------------------------------------------------
// Control parameters and their feasible box
// ---------------------------------------------------------------------------

/// Launch velocity command: the only inputs the search may adjust.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlParams {
    pub vx0: f64,
    pub vy0: f64,
}

impl ControlParams {
    pub fn new(vx0: f64, vy0: f64) -> Self {
        Self { vx0, vy0 }
    }

    /// Launch state at the origin with the commanded velocity.
    pub fn initial_state(&self, energy: f64) -> State {
        State::new(0.0, 0.0, self.vx0, self.vy0, energy)
    }

    pub fn to_vec(self) -> Vec<f64> {
        vec![self.vx0, self.vy0]
    }

    pub fn from_slice(p: &[f64]) -> Self {
        Self::new(p[0], p[1])
    }
}

/// Closed interval `[lo, hi]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bound {
    pub lo: f64,
    pub hi: f64,
}

impl Bound {
    pub fn new(lo: f64, hi: f64) -> Self {
        Self { lo, hi }
    }

    pub fn width(&self) -> f64 {
        self.hi - self.lo
    }

    pub fn contains(&self, v: f64) -> bool {
        v >= self.lo && v <= self.hi
    }

    pub fn clamp(&self, v: f64) -> f64 {
        v.clamp(self.lo, self.hi)
    }

    fn validate(&self, name: &str) -> Result<(), String> {
        if !self.lo.is_finite() || !self.hi.is_finite() {
            return Err(format!("{name} bound [{}, {}] is not finite", self.lo, self.hi));
        }
        if self.lo > self.hi {
            return Err(format!("{name} bound [{}, {}] has lower > upper", self.lo, self.hi));
        }
        Ok(())
    }
}

/// Feasible box for the launch velocity, one interval per axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlBounds {
    pub vx: Bound,
    pub vy: Bound,
}

impl Default for ControlBounds {
    fn default() -> Self {
        Self::uniform(1.0, 5.0)
    }
}

impl ControlBounds {
    /// Same interval on both axes.
    pub fn uniform(lo: f64, hi: f64) -> Self {
        Self {
            vx: Bound::new(lo, hi),
            vy: Bound::new(lo, hi),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        self.vx.validate("vx")?;
        self.vy.validate("vy")
    }

    pub fn contains(&self, c: &ControlParams) -> bool {
        self.vx.contains(c.vx0) && self.vy.contains(c.vy0)
    }

    /// Nearest point of the box.
    pub fn project(&self, c: &ControlParams) -> ControlParams {
        ControlParams::new(self.vx.clamp(c.vx0), self.vy.clamp(c.vy0))
    }

    /// Euclidean distance from `c` to the box; zero inside.
    pub fn violation(&self, c: &ControlParams) -> f64 {
        let p = self.project(c);
        ((c.vx0 - p.vx0).powi(2) + (c.vy0 - p.vy0).powi(2)).sqrt()
    }
}

// ---------------------------------------------------------------------------
// Target and cost
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Target {
    pub x: f64,
    pub y: f64,
}

impl Target {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl Default for Target {
    fn default() -> Self {
        Self::new(50.0, 20.0)
    }
}

/// Terms of the trajectory cost; lower `total` is better.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CostBreakdown {
    /// |x - Tx| + |y - Ty| at the final sample
    pub position_error: f64,
    /// energy_weight * E at the final sample, subtracted from the total
    pub energy_reward: f64,
    pub total: f64,
}

/// Score a final state: L1 miss distance minus weighted remaining energy.
pub fn score(final_state: &State, target: &Target, energy_weight: f64) -> CostBreakdown {
    let position_error =
        (final_state.pos.x - target.x).abs() + (final_state.pos.y - target.y).abs();
    let energy_reward = energy_weight * final_state.energy;
    CostBreakdown {
        position_error,
        energy_reward,
        total: position_error - energy_reward,
    }
}
