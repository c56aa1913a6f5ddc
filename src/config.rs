use serde::{Deserialize, Serialize};

use crate::dynamics::{DisturbanceParams, State};
use crate::error::{ConfigError, ConfigResult};
use crate::guidance::{ControlBounds, ControlParams, Target};
use crate::sim::{TimeGrid, TimeSpan};

// ---------------------------------------------------------------------------
// ODE solver settings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    pub rtol: f64,
    pub atol: f64,
    /// Attempted steps (accepted + rejected) before giving up.
    pub max_steps: u64,
    pub h_min: f64,
    /// Upper step limit; `None` means the full span.
    pub h_max: Option<f64>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            rtol: 1e-3,
            atol: 1e-6,
            max_steps: 100_000,
            h_min: 1e-12,
            h_max: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Control search settings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Weight of remaining energy against target distance in the cost.
    pub energy_weight: f64,
    pub max_iterations: u64,
    /// Hard cap on cost evaluations, i.e. full trajectory integrations.
    pub max_evaluations: usize,
    /// Simplex cost standard deviation below which the search has converged.
    pub sd_tolerance: f64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            energy_weight: 0.1,
            max_iterations: 1_000,
            max_evaluations: 5_000,
            sd_tolerance: 1e-8,
        }
    }
}

// ---------------------------------------------------------------------------
// Full scenario
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    pub t0: f64,
    pub t1: f64,
    pub samples: usize,
    pub initial_energy: f64,
    /// Launch velocity of the unoptimized flight; also the search's initial guess.
    pub baseline_control: ControlParams,
    pub disturbance: DisturbanceParams,
    pub target: Target,
    pub bounds: ControlBounds,
    pub solver: SolverConfig,
    pub optimizer: OptimizerConfig,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            t0: 0.0,
            t1: 50.0,
            samples: 500,
            initial_energy: 100.0,
            baseline_control: ControlParams::new(2.0, 2.0),
            disturbance: DisturbanceParams::default(),
            target: Target::new(50.0, 20.0),
            bounds: ControlBounds::default(),
            solver: SolverConfig::default(),
            optimizer: OptimizerConfig::default(),
        }
    }
}

impl ScenarioConfig {
    /// Parse a scenario from JSON; omitted fields take their defaults.
    pub fn from_json_str(json: &str) -> ConfigResult<Self> {
        let config: ScenarioConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_string(&self) -> ConfigResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if !self.t0.is_finite() || !self.t1.is_finite() || self.t1 < self.t0 {
            return Err(ConfigError::Invalid {
                what: format!("time span [{}, {}] must be finite and ordered", self.t0, self.t1),
            });
        }
        if self.samples == 0 {
            return Err(ConfigError::Invalid {
                what: "evaluation grid needs at least one sample".into(),
            });
        }
        if self.samples > 1 && self.t1 == self.t0 {
            return Err(ConfigError::Invalid {
                what: "a degenerate span admits only one sample".into(),
            });
        }
        if !self.initial_energy.is_finite() {
            return Err(ConfigError::Invalid {
                what: "initial energy must be finite".into(),
            });
        }
        if !(self.solver.rtol >= 0.0 && self.solver.atol > 0.0) {
            return Err(ConfigError::Invalid {
                what: "solver tolerances must be positive".into(),
            });
        }
        if !self.optimizer.energy_weight.is_finite() {
            return Err(ConfigError::Invalid {
                what: "energy weight must be finite".into(),
            });
        }
        if self.optimizer.max_evaluations == 0 || self.optimizer.max_iterations == 0 {
            return Err(ConfigError::Invalid {
                what: "iteration and evaluation limits must be positive".into(),
            });
        }
        if !(self.optimizer.sd_tolerance.is_finite() && self.optimizer.sd_tolerance > 0.0) {
            return Err(ConfigError::Invalid {
                what: "convergence tolerance must be positive".into(),
            });
        }
        self.bounds
            .validate()
            .map_err(|what| ConfigError::Invalid { what })
    }

    pub fn span(&self) -> TimeSpan {
        TimeSpan::new(self.t0, self.t1)
    }

    pub fn grid(&self) -> TimeGrid {
        TimeGrid::linspace(self.t0, self.t1, self.samples)
    }

    pub fn baseline_state(&self) -> State {
        self.baseline_control.initial_state(self.initial_energy)
    }
}
