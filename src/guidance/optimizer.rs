use std::cell::Cell;

use argmin::core::{CostFunction, Executor, TerminationReason, TerminationStatus};
use argmin::solver::neldermead::NelderMead;
use tracing::{debug, info};

use crate::config::{OptimizerConfig, ScenarioConfig, SolverConfig};
use crate::dynamics::DisturbanceParams;
use crate::error::{IntegrationError, IntegrationResult, OptimizationError, OptimizerResult};
use crate::sim::{self, TimeGrid, TimeSpan, Trajectory};

use super::cost::{score, Bound, ControlBounds, ControlParams, CostBreakdown, Target};

/// Cost added per unit of distance a candidate lies outside the control box.
pub const BOUND_PENALTY: f64 = 1e3;

/// Initial simplex edge, as a fraction of each bound's width.
const SIMPLEX_STEP: f64 = 0.05;

// ---------------------------------------------------------------------------
// Problem definition
// ---------------------------------------------------------------------------

/// Everything held fixed while the launch velocity is searched.
#[derive(Debug, Clone)]
pub struct TrajectoryProblem {
    pub span: TimeSpan,
    pub grid: TimeGrid,
    pub disturbance: DisturbanceParams,
    pub target: Target,
    pub initial_energy: f64,
    pub initial_guess: ControlParams,
    pub bounds: ControlBounds,
    pub solver: SolverConfig,
}

impl TrajectoryProblem {
    pub fn from_scenario(config: &ScenarioConfig) -> Self {
        Self {
            span: config.span(),
            grid: config.grid(),
            disturbance: config.disturbance,
            target: config.target,
            initial_energy: config.initial_energy,
            initial_guess: config.baseline_control,
            bounds: config.bounds,
            solver: config.solver,
        }
    }

    /// Integrate one full flight for a launch command.
    pub fn fly(&self, control: &ControlParams) -> IntegrationResult<Trajectory> {
        sim::simulate(
            &control.initial_state(self.initial_energy),
            &self.span,
            &self.disturbance,
            &self.grid,
            &self.solver,
        )
    }

    /// Fly and score a launch command.
    pub fn evaluate(
        &self,
        control: &ControlParams,
        energy_weight: f64,
    ) -> IntegrationResult<(Trajectory, CostBreakdown)> {
        let trajectory = self.fly(control)?;
        let cost = score(trajectory.final_state(), &self.target, energy_weight);
        Ok((trajectory, cost))
    }

    fn validate(&self, config: &OptimizerConfig) -> OptimizerResult<()> {
        self.bounds
            .validate()
            .map_err(|what| OptimizationError::InvalidParameters { what })?;

        self.span
            .check()
            .and_then(|_| self.grid.check_within(&self.span))
            .map_err(|e| match e {
                IntegrationError::InvalidParameters { what } => {
                    OptimizationError::InvalidParameters { what }
                }
                other => OptimizationError::Integration(other),
            })?;

        let guess = self.initial_guess;
        if !guess.vx0.is_finite() || !guess.vy0.is_finite() || !self.bounds.contains(&guess) {
            return Err(OptimizationError::InitialGuessOutOfBounds {
                vx0: guess.vx0,
                vy0: guess.vy0,
            });
        }

        if !config.energy_weight.is_finite() {
            return Err(OptimizationError::InvalidParameters {
                what: "energy weight must be finite".into(),
            });
        }
        if config.max_evaluations == 0 || config.max_iterations == 0 {
            return Err(OptimizationError::InvalidParameters {
                what: "iteration and evaluation limits must be positive".into(),
            });
        }
        if !(config.sd_tolerance.is_finite() && config.sd_tolerance > 0.0) {
            return Err(OptimizationError::InvalidParameters {
                what: "convergence tolerance must be positive".into(),
            });
        }
        Ok(())
    }
}

/// Best launch command found, with the flight it produces.
#[derive(Debug, Clone)]
pub struct OptimizationResult {
    pub control: ControlParams,
    pub cost: CostBreakdown,
    pub trajectory: Trajectory,
    /// Full trajectory integrations spent by the search.
    pub evaluations: usize,
    pub iterations: u64,
}

// ---------------------------------------------------------------------------
// Cost function handed to the minimizer
// ---------------------------------------------------------------------------

struct SearchCost<'a> {
    problem: &'a TrajectoryProblem,
    energy_weight: f64,
    max_evaluations: usize,
    evaluations: &'a Cell<usize>,
}

impl CostFunction for SearchCost<'_> {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, param: &Self::Param) -> Result<Self::Output, argmin::core::Error> {
        let used = self.evaluations.get();
        if used >= self.max_evaluations {
            return Err(OptimizationError::EvaluationBudgetExceeded {
                limit: self.max_evaluations,
            }
            .into());
        }
        self.evaluations.set(used + 1);

        // Score the nearest feasible command, then push the simplex back
        // toward the box in proportion to how far outside it wandered.
        let raw = ControlParams::from_slice(param);
        let feasible = self.problem.bounds.project(&raw);
        let (_, cost) = self
            .problem
            .evaluate(&feasible, self.energy_weight)
            .map_err(OptimizationError::from)?;
        let penalty = BOUND_PENALTY * self.problem.bounds.violation(&raw);

        debug!(
            evaluation = used + 1,
            vx0 = raw.vx0,
            vy0 = raw.vy0,
            position_error = cost.position_error,
            energy_reward = cost.energy_reward,
            penalty,
            "cost evaluated"
        );

        Ok(cost.total + penalty)
    }
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

/// Search the control box for the launch command minimizing
/// `|x - Tx| + |y - Ty| - energy_weight * E` at the end of the flight.
///
/// Nelder-Mead seeded at the initial guess; the box is enforced by
/// projection plus a distance penalty. The search stops with an error if it
/// exhausts `max_evaluations` integrations or `max_iterations` iterations
/// before the simplex converges.
pub fn optimize(
    problem: &TrajectoryProblem,
    config: &OptimizerConfig,
) -> OptimizerResult<OptimizationResult> {
    let evaluations = Cell::new(0);
    run_search(problem, config, &evaluations)
}

fn run_search(
    problem: &TrajectoryProblem,
    config: &OptimizerConfig,
    evaluations: &Cell<usize>,
) -> OptimizerResult<OptimizationResult> {
    problem.validate(config)?;

    let cost = SearchCost {
        problem,
        energy_weight: config.energy_weight,
        max_evaluations: config.max_evaluations,
        evaluations,
    };
    let solver = NelderMead::new(initial_simplex(&problem.initial_guess, &problem.bounds))
        .with_sd_tolerance(config.sd_tolerance)
        .map_err(from_argmin)?;

    let res = Executor::new(cost, solver)
        .configure(|state| state.max_iters(config.max_iterations))
        .run()
        .map_err(from_argmin)?;

    let iterations = res.state.iter;
    let converged = matches!(
        res.state.termination_status,
        TerminationStatus::Terminated(TerminationReason::SolverConverged)
    );
    if !converged {
        return Err(OptimizationError::NotConverged { iterations });
    }

    let best = res
        .state
        .best_param
        .as_deref()
        .map(ControlParams::from_slice)
        .ok_or_else(|| OptimizationError::Minimizer {
            message: "minimizer reported no best parameter".into(),
        })?;
    let control = problem.bounds.project(&best);
    let (trajectory, cost) = problem.evaluate(&control, config.energy_weight)?;

    info!(
        vx0 = control.vx0,
        vy0 = control.vy0,
        cost = cost.total,
        evaluations = evaluations.get(),
        iterations,
        "control search converged"
    );

    Ok(OptimizationResult {
        control,
        cost,
        trajectory,
        evaluations: evaluations.get(),
        iterations,
    })
}

/// Right-angled simplex at `guess`, each edge stepping inward from any
/// bound it would otherwise cross.
fn initial_simplex(guess: &ControlParams, bounds: &ControlBounds) -> Vec<Vec<f64>> {
    let step = |v: f64, bound: &Bound| {
        let s = SIMPLEX_STEP * bound.width();
        if v + s <= bound.hi {
            v + s
        } else {
            v - s
        }
    };
    vec![
        guess.to_vec(),
        vec![step(guess.vx0, &bounds.vx), guess.vy0],
        vec![guess.vx0, step(guess.vy0, &bounds.vy)],
    ]
}

/// Recover our own error from the minimizer's, if that is what it carries.
fn from_argmin(err: argmin::core::Error) -> OptimizationError {
    match err.downcast::<OptimizationError>() {
        Ok(e) => e,
        Err(other) => OptimizationError::Minimizer {
            message: other.to_string(),
        },
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn reference_problem() -> TrajectoryProblem {
        TrajectoryProblem::from_scenario(&ScenarioConfig::default())
    }

    /// Short, coarse scenario that keeps each evaluation cheap.
    fn quick_problem() -> TrajectoryProblem {
        let mut p = reference_problem();
        p.span = TimeSpan::new(0.0, 20.0);
        p.grid = TimeGrid::linspace(0.0, 20.0, 41);
        p
    }

    #[test]
    fn inverted_bounds_rejected_before_any_integration() {
        let mut p = reference_problem();
        p.bounds = ControlBounds::uniform(5.0, 1.0);
        let evaluations = Cell::new(0);
        let err = run_search(&p, &OptimizerConfig::default(), &evaluations).unwrap_err();
        assert!(matches!(err, OptimizationError::InvalidParameters { .. }));
        assert_eq!(evaluations.get(), 0);
    }

    #[test]
    fn guess_outside_box_rejected() {
        let mut p = reference_problem();
        p.initial_guess = ControlParams::new(0.5, 2.0);
        let evaluations = Cell::new(0);
        let err = run_search(&p, &OptimizerConfig::default(), &evaluations).unwrap_err();
        assert!(matches!(err, OptimizationError::InitialGuessOutOfBounds { .. }));
        assert!(err.is_invalid_input());
        assert_eq!(evaluations.get(), 0);
    }

    #[test]
    fn empty_grid_rejected() {
        let mut p = reference_problem();
        p.grid = TimeGrid::linspace(0.0, 50.0, 0);
        let err = optimize(&p, &OptimizerConfig::default()).unwrap_err();
        assert!(matches!(err, OptimizationError::InvalidParameters { .. }));
    }

    #[test]
    fn evaluation_budget_is_enforced() {
        let config = OptimizerConfig {
            max_evaluations: 4,
            ..OptimizerConfig::default()
        };
        let evaluations = Cell::new(0);
        let err = run_search(&quick_problem(), &config, &evaluations).unwrap_err();
        assert!(
            matches!(err, OptimizationError::EvaluationBudgetExceeded { limit: 4 }),
            "unexpected error {err:?}"
        );
        assert_eq!(evaluations.get(), 4);
    }

    #[test]
    fn iteration_cap_without_convergence_is_an_error() {
        let config = OptimizerConfig {
            max_iterations: 2,
            ..OptimizerConfig::default()
        };
        let err = optimize(&quick_problem(), &config).unwrap_err();
        assert!(matches!(err, OptimizationError::NotConverged { .. }));
    }

    #[test]
    fn integration_failure_propagates() {
        let mut p = quick_problem();
        p.solver.max_steps = 2;
        let err = optimize(&p, &OptimizerConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            OptimizationError::Integration(IntegrationError::MaxStepsExceeded { .. })
        ));
    }

    #[test]
    fn simplex_stays_inside_box_at_upper_corner() {
        let b = ControlBounds::default();
        let s = initial_simplex(&ControlParams::new(5.0, 5.0), &b);
        for v in &s {
            assert!(b.contains(&ControlParams::from_slice(v)), "{v:?}");
        }
        assert!((s[1][0] - 4.8).abs() < 1e-12);
        assert_eq!(s[1][1], 5.0);
    }

    #[test]
    fn search_improves_on_initial_guess() {
        let p = quick_problem();
        let config = OptimizerConfig::default();
        let (_, start) = p.evaluate(&p.initial_guess, config.energy_weight).unwrap();
        let result = optimize(&p, &config).unwrap();
        assert!(p.bounds.contains(&result.control));
        assert!(result.cost.total <= start.total + 1e-9);
        assert_eq!(result.trajectory.len(), p.grid.len());
        assert!(result.evaluations > 0);
    }
}
