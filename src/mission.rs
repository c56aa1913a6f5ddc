use tracing::{info, warn};

use crate::config::ScenarioConfig;
use crate::error::{MissionResult, OptimizationError};
use crate::guidance::{optimize, ControlParams, CostBreakdown, OptimizationResult, Target, TrajectoryProblem};
use crate::sim::Trajectory;

/// Baseline and optimized flights for one scenario.
///
/// The baseline never depends on the search: a failed search leaves it
/// intact and is reported in `optimized`.
#[derive(Debug)]
pub struct MissionReport {
    pub target: Target,
    pub baseline_control: ControlParams,
    pub baseline: Trajectory,
    pub baseline_cost: CostBreakdown,
    pub optimized: Result<OptimizationResult, OptimizationError>,
}

impl MissionReport {
    /// Reduction in L1 miss distance achieved by the search, if it succeeded.
    pub fn position_gain(&self) -> Option<f64> {
        self.optimized
            .as_ref()
            .ok()
            .map(|o| self.baseline_cost.position_error - o.cost.position_error)
    }

    /// Labelled ground tracks for plotting; the optimized flight is omitted
    /// when the search failed.
    pub fn flights(&self) -> Vec<(&'static str, &Trajectory)> {
        let mut flights = vec![("baseline", &self.baseline)];
        if let Ok(o) = &self.optimized {
            flights.push(("optimized", &o.trajectory));
        }
        flights
    }
}

/// Fly the baseline command, then search for a better one.
///
/// Only an invalid scenario or a failed baseline integration is an error
/// here; search failures are carried in the report.
pub fn run(config: &ScenarioConfig) -> MissionResult<MissionReport> {
    config.validate()?;

    let problem = TrajectoryProblem::from_scenario(config);
    let (baseline, baseline_cost) =
        problem.evaluate(&config.baseline_control, config.optimizer.energy_weight)?;
    info!(
        x = baseline.final_state().pos.x,
        y = baseline.final_state().pos.y,
        energy = baseline.final_state().energy,
        cost = baseline_cost.total,
        "baseline flight complete"
    );

    let optimized = optimize(&problem, &config.optimizer);
    if let Err(e) = &optimized {
        warn!(error = %e, "control search failed; baseline retained");
    }

    Ok(MissionReport {
        target: config.target,
        baseline_control: config.baseline_control,
        baseline,
        baseline_cost,
        optimized,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OptimizerConfig;
    use crate::error::MissionError;
    use crate::guidance::ControlBounds;
    use crate::io::write_paths;

    #[test]
    fn failed_search_keeps_baseline() {
        let config = ScenarioConfig {
            optimizer: OptimizerConfig {
                max_evaluations: 2,
                ..OptimizerConfig::default()
            },
            ..ScenarioConfig::default()
        };
        let report = run(&config).unwrap();
        assert_eq!(report.baseline.len(), 500);
        assert!(matches!(
            report.optimized,
            Err(OptimizationError::EvaluationBudgetExceeded { limit: 2 })
        ));
        assert!(report.position_gain().is_none());

        let flights = report.flights();
        assert_eq!(flights.len(), 1);
        assert_eq!(flights[0].0, "baseline");

        let mut buf = Vec::new();
        write_paths(&mut buf, &flights, &report.target).unwrap();
        let output = String::from_utf8(buf).unwrap();
        assert_eq!(output.lines().count(), 1 + 500 + 1);
        assert!(!output.contains("optimized,"));
        assert_eq!(output.lines().last(), Some("target,50.0000,20.0000"));
    }

    #[test]
    fn invalid_scenario_is_rejected_up_front() {
        let config = ScenarioConfig {
            bounds: ControlBounds::uniform(5.0, 1.0),
            ..ScenarioConfig::default()
        };
        assert!(matches!(run(&config), Err(MissionError::Config(_))));
    }
}
