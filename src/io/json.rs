use std::io::Write;

use serde::Serialize;

use crate::guidance::{ControlParams, CostBreakdown, Target};
use crate::mission::MissionReport;
use crate::sim::Trajectory;

/// Summary statistics computed from one flight.
#[derive(Debug, Clone, Serialize)]
pub struct FlightSummary {
    pub final_x: f64,
    pub final_y: f64,
    pub final_energy: f64,
    pub energy_used: f64,
    pub max_speed: f64,
    pub max_altitude: f64,
    pub max_range: f64,
    pub flight_time: f64,
    pub samples: usize,
    pub accepted_steps: u64,
    pub rejected_steps: u64,
}

impl FlightSummary {
    pub fn from_trajectory(trajectory: &Trajectory) -> Self {
        let last = trajectory.final_state();
        let stats = trajectory.stats();

        let max_speed = trajectory
            .states()
            .iter()
            .map(|s| s.speed())
            .fold(0.0_f64, f64::max);

        let max_altitude = trajectory
            .states()
            .iter()
            .map(|s| s.pos.y)
            .fold(f64::NEG_INFINITY, f64::max);

        FlightSummary {
            final_x: last.pos.x,
            final_y: last.pos.y,
            final_energy: last.energy,
            energy_used: trajectory.energy_used(),
            max_speed,
            max_altitude,
            max_range: trajectory.max_range(),
            flight_time: trajectory.final_time() - trajectory.times()[0],
            samples: trajectory.len(),
            accepted_steps: stats.accepted_steps,
            rejected_steps: stats.rejected_steps,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FlightRecord {
    pub control: ControlParams,
    pub cost: CostBreakdown,
    pub flight: FlightSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct MissionSummary {
    pub target: Target,
    pub baseline: FlightRecord,
    pub optimized: Option<FlightRecord>,
    pub evaluations: Option<usize>,
    pub error: Option<String>,
}

impl MissionSummary {
    pub fn from_report(report: &MissionReport) -> Self {
        let baseline = FlightRecord {
            control: report.baseline_control,
            cost: report.baseline_cost,
            flight: FlightSummary::from_trajectory(&report.baseline),
        };
        match &report.optimized {
            Ok(o) => MissionSummary {
                target: report.target,
                baseline,
                optimized: Some(FlightRecord {
                    control: o.control,
                    cost: o.cost,
                    flight: FlightSummary::from_trajectory(&o.trajectory),
                }),
                evaluations: Some(o.evaluations),
                error: None,
            },
            Err(e) => MissionSummary {
                target: report.target,
                baseline,
                optimized: None,
                evaluations: None,
                error: Some(e.to_string()),
            },
        }
    }
}

/// Write the mission summary as pretty JSON.
pub fn write_summary<W: Write>(writer: &mut W, report: &MissionReport) -> serde_json::Result<()> {
    serde_json::to_writer_pretty(&mut *writer, &MissionSummary::from_report(report))?;
    writeln!(writer).map_err(serde_json::Error::io)
}
