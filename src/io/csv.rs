use std::io::{self, Write};

use crate::guidance::Target;
use crate::sim::Trajectory;

/// Write full trajectory samples in CSV format.
///
/// Columns: time, pos_x, pos_y, vel_x, vel_y, energy
pub fn write_trajectory<W: Write>(writer: &mut W, trajectory: &Trajectory) -> io::Result<()> {
    writeln!(writer, "time,pos_x,pos_y,vel_x,vel_y,energy")?;

    for (t, s) in trajectory.samples() {
        writeln!(
            writer,
            "{:.4},{:.4},{:.4},{:.4},{:.4},{:.4}",
            t, s.pos.x, s.pos.y, s.vel.x, s.vel.y, s.energy,
        )?;
    }

    Ok(())
}

/// Write ground tracks for plotting: one `(x, y)` row per sample, tagged
/// with its series label, followed by a single `target` row.
///
/// Columns: series, x, y
pub fn write_paths<W: Write>(
    writer: &mut W,
    series: &[(&str, &Trajectory)],
    target: &Target,
) -> io::Result<()> {
    writeln!(writer, "series,x,y")?;

    for (label, trajectory) in series {
        for (x, y) in trajectory.xy_points() {
            writeln!(writer, "{label},{x:.4},{y:.4}")?;
        }
    }
    writeln!(writer, "target,{:.4},{:.4}", target.x, target.y)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SolverConfig;
    use crate::dynamics::{DisturbanceParams, State};
    use crate::sim::{simulate, TimeGrid, TimeSpan};

    fn short_flight(vy0: f64) -> Trajectory {
        simulate(
            &State::new(0.0, 0.0, 2.0, vy0, 100.0),
            &TimeSpan::new(0.0, 1.0),
            &DisturbanceParams::default(),
            &TimeGrid::linspace(0.0, 1.0, 3),
            &SolverConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn trajectory_csv_has_header_and_rows() {
        let mut buf = Vec::new();
        write_trajectory(&mut buf, &short_flight(2.0)).unwrap();
        let output = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = output.lines().collect();

        assert!(lines[0].starts_with("time,"));
        assert_eq!(lines.len(), 4); // header + 3 samples
        assert_eq!(lines[1], "0.0000,0.0000,0.0000,2.0000,2.0000,100.0000");
    }

    #[test]
    fn paths_list_each_series_then_target() {
        let baseline = short_flight(2.0);
        let optimized = short_flight(1.0);
        let mut buf = Vec::new();
        write_paths(
            &mut buf,
            &[("baseline", &baseline), ("optimized", &optimized)],
            &Target::new(50.0, 20.0),
        )
        .unwrap();
        let output = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = output.lines().collect();

        assert_eq!(lines[0], "series,x,y");
        assert_eq!(lines.len(), 1 + 3 + 3 + 1);
        assert!(lines[1].starts_with("baseline,0.0000,0.0000"));
        assert!(lines[4].starts_with("optimized,"));
        assert_eq!(lines[7], "target,50.0000,20.0000");
    }
}
