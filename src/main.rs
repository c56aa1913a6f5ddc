use std::io::{self, Write};

use tracing_subscriber::EnvFilter;
use uav_sim::io::{write_paths, write_summary};
use uav_sim::mission::{self, MissionReport};
use uav_sim::sim::Trajectory;
use uav_sim::types::ScenarioConfig;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let config = ScenarioConfig::default();

    // -----------------------------------------------------------------------
    // Run baseline + control search
    // -----------------------------------------------------------------------
    let report = match mission::run(&config) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("mission failed: {e}");
            std::process::exit(1);
        }
    };

    print_report(&config, &report);

    let mut stdout = io::stdout().lock();
    if let Err(e) = write_summary(&mut stdout, &report) {
        eprintln!("failed to write summary: {e}");
        std::process::exit(1);
    }

    // -----------------------------------------------------------------------
    // Ground tracks + target marker for plotting
    // -----------------------------------------------------------------------
    let written = writeln!(stdout)
        .and_then(|_| write_paths(&mut stdout, &report.flights(), &report.target));
    if let Err(e) = written {
        eprintln!("failed to write paths: {e}");
        std::process::exit(1);
    }
}

fn print_report(config: &ScenarioConfig, report: &MissionReport) {
    println!();
    println!("====================================================================");
    println!("  UAV TRAJECTORY OPTIMIZATION");
    println!("====================================================================");
    println!();
    println!("  Scenario");
    println!("  ──────────────────────────────────────────────────────────────────");
    println!(
        "  Span:          [{:.1}, {:.1}] s   Samples:      {:>6}",
        config.t0, config.t1, config.samples
    );
    println!(
        "  Wind:          {:>8.3} m/s^2  Terrain:      {:>8.3}",
        config.disturbance.wind_speed, config.disturbance.terrain_factor
    );
    println!(
        "  Target:        ({:.1}, {:.1})     Energy E0:    {:>8.1}",
        report.target.x, report.target.y, config.initial_energy
    );
    println!(
        "  Bounds:        vx0 [{}, {}]  vy0 [{}, {}]",
        config.bounds.vx.lo, config.bounds.vx.hi, config.bounds.vy.lo, config.bounds.vy.hi
    );
    println!();

    println!("  Results");
    println!("  ──────────────────────────────────────────────────────────────────");
    println!(
        "  {:<10} {:>7} {:>7} {:>10} {:>10} {:>10} {:>10}",
        "flight", "vx0", "vy0", "x_final", "y_final", "E_final", "cost"
    );
    println!("  {}", "─".repeat(66));
    print_row(
        "BASELINE",
        report.baseline_control.vx0,
        report.baseline_control.vy0,
        &report.baseline,
        report.baseline_cost.total,
    );

    match &report.optimized {
        Ok(o) => {
            print_row("OPTIMIZED", o.control.vx0, o.control.vy0, &o.trajectory, o.cost.total);
            println!();
            println!(
                "  Miss distance: {:>8.2} -> {:.2}   ({} integrations, {} iterations)",
                report.baseline_cost.position_error,
                o.cost.position_error,
                o.evaluations,
                o.iterations
            );
        }
        Err(e) => {
            println!();
            println!("  Search failed: {e}");
        }
    }
    println!("====================================================================");
    println!();
}

fn print_row(label: &str, vx0: f64, vy0: f64, trajectory: &Trajectory, cost: f64) {
    let last = trajectory.final_state();
    println!(
        "  {:<10} {:>7.3} {:>7.3} {:>10.2} {:>10.2} {:>10.2} {:>10.3}",
        label, vx0, vy0, last.pos.x, last.pos.y, last.energy, cost
    );
}
