use crate::dynamics::State;

/// Solver work counters for one integration call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SolverStats {
    pub fn_evals: u64,
    pub accepted_steps: u64,
    pub rejected_steps: u64,
}

/// Time-sampled states from one integration run.
///
/// Always holds at least one sample, one per requested grid time.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    times: Vec<f64>,
    states: Vec<State>,
    stats: SolverStats,
}

impl Trajectory {
    pub(crate) fn new(times: Vec<f64>, states: Vec<State>, stats: SolverStats) -> Self {
        debug_assert_eq!(times.len(), states.len());
        debug_assert!(!states.is_empty());
        Self {
            times,
            states,
            stats,
        }
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn states(&self) -> &[State] {
        &self.states
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn initial_state(&self) -> &State {
        &self.states[0]
    }

    pub fn final_state(&self) -> &State {
        &self.states[self.states.len() - 1]
    }

    pub fn final_time(&self) -> f64 {
        self.times[self.times.len() - 1]
    }

    pub fn stats(&self) -> SolverStats {
        self.stats
    }

    /// `(t, state)` pairs in time order.
    pub fn samples(&self) -> impl Iterator<Item = (f64, &State)> + '_ {
        self.times.iter().copied().zip(self.states.iter())
    }

    /// Ground track as `(x, y)` pairs, the shape plotting consumers expect.
    pub fn xy_points(&self) -> Vec<(f64, f64)> {
        self.states.iter().map(|s| (s.pos.x, s.pos.y)).collect()
    }

    /// Furthest distance from the launch point reached at any sample.
    pub fn max_range(&self) -> f64 {
        let origin = self.states[0].pos;
        self.states
            .iter()
            .map(|s| (s.pos - origin).norm())
            .fold(0.0_f64, f64::max)
    }

    pub fn energy_used(&self) -> f64 {
        self.initial_state().energy - self.final_state().energy
    }
}
