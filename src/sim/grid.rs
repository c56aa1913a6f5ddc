use crate::error::{IntegrationError, IntegrationResult};

// ---------------------------------------------------------------------------
// Integration span
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeSpan {
    pub t0: f64,
    pub t1: f64,
}

impl TimeSpan {
    pub fn new(t0: f64, t1: f64) -> Self {
        Self { t0, t1 }
    }

    pub fn duration(&self) -> f64 {
        self.t1 - self.t0
    }

    pub fn is_degenerate(&self) -> bool {
        self.t0 == self.t1
    }

    pub(crate) fn check(&self) -> IntegrationResult<()> {
        if !self.t0.is_finite() || !self.t1.is_finite() {
            return Err(invalid(format!("span [{}, {}] is not finite", self.t0, self.t1)));
        }
        if self.t1 < self.t0 {
            return Err(invalid(format!("span [{}, {}] runs backwards", self.t0, self.t1)));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Evaluation grid
// ---------------------------------------------------------------------------

/// Strictly increasing sample times at which a trajectory is reported.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeGrid {
    times: Vec<f64>,
}

impl TimeGrid {
    /// Build a grid from explicit times, rejecting empty, non-finite or
    /// non-increasing input.
    pub fn new(times: Vec<f64>) -> IntegrationResult<Self> {
        let grid = Self { times };
        grid.check_shape()?;
        Ok(grid)
    }

    /// `n` evenly spaced samples covering `[t0, t1]`, both ends included.
    pub fn linspace(t0: f64, t1: f64, n: usize) -> Self {
        let times = match n {
            0 => Vec::new(),
            1 => vec![t0],
            _ => {
                let last = (n - 1) as f64;
                let mut times: Vec<f64> = (0..n)
                    .map(|i| t0 + (t1 - t0) * (i as f64 / last))
                    .collect();
                times[n - 1] = t1;
                times
            }
        };
        Self { times }
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    fn check_shape(&self) -> IntegrationResult<()> {
        if self.times.is_empty() {
            return Err(invalid("evaluation grid is empty".into()));
        }
        if let Some(i) = self.times.iter().position(|t| !t.is_finite()) {
            return Err(invalid(format!("grid time #{i} is not finite")));
        }
        if let Some(i) = self.times.windows(2).position(|w| w[1] <= w[0]) {
            return Err(invalid(format!(
                "grid is not strictly increasing at #{}: {} -> {}",
                i + 1,
                self.times[i],
                self.times[i + 1]
            )));
        }
        Ok(())
    }

    /// Full check against the span the grid will be sampled from.
    pub(crate) fn check_within(&self, span: &TimeSpan) -> IntegrationResult<()> {
        self.check_shape()?;
        let first = self.times[0];
        let last = self.times[self.times.len() - 1];
        if first < span.t0 || last > span.t1 {
            return Err(invalid(format!(
                "grid [{first}, {last}] leaves span [{}, {}]",
                span.t0, span.t1
            )));
        }
        Ok(())
    }
}

fn invalid(what: String) -> IntegrationError {
    IntegrationError::InvalidParameters { what }
}
