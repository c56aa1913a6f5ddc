use nalgebra::SVector;
use tracing::trace;

use crate::config::SolverConfig;
use crate::error::{IntegrationError, IntegrationResult};

use super::grid::{TimeGrid, TimeSpan};
use super::trajectory::SolverStats;

/// Right-hand side of an autonomous or time-dependent ODE system dy/dt = f(t, y).
pub trait OdeSystem<const N: usize> {
    fn rhs(&self, t: f64, y: &SVector<f64, N>) -> SVector<f64, N>;
}

// ---------------------------------------------------------------------------
// Dormand-Prince 5(4) tableau
// ---------------------------------------------------------------------------

const C: [f64; 7] = [0.0, 1.0 / 5.0, 3.0 / 10.0, 4.0 / 5.0, 8.0 / 9.0, 1.0, 1.0];

const A2: [f64; 1] = [1.0 / 5.0];
const A3: [f64; 2] = [3.0 / 40.0, 9.0 / 40.0];
const A4: [f64; 3] = [44.0 / 45.0, -56.0 / 15.0, 32.0 / 9.0];
const A5: [f64; 4] = [
    19372.0 / 6561.0,
    -25360.0 / 2187.0,
    64448.0 / 6561.0,
    -212.0 / 729.0,
];
const A6: [f64; 5] = [
    9017.0 / 3168.0,
    -355.0 / 33.0,
    46732.0 / 5247.0,
    49.0 / 176.0,
    -5103.0 / 18656.0,
];

// 5th-order weights; also the 7th stage row (FSAL)
const B: [f64; 6] = [
    35.0 / 384.0,
    0.0,
    500.0 / 1113.0,
    125.0 / 192.0,
    -2187.0 / 6784.0,
    11.0 / 84.0,
];

// b - b_hat: difference between the 5th and embedded 4th order weights
const E: [f64; 7] = [
    71.0 / 57600.0,
    0.0,
    -71.0 / 16695.0,
    71.0 / 1920.0,
    -17253.0 / 339200.0,
    22.0 / 525.0,
    -1.0 / 40.0,
];

/// Order of the embedded error estimate.
const ERROR_ORDER: f64 = 4.0;

// ---------------------------------------------------------------------------
// Step-size control
// ---------------------------------------------------------------------------

/// I-controller: h_new = safety * h * err^(-1/(q+1)), clamped per step.
#[derive(Debug, Clone, Copy)]
pub struct StepController {
    pub safety: f64,
    pub max_factor: f64,
    pub min_factor: f64,
    exponent: f64,
}

impl Default for StepController {
    fn default() -> Self {
        Self {
            safety: 0.9,
            max_factor: 5.0,
            min_factor: 0.2,
            exponent: 1.0 / (ERROR_ORDER + 1.0),
        }
    }
}

impl StepController {
    pub fn factor(&self, error: f64) -> f64 {
        if error == 0.0 {
            return self.max_factor;
        }
        if !error.is_finite() {
            return self.min_factor;
        }
        let factor = self.safety * error.powf(-self.exponent);
        if error > 1.0 {
            // never grow after a rejection
            factor.clamp(self.min_factor, 1.0)
        } else {
            factor.clamp(self.min_factor, self.max_factor)
        }
    }
}

// ---------------------------------------------------------------------------
// Single embedded step
// ---------------------------------------------------------------------------

/// Outcome of one trial step of size h.
#[derive(Debug, Clone)]
pub struct StepResult<const N: usize> {
    /// 5th-order solution at t + h
    pub y: SVector<f64, N>,
    /// f(t + h, y), reused as the first stage of the next step
    pub f: SVector<f64, N>,
    /// Scaled RMS error estimate; <= 1 means the step meets tolerance
    pub error: f64,
}

/// One Dormand-Prince trial step. `f0` must be `sys.rhs(t, y)`.
pub fn dopri_step<S, const N: usize>(
    sys: &S,
    t: f64,
    y: &SVector<f64, N>,
    f0: &SVector<f64, N>,
    h: f64,
    rtol: f64,
    atol: f64,
) -> StepResult<N>
where
    S: OdeSystem<N>,
{
    let k1 = *f0;
    let k2 = sys.rhs(t + C[1] * h, &(y + k1 * (h * A2[0])));
    let k3 = sys.rhs(t + C[2] * h, &(y + (k1 * A3[0] + k2 * A3[1]) * h));
    let k4 = sys.rhs(
        t + C[3] * h,
        &(y + (k1 * A4[0] + k2 * A4[1] + k3 * A4[2]) * h),
    );
    let k5 = sys.rhs(
        t + C[4] * h,
        &(y + (k1 * A5[0] + k2 * A5[1] + k3 * A5[2] + k4 * A5[3]) * h),
    );
    let k6 = sys.rhs(
        t + C[5] * h,
        &(y + (k1 * A6[0] + k2 * A6[1] + k3 * A6[2] + k4 * A6[3] + k5 * A6[4]) * h),
    );

    let y_new = y + (k1 * B[0] + k3 * B[2] + k4 * B[3] + k5 * B[4] + k6 * B[5]) * h;
    let k7 = sys.rhs(t + C[6] * h, &y_new);

    let err_vec =
        (k1 * E[0] + k3 * E[2] + k4 * E[3] + k5 * E[4] + k6 * E[5] + k7 * E[6]) * h;

    let mut sum_sq = 0.0;
    for i in 0..N {
        let scale = atol + rtol * y[i].abs().max(y_new[i].abs());
        let e = err_vec[i] / scale;
        sum_sq += e * e;
    }

    StepResult {
        y: y_new,
        f: k7,
        error: (sum_sq / N as f64).sqrt(),
    }
}

// ---------------------------------------------------------------------------
// Adaptive integrator
// ---------------------------------------------------------------------------

/// Adaptive Dormand-Prince 5(4) initial-value solver.
#[derive(Debug, Clone, Copy)]
pub struct DormandPrince {
    pub config: SolverConfig,
    pub controller: StepController,
}

impl DormandPrince {
    pub fn new(config: SolverConfig) -> Self {
        Self {
            config,
            controller: StepController::default(),
        }
    }

    /// Integrate over `span`, reporting the state at every grid time.
    ///
    /// Steps are shortened to land exactly on each grid time, and
    /// integration always continues to `span.t1` even past the last sample,
    /// so a failure anywhere in the span is reported.
    pub fn solve<S, const N: usize>(
        &self,
        sys: &S,
        span: &TimeSpan,
        y0: &SVector<f64, N>,
        grid: &TimeGrid,
    ) -> IntegrationResult<(Vec<SVector<f64, N>>, SolverStats)>
    where
        S: OdeSystem<N>,
    {
        span.check()?;
        grid.check_within(span)?;
        self.check_config()?;
        if let Some(i) = y0.iter().position(|v| !v.is_finite()) {
            return Err(IntegrationError::InvalidParameters {
                what: format!("initial state component #{i} is not finite"),
            });
        }

        let f0 = sys.rhs(span.t0, y0);
        let mut stats = SolverStats {
            fn_evals: 1,
            ..SolverStats::default()
        };
        let h0 = if span.is_degenerate() {
            0.0
        } else {
            stats.fn_evals += 1;
            self.initial_step(sys, span, y0, &f0)
        };

        let mut cursor = Cursor {
            t: span.t0,
            y: *y0,
            f: f0,
            h: h0,
            attempts: 0,
            stats,
        };

        let mut out = Vec::with_capacity(grid.len());
        for &t_out in grid.times() {
            cursor.advance_to(self, sys, t_out)?;
            out.push(cursor.y);
        }
        cursor.advance_to(self, sys, span.t1)?;

        trace!(
            t0 = span.t0,
            t1 = span.t1,
            samples = out.len(),
            accepted = cursor.stats.accepted_steps,
            rejected = cursor.stats.rejected_steps,
            fn_evals = cursor.stats.fn_evals,
            "integration complete"
        );

        Ok((out, cursor.stats))
    }

    fn check_config(&self) -> IntegrationResult<()> {
        let c = &self.config;
        let ok = c.rtol.is_finite()
            && c.rtol >= 0.0
            && c.atol.is_finite()
            && c.atol > 0.0
            && c.h_min.is_finite()
            && c.h_min > 0.0
            && c.h_max.map_or(true, |h| h > c.h_min)
            && c.max_steps > 0;
        if ok {
            Ok(())
        } else {
            Err(IntegrationError::InvalidParameters {
                what: format!("solver settings out of range: {c:?}"),
            })
        }
    }

    fn h_max(&self, span: &TimeSpan) -> f64 {
        self.config.h_max.unwrap_or(f64::INFINITY).min(span.duration())
    }

    /// Starting step from the size of y0, f0 and a trial Euler step
    /// (Hairer, Norsett & Wanner, Solving ODEs I, II.4).
    fn initial_step<S, const N: usize>(
        &self,
        sys: &S,
        span: &TimeSpan,
        y0: &SVector<f64, N>,
        f0: &SVector<f64, N>,
    ) -> f64
    where
        S: OdeSystem<N>,
    {
        let (rtol, atol) = (self.config.rtol, self.config.atol);
        let scale = y0.map(|v| atol + rtol * v.abs());
        let rms = |v: &SVector<f64, N>| (v.component_div(&scale).norm_squared() / N as f64).sqrt();

        let d0 = rms(y0);
        let d1 = rms(f0);
        let h0 = if d0 < 1e-5 || d1 < 1e-5 {
            1e-6
        } else {
            0.01 * d0 / d1
        };

        let y1 = y0 + f0 * h0;
        let f1 = sys.rhs(span.t0 + h0, &y1);
        let d2 = rms(&(f1 - f0)) / h0;

        let h1 = if d1 <= 1e-15 && d2 <= 1e-15 {
            (h0 * 1e-3).max(1e-6)
        } else {
            (0.01 / d1.max(d2)).powf(1.0 / (ERROR_ORDER + 1.0))
        };

        (100.0 * h0).min(h1).min(self.h_max(span)).max(self.config.h_min)
    }
}

/// Mutable progress of one `solve` call.
struct Cursor<const N: usize> {
    t: f64,
    y: SVector<f64, N>,
    f: SVector<f64, N>,
    h: f64,
    attempts: u64,
    stats: SolverStats,
}

impl<const N: usize> Cursor<N> {
    fn advance_to<S>(&mut self, solver: &DormandPrince, sys: &S, target: f64) -> IntegrationResult<()>
    where
        S: OdeSystem<N>,
    {
        let cfg = &solver.config;
        while self.t < target {
            let remaining = target - self.t;
            let lands = self.h >= remaining;
            let h = if lands { remaining } else { self.h };

            let step = dopri_step(sys, self.t, &self.y, &self.f, h, cfg.rtol, cfg.atol);
            self.stats.fn_evals += 6;
            self.attempts += 1;
            if self.attempts > cfg.max_steps {
                return Err(IntegrationError::MaxStepsExceeded {
                    max_steps: cfg.max_steps,
                });
            }

            let factor = solver.controller.factor(step.error);
            if step.error <= 1.0 {
                if step.y.iter().any(|v| !v.is_finite()) {
                    return Err(IntegrationError::NonFiniteState { t: self.t + h });
                }
                self.t = if lands { target } else { self.t + h };
                self.y = step.y;
                self.f = step.f;
                self.stats.accepted_steps += 1;
                // a step cut short to hit the target says nothing about the
                // step the controller would otherwise have taken
                self.h = if lands { self.h.max(h * factor) } else { h * factor };
            } else {
                self.stats.rejected_steps += 1;
                self.h = h * factor;
                if self.h < cfg.h_min {
                    return Err(IntegrationError::StepSizeTooSmall { t: self.t, h: self.h });
                }
            }
            if let Some(h_max) = cfg.h_max {
                self.h = self.h.min(h_max);
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Vector1, Vector2};

    /// dv/dt = -c v + w, closed form v(t) = w/c + (v0 - w/c) e^{-ct}
    struct DampedDrift {
        c: f64,
        w: f64,
    }

    impl OdeSystem<1> for DampedDrift {
        fn rhs(&self, _t: f64, y: &Vector1<f64>) -> Vector1<f64> {
            Vector1::new(-self.c * y[0] + self.w)
        }
    }

    struct Oscillator;

    impl OdeSystem<2> for Oscillator {
        fn rhs(&self, _t: f64, y: &Vector2<f64>) -> Vector2<f64> {
            Vector2::new(y[1], -y[0])
        }
    }

    /// dy/dt = y^2 blows up at t = 1 for y(0) = 1
    struct Blowup;

    impl OdeSystem<1> for Blowup {
        fn rhs(&self, _t: f64, y: &Vector1<f64>) -> Vector1<f64> {
            Vector1::new(y[0] * y[0])
        }
    }

    fn tight() -> SolverConfig {
        SolverConfig {
            rtol: 1e-9,
            atol: 1e-12,
            ..SolverConfig::default()
        }
    }

    #[test]
    fn controller_grows_on_small_error_and_shrinks_on_large() {
        let c = StepController::default();
        assert_eq!(c.factor(0.0), c.max_factor);
        assert!(c.factor(1e-3) > 1.0);
        assert!(c.factor(10.0) < 1.0);
        assert!(c.factor(1e12) >= c.min_factor);
    }

    #[test]
    fn single_step_is_fifth_order_accurate() {
        let sys = Oscillator;
        let y = Vector2::new(1.0, 0.0);
        let f = sys.rhs(0.0, &y);
        let step = dopri_step(&sys, 0.0, &y, &f, 0.1, 1e-6, 1e-9);
        assert!((step.y[0] - 0.1_f64.cos()).abs() < 1e-7);
        assert!((step.y[1] + 0.1_f64.sin()).abs() < 1e-7);
        assert_eq!(step.f, sys.rhs(0.1, &step.y));
    }

    #[test]
    fn matches_closed_form_damped_drift() {
        let sys = DampedDrift { c: 0.01, w: 0.5 };
        let grid = TimeGrid::linspace(0.0, 50.0, 11);
        let (ys, stats) = DormandPrince::new(tight())
            .solve(&sys, &TimeSpan::new(0.0, 50.0), &Vector1::new(2.0), &grid)
            .unwrap();
        assert_eq!(ys.len(), 11);
        for (t, y) in grid.times().iter().zip(&ys) {
            let exact = 50.0 + (2.0 - 50.0) * (-0.01 * t).exp();
            assert!((y[0] - exact).abs() < 1e-6, "t={t}: {} vs {exact}", y[0]);
        }
        assert!(stats.accepted_steps >= 10);
    }

    #[test]
    fn oscillator_keeps_phase_over_several_periods() {
        let grid = TimeGrid::linspace(0.0, 20.0, 201);
        let (ys, _) = DormandPrince::new(tight())
            .solve(&Oscillator, &TimeSpan::new(0.0, 20.0), &Vector2::new(1.0, 0.0), &grid)
            .unwrap();
        let last = ys.last().unwrap();
        assert!((last[0] - 20.0_f64.cos()).abs() < 1e-6);
    }

    #[test]
    fn first_sample_is_initial_state() {
        let grid = TimeGrid::linspace(0.0, 1.0, 5);
        let y0 = Vector2::new(0.3, -0.7);
        let (ys, _) = DormandPrince::new(SolverConfig::default())
            .solve(&Oscillator, &TimeSpan::new(0.0, 1.0), &y0, &grid)
            .unwrap();
        assert_eq!(ys[0], y0);
    }

    #[test]
    fn degenerate_span_returns_initial_state() {
        let grid = TimeGrid::linspace(2.0, 2.0, 1);
        let y0 = Vector2::new(1.0, 2.0);
        let (ys, stats) = DormandPrince::new(SolverConfig::default())
            .solve(&Oscillator, &TimeSpan::new(2.0, 2.0), &y0, &grid)
            .unwrap();
        assert_eq!(ys, vec![y0]);
        assert_eq!(stats.accepted_steps, 0);
    }

    #[test]
    fn step_budget_exhaustion_is_an_error() {
        let cfg = SolverConfig {
            max_steps: 3,
            ..SolverConfig::default()
        };
        let grid = TimeGrid::linspace(0.0, 50.0, 500);
        let err = DormandPrince::new(cfg)
            .solve(&Oscillator, &TimeSpan::new(0.0, 50.0), &Vector2::new(1.0, 0.0), &grid)
            .unwrap_err();
        assert_eq!(err, IntegrationError::MaxStepsExceeded { max_steps: 3 });
    }

    #[test]
    fn finite_time_blowup_fails_instead_of_truncating() {
        let grid = TimeGrid::linspace(0.0, 2.0, 3);
        let err = DormandPrince::new(SolverConfig::default())
            .solve(&Blowup, &TimeSpan::new(0.0, 2.0), &Vector1::new(1.0), &grid)
            .unwrap_err();
        assert!(
            matches!(
                err,
                IntegrationError::StepSizeTooSmall { .. }
                    | IntegrationError::MaxStepsExceeded { .. }
                    | IntegrationError::NonFiniteState { .. }
            ),
            "unexpected error {err:?}"
        );
    }

    #[test]
    fn samples_past_grid_still_integrate_to_span_end() {
        // grid stops at t = 0.5 but the blow-up at t = 1 lies inside the span
        let grid = TimeGrid::new(vec![0.0, 0.5]).unwrap();
        let result = DormandPrince::new(SolverConfig::default()).solve(
            &Blowup,
            &TimeSpan::new(0.0, 2.0),
            &Vector1::new(1.0),
            &grid,
        );
        assert!(result.is_err());
    }

    #[test]
    fn rejects_non_finite_initial_state() {
        let grid = TimeGrid::linspace(0.0, 1.0, 2);
        let err = DormandPrince::new(SolverConfig::default())
            .solve(&Oscillator, &TimeSpan::new(0.0, 1.0), &Vector2::new(f64::NAN, 0.0), &grid)
            .unwrap_err();
        assert!(matches!(err, IntegrationError::InvalidParameters { .. }));
    }

    #[test]
    fn rejects_bad_tolerances() {
        let cfg = SolverConfig {
            atol: 0.0,
            ..SolverConfig::default()
        };
        let grid = TimeGrid::linspace(0.0, 1.0, 2);
        let err = DormandPrince::new(cfg)
            .solve(&Oscillator, &TimeSpan::new(0.0, 1.0), &Vector2::new(1.0, 0.0), &grid)
            .unwrap_err();
        assert!(matches!(err, IntegrationError::InvalidParameters { .. }));
    }
}
