use thiserror::Error;

/// Failures of a single trajectory integration.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IntegrationError {
    #[error("Invalid parameters: {what}")]
    InvalidParameters { what: String },

    #[error("Step budget exhausted before reaching t1 ({max_steps} steps)")]
    MaxStepsExceeded { max_steps: u64 },

    #[error("Step size {h:e} fell below the minimum at t = {t}")]
    StepSizeTooSmall { t: f64, h: f64 },

    #[error("Non-finite state at t = {t}")]
    NonFiniteState { t: f64 },
}

pub type IntegrationResult<T> = Result<T, IntegrationError>;

/// Failures of a bounded control search.
#[derive(Error, Debug)]
pub enum OptimizationError {
    #[error("Invalid parameters: {what}")]
    InvalidParameters { what: String },

    #[error("Initial guess ({vx0}, {vy0}) lies outside the control bounds")]
    InitialGuessOutOfBounds { vx0: f64, vy0: f64 },

    #[error("Minimizer did not converge within {iterations} iterations")]
    NotConverged { iterations: u64 },

    #[error("Cost evaluation budget of {limit} exhausted")]
    EvaluationBudgetExceeded { limit: usize },

    #[error("Integration failed during search: {0}")]
    Integration(#[from] IntegrationError),

    #[error("Minimizer error: {message}")]
    Minimizer { message: String },
}

impl OptimizationError {
    /// True when the request was rejected before any integration ran.
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            OptimizationError::InvalidParameters { .. }
                | OptimizationError::InitialGuessOutOfBounds { .. }
        )
    }
}

pub type OptimizerResult<T> = Result<T, OptimizationError>;

/// Failures while loading or checking a scenario.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Scenario parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid scenario: {what}")]
    Invalid { what: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Top-level errors of a mission run.
#[derive(Error, Debug)]
pub enum MissionError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Integration error: {0}")]
    Integration(#[from] IntegrationError),

    #[error("Optimization error: {0}")]
    Optimization(#[from] OptimizationError),
}

pub type MissionResult<T> = Result<T, MissionError>;
