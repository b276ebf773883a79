use thiserror::Error;

/// Failures raised by trajectory construction, resampling and the error metrics.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IntegrationError {
    #[error("Step size must be positive and finite, got {0}.")]
    InvalidStepSize(f64),

    #[error("Final time {tf} must be greater than initial time {t0}.")]
    InvalidHorizon { t0: f64, tf: f64 },

    #[error("Horizon and step ask for too many steps ({requested}); at most {limit} are stored.")]
    TooManySteps { requested: f64, limit: usize },

    #[error("Invalid parameter {name} = {value}: {reason}.")]
    InvalidParameter {
        name: &'static str,
        value: f64,
        reason: &'static str,
    },

    #[error(
        "Trajectories are sampled on different time grids ({left} samples from t0 = {left_t0} with h = {left_h}, \
         {right} samples from t0 = {right_t0} with h = {right_h}); resample before comparing."
    )]
    GridMismatch {
        left: usize,
        left_t0: f64,
        left_h: f64,
        right: usize,
        right_t0: f64,
        right_h: f64,
    },

    #[error("Invalid source grid: {0}.")]
    InvalidGrid(String),

    #[error("Query time {time} lies outside the source grid [{start}, {end}].")]
    OutOfRange { time: f64, start: f64, end: f64 },

    #[error("Trajectory diverged at step {step} (t = {time}): state magnitude {magnitude} exceeds the sanity limit.")]
    Divergence { step: usize, time: f64, magnitude: f64 },
}

pub type Result<T> = std::result::Result<T, IntegrationError>;
