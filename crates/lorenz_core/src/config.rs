use crate::error::{IntegrationError, Result};
use crate::lorenz::{LorenzParams, State};
use crate::solvers::Method;
use crate::trajectory::{TimeGrid, TrajectoryBuilder, DEFAULT_DIVERGENCE_LIMIT};
use serde::{Deserialize, Serialize};

/// Inputs shared by every study.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub params: LorenzParams,
    pub t0: f64,
    pub tf: f64,
    pub h: f64,
    /// Step of the RK4 reference used by the global error comparison.
    pub reference_step: f64,
    /// Defaults to [`LorenzParams::reference_initial_state`] when absent.
    pub initial_state: Option<[f64; 3]>,
    pub perturbation: [f64; 3],
    /// `None` turns the divergence guard off.
    pub divergence_limit: Option<f64>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            params: LorenzParams::classical(),
            t0: 0.0,
            tf: 10.0,
            h: 1e-3,
            reference_step: 1e-4,
            initial_state: None,
            perturbation: [0.01; 3],
            divergence_limit: Some(DEFAULT_DIVERGENCE_LIMIT),
        }
    }
}

impl RunConfig {
    /// Trajectory plot of the three methods side by side.
    pub fn attractor() -> Self {
        Self::default()
    }

    pub fn global_error() -> Self {
        Self::default()
    }

    pub fn perturbation() -> Self {
        Self {
            tf: 50.0,
            ..Self::default()
        }
    }

    pub fn residual() -> Self {
        Self {
            tf: 100.0,
            h: 0.01,
            ..Self::default()
        }
    }

    pub fn initial_state(&self) -> State {
        match self.initial_state {
            Some([x, y, z]) => State::new(x, y, z),
            None => self.params.reference_initial_state(),
        }
    }

    pub fn perturbation_offset(&self) -> State {
        State::from(self.perturbation)
    }

    pub fn grid(&self) -> Result<TimeGrid> {
        TimeGrid::new(self.t0, self.tf, self.h)
    }

    /// Grid of the refined reference run. It ends at the last coarse node rather than
    /// at `tf`, so coarse runs can be resampled onto it without extrapolating.
    pub fn reference_grid(&self) -> Result<TimeGrid> {
        TimeGrid::new(self.t0, self.grid()?.t_final(), self.reference_step)
    }

    pub fn builder(&self, method: Method) -> TrajectoryBuilder {
        TrajectoryBuilder::new(method, self.params).divergence_limit(self.divergence_limit)
    }

    pub fn validate(&self) -> Result<()> {
        self.params.validate()?;
        self.grid()?;
        let state = self.initial_state();
        if let Some(value) = state.iter().copied().find(|v| !v.is_finite()) {
            return Err(IntegrationError::InvalidParameter {
                name: "initial_state",
                value,
                reason: "must be finite",
            });
        }
        if let Some(value) = self.perturbation.iter().copied().find(|v| !v.is_finite()) {
            return Err(IntegrationError::InvalidParameter {
                name: "perturbation",
                value,
                reason: "must be finite",
            });
        }
        if let Some(limit) = self.divergence_limit {
            if !(limit > 0.0) {
                return Err(IntegrationError::InvalidParameter {
                    name: "divergence_limit",
                    value: limit,
                    reason: "must be positive",
                });
            }
        }
        Ok(())
    }
}
