//! Fixed-step trajectory construction.

use crate::error::{IntegrationError, Result};
use crate::lorenz::{LorenzParams, State};
use crate::solvers::Method;
use crate::traits::OneStep;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Relative slack used when snapping `(tf - t0) / h` to an integer step count.
const STEP_COUNT_SNAP: f64 = 1e-9;

/// Default sanity limit on `|coordinate|`. The Lorenz attractor lives well inside it.
pub const DEFAULT_DIVERGENCE_LIMIT: f64 = 1e6;

/// Largest step count a grid may hold. Every sample is stored, so this caps a single
/// trajectory at a few gigabytes.
pub const MAX_STEPS: usize = 100_000_000;

/// A uniform time grid `t_i = t0 + i h` for `i` in `0..=num_steps`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeGrid {
    pub t0: f64,
    pub h: f64,
    pub num_steps: usize,
}

impl TimeGrid {
    /// Builds the grid covering `[t0, tf]` with `floor((tf - t0) / h)` steps.
    pub fn new(t0: f64, tf: f64, h: f64) -> Result<Self> {
        validate_step(h)?;
        if !t0.is_finite() || !tf.is_finite() || tf <= t0 {
            return Err(IntegrationError::InvalidHorizon { t0, tf });
        }
        let ratio = (tf - t0) / h;
        let nearest = ratio.round();
        let steps = if (ratio - nearest).abs() <= STEP_COUNT_SNAP * nearest.max(1.0) {
            nearest
        } else {
            ratio.floor()
        };
        // Also rejects an infinite ratio from a subnormal step.
        if !(steps <= MAX_STEPS as f64) {
            return Err(IntegrationError::TooManySteps {
                requested: ratio,
                limit: MAX_STEPS,
            });
        }
        Ok(Self {
            t0,
            h,
            num_steps: steps as usize,
        })
    }

    pub fn from_steps(t0: f64, h: f64, num_steps: usize) -> Result<Self> {
        let grid = Self { t0, h, num_steps };
        grid.validate()?;
        Ok(grid)
    }

    /// Checks a grid that did not come through a constructor, e.g. one deserialised
    /// or assembled field by field.
    pub fn validate(&self) -> Result<()> {
        validate_step(self.h)?;
        if !self.t0.is_finite() {
            return Err(IntegrationError::InvalidHorizon {
                t0: self.t0,
                tf: self.t0,
            });
        }
        if self.num_steps > MAX_STEPS {
            return Err(IntegrationError::TooManySteps {
                requested: self.num_steps as f64,
                limit: MAX_STEPS,
            });
        }
        Ok(())
    }

    /// Number of samples, `num_steps + 1`.
    pub fn len(&self) -> usize {
        self.num_steps.saturating_add(1)
    }

    /// Always false: a grid holds at least its starting instant.
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn time(&self, index: usize) -> f64 {
        self.t0 + index as f64 * self.h
    }

    pub fn t_final(&self) -> f64 {
        self.time(self.num_steps)
    }

    pub fn times(&self) -> Vec<f64> {
        (0..self.len()).map(|i| self.time(i)).collect()
    }

    /// Whether two grids sample the same instants, up to round-off in `t0` and `h`.
    pub fn matches(&self, other: &TimeGrid) -> bool {
        let scale = self.h.abs().max(other.h.abs());
        self.num_steps == other.num_steps
            && (self.t0 - other.t0).abs() <= 1e-12 * (1.0 + self.t0.abs())
            && (self.h - other.h).abs() <= 1e-12 * scale
    }

    pub(crate) fn ensure_matches(&self, other: &TimeGrid) -> Result<()> {
        if self.matches(other) {
            Ok(())
        } else {
            Err(IntegrationError::GridMismatch {
                left: self.len(),
                left_t0: self.t0,
                left_h: self.h,
                right: other.len(),
                right_t0: other.t0,
                right_h: other.h,
            })
        }
    }
}

fn validate_step(h: f64) -> Result<()> {
    if h.is_finite() && h > 0.0 {
        Ok(())
    } else {
        Err(IntegrationError::InvalidStepSize(h))
    }
}

/// The states visited by a fixed-step integration, one per grid point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trajectory {
    grid: TimeGrid,
    states: Vec<State>,
}

impl Trajectory {
    /// Pairs states with a grid; the lengths must agree.
    pub fn new(grid: TimeGrid, states: Vec<State>) -> Result<Self> {
        if states.len() != grid.len() {
            return Err(IntegrationError::InvalidGrid(format!(
                "grid has {} samples but {} states were supplied",
                grid.len(),
                states.len()
            )));
        }
        Ok(Self { grid, states })
    }

    pub fn grid(&self) -> &TimeGrid {
        &self.grid
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

    pub fn initial(&self) -> &State {
        &self.states[0]
    }

    pub fn last(&self) -> &State {
        &self.states[self.states.len() - 1]
    }

    pub fn times(&self) -> Vec<f64> {
        self.grid.times()
    }

    /// Iterates `(t_i, state_i)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (f64, &State)> + '_ {
        self.states
            .iter()
            .enumerate()
            .map(move |(i, s)| (self.grid.time(i), s))
    }

    pub fn into_states(self) -> Vec<State> {
        self.states
    }
}

/// Drives a [`Method`] over a uniform grid.
#[derive(Debug, Clone, Copy)]
pub struct TrajectoryBuilder {
    method: Method,
    params: LorenzParams,
    divergence_limit: Option<f64>,
}

impl TrajectoryBuilder {
    pub fn new(method: Method, params: LorenzParams) -> Self {
        Self {
            method,
            params,
            divergence_limit: Some(DEFAULT_DIVERGENCE_LIMIT),
        }
    }

    /// Sets the magnitude above which a coordinate counts as diverged.
    /// `None` disables the check; non-finite coordinates are then propagated silently.
    pub fn divergence_limit(mut self, limit: Option<f64>) -> Self {
        self.divergence_limit = limit;
        self
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn params(&self) -> &LorenzParams {
        &self.params
    }

    /// Integrates `num_steps` steps of size `h` from `initial`, starting at `t = 0`.
    pub fn build(&self, initial: State, h: f64, num_steps: usize) -> Result<Trajectory> {
        let grid = TimeGrid::from_steps(0.0, h, num_steps)?;
        self.build_on(initial, &grid)
    }

    /// Integrates from `initial` across every point of `grid`.
    pub fn build_on(&self, initial: State, grid: &TimeGrid) -> Result<Trajectory> {
        grid.validate()?;
        self.params.validate()?;
        self.check(0, grid.t0, &initial)?;

        let mut stepper = self.method.stepper::<f64>(3);
        let mut states = Vec::with_capacity(grid.len());
        states.push(initial);

        let mut current = initial;
        for step in 1..=grid.num_steps {
            stepper.advance(&self.params, current.as_mut_slice(), grid.h);
            self.check(step, grid.time(step), &current)?;
            states.push(current);
        }

        debug!(
            method = %self.method,
            steps = grid.num_steps,
            h = grid.h,
            "built trajectory"
        );
        Trajectory::new(*grid, states)
    }

    fn check(&self, step: usize, time: f64, state: &State) -> Result<()> {
        let Some(limit) = self.divergence_limit else {
            return Ok(());
        };
        let magnitude = state.amax();
        if state.iter().all(|v| v.is_finite()) && magnitude <= limit {
            return Ok(());
        }
        warn!(
            method = %self.method,
            step,
            time,
            magnitude,
            "trajectory left the sanity bound"
        );
        Err(IntegrationError::Divergence {
            step,
            time,
            magnitude,
        })
    }
}

/// Nominal and perturbed trajectories integrated with the same method, grid and parameters.
#[derive(Debug, Clone, Serialize)]
pub struct PerturbationPair {
    pub offset: State,
    pub nominal: Trajectory,
    pub perturbed: Trajectory,
}

impl PerturbationPair {
    pub fn build(
        builder: &TrajectoryBuilder,
        initial: State,
        offset: State,
        grid: &TimeGrid,
    ) -> Result<Self> {
        let nominal = builder.build_on(initial, grid)?;
        let perturbed = builder.build_on(initial + offset, grid)?;
        Ok(Self {
            offset,
            nominal,
            perturbed,
        })
    }
}
