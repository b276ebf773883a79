//! The `lorenz_core` crate integrates the Lorenz system with three fixed-step explicit
//! schemes and measures how the scheme and the initial condition shape the result.
//!
//! Key components:
//! - **Traits**: `Scalar`, the autonomous `VectorField` and the `OneStep` scheme interface.
//! - **Lorenz**: the vector field, its Jacobian and the parameter triple.
//! - **Solvers**: Euler, Heun and RK4 as Butcher tableaux run by one `ExplicitRk` stepper.
//! - **Trajectory / Resample / Metrics**: fixed-grid trajectories, linear resampling onto
//!   another grid, global error, local residual and perturbation divergence.
//! - **Studies**: the attractor, global error, perturbation and residual comparisons.
//! - **Equilibrium / Lyapunov**: fixed points with their spectra, and Lyapunov exponents
//!   checked against the constant volume contraction.
pub mod config;
pub mod equilibrium;
pub mod error;
pub mod lorenz;
pub mod lyapunov;
pub mod metrics;
pub mod resample;
pub mod solvers;
pub mod studies;
pub mod trajectory;
pub mod traits;

pub use error::IntegrationError;
pub use lorenz::{LorenzParams, State};
pub use solvers::Method;
