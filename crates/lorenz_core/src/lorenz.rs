//! The Lorenz vector field.

use crate::error::{IntegrationError, Result};
use crate::traits::{constant, Scalar, VectorField};
use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};

/// A point `(x, y, z)` in Lorenz phase space.
pub type State = Vector3<f64>;

/// The `(sigma, rho, beta)` triple. Constant over a whole trajectory.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LorenzParams {
    pub sigma: f64,
    pub rho: f64,
    pub beta: f64,
}

impl Default for LorenzParams {
    fn default() -> Self {
        Self::classical()
    }
}

impl LorenzParams {
    pub fn new(sigma: f64, rho: f64, beta: f64) -> Self {
        Self { sigma, rho, beta }
    }

    /// Lorenz's original chaotic regime: `sigma = 10`, `rho = 28`, `beta = 8/3`.
    pub fn classical() -> Self {
        Self::new(10.0, 28.0, 8.0 / 3.0)
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [("sigma", self.sigma), ("rho", self.rho), ("beta", self.beta)] {
            if !value.is_finite() {
                return Err(IntegrationError::InvalidParameter {
                    name,
                    value,
                    reason: "must be finite",
                });
            }
        }
        if self.beta <= 0.0 {
            return Err(IntegrationError::InvalidParameter {
                name: "beta",
                value: self.beta,
                reason: "must be positive",
            });
        }
        Ok(())
    }

    /// `dx = sigma (y - x)`, `dy = x (rho - z) - y`, `dz = x y - beta z`.
    pub fn derivative(&self, state: &State) -> State {
        let (x, y, z) = (state.x, state.y, state.z);
        State::new(
            self.sigma * (y - x),
            x * (self.rho - z) - y,
            x * y - self.beta * z,
        )
    }

    /// Analytic Jacobian of the vector field at `state`.
    #[rustfmt::skip]
    pub fn jacobian(&self, state: &State) -> Matrix3<f64> {
        let (x, y, z) = (state.x, state.y, state.z);
        Matrix3::new(
            -self.sigma, self.sigma, 0.0,
            self.rho - z, -1.0, -x,
            y, x, -self.beta,
        )
    }

    /// Trace of the Jacobian. Constant everywhere, so phase-space volumes contract at
    /// the rate `exp(divergence * t)`.
    pub fn divergence(&self) -> f64 {
        -(self.sigma + 1.0 + self.beta)
    }

    /// The state conventionally used to seed the comparisons:
    /// `(rho - 1, eta, eta - 3)` with `eta = sqrt(beta (rho - 1))`.
    pub fn reference_initial_state(&self) -> State {
        let eta = (self.beta * (self.rho - 1.0)).sqrt();
        State::new(self.rho - 1.0, eta, eta - 3.0)
    }
}

impl<T: Scalar> VectorField<T> for LorenzParams {
    fn dimension(&self) -> usize {
        3
    }

    fn eval(&self, x: &[T], out: &mut [T]) {
        let sigma: T = constant(self.sigma);
        let rho: T = constant(self.rho);
        let beta: T = constant(self.beta);
        out[0] = sigma * (x[1] - x[0]);
        out[1] = x[0] * (rho - x[2]) - x[1];
        out[2] = x[0] * x[1] - beta * x[2];
    }
}
