//! Euler, Heun and classical RK4 as explicit Runge-Kutta tableaux.

use crate::lorenz::{LorenzParams, State};
use crate::traits::{constant, OneStep, Scalar, VectorField};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Butcher tableau of an explicit scheme with `b.len()` stages.
///
/// Stage `i` evaluates the field at `y + h * sum_j a[i][j] k_j` (`j < i`); the step
/// adds `h * sum_i b[i] k_i`.
struct Tableau {
    a: &'static [&'static [f64]],
    b: &'static [f64],
}

const EULER: Tableau = Tableau {
    a: &[&[]],
    b: &[1.0],
};

// Predictor y + h d1, corrector averaging both slopes.
const HEUN: Tableau = Tableau {
    a: &[&[], &[1.0]],
    b: &[0.5, 0.5],
};

const RK4: Tableau = Tableau {
    a: &[&[], &[0.5], &[0.0, 0.5], &[0.0, 0.0, 1.0]],
    b: &[1.0 / 6.0, 1.0 / 3.0, 1.0 / 3.0, 1.0 / 6.0],
};

/// The three fixed-step schemes under comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    Euler,
    Heun,
    Rk4,
}

impl Method {
    pub const ALL: [Method; 3] = [Method::Euler, Method::Heun, Method::Rk4];

    fn tableau(self) -> &'static Tableau {
        match self {
            Method::Euler => &EULER,
            Method::Heun => &HEUN,
            Method::Rk4 => &RK4,
        }
    }

    /// Global order of accuracy.
    pub fn order(self) -> u32 {
        match self {
            Method::Euler => 1,
            Method::Heun => 2,
            Method::Rk4 => 4,
        }
    }

    /// Field evaluations per step, one per stage.
    pub fn evaluations_per_step(self) -> usize {
        self.tableau().b.len()
    }

    pub fn name(self) -> &'static str {
        match self {
            Method::Euler => "Euler",
            Method::Heun => "Heun",
            Method::Rk4 => "RK4",
        }
    }

    pub fn stepper<T: Scalar>(self, dim: usize) -> ExplicitRk<T> {
        ExplicitRk::new(self, dim)
    }

    /// Advances `state` by one step of size `h` and returns the new state.
    /// The input is left untouched.
    pub fn advance(self, params: &LorenzParams, state: &State, h: f64) -> State {
        let mut next = *state;
        self.stepper::<f64>(3)
            .advance(params, next.as_mut_slice(), h);
        next
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Method {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "euler" => Ok(Method::Euler),
            "heun" | "improved-euler" => Ok(Method::Heun),
            "rk4" | "runge-kutta" => Ok(Method::Rk4),
            other => Err(format!(
                "Unknown method '{other}'. Expected one of: euler, heun, rk4."
            )),
        }
    }
}

/// Stepper for one [`Method`], holding the stage slopes between calls so a run
/// allocates once.
pub struct ExplicitRk<T: Scalar> {
    method: Method,
    a: Vec<Vec<T>>,
    b: Vec<T>,
    slopes: Vec<Vec<T>>,
    stage_state: Vec<T>,
}

impl<T: Scalar> ExplicitRk<T> {
    pub fn new(method: Method, dim: usize) -> Self {
        let tableau = method.tableau();
        Self {
            method,
            a: tableau
                .a
                .iter()
                .map(|row| row.iter().map(|&c| constant(c)).collect())
                .collect(),
            b: tableau.b.iter().map(|&c| constant(c)).collect(),
            slopes: vec![vec![T::zero(); dim]; tableau.b.len()],
            stage_state: vec![T::zero(); dim],
        }
    }

    pub fn method(&self) -> Method {
        self.method
    }
}

impl<T: Scalar> OneStep<T> for ExplicitRk<T> {
    fn advance(&mut self, field: &impl VectorField<T>, state: &mut [T], h: T) {
        for stage in 0..self.b.len() {
            self.stage_state.copy_from_slice(state);
            for (slope, &coeff) in self.slopes.iter().zip(&self.a[stage]) {
                if coeff == T::zero() {
                    continue;
                }
                for (y, &k) in self.stage_state.iter_mut().zip(slope) {
                    *y = *y + h * coeff * k;
                }
            }
            field.eval(&self.stage_state, &mut self.slopes[stage]);
        }

        for (n, y) in state.iter_mut().enumerate() {
            let increment = self
                .slopes
                .iter()
                .zip(&self.b)
                .fold(T::zero(), |acc, (slope, &weight)| acc + weight * slope[n]);
            *y = *y + h * increment;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ExplicitRk, Method};
    use crate::lorenz::{LorenzParams, State};
    use crate::traits::{OneStep, VectorField};

    struct Decay {
        rate: f64,
    }

    impl VectorField<f64> for Decay {
        fn dimension(&self) -> usize {
            1
        }

        fn eval(&self, x: &[f64], out: &mut [f64]) {
            out[0] = self.rate * x[0];
        }
    }

    fn one_step(method: Method, rate: f64, h: f64) -> f64 {
        let mut x = [1.0];
        method.stepper::<f64>(1).advance(&Decay { rate }, &mut x, h);
        x[0]
    }

    #[test]
    fn one_step_on_linear_decay_is_the_taylor_polynomial_of_matching_degree() {
        let (a, h) = (-0.7, 0.1);
        let z: f64 = a * h;
        assert!((one_step(Method::Euler, a, h) - (1.0 + z)).abs() < 1e-15);
        assert!((one_step(Method::Heun, a, h) - (1.0 + z + z * z / 2.0)).abs() < 1e-15);
        let rk4 = 1.0 + z + z * z / 2.0 + z.powi(3) / 6.0 + z.powi(4) / 24.0;
        assert!((one_step(Method::Rk4, a, h) - rk4).abs() < 1e-15);
    }

    #[test]
    fn lorenz_steps_match_the_textbook_update_rules() {
        let params = LorenzParams::classical();
        let s = State::new(1.0, 1.0, 1.0);
        let h = 0.01;
        let f = |u: &State| params.derivative(u);

        let euler = s + h * f(&s);
        assert!((Method::Euler.advance(&params, &s, h) - euler).norm() < 1e-13);

        let d1 = f(&s);
        let d2 = f(&(s + h * d1));
        let heun = s + (h / 2.0) * (d1 + d2);
        assert!((Method::Heun.advance(&params, &s, h) - heun).norm() < 1e-13);

        let k1 = h * f(&s);
        let k2 = h * f(&(s + k1 / 2.0));
        let k3 = h * f(&(s + k2 / 2.0));
        let k4 = h * f(&(s + k3));
        let rk4 = s + (k1 + 2.0 * k2 + 2.0 * k3 + k4) / 6.0;
        assert!((Method::Rk4.advance(&params, &s, h) - rk4).norm() < 1e-13);
    }

    #[test]
    fn advance_is_bitwise_deterministic_and_leaves_input_untouched() {
        let params = LorenzParams::classical();
        let s = params.reference_initial_state();
        let copy = s;
        for method in Method::ALL {
            let first = method.advance(&params, &s, 0.001);
            let second = method.advance(&params, &s, 0.001);
            for i in 0..3 {
                assert_eq!(first[i].to_bits(), second[i].to_bits());
            }
            assert_eq!(s, copy);
        }
    }

    #[test]
    fn reused_stepper_gives_the_same_steps_as_fresh_ones() {
        let params = LorenzParams::classical();
        let mut stepper = ExplicitRk::<f64>::new(Method::Heun, 3);
        let mut reused = params.reference_initial_state();
        let mut fresh = reused;
        for _ in 0..50 {
            stepper.advance(&params, reused.as_mut_slice(), 0.002);
            fresh = Method::Heun.advance(&params, &fresh, 0.002);
        }
        assert_eq!(reused, fresh);
        assert_eq!(stepper.method(), Method::Heun);
    }

    #[test]
    fn rk4_runs_in_single_precision() {
        let params = LorenzParams::classical();
        let mut x = [27.0f32, 8.485, 5.485];
        Method::Rk4.stepper::<f32>(3).advance(&params, &mut x, 0.001);
        let reference = Method::Rk4.advance(&params, &State::new(27.0, 8.485, 5.485), 0.001);
        for i in 0..3 {
            assert!((x[i] as f64 - reference[i]).abs() < 1e-3);
        }
    }

    #[test]
    fn method_metadata_and_parsing() {
        assert_eq!(Method::ALL.map(Method::order), [1, 2, 4]);
        assert_eq!(Method::ALL.map(Method::evaluations_per_step), [1, 2, 4]);
        assert_eq!("RK4".parse::<Method>(), Ok(Method::Rk4));
        assert_eq!(" heun ".parse::<Method>(), Ok(Method::Heun));
        assert_eq!("euler".parse::<Method>(), Ok(Method::Euler));
        let err = "midpoint".parse::<Method>().unwrap_err();
        assert!(err.contains("Unknown method"));
        assert_eq!(Method::Rk4.to_string(), "RK4");
    }
}
