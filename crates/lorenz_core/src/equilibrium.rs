use crate::lorenz::{LorenzParams, State};
use anyhow::{Context, Result};
use num_complex::Complex64;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct Equilibrium {
    pub state: State,
    pub residual_norm: f64,
    pub eigenvalues: Vec<Complex64>,
    /// All eigenvalues of the Jacobian have negative real part.
    pub stable: bool,
}

/// Fixed points of the Lorenz field: the origin, and for `rho > 1` the pair
/// `(±sqrt(beta (rho - 1)), ±sqrt(beta (rho - 1)), rho - 1)`.
pub fn fixed_points(params: &LorenzParams) -> Vec<State> {
    let mut points = vec![State::zeros()];
    if params.rho > 1.0 {
        let c = (params.beta * (params.rho - 1.0)).sqrt();
        points.push(State::new(c, c, params.rho - 1.0));
        points.push(State::new(-c, -c, params.rho - 1.0));
    }
    points
}

/// Every fixed point together with the spectrum of its Jacobian.
pub fn equilibria(params: &LorenzParams) -> Result<Vec<Equilibrium>> {
    params
        .validate()
        .context("Cannot locate equilibria for invalid parameters.")?;

    Ok(fixed_points(params)
        .into_iter()
        .map(|state| {
            let mut eigenvalues: Vec<Complex64> =
                params.jacobian(&state).complex_eigenvalues().iter().copied().collect();
            eigenvalues.sort_by(|a, b| b.re.total_cmp(&a.re).then(b.im.total_cmp(&a.im)));
            let stable = eigenvalues.iter().all(|l| l.re < 0.0);
            Equilibrium {
                state,
                residual_norm: params.derivative(&state).norm(),
                eigenvalues,
                stable,
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::{equilibria, fixed_points};
    use crate::lorenz::LorenzParams;

    #[test]
    fn classical_regime_has_three_unstable_equilibria() {
        let params = LorenzParams::classical();
        let points = equilibria(&params).expect("equilibria should compute");
        assert_eq!(points.len(), 3);
        for eq in &points {
            assert!(eq.residual_norm < 1e-12);
            assert!(!eq.stable);
            assert_eq!(eq.eigenvalues.len(), 3);
        }

        // Origin: -beta and the roots of l^2 + (sigma + 1) l - sigma (rho - 1).
        let origin = &points[0];
        let disc = (11.0f64 * 11.0 + 4.0 * 270.0).sqrt();
        let expected = [(-11.0 + disc) / 2.0, -8.0 / 3.0, (-11.0 - disc) / 2.0];
        for (lambda, want) in origin.eigenvalues.iter().zip(expected) {
            assert!((lambda.re - want).abs() < 1e-9, "{lambda} vs {want}");
            assert!(lambda.im.abs() < 1e-9);
        }

        // The symmetric pair sits just past the Hopf point: a weakly unstable spiral.
        for eq in &points[1..] {
            let leading = eq.eigenvalues[0];
            assert!(leading.re > 0.0 && leading.re < 0.2);
            assert!(leading.im.abs() > 5.0);
        }
    }

    #[test]
    fn below_hopf_threshold_the_wings_are_stable() {
        let params = LorenzParams::new(10.0, 20.0, 8.0 / 3.0);
        let points = equilibria(&params).unwrap();
        assert!(!points[0].stable);
        assert!(points[1].stable && points[2].stable);
    }

    #[test]
    fn subcritical_rho_leaves_only_a_stable_origin() {
        let params = LorenzParams::new(10.0, 0.5, 8.0 / 3.0);
        assert_eq!(fixed_points(&params).len(), 1);
        let points = equilibria(&params).unwrap();
        assert!(points[0].stable);
    }

    #[test]
    fn invalid_parameters_are_reported() {
        let err = equilibria(&LorenzParams::new(10.0, 28.0, -1.0)).unwrap_err();
        assert!(format!("{err:#}").contains("beta"));
    }
}
