//! Error measures comparing trajectories.

use crate::error::Result;
use crate::lorenz::LorenzParams;
use crate::trajectory::{PerturbationPair, Trajectory};
use serde::Serialize;

/// A non-negative distance sampled on a uniform grid starting at `t0` with spacing `h`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorSeries {
    pub t0: f64,
    pub h: f64,
    pub values: Vec<f64>,
}

impl ErrorSeries {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn time(&self, index: usize) -> f64 {
        self.t0 + index as f64 * self.h
    }

    pub fn times(&self) -> Vec<f64> {
        (0..self.values.len()).map(|i| self.time(i)).collect()
    }

    pub fn max(&self) -> f64 {
        self.values.iter().copied().fold(0.0, f64::max)
    }

    pub fn mean(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        self.values.iter().sum::<f64>() / self.values.len() as f64
    }

    /// First sample strictly above `threshold`, as `(index, time)`.
    pub fn first_exceeding(&self, threshold: f64) -> Option<(usize, f64)> {
        self.values
            .iter()
            .position(|&v| v > threshold)
            .map(|i| (i, self.time(i)))
    }
}

/// Mean over samples of the Euclidean distance between `candidate` and `reference`.
///
/// This is a mean pointwise deviation, not a time-integrated L2 norm. Both trajectories
/// must share a grid; resample the coarser one first.
pub fn global_error(reference: &Trajectory, candidate: &Trajectory) -> Result<f64> {
    reference.grid().ensure_matches(candidate.grid())?;
    let total: f64 = reference
        .states()
        .iter()
        .zip(candidate.states())
        .map(|(r, c)| (r - c).norm())
        .sum();
    Ok(total / reference.len() as f64)
}

/// `|(s_{i+1} - s_i) / h - f(s_i)|` for each consecutive pair.
///
/// The result has one entry fewer than the trajectory and is timed at the left end of
/// each step.
pub fn local_residual(trajectory: &Trajectory, params: &LorenzParams) -> ErrorSeries {
    let grid = trajectory.grid();
    let values = trajectory
        .states()
        .windows(2)
        .map(|pair| {
            let discrete = (pair[1] - pair[0]) / grid.h;
            (discrete - params.derivative(&pair[0])).norm()
        })
        .collect();
    ErrorSeries {
        t0: grid.t0,
        h: grid.h,
        values,
    }
}

/// Per-sample distance between a nominal and a perturbed trajectory.
pub fn perturbation_divergence(nominal: &Trajectory, perturbed: &Trajectory) -> Result<ErrorSeries> {
    let grid = nominal.grid();
    grid.ensure_matches(perturbed.grid())?;
    let values = nominal
        .states()
        .iter()
        .zip(perturbed.states())
        .map(|(a, b)| (a - b).norm())
        .collect();
    Ok(ErrorSeries {
        t0: grid.t0,
        h: grid.h,
        values,
    })
}

impl PerturbationPair {
    pub fn divergence(&self) -> Result<ErrorSeries> {
        perturbation_divergence(&self.nominal, &self.perturbed)
    }
}

#[cfg(test)]
mod tests {
    use super::{global_error, local_residual, perturbation_divergence, ErrorSeries};
    use crate::error::IntegrationError;
    use crate::lorenz::{LorenzParams, State};
    use crate::resample::resample;
    use crate::solvers::Method;
    use crate::trajectory::{PerturbationPair, TimeGrid, Trajectory, TrajectoryBuilder};

    fn classical_run(method: Method, h: f64, tf: f64) -> Trajectory {
        let params = LorenzParams::classical();
        let grid = TimeGrid::new(0.0, tf, h).unwrap();
        TrajectoryBuilder::new(method, params)
            .build_on(params.reference_initial_state(), &grid)
            .unwrap()
    }

    #[test]
    fn global_error_of_a_trajectory_with_itself_is_zero() {
        for method in Method::ALL {
            let trajectory = classical_run(method, 0.01, 2.0);
            assert_eq!(global_error(&trajectory, &trajectory).unwrap(), 0.0);
        }
    }

    #[test]
    fn global_error_is_mean_of_pointwise_norms() {
        let grid = TimeGrid::from_steps(0.0, 1.0, 2).unwrap();
        let reference = Trajectory::new(grid, vec![State::zeros(); 3]).unwrap();
        let candidate = Trajectory::new(
            grid,
            vec![
                State::new(3.0, 4.0, 0.0),
                State::zeros(),
                State::new(0.0, 0.0, -2.0),
            ],
        )
        .unwrap();
        let err = global_error(&reference, &candidate).unwrap();
        assert!((err - 7.0 / 3.0).abs() < 1e-15);
        assert!(global_error(&candidate, &reference).unwrap() >= 0.0);
    }

    #[test]
    fn global_error_rejects_mismatched_grids() {
        let coarse = classical_run(Method::Euler, 0.01, 1.0);
        let fine = classical_run(Method::Rk4, 0.001, 1.0);
        let err = global_error(&fine, &coarse).unwrap_err();
        assert!(matches!(err, IntegrationError::GridMismatch { .. }));
        assert!(format!("{err}").contains("resample"));
    }

    #[test]
    fn coarse_methods_resampled_onto_reference_rank_by_order() {
        let reference = classical_run(Method::Rk4, 0.0001, 1.0);
        let errors: Vec<f64> = Method::ALL
            .iter()
            .map(|&method| {
                let coarse = classical_run(method, 0.001, 1.0);
                let aligned = resample(&coarse, reference.grid()).unwrap();
                global_error(&reference, &aligned).unwrap()
            })
            .collect();
        assert!(errors[0] > errors[1], "{errors:?}");
        assert!(errors[1] > errors[2], "{errors:?}");
    }

    /// Global error at the coarse nodes, measured against a fine RK4 reference sampled there.
    fn error_at_step(method: Method, h: f64) -> f64 {
        let horizon = 0.2;
        let reference = classical_run(Method::Rk4, 1e-5, horizon);
        let candidate = classical_run(method, h, horizon);
        let reference_at_nodes = resample(&reference, candidate.grid()).unwrap();
        global_error(&reference_at_nodes, &candidate).unwrap()
    }

    #[test]
    fn halving_the_step_shrinks_global_error_by_two_to_the_order() {
        for (method, low, high) in [
            (Method::Euler, 1.7, 2.4),
            (Method::Heun, 3.5, 4.5),
            (Method::Rk4, 13.0, 19.0),
        ] {
            let ratio = error_at_step(method, 0.002) / error_at_step(method, 0.001);
            assert!(
                ratio > low && ratio < high,
                "{method}: error ratio {ratio} outside ({low}, {high})"
            );
        }
    }

    #[test]
    fn euler_residual_is_round_off() {
        // An Euler step's difference quotient is exactly the derivative at its left end.
        let params = LorenzParams::classical();
        let trajectory = classical_run(Method::Euler, 0.001, 1.0);
        let residual = local_residual(&trajectory, &params);
        assert!(residual.max() < 1e-8, "max residual {}", residual.max());
    }

    #[test]
    fn heun_and_rk4_residuals_halve_with_the_step() {
        let params = LorenzParams::classical();
        for method in [Method::Heun, Method::Rk4] {
            let coarse = local_residual(&classical_run(method, 0.002, 0.2), &params);
            let fine = local_residual(&classical_run(method, 0.001, 0.2), &params);
            let ratio = coarse.mean() / fine.mean();
            assert!((ratio - 2.0).abs() < 0.1, "{method}: residual ratio {ratio}");
        }
    }

    #[test]
    fn residual_has_one_entry_per_step() {
        let params = LorenzParams::classical();
        let trajectory = classical_run(Method::Rk4, 0.01, 1.0);
        let residual = local_residual(&trajectory, &params);
        assert_eq!(residual.len(), trajectory.len() - 1);
        assert_eq!(residual.times(), trajectory.times()[..trajectory.len() - 1].to_vec());
        assert!(residual.values.iter().all(|&v| v >= 0.0));
    }

    #[test]
    fn perturbation_divergence_grows_past_unit_scale_for_rk4() {
        let params = LorenzParams::classical();
        let grid = TimeGrid::new(0.0, 50.0, 0.001).unwrap();
        let pair = PerturbationPair::build(
            &TrajectoryBuilder::new(Method::Rk4, params),
            params.reference_initial_state(),
            State::new(0.01, 0.01, 0.01),
            &grid,
        )
        .unwrap();
        let series = pair.divergence().unwrap();
        assert_eq!(series.len(), grid.len());
        assert!((series.values[0] - 3.0f64.sqrt() * 0.01).abs() < 1e-12);
        let (_, time) = series
            .first_exceeding(1.0)
            .expect("chaotic separation should exceed 1.0");
        assert!(time < 50.0);
    }

    #[test]
    fn perturbation_divergence_rejects_different_grids() {
        let a = classical_run(Method::Heun, 0.01, 1.0);
        let b = classical_run(Method::Heun, 0.01, 2.0);
        assert!(matches!(
            perturbation_divergence(&a, &b),
            Err(IntegrationError::GridMismatch { .. })
        ));
    }

    #[test]
    fn error_series_helpers() {
        let series = ErrorSeries {
            t0: 1.0,
            h: 0.5,
            values: vec![0.1, 0.4, 2.0, 0.3],
        };
        assert_eq!(series.times(), vec![1.0, 1.5, 2.0, 2.5]);
        assert_eq!(series.max(), 2.0);
        assert!((series.mean() - 0.7).abs() < 1e-15);
        assert_eq!(series.first_exceeding(0.35), Some((1, 1.5)));
        assert_eq!(series.first_exceeding(5.0), None);
    }
}
