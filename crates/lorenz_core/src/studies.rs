//! The four comparisons built from trajectories and metrics.
//!
//! Each study returns a serialisable report whose trajectories and series carry
//! their own time grids, ready for an external plotting tool.

use crate::config::RunConfig;
use crate::lorenz::State;
use crate::metrics::{global_error, local_residual, ErrorSeries};
use crate::resample::resample;
use crate::solvers::Method;
use crate::trajectory::{PerturbationPair, TimeGrid, Trajectory};
use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use tracing::info;

#[derive(Debug, Clone, Serialize)]
pub struct MethodTrajectory {
    pub method: Method,
    pub trajectory: Trajectory,
}

#[derive(Debug, Clone, Serialize)]
pub struct MethodSeries {
    pub method: Method,
    pub series: ErrorSeries,
}

#[derive(Debug, Clone, Serialize)]
pub struct AttractorReport {
    pub config: RunConfig,
    pub runs: Vec<MethodTrajectory>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GlobalErrorReport {
    pub step: f64,
    pub reference_step: f64,
    pub reference_grid: TimeGrid,
    /// Mean pointwise distance to the RK4 reference, per coarse method.
    pub errors: BTreeMap<Method, f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PerturbationReport {
    pub offset: State,
    pub divergence: Vec<MethodSeries>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResidualReport {
    pub residuals: Vec<MethodSeries>,
}

fn run(config: &RunConfig, method: Method, grid: &TimeGrid) -> Result<Trajectory> {
    config
        .builder(method)
        .build_on(config.initial_state(), grid)
        .with_context(|| format!("{method} integration failed"))
}

/// One trajectory per method from the same initial state.
pub fn attractor(config: &RunConfig) -> Result<AttractorReport> {
    config.validate()?;
    let grid = config.grid()?;
    let runs = Method::ALL
        .iter()
        .map(|&method| {
            Ok(MethodTrajectory {
                method,
                trajectory: run(config, method, &grid)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    info!(steps = grid.num_steps, h = grid.h, "attractor trajectories built");
    Ok(AttractorReport {
        config: *config,
        runs,
    })
}

/// Compares coarse Euler, Heun and RK4 runs against an RK4 run at `reference_step`,
/// after resampling each coarse trajectory onto the reference grid.
pub fn global_error_comparison(config: &RunConfig) -> Result<GlobalErrorReport> {
    config.validate()?;
    if !(config.reference_step > 0.0 && config.reference_step < config.h) {
        bail!(
            "Reference step {} must be positive and smaller than the coarse step {}.",
            config.reference_step,
            config.h
        );
    }
    let coarse_grid = config.grid()?;
    if coarse_grid.num_steps == 0 {
        bail!(
            "Horizon {} is shorter than the coarse step {}; there is nothing to compare.",
            config.tf - config.t0,
            config.h
        );
    }
    let reference_grid = config.reference_grid()?;
    let reference = run(config, Method::Rk4, &reference_grid).context("reference run failed")?;

    let mut errors = BTreeMap::new();
    for method in Method::ALL {
        let coarse = run(config, method, &coarse_grid)?;
        let aligned = resample(&coarse, &reference_grid)
            .with_context(|| format!("failed to resample the {method} trajectory"))?;
        let error = global_error(&reference, &aligned)?;
        info!(%method, error, "global error");
        errors.insert(method, error);
    }

    Ok(GlobalErrorReport {
        step: config.h,
        reference_step: config.reference_step,
        reference_grid,
        errors,
    })
}

impl GlobalErrorReport {
    pub fn error(&self, method: Method) -> Option<f64> {
        self.errors.get(&method).copied()
    }
}

impl fmt::Display for GlobalErrorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (method, error) in &self.errors {
            let label = match method {
                Method::Rk4 => "RK4 (coarse)",
                other => other.name(),
            };
            writeln!(f, "{label} error: {error:.6}")?;
        }
        Ok(())
    }
}

/// Distance between nominal and offset-started trajectories, per method.
pub fn perturbation_study(config: &RunConfig) -> Result<PerturbationReport> {
    config.validate()?;
    let grid = config.grid()?;
    let offset = config.perturbation_offset();
    let divergence = Method::ALL
        .iter()
        .map(|&method| {
            let builder = config.builder(method);
            let pair = PerturbationPair::build(&builder, config.initial_state(), offset, &grid)
                .with_context(|| format!("{method} perturbation run failed"))?;
            let series = pair.divergence()?;
            info!(
                %method,
                max = series.max(),
                unit_crossing = ?series.first_exceeding(1.0).map(|(_, t)| t),
                "perturbation divergence"
            );
            Ok(MethodSeries { method, series })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(PerturbationReport { offset, divergence })
}

/// Local residual series per method.
pub fn residual_study(config: &RunConfig) -> Result<ResidualReport> {
    config.validate()?;
    let grid = config.grid()?;
    let residuals = Method::ALL
        .iter()
        .map(|&method| {
            let trajectory = run(config, method, &grid)?;
            let series = local_residual(&trajectory, &config.params);
            info!(%method, mean = series.mean(), max = series.max(), "local residual");
            Ok(MethodSeries { method, series })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(ResidualReport { residuals })
}
