//! Command-line bridge to the `lorenz_core` studies.
//!
//! Reports go to stdout (plain text by default, JSON with `--json` for plotting tools);
//! logs go to stderr.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use lorenz_core::config::RunConfig;
use lorenz_core::equilibrium::equilibria;
use lorenz_core::lyapunov::lyapunov_exponents;
use lorenz_core::studies::{
    attractor, global_error_comparison, perturbation_study, residual_study,
};
use lorenz_core::{LorenzParams, Method};
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "lorenz",
    version,
    about = "Compare Euler, Heun and RK4 on the Lorenz system"
)]
struct Cli {
    /// Emit the full report as JSON instead of a text summary
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Integrate the attractor with every method
    Attractor(RunArgs),

    /// Mean deviation of coarse runs from a refined RK4 reference
    GlobalError(RunArgs),

    /// Separation of trajectories started from offset initial conditions
    Perturbation(RunArgs),

    /// Difference between each step's quotient and the analytic derivative
    Residual(RunArgs),

    /// Fixed points and the eigenvalues of their Jacobians
    Equilibria(ParamArgs),

    /// Lyapunov spectrum from the variational equations
    Lyapunov(LyapunovArgs),
}

#[derive(Args, Debug, Clone, Copy)]
struct ParamArgs {
    #[arg(long, default_value_t = 10.0)]
    sigma: f64,

    #[arg(long, default_value_t = 28.0)]
    rho: f64,

    #[arg(long, default_value_t = 8.0 / 3.0)]
    beta: f64,
}

impl ParamArgs {
    fn params(&self) -> LorenzParams {
        LorenzParams::new(self.sigma, self.rho, self.beta)
    }
}

/// Parses `a,b,c` into three finite floats.
fn parse_triple(text: &str) -> Result<[f64; 3], String> {
    let parts: Vec<&str> = text.split(',').map(str::trim).collect();
    let [a, b, c] = parts.as_slice() else {
        return Err(format!("expected three comma-separated numbers, got {}", parts.len()));
    };
    let mut out = [0.0; 3];
    for (slot, part) in out.iter_mut().zip([a, b, c]) {
        *slot = part
            .parse::<f64>()
            .map_err(|err| format!("'{part}' is not a number: {err}"))?;
        if !slot.is_finite() {
            return Err(format!("'{part}' is not finite"));
        }
    }
    Ok(out)
}

/// Overrides applied on top of the study's preset.
#[derive(Args, Debug, Clone, Copy)]
struct RunArgs {
    #[command(flatten)]
    params: ParamArgs,

    #[arg(long)]
    t0: Option<f64>,

    #[arg(long)]
    tf: Option<f64>,

    /// Integration step h
    #[arg(long)]
    step: Option<f64>,

    /// Step of the RK4 reference (global-error only)
    #[arg(long)]
    reference_step: Option<f64>,

    /// Initial x; unset components keep (rho - 1, eta, eta - 3)
    #[arg(long, allow_hyphen_values = true)]
    x0: Option<f64>,

    #[arg(long, allow_hyphen_values = true)]
    y0: Option<f64>,

    #[arg(long, allow_hyphen_values = true)]
    z0: Option<f64>,

    /// Perturbation offset as dx,dy,dz (perturbation only)
    #[arg(long, value_parser = parse_triple, allow_hyphen_values = true)]
    offset: Option<[f64; 3]>,

    /// Largest coordinate magnitude accepted before a run counts as diverged
    #[arg(long, conflicts_with = "no_divergence_check")]
    divergence_limit: Option<f64>,

    #[arg(long)]
    no_divergence_check: bool,
}

impl RunArgs {
    fn apply(&self, preset: RunConfig) -> RunConfig {
        let mut config = preset;
        config.params = self.params.params();
        if let Some(t0) = self.t0 {
            config.t0 = t0;
        }
        if let Some(tf) = self.tf {
            config.tf = tf;
        }
        if let Some(h) = self.step {
            config.h = h;
        }
        if let Some(h) = self.reference_step {
            config.reference_step = h;
        }
        if self.x0.is_some() || self.y0.is_some() || self.z0.is_some() {
            let base = config.initial_state();
            config.initial_state = Some([
                self.x0.unwrap_or(base.x),
                self.y0.unwrap_or(base.y),
                self.z0.unwrap_or(base.z),
            ]);
        }
        if let Some(offset) = self.offset {
            config.perturbation = offset;
        }
        if self.no_divergence_check {
            config.divergence_limit = None;
        } else if let Some(limit) = self.divergence_limit {
            config.divergence_limit = Some(limit);
        }
        config
    }
}

#[derive(Args, Debug, Clone, Copy)]
struct LyapunovArgs {
    #[command(flatten)]
    params: ParamArgs,

    #[arg(long, default_value = "rk4")]
    method: Method,

    #[arg(long, default_value_t = 20_000)]
    steps: usize,

    #[arg(long, default_value_t = 0.01)]
    dt: f64,

    /// Steps between re-orthonormalisations of the tangent vectors
    #[arg(long, default_value_t = 1)]
    renormalize_every: usize,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn print_json<T: Serialize>(report: &T) -> Result<()> {
    let text = serde_json::to_string(report).context("Failed to serialise report.")?;
    println!("{text}");
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    debug!(?cli, "parsed arguments");
    match cli.command {
        Command::Attractor(args) => {
            let report = attractor(&args.apply(RunConfig::attractor()))?;
            if cli.json {
                return print_json(&report);
            }
            for run in &report.runs {
                let last = run.trajectory.last();
                println!(
                    "{}: {} states, final state ({:.6}, {:.6}, {:.6})",
                    run.method,
                    run.trajectory.len(),
                    last.x,
                    last.y,
                    last.z
                );
            }
        }
        Command::GlobalError(args) => {
            let report = global_error_comparison(&args.apply(RunConfig::global_error()))?;
            if cli.json {
                return print_json(&report);
            }
            print!("{report}");
        }
        Command::Perturbation(args) => {
            let report = perturbation_study(&args.apply(RunConfig::perturbation()))?;
            if cli.json {
                return print_json(&report);
            }
            for entry in &report.divergence {
                let crossing = match entry.series.first_exceeding(1.0) {
                    Some((_, t)) => format!("exceeds 1.0 at t = {t:.3}"),
                    None => "stays below 1.0".to_string(),
                };
                println!(
                    "{}: initial {:.6}, max {:.6}, {crossing}",
                    entry.method,
                    entry.series.values[0],
                    entry.series.max()
                );
            }
        }
        Command::Residual(args) => {
            let report = residual_study(&args.apply(RunConfig::residual()))?;
            if cli.json {
                return print_json(&report);
            }
            for entry in &report.residuals {
                println!(
                    "{}: mean residual {:.6e}, max residual {:.6e}",
                    entry.method,
                    entry.series.mean(),
                    entry.series.max()
                );
            }
        }
        Command::Equilibria(args) => {
            let points = equilibria(&args.params())?;
            if cli.json {
                return print_json(&points);
            }
            for eq in &points {
                let spectrum: Vec<String> = eq
                    .eigenvalues
                    .iter()
                    .map(|l| format!("{:.6}{:+.6}i", l.re, l.im))
                    .collect();
                println!(
                    "({:.6}, {:.6}, {:.6}) {} eigenvalues [{}]",
                    eq.state.x,
                    eq.state.y,
                    eq.state.z,
                    if eq.stable { "stable" } else { "unstable" },
                    spectrum.join(", ")
                );
            }
        }
        Command::Lyapunov(args) => {
            let params = args.params.params();
            let spectrum = lyapunov_exponents(
                &params,
                args.method,
                &params.reference_initial_state(),
                args.steps,
                args.dt,
                args.renormalize_every,
            )?;
            if cli.json {
                return print_json(&spectrum);
            }
            let exponents: Vec<String> =
                spectrum.exponents.iter().map(|l| format!("{l:.6}")).collect();
            println!("{}: exponents [{}]", spectrum.method, exponents.join(", "));
            println!(
                "sum {:.6} against -(sigma + 1 + beta) = {:.6} (defect {:.2e})",
                spectrum.sum(),
                params.divergence(),
                spectrum.trace_defect
            );
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    init_tracing();
    run(Cli::parse())
}
