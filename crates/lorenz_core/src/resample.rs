//! Piecewise-linear resampling of trajectories onto another time grid.

use crate::error::{IntegrationError, Result};
use crate::lorenz::State;
use crate::trajectory::{TimeGrid, Trajectory};

/// Queries this far outside the source span (relative to the span) are clamped
/// to the nearest endpoint instead of rejected.
const ENDPOINT_SLACK: f64 = 1e-9;

/// Interpolates `source_states`, sampled at the strictly increasing `source_times`,
/// at each of `target_times`. Each coordinate is interpolated independently.
pub fn interpolate(
    source_times: &[f64],
    source_states: &[State],
    target_times: &[f64],
) -> Result<Vec<State>> {
    if source_times.len() != source_states.len() {
        return Err(IntegrationError::InvalidGrid(format!(
            "{} times supplied for {} states",
            source_times.len(),
            source_states.len()
        )));
    }
    if source_times.is_empty() {
        return Err(IntegrationError::InvalidGrid("source is empty".into()));
    }
    if source_times.windows(2).any(|w| !(w[1] > w[0])) {
        return Err(IntegrationError::InvalidGrid(
            "source times must be strictly increasing".into(),
        ));
    }

    let start = source_times[0];
    let end = source_times[source_times.len() - 1];
    let slack = ENDPOINT_SLACK * (end - start).max(f64::MIN_POSITIVE);

    target_times
        .iter()
        .map(|&time| {
            if !(time >= start - slack && time <= end + slack) {
                return Err(IntegrationError::OutOfRange { time, start, end });
            }
            let time = time.clamp(start, end);
            // First node strictly after `time`; the bracketing interval is [upper - 1, upper].
            let upper = source_times.partition_point(|&s| s <= time);
            if upper == 0 {
                return Ok(source_states[0]);
            }
            if upper == source_times.len() {
                return Ok(source_states[upper - 1]);
            }
            let lower = upper - 1;
            let (t_lo, t_hi) = (source_times[lower], source_times[upper]);
            if time == t_lo {
                return Ok(source_states[lower]);
            }
            let w = (time - t_lo) / (t_hi - t_lo);
            Ok(source_states[lower] + (source_states[upper] - source_states[lower]) * w)
        })
        .collect()
}

/// Resamples `source` onto `target`, e.g. a coarse trajectory onto a fine reference grid.
pub fn resample(source: &Trajectory, target: &TimeGrid) -> Result<Trajectory> {
    let states = interpolate(&source.times(), source.states(), &target.times())?;
    Trajectory::new(*target, states)
}
