//! Where a ramp crosses a target rate.

use loadsplit_core::{Phase, PlanError, PlanResult};

/// A point on a ramp: `x` seconds into the phase, at `y` arrivals per second.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Finds the instant at which a ramp's rate line crosses `target_rate`.
///
/// The ramp is the line through `(0, arrival_rate)` and `(duration, ramp_to)`;
/// the target is the horizontal line through `(0, target_rate)` and
/// `(duration, target_rate)`. The crossing point may lie outside the phase if
/// the ramp never reaches the target.
///
/// # Errors
///
/// - [`PlanError::NotARamp`] for any phase that is not a ramp.
/// - [`PlanError::ParallelLines`] when the ramp is flat (or has no length), since
///   a flat ramp should have been normalized to a constant rate beforehand.
pub fn intersection(phase: &Phase, target_rate: f64) -> PlanResult<Point> {
    let Phase::Ramp {
        duration,
        arrival_rate,
        ramp_to,
        ..
    } = phase
    else {
        return Err(PlanError::NotARamp {
            shape: phase.shape(),
        });
    };

    let (x1, y1, x2, y2) = (0.0, *arrival_rate, *duration, *ramp_to);
    let (x3, y3, x4, y4) = (0.0, target_rate, *duration, target_rate);

    let denominator = (x1 - x2) * (y3 - y4) - (y1 - y2) * (x3 - x4);
    if denominator == 0.0 {
        return Err(PlanError::ParallelLines);
    }

    let a = x1 * y2 - y1 * x2;
    let b = x3 * y4 - y3 * x4;
    Ok(Point {
        x: (a * (x3 - x4) - (x1 - x2) * b) / denominator,
        y: (a * (y3 - y4) - (y1 - y2) * b) / denominator,
    })
}
