//! Hurst exponent via rescaled-range (R/S) analysis on log prices.
//!
//! For each scale s in [10, min(50, n/2)), the series is cut into
//! non-overlapping segments of length s. Each segment contributes
//! R/S = (max - min of cumulative mean deviations) / population std.
//! The exponent is the least-squares slope of ln(mean R/S) against ln(s).
//!
//! H > 0.5 suggests persistence (trending), H < 0.5 mean reversion.

pub const MIN_POINTS: usize = 20;
pub const RANDOM_WALK: f64 = 0.5;
const MIN_SCALE: usize = 10;
const MAX_SCALE: usize = 50;

/// Returns `Some(0.5)` when the window is too short or fewer than two scales
/// yield a rescaled range, and `None` when the regression is degenerate.
pub fn hurst_exponent(closes: &[f64]) -> Option<f64> {
    let n = closes.len();
    if n < MIN_POINTS || closes.iter().any(|&c| c <= 0.0 || !c.is_finite()) {
        return Some(RANDOM_WALK);
    }

    let log_prices: Vec<f64> = closes.iter().map(|c| c.ln()).collect();
    let upper = MAX_SCALE.min(n / 2);

    let points: Vec<(f64, f64)> = (MIN_SCALE..upper)
        .filter_map(|scale| {
            mean_rescaled_range(&log_prices, scale).map(|rs| ((scale as f64).ln(), rs.ln()))
        })
        .collect();

    if points.len() < 2 {
        return Some(RANDOM_WALK);
    }

    let slope = regression_slope(&points);
    slope.is_finite().then_some(slope)
}

fn mean_rescaled_range(series: &[f64], scale: usize) -> Option<f64> {
    let n = series.len();
    let ratios: Vec<f64> = (0..n.saturating_sub(scale))
        .step_by(scale)
        .filter_map(|start| rescaled_range(&series[start..start + scale]))
        .collect();

    if ratios.is_empty() {
        return None;
    }
    let mean = ratios.iter().sum::<f64>() / ratios.len() as f64;
    (mean > 0.0).then_some(mean)
}

pub(crate) fn rescaled_range(segment: &[f64]) -> Option<f64> {
    if segment.len() < 2 {
        return None;
    }
    let len = segment.len() as f64;
    let mean = segment.iter().sum::<f64>() / len;

    let mut cumulative = 0.0;
    let mut hi = f64::NEG_INFINITY;
    let mut lo = f64::INFINITY;
    for value in segment {
        cumulative += value - mean;
        hi = hi.max(cumulative);
        lo = lo.min(cumulative);
    }

    let std = (segment.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / len).sqrt();
    if std == 0.0 {
        return None;
    }
    Some((hi - lo) / std)
}

fn regression_slope(points: &[(f64, f64)]) -> f64 {
    let n = points.len() as f64;
    let mean_x = points.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = points.iter().map(|p| p.1).sum::<f64>() / n;
    let cov: f64 = points.iter().map(|(x, y)| (x - mean_x) * (y - mean_y)).sum();
    let var: f64 = points.iter().map(|(x, _)| (x - mean_x).powi(2)).sum();
    cov / var
}
