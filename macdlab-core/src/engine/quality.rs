//! System Quality Number — the reference fitness statistic.
//!
//! SQN = sqrt(n) * mean(r) / stdev(r) over per-trade returns, using the
//! sample standard deviation. Undefined for fewer than two trades or zero
//! dispersion.

/// Compute SQN over per-trade returns. `None` when undefined.
pub fn system_quality_number(returns: &[f64]) -> Option<f64> {
    let n = returns.len();
    if n < 2 {
        return None;
    }
    let mean = returns.iter().sum::<f64>() / n as f64;
    let var = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
    let std = var.sqrt();
    if !std.is_finite() || std < 1e-15 {
        return None;
    }
    let sqn = (n as f64).sqrt() * mean / std;
    sqn.is_finite().then_some(sqn)
}
