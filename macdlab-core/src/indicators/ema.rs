//! Exponential Moving Average (EMA).
//!
//! Recursive: EMA[t] = alpha * x[t] + (1 - alpha) * EMA[t-1], alpha = 2 / (N + 1).
//! Seed: the SMA of the first N defined inputs, placed on the N-th of them.
//! Leading NaN inputs are skipped, so an EMA can be stacked on another
//! indicator's output (the MACD signal line is an EMA of the MACD line).

/// Compute an EMA over `values`.
///
/// The output has the same length as the input. Positions before the seed
/// are NaN. A NaN met after the first defined input taints every later value.
pub fn ema_of_series(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];

    if period == 0 {
        return result;
    }

    let start = match values.iter().position(|v| !v.is_nan()) {
        Some(s) => s,
        None => return result,
    };
    if n - start < period {
        return result;
    }

    let alpha = 2.0 / (period as f64 + 1.0);

    // Seed: SMA of first `period` defined values
    let mut sum = 0.0;
    for &v in &values[start..start + period] {
        if v.is_nan() {
            return result; // NaN in seed window → all NaN
        }
        sum += v;
    }
    let seed_index = start + period - 1;
    let seed = sum / period as f64;
    result[seed_index] = seed;

    let mut prev = seed;
    for i in (seed_index + 1)..n {
        if values[i].is_nan() {
            for val in result.iter_mut().skip(i) {
                *val = f64::NAN;
            }
            return result;
        }
        let ema = alpha * values[i] + (1.0 - alpha) * prev;
        result[i] = ema;
        prev = ema;
    }

    result
}
