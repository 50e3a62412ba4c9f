//! Crossover detection over paired numeric sequences.
//!
//! A cross needs a strict sign change of `a - b` across one adjacent pair of
//! bars: `a < b` on the previous bar and `a > b` on the current one (or the
//! reverse). Touching the other line, or running along it, is not a cross.
//! Any NaN in the pair yields [`Cross::None`].

use serde::{Deserialize, Serialize};

/// Classification of one adjacent pair of bars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Cross {
    /// `a` moved from strictly below `b` to strictly above it.
    Up,
    /// `a` moved from strictly above `b` to strictly below it.
    Down,
    #[default]
    None,
}

/// Classify the pair (previous, current) of two series.
pub fn detect(prev_a: f64, prev_b: f64, cur_a: f64, cur_b: f64) -> Cross {
    if prev_a < prev_b && cur_a > cur_b {
        Cross::Up
    } else if prev_a > prev_b && cur_a < cur_b {
        Cross::Down
    } else {
        Cross::None
    }
}

/// Lazy crossover stream over two aligned series.
///
/// Yields one [`Cross`] per adjacent pair, so `min(a.len(), b.len()) - 1`
/// items. The item for pair `(t-1, t)` reads nothing past index `t`.
pub fn crossovers<'a>(a: &'a [f64], b: &'a [f64]) -> impl Iterator<Item = Cross> + 'a {
    a.windows(2)
        .zip(b.windows(2))
        .map(|(wa, wb)| detect(wa[0], wb[0], wa[1], wb[1]))
}

/// Lazy crossover stream of a series against a constant level (e.g. zero).
pub fn crossovers_with_level(a: &[f64], level: f64) -> impl Iterator<Item = Cross> + '_ {
    a.windows(2).map(move |w| detect(w[0], level, w[1], level))
}
