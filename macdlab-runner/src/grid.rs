//! Parameter grid: three inclusive period ranges and a constraint.

use serde::{Deserialize, Serialize};

use macdlab_core::domain::ParameterSet;

/// Inclusive integer range with a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodRange {
    pub start: usize,
    pub end: usize,
    #[serde(default = "default_step")]
    pub step: usize,
}

fn default_step() -> usize {
    1
}

impl PeriodRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end, step: 1 }
    }

    pub fn with_step(mut self, step: usize) -> Self {
        self.step = step;
        self
    }

    /// Every value in the range, ascending. Empty when `start > end` or
    /// `step == 0`.
    pub fn values(&self) -> Vec<usize> {
        if self.step == 0 || self.start > self.end {
            return Vec::new();
        }
        (self.start..=self.end).step_by(self.step).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.step == 0 || self.start > self.end
    }
}

/// Predicate a grid point must satisfy to be evaluated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Constraint {
    /// fast < slow.
    #[default]
    FastBelowSlow,
    /// slow - fast >= spread (and fast < slow).
    MinSpread { spread: usize },
    /// Every combination. Points with fast >= slow are still evaluated and
    /// recorded with undefined fitness.
    None,
}

impl Constraint {
    pub fn allows(&self, params: &ParameterSet) -> bool {
        match *self {
            Self::FastBelowSlow => params.fast_period < params.slow_period,
            Self::MinSpread { spread } => {
                params.fast_period < params.slow_period
                    && params.slow_period - params.fast_period >= spread
            }
            Self::None => true,
        }
    }
}

/// The 3-D search space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParamGrid {
    pub fast: PeriodRange,
    pub slow: PeriodRange,
    pub signal: PeriodRange,
    pub constraint: Constraint,
}

impl Default for ParamGrid {
    /// 5..=50 on every axis with fast < slow.
    fn default() -> Self {
        Self {
            fast: PeriodRange::new(5, 50),
            slow: PeriodRange::new(5, 50),
            signal: PeriodRange::new(5, 50),
            constraint: Constraint::FastBelowSlow,
        }
    }
}

impl ParamGrid {
    pub fn new(fast: PeriodRange, slow: PeriodRange, signal: PeriodRange) -> Self {
        Self {
            fast,
            slow,
            signal,
            constraint: Constraint::FastBelowSlow,
        }
    }

    pub fn with_constraint(mut self, constraint: Constraint) -> Self {
        self.constraint = constraint;
        self
    }

    /// Number of grid points before the constraint is applied.
    pub fn raw_size(&self) -> usize {
        self.fast.values().len() * self.slow.values().len() * self.signal.values().len()
    }

    /// All points satisfying the constraint, in (fast, slow, signal) order.
    /// Unique by construction.
    pub fn combinations(&self) -> Vec<ParameterSet> {
        let slows = self.slow.values();
        let signals = self.signal.values();
        let mut out = Vec::new();
        for fast in self.fast.values() {
            for &slow in &slows {
                for &signal in &signals {
                    let params = ParameterSet::new(fast, slow, signal);
                    if self.constraint.allows(&params) {
                        out.push(params);
                    }
                }
            }
        }
        out
    }

    pub fn size(&self) -> usize {
        self.combinations().len()
    }

    /// Reject empty ranges and zero periods.
    pub fn validate(&self) -> Result<(), String> {
        for (name, range) in [("fast", self.fast), ("slow", self.slow), ("signal", self.signal)] {
            if range.step == 0 {
                return Err(format!("{name} range has zero step"));
            }
            if range.start > range.end {
                return Err(format!(
                    "{name} range is empty ({}..={})",
                    range.start, range.end
                ));
            }
            if range.start == 0 {
                return Err(format!("{name} range starts at zero"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_values_inclusive_with_step() {
        assert_eq!(PeriodRange::new(5, 9).values(), vec![5, 6, 7, 8, 9]);
        assert_eq!(PeriodRange::new(5, 20).with_step(5).values(), vec![5, 10, 15, 20]);
        assert!(PeriodRange::new(9, 5).values().is_empty());
        assert!(PeriodRange::new(1, 5).with_step(0).values().is_empty());
    }

    #[test]
    fn default_grid_size() {
        // 46 values per axis; C(46, 2) fast/slow pairs times 46 signals.
        let grid = ParamGrid::default();
        assert_eq!(grid.raw_size(), 46 * 46 * 46);
        assert_eq!(grid.size(), 1035 * 46);
    }

    #[test]
    fn combinations_are_ordered_and_constrained() {
        let grid = ParamGrid::new(
            PeriodRange::new(2, 4),
            PeriodRange::new(3, 5),
            PeriodRange::new(1, 2),
        );
        let combos = grid.combinations();
        assert!(combos.iter().all(|p| p.fast_period < p.slow_period));
        assert!(combos.windows(2).all(|w| w[0] < w[1]));
        // (2,3),(2,4),(2,5),(3,4),(3,5),(4,5) × 2 signals
        assert_eq!(combos.len(), 12);
    }

    #[test]
    fn min_spread_and_none() {
        let base = ParamGrid::new(
            PeriodRange::new(1, 5),
            PeriodRange::new(1, 5),
            PeriodRange::new(1, 1),
        );
        let spread = base.clone().with_constraint(Constraint::MinSpread { spread: 3 });
        assert_eq!(
            spread.combinations(),
            vec![
                ParameterSet::new(1, 4, 1),
                ParameterSet::new(1, 5, 1),
                ParameterSet::new(2, 5, 1),
            ]
        );
        assert_eq!(base.with_constraint(Constraint::None).size(), 25);
    }

    #[test]
    fn no_point_satisfies_fast_below_slow() {
        let grid = ParamGrid::new(
            PeriodRange::new(20, 30),
            PeriodRange::new(5, 10),
            PeriodRange::new(3, 9),
        );
        assert!(grid.combinations().is_empty());
    }

    #[test]
    fn validate_rejects_bad_ranges() {
        let mut grid = ParamGrid::default();
        assert!(grid.validate().is_ok());
        grid.fast = PeriodRange::new(0, 10);
        assert!(grid.validate().is_err());
        grid.fast = PeriodRange::new(10, 5);
        assert!(grid.validate().is_err());
    }
}
