//! Logistic-map sequences used to scatter coefficient picks.

use serde::{Deserialize, Serialize};

use crate::error::{Result, StegoError};

/// Lower edge of the chaotic regime of the logistic map.
pub const MU_CHAOS_EDGE: f64 = 3.57;

/// Iterates checked by [`LogisticParams::validate`] for a collapsing orbit.
const WARMUP: usize = 64;

/// Seed and control parameter of a logistic map, `x' = mu * x * (1 - x)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LogisticParams {
    pub seed: f64,
    pub mu: f64,
}

impl LogisticParams {
    pub fn new(seed: f64, mu: f64) -> Self {
        LogisticParams { seed, mu }
    }

    /// Checks `0 < seed < 1`, `3.57 < mu <= 4`, and that the orbit does not fall into
    /// 0, 1 or the fixed point `1 - 1/mu` within the first iterates. A stuck orbit would
    /// turn every selection into a plain scan.
    pub fn validate(&self) -> Result<()> {
        if !(self.seed > 0.0 && self.seed < 1.0) {
            return Err(StegoError::InvalidConfig(format!(
                "logistic seed must lie strictly between 0 and 1, got {}",
                self.seed
            )));
        }
        if !(self.mu > MU_CHAOS_EDGE && self.mu <= 4.0) {
            return Err(StegoError::InvalidConfig(format!(
                "logistic mu must lie in ({MU_CHAOS_EDGE}, 4], got {}",
                self.mu
            )));
        }

        let fixed_point = 1.0 - 1.0 / self.mu;
        let mut map = self.map();
        let mut x = self.seed;
        for i in 0..=WARMUP {
            if x <= 0.0 || x >= 1.0 || (x - fixed_point).abs() < 1e-9 {
                return Err(StegoError::InvalidConfig(format!(
                    "logistic orbit from seed {} with mu {} collapses after {i} steps",
                    self.seed, self.mu
                )));
            }
            x = map.step();
        }
        Ok(())
    }

    /// Fresh generator positioned at the seed.
    pub fn map(&self) -> LogisticMap {
        LogisticMap {
            x: self.seed,
            mu: self.mu,
        }
    }
}

impl Default for LogisticParams {
    fn default() -> Self {
        LogisticParams { seed: 0.5, mu: 3.99 }
    }
}

/// Stateful logistic map. Owned by a single selection call, never shared.
#[derive(Debug, Clone)]
pub struct LogisticMap {
    x: f64,
    mu: f64,
}

impl LogisticMap {
    /// Advances the map and returns the new value in `[0, 1]`.
    pub fn step(&mut self) -> f64 {
        self.x = self.mu * self.x * (1.0 - self.x);
        self.x
    }

    /// Maps the next value to an index in `0..len`.
    pub fn next_index(&mut self, len: usize) -> usize {
        let x = self.step();
        ((x * len as f64) as usize).min(len.saturating_sub(1))
    }
}

impl Iterator for LogisticMap {
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        Some(self.step())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_sequence() {
        let params = LogisticParams::new(0.42, 3.99);
        let a: Vec<f64> = params.map().take(500).collect();
        let b: Vec<f64> = params.map().take(500).collect();
        assert_eq!(a, b);
        assert!(a.iter().all(|x| (0.0..=1.0).contains(x)));
    }

    #[test]
    fn nearby_seeds_diverge() {
        let a: Vec<f64> = LogisticParams::new(0.42, 3.99).map().take(80).collect();
        let b: Vec<f64> = LogisticParams::new(0.42 + 1e-9, 3.99).map().take(80).collect();
        assert!(a[60..].iter().zip(&b[60..]).any(|(x, y)| (x - y).abs() > 1e-3));
    }

    #[test]
    fn first_value_matches_recurrence() {
        let mut map = LogisticParams::new(0.5, 3.99).map();
        assert!((map.step() - 0.9975).abs() < 1e-12);
    }

    #[test]
    fn index_stays_in_range() {
        let mut map = LogisticParams::new(0.5, 4.0).map();
        for _ in 0..100 {
            assert!(map.next_index(17) < 17);
        }
        assert_eq!(map.next_index(0), 0);
    }

    #[test]
    fn rejects_non_chaotic_parameters() {
        assert!(LogisticParams::new(0.0, 3.9).validate().is_err());
        assert!(LogisticParams::new(1.0, 3.9).validate().is_err());
        assert!(LogisticParams::new(0.3, 3.5).validate().is_err());
        assert!(LogisticParams::new(0.3, 4.01).validate().is_err());
        assert!(LogisticParams::new(0.3, 4.0).validate().is_ok());
        assert!(LogisticParams::default().validate().is_ok());
    }

    #[test]
    fn rejects_collapsing_orbits() {
        // 0.5 -> 1.0 -> 0.0 -> 0.0 ...
        let err = LogisticParams::new(0.5, 4.0).validate().unwrap_err();
        assert!(matches!(err, StegoError::InvalidConfig(_)));

        let mu = 3.9;
        assert!(LogisticParams::new(1.0 - 1.0 / mu, mu).validate().is_err());
        // 0.25 -> 0.75, the fixed point of mu = 4
        assert!(LogisticParams::new(0.25, 4.0).validate().is_err());
        assert!(LogisticParams::new(0.5, 3.99).validate().is_ok());
    }
}
