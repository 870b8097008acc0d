//! Advisory reward estimates.
//!
//! The ledger program computes the authoritative reward when it accepts a
//! job; the figure here is for display only. Rewards are kept in base units
//! (1 MINT = 10^9 units) so the estimate is exact.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Base units per MINT.
pub const UNITS_PER_MINT: u64 = 1_000_000_000;

/// MINT earned per second of work at reference complexity.
pub const UNIT_RATE: f64 = 0.005;

/// Complexity weight that scales the rate by exactly 1.0.
pub const REFERENCE_COMPLEXITY: u32 = 1000;

/// Base units per second per complexity point:
/// `UNIT_RATE * UNITS_PER_MINT / REFERENCE_COMPLEXITY`.
const UNITS_PER_SECOND_PER_COMPLEXITY: u64 = 5_000;

/// An amount of MINT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Reward {
    units: u64,
}

impl Reward {
    /// Nothing.
    pub const ZERO: Self = Self { units: 0 };

    /// Create from base units.
    #[must_use]
    pub const fn from_units(units: u64) -> Self {
        Self { units }
    }

    /// Estimate `duration * UNIT_RATE * complexity / REFERENCE_COMPLEXITY`.
    /// Saturates instead of overflowing.
    #[must_use]
    pub const fn estimate(duration_secs: u64, complexity: u32) -> Self {
        Self {
            units: duration_secs
                .saturating_mul(complexity as u64)
                .saturating_mul(UNITS_PER_SECOND_PER_COMPLEXITY),
        }
    }

    /// Base units.
    #[must_use]
    pub const fn units(&self) -> u64 {
        self.units
    }

    /// Decimal MINT.
    #[must_use]
    pub fn as_mint(&self) -> f64 {
        self.units as f64 / UNITS_PER_MINT as f64
    }

    /// Whether the amount is zero.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.units == 0
    }
}

impl fmt::Display for Reward {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3} MINT", self.as_mint())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_unit_rate_consistent() {
        let derived = UNIT_RATE * UNITS_PER_MINT as f64 / f64::from(REFERENCE_COMPLEXITY);
        assert!((derived - UNITS_PER_SECOND_PER_COMPLEXITY as f64).abs() < f64::EPSILON);
    }

    #[test_case(200, 1000, 1.0; "reference complexity")]
    #[test_case(200, 2000, 2.0; "double complexity")]
    #[test_case(10, 1000, 0.05; "ten seconds")]
    #[test_case(1, 500, 0.0025; "half complexity")]
    #[test_case(0, 1000, 0.0; "zero duration")]
    fn test_estimate(duration: u64, complexity: u32, expected: f64) {
        let reward = Reward::estimate(duration, complexity);
        assert!((reward.as_mint() - expected).abs() < 1e-12);
    }

    #[test]
    fn test_display_three_decimals() {
        assert_eq!(Reward::estimate(200, 1000).to_string(), "1.000 MINT");
        assert_eq!(Reward::estimate(10, 1000).to_string(), "0.050 MINT");
    }

    #[test]
    fn test_estimate_saturates() {
        assert_eq!(Reward::estimate(u64::MAX, u32::MAX).units(), u64::MAX);
    }

    #[test]
    fn test_zero() {
        assert!(Reward::ZERO.is_zero());
        assert!(Reward::estimate(0, 1000).is_zero());
    }

    #[test]
    fn test_serialization() {
        let reward = Reward::from_units(42);
        let json = serde_json::to_string(&reward).expect("serialize");
        let parsed: Reward = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(reward, parsed);
    }
}
