//! Threshold evaluation helpers.
//!
//! Three shapes cover every policy in the catalogue: a simple threshold
//! (inclusive on the triggering side), a hysteresis band with distinct
//! up/down limits, and an age limit (exceeded strictly after max age).
//! All are pure comparisons; evaluators own the metric fetch.

use crate::error::{Result, WardenError};

/// A single inclusive limit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Threshold {
    /// Breached when the metric rises to or above the limit.
    Ceiling(f64),
    /// Breached when the metric falls to or below the limit.
    Floor(f64),
}

impl Threshold {
    /// True when the metric sits on the triggering side of the limit.
    pub fn is_breached(&self, metric: f64) -> bool {
        match *self {
            Threshold::Ceiling(limit) => metric >= limit,
            Threshold::Floor(limit) => metric <= limit,
        }
    }
}

/// Where a metric sits relative to a hysteresis band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BandSignal {
    /// At or above the high limit: act up.
    High,
    /// At or below the low limit: act down.
    Low,
    /// Inside the band: leave alone.
    Within,
}

/// Distinct up/down thresholds preventing oscillation between two actions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HysteresisBand {
    high: f64,
    low: f64,
}

impl HysteresisBand {
    /// Build a band. `high` must be strictly greater than `low`; NaN
    /// limits fail that check and are rejected with the same error.
    pub fn new(high: f64, low: f64) -> Result<Self> {
        if !(high > low) {
            return Err(WardenError::InvalidSpec(format!(
                "hysteresis band requires high > low, got high={high} low={low}"
            )));
        }
        Ok(Self { high, low })
    }

    pub fn high(&self) -> f64 {
        self.high
    }

    pub fn low(&self) -> f64 {
        self.low
    }

    /// Classify a metric against the band, inclusive at both limits.
    pub fn classify(&self, metric: f64) -> BandSignal {
        if metric >= self.high {
            BandSignal::High
        } else if metric <= self.low {
            BandSignal::Low
        } else {
            BandSignal::Within
        }
    }
}

/// Age limit for rotation/expiry policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaxAge {
    max_age_ms: i64,
}

impl MaxAge {
    pub fn from_ms(max_age_ms: i64) -> Self {
        Self { max_age_ms }
    }

    pub fn from_days(days: i64) -> Self {
        Self {
            max_age_ms: days * 24 * 60 * 60 * 1000,
        }
    }

    pub fn as_ms(&self) -> i64 {
        self.max_age_ms
    }

    /// True strictly after the age limit; an entity exactly at max age is kept.
    pub fn is_exceeded(&self, created_at_ms: i64, now_ms: i64) -> bool {
        now_ms - created_at_ms > self.max_age_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ceiling_inclusive_at_limit() {
        let t = Threshold::Ceiling(0.75);
        assert!(t.is_breached(0.75));
        assert!(t.is_breached(0.80));
        assert!(!t.is_breached(0.7499));
    }

    #[test]
    fn test_floor_inclusive_at_limit() {
        let t = Threshold::Floor(0.75);
        assert!(t.is_breached(0.75));
        assert!(t.is_breached(0.50));
        assert!(!t.is_breached(0.7501));
    }

    #[test]
    fn test_band_rejects_inverted_limits() {
        assert!(HysteresisBand::new(0.25, 0.75).is_err());
        assert!(HysteresisBand::new(0.5, 0.5).is_err());
        assert!(HysteresisBand::new(f64::NAN, 0.5).is_err());
    }

    #[test]
    fn test_band_classification() {
        let band = HysteresisBand::new(0.75, 0.25).unwrap();
        assert_eq!(band.classify(0.80), BandSignal::High);
        assert_eq!(band.classify(0.75), BandSignal::High);
        assert_eq!(band.classify(0.30), BandSignal::Within);
        assert_eq!(band.classify(0.25), BandSignal::Low);
        assert_eq!(band.classify(0.20), BandSignal::Low);
    }

    #[test]
    fn test_band_no_oscillation_on_single_crossing() {
        // A shard that split at 0.80 and settles at 0.30 must not merge.
        let band = HysteresisBand::new(0.75, 0.25).unwrap();
        assert_eq!(band.classify(0.80), BandSignal::High);
        assert_eq!(band.classify(0.30), BandSignal::Within);
    }

    #[test]
    fn test_max_age_strictly_greater() {
        let age = MaxAge::from_ms(1_000);
        assert!(!age.is_exceeded(0, 1_000));
        assert!(age.is_exceeded(0, 1_001));
        assert!(!age.is_exceeded(500, 1_400));
    }

    #[test]
    fn test_max_age_from_days() {
        let age = MaxAge::from_days(30);
        assert_eq!(age.as_ms(), 30 * 24 * 60 * 60 * 1000);
        let created = 0;
        let now = 30 * 24 * 60 * 60 * 1000;
        assert!(!age.is_exceeded(created, now));
        assert!(age.is_exceeded(created, now + 1));
    }
}
