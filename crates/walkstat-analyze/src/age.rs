//! Cold-data age cohorts.
//!
//! Cohorts are cumulative, not exclusive buckets: the total for a
//! boundary N is the sum over every row not touched for more than N days,
//! so a row older than 3650 days also counts toward 30, 90, 365 and so on.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use walkstat_core::ConfigError;
use walkstat_core::units::SECS_PER_DAY;

/// Default cohort boundaries in days.
const DEFAULT_BOUNDARIES: [u64; 7] = [30, 90, 365, 1095, 1825, 3650, 5475];

/// Validated, strictly ascending list of day boundaries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<u64>", into = "Vec<u64>")]
pub struct AgeBoundaries(Vec<u64>);

impl AgeBoundaries {
    /// Validate a boundary list.
    pub fn new(days: Vec<u64>) -> Result<Self, ConfigError> {
        if days.is_empty() {
            return Err(ConfigError::EmptyAgeBoundaries);
        }
        if days.windows(2).any(|w| w[0] >= w[1]) {
            return Err(ConfigError::UnsortedAgeBoundaries { boundaries: days });
        }
        Ok(Self(days))
    }

    /// Boundaries in ascending order.
    pub fn days(&self) -> &[u64] {
        &self.0
    }

    /// Number of boundaries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; an empty list is rejected at construction.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for AgeBoundaries {
    fn default() -> Self {
        Self(DEFAULT_BOUNDARIES.to_vec())
    }
}

impl TryFrom<Vec<u64>> for AgeBoundaries {
    type Error = ConfigError;

    fn try_from(days: Vec<u64>) -> Result<Self, Self::Error> {
        Self::new(days)
    }
}

impl From<AgeBoundaries> for Vec<u64> {
    fn from(boundaries: AgeBoundaries) -> Self {
        boundaries.0
    }
}

/// Cumulative bytes older than each boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgeHistogram {
    boundaries: AgeBoundaries,
    bytes: Vec<u64>,
}

impl AgeHistogram {
    /// Create an empty histogram.
    pub fn new(boundaries: AgeBoundaries) -> Self {
        let bytes = vec![0; boundaries.len()];
        Self { boundaries, bytes }
    }

    /// Build a histogram from `(days, bytes)` pairs.
    pub fn from_rows(boundaries: AgeBoundaries, rows: impl IntoIterator<Item = (u64, u64)>) -> Self {
        let mut histogram = Self::new(boundaries);
        for (days, bytes) in rows {
            histogram.record(days, bytes);
        }
        histogram
    }

    /// Add `bytes` to every cohort whose boundary `days` strictly exceeds.
    pub fn record(&mut self, days: u64, bytes: u64) {
        for (boundary, total) in self.boundaries.days().iter().zip(self.bytes.iter_mut()) {
            if days <= *boundary {
                break;
            }
            *total += bytes;
        }
    }

    /// `(boundary, bytes)` pairs in ascending boundary order.
    pub fn iter(&self) -> impl Iterator<Item = (u64, u64)> + '_ {
        self.boundaries
            .days()
            .iter()
            .copied()
            .zip(self.bytes.iter().copied())
    }

    /// Bytes older than exactly this boundary, if it is one.
    pub fn older_than(&self, days: u64) -> Option<u64> {
        self.iter().find(|(b, _)| *b == days).map(|(_, bytes)| bytes)
    }

    /// The boundaries this histogram was built with.
    pub fn boundaries(&self) -> &AgeBoundaries {
        &self.boundaries
    }
}

/// Whole days from `timestamp` to `reference`, floored, 0 for the future.
pub fn days_between(reference: DateTime<Utc>, timestamp: i64) -> u64 {
    let secs = reference.timestamp().saturating_sub(timestamp);
    secs.div_euclid(SECS_PER_DAY).max(0) as u64
}

/// Format a day count with its length in years.
pub fn format_age(days: u64) -> String {
    format!("{days} days (or {:.1} years)", days as f64 / 365.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_age() {
        assert_eq!(format_age(30), "30 days (or 0.1 years)");
        assert_eq!(format_age(3650), "3650 days (or 10.0 years)");
    }

    #[test]
    fn test_boundaries_validation() {
        assert_eq!(AgeBoundaries::new(vec![]), Err(ConfigError::EmptyAgeBoundaries));
        assert!(matches!(
            AgeBoundaries::new(vec![90, 30]),
            Err(ConfigError::UnsortedAgeBoundaries { .. })
        ));
        assert!(AgeBoundaries::new(vec![30, 30]).is_err());
        assert_eq!(AgeBoundaries::new(vec![1, 2]).unwrap().days(), &[1, 2]);
    }

    #[test]
    fn test_default_boundaries() {
        let boundaries = AgeBoundaries::default();
        assert_eq!(boundaries.len(), 7);
        assert_eq!(boundaries.days()[0], 30);
        assert_eq!(boundaries.days()[6], 5475);
    }

    #[test]
    fn test_record_is_strictly_greater() {
        let mut histogram = AgeHistogram::new(AgeBoundaries::new(vec![30, 90]).unwrap());
        histogram.record(30, 100);
        histogram.record(31, 10);
        histogram.record(91, 1);
        assert_eq!(histogram.older_than(30), Some(11));
        assert_eq!(histogram.older_than(90), Some(1));
        assert_eq!(histogram.older_than(45), None);
    }

    #[test]
    fn test_days_between() {
        let now = Utc.with_ymd_and_hms(2024, 1, 11, 12, 0, 0).unwrap();
        let ten_days = now.timestamp() - 10 * SECS_PER_DAY;
        assert_eq!(days_between(now, ten_days), 10);
        assert_eq!(days_between(now, ten_days + 1), 9);
        assert_eq!(days_between(now, now.timestamp() + 5000), 0);
    }

    #[test]
    fn test_boundaries_serde_validates() {
        let parsed: Result<AgeBoundaries, _> = serde_json::from_str("[365, 30]");
        assert!(parsed.is_err());
        let parsed: AgeBoundaries = serde_json::from_str("[30, 365]").unwrap();
        assert_eq!(parsed.days(), &[30, 365]);
    }
}
