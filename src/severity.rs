//! # Severity Bands
//!
//! Maps the integer part of a glucose reading to one of three color classes.
//! Four ascending thresholds split the integer line into five half-open bands,
//! evaluated lowest first:
//!
//! | band                          | severity           |
//! |-------------------------------|--------------------|
//! | `v < urgent_low`              | `UrgentOutOfRange` |
//! | `urgent_low <= v < low`       | `OutOfRange`       |
//! | `low <= v < high`             | `InRange`          |
//! | `high <= v < urgent_high`     | `OutOfRange`       |
//! | `v >= urgent_high`            | `UrgentOutOfRange` |
//!
//! Both ends are urgent, so a very low and a very high value share a color.

use serde::{Deserialize, Serialize};

/// Default urgent-low boundary (mmol/L integer part).
pub const URGENT_LOW: i32 = 3;
/// Default low boundary.
pub const LOW: i32 = 4;
/// Default high boundary.
pub const HIGH: i32 = 9;
/// Default urgent-high boundary.
pub const URGENT_HIGH: i32 = 12;

// Defaults must stay strictly ascending
const _: () = assert!(URGENT_LOW < LOW);
const _: () = assert!(LOW < HIGH);
const _: () = assert!(HIGH < URGENT_HIGH);

/// Color class of a glucose value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Severity {
    UrgentOutOfRange,
    OutOfRange,
    InRange,
}

/// The four band boundaries, each compared against the reading's integer part.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Thresholds {
    pub urgent_low: i32,
    pub low: i32,
    pub high: i32,
    pub urgent_high: i32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Thresholds {
            urgent_low: URGENT_LOW,
            low: LOW,
            high: HIGH,
            urgent_high: URGENT_HIGH,
        }
    }
}

impl Thresholds {
    /// True when `urgent_low < low < high < urgent_high`.
    pub fn is_strictly_increasing(&self) -> bool {
        self.urgent_low < self.low && self.low < self.high && self.high < self.urgent_high
    }

    /// Classify a value. Total over all integers; first matching band wins.
    ///
    /// # Example
    /// ```
    /// use glucose_matrix_lib::severity::{Severity, Thresholds};
    ///
    /// let thresholds = Thresholds::default(); // 3 / 4 / 9 / 12
    /// assert_eq!(thresholds.classify(2), Severity::UrgentOutOfRange);
    /// assert_eq!(thresholds.classify(3), Severity::OutOfRange);
    /// assert_eq!(thresholds.classify(9), Severity::OutOfRange);
    /// assert_eq!(thresholds.classify(8), Severity::InRange);
    /// assert_eq!(thresholds.classify(12), Severity::UrgentOutOfRange);
    /// ```
    pub fn classify(&self, value: i32) -> Severity {
        if value < self.urgent_low {
            Severity::UrgentOutOfRange
        } else if value < self.low {
            Severity::OutOfRange
        } else if value < self.high {
            Severity::InRange
        } else if value < self.urgent_high {
            Severity::OutOfRange
        } else {
            Severity::UrgentOutOfRange
        }
    }
}
