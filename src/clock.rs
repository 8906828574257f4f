//! # Wall Clock
//!
//! The controller needs local hours for the night window and timestamps for its
//! diagnostics. Time comes from a [`ClockSource`] (the time-sync collaborator)
//! and is written into a [`WallClock`], the process-wide clock, on every resync.
//! Between resyncs the wall clock runs on the monotonic clock.

use chrono::{DateTime, FixedOffset, Utc};
use std::time::Instant;
use thiserror::Error;

/// Anything before 2001-09-09 means the host clock was never set.
const MIN_PLAUSIBLE_UNIX_SECS: i64 = 1_000_000_000;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClockError {
    /// The time source has no trustworthy time yet
    #[error("clock not synchronized (reads {0})")]
    Unsynchronized(DateTime<Utc>),

    #[error("timezone offset {0}h is not representable")]
    Offset(i32),
}

/// Fetches the current wall-clock time at the configured offset.
pub trait ClockSource {
    fn fetch_time(&mut self) -> Result<DateTime<FixedOffset>, ClockError>;
}

/// Reads the host system time, which the OS keeps in sync via NTP.
#[derive(Clone, Copy, Debug)]
pub struct SystemClockSource {
    offset: FixedOffset,
}

impl SystemClockSource {
    pub fn new(tz_offset_hours: i32) -> Result<Self, ClockError> {
        let offset = tz_offset_hours
            .checked_mul(3600)
            .and_then(FixedOffset::east_opt)
            .ok_or(ClockError::Offset(tz_offset_hours))?;
        Ok(Self { offset })
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }
}

impl ClockSource for SystemClockSource {
    fn fetch_time(&mut self) -> Result<DateTime<FixedOffset>, ClockError> {
        let now = Utc::now();
        if now.timestamp() < MIN_PLAUSIBLE_UNIX_SECS {
            return Err(ClockError::Unsynchronized(now));
        }
        Ok(now.with_timezone(&self.offset))
    }
}

/// Process-wide clock: last synced time plus monotonic time since.
#[derive(Clone, Debug, Default)]
pub struct WallClock {
    synced: Option<(DateTime<FixedOffset>, Instant)>,
}

impl WallClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write a freshly fetched time.
    pub fn set(&mut self, time: DateTime<FixedOffset>) {
        self.synced = Some((time, Instant::now()));
    }

    pub fn is_set(&self) -> bool {
        self.synced.is_some()
    }

    /// Current local time, `None` before the first sync.
    pub fn now(&self) -> Option<DateTime<FixedOffset>> {
        let (time, at) = self.synced.as_ref()?;
        let elapsed =
            chrono::Duration::from_std(at.elapsed()).unwrap_or_else(|_| chrono::Duration::zero());
        Some(*time + elapsed)
    }
}

/// `HH:MM:SS` for log lines.
pub fn clock_label(time: &DateTime<FixedOffset>) -> String {
    time.format("%H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    #[test]
    fn test_system_source_applies_offset() {
        let mut source = SystemClockSource::new(2).unwrap();
        let now = source.fetch_time().unwrap();
        assert_eq!(now.offset().local_minus_utc(), 7200);
        assert!(now.timestamp() > MIN_PLAUSIBLE_UNIX_SECS);
    }

    #[test]
    fn test_invalid_offset() {
        assert_eq!(
            SystemClockSource::new(30).unwrap_err(),
            ClockError::Offset(30)
        );
        assert!(SystemClockSource::new(-23).is_ok());
    }

    #[test]
    fn test_wall_clock_tracks_synced_time() {
        let mut clock = WallClock::new();
        assert!(!clock.is_set());
        assert_eq!(clock.now(), None);

        let offset = FixedOffset::east_opt(3600).unwrap();
        let synced = offset.with_ymd_and_hms(2024, 3, 1, 8, 15, 0).unwrap();
        clock.set(synced);

        let now = clock.now().unwrap();
        assert!(now >= synced);
        assert_eq!(now.hour(), 8);
        assert_eq!(now.offset(), &offset);
    }

    #[test]
    fn test_clock_label() {
        let offset = FixedOffset::east_opt(0).unwrap();
        let time = offset.with_ymd_and_hms(2024, 3, 1, 7, 5, 9).unwrap();
        assert_eq!(clock_label(&time), "07:05:09");
    }
}
