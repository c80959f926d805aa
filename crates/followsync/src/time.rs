use core::time::Duration;
use std::time::{SystemTime, UNIX_EPOCH};

/// Cloud projects count time from Saturday, January 1, 2000 00:00:00 UTC.
pub const CLOUD_EPOCH: Duration = Duration::from_millis(946_684_800_000);

/// A trait for time sources that return a wall-clock timestamp.
///
/// The unit is **milliseconds** relative to a configurable origin. The
/// dispatcher's cooldown gate, the cache TTL and the liveness slot all read
/// time through this trait so tests can drive them with a mock clock.
///
/// # Example
///
/// ```
/// use followsync::TimeSource;
///
/// struct FixedTime;
/// impl TimeSource for FixedTime {
///     fn current_millis(&self) -> u64 {
///         1234
///     }
/// }
///
/// assert_eq!(FixedTime.current_millis(), 1234);
/// ```
pub trait TimeSource {
    /// Returns the current time in milliseconds since the configured epoch.
    fn current_millis(&self) -> u64;
}

impl<T: TimeSource + ?Sized> TimeSource for std::sync::Arc<T> {
    fn current_millis(&self) -> u64 {
        (**self).current_millis()
    }
}

/// Wall-clock time source offset to a fixed epoch.
#[derive(Clone, Copy, Debug)]
pub struct SystemClock {
    epoch: Duration,
}

impl Default for SystemClock {
    /// Constructs a clock aligned to [`CLOUD_EPOCH`].
    fn default() -> Self {
        Self::with_epoch(CLOUD_EPOCH)
    }
}

impl SystemClock {
    /// Constructs a clock whose zero point is `epoch`, given as a [`Duration`]
    /// since 1970-01-01 UTC.
    pub const fn with_epoch(epoch: Duration) -> Self {
        Self { epoch }
    }

    /// Whole seconds elapsed since the epoch.
    pub fn current_secs(&self) -> u64 {
        self.current_millis() / 1000
    }
}

impl TimeSource for SystemClock {
    /// Returns milliseconds since the epoch, saturating at zero if the system
    /// clock reads earlier than the epoch.
    fn current_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .saturating_sub(self.epoch)
            .as_millis() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cloud_epoch_clock_reads_after_the_unix_epoch_clock_origin() {
        let unix = SystemClock::with_epoch(Duration::ZERO).current_millis();
        let cloud = SystemClock::default().current_millis();
        let offset = unix - cloud;
        // Allow for the two reads straddling a millisecond tick.
        assert!(offset.abs_diff(CLOUD_EPOCH.as_millis() as u64) <= 5);
    }

    #[test]
    fn seconds_are_whole_milliseconds_divided_down() {
        let clock = SystemClock::default();
        let secs = clock.current_secs();
        let millis = clock.current_millis();
        assert!(millis / 1000 >= secs);
    }
}
