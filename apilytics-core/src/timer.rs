use std::time::Instant;

const NANOS_PER_MILLI: u128 = 1_000_000;

/// Times the amount of milliseconds something takes to execute.
///
/// The timer starts when it is created and reads a monotonic clock, so wall
/// clock adjustments never produce negative or skewed measurements.
///
/// # Examples
///
/// ```
/// use apilytics_core::MilliSecondTimer;
///
/// let timer = MilliSecondTimer::start();
/// // handle the request...
/// let time_millis = timer.stop();
/// # let _ = time_millis;
/// ```
#[derive(Clone, Copy, Debug)]
pub struct MilliSecondTimer {
    started: Instant,
}

impl MilliSecondTimer {
    /// Starts a new timer.
    pub fn start() -> MilliSecondTimer {
        MilliSecondTimer {
            started: Instant::now(),
        }
    }

    /// The instant the timer was started at.
    pub fn started(&self) -> Instant {
        self.started
    }

    /// Stops the timer and returns the elapsed whole milliseconds.
    ///
    /// The value is rounded down.  Calling this again measures from the
    /// original start up to the new "now"; only the first reading describes
    /// the observed operation.
    pub fn stop(&self) -> u64 {
        self.stop_at(Instant::now())
    }

    /// Returns the whole milliseconds between the start and `end`.
    ///
    /// An `end` before the start yields `0`.
    pub fn stop_at(&self, end: Instant) -> u64 {
        let nanos = end.saturating_duration_since(self.started).as_nanos();
        u64::try_from(nanos / NANOS_PER_MILLI).unwrap_or(u64::MAX)
    }
}
