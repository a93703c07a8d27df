use c5_canonical::Timestamp;

/// Source of the current time.
///
/// Passed explicitly so tests can pin envelope timestamps.
pub trait Clock {
    /// Current instant.
    fn now(&self) -> Timestamp;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// Clock that always returns the same instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub Timestamp);

impl FixedClock {
    /// Fixed clock at `millis` since the Unix epoch.
    pub fn at_millis(millis: i64) -> Option<Self> {
        Timestamp::from_millis(millis).map(Self)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_is_stable() {
        let clock = FixedClock::at_millis(1_624_140_000_000).unwrap();
        assert_eq!(clock.now(), clock.now());
        assert_eq!(clock.now().as_millis(), 1_624_140_000_000);
    }

    #[test]
    fn system_clock_reports_wall_time() {
        let reference = Timestamp::now().as_millis();
        let now = SystemClock.now().as_millis();
        assert!((now - reference).abs() < 60_000);
    }
}
