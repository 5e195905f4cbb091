use std::time::{Duration, Instant};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// Source of "now" for timers, as elapsed time since an arbitrary origin.
pub trait Clock {
    fn now(&self) -> Duration;
}

/// Native clock backed by `Instant`.
#[derive(Clone, Copy, Debug)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        MonotonicClock {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        MonotonicClock::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Trailing-edge debouncer.
///
/// Every `push` replaces the pending value and restarts the quiet window.
/// `poll` hands the value out once the window has elapsed; nothing fires on
/// its own, the owner drives it with the current time.
#[derive(Clone, Debug)]
pub struct Debouncer<T> {
    delay: Duration,
    pending: Option<(T, Duration)>,
}

impl<T> Debouncer<T> {
    pub fn new(delay: Duration) -> Self {
        Debouncer {
            delay,
            pending: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn push(&mut self, value: T, now: Duration) {
        self.pending = Some((value, now + self.delay));
    }

    /// When the pending value will be released, if there is one.
    pub fn deadline(&self) -> Option<Duration> {
        self.pending.as_ref().map(|(_, deadline)| *deadline)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn poll(&mut self, now: Duration) -> Option<T> {
        match self.pending {
            Some((_, deadline)) if now >= deadline => self.pending.take().map(|(v, _)| v),
            _ => None,
        }
    }

    /// Release the pending value immediately.
    pub fn flush(&mut self) -> Option<T> {
        self.pending.take().map(|(v, _)| v)
    }

    /// Drop the pending value without releasing it.
    pub fn cancel(&mut self) -> bool {
        self.pending.take().is_some()
    }
}

impl<T> Default for Debouncer<T> {
    fn default() -> Self {
        Debouncer::new(DEFAULT_DEBOUNCE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn only_the_last_value_is_released() {
        let mut d = Debouncer::new(ms(300));
        d.push("d", ms(0));
        d.push("do", ms(100));
        d.push("dom", ms(250));

        assert_eq!(d.poll(ms(320)), None, "window restarted at 250ms");
        assert_eq!(d.poll(ms(550)), Some("dom"));
        assert_eq!(d.poll(ms(900)), None, "released only once");
    }

    #[test]
    fn cancel_discards_pending_value() {
        let mut d = Debouncer::new(ms(300));
        d.push(1, ms(0));
        assert!(d.cancel());
        assert!(!d.is_pending());
        assert_eq!(d.poll(ms(1000)), None);
    }

    #[test]
    fn flush_releases_early() {
        let mut d = Debouncer::new(ms(300));
        d.push(7, ms(0));
        assert_eq!(d.deadline(), Some(ms(300)));
        assert_eq!(d.flush(), Some(7));
        assert_eq!(d.deadline(), None);
    }
}
