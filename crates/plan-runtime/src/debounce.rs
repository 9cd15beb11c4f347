//! Trailing-edge debouncer driven by caller-supplied instants.

use std::time::{Duration, Instant};

/// Coalesces bursts of events into one firing `window` after the last one.
#[derive(Clone, Debug)]
pub struct Debouncer {
    window: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            deadline: None,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Record an event; a newer event supersedes the pending one.
    pub fn schedule(&mut self, now: Instant) {
        self.deadline = Some(now + self.window);
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// True exactly once when the window has elapsed since the last event.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(d) if now >= d => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    /// Drop the pending firing; returns whether one was pending.
    pub fn cancel(&mut self) -> bool {
        self.deadline.take().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn fires_once_after_quiet_window() {
        let t0 = Instant::now();
        let mut d = Debouncer::new(Duration::from_millis(300));
        assert!(!d.poll(t0));
        d.schedule(t0);
        assert!(!d.poll(t0 + Duration::from_millis(299)));
        assert!(d.poll(t0 + Duration::from_millis(300)));
        assert!(!d.poll(t0 + Duration::from_millis(900)));
    }

    #[test]
    fn later_event_pushes_deadline() {
        let t0 = Instant::now();
        let mut d = Debouncer::new(Duration::from_millis(300));
        d.schedule(t0);
        d.schedule(t0 + Duration::from_millis(200));
        assert!(!d.poll(t0 + Duration::from_millis(400)));
        assert!(d.poll(t0 + Duration::from_millis(500)));
    }

    #[test]
    fn cancel_clears_pending() {
        let t0 = Instant::now();
        let mut d = Debouncer::new(Duration::from_millis(10));
        assert!(!d.cancel());
        d.schedule(t0);
        assert!(d.cancel());
        assert!(!d.poll(t0 + Duration::from_secs(1)));
    }

    proptest! {
        #[test]
        fn burst_fires_once(gaps in proptest::collection::vec(0u64..300, 1..30)) {
            let t0 = Instant::now();
            let mut d = Debouncer::new(Duration::from_millis(300));
            let mut t = t0;
            let mut fired = 0;
            for g in gaps {
                t += Duration::from_millis(g);
                if d.poll(t) { fired += 1; }
                d.schedule(t);
            }
            // every gap is shorter than the window, so nothing fires mid-burst
            prop_assert_eq!(fired, 0);
            prop_assert!(d.poll(t + Duration::from_millis(300)));
        }
    }
}
