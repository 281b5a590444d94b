//! Session clock: the only source of trial timestamps and waits.
//!
//! Live sessions use MonotonicClock. Tests and headless runs use
//! ManualClock, where every wait advances time instead of sleeping.

use crate::types::Seconds;
use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

pub trait Clock {
    /// Seconds elapsed since the session started.
    fn now(&self) -> Seconds;

    /// Block for `secs` seconds (or advance time by that much).
    fn sleep(&self, secs: Seconds);
}

/// Wall-clock time measured from construction.
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self { origin: Instant::now() }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self { Self::new() }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Seconds {
        self.origin.elapsed().as_secs_f64()
    }

    fn sleep(&self, secs: Seconds) {
        if secs > 0.0 {
            std::thread::sleep(Duration::from_secs_f64(secs));
        }
    }
}

/// Simulated time. Clones share the same counter, so a simulated
/// participant can advance the clock the task reads from.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<Seconds>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, secs: Seconds) {
        if secs > 0.0 {
            self.now.set(self.now.get() + secs);
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Seconds {
        self.now.get()
    }

    fn sleep(&self, secs: Seconds) {
        self.advance(secs);
    }
}

/// A resettable timer read against a Clock.
#[derive(Debug, Clone, Copy)]
pub struct Stopwatch {
    started_at: Seconds,
}

impl Stopwatch {
    pub fn start(clock: &dyn Clock) -> Self {
        Self { started_at: clock.now() }
    }

    pub fn elapsed(&self, clock: &dyn Clock) -> Seconds {
        clock.now() - self.started_at
    }

    pub fn reset(&mut self, clock: &dyn Clock) {
        self.started_at = clock.now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_clones_share_time() {
        let clock = ManualClock::new();
        let handle = clock.clone();

        handle.advance(2.5);
        clock.sleep(0.5);

        assert_eq!(clock.now(), 3.0);
        assert_eq!(handle.now(), 3.0);
    }

    #[test]
    fn stopwatch_resets_to_zero() {
        let clock = ManualClock::new();
        let mut watch = Stopwatch::start(&clock);

        clock.advance(10.0);
        assert_eq!(watch.elapsed(&clock), 10.0);

        watch.reset(&clock);
        clock.advance(1.0);
        assert_eq!(watch.elapsed(&clock), 1.0);
    }
}
