//! Fixed-cadence pass scheduling
//!
//! Passes start on an absolute tick: `next_run` starts at the current time
//! and advances by exactly one interval after every pass. The wait before the
//! next pass is whatever is left of the interval, so the time a pass takes
//! never accumulates as drift.

use crate::error::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

/// Source of time and the ability to wait
pub trait Clock {
    /// Current instant
    fn now(&self) -> Instant;
    /// Block for `duration`
    fn sleep(&self, duration: Duration);
}

/// Wall clock backed by `std::thread::sleep`
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Instant {
        (**self).now()
    }

    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration);
    }
}

/// Drives passes at a fixed cadence, or exactly once
#[derive(Debug)]
pub struct Scheduler<C> {
    interval: Duration,
    one_shot: bool,
    clock: C,
    next_run: Instant,
    cancel: Option<Arc<AtomicBool>>,
    passes: u64,
}

impl<C: Clock> Scheduler<C> {
    /// Create a scheduler whose first pass is due now
    pub fn new(interval: Duration, one_shot: bool, clock: C) -> Self {
        let next_run = clock.now();
        Self {
            interval,
            one_shot,
            clock,
            next_run,
            cancel: None,
            passes: 0,
        }
    }

    /// Stop before the next pass once `flag` is set
    #[must_use]
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Passes run so far
    #[must_use]
    pub const fn passes(&self) -> u64 {
        self.passes
    }

    /// Instant the next pass is due at
    #[must_use]
    pub const fn next_run(&self) -> Instant {
        self.next_run
    }

    /// Run `pass` until one-shot completion or cancellation
    ///
    /// # Errors
    ///
    /// Returns the first error `pass` returns; no further passes run.
    pub fn run<F>(&mut self, mut pass: F) -> Result<()>
    where
        F: FnMut() -> Result<()>,
    {
        loop {
            if self.is_cancelled() {
                info!("Cancelled after {} passes", self.passes);
                return Ok(());
            }

            pass()?;
            self.passes += 1;

            if self.one_shot {
                return Ok(());
            }

            let wait = self.advance();
            info!("Sleeping {:?} until next pass", wait);
            self.clock.sleep(wait);
        }
    }

    /// Move `next_run` one interval ahead and return how long to wait for it
    pub fn advance(&mut self) -> Duration {
        self.next_run += self.interval;
        self.next_run.saturating_duration_since(self.clock.now())
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::error::SyncError;
    use std::cell::{Cell, RefCell};

    /// Clock that only moves when told to
    struct ManualClock {
        now: Cell<Instant>,
        sleeps: RefCell<Vec<Duration>>,
    }

    impl ManualClock {
        fn new() -> Self {
            Self {
                now: Cell::new(Instant::now()),
                sleeps: RefCell::new(Vec::new()),
            }
        }

        fn advance(&self, by: Duration) {
            self.now.set(self.now.get() + by);
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Instant {
            self.now.get()
        }

        fn sleep(&self, duration: Duration) {
            self.sleeps.borrow_mut().push(duration);
            self.advance(duration);
        }
    }

    const INTERVAL: Duration = Duration::from_secs(10);

    #[test]
    fn test_one_shot_runs_once_without_sleeping() {
        let clock = ManualClock::new();
        let mut scheduler = Scheduler::new(INTERVAL, true, &clock);
        let mut calls = 0;

        scheduler
            .run(|| {
                calls += 1;
                Ok(())
            })
            .unwrap();

        assert_eq!(calls, 1);
        assert_eq!(scheduler.passes(), 1);
        assert!(clock.sleeps.borrow().is_empty());
    }

    #[test]
    fn test_pass_duration_is_subtracted_from_wait() {
        let clock = ManualClock::new();
        let start = clock.now();
        let cancel = Arc::new(AtomicBool::new(false));
        let mut scheduler =
            Scheduler::new(INTERVAL, false, &clock).with_cancel_flag(Arc::clone(&cancel));
        let mut starts = Vec::new();

        scheduler
            .run(|| {
                starts.push(clock.now() - start);
                clock.advance(Duration::from_secs(3));
                if starts.len() == 3 {
                    cancel.store(true, Ordering::SeqCst);
                }
                Ok(())
            })
            .unwrap();

        assert_eq!(
            starts,
            vec![Duration::ZERO, INTERVAL, INTERVAL * 2],
            "passes must start on the interval grid"
        );
        assert_eq!(*clock.sleeps.borrow(), vec![Duration::from_secs(7); 3]);
    }

    #[test]
    fn test_overrunning_pass_does_not_wait() {
        let clock = ManualClock::new();
        let cancel = Arc::new(AtomicBool::new(false));
        let mut scheduler =
            Scheduler::new(INTERVAL, false, &clock).with_cancel_flag(Arc::clone(&cancel));
        let mut passes = 0;

        scheduler
            .run(|| {
                passes += 1;
                clock.advance(Duration::from_secs(25));
                if passes == 2 {
                    cancel.store(true, Ordering::SeqCst);
                }
                Ok(())
            })
            .unwrap();

        assert_eq!(*clock.sleeps.borrow(), vec![Duration::ZERO, Duration::ZERO]);
    }

    #[test]
    fn test_failing_pass_stops_the_loop() {
        let clock = ManualClock::new();
        let mut scheduler = Scheduler::new(INTERVAL, false, &clock);
        let mut calls = 0;

        let result = scheduler.run(|| {
            calls += 1;
            if calls == 2 {
                Err(SyncError::FileSystem("boom".to_string()))
            } else {
                Ok(())
            }
        });

        assert!(result.is_err());
        assert_eq!(calls, 2);
        assert_eq!(scheduler.passes(), 1);
    }

    #[test]
    fn test_cancelled_before_first_pass() {
        let clock = ManualClock::new();
        let cancel = Arc::new(AtomicBool::new(true));
        let mut scheduler = Scheduler::new(INTERVAL, false, &clock).with_cancel_flag(cancel);
        let mut calls = 0;

        scheduler
            .run(|| {
                calls += 1;
                Ok(())
            })
            .unwrap();

        assert_eq!(calls, 0);
    }

    #[test]
    fn test_advance_moves_on_absolute_grid() {
        let clock = ManualClock::new();
        let first = clock.now();
        let mut scheduler = Scheduler::new(INTERVAL, false, &clock);

        clock.advance(Duration::from_secs(4));
        assert_eq!(scheduler.advance(), Duration::from_secs(6));
        assert_eq!(scheduler.next_run(), first + INTERVAL);
    }
}
