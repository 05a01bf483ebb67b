use std::thread;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Ready,
    TimedOut,
}

/// Polls a condition until it holds or the timeout elapses.
#[derive(Debug, Clone, Copy)]
pub struct BoundedWait {
    pub poll_interval: Duration,
    pub timeout: Duration,
}

impl BoundedWait {
    pub fn new(poll_interval: Duration, timeout: Duration) -> Self {
        Self {
            poll_interval,
            timeout,
        }
    }

    /// The condition is always checked at least once.
    pub fn wait_until<F>(&self, mut ready: F) -> WaitOutcome
    where
        F: FnMut() -> bool,
    {
        let deadline = Instant::now() + self.timeout;
        loop {
            if ready() {
                return WaitOutcome::Ready;
            }
            let now = Instant::now();
            if now >= deadline {
                return WaitOutcome::TimedOut;
            }
            thread::sleep(self.poll_interval.min(deadline - now));
        }
    }
}

pub fn pause(duration: Duration) {
    if !duration.is_zero() {
        thread::sleep(duration);
    }
}
