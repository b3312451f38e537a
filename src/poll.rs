//! Blocking try/check/wait/retry loop.
//!
//! Used for draft-copy readiness and for import tickets. There is no attempt
//! limit and no backoff: the remote operation is assumed to finish
//! eventually. Producer errors end the loop immediately and are never
//! retried.

use std::time::Duration;

/// Blocks the current thread between attempts.
pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

/// [`Sleeper`] backed by `std::thread::sleep`.
#[derive(Clone, Copy, Debug, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

impl<S: Sleeper + ?Sized> Sleeper for &S {
    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration)
    }
}

/// Re-runs a producer with a fixed delay until its result is ready.
#[derive(Clone, Debug)]
pub struct Poller<S = ThreadSleeper> {
    delay: Duration,
    sleeper: S,
}

impl<S: Sleeper> Poller<S> {
    pub fn with_sleeper(delay: Duration, sleeper: S) -> Self {
        Self { delay, sleeper }
    }

    /// Calls `producer` until `is_ready` accepts its result.
    pub fn poll<T, E, P, R>(&self, producer: P, is_ready: R) -> Result<T, E>
    where
        P: FnMut() -> Result<T, E>,
        R: Fn(&T) -> bool,
    {
        self.poll_with(producer, is_ready, |_| {})
    }

    /// Like [`Poller::poll`], calling `on_attempt` with every result,
    /// ready or not.
    pub fn poll_with<T, E, P, R, H>(
        &self,
        mut producer: P,
        is_ready: R,
        mut on_attempt: H,
    ) -> Result<T, E>
    where
        P: FnMut() -> Result<T, E>,
        R: Fn(&T) -> bool,
        H: FnMut(&T),
    {
        loop {
            let value = producer()?;
            on_attempt(&value);
            if is_ready(&value) {
                return Ok(value);
            }
            self.sleeper.sleep(self.delay);
        }
    }
}
