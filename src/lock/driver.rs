//! Blocking acquisition driver: indefinite retry over a lock primitive.

use std::path::Path;
use std::thread;
use std::time::Duration;

use crate::core::errors::Result;
use crate::lock::primitive::{Attempt, LockPrimitive};

/// Retry intervals for the acquisition loop.
///
/// Named intervals, never deadlines: the loop has no retry limit and no
/// timeout. A long-running batch process should wait for a contended disk
/// rather than abort.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Sleep while another holder has the lock.
    pub contended: Duration,
    /// Sleep after an unexpected acquisition error.
    pub faulted: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            contended: Duration::from_secs(10),
            faulted: Duration::from_secs(60),
        }
    }
}

/// Low-level acquire/release operations over a [`LockPrimitive`].
#[derive(Debug, Clone)]
pub struct LockDriver<P> {
    primitive: P,
    backoff: BackoffPolicy,
}

impl<P: LockPrimitive> LockDriver<P> {
    /// Driver over `primitive` with the given retry pacing.
    pub fn new(primitive: P, backoff: BackoffPolicy) -> Self {
        Self { primitive, backoff }
    }

    /// Open `path` and block until the exclusive lock is granted.
    ///
    /// An open failure (missing path, permission denied) is returned
    /// immediately with no retry; it is a configuration error on the caller's
    /// side. After a successful open the call can only succeed: contention
    /// sleeps the short interval, unexpected errors are logged and sleep the
    /// long interval, and both retry forever.
    pub fn acquire(&self, path: &Path) -> Result<P::Handle> {
        let mut handle = self.primitive.open(path)?;
        loop {
            match self.primitive.try_lock(handle) {
                Attempt::Acquired(locked) => return Ok(locked),
                Attempt::Contended(open) => {
                    handle = open;
                    thread::sleep(self.backoff.contended);
                }
                Attempt::Faulted(open, error) => {
                    eprintln!(
                        "[dirlock] unable to lock directory {} (retrying in {}s): {error}",
                        path.display(),
                        self.backoff.faulted.as_secs_f64(),
                    );
                    handle = open;
                    thread::sleep(self.backoff.faulted);
                }
            }
        }
    }

    /// Unlock and close `handle`. Failures are logged and returned to the
    /// immediate caller, never retried: the resource counts as abandoned
    /// whatever the outcome.
    pub fn release(&self, handle: P::Handle, path: &Path) -> Result<()> {
        self.primitive.release(handle).inspect_err(|error| {
            eprintln!(
                "[dirlock] failed to release lock on {}: {error}",
                path.display()
            );
        })
    }

    /// Effective retry intervals.
    pub fn backoff(&self) -> BackoffPolicy {
        self.backoff
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::path::{Path, PathBuf};
    use std::time::Instant;

    use super::{BackoffPolicy, LockDriver};
    use crate::lock::primitive::{Attempt, LockPrimitive, MemoryPrimitive};

    fn quick_backoff() -> BackoffPolicy {
        BackoffPolicy {
            contended: std::time::Duration::from_millis(5),
            faulted: std::time::Duration::from_millis(40),
        }
    }

    #[test]
    fn default_backoff_matches_original_intervals() {
        let policy = BackoffPolicy::default();
        assert_eq!(policy.contended.as_secs(), 10);
        assert_eq!(policy.faulted.as_secs(), 60);
    }

    #[test]
    fn open_failure_is_fatal_and_skips_the_retry_loop() {
        let primitive = MemoryPrimitive::default();
        let driver = LockDriver::new(primitive.clone(), quick_backoff());

        let err = driver
            .acquire(Path::new("/no/such/dir"))
            .expect_err("unregistered path must fail");
        assert_eq!(err.code(), "DLK-2001");
        assert!(err.is_fatal_acquire());
        assert_eq!(primitive.attempts(), 0, "retry loop must not be entered");
    }

    #[test]
    fn contended_lock_is_retried_until_released() {
        let dir = PathBuf::from("/plots");
        let primitive = MemoryPrimitive::default();
        primitive.register_dir(&dir);
        let driver = LockDriver::new(primitive.clone(), quick_backoff());

        // Hold the lock from a second handle, then release it from another
        // thread while the driver is spinning on the short interval.
        let holder = primitive.open(&dir).expect("open");
        let Attempt::Acquired(holder) = primitive.try_lock(holder) else {
            panic!("free lock should be acquired");
        };

        let releaser = {
            let primitive = primitive.clone();
            std::thread::spawn(move || {
                std::thread::sleep(std::time::Duration::from_millis(30));
                primitive.release(holder).expect("release");
            })
        };

        let handle = driver.acquire(&dir).expect("acquire should block, not fail");
        releaser.join().expect("releaser thread");
        assert!(
            primitive.attempts() >= 2,
            "expected at least one contended retry, got {} attempts",
            primitive.attempts()
        );
        driver.release(handle, &dir).expect("release");
    }

    #[test]
    fn unexpected_errors_use_the_long_interval() {
        let dir = PathBuf::from("/plots");
        let primitive = MemoryPrimitive::default();
        primitive.register_dir(&dir);
        primitive.script_fault(io::Error::new(io::ErrorKind::PermissionDenied, "denied"));
        let driver = LockDriver::new(primitive.clone(), quick_backoff());

        let started = Instant::now();
        let handle = driver.acquire(&dir).expect("acquire");
        assert!(
            started.elapsed() >= quick_backoff().faulted,
            "faulted attempt should sleep the long interval"
        );
        assert_eq!(primitive.attempts(), 2);
        driver.release(handle, &dir).expect("release");
    }

    #[test]
    fn release_failure_is_reported_but_not_retried() {
        let dir = PathBuf::from("/plots");
        let primitive = MemoryPrimitive::default();
        primitive.register_dir(&dir);
        let driver = LockDriver::new(primitive.clone(), quick_backoff());

        let handle = driver.acquire(&dir).expect("acquire");
        primitive.fail_releases(true);
        let err = driver.release(handle, &dir).expect_err("scripted failure");
        assert_eq!(err.code(), "DLK-2002");
        assert_eq!(primitive.releases(), 1);
    }
}
