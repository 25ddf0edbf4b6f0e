//! Advisory-lock primitives: the platform seam between the retry driver and
//! whatever exclusion mechanism the OS offers.
//!
//! Two implementations: [`FlockPrimitive`] over BSD `flock(2)` for Unix, and
//! [`MemoryPrimitive`], a deterministic in-memory double for tests on any
//! platform. Handles travel by value through [`LockPrimitive::try_lock`] so
//! the open/locked state machine is carried in types rather than flags.

use std::io;
use std::path::{Path, PathBuf};

use crate::core::errors::{DirlockError, Result};

/// Outcome of a single non-blocking acquisition attempt.
///
/// The handle comes back in every arm: the driver needs it to retry after
/// `Contended` and `Faulted`, and owns the locked resource after `Acquired`.
pub enum Attempt<H> {
    /// The exclusive lock is now held.
    Acquired(H),
    /// Another holder has the lock; retry after the short interval.
    Contended(H),
    /// Unexpected acquisition error; retry after the long interval.
    Faulted(H, io::Error),
}

/// Minimal interface over one OS advisory-locking mechanism.
///
/// Platforms without such a mechanism implement [`LockPrimitive::open`] to
/// report an explicit unsupported-platform error instead of being silently
/// skipped.
pub trait LockPrimitive {
    /// Open directory handle. Valid lock state is tracked by the handle.
    type Handle;

    /// Open `path` for locking. Failure here is the one fatal acquisition
    /// condition; callers treat it as a configuration error and do not retry.
    fn open(&self, path: &Path) -> Result<Self::Handle>;

    /// One non-blocking exclusive lock attempt on an open handle.
    fn try_lock(&self, handle: Self::Handle) -> Attempt<Self::Handle>;

    /// Unlock and close. Never retried; on failure the resource is treated
    /// as abandoned regardless of the reported outcome.
    fn release(&self, handle: Self::Handle) -> Result<()>;
}

pub use flock::{FlockHandle, FlockPrimitive};

#[cfg(unix)]
mod flock {
    use std::fs::File;
    use std::io;
    use std::os::fd::{IntoRawFd, OwnedFd};
    use std::path::{Path, PathBuf};

    use nix::errno::Errno;
    use nix::fcntl::{Flock, FlockArg};

    use super::{Attempt, LockPrimitive};
    use crate::core::errors::{DirlockError, Result};

    /// `flock(2)`-backed primitive: one exclusive advisory lock per directory,
    /// resolved by the kernel to device+inode identity.
    ///
    /// The lock is effective only among processes using the same mechanism on
    /// the same directory; it offers no protection against uncooperative
    /// access. Note that `flock` ties ownership to the open file description,
    /// so two handles opened in the *same* process contend just like handles
    /// in different processes do.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct FlockPrimitive;

    /// Open directory file descriptor, either still unlocked or holding the
    /// exclusive flock.
    pub struct FlockHandle {
        state: FdState,
        path: PathBuf,
    }

    enum FdState {
        Open(OwnedFd),
        Locked(Flock<OwnedFd>),
    }

    impl std::fmt::Debug for FlockHandle {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            let state = match self.state {
                FdState::Open(_) => "open",
                FdState::Locked(_) => "locked",
            };
            f.debug_struct("FlockHandle")
                .field("path", &self.path)
                .field("state", &state)
                .finish()
        }
    }

    impl LockPrimitive for FlockPrimitive {
        type Handle = FlockHandle;

        fn open(&self, path: &Path) -> Result<FlockHandle> {
            // Read-only open works for directories; the fd exists solely to
            // carry the flock.
            let file = File::open(path).map_err(|source| DirlockError::OpenDir {
                path: path.to_path_buf(),
                source,
            })?;
            Ok(FlockHandle {
                state: FdState::Open(OwnedFd::from(file)),
                path: path.to_path_buf(),
            })
        }

        fn try_lock(&self, handle: FlockHandle) -> Attempt<FlockHandle> {
            let FlockHandle { state, path } = handle;
            let fd = match state {
                FdState::Open(fd) => fd,
                // Already holding the lock; nothing more to acquire.
                locked @ FdState::Locked(_) => {
                    return Attempt::Acquired(FlockHandle {
                        state: locked,
                        path,
                    });
                }
            };
            match Flock::lock(fd, FlockArg::LockExclusiveNonblock) {
                Ok(locked) => Attempt::Acquired(FlockHandle {
                    state: FdState::Locked(locked),
                    path,
                }),
                Err((fd, Errno::EWOULDBLOCK)) => Attempt::Contended(FlockHandle {
                    state: FdState::Open(fd),
                    path,
                }),
                Err((fd, errno)) => Attempt::Faulted(
                    FlockHandle {
                        state: FdState::Open(fd),
                        path,
                    },
                    io::Error::from(errno),
                ),
            }
        }

        fn release(&self, handle: FlockHandle) -> Result<()> {
            let FlockHandle { state, path } = handle;
            let fd = match state {
                FdState::Open(fd) => fd,
                FdState::Locked(locked) => match locked.unlock() {
                    Ok(fd) => fd,
                    // Dropping the Flock still closes the fd; the resource
                    // is abandoned either way.
                    Err((_flock, errno)) => {
                        return Err(DirlockError::Release {
                            path,
                            details: format!("flock(LOCK_UN): {errno}"),
                        });
                    }
                },
            };
            nix::unistd::close(fd.into_raw_fd()).map_err(|errno| DirlockError::Release {
                path,
                details: format!("close: {errno}"),
            })
        }
    }
}

#[cfg(not(unix))]
mod flock {
    use std::path::Path;

    use super::{Attempt, LockPrimitive};
    use crate::core::errors::{DirlockError, Result};

    /// Stand-in for platforms without an advisory-lock primitive. Every open
    /// reports an explicit unsupported-platform error.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct FlockPrimitive;

    /// Uninhabited: no handle can exist where no primitive exists.
    #[derive(Debug)]
    pub enum FlockHandle {}

    impl LockPrimitive for FlockPrimitive {
        type Handle = FlockHandle;

        fn open(&self, _path: &Path) -> Result<FlockHandle> {
            Err(DirlockError::UnsupportedPlatform {
                details: "no advisory directory-lock primitive on this platform".to_string(),
            })
        }

        fn try_lock(&self, handle: FlockHandle) -> Attempt<FlockHandle> {
            match handle {}
        }

        fn release(&self, handle: FlockHandle) -> Result<()> {
            match handle {}
        }
    }
}

/// Deterministic in-memory primitive for tests.
///
/// Mirrors real semantics — registered paths "exist", each path holds at most
/// one exclusive lock — and additionally records call counts and supports
/// scripted faults so retry behavior can be observed without real hardware or
/// real wait times. Clones share state, so a test can hand one clone to a
/// guard and inspect the other afterwards.
#[derive(Debug, Clone, Default)]
pub struct MemoryPrimitive {
    state: std::sync::Arc<parking_lot::Mutex<MemoryState>>,
}

#[derive(Debug, Default)]
struct MemoryState {
    dirs: std::collections::HashSet<PathBuf>,
    locked: std::collections::HashSet<PathBuf>,
    scripted_faults: std::collections::VecDeque<io::Error>,
    fail_release: bool,
    opens: u32,
    attempts: u32,
    releases: u32,
}

/// Bookkeeping token handed out by [`MemoryPrimitive`].
#[derive(Debug)]
pub struct MemoryHandle {
    path: PathBuf,
    locked: bool,
}

impl MemoryPrimitive {
    /// Register a directory as existing.
    pub fn register_dir(&self, path: impl Into<PathBuf>) {
        self.state.lock().dirs.insert(path.into());
    }

    /// Queue an error to be reported (as `Faulted`) by upcoming attempts,
    /// ahead of honest contention checks.
    pub fn script_fault(&self, error: io::Error) {
        self.state.lock().scripted_faults.push_back(error);
    }

    /// Make every subsequent release report failure.
    pub fn fail_releases(&self, fail: bool) {
        self.state.lock().fail_release = fail;
    }

    /// Whether the lock on `path` is currently held.
    pub fn is_locked(&self, path: &Path) -> bool {
        self.state.lock().locked.contains(path)
    }

    /// Number of successful opens so far.
    pub fn opens(&self) -> u32 {
        self.state.lock().opens
    }

    /// Number of lock attempts so far.
    pub fn attempts(&self) -> u32 {
        self.state.lock().attempts
    }

    /// Number of releases so far (successful or not).
    pub fn releases(&self) -> u32 {
        self.state.lock().releases
    }
}

impl LockPrimitive for MemoryPrimitive {
    type Handle = MemoryHandle;

    fn open(&self, path: &Path) -> Result<MemoryHandle> {
        let mut state = self.state.lock();
        if !state.dirs.contains(path) {
            return Err(DirlockError::OpenDir {
                path: path.to_path_buf(),
                source: io::Error::new(io::ErrorKind::NotFound, "no such directory"),
            });
        }
        state.opens += 1;
        Ok(MemoryHandle {
            path: path.to_path_buf(),
            locked: false,
        })
    }

    fn try_lock(&self, mut handle: MemoryHandle) -> Attempt<MemoryHandle> {
        let mut state = self.state.lock();
        state.attempts += 1;
        if let Some(error) = state.scripted_faults.pop_front() {
            return Attempt::Faulted(handle, error);
        }
        if handle.locked {
            return Attempt::Acquired(handle);
        }
        if state.locked.contains(&handle.path) {
            return Attempt::Contended(handle);
        }
        state.locked.insert(handle.path.clone());
        handle.locked = true;
        Attempt::Acquired(handle)
    }

    fn release(&self, handle: MemoryHandle) -> Result<()> {
        let mut state = self.state.lock();
        state.releases += 1;
        if handle.locked {
            state.locked.remove(&handle.path);
        }
        if state.fail_release {
            return Err(DirlockError::Release {
                path: handle.path,
                details: "scripted release failure".to_string(),
            });
        }
        Ok(())
    }
}
