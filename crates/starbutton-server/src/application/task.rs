//! Helpers for the server's named background threads.

use std::io;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Spawns a named OS thread.
///
/// # Errors
///
/// Returns the I/O error from the OS if the thread cannot be created.
pub fn spawn_named<F, T>(name: impl Into<String>, f: F) -> io::Result<JoinHandle<T>>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    thread::Builder::new().name(name.into()).spawn(f)
}

/// Waits up to `timeout` for `handle` to finish, then joins it.
///
/// Returns the handle back if the thread is still running at the deadline so
/// the caller can decide whether to keep waiting or detach it.
pub fn join_with_timeout<T>(
    handle: JoinHandle<T>,
    timeout: Duration,
) -> Result<thread::Result<T>, JoinHandle<T>> {
    let deadline = Instant::now() + timeout;
    while !handle.is_finished() {
        if Instant::now() >= deadline {
            return Err(handle);
        }
        thread::sleep(POLL_INTERVAL);
    }
    Ok(handle.join())
}

const POLL_INTERVAL: Duration = Duration::from_millis(5);
