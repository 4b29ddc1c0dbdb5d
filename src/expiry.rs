//! Fire-once deferred actions used for key expiration.
//!
//! An armed action cannot be cancelled or rescheduled. Inside a Tokio runtime
//! the action runs on a spawned task; elsewhere it gets a detached thread.

use std::thread;
use std::time::Duration;

use tokio::runtime::Handle;

/// Runs `action` once after `delay` has elapsed.
pub fn schedule<F>(delay: Duration, action: F)
where
    F: FnOnce() + Send + 'static,
{
    match Handle::try_current() {
        Ok(handle) => {
            handle.spawn(async move {
                tokio::time::sleep(delay).await;
                action();
            });
        }
        Err(_) => {
            thread::spawn(move || {
                thread::sleep(delay);
                action();
            });
        }
    }
}
