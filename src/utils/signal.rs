//! Signal handling for graceful shutdown.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::Result;

/// Set up a Ctrl-C handler that clears the returned flag.
///
/// The first Ctrl-C asks the replay thread to stop, which publishes an idle
/// command if it was playing. A second Ctrl-C exits immediately.
///
/// # Example
/// ```ignore
/// let running = setup_ctrl_c_handler()?;
/// while running.load(Ordering::SeqCst) {
///     // ... do work ...
/// }
/// ```
pub fn setup_ctrl_c_handler() -> Result<Arc<AtomicBool>> {
    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        if r.swap(false, Ordering::SeqCst) {
            tracing::info!("Interrupt received, stopping replay (press Ctrl-C again to force)");
        } else {
            tracing::warn!("Second interrupt, exiting now");
            std::process::exit(130);
        }
    })?;
    Ok(running)
}
