use crate::error::{DropWatchError, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// Ctrl+C handling for the watch loop.
///
/// The first signal flips `running` and wakes anyone blocked in
/// [`GracefulShutdown::wait`]; a second one exits the process immediately.
#[derive(Clone)]
pub struct GracefulShutdown {
    running: Arc<AtomicBool>,
    shutdown_message_shown: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl GracefulShutdown {
    pub fn new() -> Result<Self> {
        let shutdown = Self::manual();

        let running_clone = shutdown.running.clone();
        let message_shown_clone = shutdown.shutdown_message_shown.clone();
        let notify_clone = shutdown.notify.clone();

        // Handle Ctrl+C gracefully
        ctrlc::set_handler(move || {
            running_clone.store(false, Ordering::SeqCst);
            notify_clone.notify_waiters();

            if !message_shown_clone.swap(true, Ordering::SeqCst) {
                eprintln!("\n🛑 Stopping watcher... (press Ctrl+C again to force exit)");
            } else {
                eprintln!("\n💀 Force stopping...");
                std::process::exit(130);
            }
        })
        .map_err(|e| {
            DropWatchError::configuration(format!("Failed to set signal handler: {}", e))
        })?;

        Ok(shutdown)
    }

    /// Only stops on [`GracefulShutdown::request_shutdown`] (no signal handler registration)
    pub fn manual() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(true)),
            shutdown_message_shown: Arc::new(AtomicBool::new(false)),
            notify: Arc::new(Notify::new()),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn check_shutdown(&self) -> Result<()> {
        if !self.is_running() {
            return Err(DropWatchError::Cancelled);
        }
        Ok(())
    }

    pub fn request_shutdown(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    /// Resolve once shutdown has been requested.
    pub async fn wait(&self) {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register before checking the flag so a concurrent request is not missed.
            notified.as_mut().enable();

            if !self.is_running() {
                return;
            }
            notified.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_shutdown_state_management() {
        let shutdown = GracefulShutdown::manual();

        assert!(shutdown.is_running());
        assert!(shutdown.check_shutdown().is_ok());

        shutdown.request_shutdown();
        assert!(!shutdown.is_running());
        assert!(matches!(
            shutdown.check_shutdown(),
            Err(DropWatchError::Cancelled)
        ));
    }

    #[test]
    fn test_clones_share_state() {
        let shutdown = GracefulShutdown::manual();
        let clone = shutdown.clone();

        clone.request_shutdown();
        assert!(!shutdown.is_running());
    }

    #[tokio::test]
    async fn test_wait_returns_after_request() {
        let shutdown = GracefulShutdown::manual();
        let trigger = shutdown.clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.request_shutdown();
        });

        tokio::time::timeout(Duration::from_secs(5), shutdown.wait())
            .await
            .expect("wait() should resolve after request_shutdown");
    }

    #[tokio::test]
    async fn test_wait_returns_immediately_when_already_stopped() {
        let shutdown = GracefulShutdown::manual();
        shutdown.request_shutdown();

        tokio::time::timeout(Duration::from_millis(100), shutdown.wait())
            .await
            .expect("wait() should not block once stopped");
    }
}
