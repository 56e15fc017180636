use std::path::Path;
use std::time::Duration;
use tokio::time::{sleep, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettleOptions {
    pub stability_threshold: Duration,
    pub poll_interval: Duration,
}

impl Default for SettleOptions {
    fn default() -> Self {
        Self {
            stability_threshold: Duration::from_millis(2000),
            poll_interval: Duration::from_millis(100),
        }
    }
}

/// Wait until `path` stops growing.
///
/// Returns `true` once the size has been unchanged for the stability
/// threshold, `false` if the path vanished or is not a regular file.
pub async fn await_write_finish(path: &Path, options: &SettleOptions) -> bool {
    let mut last_size: Option<u64> = None;
    let mut stable_since = Instant::now();

    loop {
        let size = match tokio::fs::metadata(path).await {
            Ok(metadata) if metadata.is_file() => metadata.len(),
            _ => return false,
        };

        if last_size != Some(size) {
            last_size = Some(size);
            stable_since = Instant::now();
        } else if stable_since.elapsed() >= options.stability_threshold {
            return true;
        }

        sleep(options.poll_interval).await;
    }
}
