//! Minimum interval between accepted generation requests

use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};

use crate::error::ProxyError;

pub struct RateLimiter {
    interval: Option<Duration>,
    wait: bool,
    last_request: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// `interval_secs` of `None` or 0 disables limiting.
    pub fn new(interval_secs: Option<u64>, wait: bool) -> Self {
        Self {
            interval: interval_secs.filter(|s| *s > 0).map(Duration::from_secs),
            wait,
            last_request: Mutex::new(None),
        }
    }

    /// Admit a request, sleeping out the remaining interval when `wait` is set.
    ///
    /// The lock is held across the sleep so waiting requests are admitted one
    /// interval apart.
    pub async fn check(&self) -> Result<(), ProxyError> {
        let Some(interval) = self.interval else {
            return Ok(());
        };

        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < interval {
                let remaining = interval - elapsed;
                if !self.wait {
                    tracing::warn!("Rate limit hit, {}ms until next slot", remaining.as_millis());
                    return Err(ProxyError::RateLimited);
                }
                tracing::info!("Rate limit: waiting {}ms", remaining.as_millis());
                tokio::time::sleep(remaining).await;
            }
        }

        *last = Some(Instant::now());
        Ok(())
    }
}
