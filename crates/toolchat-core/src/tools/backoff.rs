//! Delay between connection attempts

use std::time::Duration;

use async_trait::async_trait;

/// Waits between a failed connection attempt and the next one.
///
/// Injected into the registry so tests can retry without real delays.
#[async_trait]
pub trait Backoff: Send + Sync {
    /// Called after failed attempt number `attempt` (1-based)
    async fn wait(&self, attempt: u32);
}

/// Same delay before every retry
#[derive(Debug, Clone, Copy)]
pub struct FixedBackoff {
    delay: Duration,
}

impl FixedBackoff {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    /// Retry immediately
    pub fn none() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl Default for FixedBackoff {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

#[async_trait]
impl Backoff for FixedBackoff {
    async fn wait(&self, _attempt: u32) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }
}
