//! Politeness delay between navigations

use std::time::Duration;
use tracing::trace;

/// Fixed wait inserted before every navigation, including the first.
///
/// Applied regardless of whether the previous request succeeded.
#[derive(Debug, Clone, Copy)]
pub struct PolitenessDelay {
    delay: Duration,
}

impl PolitenessDelay {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    /// Raise the delay to a robots.txt `Crawl-delay` if that is longer
    pub fn with_crawl_delay(self, crawl_delay_secs: Option<f64>) -> Self {
        let requested = crawl_delay_secs
            .filter(|secs| secs.is_finite() && *secs > 0.0)
            .map(Duration::from_secs_f64);

        match requested {
            Some(requested) if requested > self.delay => Self { delay: requested },
            _ => self,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Sleep for the configured delay
    pub async fn wait(&self) {
        if self.delay.is_zero() {
            return;
        }
        trace!("Politeness delay: waiting {:?}", self.delay);
        tokio::time::sleep(self.delay).await;
    }
}
