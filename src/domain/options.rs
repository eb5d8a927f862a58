use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::test_mode::TestModeConfig;
use crate::infrastructure::config::defaults;

/// Run tunables handed to the run driver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CrawlerOptions {
    /// Maximum pages processed in parallel by the driver
    pub max_concurrency: usize,

    /// Hard ceiling on handled requests for one run
    pub max_requests_per_crawl: usize,

    /// Retries per request before the driver gives up on it
    pub max_retries: u32,

    /// Per-request handler timeout in seconds
    pub request_timeout_secs: u64,

    /// Browser launch flags
    pub headless: bool,
    pub launch_args: Vec<String>,

    /// Pause after each "load more" click in milliseconds
    pub settle_delay_ms: u64,
}

impl Default for CrawlerOptions {
    fn default() -> Self {
        Self {
            max_concurrency: defaults::MAX_CONCURRENCY,
            max_requests_per_crawl: defaults::MAX_REQUESTS_PER_CRAWL,
            max_retries: defaults::MAX_RETRIES,
            request_timeout_secs: defaults::REQUEST_TIMEOUT_SECONDS,
            headless: true,
            launch_args: Vec::new(),
            settle_delay_ms: defaults::SETTLE_DELAY_MS,
        }
    }
}

impl CrawlerOptions {
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub const fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    /// Apply test-mode ceilings. Values are only ever lowered.
    #[must_use]
    pub fn with_test_mode(mut self, test_mode: &TestModeConfig) -> Self {
        if !test_mode.enabled {
            return self;
        }

        self.max_concurrency = self.max_concurrency.min(defaults::TEST_MODE_MAX_CONCURRENCY);
        self.request_timeout_secs = self
            .request_timeout_secs
            .min(defaults::TEST_MODE_REQUEST_TIMEOUT_SECONDS);
        self.max_requests_per_crawl = self.max_requests_per_crawl.min(test_mode.request_limit());
        self
    }
}
