use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Counters for one crawler run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlStats {
    pub requests_handled: u64,
    pub products_pushed: u64,
    /// Containers that produced no record (no name or extractor failure)
    pub items_skipped: u64,
    /// Products enqueued for a detail visit
    pub detail_requests: u64,
    pub categories_failed: u64,
}

/// Lock-free recorder shared by the request handler
#[derive(Debug, Default)]
pub struct StatsRecorder {
    requests_handled: AtomicU64,
    products_pushed: AtomicU64,
    items_skipped: AtomicU64,
    detail_requests: AtomicU64,
    categories_failed: AtomicU64,
}

impl StatsRecorder {
    pub fn request_handled(&self) {
        self.requests_handled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn product_pushed(&self) {
        self.products_pushed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn item_skipped(&self) {
        self.items_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn detail_requested(&self) {
        self.detail_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn category_failed(&self) {
        self.categories_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CrawlStats {
        CrawlStats {
            requests_handled: self.requests_handled.load(Ordering::Relaxed),
            products_pushed: self.products_pushed.load(Ordering::Relaxed),
            items_skipped: self.items_skipped.load(Ordering::Relaxed),
            detail_requests: self.detail_requests.load(Ordering::Relaxed),
            categories_failed: self.categories_failed.load(Ordering::Relaxed),
        }
    }
}
