//! Run driver contract
//!
//! A run driver owns the request queue, the page lifecycle and the result
//! dataset. It feeds every queued request to a [`RequestHandler`] together with
//! a loaded page and a [`CrawlSession`] through which the handler enqueues
//! follow-up requests and pushes finished records.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use super::page::Page;
use crate::domain::{CrawlRequest, CrawlerOptions, Product};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DriverError {
    #[error("Request queue rejected {url}: {reason}")]
    Enqueue { url: String, reason: String },

    #[error("Record sink failed: {0}")]
    Sink(String),

    #[error("Run driver failed: {0}")]
    Run(String),
}

pub type DriverResult<T> = Result<T, DriverError>;

/// Operations available to a handler while it processes one request
#[async_trait]
pub trait CrawlSession: Send + Sync {
    async fn enqueue(&self, requests: Vec<CrawlRequest>) -> DriverResult<()>;

    /// Append one record to the run's dataset immediately
    async fn push_record(&self, product: Product) -> DriverResult<()>;
}

/// Per-request callback invoked by the driver
#[async_trait]
pub trait RequestHandler: Send + Sync {
    async fn handle(
        &self,
        page: Page,
        request: CrawlRequest,
        session: Arc<dyn CrawlSession>,
    ) -> anyhow::Result<()>;
}

/// Scheduler that fetches pages and invokes the handler until the queue drains
#[async_trait]
pub trait RunDriver: Send + Sync {
    /// Process `seeds` and everything they enqueue. Concurrency, retries and
    /// timeouts follow `options`.
    async fn run(
        &self,
        seeds: Vec<CrawlRequest>,
        options: &CrawlerOptions,
        handler: Arc<dyn RequestHandler>,
    ) -> DriverResult<()>;

    /// Every record pushed so far, in push order
    async fn collect_all(&self) -> DriverResult<Vec<Product>>;
}
