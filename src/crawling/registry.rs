//! Brand → crawler registry
//!
//! The registry is a plain owned value; callers build one, register factories
//! and thread it where it is needed. Each run gets a fresh crawler from its
//! factory, so no driver state leaks between runs.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use futures::future::join_all;
use tracing::{error, info, warn};

use super::crawler::{CrawlReport, Crawler};
use super::error::{CrawlError, CrawlResult};
use crate::domain::Product;

pub type CrawlerFactory = Arc<dyn Fn() -> Crawler + Send + Sync>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunAllOptions {
    /// Run brands one after another instead of all at once
    pub sequential: bool,
}

impl RunAllOptions {
    pub const fn sequential() -> Self {
        Self { sequential: true }
    }

    pub const fn concurrent() -> Self {
        Self { sequential: false }
    }
}

/// Outcome of one brand inside `run_all`
#[derive(Debug)]
pub struct BrandRunResult {
    pub brand: String,
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
    pub outcome: CrawlResult<CrawlReport>,
}

impl BrandRunResult {
    pub const fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    /// Products of a successful run; empty on failure
    pub fn products(&self) -> &[Product] {
        match &self.outcome {
            Ok(report) => &report.products,
            Err(_) => &[],
        }
    }
}

#[derive(Default)]
pub struct Registry {
    factories: BTreeMap<String, CrawlerFactory>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a crawler factory for `brand`. Re-registering replaces the
    /// previous factory.
    pub fn register<F>(&mut self, brand: impl Into<String>, factory: F)
    where
        F: Fn() -> Crawler + Send + Sync + 'static,
    {
        let brand = brand.into();
        if self.factories.insert(brand.clone(), Arc::new(factory)).is_some() {
            warn!("Crawler for '{}' was already registered, replacing it", brand);
        }
    }

    /// A fresh crawler for `brand`
    pub fn get(&self, brand: &str) -> Option<Crawler> {
        self.factories.get(brand).map(|factory| factory())
    }

    pub fn has(&self, brand: &str) -> bool {
        self.factories.contains_key(brand)
    }

    /// Registered brands in sorted order
    pub fn list_brands(&self) -> Vec<String> {
        self.factories.keys().cloned().collect()
    }

    pub async fn run(&self, brand: &str) -> CrawlResult<Vec<Product>> {
        let crawler = self
            .get(brand)
            .ok_or_else(|| CrawlError::UnknownBrand(brand.to_string()))?;
        crawler.run().await
    }

    /// Run every registered brand. A failing brand never stops the others;
    /// each outcome is recorded in its own result.
    pub async fn run_all(&self, options: RunAllOptions) -> Vec<BrandRunResult> {
        let brands = self.list_brands();
        info!(
            "Running {} brands {}",
            brands.len(),
            if options.sequential { "sequentially" } else { "concurrently" }
        );

        let results = if options.sequential {
            let mut results = Vec::with_capacity(brands.len());
            for brand in &brands {
                results.push(self.run_brand(brand).await);
            }
            results
        } else {
            join_all(brands.iter().map(|brand| self.run_brand(brand))).await
        };

        let failed = results.iter().filter(|r| !r.is_success()).count();
        info!(
            "Run finished: {} succeeded, {} failed",
            results.len() - failed,
            failed
        );
        results
    }

    async fn run_brand(&self, brand: &str) -> BrandRunResult {
        let started_at = Utc::now();
        let timer = Instant::now();

        let outcome = match self.get(brand) {
            Some(crawler) => crawler.run_with_stats().await,
            None => Err(CrawlError::UnknownBrand(brand.to_string())),
        };

        match &outcome {
            Ok(report) => info!("Brand '{}' produced {} products", brand, report.products.len()),
            Err(e) => error!("Brand '{}' failed: {}", brand, e),
        }

        BrandRunResult {
            brand: brand.to_string(),
            started_at,
            elapsed: timer.elapsed(),
            outcome,
        }
    }
}
