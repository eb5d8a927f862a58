use std::sync::Arc;

use serde::Serialize;
use tracing::{Instrument, info, info_span, warn};
use uuid::Uuid;

use super::engine::CrawlerEngine;
use super::error::{CrawlError, CrawlResult};
use super::list_detail::ListDetailStrategy;
use super::stats::CrawlStats;
use super::strategy::{CrawlStrategy, select_strategy};
use crate::domain::{CrawlRequest, CrawlerDefinition, CrawlerOptions, Product, TestModeConfig};
use crate::infrastructure::config::EngineConfig;
use crate::infrastructure::driver::{RequestHandler, RunDriver};

/// Products and counters of one finished run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlReport {
    pub products: Vec<Product>,
    pub stats: CrawlStats,
}

/// One brand's crawler: a definition, the strategy it runs with and the
/// driver that fetches its pages
pub struct Crawler {
    definition: Arc<CrawlerDefinition>,
    strategy: CrawlStrategy,
    driver: Arc<dyn RunDriver>,
    default_options: CrawlerOptions,
    test_mode: TestModeConfig,
}

impl Crawler {
    /// Crawler using the strategy the definition declares
    pub fn new(definition: impl Into<Arc<CrawlerDefinition>>, driver: Arc<dyn RunDriver>) -> Self {
        let definition = definition.into();
        let strategy = select_strategy(&definition);
        Self::with_strategy(definition, strategy, driver)
    }

    pub fn inline_data(
        definition: impl Into<Arc<CrawlerDefinition>>,
        driver: Arc<dyn RunDriver>,
    ) -> Self {
        Self::with_strategy(definition.into(), CrawlStrategy::InlineData, driver)
    }

    pub fn list_detail(
        definition: impl Into<Arc<CrawlerDefinition>>,
        driver: Arc<dyn RunDriver>,
    ) -> Self {
        let definition = definition.into();
        let strategy = CrawlStrategy::ListDetail(ListDetailStrategy::new(&definition));
        Self::with_strategy(definition, strategy, driver)
    }

    fn with_strategy(
        definition: Arc<CrawlerDefinition>,
        strategy: CrawlStrategy,
        driver: Arc<dyn RunDriver>,
    ) -> Self {
        if !strategy.accepts(definition.strategy) {
            warn!(
                "Definition for '{}' declares {:?} but is crawled as {:?}",
                definition.brand(),
                definition.strategy,
                strategy.kind()
            );
        }

        Self {
            definition,
            strategy,
            driver,
            default_options: CrawlerOptions::default(),
            test_mode: TestModeConfig::current(),
        }
    }

    /// Run options from the engine config, used when the definition has none
    #[must_use]
    pub fn with_engine_config(mut self, config: &EngineConfig) -> Self {
        self.default_options = config.crawler.clone();
        self
    }

    /// Replace the environment-derived test-mode profile
    #[must_use]
    pub fn with_test_mode(mut self, test_mode: TestModeConfig) -> Self {
        self.test_mode = test_mode;
        self
    }

    pub fn brand(&self) -> &str {
        self.definition.brand()
    }

    pub fn definition(&self) -> &Arc<CrawlerDefinition> {
        &self.definition
    }

    pub const fn strategy(&self) -> &CrawlStrategy {
        &self.strategy
    }

    /// Effective run options with test-mode ceilings applied
    pub fn options(&self) -> CrawlerOptions {
        self.definition
            .options
            .clone()
            .unwrap_or_else(|| self.default_options.clone())
            .with_test_mode(&self.test_mode)
    }

    pub async fn run(&self) -> CrawlResult<Vec<Product>> {
        self.run_with_stats().await.map(|report| report.products)
    }

    /// Run the crawl from the start URL until the driver's queue drains
    pub async fn run_with_stats(&self) -> CrawlResult<CrawlReport> {
        let brand = self.brand().to_string();
        let run_id = Uuid::new_v4();
        let span = info_span!("crawl", brand = %brand, run_id = %run_id);

        async move {
            let start_url = self.definition.site.start_url.trim();
            if start_url.is_empty() {
                return Err(CrawlError::invalid_definition(&brand, "start URL is empty"));
            }

            let options = self.options();
            if self.test_mode.enabled {
                info!(
                    "Test mode: {} products per category, {} categories, {} requests",
                    self.test_mode.product_limit(),
                    self.test_mode.category_limit(),
                    options.max_requests_per_crawl
                );
            }

            let engine = Arc::new(CrawlerEngine::new(
                Arc::clone(&self.definition),
                self.strategy.clone(),
                options.clone(),
                self.test_mode,
            ));
            let handler: Arc<dyn RequestHandler> = engine.clone();

            info!("Starting {:?} crawl at {}", self.strategy.kind(), start_url);
            self.driver
                .run(vec![CrawlRequest::main(start_url)], &options, handler)
                .await
                .map_err(|source| CrawlError::Driver {
                    brand: brand.clone(),
                    source,
                })?;

            let products = self
                .driver
                .collect_all()
                .await
                .map_err(|source| CrawlError::Driver {
                    brand: brand.clone(),
                    source,
                })?;
            let stats = engine.stats();
            info!(
                "Crawl finished: {} products, {} requests, {} skipped items, {} failed categories",
                products.len(),
                stats.requests_handled,
                stats.items_skipped,
                stats.categories_failed
            );

            Ok(CrawlReport { products, stats })
        }
        .instrument(span)
        .await
    }
}
