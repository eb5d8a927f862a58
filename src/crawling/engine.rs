//! Request router shared by every strategy
//!
//! The engine is the [`RequestHandler`] handed to the run driver. It routes on
//! the request label and owns the parts every strategy reuses: category
//! discovery, listing pagination, per-container extraction and the test-mode
//! item limits.

use std::sync::Arc;

use anyhow::anyhow;
use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::stats::{CrawlStats, StatsRecorder};
use super::strategy::CrawlStrategy;
use crate::domain::{
    CategoryInfo, CrawlRequest, CrawlerDefinition, CrawlerOptions, ExtractorContext,
    PaginationKind, RequestLabel, TestModeConfig,
};
use crate::extraction::pagination::{
    click_next, extra_page_bound, load_more, load_more_bound, page_number_urls,
};
use crate::extraction::pipeline::{extract_categories, extract_product, locate_containers};
use crate::infrastructure::driver::{CrawlSession, RequestHandler};
use crate::infrastructure::page::{Element, Page, PageHandle};

pub struct CrawlerEngine {
    definition: Arc<CrawlerDefinition>,
    strategy: CrawlStrategy,
    options: CrawlerOptions,
    test_mode: TestModeConfig,
    stats: StatsRecorder,
}

impl CrawlerEngine {
    pub fn new(
        definition: Arc<CrawlerDefinition>,
        strategy: CrawlStrategy,
        options: CrawlerOptions,
        test_mode: TestModeConfig,
    ) -> Self {
        Self {
            definition,
            strategy,
            options,
            test_mode,
            stats: StatsRecorder::default(),
        }
    }

    pub fn definition(&self) -> &CrawlerDefinition {
        &self.definition
    }

    pub const fn strategy(&self) -> &CrawlStrategy {
        &self.strategy
    }

    pub const fn test_mode(&self) -> &TestModeConfig {
        &self.test_mode
    }

    pub const fn recorder(&self) -> &StatsRecorder {
        &self.stats
    }

    pub fn stats(&self) -> CrawlStats {
        self.stats.snapshot()
    }

    pub fn context(&self, category_name: &str, page: &dyn PageHandle) -> ExtractorContext {
        ExtractorContext::new(&self.definition.site.base_url, category_name, page.url())
    }

    /// Categories to crawl, capped by the test-mode category limit.
    ///
    /// Explicit category URLs in the site config replace discovery. A failing
    /// custom category extractor is logged and treated as "no categories".
    pub async fn discover_categories(&self, page: &Page) -> Vec<CategoryInfo> {
        let site = &self.definition.site;
        let categories = if site.category_urls.is_empty() {
            let ctx = self.context("", page.as_ref());
            match extract_categories(&self.definition, page, &ctx).await {
                Ok(categories) => categories,
                Err(e) => {
                    warn!("Category extraction failed on {}: {:#}", ctx.page_url, e);
                    Vec::new()
                }
            }
        } else {
            site.category_urls.clone()
        };

        let limit = self.test_mode.category_limit();
        if categories.len() > limit {
            info!(
                "Test mode: limiting {} categories to {}",
                categories.len(),
                limit
            );
        }
        categories.into_iter().take(limit).collect()
    }

    /// Default `category` handling: wait, paginate, extract every container
    pub async fn handle_category_default(
        &self,
        page: &Page,
        request: &CrawlRequest,
        session: &Arc<dyn CrawlSession>,
    ) -> anyhow::Result<()> {
        page.wait_for_load().await?;
        let category_name = request.user_data.category_name.clone().unwrap_or_default();
        let processed = self.paginate_and_extract(page, &category_name, session).await;
        debug!(
            "Category '{}' done: {} containers processed",
            category_name, processed
        );
        Ok(())
    }

    /// Default `product` handling: the detail page body is one product
    pub async fn handle_product_default(
        &self,
        page: &Page,
        request: &CrawlRequest,
        session: &Arc<dyn CrawlSession>,
    ) -> anyhow::Result<()> {
        page.wait_for_load().await?;
        let category_name = request.user_data.category_name.clone().unwrap_or_default();
        let ctx = self.context(&category_name, page.as_ref());
        let root = detail_root(page.as_ref())
            .await
            .ok_or_else(|| anyhow!("detail page {} has no body", request.url))?;

        self.emit_product(root, &ctx, session).await
    }

    /// Run the definition's pagination over the loaded listing and process
    /// every page it reaches. Returns the number of containers processed.
    ///
    /// Records are pushed as they are extracted, so nothing past the first page
    /// fails the request: an extra page that cannot be opened ends pagination.
    pub async fn paginate_and_extract(
        &self,
        page: &Page,
        category_name: &str,
        session: &Arc<dyn CrawlSession>,
    ) -> usize {
        let limit = self.test_mode.product_limit();
        let selectors = &self.definition.selectors.pagination;
        let extra_pages = extra_page_bound(&self.test_mode);

        match self.definition.pagination {
            PaginationKind::None => {
                self.process_listing_page(page, category_name, session, limit)
                    .await
            }
            PaginationKind::LoadMore => {
                let clicks = load_more(
                    page.as_ref(),
                    selectors.load_more.as_deref(),
                    load_more_bound(&self.test_mode),
                    self.options.settle_delay(),
                )
                .await;
                debug!("Clicked load-more {} times on {}", clicks, page.url());
                self.process_listing_page(page, category_name, session, limit)
                    .await
            }
            PaginationKind::NextButton => {
                let mut processed = self
                    .process_listing_page(page, category_name, session, limit)
                    .await;
                let mut visited = 0;
                while processed < limit
                    && visited < extra_pages
                    && click_next(page.as_ref(), selectors.next_button.as_deref()).await
                {
                    visited += 1;
                    processed += self
                        .process_listing_page(page, category_name, session, limit - processed)
                        .await;
                }
                processed
            }
            PaginationKind::PageNumbers => {
                let urls = page_number_urls(
                    page.as_ref(),
                    selectors.page_numbers.as_deref(),
                    &self.definition.site.base_url,
                )
                .await;
                let mut processed = self
                    .process_listing_page(page, category_name, session, limit)
                    .await;
                for url in urls.into_iter().take(extra_pages) {
                    if processed >= limit {
                        break;
                    }
                    let opened = async {
                        page.goto(&url).await?;
                        page.wait_for_load().await
                    }
                    .await;
                    if let Err(e) = opened {
                        warn!("Stopping pagination, cannot open {}: {}", url, e);
                        break;
                    }
                    processed += self
                        .process_listing_page(page, category_name, session, limit - processed)
                        .await;
                }
                processed
            }
        }
    }

    async fn process_listing_page(
        &self,
        page: &Page,
        category_name: &str,
        session: &Arc<dyn CrawlSession>,
        limit: usize,
    ) -> usize {
        let ctx = self.context(category_name, page.as_ref());
        let containers =
            locate_containers(page.as_ref(), &self.definition.selectors.product_containers).await;
        if containers.is_empty() {
            warn!("No product containers found on {}", ctx.page_url);
            return 0;
        }

        if self.test_mode.enabled && containers.len() > limit {
            info!(
                "Test mode: processing {} of {} containers on {}",
                limit,
                containers.len(),
                ctx.page_url
            );
        }

        let mut processed = 0;
        for element in containers.into_iter().take(limit) {
            if let Err(e) = self
                .strategy
                .process_container(self, element, &ctx, session)
                .await
            {
                warn!("Skipping container on {}: {:#}", ctx.page_url, e);
                self.stats.item_skipped();
            }
            processed += 1;
        }
        processed
    }

    /// Extract one container and push the record right away.
    ///
    /// Extraction failures are logged and skipped; only a record sink failure
    /// is returned.
    pub async fn emit_product(
        &self,
        element: Element,
        ctx: &ExtractorContext,
        session: &Arc<dyn CrawlSession>,
    ) -> anyhow::Result<()> {
        match extract_product(&self.definition, element, ctx).await {
            Ok(Some(product)) => {
                debug!("Extracted '{}' from {}", product.name, ctx.page_url);
                session.push_record(product).await?;
                self.stats.product_pushed();
            }
            Ok(None) => {
                debug!("Skipping container without a product name on {}", ctx.page_url);
                self.stats.item_skipped();
            }
            Err(e) => {
                warn!("Failed to extract product on {}: {:#}", ctx.page_url, e);
                self.stats.item_skipped();
            }
        }
        Ok(())
    }
}

/// Scope element for a whole detail page
pub async fn detail_root(page: &dyn PageHandle) -> Option<Element> {
    for selector in ["body", "html"] {
        if let Ok(elements) = page.select(selector).await {
            if let Some(root) = elements.into_iter().next() {
                return Some(root);
            }
        }
    }
    None
}

#[async_trait]
impl RequestHandler for CrawlerEngine {
    async fn handle(
        &self,
        page: Page,
        request: CrawlRequest,
        session: Arc<dyn CrawlSession>,
    ) -> anyhow::Result<()> {
        self.stats.request_handled();

        if let Some(custom) = &self.definition.overrides.request_handler {
            return custom(page, request, session).await;
        }

        let label = request.route();
        debug!("Handling {} request {}", label.as_str(), request.url);
        match label {
            RequestLabel::Main => self.strategy.handle_main(self, &page, &session).await,
            RequestLabel::Category => {
                self.strategy
                    .handle_category(self, &page, &request, &session)
                    .await
            }
            RequestLabel::Product => {
                self.strategy
                    .handle_product(self, &page, &request, &session)
                    .await
            }
        }
    }
}
