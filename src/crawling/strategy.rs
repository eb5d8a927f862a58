//! Closed set of crawling strategies

use std::sync::Arc;

use super::engine::CrawlerEngine;
use super::inline_data;
use super::list_detail::ListDetailStrategy;
use crate::domain::{CrawlRequest, CrawlStrategyKind, CrawlerDefinition, ExtractorContext};
use crate::infrastructure::driver::CrawlSession;
use crate::infrastructure::page::{Element, Page};

#[derive(Debug, Clone)]
pub enum CrawlStrategy {
    /// Products are complete on the listing page
    InlineData,
    /// Listing gives basic fields; each product's detail page completes it
    ListDetail(ListDetailStrategy),
}

/// Strategy for a definition's declared kind. Modal sites crawl as inline data.
pub fn select_strategy(definition: &CrawlerDefinition) -> CrawlStrategy {
    match definition.strategy {
        CrawlStrategyKind::InlineData | CrawlStrategyKind::Modal => CrawlStrategy::InlineData,
        CrawlStrategyKind::ListDetail => {
            CrawlStrategy::ListDetail(ListDetailStrategy::new(definition))
        }
    }
}

impl CrawlStrategy {
    pub const fn kind(&self) -> CrawlStrategyKind {
        match self {
            Self::InlineData => CrawlStrategyKind::InlineData,
            Self::ListDetail(_) => CrawlStrategyKind::ListDetail,
        }
    }

    /// Whether a definition declaring `kind` is normally crawled this way
    pub const fn accepts(&self, kind: CrawlStrategyKind) -> bool {
        matches!(
            (self, kind),
            (
                Self::InlineData,
                CrawlStrategyKind::InlineData | CrawlStrategyKind::Modal
            ) | (Self::ListDetail(_), CrawlStrategyKind::ListDetail)
        )
    }

    pub(crate) async fn handle_main(
        &self,
        engine: &CrawlerEngine,
        page: &Page,
        session: &Arc<dyn CrawlSession>,
    ) -> anyhow::Result<()> {
        match self {
            Self::InlineData => inline_data::handle_main(engine, page, session).await,
            Self::ListDetail(strategy) => strategy.handle_main(engine, page, session).await,
        }
    }

    pub(crate) async fn handle_category(
        &self,
        engine: &CrawlerEngine,
        page: &Page,
        request: &CrawlRequest,
        session: &Arc<dyn CrawlSession>,
    ) -> anyhow::Result<()> {
        match self {
            Self::InlineData | Self::ListDetail(_) => {
                engine.handle_category_default(page, request, session).await
            }
        }
    }

    pub(crate) async fn handle_product(
        &self,
        engine: &CrawlerEngine,
        page: &Page,
        request: &CrawlRequest,
        session: &Arc<dyn CrawlSession>,
    ) -> anyhow::Result<()> {
        match self {
            Self::InlineData => engine.handle_product_default(page, request, session).await,
            Self::ListDetail(strategy) => {
                strategy.handle_product(engine, page, request, session).await
            }
        }
    }

    /// What one listing container turns into: a record, or a detail request
    pub(crate) async fn process_container(
        &self,
        engine: &CrawlerEngine,
        element: Element,
        ctx: &ExtractorContext,
        session: &Arc<dyn CrawlSession>,
    ) -> anyhow::Result<()> {
        match self {
            Self::InlineData => engine.emit_product(element, ctx, session).await,
            Self::ListDetail(strategy) => {
                strategy
                    .emit_detail_request(engine, element, ctx, session)
                    .await
            }
        }
    }
}
