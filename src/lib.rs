//! Brand Crawler - definition-driven product extraction
//!
//! Describe a catalogue site once (selectors, pagination style, crawl strategy)
//! and the engine discovers categories, paginates listings and emits normalized
//! product records. Fetching pages is delegated to a run driver implementing
//! the traits in [`infrastructure::driver`] and [`infrastructure::page`].
//!
//! ```no_run
//! use std::sync::Arc;
//! use brand_crawler::{Crawler, CrawlerDefinition, StaticSite, StaticSiteDriver};
//!
//! # async fn demo(json: &str) -> anyhow::Result<()> {
//! let definition = CrawlerDefinition::from_json_str(json)?;
//! let site = Arc::new(StaticSite::new().with_page(&definition.site.start_url, "<ul></ul>"));
//! let products = Crawler::new(definition, Arc::new(StaticSiteDriver::new(site)))
//!     .run()
//!     .await?;
//! println!("{}", serde_json::to_string_pretty(&products)?);
//! # Ok(())
//! # }
//! ```

pub mod crawling;
pub mod domain;
pub mod extraction;
pub mod infrastructure;

pub use crawling::{
    BrandRunResult, CrawlError, CrawlReport, CrawlStats, CrawlStrategy, Crawler, Registry,
    RunAllOptions,
};
pub use domain::{
    CategoryInfo, CrawlRequest, CrawlStrategyKind, CrawlerDefinition, CrawlerOptions,
    ExtractorContext, NutritionInfo, PaginationKind, Product, ProductCategory, SelectorConfig,
    SiteConfig, TestModeConfig, define_crawler,
};
pub use infrastructure::{
    CrawlSession, Element, ElementHandle, Page, PageError, PageHandle, RequestHandler, RunDriver,
    StaticPage, StaticSite, StaticSiteDriver,
};
