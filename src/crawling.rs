//! Crawling layer: request routing, strategies and the brand registry
//!
//! - `engine`: the request handler every strategy runs through
//! - `strategy`, `inline_data`, `list_detail`: the closed strategy set
//! - `crawler`: one brand's run wrapped in a `crawl` span
//! - `registry`: brand → crawler factories, single and bulk runs

pub mod crawler;
pub mod engine;
pub mod error;
pub mod inline_data;
pub mod list_detail;
pub mod registry;
pub mod stats;
pub mod strategy;

pub use crawler::{CrawlReport, Crawler};
pub use engine::CrawlerEngine;
pub use error::{CrawlError, CrawlResult};
pub use list_detail::ListDetailStrategy;
pub use registry::{BrandRunResult, CrawlerFactory, Registry, RunAllOptions};
pub use stats::{CrawlStats, StatsRecorder};
pub use strategy::{CrawlStrategy, select_strategy};
