//! Domain module - shared record shapes and the crawler definition
//!
//! Nothing in here touches a page; it only describes what a crawl is asked to
//! do and what it produces.

pub mod definition;
pub mod options;
pub mod product;
pub mod request;
pub mod test_mode;

pub use definition::{
    define_crawler, CategoryExtractorFn, CrawlStrategyKind, CrawlerDefinition, DetailSelectors,
    ExtractorOverrides, NutritionExtractorFn, PaginationKind, PaginationSelectors,
    ProductDataSelectors, ProductExtractorFn, RequestHandlerFn, SelectorConfig, SiteConfig,
};
pub use options::CrawlerOptions;
pub use product::{CategoryInfo, ExtractorContext, NutritionInfo, Product, ProductCategory};
pub use request::{BasicProductInfo, CrawlRequest, RequestData, RequestLabel};
pub use test_mode::TestModeConfig;
