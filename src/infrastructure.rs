//! Infrastructure layer: collaborator contracts, configuration and logging
//!
//! The page and driver traits describe what the engine needs from a
//! browser-automation backend. `static_site` is an in-process implementation
//! of both over saved HTML.

pub mod config;
pub mod driver;
pub mod logging;
pub mod page;
pub mod static_site;

pub use config::{ConfigManager, EngineConfig, LoggingConfig};
pub use driver::{CrawlSession, DriverError, DriverResult, RequestHandler, RunDriver};
pub use logging::{init_logging, init_logging_with_config};
pub use page::{Element, ElementHandle, Page, PageError, PageHandle, PageResult};
pub use static_site::{StaticPage, StaticSite, StaticSiteDriver};
