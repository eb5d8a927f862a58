//! Page and element handles supplied by the page-fetching collaborator
//!
//! The engine never talks to a browser or an HTTP client directly. Everything it
//! reads from a rendered page goes through these two traits, so any automation
//! backend (headless browser, stored HTML snapshots, test doubles) can drive it.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

/// Shared handle to a rendered page
pub type Page = Arc<dyn PageHandle>;

/// Shared handle to a single element on a page
pub type Element = Arc<dyn ElementHandle>;

/// Failures reported by a page or element handle
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PageError {
    #[error("Invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("Element is no longer attached to the page")]
    Detached,

    #[error("Timed out after {millis}ms waiting for {what}")]
    Timeout { what: String, millis: u64 },

    #[error("Navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("Element is not interactable: {0}")]
    NotInteractable(String),
}

impl PageError {
    pub fn navigation(url: &str, reason: impl Into<String>) -> Self {
        Self::Navigation {
            url: url.to_string(),
            reason: reason.into(),
        }
    }
}

pub type PageResult<T> = Result<T, PageError>;

/// A rendered page the engine can query and navigate
#[async_trait]
pub trait PageHandle: Send + Sync {
    /// URL of the document currently loaded
    fn url(&self) -> String;

    /// All elements matching `selector`, in document order
    async fn select(&self, selector: &str) -> PageResult<Vec<Element>>;

    /// Navigate to `url` and wait until the document is available
    async fn goto(&self, url: &str) -> PageResult<()>;

    /// Resolve once the current document signals load completion
    async fn wait_for_load(&self) -> PageResult<()>;
}

/// A single element located on a page
#[async_trait]
pub trait ElementHandle: Send + Sync {
    /// Descendants of this element matching `selector`, in document order
    async fn select(&self, selector: &str) -> PageResult<Vec<Element>>;

    /// Rendered text content, `None` when the element has none
    async fn text(&self) -> PageResult<Option<String>>;

    async fn attribute(&self, name: &str) -> PageResult<Option<String>>;

    async fn is_visible(&self) -> PageResult<bool>;

    async fn is_enabled(&self) -> PageResult<bool>;

    async fn click(&self) -> PageResult<()>;
}
