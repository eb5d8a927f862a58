//! Declarative per-site crawler definition
//!
//! A definition is built once per brand and shared read-only for the whole run.
//! Everything but the override hooks can be loaded from JSON; hooks are attached
//! in code with the `with_*` builders.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use serde::{Deserialize, Deserializer, Serialize};

use super::options::CrawlerOptions;
use super::product::{CategoryInfo, ExtractorContext, NutritionInfo, Product};
use super::request::CrawlRequest;
use crate::infrastructure::driver::CrawlSession;
use crate::infrastructure::page::{Element, Page};

/// Site-specific replacement for the built-in product extraction
pub type ProductExtractorFn = Arc<
    dyn Fn(Element, ExtractorContext) -> BoxFuture<'static, anyhow::Result<Option<Product>>>
        + Send
        + Sync,
>;

/// Site-specific nutrition reader; there is no built-in grammar
pub type NutritionExtractorFn = Arc<
    dyn Fn(Element, ExtractorContext) -> BoxFuture<'static, anyhow::Result<Option<NutritionInfo>>>
        + Send
        + Sync,
>;

pub type CategoryExtractorFn = Arc<
    dyn Fn(Page, ExtractorContext) -> BoxFuture<'static, anyhow::Result<Vec<CategoryInfo>>>
        + Send
        + Sync,
>;

/// Replaces request routing entirely
pub type RequestHandlerFn = Arc<
    dyn Fn(Page, CrawlRequest, Arc<dyn CrawlSession>) -> BoxFuture<'static, anyhow::Result<()>>
        + Send
        + Sync,
>;

/// Crawling shape declared by a definition
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CrawlStrategyKind {
    #[default]
    InlineData,
    ListDetail,
    /// Detail shown in an in-page modal; crawled like inline data
    Modal,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PaginationKind {
    #[default]
    None,
    LoadMore,
    PageNumbers,
    NextButton,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteConfig {
    pub brand: String,
    pub base_url: String,
    pub start_url: String,

    /// Known category pages; when present they replace discovery
    #[serde(default)]
    pub category_urls: Vec<CategoryInfo>,

    /// Detail page template with an `{id}` placeholder
    #[serde(default)]
    pub detail_url_template: Option<String>,

    /// Regex whose first capture group is the detail id inside an `onclick`
    /// handler. Defaults to the `goXxx('id')` call shape.
    #[serde(default)]
    pub detail_id_pattern: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDataSelectors {
    pub name: String,
    #[serde(default)]
    pub name_en: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub price: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationSelectors {
    #[serde(default)]
    pub load_more: Option<String>,
    #[serde(default)]
    pub next_button: Option<String>,
    #[serde(default)]
    pub page_numbers: Option<String>,
}

/// Fields re-read on the detail page of a two-phase crawl
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailSelectors {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub price: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectorConfig {
    /// Product container selectors, tried in order until one matches
    #[serde(deserialize_with = "one_or_many")]
    pub product_containers: Vec<String>,
    pub product_data: ProductDataSelectors,
    #[serde(default)]
    pub nutrition: Option<String>,
    #[serde(default)]
    pub category_links: Option<String>,
    /// Name element inside each category link; the link text when absent
    #[serde(default)]
    pub category_name: Option<String>,
    /// Link to the detail page inside a product container
    #[serde(default)]
    pub detail_link: Option<String>,
    #[serde(default)]
    pub detail: Option<DetailSelectors>,
    #[serde(default)]
    pub pagination: PaginationSelectors,
}

/// Optional hooks replacing one sub-pipeline each
#[derive(Clone, Default)]
pub struct ExtractorOverrides {
    pub product: Option<ProductExtractorFn>,
    pub nutrition: Option<NutritionExtractorFn>,
    pub categories: Option<CategoryExtractorFn>,
    pub request_handler: Option<RequestHandlerFn>,
}

impl fmt::Debug for ExtractorOverrides {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractorOverrides")
            .field("product", &self.product.is_some())
            .field("nutrition", &self.nutrition.is_some())
            .field("categories", &self.categories.is_some())
            .field("request_handler", &self.request_handler.is_some())
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlerDefinition {
    pub site: SiteConfig,
    pub selectors: SelectorConfig,
    #[serde(default)]
    pub strategy: CrawlStrategyKind,
    #[serde(default)]
    pub pagination: PaginationKind,
    /// Run options for this site; the engine-wide defaults apply when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<CrawlerOptions>,
    #[serde(skip)]
    pub overrides: ExtractorOverrides,
}

/// Shape-only constructor for site definitions; performs no validation
pub fn define_crawler(definition: CrawlerDefinition) -> CrawlerDefinition {
    definition
}

impl CrawlerDefinition {
    pub fn new(site: SiteConfig, selectors: SelectorConfig) -> Self {
        Self {
            site,
            selectors,
            strategy: CrawlStrategyKind::default(),
            pagination: PaginationKind::default(),
            options: None,
            overrides: ExtractorOverrides::default(),
        }
    }

    pub fn from_json_str(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn brand(&self) -> &str {
        &self.site.brand
    }

    #[must_use]
    pub fn with_strategy(mut self, strategy: CrawlStrategyKind) -> Self {
        self.strategy = strategy;
        self
    }

    #[must_use]
    pub fn with_pagination(mut self, pagination: PaginationKind) -> Self {
        self.pagination = pagination;
        self
    }

    #[must_use]
    pub fn with_options(mut self, options: CrawlerOptions) -> Self {
        self.options = Some(options);
        self
    }

    #[must_use]
    pub fn with_product_extractor<F, Fut>(mut self, extractor: F) -> Self
    where
        F: Fn(Element, ExtractorContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Option<Product>>> + Send + 'static,
    {
        self.overrides.product = Some(Arc::new(move |element: Element, ctx: ExtractorContext| {
            extractor(element, ctx).boxed()
        }));
        self
    }

    #[must_use]
    pub fn with_nutrition_extractor<F, Fut>(mut self, extractor: F) -> Self
    where
        F: Fn(Element, ExtractorContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Option<NutritionInfo>>> + Send + 'static,
    {
        self.overrides.nutrition = Some(Arc::new(move |element: Element, ctx: ExtractorContext| {
            extractor(element, ctx).boxed()
        }));
        self
    }

    #[must_use]
    pub fn with_category_extractor<F, Fut>(mut self, extractor: F) -> Self
    where
        F: Fn(Page, ExtractorContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Vec<CategoryInfo>>> + Send + 'static,
    {
        self.overrides.categories = Some(Arc::new(move |page: Page, ctx: ExtractorContext| {
            extractor(page, ctx).boxed()
        }));
        self
    }

    #[must_use]
    pub fn with_request_handler<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(Page, CrawlRequest, Arc<dyn CrawlSession>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.overrides.request_handler = Some(Arc::new(
            move |page: Page, request: CrawlRequest, session: Arc<dyn CrawlSession>| {
                handler(page, request, session).boxed()
            },
        ));
        self
    }
}

// Accepts either a single selector string or a list of them
fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(selector) => vec![selector],
        OneOrMany::Many(selectors) => selectors,
    })
}
