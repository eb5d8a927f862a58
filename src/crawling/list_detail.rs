//! List-detail strategy: listing pages carry basic fields, detail pages the rest
//!
//! Phase 1 (category page) turns every container into a `product` request that
//! carries the listing fields. Phase 2 (detail page) reads nutrition and the
//! optional detail fields and merges them with what was carried over.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info, warn};

use super::engine::{CrawlerEngine, detail_root};
use crate::domain::{
    BasicProductInfo, CrawlRequest, CrawlerDefinition, ExtractorContext, Product, ProductCategory,
};
use crate::extraction::pipeline::{DEFAULT_IMAGE_SELECTOR, extract_nutrition};
use crate::extraction::primitives::{
    first_match, get_attribute, get_image_url, get_optional_text, get_text, parse_price,
    resolve_url,
};
use crate::infrastructure::config::defaults;
use crate::infrastructure::driver::CrawlSession;
use crate::infrastructure::page::{Element, ElementHandle, Page};

static DEFAULT_ID_PATTERN: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(defaults::DETAIL_ID_PATTERN).ok());

#[derive(Debug, Clone)]
pub struct ListDetailStrategy {
    id_pattern: Option<Regex>,
}

impl ListDetailStrategy {
    /// Compile the definition's `onclick` id pattern, falling back to the
    /// `goXxx('id')` shape when it is absent or invalid
    pub fn new(definition: &CrawlerDefinition) -> Self {
        let custom = definition
            .site
            .detail_id_pattern
            .as_deref()
            .and_then(|pattern| match Regex::new(pattern) {
                Ok(regex) => Some(regex),
                Err(e) => {
                    warn!(
                        "Invalid detail id pattern for '{}', using default: {}",
                        definition.brand(),
                        e
                    );
                    None
                }
            });

        Self {
            id_pattern: custom.or_else(|| (*DEFAULT_ID_PATTERN).clone()),
        }
    }

    pub(crate) async fn handle_main(
        &self,
        engine: &CrawlerEngine,
        page: &Page,
        session: &Arc<dyn CrawlSession>,
    ) -> anyhow::Result<()> {
        page.wait_for_load().await?;
        let categories = engine.discover_categories(page).await;

        if categories.is_empty() {
            info!("No categories found, treating {} as the only listing", page.url());
            engine.paginate_and_extract(page, "", session).await;
            return Ok(());
        }

        info!("Enqueueing {} category pages", categories.len());
        session
            .enqueue(categories.iter().map(CrawlRequest::category).collect())
            .await?;
        Ok(())
    }

    /// Phase 1: one detail request per container.
    ///
    /// A container without a reachable detail page is emitted with its listing
    /// fields only.
    pub(crate) async fn emit_detail_request(
        &self,
        engine: &CrawlerEngine,
        element: Element,
        ctx: &ExtractorContext,
        session: &Arc<dyn CrawlSession>,
    ) -> anyhow::Result<()> {
        let definition = engine.definition();
        let fields = &definition.selectors.product_data;
        let scope = element.as_ref();
        let image_selector = fields.image.as_deref().unwrap_or(DEFAULT_IMAGE_SELECTOR);

        let (name, name_en, image_url, source_id) = futures::join!(
            get_text(scope, &fields.name, ""),
            get_optional_text(scope, fields.name_en.as_deref()),
            get_image_url(scope, image_selector, &definition.site.base_url),
            self.source_id(scope),
        );

        if name.is_empty() {
            debug!("Skipping container without a product name on {}", ctx.page_url);
            engine.recorder().item_skipped();
            return Ok(());
        }

        let basic = BasicProductInfo {
            name,
            name_en,
            image_url,
            category_name: ctx.category_name.clone(),
            source_id,
        };

        match self.detail_url(definition, scope, basic.source_id.as_deref()).await {
            Some(url) => {
                debug!("Detail page for '{}': {}", basic.name, url);
                session.enqueue(vec![CrawlRequest::product(url, basic)]).await?;
                engine.recorder().detail_requested();
            }
            None => {
                warn!(
                    "No detail page for '{}' on {}, keeping listing fields",
                    basic.name, ctx.page_url
                );
                let product = listing_product(definition.brand(), basic, &ctx.page_url);
                session.push_record(product).await?;
                engine.recorder().product_pushed();
            }
        }
        Ok(())
    }

    /// Phase 2: merge detail-page fields into the carried listing fields
    pub(crate) async fn handle_product(
        &self,
        engine: &CrawlerEngine,
        page: &Page,
        request: &CrawlRequest,
        session: &Arc<dyn CrawlSession>,
    ) -> anyhow::Result<()> {
        let Some(basic) = request.user_data.basic_info.clone() else {
            return engine.handle_product_default(page, request, session).await;
        };

        page.wait_for_load().await?;
        let definition = engine.definition();
        let root = detail_root(page.as_ref())
            .await
            .ok_or_else(|| anyhow::anyhow!("detail page {} has no body", request.url))?;
        let scope = root.as_ref();
        let ctx = engine.context(&basic.category_name, page.as_ref());

        let nutrition_target = match &definition.selectors.nutrition {
            Some(selector) => first_match(scope, selector)
                .await
                .unwrap_or_else(|| root.clone()),
            None => root.clone(),
        };
        let nutrition = match extract_nutrition(definition, nutrition_target, &ctx).await {
            Ok(nutrition) => nutrition,
            Err(e) => {
                warn!("Nutrition extraction failed on {}: {:#}", request.url, e);
                None
            }
        };

        let detail = definition.selectors.detail.clone().unwrap_or_default();
        let (description, price_text, detail_image) = futures::join!(
            get_optional_text(scope, detail.description.as_deref()),
            get_optional_text(scope, detail.price.as_deref()),
            async {
                match detail.image.as_deref() {
                    Some(selector) => get_image_url(scope, selector, &definition.site.base_url).await,
                    None => String::new(),
                }
            },
        );

        let mut product = listing_product(definition.brand(), basic, &request.url);
        product.description = description;
        product.price = price_text.as_deref().and_then(parse_price);
        if !detail_image.is_empty() {
            product.image_url = detail_image;
        }
        product.nutrition = nutrition;

        session.push_record(product).await?;
        engine.recorder().product_pushed();
        Ok(())
    }

    /// Site-native id from `data-id`, else mined from an `onclick` handler
    async fn source_id(&self, scope: &dyn ElementHandle) -> Option<String> {
        if let Some(id) = own_or_descendant_attribute(scope, "data-id").await {
            return Some(id);
        }

        let pattern = self.id_pattern.as_ref()?;
        let handler = own_or_descendant_attribute(scope, "onclick").await?;
        pattern
            .captures(&handler)
            .and_then(|captures| captures.get(1))
            .map(|id| id.as_str().to_string())
    }

    async fn detail_url(
        &self,
        definition: &CrawlerDefinition,
        scope: &dyn ElementHandle,
        source_id: Option<&str>,
    ) -> Option<String> {
        let base_url = &definition.site.base_url;

        if let Some(selector) = definition.selectors.detail_link.as_deref() {
            let href = get_attribute(scope, selector, "href", "").await;
            if !href.is_empty() && !href.starts_with('#') && !href.starts_with("javascript:") {
                return Some(resolve_url(base_url, &href));
            }
        }

        let template = definition.site.detail_url_template.as_deref()?;
        let id = source_id?;
        Some(resolve_url(base_url, &template.replace("{id}", id)))
    }
}

async fn own_or_descendant_attribute(scope: &dyn ElementHandle, name: &str) -> Option<String> {
    if let Ok(Some(value)) = scope.attribute(name).await {
        if !value.trim().is_empty() {
            return Some(value.trim().to_string());
        }
    }
    let value = get_attribute(scope, &format!("[{name}]"), name, "").await;
    (!value.is_empty()).then_some(value)
}

fn listing_product(brand: &str, basic: BasicProductInfo, external_url: &str) -> Product {
    Product {
        external_id: Product::external_id_for(brand, &basic.category_name, &basic.name),
        name: basic.name,
        name_en: basic.name_en,
        description: None,
        price: None,
        image_url: basic.image_url,
        category: ProductCategory::default(),
        external_category: basic.category_name,
        external_url: external_url.to_string(),
        nutrition: None,
    }
}
