//! Default extraction pipeline
//!
//! Selector-driven product, nutrition and category extraction. Each stage
//! first checks the definition for an override hook and delegates to it.
//!
//! The built-in paths only fail when an override does; missing fields fall back
//! to defaults and a missing name drops the item.

use std::collections::HashSet;

use tracing::{debug, warn};

use super::primitives::{
    element_text, first_match, get_image_url, get_optional_text, get_text, parse_price,
    resolve_url,
};
use crate::domain::{
    CategoryInfo, CrawlerDefinition, ExtractorContext, NutritionInfo, Product, ProductCategory,
};
use crate::infrastructure::page::{Element, ElementHandle, Page, PageHandle};

/// Image selector used when a definition names none
pub const DEFAULT_IMAGE_SELECTOR: &str = "img";

/// Containers of the first selector in `selectors` that matches anything
pub async fn locate_containers(page: &dyn PageHandle, selectors: &[String]) -> Vec<Element> {
    for selector in selectors {
        match page.select(selector).await {
            Ok(elements) if !elements.is_empty() => {
                debug!(
                    "Found {} product containers using selector '{}'",
                    elements.len(),
                    selector
                );
                return elements;
            }
            Ok(_) => debug!("No containers matched '{}'", selector),
            Err(e) => warn!("Container selector '{}' failed: {}", selector, e),
        }
    }
    Vec::new()
}

/// Extract one product from a listing container.
///
/// `Ok(None)` means the container holds no product (no name). Errors come only
/// from a custom product extractor.
pub async fn extract_product(
    definition: &CrawlerDefinition,
    element: Element,
    ctx: &ExtractorContext,
) -> anyhow::Result<Option<Product>> {
    if let Some(custom) = &definition.overrides.product {
        let product = custom(element.clone(), ctx.clone()).await?;
        return Ok(match product {
            Some(mut product) if product.nutrition.is_none() => {
                product.nutrition = nutrition_or_none(definition, element, ctx).await;
                Some(product)
            }
            other => other,
        });
    }

    let fields = &definition.selectors.product_data;
    let scope = element.as_ref();
    let image_selector = fields.image.as_deref().unwrap_or(DEFAULT_IMAGE_SELECTOR);

    let (name, name_en, description, image_url, price_text) = futures::join!(
        get_text(scope, &fields.name, ""),
        get_optional_text(scope, fields.name_en.as_deref()),
        get_optional_text(scope, fields.description.as_deref()),
        get_image_url(scope, image_selector, &definition.site.base_url),
        get_optional_text(scope, fields.price.as_deref()),
    );

    if name.is_empty() {
        return Ok(None);
    }

    let nutrition = match &definition.selectors.nutrition {
        Some(selector) => {
            let target = first_match(scope, selector).await.unwrap_or_else(|| element.clone());
            nutrition_or_none(definition, target, ctx).await
        }
        None => None,
    };

    Ok(Some(Product {
        external_id: Product::external_id_for(definition.brand(), &ctx.category_name, &name),
        name,
        name_en,
        description,
        price: price_text.as_deref().and_then(parse_price),
        image_url,
        category: ProductCategory::default(),
        external_category: ctx.category_name.clone(),
        external_url: ctx.page_url.clone(),
        nutrition,
    }))
}

/// Nutrition for one product. Without a custom extractor there is no
/// built-in grammar and the result is `None`.
pub async fn extract_nutrition(
    definition: &CrawlerDefinition,
    element: Element,
    ctx: &ExtractorContext,
) -> anyhow::Result<Option<NutritionInfo>> {
    let Some(custom) = &definition.overrides.nutrition else {
        return Ok(None);
    };
    let nutrition = custom(element, ctx.clone()).await?;
    Ok(nutrition.filter(|n| !n.is_empty()))
}

// Nutrition failures never cost the product
async fn nutrition_or_none(
    definition: &CrawlerDefinition,
    element: Element,
    ctx: &ExtractorContext,
) -> Option<NutritionInfo> {
    match extract_nutrition(definition, element, ctx).await {
        Ok(nutrition) => nutrition,
        Err(e) => {
            warn!("Nutrition extraction failed on {}: {:#}", ctx.page_url, e);
            None
        }
    }
}

/// Categories linked from the entry page, in page order, one per URL.
///
/// Links missing a name or an href are skipped. Without a category selector
/// (and no override) the result is empty.
pub async fn extract_categories(
    definition: &CrawlerDefinition,
    page: &Page,
    ctx: &ExtractorContext,
) -> anyhow::Result<Vec<CategoryInfo>> {
    if let Some(custom) = &definition.overrides.categories {
        return custom(page.clone(), ctx.clone()).await;
    }

    let Some(selector) = definition.selectors.category_links.as_deref() else {
        return Ok(Vec::new());
    };

    let links = match page.select(selector).await {
        Ok(links) => links,
        Err(e) => {
            warn!("Category selector '{}' failed: {}", selector, e);
            return Ok(Vec::new());
        }
    };

    let name_selector = definition.selectors.category_name.as_deref();
    let mut seen = HashSet::new();
    let mut categories = Vec::new();
    for link in links {
        let (name, href) = futures::join!(category_name(link.as_ref(), name_selector), async {
            link.attribute("href").await.ok().flatten()
        });

        let (Some(name), Some(href)) = (name, href) else {
            continue;
        };
        let url = resolve_url(&ctx.base_url, &href);
        if url.is_empty() || !seen.insert(url.clone()) {
            continue;
        }
        categories.push(CategoryInfo::new(name, url));
    }

    debug!("Discovered {} categories on {}", categories.len(), ctx.page_url);
    Ok(categories)
}

async fn category_name(link: &dyn ElementHandle, selector: Option<&str>) -> Option<String> {
    match selector {
        Some(selector) => {
            let name = get_text(link, selector, "").await;
            (!name.is_empty()).then_some(name)
        }
        None => element_text(link).await,
    }
}
