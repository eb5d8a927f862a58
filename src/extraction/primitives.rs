//! Field-level readers that never fail
//!
//! Every reader takes a scope element and a selector, looks at the first match
//! only, and falls back to a caller-supplied default on any failure: no match,
//! a detached element, an invalid selector, a timeout. Text is
//! whitespace-normalized and empty text counts as missing.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::trace;

use crate::infrastructure::page::{Element, ElementHandle};

static PRICE_PATTERN: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"\d[\d,]*(?:\.\d+)?").ok());

/// First element under `scope` matching `selector`
pub async fn first_match(scope: &dyn ElementHandle, selector: &str) -> Option<Element> {
    match scope.select(selector).await {
        Ok(elements) => elements.into_iter().next(),
        Err(e) => {
            trace!("Selector '{}' failed: {}", selector, e);
            None
        }
    }
}

/// Normalized text of `element` itself, `None` when empty or unreadable
pub async fn element_text(element: &dyn ElementHandle) -> Option<String> {
    match element.text().await {
        Ok(Some(text)) => normalize_whitespace(&text),
        Ok(None) => None,
        Err(e) => {
            trace!("Reading text failed: {}", e);
            None
        }
    }
}

pub async fn get_text(scope: &dyn ElementHandle, selector: &str, fallback: &str) -> String {
    match first_match(scope, selector).await {
        Some(element) => element_text(element.as_ref())
            .await
            .unwrap_or_else(|| fallback.to_string()),
        None => fallback.to_string(),
    }
}

/// Text under `selector`, `None` when missing. Used for optional fields.
pub async fn get_optional_text(scope: &dyn ElementHandle, selector: Option<&str>) -> Option<String> {
    let selector = selector?;
    let text = get_text(scope, selector, "").await;
    (!text.is_empty()).then_some(text)
}

pub async fn get_attribute(
    scope: &dyn ElementHandle,
    selector: &str,
    attribute: &str,
    fallback: &str,
) -> String {
    let Some(element) = first_match(scope, selector).await else {
        return fallback.to_string();
    };

    match element.attribute(attribute).await {
        Ok(Some(value)) if !value.trim().is_empty() => value.trim().to_string(),
        Ok(_) => fallback.to_string(),
        Err(e) => {
            trace!("Reading attribute '{}' failed: {}", attribute, e);
            fallback.to_string()
        }
    }
}

/// Absolute image URL of the first match, or `""`.
///
/// Reads `src`, then the lazy-loading `data-src`.
pub async fn get_image_url(scope: &dyn ElementHandle, selector: &str, base_url: &str) -> String {
    let Some(image) = first_match(scope, selector).await else {
        return String::new();
    };

    for attribute in ["src", "data-src"] {
        if let Ok(Some(value)) = image.attribute(attribute).await {
            let value = value.trim();
            if !value.is_empty() {
                return resolve_url(base_url, value);
            }
        }
    }

    String::new()
}

/// Resolve a link found on a page against the site's base URL.
///
/// - `http://` / `https://` (and `data:`) URLs pass through unchanged
/// - `//host/...` takes the base URL's scheme
/// - `/path` is appended to the base URL
/// - anything else is appended with one `/` in between
pub fn resolve_url(base_url: &str, path: &str) -> String {
    let path = path.trim();
    if path.is_empty() {
        return String::new();
    }
    if path.starts_with("http://") || path.starts_with("https://") || path.starts_with("data:") {
        return path.to_string();
    }

    let base = base_url.trim().trim_end_matches('/');
    if let Some(rest) = path.strip_prefix("//") {
        let scheme = base.split_once("://").map_or("https", |(scheme, _)| scheme);
        return format!("{scheme}://{rest}");
    }
    if path.starts_with('/') {
        format!("{base}{path}")
    } else {
        format!("{base}/{path}")
    }
}

/// First number in a price label, separators and currency marks dropped.
///
/// `"₩4,500"`, `"4,500원"` and `"4500"` all read as `4500.0`.
pub fn parse_price(text: &str) -> Option<f64> {
    let number = PRICE_PATTERN.as_ref()?.find(text)?.as_str().replace(',', "");
    number.parse::<f64>().ok()
}

pub fn normalize_whitespace(text: &str) -> Option<String> {
    let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
    (!normalized.is_empty()).then_some(normalized)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use proptest::prelude::*;
    use rstest::rstest;

    use super::*;
    use crate::infrastructure::page::PageHandle;
    use crate::infrastructure::static_site::{StaticPage, StaticSite};

    const CARD: &str = r#"
        <div class="card">
          <h3 class="name">  Iced
              Americano </h3>
          <span class="empty">   </span>
          <img class="lazy" data-src="images/ice.png">
          <img class="plain" src="/img/plain.png">
          <a class="link" href=" /menu/1 ">Detail</a>
        </div>
    "#;

    async fn card() -> Element {
        let site = Arc::new(StaticSite::new().with_page("https://cafe.test/", CARD));
        let page = StaticPage::open(site, "https://cafe.test/").unwrap();
        page.select("div.card").await.unwrap().remove(0)
    }

    #[rstest]
    #[case("https://cafe.test", "https://cdn.test/a.png", "https://cdn.test/a.png")]
    #[case("https://cafe.test", "/img/a.png", "https://cafe.test/img/a.png")]
    #[case("https://cafe.test/", "/img/a.png", "https://cafe.test/img/a.png")]
    #[case("https://cafe.test/", "img/a.png", "https://cafe.test/img/a.png")]
    #[case("https://cafe.test", "//cdn.test/a.png", "https://cdn.test/a.png")]
    #[case("https://cafe.test", "", "")]
    fn resolves_urls(#[case] base: &str, #[case] path: &str, #[case] expected: &str) {
        assert_eq!(resolve_url(base, path), expected);
    }

    #[rstest]
    #[case("₩4,500", Some(4500.0))]
    #[case("4,500원", Some(4500.0))]
    #[case("$3.50", Some(3.5))]
    #[case("1,200 ~ 1,500", Some(1200.0))]
    #[case("market price", None)]
    fn parses_prices(#[case] text: &str, #[case] expected: Option<f64>) {
        assert_eq!(parse_price(text), expected);
    }

    #[tokio::test]
    async fn text_is_normalized_and_empty_counts_as_missing() {
        let card = card().await;
        assert_eq!(get_text(card.as_ref(), ".name", "?").await, "Iced Americano");
        assert_eq!(get_text(card.as_ref(), ".empty", "?").await, "?");
        assert_eq!(get_text(card.as_ref(), ".absent", "?").await, "?");
        assert_eq!(get_text(card.as_ref(), "h3[", "?").await, "?");
        assert_eq!(get_optional_text(card.as_ref(), None).await, None);
    }

    #[tokio::test]
    async fn attributes_and_images_resolve() {
        let card = card().await;
        assert_eq!(get_attribute(card.as_ref(), ".link", "href", "").await, "/menu/1");
        assert_eq!(get_attribute(card.as_ref(), ".link", "title", "none").await, "none");
        assert_eq!(
            get_image_url(card.as_ref(), "img.lazy", "https://cafe.test/").await,
            "https://cafe.test/images/ice.png"
        );
        assert_eq!(
            get_image_url(card.as_ref(), "img.plain", "https://cafe.test").await,
            "https://cafe.test/img/plain.png"
        );
        assert_eq!(get_image_url(card.as_ref(), "img.none", "https://cafe.test").await, "");
    }

    proptest! {
        #[test]
        fn relative_paths_get_exactly_one_separator(
            base in "https://[a-z]{1,10}\\.test/?",
            path in "/?[a-z0-9][a-z0-9_./-]{0,20}",
        ) {
            let resolved = resolve_url(&base, &path);
            let bare = base.trim_end_matches('/');
            let tail = path.trim_start_matches('/');
            prop_assert_eq!(resolved, format!("{bare}/{tail}"));
        }

        #[test]
        fn image_reader_agrees_with_resolver(path in "/?[a-z0-9]{1,12}\\.png") {
            let html = format!(r#"<div class="card"><img src="{path}"></div>"#);
            let resolved = tokio_test::block_on(async {
                let site = Arc::new(StaticSite::new().with_page("https://cafe.test/", html));
                let page = StaticPage::open(site, "https://cafe.test/").unwrap();
                let card = page.select("div.card").await.unwrap().remove(0);
                get_image_url(card.as_ref(), "img", "https://cafe.test/").await
            });
            prop_assert_eq!(resolved, resolve_url("https://cafe.test", &path));
        }
    }
}
