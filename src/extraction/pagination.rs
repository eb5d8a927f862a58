//! Bounded pagination drivers
//!
//! Neither driver reports errors: a control that is missing, hidden, disabled
//! or fails to click simply ends pagination. A `None` selector is a no-op.

use std::collections::HashSet;
use std::time::Duration;

use tracing::debug;

use super::primitives::resolve_url;
use crate::domain::TestModeConfig;
use crate::infrastructure::config::defaults;
use crate::infrastructure::page::{Element, PageHandle};

/// Click budget for "load more" controls
pub const fn load_more_bound(test_mode: &TestModeConfig) -> usize {
    if test_mode.enabled {
        defaults::TEST_MODE_LOAD_MORE_MAX_CLICKS
    } else {
        defaults::LOAD_MORE_MAX_CLICKS
    }
}

/// Extra pages followed by next-button and page-number pagination
pub const fn extra_page_bound(test_mode: &TestModeConfig) -> usize {
    if test_mode.enabled {
        defaults::TEST_MODE_MAX_EXTRA_PAGES
    } else {
        defaults::MAX_EXTRA_PAGES
    }
}

async fn first_on_page(page: &dyn PageHandle, selector: &str) -> Option<Element> {
    match page.select(selector).await {
        Ok(elements) => elements.into_iter().next(),
        Err(e) => {
            debug!("Pagination selector '{}' failed: {}", selector, e);
            None
        }
    }
}

/// Click a "load more" control until it goes away or `max_clicks` is reached.
///
/// Waits `settle` after every click. Returns the number of successful clicks.
pub async fn load_more(
    page: &dyn PageHandle,
    selector: Option<&str>,
    max_clicks: usize,
    settle: Duration,
) -> usize {
    let Some(selector) = selector else {
        return 0;
    };

    let mut clicks = 0;
    while clicks < max_clicks {
        let Some(control) = first_on_page(page, selector).await else {
            break;
        };
        if !control.is_visible().await.unwrap_or(false) {
            break;
        }
        if let Err(e) = control.click().await {
            debug!("Load-more click failed after {} clicks: {}", clicks, e);
            break;
        }
        if !settle.is_zero() {
            tokio::time::sleep(settle).await;
        }
        clicks += 1;
    }

    debug!("Load-more finished after {} clicks on {}", clicks, page.url());
    clicks
}

/// Advance to the next listing page once.
///
/// Returns `true` after a visible, enabled control was clicked and the page
/// signalled load completion. The caller decides whether to loop.
pub async fn click_next(page: &dyn PageHandle, selector: Option<&str>) -> bool {
    let Some(selector) = selector else {
        return false;
    };
    let Some(control) = first_on_page(page, selector).await else {
        return false;
    };

    let ready = control.is_visible().await.unwrap_or(false)
        && control.is_enabled().await.unwrap_or(false);
    if !ready {
        return false;
    }

    if let Err(e) = control.click().await {
        debug!("Next-page click failed: {}", e);
        return false;
    }
    if let Err(e) = page.wait_for_load().await {
        debug!("Next page did not finish loading: {}", e);
        return false;
    }
    true
}

/// Absolute URLs of numbered page links, in order, without the current page
pub async fn page_number_urls(
    page: &dyn PageHandle,
    selector: Option<&str>,
    base_url: &str,
) -> Vec<String> {
    let Some(selector) = selector else {
        return Vec::new();
    };
    let links = match page.select(selector).await {
        Ok(links) => links,
        Err(e) => {
            debug!("Page-number selector '{}' failed: {}", selector, e);
            return Vec::new();
        }
    };

    let current = page.url();
    let mut seen = HashSet::from([current]);
    let mut urls = Vec::new();
    for link in links {
        let Ok(Some(href)) = link.attribute("href").await else {
            continue;
        };
        let href = href.trim();
        if href.is_empty() || href.starts_with('#') || href.starts_with("javascript:") {
            continue;
        }
        let url = resolve_url(base_url, href);
        if seen.insert(url.clone()) {
            urls.push(url);
        }
    }
    urls
}
