//! Inline-data strategy: every product field is on the listing page
//!
//! The entry request walks the discovered categories one after another on the
//! same page instance. A category that fails is logged and skipped.

use std::sync::Arc;

use tracing::{info, warn};

use super::engine::CrawlerEngine;
use crate::domain::CategoryInfo;
use crate::infrastructure::driver::CrawlSession;
use crate::infrastructure::page::Page;

pub(crate) async fn handle_main(
    engine: &CrawlerEngine,
    page: &Page,
    session: &Arc<dyn CrawlSession>,
) -> anyhow::Result<()> {
    page.wait_for_load().await?;
    let categories = engine.discover_categories(page).await;

    if categories.is_empty() {
        info!("No categories found, extracting {} as a single listing", page.url());
        engine.paginate_and_extract(page, "", session).await;
        return Ok(());
    }

    info!("Visiting {} categories", categories.len());
    for category in &categories {
        if let Err(e) = visit_category(engine, page, category, session).await {
            warn!(
                "Category '{}' ({}) failed: {:#}",
                category.name, category.url, e
            );
            engine.recorder().category_failed();
        }
    }
    Ok(())
}

async fn visit_category(
    engine: &CrawlerEngine,
    page: &Page,
    category: &CategoryInfo,
    session: &Arc<dyn CrawlSession>,
) -> anyhow::Result<()> {
    page.goto(&category.url).await?;
    page.wait_for_load().await?;
    let processed = engine
        .paginate_and_extract(page, &category.name, session)
        .await;
    info!("Category '{}': {} containers processed", category.name, processed);
    Ok(())
}
