//! In-process page collaborator over stored HTML snapshots
//!
//! `StaticSite` maps URLs to saved documents. `StaticPage` implements the page
//! contract on top of it with `scraper`, and `StaticSiteDriver` is a small
//! sequential run driver. Together they replay saved catalogue pages through
//! the engine without a browser.
//!
//! Element handles remember the document they were found in and their position
//! in it. Every operation re-parses that document, so no parsed tree is held
//! across an await. Navigating the page detaches every earlier handle.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};
use url::Url;

use super::driver::{CrawlSession, DriverError, DriverResult, RequestHandler, RunDriver};
use super::page::{Element, ElementHandle, PageError, PageHandle, PageResult};
use crate::domain::{CrawlRequest, CrawlerOptions, Product};

/// Saved documents keyed by absolute URL
#[derive(Debug, Default)]
pub struct StaticSite {
    pages: HashMap<String, Arc<str>>,
    clicks: AtomicUsize,
}

impl StaticSite {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_page(mut self, url: impl Into<String>, html: impl Into<String>) -> Self {
        self.pages.insert(url.into(), Arc::from(html.into()));
        self
    }

    /// Snapshot for `url`; a `#fragment` is ignored when the exact URL is unknown
    pub fn document(&self, url: &str) -> Option<Arc<str>> {
        self.pages.get(url).cloned().or_else(|| {
            url.split_once('#')
                .and_then(|(without_fragment, _)| self.pages.get(without_fragment).cloned())
        })
    }

    /// Number of clicks performed on any page of this site
    pub fn click_count(&self) -> usize {
        self.clicks.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
struct LoadedDocument {
    url: String,
    html: Arc<str>,
}

#[derive(Debug)]
struct PageInner {
    site: Arc<StaticSite>,
    current: Mutex<LoadedDocument>,
    generation: AtomicU64,
}

impl PageInner {
    fn snapshot(&self) -> (String, Arc<str>, u64) {
        let current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        (
            current.url.clone(),
            Arc::clone(&current.html),
            self.generation.load(Ordering::SeqCst),
        )
    }

    fn navigate(&self, url: &str) -> PageResult<()> {
        let html = self
            .site
            .document(url)
            .ok_or_else(|| PageError::navigation(url, "no snapshot stored for this URL"))?;

        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        current.url = url.to_string();
        current.html = html;
        self.generation.fetch_add(1, Ordering::SeqCst);
        debug!("Static page navigated to {}", url);
        Ok(())
    }
}

/// Page handle backed by a [`StaticSite`]
#[derive(Debug, Clone)]
pub struct StaticPage {
    inner: Arc<PageInner>,
}

impl StaticPage {
    /// Open `url` on `site`
    pub fn open(site: Arc<StaticSite>, url: &str) -> PageResult<Self> {
        let html = site
            .document(url)
            .ok_or_else(|| PageError::navigation(url, "no snapshot stored for this URL"))?;

        Ok(Self {
            inner: Arc::new(PageInner {
                site,
                current: Mutex::new(LoadedDocument {
                    url: url.to_string(),
                    html,
                }),
                generation: AtomicU64::new(0),
            }),
        })
    }

    fn element(&self, html: &Arc<str>, generation: u64, index: usize) -> Element {
        Arc::new(StaticElement {
            page: Arc::clone(&self.inner),
            html: Arc::clone(html),
            generation,
            index,
        })
    }
}

#[async_trait]
impl PageHandle for StaticPage {
    fn url(&self) -> String {
        self.inner.snapshot().0
    }

    async fn select(&self, selector: &str) -> PageResult<Vec<Element>> {
        let (_, html, generation) = self.inner.snapshot();
        let indices = select_in_document(&html, None, selector)?;
        Ok(indices
            .into_iter()
            .map(|index| self.element(&html, generation, index))
            .collect())
    }

    async fn goto(&self, url: &str) -> PageResult<()> {
        self.inner.navigate(url)
    }

    async fn wait_for_load(&self) -> PageResult<()> {
        Ok(())
    }
}

/// One element of a loaded snapshot, addressed by document order
#[derive(Debug)]
pub struct StaticElement {
    page: Arc<PageInner>,
    html: Arc<str>,
    generation: u64,
    index: usize,
}

impl StaticElement {
    fn ensure_attached(&self) -> PageResult<()> {
        if self.page.generation.load(Ordering::SeqCst) == self.generation {
            Ok(())
        } else {
            Err(PageError::Detached)
        }
    }

    fn inspect<T>(&self, read: impl FnOnce(ElementRef<'_>) -> T) -> PageResult<T> {
        self.ensure_attached()?;
        let document = Html::parse_document(&self.html);
        let element = document_elements(&document)
            .nth(self.index)
            .ok_or(PageError::Detached)?;
        Ok(read(element))
    }
}

#[async_trait]
impl ElementHandle for StaticElement {
    async fn select(&self, selector: &str) -> PageResult<Vec<Element>> {
        self.ensure_attached()?;
        let indices = select_in_document(&self.html, Some(self.index), selector)?;
        Ok(indices
            .into_iter()
            .map(|index| -> Element {
                Arc::new(Self {
                    page: Arc::clone(&self.page),
                    html: Arc::clone(&self.html),
                    generation: self.generation,
                    index,
                })
            })
            .collect())
    }

    async fn text(&self) -> PageResult<Option<String>> {
        self.inspect(|element| {
            let text: String = element.text().collect();
            if text.trim().is_empty() { None } else { Some(text) }
        })
    }

    async fn attribute(&self, name: &str) -> PageResult<Option<String>> {
        self.inspect(|element| element.value().attr(name).map(str::to_string))
    }

    async fn is_visible(&self) -> PageResult<bool> {
        self.inspect(|element| {
            std::iter::once(element)
                .chain(element.ancestors().filter_map(ElementRef::wrap))
                .all(|node| !is_hidden(node))
        })
    }

    async fn is_enabled(&self) -> PageResult<bool> {
        self.inspect(|element| {
            let value = element.value();
            value.attr("disabled").is_none()
                && !value
                    .attr("aria-disabled")
                    .is_some_and(|v| v.eq_ignore_ascii_case("true"))
                && !value.classes().any(|class| class == "disabled")
        })
    }

    async fn click(&self) -> PageResult<()> {
        if !self.is_visible().await? {
            return Err(PageError::NotInteractable(format!(
                "element #{} is hidden",
                self.index
            )));
        }

        let href = self.inspect(|element| {
            (element.value().name() == "a")
                .then(|| element.value().attr("href").map(str::to_string))
                .flatten()
        })?;
        self.page.site.clicks.fetch_add(1, Ordering::SeqCst);

        let Some(href) = href.filter(|h| !h.starts_with('#') && !h.starts_with("javascript:"))
        else {
            return Ok(());
        };

        let (current_url, _, _) = self.page.snapshot();
        let target = Url::parse(&current_url)
            .and_then(|base| base.join(&href))
            .map_err(|e| PageError::navigation(&href, e.to_string()))?;
        self.page.navigate(target.as_str())
    }
}

fn document_elements(document: &Html) -> impl Iterator<Item = ElementRef<'_>> {
    document
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
}

// Document-order indices of the elements matching `selector`, optionally
// restricted to strict descendants of the element at `scope`
fn select_in_document(html: &str, scope: Option<usize>, selector: &str) -> PageResult<Vec<usize>> {
    let parsed = Selector::parse(selector).map_err(|e| PageError::InvalidSelector {
        selector: selector.to_string(),
        reason: e.to_string(),
    })?;

    let document = Html::parse_document(html);
    let positions: HashMap<_, usize> = document_elements(&document)
        .enumerate()
        .map(|(index, element)| (element.id(), index))
        .collect();

    let matches: Vec<usize> = match scope {
        None => document
            .select(&parsed)
            .filter_map(|element| positions.get(&element.id()).copied())
            .collect(),
        Some(scope_index) => {
            let scope_element = document_elements(&document)
                .nth(scope_index)
                .ok_or(PageError::Detached)?;
            scope_element
                .select(&parsed)
                .filter(|element| element.id() != scope_element.id())
                .filter_map(|element| positions.get(&element.id()).copied())
                .collect()
        }
    };

    Ok(matches)
}

fn is_hidden(element: ElementRef<'_>) -> bool {
    let value = element.value();
    if value.attr("hidden").is_some() {
        return true;
    }

    value.attr("style").is_some_and(|style| {
        let compact: String = style
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_ascii_lowercase();
        compact.contains("display:none") || compact.contains("visibility:hidden")
    })
}

/// Queue and dataset shared by one static run
#[derive(Default)]
struct StaticSession {
    pending: Mutex<VecDeque<CrawlRequest>>,
    seen: Mutex<HashSet<String>>,
    records: Arc<tokio::sync::Mutex<Vec<Product>>>,
}

impl StaticSession {
    fn next_request(&self) -> Option<CrawlRequest> {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
    }

    fn push_unique(&self, requests: Vec<CrawlRequest>) -> usize {
        let mut seen = self.seen.lock().unwrap_or_else(PoisonError::into_inner);
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        let mut added = 0;
        for request in requests {
            if seen.insert(request.unique_key()) {
                pending.push_back(request);
                added += 1;
            }
        }
        added
    }
}

#[async_trait]
impl CrawlSession for StaticSession {
    async fn enqueue(&self, requests: Vec<CrawlRequest>) -> DriverResult<()> {
        if let Some(bad) = requests.iter().find(|r| Url::parse(&r.url).is_err()) {
            return Err(DriverError::Enqueue {
                url: bad.url.clone(),
                reason: "not an absolute URL".to_string(),
            });
        }
        let added = self.push_unique(requests);
        debug!("Enqueued {} new request(s)", added);
        Ok(())
    }

    async fn push_record(&self, product: Product) -> DriverResult<()> {
        self.records.lock().await.push(product);
        Ok(())
    }
}

/// Sequential run driver over a [`StaticSite`].
///
/// Requests are handled one at a time in FIFO order, so `max_concurrency` has
/// no effect. Duplicate requests (same label and URL) are dropped on enqueue.
/// `collect_all` returns the records of the latest run only.
pub struct StaticSiteDriver {
    site: Arc<StaticSite>,
    records: Arc<tokio::sync::Mutex<Vec<Product>>>,
    failed_requests: AtomicUsize,
}

impl StaticSiteDriver {
    pub fn new(site: Arc<StaticSite>) -> Self {
        Self {
            site,
            records: Arc::new(tokio::sync::Mutex::new(Vec::new())),
            failed_requests: AtomicUsize::new(0),
        }
    }

    pub fn site(&self) -> &Arc<StaticSite> {
        &self.site
    }

    /// Requests given up on after exhausting their retries
    pub fn failed_requests(&self) -> usize {
        self.failed_requests.load(Ordering::SeqCst)
    }

    async fn handle_with_retries(
        &self,
        request: &CrawlRequest,
        options: &CrawlerOptions,
        handler: &Arc<dyn RequestHandler>,
        session: &Arc<StaticSession>,
    ) -> bool {
        let attempts = options.max_retries.saturating_add(1);
        for attempt in 1..=attempts {
            let outcome = match StaticPage::open(Arc::clone(&self.site), &request.url) {
                Ok(page) => {
                    let session: Arc<dyn CrawlSession> = session.clone();
                    match tokio::time::timeout(
                        options.request_timeout(),
                        handler.handle(Arc::new(page), request.clone(), session),
                    )
                    .await
                    {
                        Ok(result) => result,
                        Err(_) => Err(anyhow::anyhow!(
                            "handler timed out after {}s",
                            options.request_timeout_secs
                        )),
                    }
                }
                Err(e) => Err(e.into()),
            };

            match outcome {
                Ok(()) => return true,
                Err(e) => warn!(
                    "Request {} failed (attempt {}/{}): {:#}",
                    request.url, attempt, attempts, e
                ),
            }
        }
        false
    }
}

#[async_trait]
impl RunDriver for StaticSiteDriver {
    async fn run(
        &self,
        seeds: Vec<CrawlRequest>,
        options: &CrawlerOptions,
        handler: Arc<dyn RequestHandler>,
    ) -> DriverResult<()> {
        // Each run starts from an empty dataset
        self.records.lock().await.clear();
        let session = Arc::new(StaticSession {
            records: Arc::clone(&self.records),
            ..StaticSession::default()
        });
        session.enqueue(seeds).await?;

        let mut handled = 0usize;
        while let Some(request) = session.next_request() {
            if handled >= options.max_requests_per_crawl {
                warn!(
                    "Reached max_requests_per_crawl ({}), leaving remaining requests unprocessed",
                    options.max_requests_per_crawl
                );
                break;
            }
            handled += 1;

            if !self
                .handle_with_retries(&request, options, &handler, &session)
                .await
            {
                self.failed_requests.fetch_add(1, Ordering::SeqCst);
                warn!("Giving up on {} after {} retries", request.url, options.max_retries);
            }
        }

        debug!("Static run finished after {} request(s)", handled);
        Ok(())
    }

    async fn collect_all(&self) -> DriverResult<Vec<Product>> {
        Ok(self.records.lock().await.clone())
    }
}
