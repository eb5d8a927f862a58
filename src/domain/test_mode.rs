//! Reduced-scope run profile read from the environment.
//!
//! Source of truth: environment variables, read once at startup.
//! - CRAWLER_TEST_MODE: "1"/"true" enable, "0"/"false" disable (case-insensitive)
//! - CRAWLER_TEST_MAX_PRODUCTS: products per category (default 5)
//! - CRAWLER_TEST_MAX_REQUESTS: requests per crawl (default 20)
//!
//! The category limit is fixed at one while test mode is on.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

pub const ENV_TEST_MODE: &str = "CRAWLER_TEST_MODE";
pub const ENV_TEST_MAX_PRODUCTS: &str = "CRAWLER_TEST_MAX_PRODUCTS";
pub const ENV_TEST_MAX_REQUESTS: &str = "CRAWLER_TEST_MAX_REQUESTS";

pub const DEFAULT_TEST_MAX_PRODUCTS: usize = 5;
pub const DEFAULT_TEST_MAX_REQUESTS: usize = 20;
pub const TEST_MODE_MAX_CATEGORIES: usize = 1;

static CURRENT: Lazy<TestModeConfig> = Lazy::new(TestModeConfig::from_env);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestModeConfig {
    pub enabled: bool,
    pub max_products: Option<usize>,
    pub max_categories: Option<usize>,
    pub max_requests: Option<usize>,
}

impl TestModeConfig {
    /// Unbounded profile
    pub const fn disabled() -> Self {
        Self {
            enabled: false,
            max_products: None,
            max_categories: None,
            max_requests: None,
        }
    }

    pub const fn enabled(max_products: usize, max_requests: usize) -> Self {
        Self {
            enabled: true,
            max_products: Some(max_products),
            max_categories: Some(TEST_MODE_MAX_CATEGORIES),
            max_requests: Some(max_requests),
        }
    }

    /// Process-wide profile, read from the environment on first use
    pub fn current() -> Self {
        *CURRENT
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        if !read_flag(lookup(ENV_TEST_MODE), false) {
            return Self::disabled();
        }

        let max_products = read_count(lookup(ENV_TEST_MAX_PRODUCTS), DEFAULT_TEST_MAX_PRODUCTS);
        let max_requests = read_count(lookup(ENV_TEST_MAX_REQUESTS), DEFAULT_TEST_MAX_REQUESTS);
        Self::enabled(max_products, max_requests)
    }

    pub fn product_limit(&self) -> usize {
        self.max_products.unwrap_or(usize::MAX)
    }

    pub fn category_limit(&self) -> usize {
        self.max_categories.unwrap_or(usize::MAX)
    }

    pub fn request_limit(&self) -> usize {
        self.max_requests.unwrap_or(usize::MAX)
    }
}

fn read_flag(value: Option<String>, default: bool) -> bool {
    match value {
        Some(val) => match val.trim() {
            v if v.eq_ignore_ascii_case("1") || v.eq_ignore_ascii_case("true") => true,
            v if v.eq_ignore_ascii_case("0") || v.eq_ignore_ascii_case("false") => false,
            _ => default,
        },
        None => default,
    }
}

fn read_count(value: Option<String>, default: usize) -> usize {
    value
        .and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(default)
}
