//! Labelled crawl requests
//!
//! The engine's state machine lives entirely in the label carried by each
//! request: `main` → `category` → `product`. Anything unlabelled is treated as
//! `main`.

use serde::{Deserialize, Serialize};

use super::product::CategoryInfo;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestLabel {
    Main,
    Category,
    Product,
}

impl RequestLabel {
    /// Parse a raw label tag; unknown tags yield `None`
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "main" => Some(Self::Main),
            "category" => Some(Self::Category),
            "product" => Some(Self::Product),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Main => "main",
            Self::Category => "category",
            Self::Product => "product",
        }
    }
}

/// Listing-page fields carried to the detail page in two-phase crawls
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BasicProductInfo {
    pub name: String,
    pub name_en: Option<String>,
    pub image_url: String,
    pub category_name: String,
    /// Site-native id mined from the listing, when one exists
    pub source_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestData {
    pub category_name: Option<String>,
    pub basic_info: Option<BasicProductInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlRequest {
    pub url: String,
    pub label: Option<RequestLabel>,
    #[serde(default)]
    pub user_data: RequestData,
}

impl CrawlRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            label: None,
            user_data: RequestData::default(),
        }
    }

    pub fn main(url: impl Into<String>) -> Self {
        Self {
            label: Some(RequestLabel::Main),
            ..Self::new(url)
        }
    }

    pub fn category(category: &CategoryInfo) -> Self {
        Self {
            url: category.url.clone(),
            label: Some(RequestLabel::Category),
            user_data: RequestData {
                category_name: Some(category.name.clone()),
                basic_info: None,
            },
        }
    }

    pub fn product(url: impl Into<String>, basic_info: BasicProductInfo) -> Self {
        Self {
            url: url.into(),
            label: Some(RequestLabel::Product),
            user_data: RequestData {
                category_name: Some(basic_info.category_name.clone()),
                basic_info: Some(basic_info),
            },
        }
    }

    /// Label used for routing; missing labels route to `main`
    pub fn route(&self) -> RequestLabel {
        self.label.unwrap_or(RequestLabel::Main)
    }

    /// Key used by queues to drop duplicate requests
    pub fn unique_key(&self) -> String {
        format!("{}|{}", self.route().as_str(), self.url)
    }
}
