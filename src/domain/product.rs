use serde::{Deserialize, Serialize};

/// Normalized product category used by downstream storage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductCategory {
    #[default]
    Beverage,
    Food,
    Dessert,
    Other,
}

/// Nutrition facts for one serving
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NutritionInfo {
    pub serving_size: Option<String>,
    pub calories: Option<f64>,
    pub protein: Option<f64>,
    pub fat: Option<f64>,
    pub saturated_fat: Option<f64>,
    pub carbohydrates: Option<f64>,
    pub sugar: Option<f64>,
    pub sodium: Option<f64>,
    pub caffeine: Option<f64>,
    pub allergens: Option<String>,
}

impl NutritionInfo {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Normalized product record emitted by a crawl
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub name: String,
    pub name_en: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub image_url: String,
    pub category: ProductCategory,
    /// Category label as the site shows it
    pub external_category: String,
    /// Upsert key for downstream storage; stable across runs
    pub external_id: String,
    pub external_url: String,
    pub nutrition: Option<NutritionInfo>,
}

impl Product {
    /// Deterministic id built from brand, site category and product name.
    ///
    /// Empty parts are skipped so an unnamed category does not leave a gap.
    pub fn external_id_for(brand: &str, category: &str, name: &str) -> String {
        [brand, category, name]
            .iter()
            .map(|part| slug(part))
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join("_")
    }
}

fn slug(value: &str) -> String {
    value
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
        .to_lowercase()
}

/// A category discovered on the entry page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryInfo {
    pub name: String,
    pub url: String,
    pub id: Option<String>,
}

impl CategoryInfo {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            id: None,
        }
    }
}

/// Per-call extraction context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractorContext {
    pub base_url: String,
    pub category_name: String,
    pub page_url: String,
}

impl ExtractorContext {
    pub fn new(
        base_url: impl Into<String>,
        category_name: impl Into<String>,
        page_url: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            category_name: category_name.into(),
            page_url: page_url.into(),
        }
    }
}
