//! Extraction layer: field readers, pagination drivers and the default
//! selector-driven pipeline

pub mod pagination;
pub mod pipeline;
pub mod primitives;

pub use pagination::{click_next, extra_page_bound, load_more, load_more_bound, page_number_urls};
pub use pipeline::{extract_categories, extract_nutrition, extract_product, locate_containers};
pub use primitives::{get_attribute, get_image_url, get_text, parse_price, resolve_url};
