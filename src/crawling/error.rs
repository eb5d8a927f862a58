//! Engine and registry error types

use thiserror::Error;

use crate::infrastructure::driver::DriverError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CrawlError {
    #[error("No crawler registered for brand '{0}'")]
    UnknownBrand(String),

    #[error("Invalid crawler definition for '{brand}': {reason}")]
    InvalidDefinition { brand: String, reason: String },

    #[error("Run driver failed for '{brand}': {source}")]
    Driver {
        brand: String,
        #[source]
        source: DriverError,
    },
}

impl CrawlError {
    pub fn invalid_definition(brand: &str, reason: impl Into<String>) -> Self {
        Self::InvalidDefinition {
            brand: brand.to_string(),
            reason: reason.into(),
        }
    }

    /// Brand the failure belongs to
    pub fn brand(&self) -> &str {
        match self {
            Self::UnknownBrand(brand)
            | Self::InvalidDefinition { brand, .. }
            | Self::Driver { brand, .. } => brand,
        }
    }
}

pub type CrawlResult<T> = Result<T, CrawlError>;
