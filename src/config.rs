//! Analysis configuration: column mapping and counting policies

use clap::ValueEnum;

use crate::error::{AffinityError, Result};

/// Largest basket enumerated by default. A basket of n items yields 2^n - n - 1 combinations.
pub const DEFAULT_MAX_BASKET_SIZE: usize = 16;

/// How repeated product ids inside one invoice are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum DuplicatePolicy {
    /// Every line item counts, so a product bought twice appears twice in its basket
    #[default]
    Keep,
    /// Each product id counts once per invoice
    Distinct,
}

/// What happens to an invoice whose basket exceeds `max_basket_size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OversizedPolicy {
    /// The invoice contributes nothing
    #[default]
    Skip,
    /// Only the first `max_basket_size` ids in canonical order are used
    Truncate,
}

/// Which id wins when several products share one display name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum NamePolicy {
    /// The smallest id in canonical order
    #[default]
    LowestId,
    /// The id that first appeared in the input
    FirstSeen,
}

/// Tuning for one affinity analysis run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AffinityConfig {
    pub duplicates: DuplicatePolicy,
    pub max_basket_size: usize,
    pub oversized: OversizedPolicy,
    pub name_policy: NamePolicy,
}

impl Default for AffinityConfig {
    fn default() -> Self {
        Self {
            duplicates: DuplicatePolicy::default(),
            max_basket_size: DEFAULT_MAX_BASKET_SIZE,
            oversized: OversizedPolicy::default(),
            name_policy: NamePolicy::default(),
        }
    }
}

impl AffinityConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_basket_size < 2 {
            return Err(AffinityError::InvalidConfig(format!(
                "max basket size must be at least 2, got {}",
                self.max_basket_size
            )));
        }
        Ok(())
    }
}

/// Names of the input columns the normalizer reads
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnNames {
    pub invoice: String,
    pub product_id: String,
    pub product_name: String,
    /// Optional; a missing time column leaves every timestamp unknown
    pub time: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            invoice: "invoice".to_string(),
            product_id: "productId".to_string(),
            product_name: "productName".to_string(),
            time: "time".to_string(),
        }
    }
}
