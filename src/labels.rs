//! Product id to display name resolution

use std::collections::BTreeSet;

use indexmap::IndexMap;

use crate::config::NamePolicy;
use crate::data::{ProductId, TransactionRecord};

/// Selection option meaning "no product filter"
pub const ALL_PRODUCTS: &str = "All Products";

/// Display names keyed by product id.
///
/// Each id keeps the position where it was first seen, while its name is
/// overwritten by later records, so the last name seen for an id wins.
#[derive(Debug, Clone, Default)]
pub struct ProductLabelIndex {
    labels: IndexMap<ProductId, Option<String>>,
}

impl ProductLabelIndex {
    pub fn from_records(records: &[TransactionRecord]) -> Self {
        let mut labels = IndexMap::new();
        for record in records {
            labels.insert(record.product_id.clone(), record.product_name.clone());
        }
        Self { labels }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn label(&self, id: &ProductId) -> Option<&str> {
        self.labels.get(id).and_then(|name| name.as_deref())
    }

    /// Find the product id displayed as `name`
    pub fn resolve(&self, name: &str, policy: NamePolicy) -> Option<&ProductId> {
        let mut matches = self
            .labels
            .iter()
            .filter(|(_, label)| label.as_deref() == Some(name))
            .map(|(id, _)| id);

        match policy {
            NamePolicy::FirstSeen => matches.next(),
            NamePolicy::LowestId => matches.min(),
        }
    }

    /// `"All Products"` followed by every distinct display name, sorted
    pub fn product_options(&self) -> Vec<String> {
        let names: BTreeSet<&str> = self.labels.values().filter_map(|name| name.as_deref()).collect();

        std::iter::once(ALL_PRODUCTS)
            .chain(names)
            .map(str::to_string)
            .collect()
    }
}
