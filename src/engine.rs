//! Co-occurrence engine: counts every product combination bought together
//!
//! Records are grouped by invoice and each basket of n items is expanded into
//! all of its sub-combinations of size 2..=n. The counts accumulate in a map
//! owned by one build call and are returned as an immutable
//! [`CooccurrenceTable`].

use std::collections::{BTreeMap, HashMap};

use itertools::Itertools;
use tracing::{debug, warn};

use crate::config::{AffinityConfig, DuplicatePolicy, OversizedPolicy};
use crate::data::{ProductId, TransactionRecord};
use crate::error::Result;

/// A sorted tuple of product ids, size >= 2 when produced by the engine
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Combination(Vec<ProductId>);

impl Combination {
    /// Build a combination in canonical (sorted) order
    pub fn new(mut ids: Vec<ProductId>) -> Self {
        ids.sort();
        Self(ids)
    }

    pub fn ids(&self) -> &[ProductId] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, id: &ProductId) -> bool {
        self.0.contains(id)
    }
}

impl<T: Into<ProductId>> FromIterator<T> for Combination {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(Into::into).collect())
    }
}

/// One combination and the number of times it was observed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CombinationRecord {
    pub combination: Combination,
    pub frequency: u64,
}

/// Counters collected while building a table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildStats {
    /// Distinct invoices seen
    pub invoices: usize,
    /// Invoices that contributed combinations
    pub multi_item_invoices: usize,
    /// Invoices above the basket ceiling, skipped or truncated
    pub guarded_invoices: usize,
    /// Total counter increments across all invoices
    pub increments: u64,
}

/// Frequency of every observed combination
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CooccurrenceTable {
    counts: BTreeMap<Combination, u64>,
}

impl CooccurrenceTable {
    /// Count combinations across all invoices in `records`
    pub fn build(records: &[TransactionRecord], config: &AffinityConfig) -> Result<Self> {
        Self::build_with_stats(records, config).map(|(table, _)| table)
    }

    pub fn build_with_stats(
        records: &[TransactionRecord],
        config: &AffinityConfig,
    ) -> Result<(Self, BuildStats)> {
        config.validate()?;

        let mut baskets: HashMap<&str, Vec<&ProductId>> = HashMap::new();
        for record in records {
            baskets
                .entry(record.invoice.as_str())
                .or_default()
                .push(&record.product_id);
        }

        let mut stats = BuildStats::default();
        let mut counter: HashMap<Vec<&ProductId>, u64> = HashMap::new();

        for (invoice, mut basket) in baskets {
            stats.invoices += 1;

            basket.sort();
            if config.duplicates == DuplicatePolicy::Distinct {
                basket.dedup();
            }
            if basket.len() < 2 {
                continue;
            }

            if basket.len() > config.max_basket_size {
                stats.guarded_invoices += 1;
                match config.oversized {
                    OversizedPolicy::Skip => {
                        warn!(
                            invoice,
                            items = basket.len(),
                            limit = config.max_basket_size,
                            "skipping oversized basket"
                        );
                        continue;
                    }
                    OversizedPolicy::Truncate => {
                        warn!(
                            invoice,
                            items = basket.len(),
                            limit = config.max_basket_size,
                            "truncating oversized basket"
                        );
                        basket.truncate(config.max_basket_size);
                    }
                }
            }

            stats.multi_item_invoices += 1;

            // Sub-sequences of a sorted basket are already canonical
            for size in 2..=basket.len() {
                for combination in basket.iter().copied().combinations(size) {
                    *counter.entry(combination).or_insert(0) += 1;
                    stats.increments += 1;
                }
            }
        }

        let counts: BTreeMap<Combination, u64> = counter
            .into_iter()
            .map(|(ids, frequency)| (Combination(ids.into_iter().cloned().collect()), frequency))
            .collect();

        debug!(
            invoices = stats.invoices,
            multi_item_invoices = stats.multi_item_invoices,
            combinations = counts.len(),
            "built co-occurrence table"
        );

        Ok((Self { counts }, stats))
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Count for `combination`, zero when never observed
    pub fn frequency(&self, combination: &Combination) -> u64 {
        self.counts.get(combination).copied().unwrap_or(0)
    }

    /// Entries in canonical combination order
    pub fn iter(&self) -> impl Iterator<Item = (&Combination, u64)> + '_ {
        self.counts.iter().map(|(combination, &frequency)| (combination, frequency))
    }

    /// Size of the largest combination, zero for an empty table
    pub fn max_combination_size(&self) -> usize {
        self.counts.keys().map(Combination::len).max().unwrap_or(0)
    }

    pub fn total_frequency(&self) -> u64 {
        self.counts.values().sum()
    }

    /// Add `other`'s counts key-wise into this table
    pub fn merge(&mut self, other: CooccurrenceTable) {
        for (combination, frequency) in other.counts {
            *self.counts.entry(combination).or_insert(0) += frequency;
        }
    }

    pub fn into_records(self) -> Vec<CombinationRecord> {
        self.counts
            .into_iter()
            .map(|(combination, frequency)| CombinationRecord {
                combination,
                frequency,
            })
            .collect()
    }
}
