//! BasketForge: market-basket (product affinity) analysis for transaction data
//!
//! Transaction rows are normalized into records, grouped by invoice and
//! expanded into every product combination bought together. The resulting
//! co-occurrence table is ranked by frequency and can be filtered to the
//! combinations containing one product.

pub mod cli;
pub mod config;
pub mod data;
pub mod engine;
pub mod error;
pub mod labels;
pub mod view;

// Re-export public items for easier access
pub use cli::Args;
pub use config::{AffinityConfig, ColumnNames, DuplicatePolicy, NamePolicy, OversizedPolicy};
pub use data::{
    filter_by_window, load_records, normalize, Normalized, ParsedTime, ProductId, RawRow,
    TimeColumnStatus, TimeWindow, TransactionRecord,
};
pub use engine::{BuildStats, Combination, CombinationRecord, CooccurrenceTable};
pub use error::{AffinityError, Result};
pub use labels::{ProductLabelIndex, ALL_PRODUCTS};
pub use view::{query, QueryOutcome, RankedTable, Selection};
