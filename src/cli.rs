//! Command-line interface definitions and argument parsing

use chrono::NaiveDate;
use clap::Parser;

use crate::config::{
    AffinityConfig, ColumnNames, DuplicatePolicy, NamePolicy, OversizedPolicy,
    DEFAULT_MAX_BASKET_SIZE,
};
use crate::data::TimeWindow;
use crate::labels::ALL_PRODUCTS;
use crate::view::Selection;

/// Market-basket analysis: which products are bought together
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the input CSV file
    #[arg(short, long, default_value = "data.csv")]
    pub input: String,

    /// Product display name to filter on, or "All Products"
    #[arg(short, long, default_value = ALL_PRODUCTS)]
    pub product: String,

    /// Print the selectable product names and exit
    #[arg(long)]
    pub list_products: bool,

    /// How repeated products within one invoice are counted
    #[arg(long, value_enum, default_value_t = DuplicatePolicy::Keep)]
    pub duplicates: DuplicatePolicy,

    /// Largest basket expanded into combinations
    #[arg(long, default_value_t = DEFAULT_MAX_BASKET_SIZE)]
    pub max_basket: usize,

    /// What to do with baskets above --max-basket
    #[arg(long, value_enum, default_value_t = OversizedPolicy::Skip)]
    pub oversized: OversizedPolicy,

    /// Which product id a shared display name resolves to
    #[arg(long, value_enum, default_value_t = NamePolicy::LowestId)]
    pub name_policy: NamePolicy,

    /// Only use transactions on or after this date (YYYY-MM-DD)
    #[arg(long)]
    pub since: Option<NaiveDate>,

    /// Only use transactions on or before this date (YYYY-MM-DD)
    #[arg(long)]
    pub until: Option<NaiveDate>,

    /// Invoice column name
    #[arg(long, default_value = "invoice")]
    pub invoice_col: String,

    /// Product id column name
    #[arg(long, default_value = "productId")]
    pub product_id_col: String,

    /// Product display name column name
    #[arg(long, default_value = "productName")]
    pub product_name_col: String,

    /// Transaction time column name
    #[arg(long, default_value = "time")]
    pub time_col: String,

    /// Number of ranked combinations to print
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,

    /// Write the ranked combinations to this CSV file
    #[arg(short, long)]
    pub output: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    pub fn affinity_config(&self) -> crate::Result<AffinityConfig> {
        let config = AffinityConfig {
            duplicates: self.duplicates,
            max_basket_size: self.max_basket,
            oversized: self.oversized,
            name_policy: self.name_policy,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn columns(&self) -> ColumnNames {
        ColumnNames {
            invoice: self.invoice_col.clone(),
            product_id: self.product_id_col.clone(),
            product_name: self.product_name_col.clone(),
            time: self.time_col.clone(),
        }
    }

    pub fn time_window(&self) -> crate::Result<TimeWindow> {
        TimeWindow::new(self.since, self.until)
    }

    pub fn selection(&self) -> Selection {
        Selection::from(self.product.as_str())
    }
}
