//! Property-based tests for the co-occurrence engine and ranked queries.
//!
//! - counter increments per invoice follow the subset count
//! - row order never changes the table
//! - tables over disjoint invoice sets add key-wise
//! - product filters partition the unfiltered rows consistently

use std::collections::BTreeSet;

use proptest::prelude::*;

use basketforge::{
    normalize, query, AffinityConfig, CooccurrenceTable, DuplicatePolicy, NamePolicy,
    ProductLabelIndex, QueryOutcome, RawRow, Selection, TransactionRecord,
};

// =============================================================================
// Strategies
// =============================================================================

/// Up to 8 invoices, each with up to 6 line items drawn from 5 products.
fn arb_baskets() -> impl Strategy<Value = Vec<Vec<u8>>> {
    prop::collection::vec(prop::collection::vec(0u8..5, 0..=6), 0..=8)
}

fn to_rows(baskets: &[Vec<u8>]) -> Vec<RawRow> {
    baskets
        .iter()
        .enumerate()
        .flat_map(|(invoice, products)| {
            products.iter().map(move |product| {
                RawRow::new(
                    &format!("INV{invoice}"),
                    &product.to_string(),
                    &format!("Product {product}"),
                )
            })
        })
        .collect()
}

fn to_records(rows: Vec<RawRow>) -> Vec<TransactionRecord> {
    normalize(rows).records
}

fn build(records: &[TransactionRecord]) -> CooccurrenceTable {
    CooccurrenceTable::build(records, &AffinityConfig::default()).unwrap()
}

fn subset_count(n: usize) -> u64 {
    if n < 2 {
        0
    } else {
        (1u64 << n) - n as u64 - 1
    }
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #[test]
    fn increments_follow_subset_count(baskets in arb_baskets()) {
        let records = to_records(to_rows(&baskets));
        let (table, stats) =
            CooccurrenceTable::build_with_stats(&records, &AffinityConfig::default()).unwrap();

        let expected: u64 = baskets.iter().map(|basket| subset_count(basket.len())).sum();
        prop_assert_eq!(stats.increments, expected);
        prop_assert_eq!(table.total_frequency(), expected);
        prop_assert!(table.iter().all(|(combination, frequency)| combination.len() >= 2 && frequency >= 1));
    }

    #[test]
    fn distinct_policy_counts_distinct_products(baskets in arb_baskets()) {
        let records = to_records(to_rows(&baskets));
        let config = AffinityConfig {
            duplicates: DuplicatePolicy::Distinct,
            ..AffinityConfig::default()
        };
        let (_, stats) = CooccurrenceTable::build_with_stats(&records, &config).unwrap();

        let expected: u64 = baskets
            .iter()
            .map(|basket| subset_count(basket.iter().collect::<BTreeSet<_>>().len()))
            .sum();
        prop_assert_eq!(stats.increments, expected);
    }

    #[test]
    fn row_order_does_not_matter(
        (rows, shuffled) in arb_baskets().prop_flat_map(|baskets| {
            let rows = to_rows(&baskets);
            (Just(rows.clone()), Just(rows).prop_shuffle())
        })
    ) {
        prop_assert_eq!(build(&to_records(rows)), build(&to_records(shuffled)));
    }

    #[test]
    fn disjoint_invoices_add_keywise(first in arb_baskets(), second in arb_baskets()) {
        // Prefix invoice ids so the two sets never share an invoice
        let tag = |rows: Vec<RawRow>, prefix: &str| -> Vec<RawRow> {
            rows.into_iter()
                .map(|mut row| {
                    row.invoice = row.invoice.map(|invoice| format!("{prefix}-{invoice}"));
                    row
                })
                .collect()
        };
        let first_rows = tag(to_rows(&first), "a");
        let second_rows = tag(to_rows(&second), "b");
        let all_rows: Vec<RawRow> = first_rows.iter().chain(&second_rows).cloned().collect();

        let mut merged = build(&to_records(first_rows));
        merged.merge(build(&to_records(second_rows)));

        prop_assert_eq!(merged, build(&to_records(all_rows)));
    }

    #[test]
    fn product_filters_cover_unfiltered_rows(baskets in arb_baskets()) {
        let records = to_records(to_rows(&baskets));
        let table = build(&records);
        let index = ProductLabelIndex::from_records(&records);

        let unfiltered = match query(&table, &index, &Selection::AllProducts, NamePolicy::LowestId).unwrap() {
            QueryOutcome::Rows(ranked) => ranked,
            QueryOutcome::NoCombinations => {
                prop_assert!(table.is_empty());
                return Ok(());
            }
        };

        let frequencies = unfiltered.frequencies();
        prop_assert!(frequencies.windows(2).all(|pair| pair[0] >= pair[1]));

        let mut filtered_total = 0u64;
        for name in index.product_options().into_iter().skip(1) {
            let id = index.resolve(&name, NamePolicy::LowestId).unwrap().clone();
            let expected: Vec<_> = unfiltered
                .combinations()
                .iter()
                .filter(|combination| combination.contains(&id))
                .cloned()
                .collect();

            match query(&table, &index, &Selection::Product(name), NamePolicy::LowestId).unwrap() {
                QueryOutcome::Rows(filtered) => {
                    prop_assert_eq!(filtered.combinations(), expected.as_slice());
                    prop_assert_eq!(filtered.max_columns(), unfiltered.max_columns());
                    filtered_total += filtered.frequencies().iter().sum::<u64>();
                }
                QueryOutcome::NoCombinations => prop_assert!(expected.is_empty()),
            }
        }

        let weighted_total: u64 = unfiltered
            .rows()
            .map(|row| {
                let distinct: BTreeSet<_> = row.combination.ids().iter().collect();
                row.frequency * distinct.len() as u64
            })
            .sum();
        prop_assert_eq!(filtered_total, weighted_total);
    }
}
