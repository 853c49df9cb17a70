//! Ranked combination tables for presentation

use std::cmp::Reverse;
use std::fmt;
use std::fs::File;
use std::path::Path;

use ndarray::{s, Array2, ArrayView1};
use polars::prelude::*;
use tracing::debug;

use crate::config::NamePolicy;
use crate::engine::{Combination, CooccurrenceTable};
use crate::error::{AffinityError, Result};
use crate::labels::{ProductLabelIndex, ALL_PRODUCTS};

/// Which combinations a query returns
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    AllProducts,
    /// Combinations containing the product with this display name
    Product(String),
}

impl From<&str> for Selection {
    fn from(choice: &str) -> Self {
        if choice == ALL_PRODUCTS {
            Selection::AllProducts
        } else {
            Selection::Product(choice.to_string())
        }
    }
}

/// Result of a query; an empty result is not an error
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    Rows(RankedTable),
    NoCombinations,
}

/// Combinations sorted by frequency with a fixed number of label columns.
///
/// Rows for combinations shorter than `max_columns` are padded with `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedTable {
    combinations: Vec<Combination>,
    frequencies: Vec<u64>,
    labels: Array2<Option<String>>,
}

/// A borrowed row of a [`RankedTable`]
#[derive(Debug, Clone)]
pub struct RankedRow<'a> {
    pub frequency: u64,
    pub combination: &'a Combination,
    pub labels: ArrayView1<'a, Option<String>>,
}

impl RankedTable {
    pub fn len(&self) -> usize {
        self.frequencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frequencies.is_empty()
    }

    pub fn max_columns(&self) -> usize {
        self.labels.ncols()
    }

    pub fn frequencies(&self) -> &[u64] {
        &self.frequencies
    }

    pub fn combinations(&self) -> &[Combination] {
        &self.combinations
    }

    pub fn rows(&self) -> impl Iterator<Item = RankedRow<'_>> + '_ {
        self.combinations
            .iter()
            .zip(&self.frequencies)
            .zip(self.labels.outer_iter())
            .map(|((combination, &frequency), labels)| RankedRow {
                frequency,
                combination,
                labels,
            })
    }

    /// The first `limit` rows, keeping the column count
    pub fn head(&self, limit: usize) -> RankedTable {
        let n = limit.min(self.len());
        RankedTable {
            combinations: self.combinations[..n].to_vec(),
            frequencies: self.frequencies[..n].to_vec(),
            labels: self.labels.slice(s![..n, ..]).to_owned(),
        }
    }

    /// `frequency` followed by `product_1 ..= product_{max_columns}`
    pub fn column_names(&self) -> Vec<String> {
        std::iter::once("frequency".to_string())
            .chain((1..=self.max_columns()).map(|position| format!("product_{position}")))
            .collect()
    }

    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let names = self.column_names();
        let mut columns = Vec::with_capacity(names.len());
        columns.push(Series::new(&names[0], self.frequencies.clone()));
        for (position, name) in names.iter().skip(1).enumerate() {
            let values: Vec<Option<String>> = self.labels.column(position).iter().cloned().collect();
            columns.push(Series::new(name, values));
        }
        Ok(DataFrame::new(columns)?)
    }

    pub fn write_csv(&self, output_path: impl AsRef<Path>) -> Result<()> {
        let mut df = self.to_dataframe()?;
        let mut file = File::create(output_path)?;
        CsvWriter::new(&mut file).include_header(true).finish(&mut df)?;
        Ok(())
    }
}

impl fmt::Display for RankedTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.column_names().join(" | "))?;
        for row in self.rows() {
            let labels: Vec<&str> = row
                .labels
                .iter()
                .map(|label| label.as_deref().unwrap_or(""))
                .collect();
            writeln!(f, "{} | {}", row.frequency, labels.join(" | "))?;
        }
        Ok(())
    }
}

/// Rank the table for `selection`.
///
/// Rows are sorted by frequency descending, ties in canonical combination
/// order. The column count is the largest combination size in the whole
/// table, also for filtered queries.
pub fn query(
    table: &CooccurrenceTable,
    index: &ProductLabelIndex,
    selection: &Selection,
    policy: NamePolicy,
) -> Result<QueryOutcome> {
    let selected = match selection {
        Selection::AllProducts => None,
        Selection::Product(name) => Some(
            index
                .resolve(name, policy)
                .ok_or_else(|| AffinityError::UnknownProduct(name.clone()))?,
        ),
    };

    // The table iterates in canonical order, so a stable sort keeps that as the tiebreak
    let mut entries: Vec<(&Combination, u64)> = table
        .iter()
        .filter(|(combination, _)| selected.map_or(true, |id| combination.contains(id)))
        .collect();
    entries.sort_by_key(|&(_, frequency)| Reverse(frequency));

    debug!(
        selected = ?selected.map(|id| id.as_str()),
        rows = entries.len(),
        "ranked combinations"
    );

    if entries.is_empty() {
        return Ok(QueryOutcome::NoCombinations);
    }

    let max_columns = table.max_combination_size();
    let mut cells = Vec::with_capacity(entries.len() * max_columns);
    for (combination, _) in &entries {
        cells.extend(
            combination
                .ids()
                .iter()
                .map(|id| index.label(id).map(str::to_owned)),
        );
        cells.extend(std::iter::repeat(None).take(max_columns - combination.len()));
    }
    let labels = Array2::from_shape_vec((entries.len(), max_columns), cells)?;

    let (combinations, frequencies) = entries
        .into_iter()
        .map(|(combination, frequency)| (combination.clone(), frequency))
        .unzip();

    Ok(QueryOutcome::Rows(RankedTable {
        combinations,
        frequencies,
        labels,
    }))
}
