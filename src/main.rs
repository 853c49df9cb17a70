//! BasketForge: product affinity analysis CLI
//!
//! This is the main entrypoint that orchestrates loading, normalization,
//! combination counting and the ranked query.

use std::time::Instant;

use anyhow::{Context, Result};
use basketforge::{
    filter_by_window, load_records, query, Args, CooccurrenceTable, ProductLabelIndex,
    QueryOutcome, Selection, TimeColumnStatus,
};
use clap::Parser;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

fn main() {
    let args = Args::parse();
    init_tracing(args.verbose);

    // Failures are reported here instead of unwinding out of main
    if let Err(err) = run(&args) {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(default_level.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn run(args: &Args) -> Result<()> {
    let config = args.affinity_config()?;
    let window = args.time_window()?;
    let columns = args.columns();

    if args.verbose {
        println!("BasketForge - Market-Basket Analysis");
        println!("====================================\n");
    }

    let start_time = Instant::now();

    // Step 1: Load and normalize transactions
    if args.verbose {
        println!("Step 1: Loading transactions");
        println!("  Input file: {}", args.input);
    }

    let load_start = Instant::now();
    let normalized = load_records(&args.input, &columns)
        .with_context(|| format!("failed to load transactions from {}", args.input))?;
    let load_time = load_start.elapsed();

    println!(
        "✓ Data loaded: {} line items ({} rows dropped)",
        normalized.records.len(),
        normalized.report.rows_dropped
    );
    if args.verbose {
        println!("  Processing time: {:.2}s", load_time.as_secs_f64());
        match normalized.report.time_status {
            TimeColumnStatus::Parsed => println!("  Timestamps: parsed"),
            TimeColumnStatus::Partial { unparsed } => {
                println!("  Timestamps: {unparsed} values could not be parsed")
            }
            TimeColumnStatus::Failed => println!("  Timestamps: unusable, ignored"),
            TimeColumnStatus::Absent => println!("  Timestamps: none"),
        }
    }

    let window_bounded = !window.is_unbounded();
    let records = filter_by_window(normalized.records, &window);
    if window_bounded {
        println!("✓ Time window applied: {} line items kept", records.len());
    }

    let index = ProductLabelIndex::from_records(&records);

    if args.list_products {
        for option in index.product_options() {
            println!("{option}");
        }
        return Ok(());
    }

    // Step 2: Count combinations
    if args.verbose {
        println!("\nStep 2: Counting product combinations");
        println!("  Duplicate policy: {:?}", config.duplicates);
        println!(
            "  Basket ceiling: {} ({:?})",
            config.max_basket_size, config.oversized
        );
    }

    let count_start = Instant::now();
    let (table, stats) = CooccurrenceTable::build_with_stats(&records, &config)?;
    let count_time = count_start.elapsed();

    println!(
        "✓ Combinations counted: {} distinct from {} multi-item invoices",
        table.len(),
        stats.multi_item_invoices
    );
    if stats.guarded_invoices > 0 {
        println!(
            "  {} invoices exceeded the basket ceiling of {}",
            stats.guarded_invoices, config.max_basket_size
        );
    }
    if args.verbose {
        println!("  Invoices: {}", stats.invoices);
        println!("  Counting time: {:.2}s", count_time.as_secs_f64());
    }

    // Step 3: Rank and filter
    let selection = args.selection();
    match &selection {
        Selection::AllProducts => println!("\n=== All frequently bought product combinations ==="),
        Selection::Product(name) => {
            println!("\n=== Products frequently bought with '{name}' ===")
        }
    }

    match query(&table, &index, &selection, config.name_policy)? {
        QueryOutcome::NoCombinations => {
            println!("No product combinations found. Please check your data.");
        }
        QueryOutcome::Rows(ranked) => {
            match args.limit {
                Some(limit) => print!("{}", ranked.head(limit)),
                None => print!("{ranked}"),
            }
            if let Some(output) = &args.output {
                ranked
                    .write_csv(output)
                    .with_context(|| format!("failed to write {output}"))?;
                println!("\nRanked combinations saved to: {output}");
            }
        }
    }

    let total_time = start_time.elapsed();
    println!("\n=== Analysis Complete ===");
    println!("Total processing time: {:.2}s", total_time.as_secs_f64());

    Ok(())
}
