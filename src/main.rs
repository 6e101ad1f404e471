//! Clinic Insights: explore service sales from the command line
//!
//! Loads (or generates) the record table, applies the filter flags, prints the
//! summary tables and segment statistics, and writes charts.

use anyhow::{Context, Result};
use clap::Parser;
use clinic_insights::data::{records_to_dataframe, write_dataframe_csv};
use clinic_insights::{viz, Args, CsvSource, RecordSource, Session, SyntheticSource};
use polars::prelude::*;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let start_time = Instant::now();
    let session = load_session(&args)?;
    info!(
        records = session.records().len(),
        elapsed_ms = start_time.elapsed().as_millis() as u64,
        "record table loaded"
    );

    if let Some(point) = args.parse_prediction_point()? {
        run_prediction_mode(&args, &session, point)?;
    } else {
        run_full_pipeline(&args, &session)?;
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_session(args: &Args) -> Result<Session> {
    let source: Box<dyn RecordSource> = match &args.input {
        Some(path) => {
            let bounds = args.csv_age_bounds()?;
            debug!(
                path = %path,
                min_age = bounds.min,
                max_age = bounds.max,
                "reading records from CSV"
            );
            Box::new(CsvSource::new(path).with_age_bounds(bounds.min, bounds.max))
        }
        None => {
            debug!(rows = args.rows, seed = args.seed, "generating synthetic records");
            Box::new(SyntheticSource::new(args.generator_config()))
        }
    };
    Session::from_source(source.as_ref(), args.cluster_params())
}

/// Assign a single new patient visit to the nearest segment of the filtered view
fn run_prediction_mode(args: &Args, session: &Session, point: (f64, f64)) -> Result<()> {
    let (service_value, age) = point;
    println!("=== Prediction Mode ===");
    println!("Input: service value={}, age={}", service_value, age);

    let predicate = args.predicate(session.default_predicate())?;
    let snapshot = session.run(&predicate);
    let outcome = snapshot
        .clustering
        .context("Cannot fit segments on the filtered records")?;

    let cluster = outcome.model.predict(service_value, age);
    println!("\n✓ Predicted Segment: {}", cluster);

    if let Some(summary) = outcome.summaries.iter().find(|s| s.cluster == cluster) {
        let share = summary.size as f64 / outcome.labelled.len() as f64 * 100.0;
        println!("\nSegment {} details:", cluster);
        println!("  Size: {} visits ({:.1}% of filtered)", summary.size, share);
        println!(
            "  Mean service value: {:.2}, mean age: {:.1}",
            summary.mean_service_value, summary.mean_age
        );
    }

    Ok(())
}

/// Filter, summarise, segment and chart
fn run_full_pipeline(args: &Args, session: &Session) -> Result<()> {
    let predicate = args.predicate(session.default_predicate())?;
    debug!(
        services = predicate.allowed_services.len(),
        postal_codes = predicate.allowed_postal_codes.len(),
        min_age = predicate.age_range.min,
        max_age = predicate.age_range.max,
        "filter applied"
    );

    let pipeline_start = Instant::now();
    let snapshot = session.run(&predicate);
    info!(
        matched = snapshot.view.len(),
        elapsed_ms = pipeline_start.elapsed().as_millis() as u64,
        "pipeline complete"
    );

    let mut table = records_to_dataframe(&snapshot.view)?;
    match &snapshot.clustering {
        Ok(outcome) => {
            let labels: Vec<u32> = outcome.labels().iter().map(|&l| l as u32).collect();
            table.with_column(Series::new("segment", labels))?;
        }
        Err(err) => warn!(error = %err, "segmentation skipped"),
    }

    println!("=== Filtered Records ({}) ===", snapshot.view.len());
    println!("{}", table);

    viz::print_summary_tables(&snapshot);
    if let Ok(outcome) = &snapshot.clustering {
        viz::print_cluster_statistics(outcome);
    }

    let written = viz::generate_visualization_report(&snapshot, &args.output)?;
    for path in &written {
        println!("Chart saved to: {}", path);
    }

    if let Some(export) = &args.export {
        write_dataframe_csv(&mut table, Path::new(export))?;
        println!("Filtered records saved to: {}", export);
    }

    Ok(())
}
