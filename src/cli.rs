//! Command-line interface definitions and argument parsing

use crate::data::GeneratorConfig;
use crate::filter::{parse_age_range, parse_value_list, AgeRange, Predicate};
use crate::model::ClusterParams;
use clap::Parser;

/// Explore clinic service sales: filter, summarise and segment patients with K-Means
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// CSV file with customer_name,date,service,service_value,age,postal_code columns.
    /// Synthetic records are generated when omitted.
    #[arg(short, long)]
    pub input: Option<String>,

    /// Inclusive ages accepted when reading --input, as "min-max"
    #[arg(long, default_value = "0-120")]
    pub age_bounds: String,

    /// Number of synthetic records to generate
    #[arg(long, default_value = "100")]
    pub rows: usize,

    /// Seed for the synthetic generator and centroid initialisation
    #[arg(long, default_value = "42")]
    pub seed: u64,

    /// Comma-separated services to keep (default: all present)
    #[arg(long)]
    pub services: Option<String>,

    /// Comma-separated postal codes to keep (default: all present)
    #[arg(long)]
    pub postal_codes: Option<String>,

    /// Inclusive age range as "min-max" (default: observed range)
    #[arg(short, long)]
    pub ages: Option<String>,

    /// Number of clusters for K-Means
    #[arg(short = 'k', long, default_value = "4")]
    pub clusters: usize,

    /// Maximum iterations for K-Means algorithm
    #[arg(long, default_value = "300")]
    pub max_iters: u64,

    /// Tolerance for K-Means convergence
    #[arg(long, default_value = "1e-4")]
    pub tolerance: f64,

    /// Output path for the segment plot; service and age charts are written alongside
    #[arg(short, long, default_value = "clinic_report.png")]
    pub output: String,

    /// Write the filtered records, with their segment, to this CSV file
    #[arg(short, long)]
    pub export: Option<String>,

    /// Prediction mode: provide service value and age as comma-separated string
    /// Example: --predict "320.0,45"
    #[arg(short, long)]
    pub predict: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    pub fn generator_config(&self) -> GeneratorConfig {
        GeneratorConfig {
            rows: self.rows,
            seed: self.seed,
            ..GeneratorConfig::default()
        }
    }

    /// Age bounds a CSV record must fall within
    pub fn csv_age_bounds(&self) -> crate::Result<AgeRange> {
        let bounds = parse_age_range(&self.age_bounds)?;
        if bounds.min > bounds.max {
            anyhow::bail!("Age bounds '{}' are inverted", self.age_bounds);
        }
        Ok(bounds)
    }

    pub fn cluster_params(&self) -> ClusterParams {
        ClusterParams {
            n_clusters: self.clusters,
            max_iterations: self.max_iters,
            tolerance: self.tolerance,
            seed: self.seed,
        }
    }

    /// Narrow `base` by whichever filter flags were given
    pub fn predicate(&self, base: Predicate) -> crate::Result<Predicate> {
        let mut predicate = base;
        if let Some(ref services) = self.services {
            predicate = predicate.with_services(parse_value_list(services));
        }
        if let Some(ref postal_codes) = self.postal_codes {
            predicate = predicate.with_postal_codes(parse_value_list(postal_codes));
        }
        if let Some(ref ages) = self.ages {
            let range: AgeRange = parse_age_range(ages)?;
            predicate = predicate.with_age_range(range);
        }
        Ok(predicate)
    }

    /// Parse the point to classify from the predict string
    /// Expected format: "service_value,age"
    pub fn parse_prediction_point(&self) -> crate::Result<Option<(f64, f64)>> {
        if let Some(ref predict_str) = self.predict {
            let parts: Vec<&str> = predict_str.split(',').collect();
            if parts.len() != 2 {
                anyhow::bail!("Predict values must be in format 'service_value,age'");
            }

            let service_value: f64 = parts[0]
                .trim()
                .parse()
                .map_err(|_| anyhow::anyhow!("Invalid service value: {}", parts[0]))?;
            let age: f64 = parts[1]
                .trim()
                .parse()
                .map_err(|_| anyhow::anyhow!("Invalid age: {}", parts[1]))?;

            Ok(Some((service_value, age)))
        } else {
            Ok(None)
        }
    }
}
