//! Record sources (seeded synthetic generator, CSV via Polars) and tabular export

use crate::record::TransactionRecord;
use anyhow::Context;
use chrono::{Duration, NaiveDate};
use polars::prelude::*;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::fs::File;
use std::path::{Path, PathBuf};

/// Column names of the record schema, in table order
pub const COLUMNS: [&str; 6] = [
    "customer_name",
    "date",
    "service",
    "service_value",
    "age",
    "postal_code",
];

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Anything that can hand the pipeline an ordered table of records
pub trait RecordSource {
    /// Produce the session's record table
    fn load(&self) -> crate::Result<Vec<TransactionRecord>>;
}

/// Parameters of the synthetic record generator
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Number of records to generate
    pub rows: usize,
    /// Seed for every random draw made by the generator
    pub seed: u64,
    /// First day of the date range
    pub start_date: NaiveDate,
    /// Number of consecutive days records are spread over
    pub days: u32,
    /// Youngest generated age (inclusive)
    pub min_age: u32,
    /// Oldest generated age (inclusive)
    pub max_age: u32,
    /// Base service value range `[low, high)` before segment offsets
    pub value_range: (u32, u32),
    /// Offsets for the first quarter, second quarter and remaining rows
    pub segment_offsets: [f64; 3],
    /// Floor applied after offsets so every value stays positive
    pub min_service_value: f64,
    pub customer_names: Vec<String>,
    pub services: Vec<String>,
    pub postal_codes: Vec<String>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            rows: 100,
            seed: 42,
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default(),
            days: 30,
            min_age: 18,
            max_age: 79,
            value_range: (50, 500),
            segment_offsets: [200.0, -100.0, 100.0],
            min_service_value: 10.0,
            customer_names: to_strings(&[
                "Giannis",
                "Maria",
                "Kostas",
                "Eleni",
                "Nikos",
                "Sofia",
                "Alexandros",
                "Katerina",
            ]),
            services: to_strings(&[
                "Radiology",
                "Physiotherapy",
                "Blood Tests",
                "Urine Tests",
                "General Medicine",
                "Paediatrics",
                "Dentistry",
            ]),
            postal_codes: to_strings(&["11145", "14562", "18974", "10245", "19876"]),
        }
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Seeded generator reproducing the clinic's demo dataset
#[derive(Debug, Clone, Default)]
pub struct SyntheticSource {
    pub config: GeneratorConfig,
}

impl SyntheticSource {
    pub fn new(config: GeneratorConfig) -> Self {
        Self { config }
    }
}

impl RecordSource for SyntheticSource {
    fn load(&self) -> crate::Result<Vec<TransactionRecord>> {
        generate_records(&self.config)
    }
}

/// Generate a synthetic record table sorted by date
///
/// Service values are drawn from `value_range`, then the first quarter of the
/// rows is shifted up (premium services), the second quarter down (cheap
/// services) and the rest moderately up. The same config always yields the
/// same table.
pub fn generate_records(config: &GeneratorConfig) -> crate::Result<Vec<TransactionRecord>> {
    if config.days == 0 {
        anyhow::bail!("Date range must span at least one day");
    }
    if config.min_age > config.max_age {
        anyhow::bail!(
            "Minimum age {} exceeds maximum age {}",
            config.min_age,
            config.max_age
        );
    }
    let (low, high) = config.value_range;
    if low >= high {
        anyhow::bail!("Service value range [{}, {}) is empty", low, high);
    }
    if config.min_service_value.is_nan() || config.min_service_value <= 0.0 {
        anyhow::bail!("Service value floor must be positive");
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let high_end = config.rows / 4;
    let low_end = config.rows / 2;

    let mut records = Vec::with_capacity(config.rows);
    for i in 0..config.rows {
        let age = rng.gen_range(config.min_age..=config.max_age);

        let offset = if i < high_end {
            config.segment_offsets[0]
        } else if i < low_end {
            config.segment_offsets[1]
        } else {
            config.segment_offsets[2]
        };
        let base = f64::from(rng.gen_range(low..high));
        let service_value = (base + offset).max(config.min_service_value);

        let customer_name = pick(&mut rng, &config.customer_names, "customer name")?;
        let day = rng.gen_range(0..config.days);
        let date = config.start_date + Duration::days(i64::from(day));
        let service = pick(&mut rng, &config.services, "service")?;
        let postal_code = pick(&mut rng, &config.postal_codes, "postal code")?;

        records.push(TransactionRecord {
            customer_name,
            date,
            service,
            service_value,
            age,
            postal_code,
        });
    }

    records.sort_by_key(|r| r.date);
    Ok(records)
}

fn pick(rng: &mut StdRng, items: &[String], what: &str) -> crate::Result<String> {
    items
        .choose(rng)
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("Generator catalogue has no {} entries", what))
}

/// CSV file with the six schema columns
///
/// Records with an age outside `age_bounds` are rejected on load; the bounds
/// default to `0..=120`.
#[derive(Debug, Clone)]
pub struct CsvSource {
    pub path: PathBuf,
    /// Accepted age bounds (inclusive)
    pub age_bounds: (u32, u32),
}

impl CsvSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            age_bounds: (0, 120),
        }
    }

    pub fn with_age_bounds(mut self, min_age: u32, max_age: u32) -> Self {
        self.age_bounds = (min_age, max_age);
        self
    }
}

impl RecordSource for CsvSource {
    fn load(&self) -> crate::Result<Vec<TransactionRecord>> {
        let records = load_records_csv(&self.path)?;
        let (min_age, max_age) = self.age_bounds;
        for record in &records {
            record.validate(min_age, max_age)?;
        }
        Ok(records)
    }
}

/// Load records from a CSV file using Polars
///
/// Every column is read as text and parsed here, so postal codes keep their
/// leading zeros and dates must be `YYYY-MM-DD`.
pub fn load_records_csv(path: &Path) -> crate::Result<Vec<TransactionRecord>> {
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()
        .with_context(|| format!("Failed to read CSV file {}", path.display()))?;

    let names = text_column(&df, "customer_name")?;
    let dates = text_column(&df, "date")?;
    let services = text_column(&df, "service")?;
    let values = text_column(&df, "service_value")?;
    let ages = text_column(&df, "age")?;
    let postal_codes = text_column(&df, "postal_code")?;

    let mut records = Vec::with_capacity(df.height());
    for row in 0..df.height() {
        let line = row + 2;
        let field = |column: &[Option<&str>], name: &str| -> crate::Result<String> {
            column[row]
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .ok_or_else(|| anyhow::anyhow!("Line {}: missing {}", line, name))
        };

        let date_text = field(&dates, "date")?;
        let date = NaiveDate::parse_from_str(&date_text, DATE_FORMAT)
            .with_context(|| format!("Line {}: invalid date '{}'", line, date_text))?;
        let value_text = field(&values, "service_value")?;
        let service_value: f64 = value_text
            .parse()
            .with_context(|| format!("Line {}: invalid service value '{}'", line, value_text))?;
        let age_text = field(&ages, "age")?;
        let age: u32 = age_text
            .parse()
            .with_context(|| format!("Line {}: invalid age '{}'", line, age_text))?;

        records.push(TransactionRecord {
            customer_name: field(&names, "customer_name")?,
            date,
            service: field(&services, "service")?,
            service_value,
            age,
            postal_code: field(&postal_codes, "postal_code")?,
        });
    }

    Ok(records)
}

fn text_column<'a>(df: &'a DataFrame, name: &str) -> crate::Result<Vec<Option<&'a str>>> {
    let column = df
        .column(name)
        .with_context(|| format!("CSV is missing column '{}'", name))?;
    Ok(column.str()?.into_iter().collect())
}

/// Convert records into a Polars DataFrame for tabular display or export
pub fn records_to_dataframe(records: &[TransactionRecord]) -> crate::Result<DataFrame> {
    let names: Vec<&str> = records.iter().map(|r| r.customer_name.as_str()).collect();
    let dates: Vec<String> = records
        .iter()
        .map(|r| r.date.format(DATE_FORMAT).to_string())
        .collect();
    let services: Vec<&str> = records.iter().map(|r| r.service.as_str()).collect();
    let values: Vec<f64> = records.iter().map(|r| r.service_value).collect();
    let ages: Vec<i64> = records.iter().map(|r| i64::from(r.age)).collect();
    let postal_codes: Vec<&str> = records.iter().map(|r| r.postal_code.as_str()).collect();

    let df = DataFrame::new(vec![
        Series::new(COLUMNS[0], names),
        Series::new(COLUMNS[1], dates),
        Series::new(COLUMNS[2], services),
        Series::new(COLUMNS[3], values),
        Series::new(COLUMNS[4], ages),
        Series::new(COLUMNS[5], postal_codes),
    ])?;
    Ok(df)
}

/// Write a DataFrame to a CSV file with a header row
pub fn write_dataframe_csv(df: &mut DataFrame, path: &Path) -> crate::Result<()> {
    let mut file = File::create(path)
        .with_context(|| format!("Failed to create CSV file {}", path.display()))?;
    CsvWriter::new(&mut file).include_header(true).finish(df)?;
    Ok(())
}

/// Export records to CSV in the same layout `load_records_csv` reads
pub fn write_records_csv(records: &[TransactionRecord], path: &Path) -> crate::Result<()> {
    let mut df = records_to_dataframe(records)?;
    write_dataframe_csv(&mut df, path)
}
