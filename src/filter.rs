//! Filter engine: narrows the record table by service, postal code and age

use crate::error::AnalysisError;
use crate::record::TransactionRecord;
use std::collections::BTreeSet;

/// Inclusive patient age bounds
///
/// An inverted range (`min > max`) is valid and matches nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgeRange {
    pub min: u32,
    pub max: u32,
}

impl AgeRange {
    pub fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, age: u32) -> bool {
        self.min <= age && age <= self.max
    }
}

/// The three filter legs, combined with logical AND
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    pub allowed_services: BTreeSet<String>,
    pub allowed_postal_codes: BTreeSet<String>,
    pub age_range: AgeRange,
}

impl Predicate {
    pub fn new<S, P>(services: S, postal_codes: P, age_range: AgeRange) -> Self
    where
        S: IntoIterator,
        S::Item: Into<String>,
        P: IntoIterator,
        P::Item: Into<String>,
    {
        Self {
            allowed_services: services.into_iter().map(Into::into).collect(),
            allowed_postal_codes: postal_codes.into_iter().map(Into::into).collect(),
            age_range,
        }
    }

    /// Predicate that keeps the whole table: every service and postal code
    /// present, and the observed age span
    ///
    /// On an empty table this has empty allowed sets and matches nothing.
    pub fn spanning(records: &[TransactionRecord]) -> Self {
        let min = records.iter().map(|r| r.age).min().unwrap_or(0);
        let max = records.iter().map(|r| r.age).max().unwrap_or(0);
        Self::new(
            distinct_services(records),
            distinct_postal_codes(records),
            AgeRange::new(min, max),
        )
    }

    pub fn with_services<I>(mut self, services: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.allowed_services = services.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_postal_codes<I>(mut self, postal_codes: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.allowed_postal_codes = postal_codes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_age_range(mut self, age_range: AgeRange) -> Self {
        self.age_range = age_range;
        self
    }

    /// Whether a single record passes all three legs
    pub fn matches(&self, record: &TransactionRecord) -> bool {
        self.allowed_services.contains(&record.service)
            && self.allowed_postal_codes.contains(&record.postal_code)
            && self.age_range.contains(record.age)
    }
}

/// Return the records matching `predicate`, in their original order
pub fn filter(records: &[TransactionRecord], predicate: &Predicate) -> Vec<TransactionRecord> {
    records
        .iter()
        .filter(|r| predicate.matches(r))
        .cloned()
        .collect()
}

/// Distinct services in first-appearance order
pub fn distinct_services(records: &[TransactionRecord]) -> Vec<String> {
    distinct(records.iter().map(|r| r.service.as_str()))
}

/// Distinct postal codes in first-appearance order
pub fn distinct_postal_codes(records: &[TransactionRecord]) -> Vec<String> {
    distinct(records.iter().map(|r| r.postal_code.as_str()))
}

fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = BTreeSet::new();
    values
        .filter(|v| seen.insert(*v))
        .map(str::to_string)
        .collect()
}

/// Parse an age range written as `"min-max"`
pub fn parse_age_range(input: &str) -> Result<AgeRange, AnalysisError> {
    let (min, max) = input.split_once('-').ok_or_else(|| {
        AnalysisError::invalid_predicate(format!(
            "age range '{}' must be written as 'min-max'",
            input
        ))
    })?;
    Ok(AgeRange::new(parse_age(min)?, parse_age(max)?))
}

fn parse_age(bound: &str) -> Result<u32, AnalysisError> {
    bound.trim().parse().map_err(|_| {
        AnalysisError::invalid_predicate(format!(
            "age bound '{}' is not a whole number",
            bound.trim()
        ))
    })
}

/// Split a comma-separated list of allowed values, dropping blanks
///
/// An empty input gives an empty list, which filters everything out.
pub fn parse_value_list(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
