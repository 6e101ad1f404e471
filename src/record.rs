//! Transaction record schema shared by every stage of the pipeline

use chrono::NaiveDate;

/// One service rendered to one patient
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionRecord {
    /// Patient name as recorded at the desk
    pub customer_name: String,
    /// Day the service was rendered
    pub date: NaiveDate,
    /// Service category (radiology, physiotherapy, ...)
    pub service: String,
    /// Amount charged, in euros
    pub service_value: f64,
    /// Patient age in years
    pub age: u32,
    /// Patient postal code
    pub postal_code: String,
}

impl TransactionRecord {
    /// Clustering features: `[service_value, age]`
    pub fn features(&self) -> [f64; 2] {
        [self.service_value, f64::from(self.age)]
    }

    /// Check the schema invariants against the configured age bounds
    pub fn validate(&self, min_age: u32, max_age: u32) -> crate::Result<()> {
        if self.customer_name.trim().is_empty() {
            anyhow::bail!("Record on {} has an empty customer name", self.date);
        }
        if self.service.trim().is_empty() || self.postal_code.trim().is_empty() {
            anyhow::bail!(
                "Record for {} on {} is missing service or postal code",
                self.customer_name,
                self.date
            );
        }
        if !(self.service_value.is_finite() && self.service_value > 0.0) {
            anyhow::bail!(
                "Service value must be positive, got {} for {}",
                self.service_value,
                self.customer_name
            );
        }
        if !(min_age..=max_age).contains(&self.age) {
            anyhow::bail!(
                "Age {} for {} is outside [{}, {}]",
                self.age,
                self.customer_name,
                min_age,
                max_age
            );
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) fn record(
    name: &str,
    service: &str,
    value: f64,
    age: u32,
    postal_code: &str,
) -> TransactionRecord {
    TransactionRecord {
        customer_name: name.to_string(),
        date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        service: service.to_string(),
        service_value: value,
        age,
        postal_code: postal_code.to_string(),
    }
}
