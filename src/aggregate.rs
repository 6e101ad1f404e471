//! Revenue, spend and age summaries over a filtered view

use crate::error::AnalysisError;
use crate::record::TransactionRecord;
use std::collections::BTreeMap;

/// Default number of bins for the age histogram
pub const DEFAULT_AGE_BINS: usize = 10;

/// Everything the dashboard shows above the clustering section
#[derive(Debug, Clone, PartialEq)]
pub struct Summaries {
    pub total_revenue: f64,
    pub patient_count: usize,
    /// Total spend per distinct customer name
    pub spend_per_customer: BTreeMap<String, f64>,
    pub revenue_per_service: BTreeMap<String, f64>,
    /// `None` when the view is empty
    pub age_stats: Option<AgeStats>,
    pub age_histogram: Vec<AgeBin>,
}

/// Box-plot statistics of patient age
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgeStats {
    pub count: usize,
    pub min: u32,
    pub max: u32,
    pub mean: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
}

/// One histogram bar: ages in `[lower, upper)`, the last bar closed on the right
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgeBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

/// Compute all summaries for a view; never fails, an empty view gives zeros
pub fn aggregate(view: &[TransactionRecord]) -> Summaries {
    Summaries {
        total_revenue: total_revenue(view),
        patient_count: patient_count(view),
        spend_per_customer: spend_per_customer(view),
        revenue_per_service: revenue_per_service(view),
        age_stats: age_stats(view),
        age_histogram: age_histogram(view, DEFAULT_AGE_BINS).unwrap_or_default(),
    }
}

pub fn total_revenue(view: &[TransactionRecord]) -> f64 {
    view.iter().map(|r| r.service_value).sum()
}

/// Number of transactions; a returning patient is counted once per visit
pub fn patient_count(view: &[TransactionRecord]) -> usize {
    view.len()
}

/// Total spend of each distinct customer name
pub fn spend_per_customer(view: &[TransactionRecord]) -> BTreeMap<String, f64> {
    sum_by(view, |r| &r.customer_name)
}

/// Legacy per-record share: each record's value divided by the record count
///
/// Kept for parity with the older dashboard; `spend_per_customer` is the
/// meaningful metric.
pub fn average_spend_per_record(view: &[TransactionRecord]) -> Result<Vec<f64>, AnalysisError> {
    if view.is_empty() {
        return Err(AnalysisError::EmptyInput {
            operation: "average spend per record",
        });
    }
    let count = view.len() as f64;
    Ok(view.iter().map(|r| r.service_value / count).collect())
}

pub fn revenue_per_service(view: &[TransactionRecord]) -> BTreeMap<String, f64> {
    sum_by(view, |r| &r.service)
}

fn sum_by<'a, F>(view: &'a [TransactionRecord], key: F) -> BTreeMap<String, f64>
where
    F: Fn(&'a TransactionRecord) -> &'a String,
{
    let mut totals = BTreeMap::new();
    for record in view {
        *totals.entry(key(record).clone()).or_insert(0.0) += record.service_value;
    }
    totals
}

/// Age distribution statistics, `None` for an empty view
///
/// Quartiles interpolate linearly between order statistics.
pub fn age_stats(view: &[TransactionRecord]) -> Option<AgeStats> {
    let mut ages: Vec<u32> = view.iter().map(|r| r.age).collect();
    ages.sort_unstable();
    let (&min, &max) = (ages.first()?, ages.last()?);

    let sum: f64 = ages.iter().map(|&a| f64::from(a)).sum();
    Some(AgeStats {
        count: ages.len(),
        min,
        max,
        mean: sum / ages.len() as f64,
        q1: quantile(&ages, 0.25),
        median: quantile(&ages, 0.5),
        q3: quantile(&ages, 0.75),
    })
}

fn quantile(sorted: &[u32], q: f64) -> f64 {
    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let weight = position - lower as f64;
    f64::from(sorted[lower]) * (1.0 - weight) + f64::from(sorted[upper]) * weight
}

/// Equal-width age histogram spanning the view's observed ages
///
/// Binning is done in integer arithmetic so every age lands in the bin whose
/// reported `[lower, upper)` contains it.
pub fn age_histogram(
    view: &[TransactionRecord],
    bins: usize,
) -> Result<Vec<AgeBin>, AnalysisError> {
    if bins == 0 {
        return Err(AnalysisError::invalid_parameter(
            "age histogram needs at least one bin",
        ));
    }
    let (Some(min), Some(max)) = (
        view.iter().map(|r| r.age).min(),
        view.iter().map(|r| r.age).max(),
    ) else {
        return Ok(Vec::new());
    };

    // A single distinct age still gets a unit-wide range to split
    let span = (max - min).max(1) as usize;
    let edge = |i: usize| f64::from(min) + (span * i) as f64 / bins as f64;

    let mut histogram: Vec<AgeBin> = (0..bins)
        .map(|i| AgeBin {
            lower: edge(i),
            upper: edge(i + 1),
            count: 0,
        })
        .collect();

    for record in view {
        let offset = (record.age - min) as usize;
        let index = (offset * bins / span).min(bins - 1);
        histogram[index].count += 1;
    }
    Ok(histogram)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::record;

    fn view() -> Vec<TransactionRecord> {
        vec![
            record("Maria", "Radiology", 420.0, 34, "11145"),
            record("Nikos", "Dentistry", 80.0, 61, "14562"),
            record("Maria", "Dentistry", 120.0, 34, "11145"),
            record("Eleni", "Radiology", 300.0, 19, "14562"),
            record("Kostas", "Physiotherapy", 150.0, 46, "11145"),
        ]
    }

    #[test]
    fn test_totals() {
        let v = view();
        assert_eq!(total_revenue(&v), 1070.0);
        assert_eq!(patient_count(&v), 5);
    }

    #[test]
    fn test_revenue_per_service() {
        let totals = revenue_per_service(&view());
        assert_eq!(totals.len(), 3);
        assert_eq!(totals["Radiology"], 720.0);
        assert_eq!(totals["Dentistry"], 200.0);
        assert_eq!(totals["Physiotherapy"], 150.0);
    }

    #[test]
    fn test_spend_per_customer_groups_by_name() {
        let spend = spend_per_customer(&view());
        assert_eq!(spend.len(), 4);
        assert_eq!(spend["Maria"], 540.0);
        assert_eq!(spend.values().sum::<f64>(), 1070.0);
    }

    #[test]
    fn test_average_spend_per_record() {
        let shares = average_spend_per_record(&view()).unwrap();
        assert_eq!(shares[0], 84.0);
        assert_eq!(shares.iter().sum::<f64>(), 214.0);

        assert_eq!(
            average_spend_per_record(&[]),
            Err(AnalysisError::EmptyInput {
                operation: "average spend per record"
            })
        );
    }

    #[test]
    fn test_empty_view() {
        let summaries = aggregate(&[]);
        assert_eq!(summaries.total_revenue, 0.0);
        assert_eq!(summaries.patient_count, 0);
        assert!(summaries.spend_per_customer.is_empty());
        assert!(summaries.revenue_per_service.is_empty());
        assert!(summaries.age_stats.is_none());
        assert!(summaries.age_histogram.is_empty());
    }

    #[test]
    fn test_age_stats() {
        // ages sorted: 19, 34, 34, 46, 61
        let stats = age_stats(&view()).unwrap();
        assert_eq!(stats.count, 5);
        assert_eq!(stats.min, 19);
        assert_eq!(stats.max, 61);
        assert_eq!(stats.mean, 38.8);
        assert_eq!(stats.q1, 34.0);
        assert_eq!(stats.median, 34.0);
        assert_eq!(stats.q3, 46.0);

        let single = age_stats(&view()[..1]).unwrap();
        assert_eq!(single.median, 34.0);
        assert_eq!(single.q1, 34.0);
    }

    #[test]
    fn test_quantile_interpolates() {
        assert_eq!(quantile(&[10, 20, 30, 40], 0.5), 25.0);
        assert_eq!(quantile(&[10, 20, 30, 40], 0.25), 17.5);
    }

    #[test]
    fn test_age_histogram() {
        let v = view();
        let histogram = age_histogram(&v, 6).unwrap();

        assert_eq!(histogram.len(), 6);
        assert_eq!(histogram[0].lower, 19.0);
        assert_eq!(histogram[5].upper, 61.0);
        assert_eq!(histogram.iter().map(|b| b.count).sum::<usize>(), v.len());
        // width 7: 19 | 34, 34 | 46 | 61 (closed last bin)
        let counts: Vec<usize> = histogram.iter().map(|b| b.count).collect();
        assert_eq!(counts, vec![1, 0, 2, 1, 0, 1]);

        assert!(age_histogram(&v, 0).is_err());
        assert!(age_histogram(&[], 10).unwrap().is_empty());
    }

    #[test]
    fn test_histogram_single_age() {
        let v = vec![record("Maria", "Radiology", 420.0, 34, "11145"); 3];
        let histogram = age_histogram(&v, 4).unwrap();
        assert_eq!(histogram[0].count, 3);
        assert_eq!(histogram.iter().map(|b| b.count).sum::<usize>(), 3);
    }

    #[test]
    fn test_histogram_bins_contain_their_ages() {
        let v: Vec<TransactionRecord> = (0..=18)
            .map(|age| record("Maria", "Radiology", 100.0, age, "11145"))
            .collect();
        let histogram = age_histogram(&v, 14).unwrap();

        assert_eq!(histogram[6].count, 1);
        assert_eq!(histogram[7].count, 2);
        assert_eq!(histogram[7].lower, 9.0);
        assert_eq!(histogram.iter().map(|b| b.count).sum::<usize>(), 19);

        let last = histogram.len() - 1;
        for (i, bin) in histogram.iter().enumerate() {
            let inside = (0..=18u32)
                .map(f64::from)
                .filter(|&age| {
                    bin.lower <= age && (age < bin.upper || (i == last && age == bin.upper))
                })
                .count();
            assert_eq!(bin.count, inside, "bin {} [{}, {})", i, bin.lower, bin.upper);
        }
    }
}
