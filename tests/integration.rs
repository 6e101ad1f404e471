//! Integration tests for Clinic Insights

use chrono::NaiveDate;
use clinic_insights::aggregate::{revenue_per_service, spend_per_customer, total_revenue};
use clinic_insights::data::{generate_records, write_records_csv};
use clinic_insights::{
    aggregate, cluster, filter, AgeRange, AnalysisError, ClusterParams, CsvSource, GeneratorConfig,
    Predicate, RecordSource, Session, SyntheticSource, TransactionRecord,
};
use proptest::prelude::*;
use std::collections::HashMap;
use std::io::Write;
use tempfile::NamedTempFile;

const SERVICES: [&str; 4] = ["Radiology", "Physiotherapy", "Dentistry", "Blood Tests"];
const POSTAL_CODES: [&str; 3] = ["11145", "14562", "18974"];

/// Create a test CSV file with sample data
fn create_test_csv() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "customer_name,date,service,service_value,age,postal_code").unwrap();

    // Young patients, routine services
    writeln!(file, "Maria,2024-01-02,Blood Tests,100,20,11145").unwrap();
    writeln!(file, "Nikos,2024-01-03,Blood Tests,150,22,11145").unwrap();
    writeln!(file, "Eleni,2024-01-05,Dentistry,100,21,14562").unwrap();
    writeln!(file, "Kostas,2024-01-08,Dentistry,150,23,14562").unwrap();

    // Older patient, premium imaging
    writeln!(file, "Sofia,2024-01-09,Radiology,500,65,18974").unwrap();

    // Returning patient
    writeln!(file, "Maria,2024-01-15,Radiology,480,20,11145").unwrap();

    file
}

fn record(
    name: String,
    service: &str,
    value: f64,
    age: u32,
    postal_code: &str,
) -> TransactionRecord {
    TransactionRecord {
        customer_name: name,
        date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        service: service.to_string(),
        service_value: value,
        age,
        postal_code: postal_code.to_string(),
    }
}

fn partition(labels: &[usize]) -> Vec<usize> {
    let mut mapping = HashMap::new();
    labels
        .iter()
        .map(|label| {
            let next = mapping.len();
            *mapping.entry(*label).or_insert(next)
        })
        .collect()
}

#[test]
fn test_end_to_end_pipeline() {
    let test_file = create_test_csv();
    let session =
        Session::from_source(&CsvSource::new(test_file.path()), ClusterParams::default()).unwrap();
    assert_eq!(session.records().len(), 6);

    let snapshot = session.run(&session.default_predicate());
    assert_eq!(snapshot.view.len(), 6);
    assert_eq!(snapshot.summaries.total_revenue, 1480.0);
    assert_eq!(snapshot.summaries.patient_count, 6);
    assert_eq!(snapshot.summaries.spend_per_customer["Maria"], 580.0);
    assert_eq!(snapshot.summaries.spend_per_customer.len(), 5);

    let outcome = snapshot.clustering.unwrap();
    assert_eq!(outcome.labelled.len(), 6);
    assert!(outcome.labels().iter().all(|&l| l < 4));
    assert_eq!(outcome.model.cluster_sizes().iter().sum::<usize>(), 6);
}

#[test]
fn test_filter_then_cluster_outlier() {
    let test_file = create_test_csv();
    let records = CsvSource::new(test_file.path()).load().unwrap();

    // Ages 21-65 leave out both of Maria's visits
    let predicate = Predicate::spanning(&records).with_age_range(AgeRange::new(21, 65));
    let mut view = filter(&records, &predicate);
    assert_eq!(view.len(), 4);

    // Put her first visit back in front: values 100,150,100,150,500
    view.insert(0, records[0].clone());
    let outcome = cluster(&view, &ClusterParams::default()).unwrap();
    let labels = outcome.labels();
    let outlier = labels[4];
    assert_eq!(view[4].service_value, 500.0);
    assert!(labels[..4].iter().all(|&l| l != outlier));
}

#[test]
fn test_empty_selection() {
    let test_file = create_test_csv();
    let session =
        Session::from_source(&CsvSource::new(test_file.path()), ClusterParams::default()).unwrap();
    let predicate = session.default_predicate().with_services(Vec::<String>::new());

    let snapshot = session.run(&predicate);
    assert!(snapshot.view.is_empty());
    assert_eq!(snapshot.summaries.total_revenue, 0.0);
    assert_eq!(snapshot.summaries.patient_count, 0);
    assert!(snapshot.summaries.revenue_per_service.is_empty());
    assert_eq!(
        snapshot.clustering.unwrap_err(),
        AnalysisError::InsufficientData {
            available: 0,
            required: 4
        }
    );
}

#[test]
fn test_cluster_too_small_view_leaves_input_untouched() {
    let records = generate_records(&GeneratorConfig {
        rows: 3,
        ..GeneratorConfig::default()
    })
    .unwrap();
    let before = records.clone();

    let result = cluster(&records, &ClusterParams::default());
    assert!(matches!(
        result,
        Err(AnalysisError::InsufficientData { available: 3, required: 4 })
    ));
    assert_eq!(records, before);
}

#[test]
fn test_synthetic_session_is_reproducible() {
    let source = SyntheticSource::new(GeneratorConfig::default());
    let first = Session::from_source(&source, ClusterParams::default()).unwrap();
    let second = Session::from_source(&source, ClusterParams::default()).unwrap();

    let a = first.run(&first.default_predicate()).clustering.unwrap();
    let b = second.run(&second.default_predicate()).clustering.unwrap();
    assert_eq!(a.labels(), b.labels());
    assert_eq!(partition(&a.labels()), partition(&b.labels()));
}

#[test]
fn test_export_and_reload() {
    let records = generate_records(&GeneratorConfig::default()).unwrap();
    let predicate = Predicate::spanning(&records).with_postal_codes(["11145", "10245"]);
    let view = filter(&records, &predicate);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("filtered.csv");
    write_records_csv(&view, &path).unwrap();

    let reloaded = CsvSource::new(&path).load().unwrap();
    assert_eq!(reloaded, view);
    assert_eq!(aggregate(&reloaded), aggregate(&view));
}

fn arb_record() -> impl Strategy<Value = TransactionRecord> {
    (
        0usize..6,
        prop::sample::select(SERVICES.to_vec()),
        1u32..1000,
        18u32..80,
        prop::sample::select(POSTAL_CODES.to_vec()),
    )
        .prop_map(|(name, service, value, age, postal_code)| {
            record(format!("patient-{}", name), service, f64::from(value), age, postal_code)
        })
}

fn arb_predicate() -> impl Strategy<Value = Predicate> {
    (
        prop::sample::subsequence(SERVICES.to_vec(), 0..=SERVICES.len()),
        prop::sample::subsequence(POSTAL_CODES.to_vec(), 0..=POSTAL_CODES.len()),
        10u32..90,
        10u32..90,
    )
        .prop_map(|(services, codes, min, max)| {
            Predicate::new(services, codes, AgeRange::new(min, max))
        })
}

proptest! {
    #[test]
    fn prop_filter_is_subset_and_satisfies_predicate(
        records in prop::collection::vec(arb_record(), 0..60),
        predicate in arb_predicate(),
    ) {
        let view = filter(&records, &predicate);
        prop_assert!(view.len() <= records.len());
        for r in &view {
            prop_assert!(records.contains(r));
            prop_assert!(predicate.allowed_services.contains(&r.service));
            prop_assert!(predicate.allowed_postal_codes.contains(&r.postal_code));
            prop_assert!(predicate.age_range.min <= r.age && r.age <= predicate.age_range.max);
        }
        prop_assert_eq!(filter(&view, &predicate), view);
    }

    #[test]
    fn prop_revenue_totals_agree(records in prop::collection::vec(arb_record(), 0..60)) {
        // integer-valued amounts keep the sums exact
        let total = total_revenue(&records);
        prop_assert_eq!(revenue_per_service(&records).values().sum::<f64>(), total);
        prop_assert_eq!(spend_per_customer(&records).values().sum::<f64>(), total);
    }

    #[test]
    fn prop_cluster_partitions_view(records in prop::collection::vec(arb_record(), 0..40)) {
        let params = ClusterParams::default();
        match cluster(&records, &params) {
            Ok(outcome) => {
                prop_assert_eq!(outcome.labelled.len(), records.len());
                prop_assert!(outcome.labels().iter().all(|&l| l < params.n_clusters));
                let sizes: usize = outcome.summaries.iter().map(|s| s.size).sum();
                prop_assert_eq!(sizes, records.len());
            }
            Err(AnalysisError::InsufficientData { available, required }) => {
                prop_assert_eq!(required, params.n_clusters);
                prop_assert!(available < required);
            }
            Err(other) => prop_assert!(false, "unexpected error: {}", other),
        }
    }
}
