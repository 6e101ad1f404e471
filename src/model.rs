//! K-Means segmentation of a filtered view over `(service_value, age)`

use crate::error::AnalysisError;
use crate::record::TransactionRecord;
use linfa::traits::{Fit, Predict};
use linfa::DatasetBase;
use linfa_clustering::KMeans;
use linfa_nn::distance::L2Dist;
use ndarray::{Array1, Array2, ArrayView1};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashSet;

/// Number of behavioural segments the dashboard shows
pub const DEFAULT_CLUSTERS: usize = 4;

/// K-Means configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterParams {
    pub n_clusters: usize,
    pub max_iterations: u64,
    /// Convergence tolerance on centroid movement
    pub tolerance: f64,
    /// Seed for centroid initialisation
    pub seed: u64,
}

impl Default for ClusterParams {
    fn default() -> Self {
        Self {
            n_clusters: DEFAULT_CLUSTERS,
            max_iterations: 300,
            tolerance: 1e-4,
            seed: 42,
        }
    }
}

impl ClusterParams {
    pub fn with_clusters(n_clusters: usize) -> Self {
        Self {
            n_clusters,
            ..Self::default()
        }
    }
}

/// Fitted centroids and the assignment of every training point
#[derive(Debug, Clone)]
pub struct ClusterModel {
    pub n_clusters: usize,
    /// Cluster label of each record, in view order
    pub labels: Array1<usize>,
    /// `(n_clusters, 2)` centroids in raw `(service_value, age)` units
    pub centroids: Array2<f64>,
    /// Within-cluster sum of squares
    pub inertia: f64,
}

impl ClusterModel {
    /// Nearest centroid for a new `(service_value, age)` point
    pub fn predict(&self, service_value: f64, age: f64) -> usize {
        let point = Array1::from(vec![service_value, age]);
        let mut min_distance = f64::INFINITY;
        let mut closest_cluster = 0;

        for (cluster_idx, centroid) in self.centroids.outer_iter().enumerate() {
            let distance = euclidean_distance(&point.view(), &centroid);
            if distance < min_distance {
                min_distance = distance;
                closest_cluster = cluster_idx;
            }
        }

        closest_cluster
    }

    pub fn cluster_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.n_clusters];
        for &label in self.labels.iter() {
            if label < self.n_clusters {
                sizes[label] += 1;
            }
        }
        sizes
    }

    /// Mean silhouette coefficient over the first `sample_size` points
    pub fn compute_silhouette_sample(&self, features: &Array2<f64>, sample_size: usize) -> f64 {
        let n_samples = features.nrows().min(sample_size);
        if n_samples < 2 {
            return 0.0;
        }

        let mut silhouette_sum = 0.0;

        for i in 0..n_samples {
            let point = features.row(i);
            let cluster_label = self.labels[i];

            let mut same_cluster_distances = Vec::new();
            let mut other_cluster_distances: Vec<Vec<f64>> = vec![Vec::new(); self.n_clusters];

            for j in 0..n_samples {
                if i == j {
                    continue;
                }

                let distance = euclidean_distance(&point, &features.row(j));
                let other_label = self.labels[j];

                if other_label == cluster_label {
                    same_cluster_distances.push(distance);
                } else if other_label < self.n_clusters {
                    other_cluster_distances[other_label].push(distance);
                }
            }

            // a(i): mean distance within the own cluster
            let a_i = if same_cluster_distances.is_empty() {
                0.0
            } else {
                same_cluster_distances.iter().sum::<f64>() / same_cluster_distances.len() as f64
            };

            // b(i): lowest mean distance to another cluster
            let b_i = other_cluster_distances
                .iter()
                .filter(|distances| !distances.is_empty())
                .map(|distances| distances.iter().sum::<f64>() / distances.len() as f64)
                .fold(f64::INFINITY, f64::min);

            let silhouette_i = if b_i.is_infinite() || (a_i == 0.0 && b_i == 0.0) {
                0.0
            } else {
                (b_i - a_i) / a_i.max(b_i)
            };

            silhouette_sum += silhouette_i;
        }

        silhouette_sum / n_samples as f64
    }
}

/// Mean profile of one segment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterSummary {
    pub cluster: usize,
    pub size: usize,
    pub mean_service_value: f64,
    pub mean_age: f64,
}

/// A record of the view together with its segment label
#[derive(Debug, Clone, PartialEq)]
pub struct LabelledRecord {
    pub record: TransactionRecord,
    pub cluster: usize,
}

/// Result of clustering one filtered view
#[derive(Debug, Clone)]
pub struct ClusterOutcome {
    pub labelled: Vec<LabelledRecord>,
    /// One entry per non-empty cluster, ordered by label
    pub summaries: Vec<ClusterSummary>,
    pub model: ClusterModel,
    pub features: Array2<f64>,
}

impl ClusterOutcome {
    pub fn labels(&self) -> Vec<usize> {
        self.labelled.iter().map(|l| l.cluster).collect()
    }
}

/// Build the `(n, 2)` feature matrix `[service_value, age]`
pub fn feature_matrix(view: &[TransactionRecord]) -> Array2<f64> {
    let mut features = Array2::zeros((view.len(), 2));
    for (mut row, record) in features.outer_iter_mut().zip(view) {
        let [value, age] = record.features();
        row[0] = value;
        row[1] = age;
    }
    features
}

/// Partition a view into `params.n_clusters` segments
///
/// Fails with `InsufficientData` before touching anything when the view has
/// fewer records, or fewer distinct `(service_value, age)` points, than
/// requested clusters. The same view and seed always give the same labels.
pub fn cluster(
    view: &[TransactionRecord],
    params: &ClusterParams,
) -> Result<ClusterOutcome, AnalysisError> {
    let features = feature_matrix(view);
    let model = fit_kmeans(&features, params)?;
    let summaries = summarize_clusters(view, &model.labels, params.n_clusters);

    let labelled = view
        .iter()
        .zip(model.labels.iter())
        .map(|(record, &cluster)| LabelledRecord {
            record: record.clone(),
            cluster,
        })
        .collect();

    Ok(ClusterOutcome {
        labelled,
        summaries,
        model,
        features,
    })
}

/// Fit K-Means on a raw feature matrix
pub fn fit_kmeans(
    features: &Array2<f64>,
    params: &ClusterParams,
) -> Result<ClusterModel, AnalysisError> {
    let n_clusters = params.n_clusters;
    if n_clusters == 0 {
        return Err(AnalysisError::invalid_parameter(
            "number of clusters must be at least 1",
        ));
    }
    if params.max_iterations == 0 {
        return Err(AnalysisError::invalid_parameter(
            "maximum iterations must be at least 1",
        ));
    }
    if !(params.tolerance.is_finite() && params.tolerance > 0.0) {
        return Err(AnalysisError::invalid_parameter(format!(
            "tolerance must be a positive number, got {}",
            params.tolerance
        )));
    }

    let n_samples = features.nrows();
    if n_samples < n_clusters {
        return Err(AnalysisError::InsufficientData {
            available: n_samples,
            required: n_clusters,
        });
    }

    // k-means++ cannot seed more distinct centroids than distinct points
    let distinct = count_distinct_points(features);
    if distinct < n_clusters {
        return Err(AnalysisError::InsufficientData {
            available: distinct,
            required: n_clusters,
        });
    }

    let dataset = DatasetBase::from(features.clone());
    let rng = StdRng::seed_from_u64(params.seed);
    let model = KMeans::params_with(n_clusters, rng, L2Dist)
        .max_n_iterations(params.max_iterations)
        .tolerance(params.tolerance)
        .fit(&dataset)
        .map_err(|e| AnalysisError::Clustering(e.to_string()))?;

    let labels: Array1<usize> = model.predict(features);
    let centroids = model.centroids().clone();
    let inertia = compute_inertia(features, &labels, &centroids);

    Ok(ClusterModel {
        n_clusters,
        labels,
        centroids,
        inertia,
    })
}

/// Per-cluster mean service value and age, computed from the records themselves
pub fn summarize_clusters(
    view: &[TransactionRecord],
    labels: &Array1<usize>,
    n_clusters: usize,
) -> Vec<ClusterSummary> {
    let mut sums = vec![(0usize, 0.0f64, 0.0f64); n_clusters];
    for (record, &label) in view.iter().zip(labels.iter()) {
        if let Some(entry) = sums.get_mut(label) {
            entry.0 += 1;
            entry.1 += record.service_value;
            entry.2 += f64::from(record.age);
        }
    }

    sums.into_iter()
        .enumerate()
        .filter(|(_, (size, _, _))| *size > 0)
        .map(|(cluster, (size, value_sum, age_sum))| ClusterSummary {
            cluster,
            size,
            mean_service_value: value_sum / size as f64,
            mean_age: age_sum / size as f64,
        })
        .collect()
}

fn count_distinct_points(features: &Array2<f64>) -> usize {
    features
        .outer_iter()
        .map(|row| row.iter().map(|v| v.to_bits()).collect::<Vec<u64>>())
        .collect::<HashSet<_>>()
        .len()
}

/// Within-cluster sum of squares
fn compute_inertia(features: &Array2<f64>, labels: &Array1<usize>, centroids: &Array2<f64>) -> f64 {
    let mut inertia = 0.0;

    for (i, &cluster) in labels.iter().enumerate() {
        if cluster < centroids.nrows() {
            let distance = euclidean_distance(&features.row(i), &centroids.row(cluster));
            inertia += distance * distance;
        }
    }

    inertia
}

fn euclidean_distance(point1: &ArrayView1<f64>, point2: &ArrayView1<f64>) -> f64 {
    point1
        .iter()
        .zip(point2.iter())
        .map(|(a, b)| (a - b).powi(2))
        .sum::<f64>()
        .sqrt()
}
