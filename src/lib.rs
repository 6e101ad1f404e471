//! Clinic Insights: filtering, summaries and K-Means segmentation of clinic service sales
//!
//! A session holds one immutable table of transaction records. Every filter
//! change reruns the whole pipeline: `filter` narrows the table,
//! `aggregate` summarises the view and `cluster` splits it into
//! behavioural segments over `(service_value, age)`.

pub mod aggregate;
pub mod cli;
pub mod data;
pub mod error;
pub mod filter;
pub mod model;
pub mod pipeline;
pub mod record;
pub mod viz;

// Re-export public items for easier access
pub use aggregate::{aggregate, AgeBin, AgeStats, Summaries};
pub use cli::Args;
pub use data::{CsvSource, GeneratorConfig, RecordSource, SyntheticSource};
pub use error::AnalysisError;
pub use filter::{filter, AgeRange, Predicate};
pub use model::{cluster, ClusterModel, ClusterOutcome, ClusterParams, ClusterSummary};
pub use pipeline::{Session, Snapshot};
pub use record::TransactionRecord;

/// Common result type used at the I/O and rendering edges
pub type Result<T> = anyhow::Result<T>;
