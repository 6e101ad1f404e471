//! One exploration session: an immutable record table and the
//! filter → aggregate → cluster recomputation run on every predicate change

use crate::aggregate::{aggregate, Summaries};
use crate::data::RecordSource;
use crate::error::AnalysisError;
use crate::filter::{filter, Predicate};
use crate::model::{cluster, ClusterOutcome, ClusterParams};
use crate::record::TransactionRecord;

/// Everything derived from the table for one predicate
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub predicate: Predicate,
    pub view: Vec<TransactionRecord>,
    pub summaries: Summaries,
    /// Clustering can fail on small views while the summaries stay valid
    pub clustering: Result<ClusterOutcome, AnalysisError>,
}

/// Owns the session's record table; nothing derived from it is cached
#[derive(Debug, Clone)]
pub struct Session {
    records: Vec<TransactionRecord>,
    params: ClusterParams,
}

impl Session {
    pub fn new(records: Vec<TransactionRecord>, params: ClusterParams) -> Self {
        Self { records, params }
    }

    /// Load a fresh table from a record source
    pub fn from_source(source: &dyn RecordSource, params: ClusterParams) -> crate::Result<Self> {
        Ok(Self::new(source.load()?, params))
    }

    pub fn records(&self) -> &[TransactionRecord] {
        &self.records
    }

    pub fn params(&self) -> &ClusterParams {
        &self.params
    }

    /// The dashboard's starting predicate, which keeps every record
    pub fn default_predicate(&self) -> Predicate {
        Predicate::spanning(&self.records)
    }

    /// Recompute the whole pipeline for `predicate`
    pub fn run(&self, predicate: &Predicate) -> Snapshot {
        let view = filter(&self.records, predicate);
        let summaries = aggregate(&view);
        let clustering = cluster(&view, &self.params);

        Snapshot {
            predicate: predicate.clone(),
            view,
            summaries,
            clustering,
        }
    }
}
