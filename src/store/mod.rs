use anyhow::Result;
use async_trait::async_trait;

use crate::parsing::catalog::{CategorySpec, KEY_COLUMN};
use crate::parsing::CanonicalRecord;

pub mod pg;
#[cfg(test)]
pub mod memory;

pub use pg::PgStore;

/// Written to the summary column when a document could not be summarized,
/// so the row is never picked up again.
pub const FAILURE_MARKER: &str = "[SUMMARY_FAILED]";

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert unless a row with the same guid exists. `Ok(true)` only when a
    /// new row was written; an existing guid is `Ok(false)`, not an error.
    async fn insert_record(
        &self,
        spec: &CategorySpec,
        record: &CanonicalRecord,
        symbol: Option<&str>,
    ) -> Result<bool>;
}

/// Where a category keeps its document URL and summary.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SummaryTarget {
    pub name: &'static str,
    pub table: &'static str,
    pub key_column: &'static str,
    pub url_column: &'static str,
}

impl From<&CategorySpec> for SummaryTarget {
    fn from(spec: &CategorySpec) -> Self {
        SummaryTarget {
            name: spec.name,
            table: spec.table,
            key_column: KEY_COLUMN,
            url_column: spec.summary_url_column,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingRow {
    pub key: String,
    pub url: String,
}

#[async_trait]
pub trait SummaryStore: Send + Sync {
    /// Rows with an empty summary and a non-empty URL, in store order.
    async fn pending(&self, target: &SummaryTarget) -> Result<Vec<PendingRow>>;

    /// Persist one summary (or the failure marker) and commit.
    async fn save_summary(&self, target: &SummaryTarget, key: &str, summary: &str) -> Result<()>;
}
