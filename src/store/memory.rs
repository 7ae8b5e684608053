//! In-memory store for tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::parsing::catalog::CategorySpec;
use crate::parsing::CanonicalRecord;

use super::{PendingRow, RecordStore, SummaryStore, SummaryTarget};

#[derive(Clone, Debug, Default)]
pub struct MemoryRow {
    pub title: String,
    pub url: Option<String>,
    pub symbol: Option<String>,
    pub summary: Option<String>,
}

#[derive(Default)]
pub struct MemoryStore {
    // (table, guid) in insertion order
    order: Mutex<Vec<(String, String)>>,
    rows: Mutex<HashMap<(String, String), MemoryRow>>,
    pub fail_insert: Mutex<HashSet<String>>,
    pub fail_pending: Mutex<HashSet<String>>,
    pub fail_save: Mutex<HashSet<String>>,
    pub saves: Mutex<Vec<(String, String, String)>>,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }

    pub fn seed(&self, table: &str, key: &str, url: &str, summary: Option<&str>) {
        let k = (table.to_string(), key.to_string());
        self.order.lock().unwrap().push(k.clone());
        self.rows.lock().unwrap().insert(k, MemoryRow {
            url: Some(url.to_string()),
            summary: summary.map(str::to_string),
            ..Default::default()
        });
    }

    pub fn row(&self, table: &str, key: &str) -> Option<MemoryRow> {
        self.rows.lock().unwrap().get(&(table.to_string(), key.to_string())).cloned()
    }

    pub fn count(&self, table: &str) -> usize {
        self.rows.lock().unwrap().keys().filter(|(t, _)| t == table).count()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn insert_record(
        &self,
        spec: &CategorySpec,
        record: &CanonicalRecord,
        symbol: Option<&str>,
    ) -> Result<bool> {
        if self.fail_insert.lock().unwrap().contains(&record.guid) {
            return Err(anyhow!("violates check constraint"));
        }
        let k = (spec.table.to_string(), record.guid.clone());
        let mut rows = self.rows.lock().unwrap();
        if rows.contains_key(&k) { return Ok(false); }
        rows.insert(k.clone(), MemoryRow {
            title: record.title.clone(),
            url: record.text(spec.summary_url_column).map(str::to_string),
            symbol: symbol.map(str::to_string),
            summary: None,
        });
        self.order.lock().unwrap().push(k);
        Ok(true)
    }
}

#[async_trait]
impl SummaryStore for MemoryStore {
    async fn pending(&self, target: &SummaryTarget) -> Result<Vec<PendingRow>> {
        if self.fail_pending.lock().unwrap().contains(target.table) {
            return Err(anyhow!("relation \"{}\" does not exist", target.table));
        }
        let rows = self.rows.lock().unwrap();
        let out = self
            .order
            .lock()
            .unwrap()
            .iter()
            .filter(|(t, _)| t == target.table)
            .filter_map(|k| {
                let row = rows.get(k)?;
                let url = row.url.as_deref().filter(|u| !u.is_empty())?;
                let pending = row.summary.as_deref().map_or(true, str::is_empty);
                pending.then(|| PendingRow { key: k.1.clone(), url: url.to_string() })
            })
            .collect();
        Ok(out)
    }

    async fn save_summary(&self, target: &SummaryTarget, key: &str, summary: &str) -> Result<()> {
        if self.fail_save.lock().unwrap().contains(key) {
            return Err(anyhow!("connection reset"));
        }
        let k = (target.table.to_string(), key.to_string());
        if let Some(row) = self.rows.lock().unwrap().get_mut(&k) {
            row.summary = Some(summary.to_string());
        }
        self.saves.lock().unwrap().push((target.table.to_string(), key.to_string(), summary.to_string()));
        Ok(())
    }
}
