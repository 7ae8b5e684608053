use crate::parsing::{parse_entry, CategorySpec, FeedEntry};
use crate::store::RecordStore;
use crate::telemetry;

use super::symbols::{SymbolCache, SymbolLookup};
use super::types::WriteSummary;

/// Parse and insert one feed's entries in order. Rejects and failed inserts
/// are logged and counted; neither stops the batch. An existing guid counts
/// as a duplicate, not an insert.
pub async fn write_entries<L: SymbolLookup>(
    store: &dyn RecordStore,
    spec: &CategorySpec,
    entries: &[FeedEntry],
    symbols: Option<&SymbolCache<L>>,
) -> WriteSummary {
    let log = telemetry::ingest();
    let mut summary = WriteSummary { seen: entries.len(), ..Default::default() };

    for entry in entries {
        let record = match parse_entry(spec, entry) {
            Ok(r) => r,
            Err(reason) => {
                summary.rejected += 1;
                log.warn_kv("↩️ reject", [
                    ("category", spec.name.to_string()),
                    ("title", entry.title().unwrap_or("").to_string()),
                    ("reason", reason.to_string()),
                ]);
                continue;
            }
        };

        let symbol = match symbols {
            Some(cache) => cache.resolve(&record.title).await,
            None => None,
        };

        match store.insert_record(spec, &record, symbol.as_deref()).await {
            Ok(true) => {
                summary.inserted += 1;
                log.debug_kv("➕ insert", [("category", spec.name.to_string()), ("guid", record.guid.clone())]);
            }
            Ok(false) => summary.duplicates += 1,
            Err(e) => {
                summary.errors += 1;
                log.error_kv("insert failed", [
                    ("category", spec.name.to_string()),
                    ("guid", record.guid.clone()),
                    ("error", format!("{e:#}")),
                ]);
            }
        }
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use async_trait::async_trait;

    use crate::ingestion::symbols::CACHE_CAPACITY;
    use crate::parsing::Category;
    use crate::store::memory::MemoryStore;

    struct NoSymbols;

    #[async_trait]
    impl SymbolLookup for NoSymbols {
        async fn lookup(&self, _company: &str) -> Result<Option<String>> { Ok(None) }
    }

    struct Fixed(&'static str);

    #[async_trait]
    impl SymbolLookup for Fixed {
        async fn lookup(&self, _company: &str) -> Result<Option<String>> { Ok(Some(self.0.to_string())) }
    }

    fn announcement(title: &str, link: &str) -> FeedEntry {
        FeedEntry {
            title: Some(title.into()),
            link: Some(link.into()),
            description: Some("General updates".into()),
            published: Some("15-Jan-2024 10:00:00".into()),
        }
    }

    #[tokio::test]
    async fn rewriting_the_same_entries_inserts_once() {
        let store = MemoryStore::new();
        let spec = Category::Announcements.spec();
        let entries = vec![announcement("ACME LTD", "https://x/a.pdf"), announcement("BETA LTD", "https://x/b.pdf")];

        let first = write_entries::<NoSymbols>(&store, spec, &entries, None).await;
        let second = write_entries::<NoSymbols>(&store, spec, &entries, None).await;

        assert_eq!(first, WriteSummary { seen: 2, inserted: 2, ..Default::default() });
        assert_eq!(second, WriteSummary { seen: 2, duplicates: 2, ..Default::default() });
        assert_eq!(store.count(spec.table), 2);
        assert_eq!(store.row(spec.table, "https://x/b.pdf").unwrap().title, "BETA LTD");
    }

    #[tokio::test]
    async fn rejects_and_failures_do_not_stop_the_batch() {
        let store = MemoryStore::new();
        store.fail_insert.lock().unwrap().insert("https://x/broken.pdf".to_string());
        let spec = Category::Announcements.spec();
        let entries = vec![
            FeedEntry { title: None, ..announcement("", "https://x/untitled.pdf") },
            announcement("BROKEN LTD", "https://x/broken.pdf"),
            announcement("GOOD LTD", "https://x/good.pdf"),
        ];

        let s = write_entries::<NoSymbols>(&store, spec, &entries, None).await;

        assert_eq!(s, WriteSummary { seen: 3, rejected: 1, inserted: 1, errors: 1, duplicates: 0 });
        assert!(store.row(spec.table, "https://x/good.pdf").is_some());
    }

    #[tokio::test]
    async fn resolved_symbol_is_stored() {
        let store = MemoryStore::new();
        let spec = Category::Announcements.spec();
        let cache = SymbolCache::new(Fixed("ACME"), CACHE_CAPACITY);
        write_entries(&store, spec, &[announcement("ACME LTD", "https://x/a.pdf")], Some(&cache)).await;
        assert_eq!(store.row(spec.table, "https://x/a.pdf").unwrap().symbol.as_deref(), Some("ACME"));
    }
}
