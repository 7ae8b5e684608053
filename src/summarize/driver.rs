use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::Instrument;

use crate::store::{PendingRow, SummaryStore, SummaryTarget, FAILURE_MARKER};
use crate::telemetry::{self, ops::summarize::Phase};

use super::chunked::DocumentSummarizer;
use super::window::ProcessingWindow;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> { Utc::now() }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CategoryReport {
    pub category: &'static str,
    pub table: &'static str,
    pub pending: usize,
    pub processed: usize,
    pub summarized: usize,
    pub failed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CategoryReport {
    fn new(target: &SummaryTarget) -> Self {
        Self { category: target.name, table: target.table, pending: 0, processed: 0, summarized: 0, failed: 0, error: None }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DriverReport {
    pub window: String,
    pub categories: Vec<CategoryReport>,
    pub halted_by_window: bool,
}

impl DriverReport {
    pub fn processed(&self) -> usize { self.categories.iter().map(|c| c.processed).sum() }
    pub fn summarized(&self) -> usize { self.categories.iter().map(|c| c.summarized).sum() }
    pub fn failed(&self) -> usize { self.categories.iter().map(|c| c.failed).sum() }
}

enum CategoryOutcome {
    Drained,
    WindowClosed,
}

/// Works through every target's pending rows, one document at a time,
/// committing each row before the next. The window is checked before every
/// row; once it is closed nothing further runs in this batch.
pub async fn run_batch(
    store: &dyn SummaryStore,
    summarizer: &dyn DocumentSummarizer,
    targets: &[SummaryTarget],
    window: ProcessingWindow,
    clock: &dyn Clock,
) -> DriverReport {
    let log = telemetry::summarize();
    let mut report = DriverReport { window: window.to_string(), ..Default::default() };

    for target in targets {
        let mut cat = CategoryReport::new(target);
        let outcome = process_category(store, summarizer, target, window, clock, &mut cat).await;
        match outcome {
            Ok(CategoryOutcome::Drained) => log.category_summary(target.name, cat.processed, cat.summarized, cat.failed),
            Ok(CategoryOutcome::WindowClosed) => report.halted_by_window = true,
            Err(e) => {
                log.error_kv("category aborted", [("category", target.name.to_string()), ("table", target.table.to_string()), ("error", format!("{e:#}"))]);
                cat.error = Some(format!("{e:#}"));
            }
        }
        report.categories.push(cat);
        if report.halted_by_window {
            log.halted(&report.window);
            break;
        }
    }
    report
}

async fn process_category(
    store: &dyn SummaryStore,
    summarizer: &dyn DocumentSummarizer,
    target: &SummaryTarget,
    window: ProcessingWindow,
    clock: &dyn Clock,
    cat: &mut CategoryReport,
) -> Result<CategoryOutcome> {
    let log = telemetry::summarize();
    let rows = store
        .pending(target)
        .instrument(log.span_kv(&Phase::SelectPending, [("table", target.table.to_string())]))
        .await
        .with_context(|| format!("select pending rows from {}", target.table))?;
    cat.pending = rows.len();
    if !rows.is_empty() {
        log.info_kv("pending rows", [("category", target.name.to_string()), ("count", rows.len().to_string())]);
    }

    for row in rows {
        let open = {
            let _s = log.span(&Phase::WindowCheck).entered();
            window.contains(clock.now().time())
        };
        if !open {
            return Ok(CategoryOutcome::WindowClosed);
        }

        let summary = summarizer.summarize_url(&row.url).await;
        cat.processed += 1;
        if persist(store, target, &row, summary).await? {
            cat.summarized += 1;
        } else {
            cat.failed += 1;
        }
    }
    Ok(CategoryOutcome::Drained)
}

/// `Ok(true)` when a summary was stored, `Ok(false)` when the row was marked
/// failed. Failing to write the marker is a category-level error.
async fn persist(store: &dyn SummaryStore, target: &SummaryTarget, row: &PendingRow, summary: Option<String>) -> Result<bool> {
    let log = telemetry::summarize();
    let span = log.span_kv(&Phase::Persist, [("guid", row.key.clone())]);
    async {
        if let Some(text) = summary {
            match store.save_summary(target, &row.key, &text).await {
                Ok(()) => return Ok(true),
                Err(e) => log.error_kv(
                    "saving summary failed",
                    [("table", target.table.to_string()), ("guid", row.key.clone()), ("error", format!("{e:#}"))],
                ),
            }
        } else {
            log.warn_kv("summary failed; marking row", [("table", target.table.to_string()), ("guid", row.key.clone()), ("url", row.url.clone())]);
        }
        store
            .save_summary(target, &row.key, FAILURE_MARKER)
            .await
            .with_context(|| format!("mark {} in {} as failed", row.key, target.table))?;
        Ok::<_, anyhow::Error>(false)
    }
    .instrument(span)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use chrono::TimeZone;

    use crate::llm::mock::MockClient;
    use crate::store::memory::MemoryStore;
    use crate::summarize::chunked::tests::StubSource;
    use crate::summarize::chunked::{ChunkedSummarizer, SummarizerConfig};

    struct FixedClock(DateTime<Utc>);

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> { self.0 }
    }

    fn at(h: u32, m: u32) -> FixedClock {
        FixedClock(Utc.with_ymd_and_hms(2024, 3, 1, h, m, 0).unwrap())
    }

    /// Returns a scripted summary per URL and records every request.
    #[derive(Default)]
    struct ScriptedSummarizer {
        by_url: HashMap<String, String>,
        seen: Mutex<Vec<String>>,
    }

    impl ScriptedSummarizer {
        fn with(pairs: &[(&str, &str)]) -> Self {
            Self { by_url: pairs.iter().map(|(u, s)| (u.to_string(), s.to_string())).collect(), ..Default::default() }
        }
        fn seen(&self) -> Vec<String> { self.seen.lock().unwrap().clone() }
    }

    #[async_trait]
    impl DocumentSummarizer for ScriptedSummarizer {
        async fn summarize_url(&self, url: &str) -> Option<String> {
            self.seen.lock().unwrap().push(url.to_string());
            self.by_url.get(url).cloned()
        }
    }

    const ANN: SummaryTarget = SummaryTarget { name: "Announcements", table: "nse_announcements", key_column: "guid", url_column: "link" };
    const BRSR: SummaryTarget = SummaryTarget { name: "BRSR", table: "nse_brsr", key_column: "guid", url_column: "pdf_link" };

    #[tokio::test]
    async fn outside_window_processes_nothing() {
        let store = MemoryStore::new();
        store.seed(ANN.table, "g1", "https://x/1.pdf", None);
        let llm = Arc::new(MockClient::new());
        let summarizer = ChunkedSummarizer::new(Arc::new(StubSource::default()), llm.clone(), SummarizerConfig::default());

        let report = run_batch(&store, &summarizer, &[ANN, BRSR], ProcessingWindow::default(), &at(12, 0)).await;

        assert!(report.halted_by_window);
        assert_eq!(report.processed(), 0);
        assert_eq!(report.categories.len(), 1);
        assert!(llm.calls().is_empty());
        assert_eq!(store.row(ANN.table, "g1").unwrap().summary, None);
    }

    #[tokio::test]
    async fn inside_window_summarizes_and_marks_failures() {
        let store = MemoryStore::new();
        store.seed(ANN.table, "g1", "https://x/1.pdf", None);
        store.seed(ANN.table, "g2", "https://x/2.pdf", None);
        store.seed(ANN.table, "done", "https://x/3.pdf", Some("already"));
        let summarizer = ScriptedSummarizer::with(&[("https://x/1.pdf", "- Results approved")]);

        let report = run_batch(&store, &summarizer, &[ANN], ProcessingWindow::default(), &at(23, 45)).await;

        assert!(!report.halted_by_window);
        let cat = &report.categories[0];
        assert_eq!((cat.pending, cat.processed, cat.summarized, cat.failed), (2, 2, 1, 1));
        assert_eq!(store.row(ANN.table, "g1").unwrap().summary.as_deref(), Some("- Results approved"));
        assert_eq!(store.row(ANN.table, "g2").unwrap().summary.as_deref(), Some(FAILURE_MARKER));
        assert_eq!(summarizer.seen(), vec!["https://x/1.pdf", "https://x/2.pdf"]);
    }

    #[tokio::test]
    async fn marked_rows_are_not_retried() {
        let store = MemoryStore::new();
        store.seed(ANN.table, "g1", "https://x/1.pdf", None);
        let summarizer = ScriptedSummarizer::default();
        run_batch(&store, &summarizer, &[ANN], ProcessingWindow::default(), &at(17, 0)).await;
        let again = run_batch(&store, &summarizer, &[ANN], ProcessingWindow::default(), &at(17, 5)).await;
        assert_eq!(again.categories[0].pending, 0);
        assert_eq!(summarizer.seen().len(), 1);
    }

    #[tokio::test]
    async fn failed_save_falls_back_to_marker() {
        let store = MemoryStore::new();
        store.seed(ANN.table, "g1", "https://x/1.pdf", None);
        let summarizer = ScriptedSummarizer::with(&[("https://x/1.pdf", "text")]);
        // first save fails, marker write goes through
        struct FlakyOnce<'a> { inner: &'a MemoryStore, tripped: Mutex<bool> }
        #[async_trait]
        impl SummaryStore for FlakyOnce<'_> {
            async fn pending(&self, t: &SummaryTarget) -> Result<Vec<PendingRow>> { self.inner.pending(t).await }
            async fn save_summary(&self, t: &SummaryTarget, key: &str, summary: &str) -> Result<()> {
                let first = !std::mem::replace(&mut *self.tripped.lock().unwrap(), true);
                if first { anyhow::bail!("deadlock detected"); }
                self.inner.save_summary(t, key, summary).await
            }
        }
        let flaky = FlakyOnce { inner: &store, tripped: Mutex::new(false) };
        let report = run_batch(&flaky, &summarizer, &[ANN], ProcessingWindow::default(), &at(18, 0)).await;
        assert_eq!(report.categories[0].failed, 1);
        assert_eq!(store.row(ANN.table, "g1").unwrap().summary.as_deref(), Some(FAILURE_MARKER));
    }

    #[tokio::test]
    async fn category_error_does_not_stop_later_categories() {
        let store = MemoryStore::new();
        store.fail_pending.lock().unwrap().insert(ANN.table.to_string());
        store.seed(BRSR.table, "b1", "https://x/b1.pdf", None);
        let summarizer = ScriptedSummarizer::with(&[("https://x/b1.pdf", "ESG summary")]);

        let report = run_batch(&store, &summarizer, &[ANN, BRSR], ProcessingWindow::default(), &at(20, 0)).await;

        assert!(report.categories[0].error.as_deref().unwrap().contains("nse_announcements"));
        assert_eq!(report.categories[1].summarized, 1);
        assert_eq!(store.row(BRSR.table, "b1").unwrap().summary.as_deref(), Some("ESG summary"));
    }

    #[tokio::test]
    async fn marker_write_failure_aborts_only_that_category() {
        let store = MemoryStore::new();
        store.seed(ANN.table, "bad", "https://x/bad.pdf", None);
        store.seed(ANN.table, "next", "https://x/next.pdf", None);
        store.seed(BRSR.table, "b1", "https://x/b1.pdf", None);
        store.fail_save.lock().unwrap().insert("bad".to_string());
        let summarizer = ScriptedSummarizer::with(&[("https://x/next.pdf", "n"), ("https://x/b1.pdf", "b")]);

        let report = run_batch(&store, &summarizer, &[ANN, BRSR], ProcessingWindow::default(), &at(21, 0)).await;

        assert!(report.categories[0].error.is_some());
        assert_eq!(report.categories[0].processed, 1);
        assert_eq!(store.row(ANN.table, "next").unwrap().summary, None);
        assert_eq!(report.categories[1].summarized, 1);
        assert!(!report.halted_by_window);
    }
}
