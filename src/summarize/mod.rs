use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use crate::extract::{HttpDocumentSource, DEFAULT_FETCH_TIMEOUT_SECS};
use crate::llm::{OpenAiClient, OpenAiClientConfig};
use crate::parsing::{catalog, Category};
use crate::store::{PgStore, SummaryTarget};
use crate::telemetry;

pub mod chunked;
pub mod driver;
pub mod prompt;
pub mod window;

use chunked::{ChunkedSummarizer, SummarizerConfig};
use driver::{Clock, SystemClock};
use window::ProcessingWindow;

#[derive(Args)]
pub struct SummarizeCmd {
    /// Limit to these categories (repeatable); default is every category
    #[arg(long = "category", value_enum)]
    pub categories: Vec<Category>,
    /// Window start, HH:MM UTC (env SUMMARY_WINDOW_START, default 16:30)
    #[arg(long)]
    pub window_start: Option<String>,
    /// Window end, HH:MM UTC (env SUMMARY_WINDOW_END, default 00:30)
    #[arg(long)]
    pub window_end: Option<String>,
    /// Characters per chunk (env SUMMARY_MAX_CHUNK_CHARS, default 100000)
    #[arg(long)]
    pub max_chunk_chars: Option<usize>,
    #[arg(long, default_value_t = DEFAULT_FETCH_TIMEOUT_SECS)]
    pub fetch_timeout_secs: u64,
    #[arg(long, default_value_t = false)]
    pub apply: bool,
}

#[derive(Serialize)]
struct PendingCount { category: &'static str, table: &'static str, url_column: &'static str, pending: i64 }

#[derive(Serialize)]
struct SummarizePlan { window: String, window_open: bool, max_chunk_chars: usize, total_pending: i64, categories: Vec<PendingCount> }

pub async fn run(store: &PgStore, args: SummarizeCmd) -> Result<()> {
    let log = telemetry::summarize();
    let _g = log.root_span_kv([
        ("apply", args.apply.to_string()),
        ("categories", format!("{:?}", args.categories)),
    ]).entered();

    let window = ProcessingWindow::resolve(args.window_start.as_deref(), args.window_end.as_deref())?;
    let mut cfg = SummarizerConfig::from_env();
    if let Some(n) = args.max_chunk_chars.filter(|n| *n > 0) { cfg.max_chunk_chars = n; }
    let targets: Vec<SummaryTarget> = catalog::select(&args.categories).into_iter().map(SummaryTarget::from).collect();

    if !args.apply {
        let mut counts = Vec::with_capacity(targets.len());
        for t in &targets {
            let pending = store.count_pending(t).await.with_context(|| format!("count pending rows in {}", t.table))?;
            counts.push(PendingCount { category: t.name, table: t.table, url_column: t.url_column, pending });
        }
        let window_open = window.contains(SystemClock.now().time());
        let total_pending: i64 = counts.iter().map(|c| c.pending).sum();
        if telemetry::config::json_mode() {
            log.plan(&SummarizePlan { window: window.to_string(), window_open, max_chunk_chars: cfg.max_chunk_chars, total_pending, categories: counts })?;
        } else {
            log.info(format!("📝 Summarize plan — window={} open={} pending={} chunk_chars={}", window, window_open, total_pending, cfg.max_chunk_chars));
            for c in counts.iter().filter(|c| c.pending > 0) {
                log.info(format!("  {} ({}.{}) pending={}", c.category, c.table, c.url_column, c.pending));
            }
            log.info("   Use --apply to execute.");
        }
        return Ok(());
    }

    let source = HttpDocumentSource::new(Duration::from_secs(args.fetch_timeout_secs))?;
    let llm = OpenAiClient::new(OpenAiClientConfig::from_env()).context("build LLM client")?;
    log.info_kv("llm", [("model", llm.model().to_string()), ("max_chunk_chars", cfg.max_chunk_chars.to_string())]);
    let summarizer = ChunkedSummarizer::new(Arc::new(source), Arc::new(llm), cfg);

    let report = driver::run_batch(store, &summarizer, &targets, window, &SystemClock).await;

    log.info(format!(
        "📊 Summarize totals — processed={} summarized={} failed={} halted_by_window={}",
        report.processed(), report.summarized(), report.failed(), report.halted_by_window
    ));
    if telemetry::config::json_mode() {
        log.result(&report)?;
    }
    Ok(())
}
