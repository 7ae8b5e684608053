use std::time::Duration;

use anyhow::Result;
use clap::Args;
use reqwest::Client;
use tokio::task::JoinSet;
use tracing::Instrument;

use crate::extract::USER_AGENT;
use crate::parsing::{catalog, Category, CategorySpec, FeedEntry};
use crate::store::PgStore;
use crate::telemetry::{self};
use crate::telemetry::ops::ingest::Phase as IngestPhase;

mod fetch;
pub mod symbols;
mod types;
mod write;

pub use write::write_entries;

use symbols::{NseSymbolLookup, SymbolCache, CACHE_CAPACITY};
use types::{FeedSummary, IngestApply, IngestTotals, WriteSummary};

#[derive(Args)]
pub struct IngestCmd {
    /// Limit to these categories (repeatable); default is every feed
    #[arg(long = "category", value_enum)] pub categories: Vec<Category>,
    /// Look up the company symbol for each new record
    #[arg(long, default_value_t=false)] pub resolve_symbols: bool,
    #[arg(long, default_value_t=15)] pub timeout_secs: u64,
    #[arg(long, default_value_t=false)] pub apply: bool,
    #[arg(long, default_value_t=20)] pub plan_limit: usize,
}

pub async fn run(store: &PgStore, args: IngestCmd) -> Result<()> {
    let log = telemetry::ingest();
    let _g = log.root_span_kv([
        ("apply", args.apply.to_string()),
        ("categories", format!("{:?}", args.categories)),
        ("resolve_symbols", args.resolve_symbols.to_string()),
    ]).entered();

    let feeds = catalog::select(&args.categories);

    if !args.apply {
        if telemetry::config::json_mode() {
            use types::{FeedSample, IngestPlan};
            let samples: Vec<FeedSample> = feeds.iter().take(args.plan_limit)
                .map(|f| FeedSample { category: f.name, table: f.table, url: f.feed_url })
                .collect();
            log.plan(&IngestPlan { feeds: feeds.len(), resolve_symbols: args.resolve_symbols, sample_feeds: samples })?;
        } else {
            log.info(format!("📝 Ingest plan — feeds={} resolve_symbols={}", feeds.len(), args.resolve_symbols));
            for f in feeds.iter().take(args.plan_limit) { log.info(format!("  {} -> {} ({})", f.name, f.table, f.feed_url)); }
            if feeds.len() > args.plan_limit { log.info(format!("  ... ({} more)", feeds.len() - args.plan_limit)); }
            log.info("   Use --apply to execute.");
        }
        return Ok(());
    }

    let client = Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(args.timeout_secs))
        .build()?;
    let symbols = if args.resolve_symbols {
        Some(SymbolCache::new(NseSymbolLookup::new(USER_AGENT)?, CACHE_CAPACITY))
    } else {
        None
    };

    // every feed is fetched concurrently; writes happen as each one lands
    let mut tasks: JoinSet<(&'static CategorySpec, Result<Vec<FeedEntry>>)> = JoinSet::new();
    for spec in feeds.iter().copied() {
        let client = client.clone();
        let span = log.span_kv(&IngestPhase::Feed, [("category", spec.name.to_string()), ("url", spec.feed_url.to_string())]);
        tasks.spawn(async move { (spec, fetch_entries(&client, spec).await) }.instrument(span));
    }

    let mut totals = WriteSummary::default();
    let mut per_feed: Vec<FeedSummary> = Vec::with_capacity(feeds.len());
    let mut failed_feeds = 0usize;

    while let Some(joined) = tasks.join_next().await {
        let (spec, fetched) = match joined {
            Ok(done) => done,
            Err(e) => {
                failed_feeds += 1;
                log.error_kv("feed task failed", [("error", e.to_string())]);
                continue;
            }
        };
        match fetched {
            Ok(entries) => {
                let counts = write_entries(store, spec, &entries, symbols.as_ref())
                    .instrument(log.span_kv(&IngestPhase::WriteRecords, [("category", spec.name.to_string()), ("entries", entries.len().to_string())]))
                    .await;
                log.feed_summary(spec.name, counts.seen, counts.inserted, counts.duplicates, counts.rejected, counts.errors);
                totals.add(&counts);
                per_feed.push(FeedSummary { category: spec.name, table: spec.table, counts, failed: None });
            }
            Err(e) => {
                failed_feeds += 1;
                log.error_kv("feed failed", [("category", spec.name.to_string()), ("url", spec.feed_url.to_string()), ("error", format!("{e:#}"))]);
                per_feed.push(FeedSummary { category: spec.name, table: spec.table, counts: WriteSummary::default(), failed: Some(format!("{e:#}")) });
            }
        }
    }

    log.totals(per_feed.len(), failed_feeds, totals.inserted, totals.duplicates, totals.rejected, totals.errors);

    if telemetry::config::json_mode() {
        let result = IngestApply {
            totals: IngestTotals { feeds: feeds.len(), failed_feeds, counts: totals },
            per_feed,
        };
        log.result(&result)?;
    }
    Ok(())
}

async fn fetch_entries(client: &Client, spec: &CategorySpec) -> Result<Vec<FeedEntry>> {
    let log = telemetry::ingest();
    let xml = fetch::fetch_feed(client, spec.feed_url).instrument(log.span(&IngestPhase::FetchFeed)).await?;
    let entries = {
        let _s = log.span(&IngestPhase::ParseEntries).entered();
        fetch::parse_entries(&xml)?
    };
    log.info_kv("fetched", [("category", spec.name.to_string()), ("entries", entries.len().to_string())]);
    Ok(entries)
}
