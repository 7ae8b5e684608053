use anyhow::Result;
use serde::Serialize;
use std::marker::PhantomData;
use tracing::{info, debug, warn, error, Span};

use super::emit;

pub trait PhaseSpan {
    fn name(&self) -> &'static str;
    fn span(&self) -> Span;
}

pub trait OpMarker {
    const NAME: &'static str;
    type Phase: PhaseSpan;
    fn root_span() -> Span;
}

pub struct LogCtx<O: OpMarker> {
    pub(crate) json: bool,
    pub(crate) _marker: PhantomData<O>,
}

impl<O: OpMarker> LogCtx<O> {
    fn op_name(&self) -> &'static str { O::NAME }

    pub fn root_span(&self) -> Span { O::root_span() }

    pub fn root_span_kv<'a, T>(&self, fields: T) -> Span
    where
        T: IntoIterator<Item = (&'a str, String)>,
    {
        let span = self.root_span();
        let details = kv_to_string(fields);
        if details.is_empty() {
            info!(op = %self.op_name(), "start");
        } else {
            info!(op = %self.op_name(), details = %details, "start");
        }
        span
    }

    pub fn span(&self, ph: &O::Phase) -> Span { ph.span() }

    pub fn span_kv<'a, T>(&self, ph: &O::Phase, fields: T) -> Span
    where
        T: IntoIterator<Item = (&'a str, String)>,
    {
        let span = self.span(ph);
        let details = kv_to_string(fields);
        if details.is_empty() {
            info!(op = %self.op_name(), phase = ph.name(), "span_start");
        } else {
            info!(op = %self.op_name(), phase = ph.name(), details = %details, "span_start");
        }
        span
    }

    pub fn info(&self, msg: impl AsRef<str>) { if self.json { info!(op = %self.op_name(), "{}", msg.as_ref()); } else { info!("{}", msg.as_ref()); } }

    pub fn info_kv<'a, D>(&self, msg: &str, kv: D)
    where
        D: IntoIterator<Item = (&'a str, String)>,
    {
        let details = kv_to_string(kv);
        if self.json { info!(op = %self.op_name(), details = %details, "{}", msg); }
        else if details.is_empty() { info!("{}", msg); }
        else { info!("{} {}", msg, details); }
    }

    pub fn debug_kv<'a, D>(&self, msg: &str, kv: D)
    where
        D: IntoIterator<Item = (&'a str, String)>,
    {
        let details = kv_to_string(kv);
        if self.json { debug!(op = %self.op_name(), details = %details, "{}", msg); }
        else if details.is_empty() { debug!("{}", msg); }
        else { debug!("{} {}", msg, details); }
    }

    pub fn warn_kv<'a, D>(&self, msg: &str, kv: D)
    where
        D: IntoIterator<Item = (&'a str, String)>,
    {
        let details = kv_to_string(kv);
        if self.json { warn!(op = %self.op_name(), details = %details, "{}", msg); }
        else if details.is_empty() { warn!("{}", msg); }
        else { warn!("{} {}", msg, details); }
    }

    pub fn error_kv<'a, D>(&self, msg: &str, kv: D)
    where
        D: IntoIterator<Item = (&'a str, String)>,
    {
        let details = kv_to_string(kv);
        if self.json { error!(op = %self.op_name(), details = %details, "{}", msg); }
        else if details.is_empty() { error!("{}", msg); }
        else { error!("{} {}", msg, details); }
    }

    pub fn plan<T: Serialize>(&self, plan: &T) -> Result<()> { emit::print_plan(self.op_name(), plan) }
    pub fn result<T: Serialize>(&self, result: &T) -> Result<()> { emit::print_result(self.op_name(), result) }
}

impl LogCtx<crate::telemetry::ops::ingest::Ingest> {
    pub fn feed_summary(&self, category: &str, seen: usize, inserted: usize, duplicates: usize, rejected: usize, errors: usize) {
        if self.json { info!(op = %self.op_name(), category, seen, inserted, duplicates, rejected, errors, "feed_summary"); }
        else { info!("✅ {} — seen={} inserted={} duplicates={} rejected={} errors={}", category, seen, inserted, duplicates, rejected, errors); }
    }

    pub fn totals(&self, feeds: usize, failed_feeds: usize, inserted: usize, duplicates: usize, rejected: usize, errors: usize) {
        if self.json { info!(op = %self.op_name(), feeds, failed_feeds, inserted, duplicates, rejected, errors, "ingest_totals"); }
        else { info!("📊 Ingest totals — feeds={} failed_feeds={} inserted={} duplicates={} rejected={} errors={}", feeds, failed_feeds, inserted, duplicates, rejected, errors); }
    }
}

impl LogCtx<crate::telemetry::ops::summarize::Summarize> {
    pub fn category_summary(&self, category: &str, processed: usize, summarized: usize, failed: usize) {
        if self.json { info!(op = %self.op_name(), category, processed, summarized, failed, "category_summary"); }
        else { info!("✅ {} — processed={} summarized={} failed={}", category, processed, summarized, failed); }
    }

    pub fn halted(&self, window: &str) {
        if self.json { warn!(op = %self.op_name(), window, "halted_by_window"); }
        else { warn!("⏸️ Outside processing window {}; stopping", window); }
    }
}

fn kv_to_string<'a, T>(kv: T) -> String
where
    T: IntoIterator<Item = (&'a str, String)>,
{
    let mut parts: Vec<String> = Vec::new();
    for (k, v) in kv { parts.push(format!("{}={}", k, v)); }
    parts.join(" ")
}
