use serde::Serialize;

// Plan envelope types
#[derive(Serialize)]
pub struct FeedSample { pub category: &'static str, pub table: &'static str, pub url: &'static str }

#[derive(Serialize)]
pub struct IngestPlan { pub feeds: usize, pub resolve_symbols: bool, pub sample_feeds: Vec<FeedSample> }

// Apply/result envelope types
#[derive(Serialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteSummary { pub seen: usize, pub rejected: usize, pub inserted: usize, pub duplicates: usize, pub errors: usize }

impl WriteSummary {
    pub fn add(&mut self, other: &WriteSummary) {
        self.seen += other.seen;
        self.rejected += other.rejected;
        self.inserted += other.inserted;
        self.duplicates += other.duplicates;
        self.errors += other.errors;
    }
}

#[derive(Serialize)]
pub struct FeedSummary {
    pub category: &'static str,
    pub table: &'static str,
    #[serde(flatten)]
    pub counts: WriteSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed: Option<String>,
}

#[derive(Serialize)]
pub struct IngestTotals { pub feeds: usize, pub failed_feeds: usize, #[serde(flatten)] pub counts: WriteSummary }

#[derive(Serialize)]
pub struct IngestApply { pub totals: IngestTotals, pub per_feed: Vec<FeedSummary> }
