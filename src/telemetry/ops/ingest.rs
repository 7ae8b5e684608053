use tracing::Span;
use tracing::info_span;

use crate::telemetry::ctx::{OpMarker, PhaseSpan};

#[derive(Copy, Clone, Debug)]
pub struct Ingest;

#[derive(Copy, Clone, Debug)]
pub enum Phase { Feed, FetchFeed, ParseEntries, WriteRecords }

impl PhaseSpan for Phase {
    fn name(&self) -> &'static str { match self {
        Phase::Feed => "feed",
        Phase::FetchFeed => "fetch_feed",
        Phase::ParseEntries => "parse_entries",
        Phase::WriteRecords => "write_records",
    }}
    fn span(&self) -> Span { match self {
        Phase::Feed => info_span!("feed"),
        Phase::FetchFeed => info_span!("fetch_feed"),
        Phase::ParseEntries => info_span!("parse_entries"),
        Phase::WriteRecords => info_span!("write_records"),
    }}
}

impl OpMarker for Ingest {
    const NAME: &'static str = "ingest";
    type Phase = Phase;
    fn root_span() -> Span { info_span!("ingest") }
}
