use tracing::Span;
use tracing::info_span;

use crate::telemetry::ctx::{OpMarker, PhaseSpan};

#[derive(Copy, Clone, Debug)]
pub struct Summarize;

#[derive(Copy, Clone, Debug)]
pub enum Phase { SelectPending, WindowCheck, FetchDocument, Split, MapChunks, Reduce, Persist }

impl PhaseSpan for Phase {
    fn name(&self) -> &'static str { match self {
        Phase::SelectPending => "select_pending",
        Phase::WindowCheck => "window_check",
        Phase::FetchDocument => "fetch_document",
        Phase::Split => "split",
        Phase::MapChunks => "map_chunks",
        Phase::Reduce => "reduce",
        Phase::Persist => "persist",
    }}
    fn span(&self) -> Span { match self {
        Phase::SelectPending => info_span!("select_pending"),
        Phase::WindowCheck => info_span!("window_check"),
        Phase::FetchDocument => info_span!("fetch_document"),
        Phase::Split => info_span!("split"),
        Phase::MapChunks => info_span!("map_chunks"),
        Phase::Reduce => info_span!("reduce"),
        Phase::Persist => info_span!("persist"),
    }}
}

impl OpMarker for Summarize {
    const NAME: &'static str = "summarize";
    type Phase = Phase;
    fn root_span() -> Span { info_span!("summarize") }
}
