use tracing::{info_span, Span};

use crate::telemetry::ctx::{OpMarker, PhaseSpan};

/// Schema bootstrap for the per-category disclosure tables.
#[derive(Copy, Clone, Debug)]
pub struct Init;

#[derive(Copy, Clone, Debug)]
pub enum Phase {
    /// Report pending migrations without touching the database.
    SchemaPlan,
    /// Run the embedded migrator.
    ApplyMigrations,
}

impl PhaseSpan for Phase {
    fn name(&self) -> &'static str {
        match self {
            Phase::SchemaPlan => "schema_plan",
            Phase::ApplyMigrations => "apply_migrations",
        }
    }

    fn span(&self) -> Span {
        match self {
            Phase::SchemaPlan => info_span!("schema_plan"),
            Phase::ApplyMigrations => info_span!("apply_migrations"),
        }
    }
}

impl OpMarker for Init {
    const NAME: &'static str = "init";
    type Phase = Phase;
    fn root_span() -> Span { info_span!("init", tables = crate::parsing::catalog::all().len()) }
}
