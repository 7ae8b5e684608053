use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use sqlx::PgPool;
use tracing::Instrument;

use crate::parsing::catalog;
use crate::telemetry::{self, ops::init::Phase as InitPhase};

#[derive(Args)]
pub struct InitCmd {
    #[arg(long, default_value_t = false)]
    pub apply: bool,
}

#[derive(Serialize)]
struct InitPlan { migrations: usize, tables: Vec<&'static str> }

#[derive(Serialize)]
struct InitResult { applied: bool, tables: usize }

pub async fn run(pool: &PgPool, args: InitCmd) -> Result<()> {
    let log = telemetry::init();
    let _g = log.root_span_kv([("apply", args.apply.to_string())]).entered();
    let migrator = sqlx::migrate!();
    let tables: Vec<&'static str> = catalog::all().iter().map(|s| s.table).collect();

    if !args.apply {
        let _s = log.span(&InitPhase::SchemaPlan).entered();
        if telemetry::config::json_mode() {
            log.plan(&InitPlan { migrations: migrator.iter().count(), tables })?;
        } else {
            log.info(format!("📝 Init plan — migrations={} tables={}", migrator.iter().count(), tables.len()));
            log.info("   Use --apply to execute.");
        }
        return Ok(());
    }

    // idempotent: already-applied migrations are skipped
    migrator
        .run(pool)
        .instrument(log.span_kv(&InitPhase::ApplyMigrations, [("migrations", migrator.iter().count().to_string())]))
        .await
        .context("apply migrations")?;
    log.info(format!("✅ Database initialized ({} tables)", tables.len()));
    if telemetry::config::json_mode() {
        log.result(&InitResult { applied: true, tables: tables.len() })?;
    }
    Ok(())
}
