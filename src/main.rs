use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use serde::Serialize;
use std::env;

mod extract;
mod init;
mod ingestion;
mod llm;
mod parsing;
mod store;
mod summarize;
mod telemetry;
mod util;

#[derive(Parser)]
#[command(name = "disclosures", about = "Exchange disclosure feed ingestion and summarization")]
struct Cli {
    #[arg(global = true, short, long)]
    dsn: Option<String>,
    /// Emit a single JSON envelope to stdout; logs go to stderr
    #[arg(global = true, long, default_value_t = false)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the per-category tables
    Init(init::InitCmd),
    /// Fetch every feed and store new records
    Ingest(ingestion::IngestCmd),
    /// Summarize pending documents inside the processing window
    Summarize(summarize::SummarizeCmd),
    /// List the feed catalog
    Categories,
}

#[derive(Serialize)]
struct CategoryRow { category: parsing::Category, name: &'static str, table: &'static str, feed_url: &'static str, summary_url_column: &'static str }

fn list_categories() -> Result<()> {
    let rows: Vec<CategoryRow> = parsing::catalog::all()
        .iter()
        .map(|s| CategoryRow { category: s.category, name: s.name, table: s.table, feed_url: s.feed_url, summary_url_column: s.summary_url_column })
        .collect();
    if telemetry::config::json_mode() {
        telemetry::emit::print_result("categories", &rows)?;
    } else {
        for r in &rows {
            println!("{:<28} {:<32} {:<10} {}", serde_json::to_value(r.category)?.as_str().unwrap_or_default(), r.table, r.summary_url_column, r.feed_url);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let cli = Cli::parse();
    telemetry::config::set_json_mode(cli.json);

    // logs go to stderr; RUST_LOG and DISCLOSURE_LOG_FORMAT apply
    telemetry::config::init_tracing();

    if let Commands::Categories = cli.command {
        return list_categories();
    }

    let dsn = cli
        .dsn
        .or_else(|| env::var("DATABASE_URL").ok())
        .context("Please provide --dsn or set DATABASE_URL in .env")?;
    let store = store::PgStore::connect(&dsn, 5).await?;

    match cli.command {
        Commands::Init(args) => init::run(store.pool(), args).await?,
        Commands::Ingest(args) => ingestion::run(&store, args).await?,
        Commands::Summarize(args) => summarize::run(&store, args).await?,
        Commands::Categories => {}
    }

    Ok(())
}
