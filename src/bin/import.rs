//! gmdesk_import - load documents into a gmdesk database
//!
//! Reads a JSON object mapping document paths to their fields and writes all
//! of them in one batch.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use gmdesk::store::{DocPath, DocumentGateway, SqliteGateway, WriteOp};
use serde_json::Value;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// gmdesk document import tool
#[derive(Parser, Debug)]
#[command(
    name = "gmdesk_import",
    version,
    about = "Load a JSON fixture of documents into a gmdesk database"
)]
struct Args {
    /// Path to the SQLite database file (created if missing)
    #[arg(short, long)]
    database: PathBuf,

    /// JSON files of `{ "collection/doc": { fields } }` (can be repeated)
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

fn read_fixture(path: &Path) -> Result<Vec<WriteOp>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let root: serde_json::Map<String, Value> = serde_json::from_str(&text)
        .with_context(|| format!("Invalid JSON in {}", path.display()))?;

    let mut ops = Vec::with_capacity(root.len());
    for (key, value) in root {
        let doc = DocPath::parse(&key).with_context(|| format!("Invalid document path {}", key))?;
        let Value::Object(fields) = value else {
            bail!("Document {} in {} is not an object", key, path.display());
        };
        ops.push(WriteOp::Set { path: doc, fields });
    }
    Ok(ops)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gmdesk=info,gmdesk_import=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let mut ops = Vec::new();
    for file in &args.files {
        if !file.exists() {
            bail!("Fixture file not found: {}", file.display());
        }
        ops.extend(read_fixture(file)?);
    }

    let database = args
        .database
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("Invalid database path: {}", args.database.display()))?;
    let gateway = SqliteGateway::open(Some(database)).await?;

    let count = ops.len();
    gateway.batch(ops).await?;

    info!("Imported {} documents into {}", count, args.database.display());
    Ok(())
}
