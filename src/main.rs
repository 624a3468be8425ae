use anyhow::{Context, Result};
use clap::Parser;
use lakeload::catalog::{discover_sources, SourceFile};
use lakeload::config::{LoaderConfig, ENV_ENGINE_PASSWORD, ENV_ENGINE_USER};
use lakeload::materialize::{plan_statements, LoadOptions, MaterializationTask, Materializer};
use lakeload::remote::{HttpTransport, JobClient};
use lakeload::table::read_table;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "lakeload")]
#[command(about = "Load staged tabular files into remote SQL engine tables")]
struct Args {
    /// Folder holding the staged files (or set DATA_FOLDER)
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Namespace the tables are created in (or set TARGET_NAMESPACE)
    #[arg(short, long)]
    namespace: Option<String>,

    /// Rows per INSERT statement (or set LOAD_BATCH_SIZE)
    #[arg(short, long)]
    batch_size: Option<NonZeroUsize>,

    /// Only load files with this stem; may be repeated
    #[arg(short, long = "table")]
    tables: Vec<String>,

    /// Print the statements instead of submitting them
    #[arg(long)]
    dry_run: bool,

    /// Also write the JSON run report to this file
    #[arg(long)]
    report: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let loaded = if args.dry_run {
        // credentials are never used by a dry run
        LoaderConfig::from_lookup(|key| {
            std::env::var(key).ok().or_else(|| match key {
                ENV_ENGINE_USER | ENV_ENGINE_PASSWORD => Some("dry-run".to_string()),
                _ => None,
            })
        })
    } else {
        LoaderConfig::from_env()
    };
    let mut config = loaded.context("Invalid configuration")?;

    if let Some(dir) = args.data_dir {
        config.data_dir = dir;
    }
    if let Some(namespace) = args.namespace {
        config.namespace = namespace;
    }
    if let Some(batch_size) = args.batch_size {
        config.batch_size = batch_size;
    }

    let sources: Vec<SourceFile> = discover_sources(&config.data_dir, &config.namespace)
        .with_context(|| format!("Cannot list {}", config.data_dir.display()))?
        .into_iter()
        .filter(|s| args.tables.is_empty() || args.tables.iter().any(|t| t == s.stem()))
        .collect();

    if sources.is_empty() {
        warn!("No loadable files in {}", config.data_dir.display());
    }

    if args.dry_run {
        for source in &sources {
            let planned = read_table(&source.path)
                .map_err(|e| format!("read failed: {}", e))
                .and_then(|table| {
                    plan_statements(&source.target, &table, config.batch_size)
                        .map_err(|e| e.to_string())
                });
            match planned {
                Ok(statements) => {
                    for sql in statements {
                        println!("{};", sql);
                    }
                }
                Err(reason) => error!("{}: {}", source.path.display(), reason),
            }
        }
        return Ok(());
    }

    info!(
        "Loading {} files from {} into {} at {}",
        sources.len(),
        config.data_dir.display(),
        config.namespace,
        config.engine.base_url()
    );

    let transport = HttpTransport::new(&config.engine)?;
    let materializer = Materializer::new(
        JobClient::new(transport),
        LoadOptions::new(config.batch_size, config.poll),
    );
    let tasks = sources.into_iter().map(MaterializationTask::from).collect();
    let report = materializer.run(&config.credentials, tasks).await?;

    println!("\n=== Load Results ===");
    for table in &report.tables {
        match &table.reason {
            None => println!(
                "created  {}  {}/{} rows",
                table.table_name, table.rows_inserted, table.rows_attempted
            ),
            Some(reason) => println!("failed   {}  {}", table.table_name, reason),
        }
    }

    let json = serde_json::to_string_pretty(&report)?;
    match args.report {
        Some(path) => {
            std::fs::write(&path, json)
                .with_context(|| format!("Cannot write report to {}", path.display()))?;
            info!("Report written to {}", path.display());
        }
        None => println!("{}", json),
    }

    Ok(())
}
