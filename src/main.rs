use anyhow::{Context, Result};
use bibsolr::jobs::{JobOptions, LogProgress, RecordRange};
use bibsolr::service::{IndexingService, build_synchronizer};
use bibsolr::solr::SolrClient;
use bibsolr::{api, config, logging};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

#[derive(Parser)]
#[command(name = "bibsolr", version, about = "Synchronize bibliographic records into Solr")]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Index records into Solr and exit.
    Index {
        /// Record ranges such as `1-100,250`; every record when omitted.
        #[arg(long = "id", value_name = "RANGES")]
        ranges: Option<String>,
        /// Records submitted between two commits.
        #[arg(long, value_name = "N")]
        flush: Option<usize>,
        /// JSON Lines record export (overrides RECORDS_PATH).
        #[arg(long, value_name = "PATH")]
        records: Option<PathBuf>,
        /// Directory of `<recid>.txt` attachments (overrides FULLTEXT_DIR).
        #[arg(long, value_name = "DIR")]
        fulltext_dir: Option<PathBuf>,
    },
    /// Serve the HTTP control surface.
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_tracing(if cli.verbose { "debug" } else { "info" });
    let config = config::init_config().context("Failed to load configuration")?;

    match cli.command {
        Command::Index {
            ranges,
            flush,
            records,
            fulltext_dir,
        } => {
            let ranges = ranges
                .as_deref()
                .map(RecordRange::parse_list)
                .transpose()
                .context("Invalid --id value")?
                .unwrap_or_default();
            let options = JobOptions {
                flush: flush.unwrap_or(config.flush_size),
                ranges,
            };
            let records = records.unwrap_or_else(|| config.records_path.clone());
            let fulltext_dir = fulltext_dir.or_else(|| config.fulltext_dir.clone());
            run_index(&config.solr_url, &records, fulltext_dir, &options).await
        }
        Command::Serve => serve(config).await,
    }
}

async fn run_index(
    solr_url: &str,
    records: &std::path::Path,
    fulltext_dir: Option<PathBuf>,
    options: &JobOptions,
) -> Result<()> {
    let solr = Arc::new(SolrClient::new(solr_url).context("Failed to create Solr client")?);
    let synchronizer = build_synchronizer(records, fulltext_dir.as_deref(), solr)
        .await
        .with_context(|| format!("Failed to load records from {}", records.display()))?;
    let summary = synchronizer
        .run_job(options, &LogProgress)
        .await
        .context("Indexing run failed")?;
    tracing::info!(
        visited = summary.visited,
        submitted = summary.submitted,
        skipped = summary.skipped,
        field_failures = summary.field_failures,
        commits = summary.commits,
        "Indexing finished"
    );
    Ok(())
}

async fn serve(config: &config::Config) -> Result<()> {
    let solr = Arc::new(SolrClient::new(&config.solr_url).context("Failed to create Solr client")?);
    let synchronizer = build_synchronizer(
        &config.records_path,
        config.fulltext_dir.as_deref(),
        Arc::clone(&solr),
    )
    .await
    .context("Failed to load records")?;
    let app = api::create_router(Arc::new(IndexingService::new(synchronizer, solr)));

    let (listener, port) = bind_listener(config.server_port)
        .await
        .context("Failed to bind listener")?;
    tracing::info!("Listening on http://0.0.0.0:{}", port);
    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}

async fn bind_listener(server_port: Option<u16>) -> Result<(TcpListener, u16), std::io::Error> {
    use std::net::Ipv4Addr;

    if let Some(port) = server_port {
        return TcpListener::bind((Ipv4Addr::UNSPECIFIED, port))
            .await
            .map(|listener| (listener, port));
    }

    const PORT_RANGE: std::ops::RangeInclusive<u16> = 4200..=4299;
    for port in PORT_RANGE {
        match TcpListener::bind((Ipv4Addr::UNSPECIFIED, port)).await {
            Ok(listener) => {
                tracing::debug!(port, "Bound server port");
                return Ok((listener, port));
            }
            Err(err) if err.kind() == std::io::ErrorKind::AddrInUse => {
                tracing::debug!(port, "Port already in use; trying next");
                continue;
            }
            Err(err) => return Err(err),
        }
    }

    Err(std::io::Error::new(
        std::io::ErrorKind::AddrNotAvailable,
        "No available port found in range 4200-4299",
    ))
}
