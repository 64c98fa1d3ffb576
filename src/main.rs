use std::env;
use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rewards_ledger::Engine;
use rewards_ledger::Stores;
use rewards_ledger::config::{AppConfig, LogConfig, LogFormat};
use rewards_ledger::csv::{
    CsvError, read_prizes, read_requests, read_tokens, write_balances, write_redemptions,
};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn init_logging(config: &LogConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match config.format {
        LogFormat::Pretty => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

/// Collect the readable rows of a seed file, warning about the others.
fn seed_rows<T>(
    path: &Path,
    rows: Result<impl Iterator<Item = Result<T, CsvError>>, CsvError>,
) -> Result<Vec<T>> {
    let rows = rows.with_context(|| format!("reading seed file {}", path.display()))?;
    Ok(rows
        .filter_map(|row| row.map_err(|e| warn!(file = %path.display(), "{e}")).ok())
        .collect())
}

async fn seed(engine: &Engine, config: &AppConfig) -> Result<()> {
    if let Some(path) = &config.seed.prizes {
        let prizes = seed_rows(path, read_prizes(path))?;
        let added = engine.load_prizes(prizes).await;
        info!(added, "prizes loaded");
    }
    if let Some(path) = &config.seed.codes {
        let codes = seed_rows(path, read_tokens(path))?;
        let added = engine.load_codes(codes).await;
        info!(added, "redemption codes loaded");
    }
    if let Some(path) = &config.seed.tickets {
        let tickets = seed_rows(path, read_tokens(path))?;
        let added = engine.load_tickets(tickets).await;
        info!(added, "draw tickets loaded");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let mut args = env::args().skip(1);
    let path = PathBuf::from(
        args.next()
            .context("usage: rewards-ledger <requests.csv> [config.toml]")?,
    );
    let config_path = args.next().map(PathBuf::from);

    let config = AppConfig::load(config_path.as_deref()).context("loading configuration")?;
    init_logging(&config.log);

    if path.extension().is_none_or(|ext| ext != "csv") {
        warn!(path = %path.display(), "input file seems to not be a csv file");
    }

    let engine = Engine::new(Stores::in_memory(), config.policy.clone());
    seed(&engine, &config).await?;

    let requests = read_requests(path.clone())
        .with_context(|| format!("reading requests from {}", path.display()))?;
    let (request_sender, request_receiver) = tokio::sync::mpsc::channel(16);

    let reader = tokio::spawn(async move {
        for result in requests {
            match result {
                Ok(request) => {
                    if request_sender.send(request).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!("{e}");
                }
            }
        }
    });

    let stats = engine.run(ReceiverStream::new(request_receiver)).await;
    reader.await.context("request reader task failed")?;
    info!(applied = stats.applied, skipped = stats.skipped, "requests processed");

    let balances = engine.balances().await?;
    write_balances(std::io::stdout().lock(), &balances)?;

    if let Some(out) = &config.output.redemptions {
        let file = File::create(out)
            .with_context(|| format!("creating redemption output {}", out.display()))?;
        write_redemptions(file, &engine.redemptions().await?)?;
    }

    Ok(())
}
