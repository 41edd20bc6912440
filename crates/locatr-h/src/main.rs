use clap::Parser as ClapParser;
use locatr_engine::LocatrEngine;
use locatr_engine::config::ConfigLoader;
use locatr_engine::providers::{CohereReranker, chat_client_from_env};
use locatr_h::{CdpClient, CdpDomAdapter};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(ClapParser, Debug)]
#[command(author, version, about = "Resolve element descriptions to selectors on a live page", long_about = None)]
struct Args {
    /// Page to open
    #[arg(long)]
    url: String,

    /// Natural-language description of an element; repeat for several
    #[arg(long = "describe", required = true)]
    descriptions: Vec<String>,

    /// Config file (defaults to ./locatr.yaml, then ~/.locatr/config.yaml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Results file, overriding the configured path
    #[arg(long)]
    results: Option<PathBuf>,

    /// Send the full DOM to the model even when a rerank key is available
    #[arg(long)]
    no_rerank: bool,

    /// Show the browser window
    #[arg(long)]
    visible: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => ConfigLoader::load_from(path).await?,
        None => ConfigLoader::load_default().await?,
    };
    if let Some(path) = &args.results {
        config.results_path = path.clone();
    }

    let chat = chat_client_from_env()?;

    let client = CdpClient::launch(args.visible)
        .await
        .map_err(|e| anyhow::anyhow!("{}", e))?;
    client
        .goto(&args.url)
        .await
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    let adapter = Arc::new(CdpDomAdapter::new(client.page.clone()));
    let mut engine = LocatrEngine::new(adapter, chat, config);
    if !args.no_rerank {
        match CohereReranker::from_env() {
            Ok(reranker) => engine = engine.with_reranker(Arc::new(reranker)),
            Err(e) => tracing::info!("Reranking disabled: {}", e),
        }
    }

    let mut failures = 0;
    for description in &args.descriptions {
        match engine.resolve(description).await {
            Ok(locator) => println!("{}\t{}", description, locator),
            Err(e) => {
                failures += 1;
                eprintln!("{}\terror: {}", description, e);
            }
        }
    }

    if let Err(e) = engine.write_results().await {
        tracing::error!("Failed to write results: {}", e);
    }
    client
        .close()
        .await
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    if failures > 0 {
        std::process::exit(1);
    }
    Ok(())
}
