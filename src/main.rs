//! bwiize-proxy: backend proxy for the B-wiize learning app.

mod config;
mod error;
mod proxy;

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "bwiize-proxy", about = "TTS relay and video lookup for B-wiize")]
struct Args {
    /// Path to config.yaml
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listen host
    #[arg(long)]
    host: Option<String>,

    /// Override the listen port
    #[arg(short, long)]
    port: Option<u16>,

    /// Enable verbose (debug) logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Initialize logging (suppress noisy HTTP internals)
    let filter = if args.verbose {
        EnvFilter::new("debug,hyper=info,reqwest=info")
    } else {
        EnvFilter::new("info,hyper=warn,reqwest=warn")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("bwiize-proxy starting");

    let mut config = config::Config::load(args.config.as_deref());
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    info!("TTS endpoint: {}", config.tts.endpoint);

    let tts = Arc::new(proxy::tts::TtsClient::new(&config.tts)?);
    let video = if config.video.enabled {
        info!("Video lookup enabled via {}", config.video.api_base);
        Some(Arc::new(proxy::video::VideoResolver::new(&config.video)?))
    } else {
        info!("Video lookup disabled");
        None
    };

    let state = proxy::api::ProxyState { tts, video };
    let app = proxy::api::router(state, &config.server.cors_origins);
    proxy::api::serve(app, &config.bind_addr()).await?;

    info!("bwiize-proxy stopped");
    Ok(())
}
