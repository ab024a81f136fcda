mod application;
mod cli;
mod domain;
mod infrastructure;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{debug, info, warn};

use application::caption_flow::{generate_caption, CaptionTrigger};
use application::caption_service::{parse_api_keys, CaptionService};
use application::compositor::PolaroidSession;
use cli::{CliOptions, Command, ComposeOptions, ServeOptions};
use domain::filter::StyleParameters;
use infrastructure::axum_handler::{build_router, AppState};
use infrastructure::caption_client::ProxyCaptionClient;
use infrastructure::config::setup_logging;
use infrastructure::font_painter::RustTypePainter;
use infrastructure::gemini_client::GeminiClient;
use infrastructure::image_processor::decode_source;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliOptions::parse();
    setup_logging(cli.debug);

    match cli.command {
        Command::Serve(options) => serve(options).await,
        Command::Compose(options) => compose(options).await,
    }
}

async fn serve(options: ServeOptions) -> anyhow::Result<()> {
    let api_keys = parse_api_keys(options.configured_keys());
    if api_keys.is_empty() {
        warn!("No Gemini API keys configured; caption requests will fail");
    }

    let upstream = GeminiClient::new(&options.upstream_base_url, &options.model);
    let caption_service = CaptionService::new(upstream, api_keys);
    info!(keys = caption_service.key_count(), model = %options.model, "Caption proxy configured");

    let state = Arc::new(AppState { caption_service });
    let app = build_router(state, options.static_dir.as_deref());

    let addr: SocketAddr = format!("{}:{}", options.listen_address, options.port)
        .parse()
        .with_context(|| format!("invalid listen address {}", options.listen_address))?;

    // サーバーの開始
    info!("Listening on http://{}", addr);
    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await
        .context("server error")?;
    Ok(())
}

async fn compose(options: ComposeOptions) -> anyhow::Result<()> {
    let bytes = tokio::fs::read(&options.input)
        .await
        .with_context(|| format!("failed to read {}", options.input.display()))?;
    let source = decode_source(bytes)?;
    let painter = RustTypePainter::load(options.font.as_deref())?;

    let mut session = PolaroidSession::new(Arc::new(painter));
    session.image_loaded(source);
    session.style_changed(StyleParameters::new(options.filter, options.noise));

    if options.auto_caption {
        let client = ProxyCaptionClient::new(&options.proxy_url);
        let trigger = CaptionTrigger::new();
        // 失敗してもフォールバックのキャプションで書き出す
        if let Err(err) = generate_caption(&mut session, &client, &trigger, &options.language).await {
            warn!("Caption generation failed: {}", err);
        }
    } else {
        session.caption_changed(options.caption);
    }

    tokio::fs::create_dir_all(&options.output_dir)
        .await
        .with_context(|| format!("failed to create {}", options.output_dir.display()))?;
    let path = session.export_to(&options.output_dir)?;
    debug!(passes = session.filter_passes(), "Compose finished");
    println!("{}", path.display());
    Ok(())
}
