use std::net::SocketAddr;
use std::sync::Arc;

use rusqlite::Connection;
use tokio::sync::watch;
use tracing::{info, warn};

mod app;
mod error;
mod http;
mod live_model;
mod version;
mod ws;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "skynet_gateway=info,tower_http=debug".into()),
        )
        .init();

    let config_path = std::env::var("VOXA_CONFIG").ok();
    let config = skynet_core::config::VoxaConfig::load(config_path.as_deref()).unwrap_or_else(|e| {
        warn!("config load failed ({e}), using defaults");
        skynet_core::config::VoxaConfig::default()
    });

    if let Some(parent) = std::path::Path::new(&config.database.path).parent() {
        std::fs::create_dir_all(parent)?;
    }

    let tasks = Arc::new(skynet_tasks::TaskStoreClient::new(
        skynet_tasks::TaskStore::new(Connection::open(&config.database.path)?)?,
        Arc::new(skynet_sessions::SessionManager::new(Connection::open(&config.database.path)?)?),
        Arc::new(skynet_users::UserResolver::new(Connection::open(&config.database.path)?)?),
    ));

    let scheduler = Arc::new(skynet_scheduler::SchedulerHandle::new(Connection::open(&config.database.path)?)?);
    let engine_conn = Connection::open(&config.database.path)?;

    let provider: Arc<dyn skynet_agent::LlmProvider> = match config.provider.kind.as_str() {
        "openai" => Arc::new(skynet_agent::openai::OpenAiProvider::new(
            config.provider.api_key.clone().unwrap_or_default(),
            config.provider.base_url.clone(),
        )),
        "ollama" => Arc::new(skynet_agent::ollama::OllamaProvider::new(config.provider.base_url.clone())),
        _ => Arc::new(skynet_agent::anthropic::AnthropicProvider::new(
            config.provider.api_key.clone().unwrap_or_default(),
            config.provider.base_url.clone(),
        )),
    };

    let mut channels = skynet_channels::ChannelManager::new();
    channels.register(Arc::new(skynet_channels::DeviceChannel::new(&config.device_channel)));
    let channels = Arc::new(channels);
    channels.connect_all().await;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (fired_tx, fired_rx) = tokio::sync::mpsc::channel(256);

    let engine = skynet_scheduler::SchedulerEngine::new(engine_conn, Some(fired_tx))?;
    tokio::spawn(engine.run(shutdown_rx.clone()));

    let dispatcher = skynet_scheduler::DispatcherConsumer::new(
        tasks.clone(),
        channels.get("device").expect("device channel registered above"),
        &config.dispatcher,
    );
    tokio::spawn(dispatcher.run(fired_rx, scheduler.clone()));

    let bind = config.gateway.bind.clone();
    let port = config.gateway.port;
    let state = Arc::new(app::AppState::new(config, tasks, scheduler, provider, channels));
    let router = app::build_router(state);

    let addr: SocketAddr = format!("{bind}:{port}").parse()?;
    info!("skynet gateway listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let result = axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await;
    let _ = shutdown_tx.send(true);
    result?;

    Ok(())
}
