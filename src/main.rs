use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use futures::StreamExt;
use secrecy::ExposeSecret;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing_subscriber::EnvFilter;

use filewright::bot::{decode_update, Controller, SessionStore};
use filewright::config::Config;
use filewright::gateway::TelegramGateway;
use filewright::jobs::JobRunner;
use filewright::notify::TelegramNotifier;
use filewright::server::WebhookServer;
use filewright::telegram::TelegramApi;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env().context("loading configuration")?;

    tokio::fs::create_dir_all(&config.temp_dir)
        .await
        .with_context(|| format!("creating temp dir {}", config.temp_dir.display()))?;

    let api = Arc::new(TelegramApi::new(config.bot_token.clone()));
    let notifier = Arc::new(TelegramNotifier::new(Arc::clone(&api)));
    let gateway = Arc::new(TelegramGateway::new(
        Arc::clone(&api),
        config.temp_dir.clone(),
    ));
    let jobs = JobRunner::new(notifier.clone(), config.temp_dir.clone());
    let controller = Controller::new(
        SessionStore::new(),
        gateway,
        notifier,
        jobs.clone(),
        config.max_file_size,
    );

    let (tx, rx) = mpsc::channel(64);
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let mut server = WebhookServer::new(addr, config.bot_token.expose_secret().to_string(), tx);
    server.start().await.context("starting webhook server")?;

    let webhook_url = format!(
        "{}/webhook/{}",
        config.public_url,
        config.bot_token.expose_secret()
    );
    api.set_webhook(&webhook_url).await.context("registering webhook")?;
    tracing::info!(port = config.port, "bot is up");

    // Events are handled one at a time so each chat's state transitions stay
    // ordered; the conversions themselves run on spawned tasks.
    let mut updates = ReceiverStream::new(rx);
    loop {
        tokio::select! {
            maybe_update = updates.next() => {
                match maybe_update {
                    Some(update) => {
                        if let Some(inbound) = decode_update(update) {
                            controller.dispatch(inbound).await;
                        }
                    }
                    None => break,
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutdown signal received");
                break;
            }
        }
    }

    server.shutdown().await;
    jobs.join_all().await;
    tracing::info!("bye");
    Ok(())
}
