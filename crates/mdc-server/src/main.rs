mod api;
mod middleware;
mod sink;

use std::sync::Arc;
use std::time::Duration;

use mdc_queue::AmqpClient;
use tracing_subscriber::EnvFilter;

use crate::api::{build_app, AppState};
use crate::sink::PgRabbitSink;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Arc::new(mdc_core::load_app_config_from_env()?);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    tracing::info!(env = %config.env, bind_addr = %config.bind_addr, "starting collector api");

    let pool = mdc_db::connect_pool_from_config(&config).await?;
    let applied = mdc_db::run_migrations(&pool).await?;
    tracing::info!(applied, "migrations up to date");

    let client = Arc::new(AmqpClient::connect(&config.rabbitmq_url).await?);
    client.declare_queue(&config.raw_data_queue_name).await?;

    let sink = PgRabbitSink::new(
        pool.clone(),
        Arc::clone(&client),
        config.raw_data_queue_name.clone(),
    );
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.source_request_timeout_secs))
        .build()?;
    let state = AppState::new(
        Arc::new(sink),
        http,
        Duration::from_secs(config.persist_timeout_secs),
    );
    let app = build_app(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Err(e) = client.close().await {
        tracing::warn!(error = %e, "failed to close RabbitMQ connection");
    }
    pool.close().await;
    tracing::info!("collector api stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
