//! Collection commands: wire the dataset, the broker and the scheduler
//! together from [`AppConfig`].

use std::path::PathBuf;
use std::sync::Arc;

use mdc_collector::{BatchCoordinator, Scheduler};
use mdc_core::AppConfig;
use mdc_dataset::{CsvDataset, RecordSource};
use mdc_queue::{AmqpClient, RecordPublisher};
use tokio_util::sync::CancellationToken;

/// Applies command-line overrides on top of the environment config.
pub(crate) fn apply_overrides(
    config: &mut AppConfig,
    interval_hours: Option<u32>,
    dataset: Option<PathBuf>,
) {
    if let Some(hours) = interval_hours {
        config.scheduler_interval = mdc_core::interval_from_hours(hours);
    }
    if let Some(path) = dataset {
        config.dataset_path = path;
    }
}

async fn connect_publisher(config: &AppConfig) -> anyhow::Result<(Arc<AmqpClient>, RecordPublisher)> {
    let client = Arc::new(AmqpClient::connect(&config.rabbitmq_url).await?);
    client.declare_queue(&config.data_queue_name).await?;
    let publisher = RecordPublisher::new(Arc::clone(&client), config.data_queue_name.clone());
    Ok((client, publisher))
}

async fn close_client(client: &AmqpClient) {
    if let Err(e) = client.close().await {
        tracing::warn!(error = %e, "failed to close RabbitMQ connection");
    }
}

/// Runs the scheduler until SIGINT/SIGTERM, then waits for the in-flight
/// pass before closing the broker connection.
pub(crate) async fn run_schedule(config: &AppConfig) -> anyhow::Result<()> {
    let (client, publisher) = connect_publisher(config).await?;
    let coordinator = BatchCoordinator::new(CsvDataset::new(&config.dataset_path), publisher);

    tracing::info!(
        interval = ?config.scheduler_interval,
        dataset = %config.dataset_path.display(),
        queue = %coordinator.publisher().queue(),
        "starting data collector scheduler"
    );
    let handle = Scheduler::new(coordinator, config.scheduler_interval)
        .spawn(CancellationToken::new());

    shutdown_signal().await;
    let report = handle.shutdown().await?;
    tracing::info!(
        passes = report.passes,
        failed_passes = report.failed_passes,
        records_published = report.records_published,
        publish_failures = report.publish_failures,
        "scheduler stopped"
    );

    close_client(&client).await;
    Ok(())
}

/// Runs a single pass and fails if any record could not be published.
pub(crate) async fn run_once(config: &AppConfig) -> anyhow::Result<()> {
    let (client, publisher) = connect_publisher(config).await?;
    let coordinator = BatchCoordinator::new(CsvDataset::new(&config.dataset_path), publisher);

    let outcome = coordinator.run_once().await;
    close_client(&client).await;

    let result = outcome?;
    if !result.is_complete() {
        anyhow::bail!(
            "{} of {} records failed to publish",
            result.failed(),
            result.attempted
        );
    }
    println!("published {} records", result.succeeded);
    Ok(())
}

/// Reads the dataset without touching the broker.
pub(crate) fn run_check(config: &AppConfig) -> anyhow::Result<()> {
    let records = CsvDataset::new(&config.dataset_path).read()?;
    println!(
        "{}: {} records",
        config.dataset_path.display(),
        records.len()
    );
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

    tracing::info!("received shutdown signal, stopping scheduler");
}
