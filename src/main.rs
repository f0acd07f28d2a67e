use buttonlamp::mqtt::MqttReporter;
use buttonlamp::{AppConfig, PipelineHandle, PipelineParts};
use color_eyre::{eyre::eyre, Result};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;

    let config = AppConfig::load()
        .await
        .map_err(|e| eyre!("Failed to load configuration: {}", e))?;

    let cancel = CancellationToken::new();

    // Peripheral setup failures are fatal
    let mut parts = PipelineParts::from_config(&config)
        .map_err(|e| eyre!("Failed to open devices: {}", e))?;

    let reporter = if config.mqtt.enabled {
        let (report_sender, reporter_handle) =
            MqttReporter::spawn(&config.mqtt, cancel.child_token())
                .map_err(|e| eyre!("Failed to start MQTT reporter: {}", e))?;
        parts = parts.with_reporter(report_sender);
        Some(reporter_handle)
    } else {
        info!("MQTT reporting disabled");
        None
    };

    let pipeline = PipelineHandle::spawn(&config, parts, cancel.clone())
        .map_err(|e| eyre!("Failed to start pipeline: {}", e))?;

    info!("Press Ctrl+C to stop");
    tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                warn!("Failed to listen for Ctrl+C: {}", e);
            }
        }
        _ = pipeline.stopped() => warn!("Button pipeline stopped on its own"),
    }

    pipeline.shutdown();
    let report = pipeline.join().await?;
    info!(
        "Sampled {} times, {} events, {} dropped, {} alerts",
        report.sampler.samples, report.sampler.events, report.sampler.dropped, report.consumer.alerts
    );

    if let Some(reporter_handle) = reporter {
        let published = reporter_handle.join().await?;
        info!("Published {} MQTT reports", published);
    }

    Ok(())
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env();
    Ok(())
}

fn setup_logging_env() {
    let level = std::env::var("RUST_LOG")
        .ok()
        .and_then(|value| value.parse::<Level>().ok())
        .unwrap_or(Level::INFO);

    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}
