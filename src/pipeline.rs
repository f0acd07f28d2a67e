//! Pipeline Handle - wiring and lifecycle of the button pipeline
//!
//! Builds the driver backends from configuration, creates the bounded event
//! channel and spawns the sampler and consumer tasks. Nothing is global: every
//! component receives its half of the channel and its device by value.

use crate::config::{AppConfig, InputBackend, OutputBackend};
use crate::hal::{
    ConsoleStrip, DeviceError, GpioButton, GpioLed, InputSource, MonotonicClock, PixelDevice,
    ScriptedInput, TickSource,
};
use crate::input::{event_channel, ChannelError, InputSampler, SamplerError, SamplerStats};
use crate::mqtt::ReportSender;
use crate::output::{ConsumerError, ConsumerStats, EventConsumer};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Errors that can occur while building or running the pipeline
///
/// Aggregates the component errors so `main` can report them uniformly.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// A driver backend could not be opened
    #[error("Device error: {0}")]
    DeviceError(#[from] DeviceError),

    /// The event channel could not be created
    #[error("Channel error: {0}")]
    ChannelError(#[from] ChannelError),

    #[error("Sampler error: {0}")]
    SamplerError(#[from] SamplerError),

    #[error("Consumer error: {0}")]
    ConsumerError(#[from] ConsumerError),

    /// A spawned task panicked or was aborted
    #[error("Task error: {0}")]
    TaskError(String),
}

/// Driver backends and collaborators handed to the pipeline
///
/// Tests and simulations build this directly; the binary uses
/// [`PipelineParts::from_config`].
pub struct PipelineParts {
    pub input: Box<dyn InputSource>,
    pub device: Box<dyn PixelDevice>,
    pub clock: Arc<dyn TickSource>,
    pub reporter: Option<ReportSender>,
}

impl PipelineParts {
    /// Opens the backends selected in the configuration
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::DeviceError`] if a GPIO pin cannot be claimed or
    /// the input script does not parse. These are fatal at startup.
    pub fn from_config(config: &AppConfig) -> Result<Self, PipelineError> {
        let input: Box<dyn InputSource> = match config.input.backend {
            InputBackend::Gpio => Box::new(GpioButton::open(config.input.gpio_pin)?),
            InputBackend::Scripted => {
                info!("Using scripted input instead of a GPIO button");
                Box::new(ScriptedInput::from_pattern(
                    &config.input.script,
                    config.input.script_repeat,
                )?)
            }
        };

        let device: Box<dyn PixelDevice> = match config.output.backend {
            OutputBackend::Console => Box::new(ConsoleStrip::new(config.output.led_count)),
            OutputBackend::GpioLed => Box::new(GpioLed::open(
                config.output.led_gpio_pin,
                config.output.led_count,
            )?),
        };

        let clock: Arc<dyn TickSource> = Arc::new(MonotonicClock::new(Duration::from_millis(
            config.input.tick_ms,
        )));

        Ok(Self {
            input,
            device,
            clock,
            reporter: None,
        })
    }

    pub fn with_reporter(mut self, reporter: ReportSender) -> Self {
        self.reporter = Some(reporter);
        self
    }
}

/// Final counters of both tasks
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PipelineReport {
    pub sampler: SamplerStats,
    pub consumer: ConsumerStats,
}

/// Handle for the running sampler and consumer tasks
///
/// # Threading Model
///
/// Spawns two independent tokio tasks:
/// 1. **Sampler task**: polls the input on a fixed period and sends events
/// 2. **Consumer task**: waits for events with a timeout and drives the strip
///
/// Both observe the same cancellation token at every suspension point. A task
/// that exits on its own, by error or panic, cancels the token on its way out
/// so the other one follows.
pub struct PipelineHandle {
    cancel: CancellationToken,
    sampler_task: JoinHandle<Result<SamplerStats, SamplerError>>,
    consumer_task: JoinHandle<Result<ConsumerStats, ConsumerError>>,
}

impl PipelineHandle {
    /// Spawns the complete pipeline
    ///
    /// # Architecture Setup
    ///
    /// 1. **Settings Distribution**: splits the config into sampler and consumer settings
    /// 2. **Channel Creation**: bounded channel with the configured capacity and policy
    /// 3. **Consumer Spawn**: blanks the strip and starts waiting for events
    /// 4. **Sampler Spawn**: starts polling the input
    ///
    /// ```text
    /// InputSampler ─[ButtonEvent]→ EventConsumer ─[ButtonEvent]→ MQTT reporter
    ///               (event_channel)                (ReportSender, optional)
    /// ```
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(
        config: &AppConfig,
        parts: PipelineParts,
        cancel: CancellationToken,
    ) -> Result<Self, PipelineError> {
        info!(
            "Initializing button pipeline: {} ms sampling, capacity {} ({:?}), {} ms hold timeout",
            config.input.sample_interval_ms,
            config.channel.capacity,
            config.channel.overflow,
            config.output.hold_timeout_ms
        );

        let sampler_settings = config.sampler_settings();
        let consumer_settings = config.consumer_settings();
        debug!(
            "Split settings: sampler={:?}, consumer={:?}",
            sampler_settings, consumer_settings
        );

        let (event_sender, event_receiver) =
            event_channel(config.channel.capacity, config.channel.overflow)?;

        info!("Creating Event Consumer");
        let consumer = EventConsumer::create(
            event_receiver,
            parts.device,
            Some(consumer_settings),
            parts.reporter,
        )?
        .initialize()?;

        info!("Creating Input Sampler");
        let sampler =
            InputSampler::create(parts.input, parts.clock, event_sender, Some(sampler_settings))?
                .initialize();

        let consumer_guard = cancel.clone().drop_guard();
        let consumer_cancel = cancel.clone();
        let consumer_task = tokio::spawn(async move {
            let _stop_pipeline = consumer_guard;
            consumer.run_consume_loop(consumer_cancel).await
        });

        let sampler_guard = cancel.clone().drop_guard();
        let sampler_cancel = cancel.clone();
        let sampler_task = tokio::spawn(async move {
            let _stop_pipeline = sampler_guard;
            sampler.run_sampling_loop(sampler_cancel).await
        });

        info!("Button pipeline started");
        Ok(Self {
            cancel,
            sampler_task,
            consumer_task,
        })
    }

    /// Asks both tasks to stop at their next suspension point
    pub fn shutdown(&self) {
        info!("Shutting down button pipeline");
        self.cancel.cancel();
    }

    /// Resolves once shutdown was requested or either task has exited
    pub async fn stopped(&self) {
        self.cancel.cancelled().await
    }

    /// Waits for both tasks to finish
    pub async fn join(self) -> Result<PipelineReport, PipelineError> {
        let sampler = self
            .sampler_task
            .await
            .map_err(|e| PipelineError::TaskError(e.to_string()))?;
        let consumer = self
            .consumer_task
            .await
            .map_err(|e| PipelineError::TaskError(e.to_string()))?;

        let report = PipelineReport {
            sampler: sampler.inspect_err(|e| error!("Sampler failed: {}", e))?,
            consumer: consumer.inspect_err(|e| error!("Consumer failed: {}", e))?,
        };
        info!("Button pipeline finished: {:?}", report);
        Ok(report)
    }
}
