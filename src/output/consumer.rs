use crate::hal::{DeviceError, PixelDevice, Rgb};
use crate::input::{ButtonEvent, ButtonEventKind, ChannelError, EventReceiver, Received};
use crate::mqtt::ReportSender;
use statum::{machine, state};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

// Consumer settings
#[derive(Clone, Debug)]
pub struct ConsumerSettings {
    /// How long to wait for an event before the timeout branch runs
    pub hold_timeout_ms: u64,
    /// Delay between two steps of the alert sweep
    pub alert_step_ms: u64,
    pub active_color: Rgb,
    pub alert_color: Rgb,
    pub stats_interval_secs: u64,
}

impl Default for ConsumerSettings {
    fn default() -> Self {
        Self {
            hold_timeout_ms: 3000,
            alert_step_ms: 50,
            active_color: Rgb::new(0, 50, 0),
            alert_color: Rgb::new(50, 0, 0),
            stats_interval_secs: 60,
        }
    }
}

// Consumer errors
#[derive(Debug, thiserror::Error)]
pub enum ConsumerError {
    #[error("Failed to initialize consumer: {0}")]
    InitializationError(String),

    #[error("Failed to receive events: {0}")]
    EventReceiveError(#[from] ChannelError),

    #[error("Failed to drive LED strip: {0}")]
    DeviceError(#[from] DeviceError),
}

/// Idle/Holding view of the last delivered event
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HoldState {
    /// Last event was a release (or nothing has happened yet)
    Idle,
    /// Last event was a press
    Holding,
}

impl From<ButtonEventKind> for HoldState {
    fn from(kind: ButtonEventKind) -> Self {
        match kind {
            ButtonEventKind::Pressed => HoldState::Holding,
            ButtonEventKind::Released => HoldState::Idle,
        }
    }
}

/// What one consume cycle did
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CycleOutcome {
    Delivered(ButtonEvent),
    /// Timed out while idle, nothing shown
    IdleTimeout,
    /// Timed out while holding, alert sweep played
    AlertPlayed { steps: usize },
}

/// Counters reported when the consume loop ends
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConsumerStats {
    pub cycles: u64,
    pub events: u64,
    pub alerts: u64,
    pub idle_timeouts: u64,
    pub device_errors: u64,
}

#[state]
#[derive(Debug, Clone)]
pub enum ConsumerState {
    Initializing,
    Consuming,
}

#[machine]
pub struct EventConsumer<S: ConsumerState> {
    // Sole reader of the event channel
    event_receiver: EventReceiver,

    // Exclusively owned LED strip
    device: Box<dyn PixelDevice>,

    settings: ConsumerSettings,

    // Most recently delivered event, released sentinel before the first one
    last_event: ButtonEvent,

    // Optional MQTT report queue
    reporter: Option<ReportSender>,

    stats: ConsumerStats,
}

impl<S: ConsumerState> EventConsumer<S> {
    pub fn settings(&self) -> &ConsumerSettings {
        &self.settings
    }

    pub fn stats(&self) -> &ConsumerStats {
        &self.stats
    }

    pub fn last_event(&self) -> ButtonEvent {
        self.last_event
    }

    pub fn hold_state(&self) -> HoldState {
        HoldState::from(self.last_event.kind())
    }
}

impl EventConsumer<Initializing> {
    pub fn create(
        event_receiver: EventReceiver,
        device: Box<dyn PixelDevice>,
        settings: Option<ConsumerSettings>,
        reporter: Option<ReportSender>,
    ) -> Result<Self, ConsumerError> {
        let settings = settings.unwrap_or_default();
        debug!("Creating Event Consumer with settings: {:?}", settings);

        if device.led_count() == 0 {
            return Err(ConsumerError::InitializationError(
                "LED strip has no pixels".to_string(),
            ));
        }
        if settings.hold_timeout_ms == 0 {
            return Err(ConsumerError::InitializationError(
                "hold timeout must be greater than 0 ms".to_string(),
            ));
        }

        Ok(Self::new(
            event_receiver,
            device,
            settings,
            ButtonEvent::released_sentinel(),
            reporter,
            ConsumerStats::default(),
        ))
    }

    /// Blanks the strip and starts consuming
    pub fn initialize(mut self) -> Result<EventConsumer<Consuming>, ConsumerError> {
        self.device.clear()?;
        self.device.refresh()?;
        info!(
            "Event Consumer ready: {} LEDs, {} ms hold timeout, reporting {}",
            self.device.led_count(),
            self.settings.hold_timeout_ms,
            if self.reporter.is_some() { "on" } else { "off" }
        );
        Ok(self.transition())
    }
}

impl EventConsumer<Consuming> {
    /// Waits for one event or the hold timeout, then commits the strip
    ///
    /// A closed channel surfaces as [`ConsumerError::EventReceiveError`]
    /// once every queued event has been delivered.
    pub async fn consume_cycle(&mut self) -> Result<CycleOutcome, ConsumerError> {
        let timeout = Duration::from_millis(self.settings.hold_timeout_ms);
        let received = self.event_receiver.recv_timeout(timeout).await?;
        self.stats.cycles += 1;

        let outcome = match received {
            Received::Event(event) => {
                self.apply_event(event)?;
                CycleOutcome::Delivered(event)
            }
            Received::TimedOut => match self.hold_state() {
                HoldState::Holding => {
                    warn!(
                        "Button held for more than {} ms since {}, playing alert",
                        self.settings.hold_timeout_ms, self.last_event
                    );
                    let steps = self.play_alert().await?;
                    self.stats.alerts += 1;
                    CycleOutcome::AlertPlayed { steps }
                }
                HoldState::Idle => {
                    debug!("No button activity in the last {} ms", self.settings.hold_timeout_ms);
                    self.stats.idle_timeouts += 1;
                    CycleOutcome::IdleTimeout
                }
            },
        };

        self.device.refresh()?;
        Ok(outcome)
    }

    fn apply_event(&mut self, event: ButtonEvent) -> Result<(), ConsumerError> {
        match event.kind() {
            ButtonEventKind::Pressed => info!("Received pressed ({})", event),
            ButtonEventKind::Released => info!("Received released ({})", event),
        }

        self.last_event = event;
        self.stats.events += 1;

        if let Some(reporter) = &self.reporter {
            reporter.report(event);
        }

        self.device.clear()?;
        if event.is_pressed() {
            let center = self.device.led_count() / 2;
            self.device.set_pixel(center, self.settings.active_color)?;
        }
        Ok(())
    }

    /// Sweeps a single alert pixel across the strip, one step per delay
    async fn play_alert(&mut self) -> Result<usize, ConsumerError> {
        let step = Duration::from_millis(self.settings.alert_step_ms);
        let steps = self.device.led_count();

        for index in 0..steps {
            self.device.clear()?;
            self.device.set_pixel(index, self.settings.alert_color)?;
            self.device.refresh()?;
            tokio::time::sleep(step).await;
        }

        Ok(steps)
    }

    /// Runs consume cycles until cancelled or the sampler goes away
    ///
    /// Device errors are logged and the next cycle runs anyway. The strip is
    /// blanked on the way out.
    pub async fn run_consume_loop(
        mut self,
        cancel: CancellationToken,
    ) -> Result<ConsumerStats, ConsumerError> {
        info!("Starting Event Consumer loop");

        let stats_interval = Duration::from_secs(self.settings.stats_interval_secs.max(1));
        let mut last_stats_time = Instant::now();
        let mut events_at_last_stats = 0;

        loop {
            let result = tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Event Consumer cancelled");
                    break;
                }
                result = self.consume_cycle() => result,
            };

            match result {
                Ok(outcome) => debug!("Cycle finished: {:?}", outcome),
                Err(ConsumerError::EventReceiveError(ChannelError::Closed)) => {
                    info!("Input Sampler went away, stopping Event Consumer");
                    break;
                }
                Err(ConsumerError::DeviceError(e)) => {
                    self.stats.device_errors += 1;
                    error!("LED strip error, continuing: {}", e);
                }
                Err(e) => {
                    error!("Event Consumer terminated with error: {}", e);
                    return Err(e);
                }
            }

            if last_stats_time.elapsed() >= stats_interval {
                info!(
                    "Event Consumer stats: {} events in last {} seconds, {} alerts in total",
                    self.stats.events - events_at_last_stats,
                    stats_interval.as_secs(),
                    self.stats.alerts
                );
                events_at_last_stats = self.stats.events;
                last_stats_time = Instant::now();
            }
        }

        if let Err(e) = self.device.clear().and_then(|_| self.device.refresh()) {
            warn!("Failed to blank LED strip on shutdown: {}", e);
        }

        info!("Event Consumer stopped: {:?}", self.stats);
        Ok(self.stats)
    }
}
