use super::channel::{ChannelError, EventSender, SendOutcome};
use super::event::{ButtonEvent, ButtonEventKind};
use crate::hal::{InputSource, Level, TickSource};
use statum::{machine, state};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

// Sampler settings
#[derive(Clone, Debug)]
pub struct SamplerSettings {
    /// Sampling period, which is also the debounce window
    pub sample_interval_ms: u64,
    pub stats_interval_secs: u64,
}

impl Default for SamplerSettings {
    fn default() -> Self {
        Self {
            sample_interval_ms: 50,
            stats_interval_secs: 60,
        }
    }
}

// Sampler errors
#[derive(Debug, thiserror::Error)]
pub enum SamplerError {
    #[error("Failed to initialize sampler: {0}")]
    InitializationError(String),

    #[error("Failed to send event: {0}")]
    EventSendError(#[from] ChannelError),
}

/// Counters reported when the sampling loop ends
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SamplerStats {
    pub samples: u64,
    pub events: u64,
    pub dropped: u64,
}

/// Previous-sample memory of the periodic debounce
///
/// Only transitions between two consecutive samples count, so bounce shorter
/// than one sampling period never shows up. Bounce that spans more than one
/// period produces a spurious press/release pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DebounceState {
    previous_level: Level,
}

impl Default for DebounceState {
    fn default() -> Self {
        // Pull-up wiring: an untouched button reads high
        Self::new(Level::High)
    }
}

impl DebounceState {
    pub fn new(previous_level: Level) -> Self {
        Self { previous_level }
    }

    pub fn previous_level(&self) -> Level {
        self.previous_level
    }

    /// Feeds one sample and returns the transition it completes, if any
    pub fn update(&mut self, current: Level) -> Option<ButtonEventKind> {
        let edge = match (self.previous_level, current) {
            (Level::High, Level::Low) => Some(ButtonEventKind::Pressed),
            (Level::Low, Level::High) => Some(ButtonEventKind::Released),
            _ => None,
        };
        self.previous_level = current;
        edge
    }
}

#[state]
#[derive(Debug, Clone)]
pub enum SamplerState {
    Initializing,
    Sampling,
}

#[machine]
pub struct InputSampler<S: SamplerState> {
    // Polled digital input
    input: Box<dyn InputSource>,

    // Timestamp source for emitted events
    clock: Arc<dyn TickSource>,

    // Sole writer of the event channel
    event_sender: EventSender,

    settings: SamplerSettings,

    debounce: DebounceState,

    stats: SamplerStats,
}

impl<S: SamplerState> InputSampler<S> {
    pub fn settings(&self) -> &SamplerSettings {
        &self.settings
    }

    pub fn stats(&self) -> &SamplerStats {
        &self.stats
    }
}

impl InputSampler<Initializing> {
    pub fn create(
        input: Box<dyn InputSource>,
        clock: Arc<dyn TickSource>,
        event_sender: EventSender,
        settings: Option<SamplerSettings>,
    ) -> Result<Self, SamplerError> {
        let settings = settings.unwrap_or_default();
        debug!("Creating Input Sampler with settings: {:?}", settings);

        if settings.sample_interval_ms == 0 {
            error!("Sampling interval of 0 ms requested");
            return Err(SamplerError::InitializationError(
                "sample interval must be greater than 0 ms".to_string(),
            ));
        }

        Ok(Self::new(
            input,
            clock,
            event_sender,
            settings,
            DebounceState::default(),
            SamplerStats::default(),
        ))
    }

    pub fn initialize(self) -> InputSampler<Sampling> {
        info!(
            "Input Sampler ready: {} ms period, channel capacity {}",
            self.settings.sample_interval_ms,
            self.event_sender.capacity()
        );
        self.transition()
    }
}

impl InputSampler<Sampling> {
    /// Reads the input once and forwards a completed transition
    ///
    /// Returns the detected event even when the channel had no room for it.
    /// Fails only when the consumer side of the channel is gone.
    pub fn sample_tick(&mut self) -> Result<Option<ButtonEvent>, SamplerError> {
        let level = self.input.read_level();
        self.stats.samples += 1;

        let Some(kind) = self.debounce.update(level) else {
            return Ok(None);
        };

        let event = ButtonEvent::new(kind, self.clock.now());
        self.stats.events += 1;
        info!(
            "Button {} at {}",
            event,
            chrono::Local::now().format("%H:%M:%S.%3f")
        );

        match self.event_sender.try_send(event)? {
            SendOutcome::Queued => debug!("Event queued for consumer"),
            SendOutcome::DroppedNewest => {
                self.stats.dropped += 1;
                warn!("Consumer is behind, event {} discarded", event);
            }
            SendOutcome::DroppedOldest(evicted) => {
                self.stats.dropped += 1;
                warn!("Consumer is behind, older event {} evicted", evicted);
            }
        }

        Ok(Some(event))
    }

    /// Samples on a fixed period until cancelled or the consumer goes away
    ///
    /// Consumes the sampler; the channel closes when this returns.
    pub async fn run_sampling_loop(
        mut self,
        cancel: CancellationToken,
    ) -> Result<SamplerStats, SamplerError> {
        let period = Duration::from_millis(self.settings.sample_interval_ms);
        info!("Starting Input Sampler loop with {:?} period", period);

        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let stats_interval = Duration::from_secs(self.settings.stats_interval_secs.max(1));
        let mut last_stats_time = Instant::now();
        let mut events_at_last_stats = 0;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Input Sampler cancelled");
                    break;
                }
                _ = ticker.tick() => {}
            }

            match self.sample_tick() {
                Ok(_) => {}
                Err(SamplerError::EventSendError(ChannelError::Closed)) => {
                    warn!("Event consumer went away, stopping Input Sampler");
                    break;
                }
                Err(e) => {
                    error!("Input Sampler terminated with error: {}", e);
                    return Err(e);
                }
            }

            if last_stats_time.elapsed() >= stats_interval {
                info!(
                    "Input Sampler stats: {} events in last {} seconds, {} dropped in total",
                    self.stats.events - events_at_last_stats,
                    stats_interval.as_secs(),
                    self.stats.dropped
                );
                events_at_last_stats = self.stats.events;
                last_stats_time = Instant::now();
            }
        }

        info!("Input Sampler stopped: {:?}", self.stats);
        Ok(self.stats)
    }
}
