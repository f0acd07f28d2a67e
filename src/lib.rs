//! Debounced button input driving an LED strip
//!
//! A push button is sampled on a fixed period, settled transitions travel
//! through a bounded queue, and a consumer lights the strip or plays an alert
//! sweep when the button stays held past a timeout.
//!
//! ```text
//! hal::InputSource ─► input::InputSampler ─► input::event_channel ─► output::EventConsumer ─► hal::PixelDevice
//!                                                                          │
//!                                                                          └─► mqtt::MqttReporter
//! ```

pub mod config;
pub mod fairness;
pub mod hal;
pub mod input;
pub mod mqtt;
pub mod output;
pub mod pipeline;

pub use config::AppConfig;
pub use pipeline::{PipelineError, PipelineHandle, PipelineParts, PipelineReport};
