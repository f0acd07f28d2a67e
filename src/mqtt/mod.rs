//! # MQTT Button Reporter
//!
//! Publishes every event the consumer receives as a small text payload
//! (`event=PRESSED;timestamp=<tick>`) so a broker can follow the button
//! remotely.
//!
//! ```text
//! mqtt/
//! ├── config.rs    - Broker, credentials and topic settings
//! └── reporter.rs  - Report queue, publish loop and connection loop
//! ```
//!
//! Reporting is strictly best effort. The consumer hands reports over with a
//! non-blocking send and the broker session reconnects on its own; neither
//! ever stalls the LED feedback path.

pub mod config;
pub mod reporter;

pub use config::MqttConfig;
pub use reporter::{format_payload, MqttReporter, ReportSender, ReporterError, ReporterHandle};
