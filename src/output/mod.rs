//! Output side of the button pipeline
//!
//! The [`consumer::EventConsumer`] owns the LED strip and turns the event
//! stream into visible state:
//!
//! ```text
//!            Pressed                      timeout (Holding)
//!   Idle ───────────────► Holding ───────────────────────► alert sweep
//!    ▲                       │                                 │
//!    └───────Released────────┘◄────────────────────────────────┘
//! ```
//!
//! A timeout while Idle does nothing. Every cycle ends with one refresh.

pub mod consumer;

pub use consumer::{
    ConsumerError, ConsumerSettings, ConsumerStats, CycleOutcome, EventConsumer, HoldState,
};
