//! Input side of the button pipeline
//!
//! - [`event`] - debounced press/release events
//! - [`channel`] - bounded SPSC queue between sampler and consumer
//! - [`sampler`] - fixed-cadence polling and edge detection
//!
//! # Architecture
//!
//! ```text
//! InputSource ──► InputSampler ──► EventSender ═══► EventReceiver ──► EventConsumer
//!                 (50 ms poll)     (try_send, bounded)   (recv_timeout)
//! ```

pub mod channel;
pub mod event;
pub mod sampler;

pub use channel::{
    event_channel, ChannelError, EventReceiver, EventSender, OverflowPolicy, Received,
    SendOutcome,
};
pub use event::{ButtonEvent, ButtonEventKind};
pub use sampler::{DebounceState, InputSampler, SamplerError, SamplerSettings, SamplerStats};
