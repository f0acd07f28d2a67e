use crate::hal::Tick;
use std::fmt;

/// Kind of a debounced button transition
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ButtonEventKind {
    Pressed,
    Released,
}

impl ButtonEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ButtonEventKind::Pressed => "PRESSED",
            ButtonEventKind::Released => "RELEASED",
        }
    }
}

/// A settled press or release, stamped with the tick it was sampled at
///
/// Created by the sampler, consumed by the consumer. Fields are read-only.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ButtonEvent {
    kind: ButtonEventKind,
    timestamp: Tick,
}

impl ButtonEvent {
    pub fn new(kind: ButtonEventKind, timestamp: Tick) -> Self {
        Self { kind, timestamp }
    }

    pub fn pressed(timestamp: Tick) -> Self {
        Self::new(ButtonEventKind::Pressed, timestamp)
    }

    pub fn released(timestamp: Tick) -> Self {
        Self::new(ButtonEventKind::Released, timestamp)
    }

    /// Stand-in for "no event seen yet": released at tick zero
    pub fn released_sentinel() -> Self {
        Self::released(Tick(0))
    }

    pub fn kind(&self) -> ButtonEventKind {
        self.kind
    }

    pub fn timestamp(&self) -> Tick {
        self.timestamp
    }

    pub fn is_pressed(&self) -> bool {
        self.kind == ButtonEventKind::Pressed
    }
}

impl fmt::Display for ButtonEvent {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}@t{}", self.kind.as_str(), self.timestamp)
    }
}
