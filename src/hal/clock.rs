use super::{Tick, TickSource};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Counts ticks of a fixed period since the clock was created
///
/// Backed by `tokio::time::Instant`, so it follows the runtime's paused clock
/// in tests.
#[derive(Clone, Debug)]
pub struct MonotonicClock {
    start: Instant,
    tick_period: Duration,
}

impl MonotonicClock {
    pub fn new(tick_period: Duration) -> Self {
        // A zero period would divide by zero in now()
        let tick_period = tick_period.max(Duration::from_micros(1));
        Self {
            start: Instant::now(),
            tick_period,
        }
    }

    pub fn tick_period(&self) -> Duration {
        self.tick_period
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new(Duration::from_millis(1))
    }
}

impl TickSource for MonotonicClock {
    fn now(&self) -> Tick {
        let elapsed = self.start.elapsed().as_nanos();
        Tick((elapsed / self.tick_period.as_nanos()) as u64)
    }
}

/// Externally driven clock for simulations and tests
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    ticks: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, tick: u64) {
        self.ticks.store(tick, Ordering::Release);
    }

    pub fn advance(&self, ticks: u64) {
        self.ticks.fetch_add(ticks, Ordering::AcqRel);
    }
}

impl TickSource for ManualClock {
    fn now(&self) -> Tick {
        Tick(self.ticks.load(Ordering::Acquire))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn monotonic_clock_counts_whole_periods() {
        let clock = MonotonicClock::new(Duration::from_millis(50));
        assert_eq!(clock.now(), Tick(0));

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(clock.now(), Tick(2));

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(clock.now(), Tick(3));
    }

    #[test]
    fn manual_clock_is_shared_between_clones() {
        let clock = ManualClock::new();
        let observer = clock.clone();

        clock.set(10);
        clock.advance(5);

        assert_eq!(observer.now(), Tick(15));
    }
}
