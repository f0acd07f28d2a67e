//! Bounded single-producer/single-consumer event queue
//!
//! The sender never blocks. When the queue is full the configured
//! [`OverflowPolicy`] decides which event is lost. The receiver waits with a
//! timeout and gets an explicit [`Received::TimedOut`] instead of a flag.
//!
//! Neither half implements `Clone`, so there is exactly one writer and one
//! reader for the lifetime of the channel.

use super::event::ButtonEvent;
use crossbeam::queue::ArrayQueue;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::debug;

/// What happens to an event offered to a full channel
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Discard the offered event, keep the queue untouched
    #[default]
    DropNewest,
    /// Evict the oldest queued event to make room
    DropOldest,
}

/// Result of a non-blocking send
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SendOutcome {
    Queued,
    DroppedNewest,
    DroppedOldest(ButtonEvent),
}

/// Result of a receive with timeout
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Received {
    Event(ButtonEvent),
    TimedOut,
}

#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Channel capacity must be at least 1")]
    ZeroCapacity,

    #[error("Channel closed")]
    Closed,
}

#[derive(Debug)]
struct Shared {
    queue: ArrayQueue<ButtonEvent>,
    policy: OverflowPolicy,
    notify: Notify,
    sender_alive: AtomicBool,
    receiver_alive: AtomicBool,
}

/// Creates a channel with a fixed capacity and overflow policy
pub fn event_channel(
    capacity: usize,
    policy: OverflowPolicy,
) -> Result<(EventSender, EventReceiver), ChannelError> {
    // ArrayQueue::new panics on zero
    if capacity == 0 {
        return Err(ChannelError::ZeroCapacity);
    }

    debug!(
        "Created event channel with capacity {} and policy {:?}",
        capacity, policy
    );

    let shared = Arc::new(Shared {
        queue: ArrayQueue::new(capacity),
        policy,
        notify: Notify::new(),
        sender_alive: AtomicBool::new(true),
        receiver_alive: AtomicBool::new(true),
    });

    Ok((
        EventSender {
            shared: Arc::clone(&shared),
        },
        EventReceiver { shared },
    ))
}

/// Writing half, owned by the sampler
#[derive(Debug)]
pub struct EventSender {
    shared: Arc<Shared>,
}

impl EventSender {
    /// Offers an event without waiting
    ///
    /// A full queue is not an error; the returned outcome says which event was
    /// lost. Only a dropped receiver makes this fail.
    pub fn try_send(&self, event: ButtonEvent) -> Result<SendOutcome, ChannelError> {
        if !self.shared.receiver_alive.load(Ordering::Acquire) {
            return Err(ChannelError::Closed);
        }

        let outcome = match self.shared.policy {
            OverflowPolicy::DropNewest => match self.shared.queue.push(event) {
                Ok(()) => SendOutcome::Queued,
                Err(_) => return Ok(SendOutcome::DroppedNewest),
            },
            OverflowPolicy::DropOldest => match self.shared.queue.force_push(event) {
                None => SendOutcome::Queued,
                Some(evicted) => SendOutcome::DroppedOldest(evicted),
            },
        };

        self.shared.notify.notify_one();
        Ok(outcome)
    }

    pub fn capacity(&self) -> usize {
        self.shared.queue.capacity()
    }

    pub fn len(&self) -> usize {
        self.shared.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.queue.is_empty()
    }
}

impl Drop for EventSender {
    fn drop(&mut self) {
        self.shared.sender_alive.store(false, Ordering::Release);
        self.shared.notify.notify_one();
    }
}

/// Reading half, owned by the consumer
#[derive(Debug)]
pub struct EventReceiver {
    shared: Arc<Shared>,
}

impl EventReceiver {
    /// Waits up to `timeout` for the next event
    ///
    /// Events still queued when the sender goes away are delivered first;
    /// after that the call fails with [`ChannelError::Closed`]. Cancel safe.
    pub async fn recv_timeout(&mut self, timeout: Duration) -> Result<Received, ChannelError> {
        let deadline = Instant::now() + timeout;

        loop {
            if let Some(event) = self.shared.queue.pop() {
                return Ok(Received::Event(event));
            }

            if !self.shared.sender_alive.load(Ordering::Acquire) {
                // The sender may have pushed right before going away
                return match self.shared.queue.pop() {
                    Some(event) => Ok(Received::Event(event)),
                    None => Err(ChannelError::Closed),
                };
            }

            // notify_one stores a permit, so a send between the check above
            // and this wait is not lost
            if tokio::time::timeout_at(deadline, self.shared.notify.notified())
                .await
                .is_err()
            {
                return Ok(Received::TimedOut);
            }
        }
    }

    /// Takes the next queued event without waiting
    pub fn try_recv(&mut self) -> Option<ButtonEvent> {
        self.shared.queue.pop()
    }

    pub fn capacity(&self) -> usize {
        self.shared.queue.capacity()
    }

    pub fn len(&self) -> usize {
        self.shared.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.queue.is_empty()
    }
}

impl Drop for EventReceiver {
    fn drop(&mut self) {
        self.shared.receiver_alive.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::Tick;

    #[test]
    fn zero_capacity_is_rejected() {
        assert!(matches!(
            event_channel(0, OverflowPolicy::DropNewest),
            Err(ChannelError::ZeroCapacity)
        ));
    }

    #[test]
    fn full_channel_drops_newest() {
        let (sender, mut receiver) = event_channel(1, OverflowPolicy::DropNewest).unwrap();

        let first = ButtonEvent::pressed(Tick(1));
        let second = ButtonEvent::released(Tick(2));

        assert_eq!(sender.try_send(first).unwrap(), SendOutcome::Queued);
        assert_eq!(sender.try_send(second).unwrap(), SendOutcome::DroppedNewest);

        assert_eq!(sender.len(), 1);
        assert_eq!(receiver.try_recv(), Some(first));
        assert_eq!(receiver.try_recv(), None);
    }

    #[test]
    fn full_channel_can_evict_oldest() {
        let (sender, mut receiver) = event_channel(2, OverflowPolicy::DropOldest).unwrap();

        let a = ButtonEvent::pressed(Tick(1));
        let b = ButtonEvent::released(Tick(2));
        let c = ButtonEvent::pressed(Tick(3));

        sender.try_send(a).unwrap();
        sender.try_send(b).unwrap();
        assert_eq!(sender.try_send(c).unwrap(), SendOutcome::DroppedOldest(a));

        assert_eq!(receiver.len(), 2);
        assert_eq!(receiver.try_recv(), Some(b));
        assert_eq!(receiver.try_recv(), Some(c));
    }

    #[test]
    fn never_exceeds_capacity() {
        for policy in [OverflowPolicy::DropNewest, OverflowPolicy::DropOldest] {
            let (sender, _receiver) = event_channel(3, policy).unwrap();
            let mut lost = 0;
            for tick in 0..20 {
                if sender.try_send(ButtonEvent::pressed(Tick(tick))).unwrap() != SendOutcome::Queued {
                    lost += 1;
                }
                assert!(sender.len() <= 3);
            }
            assert_eq!(lost, 17);
            assert_eq!(sender.capacity(), 3);
        }
    }

    #[tokio::test]
    async fn delivers_in_fifo_order() {
        let (sender, mut receiver) = event_channel(10, OverflowPolicy::DropNewest).unwrap();
        let events: Vec<ButtonEvent> = (0..5)
            .map(|tick| {
                if tick % 2 == 0 {
                    ButtonEvent::pressed(Tick(tick))
                } else {
                    ButtonEvent::released(Tick(tick))
                }
            })
            .collect();

        for event in &events {
            sender.try_send(*event).unwrap();
        }

        for expected in events {
            let received = receiver
                .recv_timeout(Duration::from_millis(10))
                .await
                .unwrap();
            assert_eq!(received, Received::Event(expected));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn empty_channel_times_out() {
        let (_sender, mut receiver) = event_channel(1, OverflowPolicy::DropNewest).unwrap();

        let start = Instant::now();
        let received = receiver
            .recv_timeout(Duration::from_millis(3000))
            .await
            .unwrap();

        assert_eq!(received, Received::TimedOut);
        assert!(start.elapsed() >= Duration::from_millis(3000));
    }

    #[tokio::test(start_paused = true)]
    async fn wakes_up_on_send_from_another_task() {
        let (sender, mut receiver) = event_channel(4, OverflowPolicy::DropNewest).unwrap();

        let producer = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            sender.try_send(ButtonEvent::pressed(Tick(7))).unwrap();
            // Keep the sender alive until the receiver has had its chance
            tokio::time::sleep(Duration::from_millis(100)).await;
        });

        let received = receiver
            .recv_timeout(Duration::from_millis(3000))
            .await
            .unwrap();
        assert_eq!(received, Received::Event(ButtonEvent::pressed(Tick(7))));

        producer.await.unwrap();
    }

    #[tokio::test]
    async fn drains_queue_before_reporting_closed() {
        let (sender, mut receiver) = event_channel(4, OverflowPolicy::DropNewest).unwrap();
        sender.try_send(ButtonEvent::pressed(Tick(1))).unwrap();
        drop(sender);

        let received = receiver.recv_timeout(Duration::from_millis(10)).await.unwrap();
        assert_eq!(received, Received::Event(ButtonEvent::pressed(Tick(1))));

        assert!(matches!(
            receiver.recv_timeout(Duration::from_millis(10)).await,
            Err(ChannelError::Closed)
        ));
    }

    #[test]
    fn drop_oldest_keeps_the_most_recent_window() {
        let (sender, mut receiver) = event_channel(3, OverflowPolicy::DropOldest).unwrap();
        let mut evicted = Vec::new();
        for tick in 0..6 {
            if let SendOutcome::DroppedOldest(old) =
                sender.try_send(ButtonEvent::pressed(Tick(tick))).unwrap()
            {
                evicted.push(old.timestamp());
            }
        }

        assert_eq!(evicted, vec![Tick(0), Tick(1), Tick(2)]);
        let kept: Vec<Tick> = std::iter::from_fn(|| receiver.try_recv())
            .map(|event| event.timestamp())
            .collect();
        assert_eq!(kept, vec![Tick(3), Tick(4), Tick(5)]);
        assert!(receiver.is_empty());
    }

    #[test]
    fn send_fails_once_receiver_is_gone() {
        let (sender, receiver) = event_channel(4, OverflowPolicy::DropNewest).unwrap();
        drop(receiver);

        assert!(matches!(
            sender.try_send(ButtonEvent::pressed(Tick(1))),
            Err(ChannelError::Closed)
        ));
    }
}
