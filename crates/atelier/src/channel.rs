//! Named many-to-many broadcast channel between surfaces.
//!
//! A [`ChannelHub`] is the rendezvous point: every [`Channel`] opened on the
//! same hub under the same name receives every frame any of them sends,
//! including its own. Frames are JSON text tagged with the sender's
//! [`SurfaceId`], so endpoints can tell echoes from peer traffic.
//!
//! Delivery is best-effort. A subscriber only sees frames sent after it
//! opened, and a receiver that falls more than `capacity` frames behind loses
//! the oldest ones.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::{debug, trace, warn};

use crate::protocol::ChannelMessage;

pub const DEFAULT_CHANNEL: &str = "atelier-presenter";

/// Frames buffered per subscriber before it starts lagging.
const DEFAULT_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceId(u64);

impl std::fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "surface-{}", self.0)
    }
}

#[derive(Debug, Clone)]
struct Frame {
    origin: SurfaceId,
    payload: Arc<str>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub origin: SurfaceId,
    pub message: ChannelMessage,
}

/// Whether a peer has been seen. Derived from traffic, never from timeouts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connected,
}

#[derive(Debug)]
struct HubInner {
    channels: Mutex<HashMap<String, broadcast::Sender<Frame>>>,
    next_id: AtomicU64,
    capacity: usize,
}

/// Injected transport shared by all surfaces of one process.
#[derive(Debug, Clone)]
pub struct ChannelHub {
    inner: Arc<HubInner>,
}

impl Default for ChannelHub {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl ChannelHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Arc::new(HubInner {
                channels: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
                capacity: capacity.max(1),
            }),
        }
    }

    /// Subscribe to `name` and announce this endpoint with a `ping`.
    pub fn open(&self, name: &str) -> Channel {
        let sender = {
            let mut channels = self
                .inner
                .channels
                .lock()
                .unwrap_or_else(|e| e.into_inner());
            channels
                .entry(name.to_string())
                .or_insert_with(|| broadcast::channel(self.inner.capacity).0)
                .clone()
        };
        let id = SurfaceId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let channel = Channel {
            name: name.to_string(),
            id,
            receiver: Some(sender.subscribe()),
            sender,
            status: ConnectionStatus::Disconnected,
        };
        debug!(channel = name, %id, "channel opened");
        channel.send(&ChannelMessage::Ping);
        channel
    }
}

/// One surface's endpoint on a named channel.
#[derive(Debug)]
pub struct Channel {
    name: String,
    id: SurfaceId,
    sender: broadcast::Sender<Frame>,
    receiver: Option<broadcast::Receiver<Frame>>,
    status: ConnectionStatus,
}

impl Channel {
    pub fn id(&self) -> SurfaceId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_open(&self) -> bool {
        self.receiver.is_some()
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    /// Fire-and-forget. Frames sent after `close` are dropped.
    pub fn send(&self, message: &ChannelMessage) {
        if !self.is_open() {
            trace!(channel = %self.name, kind = message.kind(), "send on closed channel dropped");
            return;
        }
        let payload = match message.encode() {
            Ok(text) => text,
            Err(e) => {
                warn!(channel = %self.name, "dropping frame: {e}");
                return;
            }
        };
        trace!(channel = %self.name, origin = %self.id, %payload, "send");
        let frame = Frame {
            origin: self.id,
            payload: payload.into(),
        };
        // Err only means nobody is subscribed right now.
        let _ = self.sender.send(frame);
    }

    /// Drain everything received since the last poll, without blocking.
    ///
    /// Answers peer pings with `pong` and tracks [`ConnectionStatus`] before
    /// handing deliveries (echoes included) back in arrival order.
    pub fn poll(&mut self) -> Vec<Delivery> {
        let mut deliveries = Vec::new();
        let Some(receiver) = self.receiver.as_mut() else {
            return deliveries;
        };
        loop {
            match receiver.try_recv() {
                Ok(frame) => match ChannelMessage::decode(&frame.payload) {
                    Ok(message) => deliveries.push(Delivery {
                        origin: frame.origin,
                        message,
                    }),
                    Err(e) => warn!(channel = %self.name, origin = %frame.origin, "dropping frame: {e}"),
                },
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(channel = %self.name, skipped, "receiver lagged, frames lost");
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }

        for delivery in &deliveries {
            if delivery.origin == self.id {
                continue;
            }
            trace!(channel = %self.name, origin = %delivery.origin, kind = delivery.message.kind(), "recv");
            match delivery.message {
                ChannelMessage::Ping => self.send(&ChannelMessage::Pong),
                ChannelMessage::Pong | ChannelMessage::Connected => {
                    self.status = ConnectionStatus::Connected;
                }
                ChannelMessage::Disconnected => self.status = ConnectionStatus::Disconnected,
                _ => {}
            }
        }
        deliveries
    }

    /// Stop receiving. Idempotent; also runs on drop.
    pub fn close(&mut self) {
        if self.receiver.take().is_some() {
            debug!(channel = %self.name, id = %self.id, "channel closed");
        }
    }
}

impl Drop for Channel {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(deliveries: &[Delivery]) -> Vec<&'static str> {
        deliveries.iter().map(|d| d.message.kind()).collect()
    }

    #[test]
    fn test_sender_receives_its_own_frames() {
        let hub = ChannelHub::new();
        let mut a = hub.open("deck");
        a.send(&ChannelMessage::Connected);
        let received = a.poll();
        assert_eq!(kinds(&received), ["ping", "connected"]);
        assert!(received.iter().all(|d| d.origin == a.id()));
        // Own traffic never marks the endpoint connected.
        assert_eq!(a.status(), ConnectionStatus::Disconnected);
    }

    #[test]
    fn test_discovery_handshake() {
        let hub = ChannelHub::new();
        let mut first = hub.open("deck");
        first.poll();
        let mut second = hub.open("deck");

        // `first` sees the newcomer's ping and answers it.
        let seen = first.poll();
        assert_eq!(kinds(&seen), ["ping"]);

        let seen = second.poll();
        assert_eq!(kinds(&seen), ["ping", "pong"]);
        assert_eq!(second.status(), ConnectionStatus::Connected);
        assert_eq!(first.status(), ConnectionStatus::Disconnected);
    }

    #[test]
    fn test_connected_and_disconnected_drive_status() {
        let hub = ChannelHub::new();
        let mut main = hub.open("deck");
        let presenter = hub.open("deck");
        main.poll();

        presenter.send(&ChannelMessage::Connected);
        main.poll();
        assert_eq!(main.status(), ConnectionStatus::Connected);

        presenter.send(&ChannelMessage::Disconnected);
        main.poll();
        assert_eq!(main.status(), ConnectionStatus::Disconnected);
    }

    #[test]
    fn test_late_subscriber_gets_no_backlog() {
        let hub = ChannelHub::new();
        let early = hub.open("deck");
        early.send(&ChannelMessage::Connected);

        let mut late = hub.open("deck");
        assert_eq!(kinds(&late.poll()), ["ping"]);
    }

    #[test]
    fn test_names_are_isolated() {
        let hub = ChannelHub::new();
        let mut a = hub.open("one");
        let b = hub.open("two");
        a.poll();
        b.send(&ChannelMessage::Connected);
        assert!(a.poll().is_empty());
    }

    #[test]
    fn test_closed_channel_receives_nothing() {
        let hub = ChannelHub::new();
        let mut a = hub.open("deck");
        let b = hub.open("deck");
        a.close();
        a.close();
        b.send(&ChannelMessage::Connected);
        assert!(!a.is_open());
        assert!(a.poll().is_empty());
    }

    #[test]
    fn test_lagging_receiver_keeps_newest_frames() {
        let hub = ChannelHub::with_capacity(2);
        let mut slow = hub.open("deck");
        let fast = hub.open("deck");
        for _ in 0..5 {
            fast.send(&ChannelMessage::Pong);
        }
        let received = slow.poll();
        assert_eq!(received.len(), 2);
        assert_eq!(slow.status(), ConnectionStatus::Connected);
    }

    #[test]
    fn test_undecodable_frame_is_dropped() {
        let hub = ChannelHub::new();
        let mut a = hub.open("deck");
        a.poll();
        let raw = Frame {
            origin: SurfaceId(999),
            payload: Arc::from("{\"type\":\"bogus\"}"),
        };
        let _ = a.sender.send(raw);
        a.send(&ChannelMessage::Connected);
        assert_eq!(kinds(&a.poll()), ["connected"]);
    }
}
