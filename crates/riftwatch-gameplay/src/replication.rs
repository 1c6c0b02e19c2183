//! Authority-to-observer state replication.
//!
//! The authority owns a [`ReplicationHub`] with one bounded channel per
//! observer. Every state change is encoded as a [`StormPacket`] and pushed
//! without blocking. Observers apply packets last-write-wins; there are no
//! acknowledgements.

use std::collections::BTreeMap;
use std::sync::{Arc, Weak};

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use riftwatch_common::{MagicBytes, ObserverId, RiftError, SchemaVersion};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::storm_state::RuntimeState;

/// Default per-observer queue length.
pub const DEFAULT_OBSERVER_QUEUE: usize = 16;

/// Errors decoding or encoding a replication packet.
#[derive(Debug, Error)]
pub enum PacketError {
    /// Packet does not start with the storm packet magic
    #[error("Not a storm packet: {0}")]
    BadMagic(#[from] RiftError),

    /// Packet from an incompatible protocol
    #[error("Unsupported protocol version {actual} (expected {expected})")]
    IncompatibleVersion {
        /// Version this build speaks
        expected: SchemaVersion,
        /// Version found in the packet
        actual: SchemaVersion,
    },

    /// Body failed to (de)serialize
    #[error("Packet codec error: {0}")]
    Codec(#[from] bincode::Error),
}

/// Result type for packet operations.
pub type PacketResult<T> = Result<T, PacketError>;

/// Replicated storm state message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StormPacket {
    /// Protocol version of the sender
    pub protocol_version: SchemaVersion,
    /// Full authoritative state
    pub state: RuntimeState,
}

impl StormPacket {
    /// Wraps a state in a packet of the current protocol version.
    #[must_use]
    pub fn new(state: RuntimeState) -> Self {
        Self {
            protocol_version: SchemaVersion::STORM_PROTOCOL,
            state,
        }
    }

    /// Encodes to wire bytes: magic followed by the bincode body.
    pub fn encode(&self) -> PacketResult<Vec<u8>> {
        let body = bincode::serialize(self)?;
        Ok(MagicBytes::STORM_PACKET.wrap(&body))
    }

    /// Decodes wire bytes.
    pub fn decode(bytes: &[u8]) -> PacketResult<Self> {
        let body = MagicBytes::STORM_PACKET.strip(bytes)?;
        let packet: Self = bincode::deserialize(body)?;
        if !SchemaVersion::STORM_PROTOCOL.can_read(&packet.protocol_version) {
            return Err(PacketError::IncompatibleVersion {
                expected: SchemaVersion::STORM_PROTOCOL,
                actual: packet.protocol_version,
            });
        }
        Ok(packet)
    }
}

/// Authority side of one observer's channel.
struct ObserverLink {
    sender: Sender<Vec<u8>>,
    /// Second handle on the queue, used to evict stale packets when full
    evict: Receiver<Vec<u8>>,
    /// Dead once the observer is dropped
    alive: Weak<()>,
}

impl ObserverLink {
    fn is_alive(&self) -> bool {
        self.alive.strong_count() > 0
    }

    /// Queues a packet, evicting the oldest one if the queue is full.
    fn deliver(&self, bytes: Vec<u8>) -> bool {
        match self.sender.try_send(bytes) {
            Ok(()) => true,
            Err(TrySendError::Full(bytes)) => {
                let _ = self.evict.try_recv();
                self.sender.try_send(bytes).is_ok()
            },
            Err(TrySendError::Disconnected(_)) => false,
        }
    }
}

/// Fans authoritative state out to observers.
pub struct ReplicationHub {
    links: BTreeMap<ObserverId, ObserverLink>,
    capacity: usize,
}

impl Default for ReplicationHub {
    fn default() -> Self {
        Self::new(DEFAULT_OBSERVER_QUEUE)
    }
}

impl std::fmt::Debug for ReplicationHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplicationHub")
            .field("observers", &self.links.keys().collect::<Vec<_>>())
            .field("capacity", &self.capacity)
            .finish()
    }
}

impl ReplicationHub {
    /// Creates a hub with the given per-observer queue length.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            links: BTreeMap::new(),
            capacity: capacity.max(1),
        }
    }

    /// Opens a channel for an observer. Replaces any previous channel with
    /// the same id.
    pub fn connect(&mut self, id: ObserverId) -> StormObserver {
        let (sender, receiver) = bounded(self.capacity);
        let alive = Arc::new(());
        self.links.insert(
            id,
            ObserverLink {
                sender,
                evict: receiver.clone(),
                alive: Arc::downgrade(&alive),
            },
        );
        debug!("Observer {id} connected");
        StormObserver {
            id,
            receiver,
            state: None,
            _alive: alive,
        }
    }

    /// Closes an observer's channel. Returns whether it was connected.
    pub fn disconnect(&mut self, id: ObserverId) -> bool {
        let removed = self.links.remove(&id).is_some();
        if removed {
            debug!("Observer {id} disconnected");
        }
        removed
    }

    /// Number of connected observers.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.links.len()
    }

    /// Whether an observer is connected.
    #[must_use]
    pub fn is_connected(&self, id: ObserverId) -> bool {
        self.links.get(&id).is_some_and(ObserverLink::is_alive)
    }

    /// Sends the state to every observer and returns how many received it.
    ///
    /// Observers that have gone away are pruned.
    pub fn broadcast(&mut self, state: &RuntimeState) -> usize {
        self.prune();
        let Some(bytes) = Self::encode(state) else {
            return 0;
        };
        self.links
            .values()
            .filter(|link| link.deliver(bytes.clone()))
            .count()
    }

    /// Sends the state to a single observer.
    pub fn send_to(&mut self, id: ObserverId, state: &RuntimeState) -> bool {
        self.prune();
        let Some(bytes) = Self::encode(state) else {
            return false;
        };
        self.links.get(&id).is_some_and(|link| link.deliver(bytes))
    }

    fn encode(state: &RuntimeState) -> Option<Vec<u8>> {
        match StormPacket::new(*state).encode() {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                warn!("Failed to encode storm packet: {e}");
                None
            },
        }
    }

    fn prune(&mut self) {
        let before = self.links.len();
        self.links.retain(|_, link| link.is_alive());
        let pruned = before - self.links.len();
        if pruned > 0 {
            debug!("Pruned {pruned} departed observers");
        }
    }
}

/// Observer side of the replication channel.
///
/// Holds a read-only copy of the authoritative state, replaced wholesale by
/// each packet.
#[derive(Debug)]
pub struct StormObserver {
    id: ObserverId,
    receiver: Receiver<Vec<u8>>,
    state: Option<RuntimeState>,
    _alive: Arc<()>,
}

impl StormObserver {
    /// This observer's id.
    #[must_use]
    pub fn id(&self) -> ObserverId {
        self.id
    }

    /// Applies every queued packet. Returns whether the local copy changed.
    pub fn poll(&mut self) -> bool {
        let mut updated = false;
        while let Ok(bytes) = self.receiver.try_recv() {
            match StormPacket::decode(&bytes) {
                Ok(packet) => {
                    updated |= self.state != Some(packet.state);
                    self.state = Some(packet.state);
                },
                Err(e) => {
                    warn!("{}: dropping storm packet: {e}", self.id);
                },
            }
        }
        updated
    }

    /// Last applied state, if any packet has arrived.
    #[must_use]
    pub fn state(&self) -> Option<&RuntimeState> {
        self.state.as_ref()
    }

    /// Glitch strength to use for local stability queries.
    #[must_use]
    pub fn glitch_strength(&self) -> f32 {
        self.state.map_or(0.0, |s| s.glitch_strength)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::severity::SeverityTier;

    fn active_state() -> RuntimeState {
        RuntimeState {
            active: true,
            glitch_strength: 0.7,
            next_severity_tier: SeverityTier::Medium,
            active_until_day: 8.2,
            ..RuntimeState::new()
        }
    }

    #[test]
    fn test_packet_round_trip() {
        let packet = StormPacket::new(active_state());
        let bytes = packet.encode().expect("encode failed");
        assert_eq!(&bytes[..4], b"RWSP");
        assert_eq!(StormPacket::decode(&bytes).expect("decode failed"), packet);
    }

    #[test]
    fn test_packet_rejects_garbage() {
        assert!(matches!(StormPacket::decode(b"nope"), Err(PacketError::BadMagic(_))));
        let truncated = MagicBytes::STORM_PACKET.wrap(&[1, 2]);
        assert!(matches!(StormPacket::decode(&truncated), Err(PacketError::Codec(_))));
    }

    #[test]
    fn test_packet_rejects_other_major_version() {
        let packet = StormPacket {
            protocol_version: SchemaVersion::new(9, 0, 0),
            state: RuntimeState::new(),
        };
        let bytes = packet.encode().expect("encode failed");
        assert!(matches!(
            StormPacket::decode(&bytes),
            Err(PacketError::IncompatibleVersion { .. })
        ));
    }

    #[test]
    fn test_broadcast_last_write_wins() {
        let mut hub = ReplicationHub::default();
        let mut observer = hub.connect(ObserverId::new());
        assert!(observer.state().is_none());

        assert_eq!(hub.broadcast(&RuntimeState::new()), 1);
        assert_eq!(hub.broadcast(&active_state()), 1);
        assert!(observer.poll());
        assert_eq!(observer.state(), Some(&active_state()));
        assert!((observer.glitch_strength() - 0.7).abs() < f32::EPSILON);
        assert!(!observer.poll());
    }

    #[test]
    fn test_full_queue_keeps_newest() {
        let mut hub = ReplicationHub::new(2);
        let mut observer = hub.connect(ObserverId::new());
        for day in 1..=5 {
            let state = RuntimeState {
                next_start_day: f64::from(day),
                ..RuntimeState::new()
            };
            assert_eq!(hub.broadcast(&state), 1);
        }
        observer.poll();
        let state = observer.state().expect("state replicated");
        assert!((state.next_start_day - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_dropped_observer_pruned() {
        let mut hub = ReplicationHub::default();
        let kept = hub.connect(ObserverId::new());
        let gone = hub.connect(ObserverId::new());
        let gone_id = gone.id();
        drop(gone);
        assert!(!hub.is_connected(gone_id));
        assert_eq!(hub.broadcast(&RuntimeState::new()), 1);
        assert_eq!(hub.observer_count(), 1);
        assert!(hub.is_connected(kept.id()));
    }

    #[test]
    fn test_send_to_single_observer() {
        let mut hub = ReplicationHub::default();
        let mut a = hub.connect(ObserverId::new());
        let mut b = hub.connect(ObserverId::new());
        assert!(hub.send_to(a.id(), &active_state()));
        assert!(a.poll());
        assert!(!b.poll());
        assert!(hub.disconnect(b.id()));
        assert!(!hub.send_to(b.id(), &active_state()));
    }
}
