//! Observable memory store events.
//!
//! Components emit a stream of events that can be consumed differently
//! depending on the deployment context: live subscribers over a broadcast
//! channel, collected buffers for tests and diagnostics, or discarded
//! entirely.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;

use crate::graph::LatentLink;
use crate::registry::{MemoryTier, RecordId, RejectReason};

/// Types of events emitted by the memory store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MemoryEventKind {
    /// A record was admitted to a stored tier
    Admitted,
    /// A state failed the stability filter
    RejectedUnstable,
    /// A state fell below the surprise threshold
    Ephemeral,
    /// The sealing worker wrote an integrity seal
    Sealed,
    /// A new cross-domain latent link was discovered
    LinkDiscovered,
    /// An eviction pass moved records to the shadow store
    Pruned,
    /// Shadow entries were permanently purged
    ShadowPurged,
    /// The sentinel began tracking a critical bridge
    CriticalBridgeFound,
    /// A protective bridge boost was applied
    BridgeProtected,
    /// The store was shut down
    Shutdown,
}

impl std::fmt::Display for MemoryEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Admitted => "ADMITTED",
            Self::RejectedUnstable => "REJECTED_UNSTABLE",
            Self::Ephemeral => "EPHEMERAL",
            Self::Sealed => "SEALED",
            Self::LinkDiscovered => "LINK_DISCOVERED",
            Self::Pruned => "PRUNED",
            Self::ShadowPurged => "SHADOW_PURGED",
            Self::CriticalBridgeFound => "CRITICAL_BRIDGE_FOUND",
            Self::BridgeProtected => "BRIDGE_PROTECTED",
            Self::Shutdown => "SHUTDOWN",
        };
        write!(f, "{}", s)
    }
}

/// An event emitted by the memory store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryEvent {
    /// Type of the event
    pub kind: MemoryEventKind,
    /// Human-readable content describing the event
    pub content: String,
    /// Event-specific metadata
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, Value>>,
    /// When the event occurred
    pub timestamp: DateTime<Utc>,
}

impl MemoryEvent {
    /// Create a new event.
    pub fn new(kind: MemoryEventKind, content: impl Into<String>) -> Self {
        Self {
            kind,
            content: content.into(),
            metadata: None,
            timestamp: Utc::now(),
        }
    }

    /// Add metadata to the event.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    /// Get a metadata value.
    pub fn get_metadata(&self, key: &str) -> Option<&Value> {
        self.metadata.as_ref()?.get(key)
    }

    // Convenience constructors for common event types

    /// Create an admission event.
    pub fn admitted(id: &RecordId, tier: MemoryTier) -> Self {
        Self::new(MemoryEventKind::Admitted, id.to_string())
            .with_metadata("tier", tier.to_string())
    }

    /// Create a rejection event.
    pub fn rejected(reason: &RejectReason) -> Self {
        Self::new(MemoryEventKind::RejectedUnstable, reason.to_string())
    }

    /// Create an ephemeral classification event.
    pub fn ephemeral() -> Self {
        Self::new(MemoryEventKind::Ephemeral, "below surprise threshold")
    }

    /// Create a seal completion event.
    pub fn sealed(id: &RecordId) -> Self {
        Self::new(MemoryEventKind::Sealed, id.to_string())
    }

    /// Create a link discovery event.
    pub fn link_discovered(link: &LatentLink) -> Self {
        Self::new(
            MemoryEventKind::LinkDiscovered,
            format!("{} ~ {}", link.source, link.target),
        )
        .with_metadata("similarity", link.similarity)
        .with_metadata("domain_pair", link.domain_pair.to_string())
    }

    /// Create an eviction pass event.
    pub fn pruned(evicted: usize, total: usize) -> Self {
        Self::new(
            MemoryEventKind::Pruned,
            format!("{} of {} records moved to shadow", evicted, total),
        )
        .with_metadata("evicted", evicted as i64)
    }

    /// Create a shadow purge event.
    pub fn shadow_purged(purged: usize) -> Self {
        Self::new(
            MemoryEventKind::ShadowPurged,
            format!("{} shadow entries purged", purged),
        )
    }

    /// Create a critical bridge tracking event.
    pub fn critical_bridge_found(id: &RecordId, signature: impl Into<String>) -> Self {
        Self::new(MemoryEventKind::CriticalBridgeFound, id.to_string())
            .with_metadata("signature", signature.into())
    }

    /// Create a bridge protection event.
    pub fn bridge_protected(id: &RecordId, risk: f64) -> Self {
        Self::new(MemoryEventKind::BridgeProtected, id.to_string()).with_metadata("risk", risk)
    }

    /// Create a shutdown event.
    pub fn shutdown() -> Self {
        Self::new(MemoryEventKind::Shutdown, "store closed")
    }

    /// Format as a single-line log entry.
    pub fn as_log_line(&self) -> String {
        format!(
            "[{}] {}: {}",
            self.timestamp.format("%H:%M:%S%.3f"),
            self.kind,
            self.content.lines().next().unwrap_or("")
        )
    }
}

/// Trait for memory event emitters.
pub trait EventEmitter: Send + Sync {
    /// Emit a memory event.
    fn emit(&self, event: MemoryEvent);
}

/// Broadcast-based emitter for live subscribers.
pub struct BroadcastEmitter {
    sender: broadcast::Sender<MemoryEvent>,
}

impl BroadcastEmitter {
    /// Create a new broadcast emitter with channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to memory events.
    pub fn subscribe(&self) -> broadcast::Receiver<MemoryEvent> {
        self.sender.subscribe()
    }

    /// Get number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl EventEmitter for BroadcastEmitter {
    fn emit(&self, event: MemoryEvent) {
        let _ = self.sender.send(event);
    }
}

/// Collecting emitter that stores events in a Vec.
#[derive(Debug, Default)]
pub struct CollectingEmitter {
    events: Arc<RwLock<Vec<MemoryEvent>>>,
}

impl CollectingEmitter {
    /// Create new collecting emitter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get collected events.
    pub fn events(&self) -> Vec<MemoryEvent> {
        self.events.read().unwrap().clone()
    }

    /// Clear collected events.
    pub fn clear(&self) {
        self.events.write().unwrap().clear();
    }
}

impl EventEmitter for CollectingEmitter {
    fn emit(&self, event: MemoryEvent) {
        self.events.write().unwrap().push(event);
    }
}

/// Null emitter that discards all events.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullEmitter;

impl EventEmitter for NullEmitter {
    fn emit(&self, _event: MemoryEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_creation() {
        let event = MemoryEvent::admitted(&RecordId::from("MID-A"), MemoryTier::Ontological);
        assert_eq!(event.kind, MemoryEventKind::Admitted);
        assert_eq!(event.content, "MID-A");
        assert_eq!(
            event.get_metadata("tier"),
            Some(&Value::String("ONTOLOGICAL".to_string()))
        );
    }

    #[test]
    fn test_event_log_line() {
        let event = MemoryEvent::pruned(3, 10);
        let line = event.as_log_line();
        assert!(line.contains("PRUNED"));
        assert!(line.contains("3 of 10"));
    }

    #[test]
    fn test_collecting_emitter() {
        let emitter = CollectingEmitter::new();
        emitter.emit(MemoryEvent::ephemeral());
        emitter.emit(MemoryEvent::shutdown());

        let events = emitter.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].kind, MemoryEventKind::Shutdown);

        emitter.clear();
        assert!(emitter.events().is_empty());
    }

    #[test]
    fn test_broadcast_emitter() {
        let emitter = BroadcastEmitter::new(16);
        assert_eq!(emitter.subscriber_count(), 0);

        let mut rx = emitter.subscribe();
        assert_eq!(emitter.subscriber_count(), 1);

        emitter.emit(MemoryEvent::shadow_purged(2));
        let event = rx.try_recv().unwrap();
        assert_eq!(event.kind, MemoryEventKind::ShadowPurged);
    }

    #[test]
    fn test_null_emitter() {
        let emitter = NullEmitter;
        emitter.emit(MemoryEvent::ephemeral());
    }

    #[test]
    fn test_event_serialization_round_trip() {
        let event = MemoryEvent::bridge_protected(&RecordId::from("MID-A"), 0.72);
        let json = serde_json::to_string(&event).unwrap();
        let back: MemoryEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event, back);
    }
}
