//! Domain events returned by group operations.
//!
//! Operations never post notifications themselves. They return the events
//! they produced; the caller dispatches them once the new state is persisted.

use roster_types::{CryptoIdentity, GroupIdentifier, PhotoDescriptor};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GroupEvent {
    Created {
        owner: CryptoIdentity,
        identifier: GroupIdentifier,
    },
    Updated {
        owner: CryptoIdentity,
        identifier: GroupIdentifier,
        version: u64,
    },
    Deleted {
        owner: CryptoIdentity,
        identifier: GroupIdentifier,
    },
    PendingMemberPromoted {
        owner: CryptoIdentity,
        identifier: GroupIdentifier,
        identity: CryptoIdentity,
    },
    PhotoNeedsDownload {
        owner: CryptoIdentity,
        identifier: GroupIdentifier,
        descriptor: PhotoDescriptor,
    },
    /// Newer details were published and await acceptance.
    PublishedDetailsAvailable {
        owner: CryptoIdentity,
        identifier: GroupIdentifier,
    },
}

/// Synchronous fan-out event bus.
///
/// Listeners are invoked inline on the emitting thread, fire-and-forget;
/// keep handlers fast.
pub struct EventBus {
    listeners: Vec<Box<dyn Fn(&GroupEvent) + Send + Sync>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, listener: Box<dyn Fn(&GroupEvent) + Send + Sync>) {
        self.listeners.push(listener);
    }

    pub fn emit(&self, event: &GroupEvent) {
        for listener in &self.listeners {
            listener(event);
        }
    }

    pub fn emit_all(&self, events: &[GroupEvent]) {
        for event in events {
            self.emit(event);
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roster_types::{GroupCategory, GroupUid};
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    fn created() -> GroupEvent {
        GroupEvent::Created {
            owner: CryptoIdentity::new([1; 32]),
            identifier: GroupIdentifier::new(
                GroupUid::new([2; 32]),
                "https://relay.example",
                GroupCategory::RelayBacked,
            )
            .unwrap(),
        }
    }

    #[test]
    fn emit_calls_all_listeners() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut bus = EventBus::new();

        let c1 = Arc::clone(&counter);
        bus.subscribe(Box::new(move |_| {
            c1.fetch_add(1, Ordering::SeqCst);
        }));
        let c2 = Arc::clone(&counter);
        bus.subscribe(Box::new(move |_| {
            c2.fetch_add(10, Ordering::SeqCst);
        }));

        bus.emit(&created());
        assert_eq!(counter.load(Ordering::SeqCst), 11);
    }

    #[test]
    fn emit_all_preserves_order() {
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let mut bus = EventBus::new();
        let s = Arc::clone(&seen);
        bus.subscribe(Box::new(move |event| {
            let tag = match event {
                GroupEvent::Created { .. } => "created",
                GroupEvent::Deleted { .. } => "deleted",
                _ => "other",
            };
            s.lock().unwrap().push(tag);
        }));

        let GroupEvent::Created { owner, identifier } = created() else {
            unreachable!()
        };
        bus.emit_all(&[
            GroupEvent::Created {
                owner,
                identifier: identifier.clone(),
            },
            GroupEvent::Deleted { owner, identifier },
        ]);
        assert_eq!(*seen.lock().unwrap(), vec!["created", "deleted"]);
    }

    #[test]
    fn default_creates_empty_bus() {
        let bus = EventBus::default();
        assert!(bus.listeners.is_empty());
        bus.emit(&created());
    }
}
