//! Lifecycle events and the subscription registry.
//!
//! The controller publishes a closed set of events; UI consumers
//! subscribe per event kind and receive callbacks synchronously, in
//! registration order, on whichever task triggered the emit. There is no
//! queuing and no replay for late subscribers.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::controller::DialogueMode;
use crate::participant::Role;

/// Events emitted during a simulation run.
#[derive(Debug, Clone)]
pub enum SimulationEvent {
    /// A run has started.
    Start { mode: DialogueMode },
    /// A participant is about to speak.
    LineStart {
        text: String,
        speaker: Role,
        participant_name: String,
    },
    /// The active line finished playback.
    LineEnd { speaker: Role },
    /// The run exhausted its turns naturally.
    Complete,
    /// The run was paused.
    Pause,
    /// The run resumed from a pause.
    Resume,
    /// The run was cancelled.
    Stop,
    /// A user turn is waiting for live speech input.
    UserSpeechStart,
    /// The user turn finished collecting input.
    UserSpeechStop,
    /// A transcript was recognized for the user turn.
    UserSpeechRecognized { transcript: String },
    /// Speech recognition failed or is unavailable.
    UserSpeechError { reason: String },
}

/// Discriminant of [`SimulationEvent`], used as the subscription key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Start,
    LineStart,
    LineEnd,
    Complete,
    Pause,
    Resume,
    Stop,
    UserSpeechStart,
    UserSpeechStop,
    UserSpeechRecognized,
    UserSpeechError,
}

impl SimulationEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            SimulationEvent::Start { .. } => EventKind::Start,
            SimulationEvent::LineStart { .. } => EventKind::LineStart,
            SimulationEvent::LineEnd { .. } => EventKind::LineEnd,
            SimulationEvent::Complete => EventKind::Complete,
            SimulationEvent::Pause => EventKind::Pause,
            SimulationEvent::Resume => EventKind::Resume,
            SimulationEvent::Stop => EventKind::Stop,
            SimulationEvent::UserSpeechStart => EventKind::UserSpeechStart,
            SimulationEvent::UserSpeechStop => EventKind::UserSpeechStop,
            SimulationEvent::UserSpeechRecognized { .. } => EventKind::UserSpeechRecognized,
            SimulationEvent::UserSpeechError { .. } => EventKind::UserSpeechError,
        }
    }
}

/// Callback invoked for a subscribed event.
pub type EventHandler = Arc<dyn Fn(&SimulationEvent) + Send + Sync>;

/// Handle returned by [`EventBus::subscribe`]; pass to
/// [`EventBus::unsubscribe`] to remove the registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subscription(u64);

#[derive(Default)]
struct Registry {
    next_id: u64,
    // Registration order within a kind is the Vec order.
    handlers: HashMap<EventKind, Vec<(u64, EventHandler)>>,
}

/// Typed publish/subscribe registry.
#[derive(Default)]
pub struct EventBus {
    registry: Mutex<Registry>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for one event kind.
    pub fn subscribe<F>(&self, kind: EventKind, handler: F) -> Subscription
    where
        F: Fn(&SimulationEvent) + Send + Sync + 'static,
    {
        let mut registry = self.registry.lock().unwrap();
        registry.next_id += 1;
        let id = registry.next_id;
        registry
            .handlers
            .entry(kind)
            .or_default()
            .push((id, Arc::new(handler)));
        Subscription(id)
    }

    /// Remove a registration. Unknown handles are a no-op.
    pub fn unsubscribe(&self, subscription: Subscription) {
        let mut registry = self.registry.lock().unwrap();
        for handlers in registry.handlers.values_mut() {
            handlers.retain(|(id, _)| *id != subscription.0);
        }
    }

    /// Deliver an event to its subscribers, synchronously and in
    /// registration order.
    pub fn emit(&self, event: &SimulationEvent) {
        // Handlers may call back into the controller (and thus the bus),
        // so the registry lock is released before any handler runs.
        let handlers: Vec<EventHandler> = {
            let registry = self.registry.lock().unwrap();
            registry
                .handlers
                .get(&event.kind())
                .map(|hs| hs.iter().map(|(_, h)| Arc::clone(h)).collect())
                .unwrap_or_default()
        };

        for handler in handlers {
            handler(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_emit_reaches_subscriber() {
        let bus = EventBus::new();
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        bus.subscribe(EventKind::Complete, move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        bus.emit(&SimulationEvent::Complete);
        bus.emit(&SimulationEvent::Complete);
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_emit_only_matching_kind() {
        let bus = EventBus::new();
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        bus.subscribe(EventKind::Pause, move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        bus.emit(&SimulationEvent::Resume);
        assert_eq!(count.load(Ordering::SeqCst), 0);
        bus.emit(&SimulationEvent::Pause);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_delivery_in_registration_order() {
        let bus = EventBus::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second", "third"] {
            let order = Arc::clone(&order);
            bus.subscribe(EventKind::Stop, move |_| {
                order.lock().unwrap().push(tag);
            });
        }

        bus.emit(&SimulationEvent::Stop);
        assert_eq!(*order.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_unsubscribe() {
        let bus = EventBus::new();
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        let sub = bus.subscribe(EventKind::Complete, move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        bus.emit(&SimulationEvent::Complete);
        bus.unsubscribe(sub);
        bus.emit(&SimulationEvent::Complete);
        assert_eq!(count.load(Ordering::SeqCst), 1);

        // Unknown handle is a no-op.
        bus.unsubscribe(sub);
    }

    #[test]
    fn test_handler_may_reenter_bus() {
        let bus = Arc::new(EventBus::new());
        let count = Arc::new(AtomicUsize::new(0));

        let inner_bus = Arc::clone(&bus);
        let c = Arc::clone(&count);
        bus.subscribe(EventKind::Start, move |_| {
            // Re-entrant emit must not deadlock.
            inner_bus.emit(&SimulationEvent::Complete);
            c.fetch_add(1, Ordering::SeqCst);
        });

        bus.emit(&SimulationEvent::Start {
            mode: DialogueMode::Scripted,
        });
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
