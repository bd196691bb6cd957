//! Checker notification types and the synchronous listener registry.
//!
//! Delivery contract: `EventBus::emit` invokes every interested listener synchronously, in
//! registration order, before returning. There is no queueing and no background thread; a
//! listener observes the checker in the state that produced the event.

use crossbeam_channel::Sender;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::trace;

// -------------------------------------------------------------------------------------------------
// Telemetry
// -------------------------------------------------------------------------------------------------
pub static EVENTS_EMITTED: AtomicU64 = AtomicU64::new(0);
pub static EVENTS_DELIVERED: AtomicU64 = AtomicU64::new(0);
pub static FORWARD_FAILURES: AtomicU64 = AtomicU64::new(0);

/// Notifications published by the spell checker to its host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckerEvent {
    UndoAvailable(bool),
    RedoAvailable(bool),
    /// New language tag, or `""` when the switch failed and checking is off.
    LanguageChanged(String),
}

impl CheckerEvent {
    pub fn mask(&self) -> EventMask {
        match self {
            CheckerEvent::UndoAvailable(_) => EventMask::UNDO,
            CheckerEvent::RedoAvailable(_) => EventMask::REDO,
            CheckerEvent::LanguageChanged(_) => EventMask::LANGUAGE,
        }
    }
}

impl fmt::Display for CheckerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckerEvent::UndoAvailable(v) => write!(f, "undo_available({v})"),
            CheckerEvent::RedoAvailable(v) => write!(f, "redo_available({v})"),
            CheckerEvent::LanguageChanged(lang) => write!(f, "language_changed({lang:?})"),
        }
    }
}

bitflags::bitflags! {
    /// Event kinds a listener is interested in.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct EventMask: u8 {
        const UNDO = 1;
        const REDO = 2;
        const LANGUAGE = 4;
        const HISTORY = Self::UNDO.bits() | Self::REDO.bits();
    }
}

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

enum Sink {
    Callback(Box<dyn FnMut(&CheckerEvent)>),
    Channel(Sender<CheckerEvent>),
}

struct Listener {
    id: ListenerId,
    mask: EventMask,
    sink: Sink,
}

#[derive(Default)]
pub struct EventBus {
    listeners: Vec<Listener>,
    next_id: u64,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Register a callback for the kinds in `mask`.
    pub fn subscribe<F>(&mut self, mask: EventMask, listener: F) -> ListenerId
    where
        F: FnMut(&CheckerEvent) + 'static,
    {
        self.push(mask, Sink::Callback(Box::new(listener)))
    }

    /// Forward matching events into a channel. The listener drops itself once the receiving
    /// side is gone.
    pub fn forward_to(&mut self, mask: EventMask, tx: Sender<CheckerEvent>) -> ListenerId {
        self.push(mask, Sink::Channel(tx))
    }

    /// Returns false if the id was unknown.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|l| l.id != id);
        before != self.listeners.len()
    }

    pub fn emit(&mut self, event: CheckerEvent) {
        EVENTS_EMITTED.fetch_add(1, Ordering::Relaxed);
        trace!(target: "events.bus", %event, listeners = self.listeners.len(), "emit");
        let kind = event.mask();
        self.listeners.retain_mut(|listener| {
            if !listener.mask.intersects(kind) {
                return true;
            }
            match &mut listener.sink {
                Sink::Callback(f) => {
                    f(&event);
                    EVENTS_DELIVERED.fetch_add(1, Ordering::Relaxed);
                    true
                }
                Sink::Channel(tx) => {
                    if tx.send(event.clone()).is_ok() {
                        EVENTS_DELIVERED.fetch_add(1, Ordering::Relaxed);
                        true
                    } else {
                        FORWARD_FAILURES.fetch_add(1, Ordering::Relaxed);
                        trace!(target: "events.bus", "forward_receiver_dropped");
                        false
                    }
                }
            }
        });
    }

    fn push(&mut self, mask: EventMask, sink: Sink) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push(Listener { id, mask, sink });
        id
    }
}
