//! Event fan-out
//!
//! # Architecture
//!
//! ```text
//! dispatch(topic, signal)
//!     │
//!     ├── snapshot listeners[topic]   (read lock, released before invoking)
//!     │
//!     └── for each listener in registration order:
//!             still registered? ── no ──> skip
//!             │ yes
//!             └── handle(signal) ── Err / panic ──> error! and continue
//! ```
//!
//! Listeners run synchronously on the dispatching task. A listener may call
//! `on`/`off` (or any client method) while being invoked.

use crate::core::event::{Event, EventType};
use crate::traits::Result;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::error;

/// What listeners can register for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    /// Inbound events of one type
    Event(EventType),
    /// A connection was established
    Connected,
    /// An established connection was lost
    Disconnected,
    /// Automatic reconnection gave up
    MaxReconnectAttemptsReached,
}

impl Topic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::Event(event_type) => event_type.as_str(),
            Topic::Connected => "connected",
            Topic::Disconnected => "disconnected",
            Topic::MaxReconnectAttemptsReached => "max_reconnect_attempts_reached",
        }
    }
}

impl From<EventType> for Topic {
    fn from(event_type: EventType) -> Self {
        Topic::Event(event_type)
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What listeners receive
#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    Event(Event),
    Connected,
    Disconnected { reason: String },
    MaxReconnectAttemptsReached { attempts: u32 },
}

impl Signal {
    /// The topic this signal is delivered on
    pub fn topic(&self) -> Topic {
        match self {
            Signal::Event(event) => Topic::Event(event.event_type()),
            Signal::Connected => Topic::Connected,
            Signal::Disconnected { .. } => Topic::Disconnected,
            Signal::MaxReconnectAttemptsReached { .. } => Topic::MaxReconnectAttemptsReached,
        }
    }

    pub fn as_event(&self) -> Option<&Event> {
        match self {
            Signal::Event(event) => Some(event),
            _ => None,
        }
    }
}

/// Handler invoked for every signal on the topic it was registered for
///
/// Errors are logged by the dispatcher; they never stop delivery to the
/// remaining listeners.
pub trait Listener: Send + Sync + 'static {
    fn handle(&self, signal: &Signal) -> Result<()>;
}

impl<F> Listener for F
where
    F: Fn(&Signal) -> Result<()> + Send + Sync + 'static,
{
    fn handle(&self, signal: &Signal) -> Result<()> {
        self(signal)
    }
}

/// Identity of a registration, returned by `on` and used by `off`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

struct Registration {
    id: ListenerId,
    active: AtomicBool,
    listener: Box<dyn Listener>,
}

/// Ordered multimap of topic -> listeners
#[derive(Default)]
pub struct EventDispatcher {
    listeners: RwLock<HashMap<Topic, Vec<Arc<Registration>>>>,
    next_id: AtomicU64,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a closure; it runs after every listener registered before it
    pub fn on<F>(&self, topic: impl Into<Topic>, listener: F) -> ListenerId
    where
        F: Fn(&Signal) -> Result<()> + Send + Sync + 'static,
    {
        self.add_listener(topic, listener)
    }

    /// Register any [`Listener`] implementation
    pub fn add_listener(&self, topic: impl Into<Topic>, listener: impl Listener) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let registration = Arc::new(Registration {
            id,
            active: AtomicBool::new(true),
            listener: Box::new(listener),
        });

        self.listeners
            .write()
            .entry(topic.into())
            .or_default()
            .push(registration);
        id
    }

    /// Remove one listener by identity
    ///
    /// Returns `false` if it was not registered for `topic`.
    pub fn off(&self, topic: impl Into<Topic>, id: ListenerId) -> bool {
        let topic = topic.into();
        let mut listeners = self.listeners.write();
        let Some(registrations) = listeners.get_mut(&topic) else {
            return false;
        };

        let Some(index) = registrations.iter().position(|r| r.id == id) else {
            return false;
        };

        let removed = registrations.remove(index);
        removed.active.store(false, Ordering::Release);
        if registrations.is_empty() {
            listeners.remove(&topic);
        }
        true
    }

    /// Remove every listener for `topic`, returning how many were removed
    pub fn off_all(&self, topic: impl Into<Topic>) -> usize {
        let removed = self.listeners.write().remove(&topic.into()).unwrap_or_default();
        for registration in &removed {
            registration.active.store(false, Ordering::Release);
        }
        removed.len()
    }

    pub fn listener_count(&self, topic: impl Into<Topic>) -> usize {
        self.listeners
            .read()
            .get(&topic.into())
            .map_or(0, Vec::len)
    }

    /// Deliver `signal` to every listener currently registered for its topic
    ///
    /// Returns the number of listeners that handled it without error.
    pub fn dispatch(&self, signal: &Signal) -> usize {
        let topic = signal.topic();
        let snapshot: Vec<Arc<Registration>> = match self.listeners.read().get(&topic) {
            Some(registrations) => registrations.clone(),
            None => return 0,
        };

        let mut delivered = 0;
        for registration in snapshot {
            if !registration.active.load(Ordering::Acquire) {
                continue;
            }

            match catch_unwind(AssertUnwindSafe(|| registration.listener.handle(signal))) {
                Ok(Ok(())) => delivered += 1,
                Ok(Err(e)) => {
                    error!("Listener {:?} for {} failed: {}", registration.id, topic, e);
                }
                Err(_) => {
                    error!("Listener {:?} for {} panicked", registration.id, topic);
                }
            }
        }
        delivered
    }
}

impl fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let listeners = self.listeners.read();
        let counts: HashMap<&'static str, usize> = listeners
            .iter()
            .map(|(topic, registrations)| (topic.as_str(), registrations.len()))
            .collect();
        f.debug_struct("EventDispatcher").field("listeners", &counts).finish()
    }
}
