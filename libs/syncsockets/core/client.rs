use crate::config::ClientConfig;
use crate::connection_state::{AtomicConnectionState, AtomicMetrics, ConnectionState};
use crate::dispatcher::{EventDispatcher, Listener, ListenerId, Signal, Topic};
use crate::event::{ControlMessage, Event, EventType};
use crate::heartbeat::HeartbeatHandle;
use crate::queue::OutboundQueue;
use crate::registry::SubscriptionRegistry;
use crate::retry::RetryTimer;
use crate::target::connection_url;
use crate::traits::*;
use crossbeam_channel::{bounded, Receiver, Sender};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use tracing::{debug, error, info, warn};

/// Capacity of the lifecycle event channel. Reading it is optional; when it
/// is full the oldest unread events are kept and newer ones dropped
const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Lifecycle notifications, readable with `try_recv_event` / `recv_event`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// Connected to the server
    Connected,
    /// An established connection was lost
    Disconnected(String),
    /// A connection attempt failed
    Error(String),
    /// Reconnection scheduled (attempt number)
    Reconnecting(u32),
    /// Automatic reconnection gave up after this many attempts
    RetriesExhausted(u32),
    /// `disconnect()` was called
    Closed,
}

/// Client metrics snapshot
#[derive(Debug, Clone)]
pub struct Metrics {
    pub messages_sent: u64,
    pub messages_received: u64,
    pub reconnect_count: u64,
    pub dropped_messages: u64,
    pub malformed_messages: u64,
    pub queued_messages: usize,
    pub subscriptions: usize,
    pub connection_state: ConnectionState,
}

/// Real-time event synchronization client
///
/// Keeps one logical connection to the server alive across network
/// interruptions:
/// - subscriptions are remembered and replayed after every (re)connect
/// - events sent while offline are queued and flushed in order on connect
/// - inbound events fan out to listeners registered per event type
/// - failed connections are retried with backoff up to a configured cap
///
/// `SyncClient` is a cheap handle; clones share the same connection.
/// Connection outcomes are asynchronous and observed through the
/// `connected`, `disconnected` and `max_reconnect_attempts_reached` topics.
///
/// # Example
/// ```ignore
/// let client = syncsockets::builder()
///     .url("wss://rt.example.com/ws")
///     .build()?;
///
/// client.on(EventType::ChatMessage, |signal| {
///     println!("chat: {:?}", signal.as_event());
///     Ok(())
/// });
/// client.subscribe(["chat_u-42"]);
/// client.connect("u-42", Some("token"))?;
/// ```
#[derive(Clone)]
pub struct SyncClient {
    shared: Arc<Shared>,
}

/// State shared between the handle, transport callbacks and timers
struct Shared {
    config: ClientConfig,
    /// Written only while `inner` is locked
    state: AtomicConnectionState,
    metrics: AtomicMetrics,
    dispatcher: EventDispatcher,
    inner: Mutex<Inner>,
    event_tx: Sender<ClientEvent>,
    event_rx: Receiver<ClientEvent>,
}

/// Everything the state machine mutates, behind one lock
struct Inner {
    retry_count: u32,
    /// Bumped on every open attempt and on disconnect; callbacks carrying an
    /// older value are stale
    generation: u64,
    url: Option<String>,
    registry: SubscriptionRegistry,
    queue: OutboundQueue,
    link: Option<Box<dyn TransportLink>>,
    retry_timer: Option<RetryTimer>,
    heartbeat: Option<HeartbeatHandle>,
}

/// Side effects collected under the lock and performed after releasing it
#[derive(Default)]
struct Effects {
    signals: Vec<Signal>,
    events: Vec<ClientEvent>,
}

impl SyncClient {
    /// Create a client from configuration
    ///
    /// This is called by the builder's `build()` method.
    /// Use `syncsockets::builder()` to create a client.
    pub(crate) fn new(config: ClientConfig) -> Self {
        let (event_tx, event_rx) = bounded(EVENT_CHANNEL_CAPACITY);
        let queue = OutboundQueue::new(config.max_queued_messages);

        Self {
            shared: Arc::new(Shared {
                config,
                state: AtomicConnectionState::new(ConnectionState::Disconnected),
                metrics: AtomicMetrics::new(),
                dispatcher: EventDispatcher::new(),
                inner: Mutex::new(Inner {
                    retry_count: 0,
                    generation: 0,
                    url: None,
                    registry: SubscriptionRegistry::new(),
                    queue,
                    link: None,
                    retry_timer: None,
                    heartbeat: None,
                }),
                event_tx,
                event_rx,
            }),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.shared.config
    }

    /// Open the connection as `identity`
    ///
    /// No-op while already connecting or connected. From any other state
    /// (including `Closed` and `Reconnecting`) the retry counter is reset,
    /// a pending retry is cancelled, and a new attempt is issued.
    ///
    /// If the transport cannot issue the attempt, the client goes back to
    /// where it was: a `Reconnecting` client re-arms its retry at the same
    /// attempt number, any other state is restored unchanged.
    ///
    /// # Returns
    /// * `Ok(())` - The attempt was issued; watch the `connected` topic
    /// * `Err(SyncError)` - The attempt could not be issued
    pub fn connect(&self, identity: &str, credentials: Option<&str>) -> Result<()> {
        let url = connection_url(&self.shared.config.endpoint, identity, credentials)?;

        let (generation, previous, previous_retries) = {
            let mut inner = self.shared.inner.lock();
            let previous = self.shared.state.get();
            if matches!(previous, ConnectionState::Connecting | ConnectionState::Connected) {
                debug!("connect() ignored, already {}", previous);
                return Ok(());
            }

            if let Some(timer) = inner.retry_timer.take() {
                debug!("Cancelling pending reconnection attempt {}", timer.attempt());
                timer.cancel();
            }
            let previous_retries = inner.retry_count;
            inner.retry_count = 0;
            inner.url = Some(url.clone());
            inner.generation += 1;
            self.shared.state.set(ConnectionState::Connecting);
            (inner.generation, previous, previous_retries)
        };

        info!("Connecting to {} as {}", self.shared.config.endpoint, identity);

        if let Err(e) = self.shared.issue_open(url, generation) {
            error!("Failed to issue connection attempt: {}", e);
            self.shared
                .abandon_manual_attempt(generation, previous, previous_retries, e.to_string());
            return Err(e);
        }
        Ok(())
    }

    /// Close the connection and forget all subscriptions
    ///
    /// Cancels any pending retry. Queued events and listeners are kept.
    pub fn disconnect(&self) {
        let previous = {
            let mut inner = self.shared.inner.lock();
            if let Some(timer) = inner.retry_timer.take() {
                timer.cancel();
            }
            if let Some(heartbeat) = inner.heartbeat.take() {
                heartbeat.stop();
            }
            if let Some(link) = inner.link.take() {
                link.close();
            }
            inner.registry.clear();
            inner.retry_count = 0;
            inner.generation += 1;

            let previous = self.shared.state.get();
            self.shared.state.set(ConnectionState::Closed);
            previous
        };

        info!("Disconnected (was {})", previous);
        self.shared.emit(Effects {
            events: vec![ClientEvent::Closed],
            ..Effects::default()
        });
    }

    /// Add channels of interest
    ///
    /// Always recorded; newly added channels are also announced to the
    /// server right away when connected.
    pub fn subscribe<I, S>(&self, channels: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut inner = self.shared.inner.lock();
        let added = inner.registry.add(channels);
        if added.is_empty() {
            return;
        }

        debug!("Subscribed to {:?}", added);
        if let Some(link) = self.shared.live_link(&inner) {
            for channel in added {
                self.shared.send_control(link, ControlMessage::subscribe(channel));
            }
        }
    }

    /// Remove channels of interest; unknown channels are ignored
    pub fn unsubscribe<I, S>(&self, channels: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut inner = self.shared.inner.lock();
        let removed = inner.registry.remove(channels);
        if removed.is_empty() {
            return;
        }

        debug!("Unsubscribed from {:?}", removed);
        if let Some(link) = self.shared.live_link(&inner) {
            for channel in removed {
                self.shared.send_control(link, ControlMessage::unsubscribe(channel));
            }
        }
    }

    /// Send an event now if connected, otherwise queue it for the next connect
    ///
    /// A write the transport refuses is queued as well.
    pub fn send(&self, event: Event) -> Result<()> {
        let mut inner = self.shared.inner.lock();

        if let Some(link) = self.shared.live_link(&inner) {
            let frame = event.to_frame()?;
            match link.send(frame) {
                Ok(()) => {
                    self.shared.metrics.increment_sent();
                    return Ok(());
                }
                Err(e) => warn!("Write failed, queueing event {}: {}", event.id(), e),
            }
        } else {
            debug!("Not connected, queueing event {}", event.id());
        }

        if inner.queue.enqueue(event).is_some() {
            self.shared.metrics.increment_dropped();
        }
        Ok(())
    }

    /// Send a chat message event
    pub fn send_chat_message(
        &self,
        sender_id: &str,
        recipient_id: &str,
        text: &str,
        booking_id: Option<&str>,
    ) -> Result<()> {
        let payload = serde_json::json!({
            "senderId": sender_id,
            "recipientId": recipient_id,
            "message": text,
        });
        let mut event = Event::new(EventType::ChatMessage, payload).with_user_id(sender_id);
        if let Some(booking_id) = booking_id {
            event = event.with_booking_id(booking_id);
        }
        self.send(event)
    }

    /// Send a vehicle position for a booking
    pub fn send_location_update(
        &self,
        vehicle_id: &str,
        booking_id: &str,
        latitude: f64,
        longitude: f64,
    ) -> Result<()> {
        let payload = serde_json::json!({
            "latitude": latitude,
            "longitude": longitude,
        });
        self.send(
            Event::new(EventType::LocationUpdate, payload)
                .with_vehicle_id(vehicle_id)
                .with_booking_id(booking_id),
        )
    }

    /// Send a keepalive ping; returns `false` when not connected
    pub fn ping(&self) -> bool {
        let inner = self.shared.inner.lock();
        match self.shared.live_link(&inner) {
            Some(link) => self.shared.send_control(link, ControlMessage::ping()),
            None => {
                debug!("Cannot ping - not connected");
                false
            }
        }
    }

    /// Register a listener for an event type or a connection topic
    pub fn on<F>(&self, topic: impl Into<Topic>, listener: F) -> ListenerId
    where
        F: Fn(&Signal) -> Result<()> + Send + Sync + 'static,
    {
        self.shared.dispatcher.on(topic, listener)
    }

    /// Register a [`Listener`] implementation
    pub fn add_listener(&self, topic: impl Into<Topic>, listener: impl Listener) -> ListenerId {
        self.shared.dispatcher.add_listener(topic, listener)
    }

    /// Remove one listener; returns `false` if it was not registered
    pub fn off(&self, topic: impl Into<Topic>, id: ListenerId) -> bool {
        self.shared.dispatcher.off(topic, id)
    }

    /// Remove every listener for a topic
    pub fn off_all(&self, topic: impl Into<Topic>) -> usize {
        self.shared.dispatcher.off_all(topic)
    }

    pub fn listener_count(&self, topic: impl Into<Topic>) -> usize {
        self.shared.dispatcher.listener_count(topic)
    }

    /// Check if connected
    #[inline]
    pub fn is_connected(&self) -> bool {
        self.shared.state.is_connected()
    }

    /// Get current connection state
    #[inline]
    pub fn connection_state(&self) -> ConnectionState {
        self.shared.state.get()
    }

    /// Consecutive automatic reconnection attempts since the last success
    pub fn retry_count(&self) -> u32 {
        self.shared.inner.lock().retry_count
    }

    /// Current subscriptions, sorted
    pub fn subscriptions(&self) -> Vec<String> {
        self.shared.inner.lock().registry.snapshot()
    }

    /// Number of events waiting for a connection
    pub fn queued_messages(&self) -> usize {
        self.shared.inner.lock().queue.len()
    }

    /// Get current metrics
    pub fn metrics(&self) -> Metrics {
        let inner = self.shared.inner.lock();
        let metrics = &self.shared.metrics;
        Metrics {
            messages_sent: metrics.messages_sent(),
            messages_received: metrics.messages_received(),
            reconnect_count: metrics.reconnect_count(),
            dropped_messages: metrics.dropped_messages(),
            malformed_messages: metrics.malformed_messages(),
            queued_messages: inner.queue.len(),
            subscriptions: inner.registry.len(),
            connection_state: self.shared.state.get(),
        }
    }

    /// Try to receive a lifecycle event (non-blocking)
    ///
    /// Reading the stream is optional. It holds the oldest
    /// `EVENT_CHANNEL_CAPACITY` unread events; later ones are dropped.
    pub fn try_recv_event(&self) -> Option<ClientEvent> {
        self.shared.event_rx.try_recv().ok()
    }

    /// Receive a lifecycle event (blocking)
    pub fn recv_event(&self) -> std::result::Result<ClientEvent, crossbeam_channel::RecvError> {
        self.shared.event_rx.recv()
    }
}

impl std::fmt::Debug for SyncClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncClient")
            .field("endpoint", &self.shared.config.endpoint)
            .field("state", &self.shared.state.get())
            .finish()
    }
}

impl Shared {
    /// Ask the transport for a new connection tagged with `generation`
    fn issue_open(self: &Arc<Self>, url: String, generation: u64) -> Result<()> {
        let sink: Arc<dyn TransportSink> = Arc::new(AttemptSink {
            shared: Arc::downgrade(self),
            generation,
        });
        self.config.transport.open(&url, sink)
    }

    /// The open link, if the state machine says we are connected
    fn live_link<'a>(&self, inner: &'a Inner) -> Option<&'a dyn TransportLink> {
        if self.state.get() != ConnectionState::Connected {
            return None;
        }
        inner.link.as_deref()
    }

    fn send_control(&self, link: &dyn TransportLink, message: ControlMessage) -> bool {
        let result = message.to_frame().and_then(|frame| link.send(frame));
        match result {
            Ok(()) => {
                self.metrics.increment_sent();
                true
            }
            Err(e) => {
                warn!("Failed to send {:?} control message: {}", message.action, e);
                false
            }
        }
    }

    fn handle_opened(self: &Arc<Self>, generation: u64, link: Box<dyn TransportLink>) {
        let mut effects = Effects::default();
        {
            let mut inner = self.inner.lock();
            if inner.generation != generation || self.state.get() != ConnectionState::Connecting {
                debug!("Discarding stale connection from attempt {}", generation);
                link.close();
                return;
            }

            if let Some(timer) = inner.retry_timer.take() {
                timer.cancel();
            }
            inner.retry_count = 0;
            self.state.set(ConnectionState::Connected);

            // Replay interest before anything queued goes out
            let channels = inner.registry.snapshot();
            for channel in &channels {
                self.send_control(link.as_ref(), ControlMessage::subscribe(channel.as_str()));
            }

            let mut pending = inner.queue.drain().into_iter();
            let mut flushed = 0;
            while let Some(event) = pending.next() {
                let result = event.to_frame().and_then(|frame| link.send(frame));
                if let Err(e) = result {
                    warn!("Flush interrupted at event {}: {}", event.id(), e);
                    let mut unsent = vec![event];
                    unsent.extend(pending);
                    inner.queue.requeue_front(unsent);
                    break;
                }
                self.metrics.increment_sent();
                flushed += 1;
            }

            inner.link = Some(link);
            if let Some(interval) = self.config.heartbeat {
                let weak = Arc::downgrade(self);
                inner.heartbeat = HeartbeatHandle::spawn(interval, move || {
                    weak.upgrade()
                        .is_some_and(|shared| shared.heartbeat_tick(generation))
                });
            }

            info!(
                "Connected to {} (replayed {} subscriptions, flushed {} queued events)",
                self.config.endpoint,
                channels.len(),
                flushed
            );
            effects.signals.push(Signal::Connected);
            effects.events.push(ClientEvent::Connected);
        }
        self.emit(effects);
    }

    fn handle_inbound(&self, generation: u64, frame: WsMessage) {
        {
            let inner = self.inner.lock();
            if inner.generation != generation || self.state.get() != ConnectionState::Connected {
                debug!("Dropping frame from stale connection {}", generation);
                return;
            }
        }

        self.metrics.increment_received();
        match Event::from_frame(&frame) {
            Ok(event) => {
                self.dispatcher.dispatch(&Signal::Event(event));
            }
            Err(e) => {
                self.metrics.increment_malformed();
                debug!("Dropping malformed inbound message: {}", e);
            }
        }
    }

    fn handle_closed(self: &Arc<Self>, generation: u64, reason: String) {
        let mut effects = Effects::default();
        {
            let mut inner = self.inner.lock();
            if inner.generation != generation {
                debug!("Ignoring close of stale connection {}: {}", generation, reason);
                return;
            }

            match self.state.get() {
                ConnectionState::Connected => {
                    warn!("Connection lost: {}", reason);
                    if let Some(heartbeat) = inner.heartbeat.take() {
                        heartbeat.stop();
                    }
                    if let Some(link) = inner.link.take() {
                        link.close();
                    }
                    effects.signals.push(Signal::Disconnected {
                        reason: reason.clone(),
                    });
                    effects.events.push(ClientEvent::Disconnected(reason));
                }
                ConnectionState::Connecting => {
                    warn!("Connection attempt failed: {}", reason);
                    effects.events.push(ClientEvent::Error(reason));
                }
                _ => return,
            }

            self.schedule_retry(&mut inner, &mut effects);
        }
        self.emit(effects);
    }

    /// Undo a manual `connect()` whose attempt could not be issued
    fn abandon_manual_attempt(
        self: &Arc<Self>,
        generation: u64,
        previous: ConnectionState,
        previous_retries: u32,
        reason: String,
    ) {
        let mut effects = Effects::default();
        effects.events.push(ClientEvent::Error(reason));
        {
            let mut inner = self.inner.lock();
            if inner.generation == generation && self.state.get() == ConnectionState::Connecting {
                if previous == ConnectionState::Reconnecting {
                    // schedule_retry increments, so the same attempt is re-armed
                    inner.retry_count = previous_retries.saturating_sub(1);
                    self.schedule_retry(&mut inner, &mut effects);
                } else {
                    inner.retry_count = previous_retries;
                    self.state.set(previous);
                }
            }
        }
        self.emit(effects);
    }

    /// Move to `Reconnecting` with a timer armed, or to `Closed` when the cap is hit
    fn schedule_retry(self: &Arc<Self>, inner: &mut Inner, effects: &mut Effects) {
        let max_attempts = self.config.max_reconnect_attempts;
        if inner.retry_count >= max_attempts {
            warn!("Max reconnection attempts ({}) reached, giving up", max_attempts);
            self.state.set(ConnectionState::Closed);
            effects.signals.push(Signal::MaxReconnectAttemptsReached {
                attempts: inner.retry_count,
            });
            effects.events.push(ClientEvent::RetriesExhausted(inner.retry_count));
            return;
        }

        inner.retry_count += 1;
        let attempt = inner.retry_count;
        let delay = self.config.backoff.delay(attempt);
        let generation = inner.generation;
        let weak = Arc::downgrade(self);

        let timer = RetryTimer::schedule(attempt, delay, move || {
            if let Some(shared) = weak.upgrade() {
                shared.retry_fired(generation);
            }
        });

        match timer {
            Ok(timer) => {
                info!(
                    "Reconnecting in {:?} (attempt {}/{})",
                    delay, attempt, max_attempts
                );
                self.state.set(ConnectionState::Reconnecting);
                self.metrics.increment_reconnects();
                inner.retry_timer = Some(timer);
                effects.events.push(ClientEvent::Reconnecting(attempt));
            }
            Err(e) => {
                error!("Cannot schedule reconnection: {}", e);
                self.state.set(ConnectionState::Closed);
                effects.events.push(ClientEvent::Error(e.to_string()));
            }
        }
    }

    fn retry_fired(self: &Arc<Self>, generation: u64) {
        let (url, attempt_generation) = {
            let mut inner = self.inner.lock();
            if inner.generation != generation || self.state.get() != ConnectionState::Reconnecting {
                debug!("Ignoring stale retry timer for connection {}", generation);
                return;
            }

            if let Some(timer) = inner.retry_timer.take() {
                timer.fired();
            }
            let Some(url) = inner.url.clone() else {
                self.state.set(ConnectionState::Closed);
                return;
            };

            inner.generation += 1;
            self.state.set(ConnectionState::Connecting);
            debug!("Reconnection attempt {} starting", inner.retry_count);
            (url, inner.generation)
        };

        if let Err(e) = self.issue_open(url, attempt_generation) {
            self.handle_closed(attempt_generation, e.to_string());
        }
    }

    /// Send a heartbeat ping if connection `generation` is still the live one
    fn heartbeat_tick(&self, generation: u64) -> bool {
        let inner = self.inner.lock();
        if inner.generation != generation {
            return false;
        }
        match self.live_link(&inner) {
            Some(link) => {
                self.send_control(link, ControlMessage::ping());
                true
            }
            None => false,
        }
    }

    /// Publish lifecycle events, then run listeners, outside the state lock
    fn emit(&self, effects: Effects) {
        for event in effects.events {
            if self.event_tx.try_send(event).is_err() {
                debug!("Lifecycle event channel full, dropping event");
            }
        }
        for signal in effects.signals {
            self.dispatcher.dispatch(&signal);
        }
    }
}

/// Routes one attempt's transport callbacks back to the client
struct AttemptSink {
    shared: Weak<Shared>,
    generation: u64,
}

impl TransportSink for AttemptSink {
    fn opened(&self, link: Box<dyn TransportLink>) {
        match self.shared.upgrade() {
            Some(shared) => shared.handle_opened(self.generation, link),
            None => link.close(),
        }
    }

    fn message(&self, message: WsMessage) {
        if let Some(shared) = self.shared.upgrade() {
            shared.handle_inbound(self.generation, message);
        }
    }

    fn closed(&self, reason: String) {
        if let Some(shared) = self.shared.upgrade() {
            shared.handle_closed(self.generation, reason);
        }
    }
}

