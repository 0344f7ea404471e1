//! Event Subscriptions
//!
//! The handle a caller holds after subscribing to the event stream: a
//! bounded channel of decoded [`Event`]s and a small parallel channel for
//! stream-level errors (connection loss, dropped events).
//!
//! # Delivery policy
//! Sends from the stream reader never block. When a subscriber's event
//! buffer is full the **newest** event is dropped and one error is recorded
//! on the error channel, keeping the reader live for all other subscribers.
//! Dropping the subscription (or both receivers) unregisters the subscriber
//! on the next delivery cycle.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::Error;

/// Default capacity of a subscriber's event buffer.
pub const DEFAULT_EVENT_BUFFER: usize = 100;

/// Capacity of a subscriber's error channel.
pub(crate) const ERROR_BUFFER: usize = 8;

/// One event decoded from the controller's stream.
#[derive(Debug, Clone)]
pub struct Event {
    /// Event type tag, taken from the frame's `meta.message`.
    pub event_type: String,
    /// When the client received the frame.
    pub timestamp: DateTime<Utc>,
    /// The raw JSON element for application-level decoding.
    pub payload: Value,
}

/// Options for a subscription.
#[derive(Debug, Clone, Default)]
pub struct SubscribeOptions {
    /// Accept only these event types; `None` accepts everything.
    pub event_types: Option<HashSet<String>>,
    /// Event buffer capacity; 0 falls back to [`DEFAULT_EVENT_BUFFER`].
    pub buffer: usize,
}

impl SubscribeOptions {
    /// Options accepting every event type with the default buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts the subscription to the given event types.
    pub fn with_event_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.event_types = Some(types.into_iter().map(Into::into).collect());
        self
    }

    /// Overrides the event buffer capacity.
    pub fn with_buffer(mut self, buffer: usize) -> Self {
        self.buffer = buffer;
        self
    }

    pub(crate) fn effective_buffer(&self) -> usize {
        if self.buffer == 0 {
            DEFAULT_EVENT_BUFFER
        } else {
            self.buffer
        }
    }
}

/// A live subscription to a site's event stream.
///
/// Events and errors arrive on independent bounded channels. Both channels
/// close when the stream terminates (close, disabled reconnect, or the
/// client being dropped).
#[derive(Debug)]
pub struct EventSubscription {
    events: mpsc::Receiver<Event>,
    errors: mpsc::Receiver<Error>,
}

impl EventSubscription {
    pub(crate) fn new(events: mpsc::Receiver<Event>, errors: mpsc::Receiver<Error>) -> Self {
        Self { events, errors }
    }

    /// Receives the next event, or `None` once the stream has terminated.
    pub async fn recv(&mut self) -> Option<Event> {
        self.events.recv().await
    }

    /// Non-blocking event receive.
    pub fn try_recv(&mut self) -> Option<Event> {
        self.events.try_recv().ok()
    }

    /// Receives the next stream-level error, or `None` once terminated.
    pub async fn recv_error(&mut self) -> Option<Error> {
        self.errors.recv().await
    }

    /// Non-blocking error receive.
    pub fn try_recv_error(&mut self) -> Option<Error> {
        self.errors.try_recv().ok()
    }

    /// Splits the subscription into its raw channels.
    pub fn into_parts(self) -> (mpsc::Receiver<Event>, mpsc::Receiver<Error>) {
        (self.events, self.errors)
    }
}

/// Reader-side view of one subscriber.
pub(crate) struct Subscriber {
    filter: Option<HashSet<String>>,
    events: mpsc::Sender<Event>,
    errors: mpsc::Sender<Error>,
}

impl Subscriber {
    pub(crate) fn new(
        filter: Option<HashSet<String>>,
        events: mpsc::Sender<Event>,
        errors: mpsc::Sender<Error>,
    ) -> Self {
        Self {
            filter,
            events,
            errors,
        }
    }

    /// True when the caller dropped its receiving end.
    pub(crate) fn is_closed(&self) -> bool {
        self.events.is_closed()
    }

    /// True when this subscriber accepts the given event type.
    pub(crate) fn wants(&self, event_type: &str) -> bool {
        match &self.filter {
            Some(types) => types.contains(event_type),
            None => true,
        }
    }

    /// Delivers one event without blocking.
    ///
    /// Returns `false` when the subscriber is gone and should be removed.
    /// A full buffer drops the event and records one error.
    pub(crate) fn deliver(&self, event: Event) -> bool {
        match self.events.try_send(event) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(event)) => {
                tracing::debug!(event_type = %event.event_type, "subscriber buffer full; dropping event");
                let _ = self.errors.try_send(Error::EventStream(format!(
                    "event buffer full; dropped event of type '{}'",
                    event.event_type
                )));
                true
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    /// Reports a stream-level error without blocking.
    pub(crate) fn report(&self, message: &str) {
        let _ = self.errors.try_send(Error::EventStream(message.to_string()));
    }
}
