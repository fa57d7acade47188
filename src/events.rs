//! Notifications for the render target.
//!
//! Events are queued while the update pass runs and delivered to listeners when the
//! owner calls [`EventBus::process_events`], always on the update thread.

use crate::prelude::HashMap;
use crate::tiles::key::TileId;
use std::collections::VecDeque;

#[derive(Debug, Clone, PartialEq)]
pub enum MapEvent {
    TileReady(TileId),
    TileFailed {
        tile: TileId,
        error: String,
        /// `false` once the attempt budget is spent
        retry_scheduled: bool,
    },
    ElevationUpdated,
    Redraw,
}

impl MapEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            MapEvent::TileReady(_) => "tileready",
            MapEvent::TileFailed { .. } => "tilefailed",
            MapEvent::ElevationUpdated => "elevationupdated",
            MapEvent::Redraw => "redraw",
        }
    }
}

/// Event listener callback type
pub type EventCallback = Box<dyn Fn(&MapEvent) + Send + Sync>;

/// Opaque handle returned by [`EventBus::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Observer list with an event queue
#[derive(Default)]
pub struct EventBus {
    /// Listeners for every event, in subscription order
    listeners: Vec<(SubscriptionId, EventCallback)>,
    /// Listeners by event type
    typed: HashMap<&'static str, Vec<(SubscriptionId, EventCallback)>>,
    event_queue: VecDeque<MapEvent>,
    next_id: u64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener for every event
    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: Fn(&MapEvent) + Send + Sync + 'static,
    {
        let id = self.next_subscription();
        self.listeners.push((id, Box::new(callback)));
        id
    }

    /// Register a listener for one event type (see [`MapEvent::event_type`])
    pub fn on<F>(&mut self, event_type: &'static str, callback: F) -> SubscriptionId
    where
        F: Fn(&MapEvent) + Send + Sync + 'static,
    {
        let id = self.next_subscription();
        self.typed
            .entry(event_type)
            .or_default()
            .push((id, Box::new(callback)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listener_count();
        self.listeners.retain(|(sub, _)| *sub != id);
        for callbacks in self.typed.values_mut() {
            callbacks.retain(|(sub, _)| *sub != id);
        }
        self.listener_count() != before
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len() + self.typed.values().map(Vec::len).sum::<usize>()
    }

    /// Emit an event to the queue
    pub fn emit(&mut self, event: MapEvent) {
        self.event_queue.push_back(event);
    }

    pub fn emit_all(&mut self, events: impl IntoIterator<Item = MapEvent>) {
        self.event_queue.extend(events);
    }

    /// Deliver all queued events and return them
    pub fn process_events(&mut self) -> Vec<MapEvent> {
        let events: Vec<_> = self.event_queue.drain(..).collect();

        for event in &events {
            for (_, callback) in &self.listeners {
                callback(event);
            }
            if let Some(callbacks) = self.typed.get(event.event_type()) {
                for (_, callback) in callbacks {
                    callback(event);
                }
            }
        }

        events
    }

    /// Get number of pending events
    pub fn pending_events(&self) -> usize {
        self.event_queue.len()
    }

    fn next_subscription(&mut self) -> SubscriptionId {
        self.next_id += 1;
        SubscriptionId(self.next_id)
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listener_count())
            .field("pending", &self.event_queue.len())
            .finish()
    }
}
