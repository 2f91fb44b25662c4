//! In-process publish/subscribe bus.
//!
//! Delivery is synchronous: [`EventBus::publish`] runs every handler
//! registered for the message kind before it returns. Handlers are invoked
//! outside the registry lock, so a handler may publish or subscribe again.
//! Registrations are owned by [`Subscription`] guards and end when the guard
//! is dropped.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use skywatch_core::{Language, UnitSystem};
use skywatch_weather::{CitySearchResult, Coordinate, CurrentConditions};

use crate::favorites::FavoriteCity;

/// City chosen for display
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedCity {
    pub name: String,
    pub country_code: String,
    pub coordinate: Coordinate,
}

/// The three shapes a favorite toggle can originate from
#[derive(Debug, Clone, PartialEq)]
pub enum FavoriteInput {
    SearchResult(CitySearchResult),
    CurrentConditions(CurrentConditions),
    Favorite(FavoriteCity),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsChange {
    Unit(UnitSystem),
    Language(Language),
}

impl SettingsChange {
    /// Reason tag carried by the broadcast
    pub fn reason(&self) -> &'static str {
        match self {
            SettingsChange::Unit(_) => "unit",
            SettingsChange::Language(_) => "language",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    CitySelected,
    ToggleFavorite,
    SettingsChanged,
    FavoritesChanged,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    CitySelected(SelectedCity),
    ToggleFavorite(FavoriteInput),
    SettingsChanged(SettingsChange),
    /// Snapshot of the favorite set after a mutation
    FavoritesChanged(Vec<FavoriteCity>),
}

impl Message {
    pub fn kind(&self) -> MessageKind {
        match self {
            Message::CitySelected(_) => MessageKind::CitySelected,
            Message::ToggleFavorite(_) => MessageKind::ToggleFavorite,
            Message::SettingsChanged(_) => MessageKind::SettingsChanged,
            Message::FavoritesChanged(_) => MessageKind::FavoritesChanged,
        }
    }
}

type Handler = Arc<dyn Fn(&Message) + Send + Sync>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    handlers: HashMap<MessageKind, Vec<(u64, Handler)>>,
}

impl Registry {
    fn remove(&mut self, kind: MessageKind, id: u64) {
        if let Some(list) = self.handlers.get_mut(&kind) {
            list.retain(|(h, _)| *h != id);
        }
    }
}

#[derive(Clone, Default)]
pub struct EventBus {
    registry: Arc<Mutex<Registry>>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let registry = self.registry.lock();
        f.debug_struct("EventBus")
            .field("kinds", &registry.handlers.len())
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `message` to every current subscriber of its kind.
    pub fn publish(&self, message: Message) {
        let kind = message.kind();
        let handlers: Vec<Handler> = {
            let registry = self.registry.lock();
            registry
                .handlers
                .get(&kind)
                .map(|list| list.iter().map(|(_, h)| h.clone()).collect())
                .unwrap_or_default()
        };

        tracing::debug!(?kind, subscribers = handlers.len(), "Publishing message");

        for handler in handlers {
            handler(&message);
        }
    }

    /// Register `handler` for `kind`. The registration lives as long as the
    /// returned guard.
    #[must_use = "dropping the Subscription unsubscribes immediately"]
    pub fn subscribe<F>(&self, kind: MessageKind, handler: F) -> Subscription
    where
        F: Fn(&Message) + Send + Sync + 'static,
    {
        let mut registry = self.registry.lock();
        let id = registry.next_id;
        registry.next_id += 1;
        registry
            .handlers
            .entry(kind)
            .or_default()
            .push((id, Arc::new(handler)));

        Subscription {
            id,
            kind,
            registry: Arc::downgrade(&self.registry),
        }
    }

    pub fn unsubscribe(&self, subscription: Subscription) {
        drop(subscription);
    }

    pub fn subscriber_count(&self, kind: MessageKind) -> usize {
        self.registry
            .lock()
            .handlers
            .get(&kind)
            .map_or(0, Vec::len)
    }
}

/// Registration guard returned by [`EventBus::subscribe`].
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    kind: MessageKind,
    registry: Weak<Mutex<Registry>>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.lock().remove(self.kind, self.id);
        }
    }
}
