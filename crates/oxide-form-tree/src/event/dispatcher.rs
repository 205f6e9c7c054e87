//! Priority-ordered event dispatcher.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::trace;

use super::Event;
use crate::error::Result;

/// A closure listener.
pub type Callback<E> = Box<dyn Fn(&mut E) -> Result<()> + Send + Sync>;

/// Handle returned by [`EventDispatcher::on`], used to remove the listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// One entry of a subscriber's event mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    /// Event name.
    pub event: String,
    /// Method name passed back to [`EventSubscriber::handle`].
    pub method: String,
    /// Listener priority; higher runs first.
    pub priority: i32,
}

impl Subscription {
    /// Subscribes `method` to `event` at priority 0.
    pub fn new(event: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            method: method.into(),
            priority: 0,
        }
    }

    /// Sets the priority.
    #[must_use]
    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

/// An object listening to several events through named methods.
///
/// # Example
///
/// ```
/// use oxide_form_tree::event::{form_events, EventSubscriber, FormEvent, Subscription};
/// use oxide_form_tree::Result;
///
/// struct Trim;
///
/// impl EventSubscriber<FormEvent> for Trim {
///     fn subscribed_events(&self) -> Vec<Subscription> {
///         vec![Subscription::new(form_events::PRE_SUBMIT, "trim").priority(10)]
///     }
///
///     fn handle(&self, method: &str, event: &mut FormEvent) -> Result<()> {
///         if method == "trim" {
///             if let Some(text) = event.data().as_str() {
///                 let trimmed = text.trim().to_string();
///                 event.set_data(trimmed.into());
///             }
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait EventSubscriber<E>: Send + Sync {
    /// Returns the event to method mapping.
    fn subscribed_events(&self) -> Vec<Subscription>;

    /// Invokes the method registered for an event.
    fn handle(&self, method: &str, event: &mut E) -> Result<()>;
}

enum Listener<E> {
    Callback(Callback<E>),
    Method {
        subscriber: Arc<dyn EventSubscriber<E>>,
        method: String,
    },
}

impl<E> Listener<E> {
    fn call(&self, event: &mut E) -> Result<()> {
        match self {
            Self::Callback(callback) => callback(event),
            Self::Method { subscriber, method } => subscriber.handle(method, event),
        }
    }

    fn is_method_of(&self, other: &Arc<dyn EventSubscriber<E>>, name: &str) -> bool {
        match self {
            Self::Callback(_) => false,
            Self::Method { subscriber, method } => Arc::ptr_eq(subscriber, other) && method == name,
        }
    }
}

struct ListenerEntry<E> {
    id: ListenerId,
    priority: i32,
    listener: Listener<E>,
}

/// Synchronous, priority-ordered dispatcher owned by a single node.
///
/// Listeners for an event run highest priority first; equal priorities keep
/// registration order. A listener returning `Err` aborts the dispatch.
pub struct EventDispatcher<E> {
    listeners: HashMap<String, Vec<ListenerEntry<E>>>,
    next_id: u64,
}

impl<E> Default for EventDispatcher<E> {
    fn default() -> Self {
        Self {
            listeners: HashMap::new(),
            next_id: 0,
        }
    }
}

impl<E> fmt::Debug for EventDispatcher<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (name, entries) in &self.listeners {
            map.entry(name, &entries.len());
        }
        map.finish()
    }
}

impl<E: Event> EventDispatcher<E> {
    /// Creates an empty dispatcher.
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, event: String, priority: i32, listener: Listener<E>) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        let entries = self.listeners.entry(event).or_default();
        let position = entries
            .iter()
            .position(|entry| entry.priority < priority)
            .unwrap_or(entries.len());
        entries.insert(
            position,
            ListenerEntry {
                id,
                priority,
                listener,
            },
        );
        id
    }

    /// Registers a closure listener.
    pub fn on<F>(&mut self, event: impl Into<String>, callback: F, priority: i32) -> ListenerId
    where
        F: Fn(&mut E) -> Result<()> + Send + Sync + 'static,
    {
        self.insert(event.into(), priority, Listener::Callback(Box::new(callback)))
    }

    /// Removes a listener. Returns whether it was registered.
    pub fn off(&mut self, event: &str, id: ListenerId) -> bool {
        let Some(entries) = self.listeners.get_mut(event) else {
            return false;
        };
        let before = entries.len();
        entries.retain(|entry| entry.id != id);
        let removed = entries.len() != before;
        if entries.is_empty() {
            self.listeners.remove(event);
        }
        removed
    }

    /// Registers every method of a subscriber's mapping.
    pub fn add_subscriber(&mut self, subscriber: Arc<dyn EventSubscriber<E>>) {
        for subscription in subscriber.subscribed_events() {
            self.insert(
                subscription.event,
                subscription.priority,
                Listener::Method {
                    subscriber: Arc::clone(&subscriber),
                    method: subscription.method,
                },
            );
        }
    }

    /// Removes every method registered by [`add_subscriber`](Self::add_subscriber).
    pub fn remove_subscriber(&mut self, subscriber: &Arc<dyn EventSubscriber<E>>) {
        for subscription in subscriber.subscribed_events() {
            if let Some(entries) = self.listeners.get_mut(&subscription.event) {
                entries.retain(|entry| {
                    !entry
                        .listener
                        .is_method_of(subscriber, &subscription.method)
                });
                if entries.is_empty() {
                    self.listeners.remove(&subscription.event);
                }
            }
        }
    }

    /// Returns whether anything listens to `event`.
    pub fn has_listeners(&self, event: &str) -> bool {
        self.listeners
            .get(event)
            .is_some_and(|entries| !entries.is_empty())
    }

    /// Returns the priorities registered for `event`, in dispatch order.
    pub fn priorities(&self, event: &str) -> Vec<i32> {
        self.listeners
            .get(event)
            .map(|entries| entries.iter().map(|entry| entry.priority).collect())
            .unwrap_or_default()
    }

    /// Runs the listeners of `name` against `event` and returns the event.
    pub fn dispatch(&self, name: &str, mut event: E) -> Result<E> {
        let Some(entries) = self.listeners.get(name) else {
            return Ok(event);
        };
        trace!(event = name, listeners = entries.len(), "dispatching");
        for entry in entries {
            if event.is_propagation_stopped() {
                trace!(event = name, "propagation stopped");
                break;
            }
            entry.listener.call(&mut event)?;
        }
        Ok(event)
    }
}
