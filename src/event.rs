//! Change notifications.
//!
//! Every configuration owns an [`EventSource`]. Mutations fire one event
//! before and one after the change; invalidation fires once, afterwards.
//! Listeners run outside the source's lock, so a listener may read the
//! configuration that notified it.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;

use crate::error::Result;

/// What happened to a configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    AddProperty,
    SetProperty,
    ClearProperty,
    ClearTree,
    Clear,
    Reload,
    Invalidate,
}

/// A change notification.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigurationEvent {
    pub kind: EventKind,
    pub key: Option<String>,
    pub value: Option<Value>,
    /// True for the notification sent before the change is applied.
    pub before_update: bool,
}

impl ConfigurationEvent {
    pub fn invalidate() -> Self {
        Self {
            kind: EventKind::Invalidate,
            key: None,
            value: None,
            before_update: false,
        }
    }
}

/// Receiver of change notifications.
pub trait ConfigurationListener: Send + Sync {
    fn configuration_changed(&self, event: &ConfigurationEvent);
}

impl<F> ConfigurationListener for F
where
    F: Fn(&ConfigurationEvent) + Send + Sync,
{
    fn configuration_changed(&self, event: &ConfigurationEvent) {
        self(event)
    }
}

/// Handle returned on registration, used to unregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Registry of listeners for one configuration.
#[derive(Default)]
pub struct EventSource {
    next_id: AtomicU64,
    listeners: Mutex<Vec<(ListenerId, Arc<dyn ConfigurationListener>)>>,
}

impl fmt::Debug for EventSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSource")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl EventSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_listener(&self, listener: Arc<dyn ConfigurationListener>) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock().push((id, listener));
        id
    }

    /// Returns whether the listener was registered.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.lock();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.lock().len()
    }

    pub fn fire(&self, event: &ConfigurationEvent) {
        let listeners: Vec<_> = self.lock().iter().map(|(_, l)| Arc::clone(l)).collect();
        for listener in listeners {
            listener.configuration_changed(event);
        }
    }

    /// Run a mutation wrapped in before/after notifications.
    ///
    /// The after notification is only sent when the mutation succeeds.
    pub fn around<T>(
        &self,
        kind: EventKind,
        key: Option<&str>,
        value: Option<&Value>,
        mutation: impl FnOnce() -> Result<T>,
    ) -> Result<T> {
        let mut event = ConfigurationEvent {
            kind,
            key: key.map(str::to_string),
            value: value.cloned(),
            before_update: true,
        };
        self.fire(&event);
        let result = mutation()?;
        event.before_update = false;
        self.fire(&event);
        Ok(result)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(ListenerId, Arc<dyn ConfigurationListener>)>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn recorder() -> (Arc<Mutex<Vec<ConfigurationEvent>>>, Arc<dyn ConfigurationListener>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let listener: Arc<dyn ConfigurationListener> =
            Arc::new(move |e: &ConfigurationEvent| sink.lock().unwrap().push(e.clone()));
        (seen, listener)
    }

    #[test]
    fn test_around_fires_before_and_after() {
        let source = EventSource::new();
        let (seen, listener) = recorder();
        source.add_listener(listener);

        source
            .around(EventKind::SetProperty, Some("a"), None, || Ok(()))
            .unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert!(seen[0].before_update);
        assert!(!seen[1].before_update);
        assert_eq!(seen[1].key.as_deref(), Some("a"));
    }

    #[test]
    fn test_failed_mutation_skips_after_event() {
        let source = EventSource::new();
        let (seen, listener) = recorder();
        source.add_listener(listener);

        let result: Result<()> = source.around(EventKind::AddProperty, Some("a"), None, || {
            Err(Error::ReadOnly("a".to_string()))
        });

        assert!(result.is_err());
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_remove_listener() {
        let source = EventSource::new();
        let (seen, listener) = recorder();
        let id = source.add_listener(listener);

        assert!(source.remove_listener(id));
        assert!(!source.remove_listener(id));
        source.fire(&ConfigurationEvent::invalidate());
        assert!(seen.lock().unwrap().is_empty());
    }
}
