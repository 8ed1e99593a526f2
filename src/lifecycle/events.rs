//! Server lifecycle events.

use std::sync::Arc;

/// Process-level event broadcast around the accept loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServerEvent {
    /// Emitted right before the listener starts accepting connections.
    Starting,
    /// Emitted right after the accept loop has ended.
    Stopped,
}

/// Receives lifecycle events.
pub trait LifecycleListener: Send + Sync {
    fn on_event(&self, event: ServerEvent);
}

impl<F> LifecycleListener for F
where
    F: Fn(ServerEvent) + Send + Sync,
{
    fn on_event(&self, event: ServerEvent) {
        (self)(event)
    }
}

/// Fan-out of lifecycle events to every registered listener.
#[derive(Clone, Default)]
pub struct EventRouter {
    listeners: Vec<Arc<dyn LifecycleListener>>,
}

impl EventRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, listener: Arc<dyn LifecycleListener>) {
        self.listeners.push(listener);
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub fn emit(&self, event: ServerEvent) {
        tracing::debug!(?event, listeners = self.listeners.len(), "Lifecycle event");
        for listener in &self.listeners {
            listener.on_event(event);
        }
    }
}

impl std::fmt::Debug for EventRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventRouter")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_emit_reaches_all_listeners_in_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut events = EventRouter::new();
        for id in 0..2 {
            let seen = seen.clone();
            events.subscribe(Arc::new(move |event: ServerEvent| {
                seen.lock().unwrap().push((id, event));
            }));
        }

        events.emit(ServerEvent::Starting);
        events.emit(ServerEvent::Stopped);

        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                (0, ServerEvent::Starting),
                (1, ServerEvent::Starting),
                (0, ServerEvent::Stopped),
                (1, ServerEvent::Stopped),
            ]
        );
    }
}
