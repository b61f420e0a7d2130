//! Observer events and subscriptions.
//!
//! The session publishes [`SessionEvent`]s on a broadcast channel. Sending
//! never blocks and needs no receiver, so a slow or absent observer cannot
//! stall event processing.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::ble::transport::TransportOperation;

/// Capacity of the observer channel.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Events emitted by the session to observers.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum SessionEvent {
    /// The scan result list changed.
    ScanResultsChanged,
    /// A connection was established or ended.
    ConnectionChanged {
        /// Whether a peripheral is now connected.
        connected: bool,
    },
    /// The radio was switched on or off.
    RadioStateChanged {
        /// Whether the radio is powered on.
        powered_on: bool,
    },
    /// A characteristic received its sensor name.
    CharacteristicNamed {
        /// The characteristic.
        characteristic: Uuid,
    },
    /// A sample was recorded for a characteristic.
    ValueReceived {
        /// The characteristic.
        characteristic: Uuid,
    },
    /// A transport operation failed.
    Error {
        /// Which operation failed.
        operation: TransportOperation,
        /// Failure description.
        message: String,
    },
    /// The bad-air alert should be shown or removed.
    Co2Alert {
        /// `true` to show, `false` to remove.
        show: bool,
    },
}

impl SessionEvent {
    /// Human-readable label for error events.
    pub fn error_label(&self) -> Option<String> {
        match self {
            Self::Error { operation, message } => {
                Some(format!("Error: {} failed: {}", operation, message))
            }
            _ => None,
        }
    }
}

/// Handle for an event callback registration.
///
/// The callback stays registered until [`CallbackHandle::unregister`] is
/// called or the handle is dropped.
pub struct CallbackHandle {
    id: u64,
    unregister_fn: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl CallbackHandle {
    /// Create a new callback handle.
    pub(crate) fn new(id: u64, unregister_fn: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            id,
            unregister_fn: Some(Box::new(unregister_fn)),
        }
    }

    /// Unregister this callback.
    pub fn unregister(mut self) {
        if let Some(f) = self.unregister_fn.take() {
            f();
        }
    }

    /// Get the callback ID.
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Drop for CallbackHandle {
    fn drop(&mut self) {
        if let Some(f) = self.unregister_fn.take() {
            f();
        }
    }
}

impl std::fmt::Debug for CallbackHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackHandle").field("id", &self.id).finish()
    }
}

/// Fan-out of session events to subscribers and registered callbacks.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<SessionEvent>,
    callback_counter: Arc<AtomicU64>,
    callbacks: Arc<Mutex<HashMap<u64, tokio::task::JoinHandle<()>>>>,
}

impl EventBus {
    /// Create a bus with no subscribers.
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            tx,
            callback_counter: Arc::new(AtomicU64::new(0)),
            callbacks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Publish an event. Never blocks; events without receivers are dropped.
    pub fn emit(&self, event: SessionEvent) {
        debug!("Session event: {:?}", event);
        let _ = self.tx.send(event);
    }

    /// Subscribe to all future events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }

    /// Register a callback for every future event.
    ///
    /// The callback runs on its own task, so it must be called from within a
    /// tokio runtime.
    pub fn on_event<F>(&self, callback: F) -> CallbackHandle
    where
        F: Fn(SessionEvent) + Send + Sync + 'static,
    {
        let callback_id = self.callback_counter.fetch_add(1, Ordering::SeqCst);
        let mut rx = self.tx.subscribe();

        let handle = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => callback(event),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("Event callback {} lagged, {} events skipped", callback_id, skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        self.callbacks.lock().insert(callback_id, handle);

        let callbacks = self.callbacks.clone();
        CallbackHandle::new(callback_id, move || {
            if let Some(handle) = callbacks.lock().remove(&callback_id) {
                handle.abort();
            }
        })
    }

    /// Number of registered callbacks.
    pub fn callback_count(&self) -> usize {
        self.callbacks.lock().len()
    }

    /// Abort every registered callback.
    pub fn clear_callbacks(&self) {
        for (_, handle) in self.callbacks.lock().drain() {
            handle.abort();
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_emit_without_subscribers() {
        let bus = EventBus::new();
        bus.emit(SessionEvent::ScanResultsChanged);
    }

    #[test]
    fn test_subscribe_receives_in_order() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();

        bus.emit(SessionEvent::RadioStateChanged { powered_on: true });
        bus.emit(SessionEvent::ScanResultsChanged);

        assert_eq!(
            rx.try_recv().ok(),
            Some(SessionEvent::RadioStateChanged { powered_on: true })
        );
        assert_eq!(rx.try_recv().ok(), Some(SessionEvent::ScanResultsChanged));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_error_label() {
        let event = SessionEvent::Error {
            operation: TransportOperation::DiscoverServices,
            message: "timeout".to_string(),
        };
        assert_eq!(
            event.error_label().as_deref(),
            Some("Error: discover services failed: timeout")
        );
        assert_eq!(SessionEvent::ScanResultsChanged.error_label(), None);
    }

    #[tokio::test]
    async fn test_callback_receives_until_unregistered() {
        let bus = EventBus::new();
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

        let handle = bus.on_event(move |event| {
            let _ = tx.send(event);
        });
        assert_eq!(bus.callback_count(), 1);

        bus.emit(SessionEvent::Co2Alert { show: true });
        let received = tokio::time::timeout(Duration::from_secs(1), rx.recv()).await;
        assert_eq!(received.ok().flatten(), Some(SessionEvent::Co2Alert { show: true }));

        handle.unregister();
        assert_eq!(bus.callback_count(), 0);

        bus.emit(SessionEvent::Co2Alert { show: false });
        let after = tokio::time::timeout(Duration::from_millis(100), rx.recv()).await;
        assert!(!matches!(after, Ok(Some(_))));
    }

    #[tokio::test]
    async fn test_dropping_handle_unregisters() {
        let bus = EventBus::new();
        {
            let _handle = bus.on_event(|_| {});
            assert_eq!(bus.callback_count(), 1);
        }
        assert_eq!(bus.callback_count(), 0);
    }
}
