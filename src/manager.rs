//! Top-level entry point tying the transport, session and observers together.
//!
//! [`SmartHomeManager`] owns the session state machine behind a mutex and a
//! background task that feeds it transport events one at a time. Commands
//! lock the same mutex, so commands and events never interleave.

use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

use crate::ble::adapter::BtleplugTransport;
use crate::ble::peripheral::PeripheralHandle;
use crate::ble::transport::{Transport, TransportEvent};
use crate::config::SessionConfig;
use crate::data::air_quality::AirQuality;
use crate::data::sensor::SensorSeries;
use crate::error::Result;
use crate::events::{CallbackHandle, EventBus, SessionEvent};
use crate::session::{SessionState, SessionStateMachine, SessionStatus};

/// Manager for a SmartHome sensor session.
pub struct SmartHomeManager {
    session: Arc<Mutex<SessionStateMachine>>,
    events: EventBus,
    pump_handle: Mutex<Option<JoinHandle<()>>>,
}

impl SmartHomeManager {
    /// Create a manager on the host Bluetooth adapter with default settings.
    ///
    /// # Errors
    ///
    /// Returns an error if Bluetooth is not available.
    pub async fn new() -> Result<Self> {
        Self::with_config(SessionConfig::default()).await
    }

    /// Create a manager on the host Bluetooth adapter.
    ///
    /// # Errors
    ///
    /// Returns an error if Bluetooth is not available.
    pub async fn with_config(config: SessionConfig) -> Result<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        let transport = BtleplugTransport::new(tx).await?;
        Ok(Self::with_transport(config, Arc::new(transport), rx))
    }

    /// Create a manager on a custom transport.
    ///
    /// `transport_events` must carry the events produced by `transport`.
    /// Must be called within a tokio runtime.
    pub fn with_transport(
        config: SessionConfig,
        transport: Arc<dyn Transport>,
        mut transport_events: mpsc::UnboundedReceiver<TransportEvent>,
    ) -> Self {
        let events = EventBus::new();
        let session = Arc::new(Mutex::new(SessionStateMachine::new(
            config,
            transport,
            events.clone(),
        )));

        let pump_session = session.clone();
        let handle = tokio::spawn(async move {
            while let Some(event) = transport_events.recv().await {
                pump_session.lock().handle(event);
            }
            debug!("Transport event pump ended");
        });

        Self {
            session,
            events,
            pump_handle: Mutex::new(Some(handle)),
        }
    }

    // === Scanning ===

    /// Start scanning for SmartHome peripherals.
    pub fn start_scanning(&self) -> Result<()> {
        self.session.lock().start_scan()
    }

    /// Stop scanning.
    pub fn stop_scanning(&self) {
        self.session.lock().stop_scan();
    }

    /// Clear the scan results and scan again.
    pub fn refresh_scan(&self) -> Result<()> {
        self.session.lock().refresh_scan()
    }

    /// Peripherals found so far, in discovery order.
    pub fn scan_results(&self) -> Vec<PeripheralHandle> {
        self.session.lock().scan_results().to_vec()
    }

    /// Check if scanning.
    pub fn is_scanning(&self) -> bool {
        self.session.lock().is_scanning()
    }

    // === Connection ===

    /// Connect to a peripheral from the scan results.
    pub fn connect(&self, id: Uuid) -> Result<()> {
        self.session.lock().connect(id)
    }

    /// Disconnect from the current peripheral.
    pub fn disconnect(&self) {
        self.session.lock().disconnect();
    }

    /// The connected peripheral, if any.
    pub fn connected_peripheral(&self) -> Option<PeripheralHandle> {
        self.session
            .lock()
            .connection()
            .map(|connection| connection.peripheral().clone())
    }

    /// Snapshot of the full session state.
    pub fn session_state(&self) -> SessionState {
        self.session.lock().state().clone()
    }

    /// Current session status.
    pub fn status(&self) -> SessionStatus {
        self.session.lock().status()
    }

    /// Check if the radio is powered on.
    pub fn is_radio_on(&self) -> bool {
        self.session.lock().is_radio_on()
    }

    // === Recorded data ===

    /// Copy of every sensor series.
    pub fn sensor_series(&self) -> Vec<SensorSeries> {
        self.session.lock().registry().snapshot()
    }

    /// Copy of one sensor series.
    pub fn series(&self, characteristic: Uuid) -> Option<SensorSeries> {
        self.session.lock().registry().get(&characteristic).cloned()
    }

    /// Most recent CO2 reading.
    pub fn latest_co2(&self) -> Option<f64> {
        let session = self.session.lock();
        let co2 = session.config().co2_characteristic;
        session.registry().get(&co2).and_then(|series| series.latest())
    }

    /// Air quality band of the most recent CO2 reading.
    pub fn air_quality(&self) -> Option<AirQuality> {
        self.latest_co2().map(AirQuality::from_co2)
    }

    /// Truncate every series.
    pub fn clear_values(&self) {
        self.session.lock().clear_values();
    }

    /// Truncate one series.
    pub fn clear_series(&self, characteristic: Uuid) -> bool {
        self.session.lock().clear_series(characteristic)
    }

    /// Forget every sensor series.
    pub fn clear_all(&self) {
        self.session.lock().clear_all();
    }

    /// Recorded data in the JSON export format.
    pub fn export_json(&self) -> Result<String> {
        self.session.lock().export_json()
    }

    // === Observers ===

    /// Subscribe to session events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Register a callback for session events.
    pub fn on_event<F>(&self, callback: F) -> CallbackHandle
    where
        F: Fn(SessionEvent) + Send + Sync + 'static,
    {
        self.events.on_event(callback)
    }

    /// Stop processing transport events and drop all callbacks.
    pub fn shutdown(&self) {
        info!("Shutting down SmartHome manager");
        if let Some(handle) = self.pump_handle.lock().take() {
            handle.abort();
        }
        self.events.clear_callbacks();
    }
}

impl Drop for SmartHomeManager {
    fn drop(&mut self) {
        if let Some(handle) = self.pump_handle.lock().take() {
            handle.abort();
        }
        self.events.clear_callbacks();
    }
}
