//! BLE peripheral session state machine.
//!
//! Drives scan, connect, GATT discovery, value streaming and disconnect for a
//! single SmartHome sensor peripheral, and keeps the [`SensorRegistry`] in
//! sync with what the peripheral reports.
//!
//! The machine is synchronous and event driven. Requests go out through a
//! [`Transport`] and never block; their results come back as
//! [`TransportEvent`]s fed to [`SessionStateMachine::handle`]. All mutation
//! happens through `&mut self`, so the caller decides which single task owns
//! the sequence.
//!
//! ```text
//! RadioOff ──power on──> Idle ──start_scan──> Scanning
//!                          ^                     │ connect
//!                          │                     v
//!                          ├──── failure ─── Connecting <──────────┐
//!                          │                     │ success         │ link lost
//!                          │                     v                 │ (with error)
//!                          ├── clean loss ── Connected ────────────┘
//!                          │                     │ disconnect
//!                          └──── confirmed ─ Disconnecting
//! ```
//!
//! Losing radio power from any state ends the session without waiting for a
//! disconnect event, which the radio stack does not deliver in that case.

use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use crate::ble::decoder::{self, Decoded};
use crate::ble::peripheral::{PeripheralHandle, ScanResultList};
use crate::ble::scan_filter::ScanFilter;
use crate::ble::transport::{DescriptorId, Transport, TransportEvent, TransportOperation};
use crate::ble::uuids::DescriptorKind;
use crate::config::SessionConfig;
use crate::data::registry::SensorRegistry;
use crate::data::sensor::secs_from_datetime;
use crate::error::{Error, Result, TransportError};
use crate::events::{EventBus, SessionEvent};

/// Discovery progress of an established connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkPhase {
    /// Waiting for the service list.
    DiscoveringServices,
    /// Characteristic discovery requested for every service.
    DiscoveringCharacteristics,
    /// At least one characteristic is subscribed; values may arrive.
    Streaming,
}

/// An established link to a peripheral.
#[derive(Debug, Clone, PartialEq)]
pub struct Connection {
    peripheral: PeripheralHandle,
    generation: u64,
    phase: LinkPhase,
    discovered_services: HashSet<Uuid>,
    pending_characteristics: HashSet<Uuid>,
}

impl Connection {
    fn new(peripheral: PeripheralHandle, generation: u64) -> Self {
        Self {
            peripheral,
            generation,
            phase: LinkPhase::DiscoveringServices,
            discovered_services: HashSet::new(),
            pending_characteristics: HashSet::new(),
        }
    }

    /// The connected peripheral.
    pub fn peripheral(&self) -> &PeripheralHandle {
        &self.peripheral
    }

    /// Sequence number of this connection within the session.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Current discovery phase.
    pub fn phase(&self) -> LinkPhase {
        self.phase
    }

    /// Services reported by the peripheral.
    pub fn discovered_services(&self) -> &HashSet<Uuid> {
        &self.discovered_services
    }

    /// Characteristics whose sensor name has not resolved yet.
    pub fn pending_characteristics(&self) -> &HashSet<Uuid> {
        &self.pending_characteristics
    }
}

/// Why a connect attempt is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectOrigin {
    /// Requested through [`SessionStateMachine::connect`].
    User,
    /// Issued automatically after the link was lost with an error.
    Reconnect,
}

/// Full session state.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    /// Radio is powered off.
    RadioOff,
    /// Radio on, not scanning, not connected.
    Idle,
    /// Scanning for peripherals.
    Scanning,
    /// A connect request is in flight.
    Connecting {
        /// Target peripheral.
        peripheral: PeripheralHandle,
        /// Who asked for the connection.
        origin: ConnectOrigin,
        /// Whether the radio is still scanning.
        scanning: bool,
    },
    /// Link established.
    Connected(Connection),
    /// Disconnect requested, waiting for confirmation.
    Disconnecting(Connection),
}

/// Compact view of [`SessionState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum SessionStatus {
    /// Radio is powered off.
    RadioOff,
    /// Radio on, nothing in progress.
    Idle,
    /// Scanning for peripherals.
    Scanning,
    /// Connect request in flight.
    Connecting,
    /// Connected, waiting for services.
    DiscoveringServices,
    /// Connected, discovering characteristics.
    DiscoveringCharacteristics,
    /// Connected and receiving values.
    Streaming,
    /// Disconnect in progress.
    Disconnecting,
}

impl SessionStatus {
    /// Check if a link is established.
    pub fn is_connected(&self) -> bool {
        matches!(
            self,
            Self::DiscoveringServices | Self::DiscoveringCharacteristics | Self::Streaming
        )
    }

    /// Check if in a transitional state.
    pub fn is_transitioning(&self) -> bool {
        matches!(self, Self::Connecting | Self::Disconnecting)
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RadioOff => write!(f, "Radio off"),
            Self::Idle => write!(f, "Idle"),
            Self::Scanning => write!(f, "Scanning"),
            Self::Connecting => write!(f, "Connecting"),
            Self::DiscoveringServices => write!(f, "Discovering services"),
            Self::DiscoveringCharacteristics => write!(f, "Discovering characteristics"),
            Self::Streaming => write!(f, "Streaming"),
            Self::Disconnecting => write!(f, "Disconnecting"),
        }
    }
}

impl SessionState {
    /// Compact status of this state.
    pub fn status(&self) -> SessionStatus {
        match self {
            Self::RadioOff => SessionStatus::RadioOff,
            Self::Idle => SessionStatus::Idle,
            Self::Scanning => SessionStatus::Scanning,
            Self::Connecting { .. } => SessionStatus::Connecting,
            Self::Connected(connection) => match connection.phase {
                LinkPhase::DiscoveringServices => SessionStatus::DiscoveringServices,
                LinkPhase::DiscoveringCharacteristics => SessionStatus::DiscoveringCharacteristics,
                LinkPhase::Streaming => SessionStatus::Streaming,
            },
            Self::Disconnecting(_) => SessionStatus::Disconnecting,
        }
    }
}

/// The session state machine.
pub struct SessionStateMachine {
    config: SessionConfig,
    filter: ScanFilter,
    transport: Arc<dyn Transport>,
    events: EventBus,
    state: SessionState,
    scan_results: ScanResultList,
    registry: SensorRegistry,
    generation: u64,
    reconnect_attempts: u32,
}

impl SessionStateMachine {
    /// Create a session in the `RadioOff` state.
    pub fn new(config: SessionConfig, transport: Arc<dyn Transport>, events: EventBus) -> Self {
        let filter = ScanFilter::new(config.name_prefix.clone());
        Self {
            config,
            filter,
            transport,
            events,
            state: SessionState::RadioOff,
            scan_results: ScanResultList::new(),
            registry: SensorRegistry::new(),
            generation: 0,
            reconnect_attempts: 0,
        }
    }

    // === Inspection ===

    /// Current state.
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Compact status.
    pub fn status(&self) -> SessionStatus {
        self.state.status()
    }

    /// Session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Peripherals found by scanning.
    pub fn scan_results(&self) -> &ScanResultList {
        &self.scan_results
    }

    /// Recorded sensor series.
    pub fn registry(&self) -> &SensorRegistry {
        &self.registry
    }

    /// Event bus the session publishes to.
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Check if the radio is powered on.
    pub fn is_radio_on(&self) -> bool {
        !matches!(self.state, SessionState::RadioOff)
    }

    /// Check if the radio is scanning.
    pub fn is_scanning(&self) -> bool {
        match self.state {
            SessionState::Scanning => true,
            SessionState::Connecting { scanning, .. } => scanning,
            _ => false,
        }
    }

    /// The established connection, if any.
    pub fn connection(&self) -> Option<&Connection> {
        match &self.state {
            SessionState::Connected(connection) => Some(connection),
            _ => None,
        }
    }

    /// Consecutive automatic reconnects since the link was last healthy.
    pub fn reconnect_attempts(&self) -> u32 {
        self.reconnect_attempts
    }

    // === Commands ===

    /// Start scanning. No-op unless idle.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BluetoothUnavailable`] while the radio is off.
    pub fn start_scan(&mut self) -> Result<()> {
        match self.state {
            SessionState::RadioOff => Err(Error::BluetoothUnavailable),
            SessionState::Idle => {
                info!("Starting scan for {}* peripherals", self.filter.name_prefix());
                self.transport.start_scan();
                self.state = SessionState::Scanning;
                Ok(())
            }
            SessionState::Scanning => {
                debug!("Already scanning, ignoring start request");
                Ok(())
            }
            _ => {
                debug!("Ignoring start scan while {}", self.status());
                Ok(())
            }
        }
    }

    /// Stop scanning. No-op if not scanning.
    pub fn stop_scan(&mut self) {
        match self.state {
            SessionState::Scanning => {
                info!("Stopping scan");
                self.transport.stop_scan();
                self.state = SessionState::Idle;
            }
            SessionState::Connecting {
                ref mut scanning, ..
            } if *scanning => {
                info!("Stopping scan");
                self.transport.stop_scan();
                *scanning = false;
            }
            _ => debug!("Not scanning, ignoring stop request"),
        }
    }

    /// Restart scanning with an empty scan result list.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BluetoothUnavailable`] while the radio is off.
    pub fn refresh_scan(&mut self) -> Result<()> {
        if !self.is_radio_on() {
            return Err(Error::BluetoothUnavailable);
        }

        self.stop_scan();
        self.clear_scan_results();
        self.start_scan()
    }

    /// Connect to a peripheral from the scan results.
    ///
    /// Only one connection may exist or be in flight; further requests are
    /// ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BluetoothUnavailable`] while the radio is off and
    /// [`Error::PeripheralNotFound`] if `id` is not in the scan results.
    pub fn connect(&mut self, id: Uuid) -> Result<()> {
        let scanning = match self.state {
            SessionState::RadioOff => return Err(Error::BluetoothUnavailable),
            SessionState::Idle => false,
            SessionState::Scanning => true,
            _ => {
                debug!("Ignoring connect to {} while {}", id, self.status());
                return Ok(());
            }
        };

        let peripheral = self
            .scan_results
            .get(&id)
            .cloned()
            .ok_or(Error::PeripheralNotFound { id })?;

        info!("Connecting to {}", peripheral);

        self.reconnect_attempts = 0;
        self.state = SessionState::Connecting {
            peripheral,
            origin: ConnectOrigin::User,
            scanning,
        };
        self.transport.connect(id);

        Ok(())
    }

    /// Disconnect from the current peripheral.
    ///
    /// An established link moves to `Disconnecting` until the transport
    /// confirms. A connect attempt still in flight is abandoned. Asking again
    /// while `Disconnecting` ends the session without waiting.
    pub fn disconnect(&mut self) {
        match std::mem::replace(&mut self.state, SessionState::Idle) {
            SessionState::Connected(connection) => {
                info!("Disconnecting from {}", connection.peripheral);
                self.transport.disconnect(connection.peripheral.id);
                self.state = SessionState::Disconnecting(connection);
            }
            SessionState::Disconnecting(connection) => {
                warn!(
                    "Disconnect from {} not confirmed, ending session",
                    connection.peripheral
                );
                self.transport.disconnect(connection.peripheral.id);
                self.end_session();
            }
            SessionState::Connecting {
                peripheral,
                origin,
                scanning,
            } => {
                info!("Abandoning connect to {}", peripheral);
                if scanning {
                    self.transport.stop_scan();
                }
                self.transport.disconnect(peripheral.id);
                if origin == ConnectOrigin::Reconnect {
                    self.end_session();
                }
            }
            other => {
                debug!("Nothing to disconnect while {}", other.status());
                self.state = other;
            }
        }
    }

    // === Recorded data ===

    /// Truncate every series, keeping the sensors.
    pub fn clear_values(&mut self) {
        info!("Clearing all recorded values");
        self.registry.clear_values();
    }

    /// Truncate one series. Returns `false` if the characteristic is unknown.
    pub fn clear_series(&mut self, characteristic: Uuid) -> bool {
        self.registry.clear_series(characteristic)
    }

    /// Forget every sensor series.
    pub fn clear_all(&mut self) {
        info!("Removing all sensor series");
        self.registry.clear_all();
    }

    /// Recorded data in the JSON export format.
    pub fn export_json(&self) -> Result<String> {
        self.registry.export_json()
    }

    // === Transport events ===

    /// Process one transport event.
    pub fn handle(&mut self, event: TransportEvent) {
        trace!("Transport event: {:?}", event);

        match event {
            TransportEvent::PowerStateChanged { powered_on } => self.on_power_state(powered_on),
            TransportEvent::PeripheralDiscovered { id, name } => self.on_discovered(id, name),
            TransportEvent::ConnectResult { id, error } => self.on_connect_result(id, error),
            TransportEvent::Disconnected { id, error } => self.on_disconnected(id, error),
            TransportEvent::ServicesDiscovered {
                id,
                services,
                error,
            } => self.on_services(id, services, error),
            TransportEvent::CharacteristicsDiscovered {
                service,
                characteristics,
                error,
            } => self.on_characteristics(service, characteristics, error),
            TransportEvent::DescriptorsDiscovered {
                characteristic,
                descriptors,
                error,
            } => self.on_descriptors(characteristic, descriptors, error),
            TransportEvent::DescriptorValue {
                descriptor,
                value,
                error,
            } => self.on_descriptor_value(descriptor, value, error),
            TransportEvent::CharacteristicValue {
                characteristic,
                value,
                received_at,
                error,
            } => self.on_characteristic_value(
                characteristic,
                &value,
                secs_from_datetime(received_at),
                error,
            ),
        }
    }

    fn on_power_state(&mut self, powered_on: bool) {
        if powered_on {
            if matches!(self.state, SessionState::RadioOff) {
                info!("Bluetooth powered on");
                self.state = SessionState::Idle;
            }
            self.events
                .emit(SessionEvent::RadioStateChanged { powered_on: true });
            return;
        }

        let had_connection = matches!(
            self.state,
            SessionState::Connected(_)
                | SessionState::Disconnecting(_)
                | SessionState::Connecting {
                    origin: ConnectOrigin::Reconnect,
                    ..
                }
        );

        if self.is_radio_on() {
            info!("Bluetooth powered off while {}", self.status());
        }
        self.state = SessionState::RadioOff;
        self.clear_scan_results();

        // No disconnect event follows a power loss.
        if had_connection {
            self.events
                .emit(SessionEvent::ConnectionChanged { connected: false });
        }
        self.events
            .emit(SessionEvent::RadioStateChanged { powered_on: false });
    }

    fn on_discovered(&mut self, id: Uuid, name: Option<String>) {
        if !self.is_scanning() {
            trace!("Ignoring advertisement from {} while not scanning", id);
            return;
        }

        if !self
            .filter
            .accept(name.as_deref(), self.scan_results.ids(), &id)
        {
            return;
        }

        let handle = PeripheralHandle::new(id, name);
        info!("New SmartHome peripheral: {}", handle);
        self.scan_results.insert(handle);
        self.events.emit(SessionEvent::ScanResultsChanged);
    }

    fn on_connect_result(&mut self, id: Uuid, error: Option<TransportError>) {
        let (peripheral, origin, scanning) =
            match std::mem::replace(&mut self.state, SessionState::Idle) {
                SessionState::Connecting {
                    peripheral,
                    origin,
                    scanning,
                } if peripheral.id == id => (peripheral, origin, scanning),
                other => {
                    self.state = other;
                    if error.is_none() {
                        warn!("Unexpected connection to {}, dropping it", id);
                        self.transport.disconnect(id);
                    }
                    return;
                }
            };

        if scanning {
            self.transport.stop_scan();
        }

        match error {
            None => {
                self.generation += 1;
                info!(
                    "Connected to {} (connection #{})",
                    peripheral, self.generation
                );
                self.state = SessionState::Connected(Connection::new(peripheral, self.generation));
                self.transport.discover_services(id);
                self.events
                    .emit(SessionEvent::ConnectionChanged { connected: true });
            }
            Some(error) => {
                warn!("Failed to connect to {}: {}", peripheral, error);
                self.report(TransportOperation::Connect, &error);
                if origin == ConnectOrigin::Reconnect {
                    self.end_session();
                }
            }
        }
    }

    fn on_disconnected(&mut self, id: Uuid, error: Option<TransportError>) {
        match std::mem::replace(&mut self.state, SessionState::Idle) {
            SessionState::Connected(connection) if connection.peripheral.id == id => match error {
                Some(error) => self.on_link_lost(connection.peripheral, error),
                None => {
                    info!("{} disconnected", connection.peripheral);
                    self.end_session();
                }
            },
            SessionState::Disconnecting(connection) if connection.peripheral.id == id => {
                if let Some(error) = error {
                    debug!("Disconnect from {} reported: {}", connection.peripheral, error);
                }
                info!("Disconnected from {}", connection.peripheral);
                self.end_session();
            }
            SessionState::Connecting {
                peripheral,
                origin,
                scanning,
            } if peripheral.id == id => {
                self.state = SessionState::Connecting {
                    peripheral,
                    origin,
                    scanning,
                };
                let error =
                    error.unwrap_or_else(|| TransportError::new("disconnected while connecting"));
                self.on_connect_result(id, Some(error));
            }
            other => {
                debug!("Ignoring disconnect of {} while {}", id, other.status());
                self.state = other;
            }
        }
    }

    fn on_link_lost(&mut self, peripheral: PeripheralHandle, error: TransportError) {
        warn!("Connection to {} lost: {}", peripheral, error);
        self.report(TransportOperation::Disconnect, &error);

        if !self.config.reconnect.allows(self.reconnect_attempts) {
            warn!(
                "Giving up on {} after {} reconnect attempts",
                peripheral, self.reconnect_attempts
            );
            self.end_session();
            return;
        }

        self.reconnect_attempts += 1;
        info!(
            "Reconnecting to {} (attempt {} of {})",
            peripheral, self.reconnect_attempts, self.config.reconnect.max_attempts
        );

        let id = peripheral.id;
        self.state = SessionState::Connecting {
            peripheral,
            origin: ConnectOrigin::Reconnect,
            scanning: false,
        };
        self.transport.connect(id);
    }

    fn on_services(&mut self, id: Uuid, services: Vec<Uuid>, error: Option<TransportError>) {
        let SessionState::Connected(connection) = &mut self.state else {
            debug!("Ignoring services of {} without a connection", id);
            return;
        };
        if connection.peripheral.id != id {
            debug!("Ignoring services of stale peripheral {}", id);
            return;
        }
        if let Some(error) = error {
            self.report(TransportOperation::DiscoverServices, &error);
            return;
        }

        debug!("Discovered {} services on {}", services.len(), id);
        for service in services {
            connection.discovered_services.insert(service);
            self.transport.discover_characteristics(id, service);
        }
        if connection.phase == LinkPhase::DiscoveringServices {
            connection.phase = LinkPhase::DiscoveringCharacteristics;
        }
    }

    fn on_characteristics(
        &mut self,
        service: Uuid,
        characteristics: Vec<Uuid>,
        error: Option<TransportError>,
    ) {
        let SessionState::Connected(connection) = &mut self.state else {
            debug!("Ignoring characteristics of {} without a connection", service);
            return;
        };
        if !connection.discovered_services.contains(&service) {
            debug!("Ignoring characteristics of stale service {}", service);
            return;
        }
        if let Some(error) = error {
            self.report(TransportOperation::DiscoverCharacteristics, &error);
            return;
        }

        let id = connection.peripheral.id;
        debug!(
            "Discovered {} characteristics in service {}",
            characteristics.len(),
            service
        );

        for characteristic in characteristics {
            self.registry.register_if_absent(characteristic);
            if !self
                .registry
                .get(&characteristic)
                .map(|series| series.is_named())
                .unwrap_or(false)
            {
                connection.pending_characteristics.insert(characteristic);
            }

            self.transport.discover_descriptors(id, characteristic);
            self.transport.read_characteristic(id, characteristic);
            self.transport.set_notify(id, characteristic, true);
            connection.phase = LinkPhase::Streaming;
        }
    }

    fn on_descriptors(
        &mut self,
        characteristic: Uuid,
        descriptors: Vec<DescriptorId>,
        error: Option<TransportError>,
    ) {
        let SessionState::Connected(connection) = &self.state else {
            debug!(
                "Ignoring descriptors of {} without a connection",
                characteristic
            );
            return;
        };
        if let Some(error) = error {
            self.report(TransportOperation::DiscoverDescriptors, &error);
            return;
        }

        let id = connection.peripheral.id;
        for descriptor in descriptors {
            self.transport.read_descriptor(id, descriptor);
        }
    }

    fn on_descriptor_value(
        &mut self,
        descriptor: DescriptorId,
        value: Vec<u8>,
        error: Option<TransportError>,
    ) {
        let SessionState::Connected(connection) = &mut self.state else {
            debug!("Ignoring descriptor value without a connection");
            return;
        };
        if let Some(error) = error {
            self.report(TransportOperation::ReadDescriptor, &error);
            return;
        }

        let characteristic = descriptor.characteristic;
        match DescriptorKind::from_uuid(&descriptor.uuid) {
            DescriptorKind::UserDescription => {
                let Some(name) = parse_user_description(&value) else {
                    debug!("Unusable user description for {}", characteristic);
                    return;
                };
                if self.registry.set_name(characteristic, &name) {
                    connection.pending_characteristics.remove(&characteristic);
                    info!("Sensor \"{}\" on characteristic {}", name, characteristic);
                    self.events
                        .emit(SessionEvent::CharacteristicNamed { characteristic });
                }
            }
            DescriptorKind::Other => {
                trace!(
                    "Descriptor {} of {}: {:02X?}",
                    descriptor.uuid,
                    characteristic,
                    value
                );
            }
            kind => {
                debug!("{:?} of {}: {:02X?}", kind, characteristic, value);
            }
        }
    }

    fn on_characteristic_value(
        &mut self,
        characteristic: Uuid,
        value: &[u8],
        timestamp: f64,
        error: Option<TransportError>,
    ) {
        if !matches!(self.state, SessionState::Connected(_)) {
            trace!("Ignoring value of {} without a connection", characteristic);
            return;
        }
        if let Some(error) = error {
            self.report(TransportOperation::ReadCharacteristic, &error);
            return;
        }

        let sample = match decoder::decode(value, timestamp) {
            Decoded::Sample(sample) => sample,
            Decoded::Empty => return,
            Decoded::Rejected(reason) => {
                debug!("Dropped value of {}: {:?}", characteristic, reason);
                return;
            }
        };

        if !self
            .registry
            .append_sample(characteristic, sample.value, sample.timestamp)
        {
            return;
        }

        // A recorded sample proves the link healthy again.
        self.reconnect_attempts = 0;
        self.events
            .emit(SessionEvent::ValueReceived { characteristic });

        if characteristic == self.config.co2_characteristic {
            let decision = self.config.notification_policy.decide(sample.value);
            self.events.emit(SessionEvent::Co2Alert {
                show: decision.is_show(),
            });
        }
    }

    // === Helpers ===

    /// Back to idle with an empty scan list; the observer learns the session ended.
    fn end_session(&mut self) {
        self.state = SessionState::Idle;
        self.clear_scan_results();
        self.events
            .emit(SessionEvent::ConnectionChanged { connected: false });
    }

    fn clear_scan_results(&mut self) {
        if !self.scan_results.is_empty() {
            self.scan_results.clear();
            self.events.emit(SessionEvent::ScanResultsChanged);
        }
    }

    fn report(&self, operation: TransportOperation, error: &TransportError) {
        warn!("Transport operation \"{}\" failed: {}", operation, error);
        self.events.emit(SessionEvent::Error {
            operation,
            message: error.message().to_string(),
        });
    }
}

/// Decode a Characteristic User Description value.
fn parse_user_description(value: &[u8]) -> Option<String> {
    let text = std::str::from_utf8(value).ok()?;
    let name = text.trim_end_matches('\0').trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

impl std::fmt::Debug for SessionStateMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStateMachine")
            .field("status", &self.status())
            .field("scan_results", &self.scan_results.len())
            .field("sensors", &self.registry.len())
            .finish()
    }
}
