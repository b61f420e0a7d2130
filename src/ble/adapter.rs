//! [`Transport`] backed by the host Bluetooth adapter via btleplug.
//!
//! Every request is spawned onto the tokio runtime and returns immediately.
//! Results, central events and notifications are funneled into one unbounded
//! channel of [`TransportEvent`]s, in the order they complete.

use btleplug::api::{
    Central, CentralEvent, CentralState, CharPropFlags, Characteristic, Descriptor,
    Manager as _, Peripheral as _, ScanFilter as AdapterScanFilter,
};
use btleplug::platform::{Adapter, Manager, Peripheral, PeripheralId};
use chrono::Utc;
use futures::stream::StreamExt;
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};
use uuid::Uuid;

use crate::ble::transport::{DescriptorId, Transport, TransportEvent};
use crate::error::{Error, Result, TransportError};

/// Radio transport using the first available Bluetooth adapter.
pub struct BtleplugTransport {
    inner: Arc<Inner>,
}

struct Inner {
    adapter: Adapter,
    runtime: Handle,
    events: mpsc::UnboundedSender<TransportEvent>,
    /// Known peripherals by session identifier.
    peripherals: RwLock<HashMap<Uuid, Peripheral>>,
    /// Platform identifiers mapped to session identifiers.
    ids: RwLock<HashMap<PeripheralId, Uuid>>,
    links: Mutex<Links>,
    notification_tasks: Mutex<HashMap<Uuid, JoinHandle<()>>>,
    central_task: Mutex<Option<JoinHandle<()>>>,
}

impl BtleplugTransport {
    /// Open the first Bluetooth adapter and start forwarding its events.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BluetoothUnavailable`] if no adapter is present.
    pub async fn new(events: mpsc::UnboundedSender<TransportEvent>) -> Result<Self> {
        let manager = Manager::new()
            .await
            .map_err(|_e| Error::BluetoothUnavailable)?;

        let adapters = manager.adapters().await.map_err(Error::Bluetooth)?;

        let adapter = adapters
            .into_iter()
            .next()
            .ok_or(Error::BluetoothUnavailable)?;

        info!(
            "Using Bluetooth adapter: {:?}",
            adapter.adapter_info().await.ok()
        );

        Self::with_adapter(adapter, events)
    }

    /// Use a specific adapter. Must be called within a tokio runtime.
    ///
    /// The adapter's current power state is reported once the event pump
    /// is running.
    pub fn with_adapter(
        adapter: Adapter,
        events: mpsc::UnboundedSender<TransportEvent>,
    ) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|e| Error::Internal(e.to_string()))?;

        let inner = Arc::new(Inner {
            adapter,
            runtime,
            events,
            peripherals: RwLock::new(HashMap::new()),
            ids: RwLock::new(HashMap::new()),
            links: Mutex::new(Links::default()),
            notification_tasks: Mutex::new(HashMap::new()),
            central_task: Mutex::new(None),
        });

        let task = inner.runtime.spawn(Inner::run_central_events(inner.clone()));
        *inner.central_task.lock() = Some(task);

        Ok(Self { inner })
    }

    /// Get the underlying adapter.
    pub fn adapter(&self) -> &Adapter {
        &self.inner.adapter
    }
}

impl Drop for BtleplugTransport {
    fn drop(&mut self) {
        if let Some(task) = self.inner.central_task.lock().take() {
            task.abort();
        }
        for (_, task) in self.inner.notification_tasks.lock().drain() {
            task.abort();
        }
    }
}

impl Inner {
    fn send(&self, event: TransportEvent) {
        if self.events.send(event).is_err() {
            trace!("Transport event dropped, session is gone");
        }
    }

    fn peripheral(&self, id: &Uuid) -> Option<Peripheral> {
        self.peripherals.read().get(id).cloned()
    }

    fn session_id(&self, id: &PeripheralId) -> Uuid {
        if let Some(uuid) = self.ids.read().get(id) {
            return *uuid;
        }
        *self.ids.write().entry(id.clone()).or_insert_with(Uuid::new_v4)
    }

    fn characteristic(&self, peripheral: &Uuid, uuid: Uuid) -> Option<Characteristic> {
        self.peripheral(peripheral)?
            .characteristics()
            .into_iter()
            .find(|c| c.uuid == uuid)
    }

    fn descriptor(&self, peripheral: &Uuid, id: DescriptorId) -> Option<Descriptor> {
        self.characteristic(peripheral, id.characteristic)?
            .descriptors
            .into_iter()
            .find(|d| d.uuid == id.uuid)
    }

    async fn run_central_events(self: Arc<Self>) {
        let mut events = match self.adapter.events().await {
            Ok(events) => events,
            Err(e) => {
                error!("Failed to get adapter events: {}", e);
                return;
            }
        };

        match initial_power(self.adapter.adapter_state().await) {
            Some(powered_on) => {
                info!("Adapter powered {}", if powered_on { "on" } else { "off" });
                self.send(TransportEvent::PowerStateChanged { powered_on });
            }
            None => debug!("Adapter power state unknown, waiting for an update"),
        }

        while let Some(event) = events.next().await {
            self.handle_central_event(event).await;
        }

        debug!("Adapter event loop ended");
    }

    async fn handle_central_event(&self, event: CentralEvent) {
        match event {
            CentralEvent::DeviceDiscovered(id) | CentralEvent::DeviceUpdated(id) => {
                self.process_peripheral(id).await;
            }
            CentralEvent::DeviceConnected(id) => {
                trace!("Device connected: {:?}", id);
            }
            CentralEvent::DeviceDisconnected(id) => {
                debug!("Device disconnected: {:?}", id);
                let uuid = self.ids.read().get(&id).copied();
                if let Some(uuid) = uuid {
                    self.link_down(uuid);
                }
            }
            CentralEvent::StateUpdate(state) => {
                if let Some(powered_on) = power_state(state) {
                    info!("Adapter powered {}", if powered_on { "on" } else { "off" });
                    self.send(TransportEvent::PowerStateChanged { powered_on });
                }
            }
            CentralEvent::ManufacturerDataAdvertisement { .. }
            | CentralEvent::ServiceDataAdvertisement { .. }
            | CentralEvent::ServicesAdvertisement { .. } => {}
        }
    }

    async fn process_peripheral(&self, id: PeripheralId) {
        let peripheral = match self.adapter.peripheral(&id).await {
            Ok(p) => p,
            Err(e) => {
                trace!("Failed to get peripheral: {}", e);
                return;
            }
        };

        let name = match peripheral.properties().await {
            Ok(Some(properties)) => properties.local_name,
            _ => None,
        };

        let uuid = self.session_id(&id);
        self.peripherals.write().insert(uuid, peripheral);
        self.send(TransportEvent::PeripheralDiscovered { id: uuid, name });
    }

    /// Report the end of a link exactly once.
    fn link_down(&self, id: Uuid) {
        let report = self.links.lock().down(id);
        self.finish_link(id, report);
    }

    /// Give up on a link whose disconnect failed.
    fn disconnect_failed(&self, id: Uuid, error: TransportError) {
        let report = self.links.lock().disconnect_failed(id, error);
        self.finish_link(id, report);
    }

    fn finish_link(&self, id: Uuid, report: Option<Option<TransportError>>) {
        let Some(error) = report else {
            return;
        };
        if let Some(task) = self.notification_tasks.lock().remove(&id) {
            task.abort();
        }
        self.send(TransportEvent::Disconnected { id, error });
    }

    fn start_notifications(self: &Arc<Self>, id: Uuid, peripheral: Peripheral) {
        let inner = self.clone();
        let task = self.runtime.spawn(async move {
            let mut notifications = match peripheral.notifications().await {
                Ok(n) => n,
                Err(e) => {
                    error!("Failed to get notifications stream: {}", e);
                    return;
                }
            };

            while let Some(notification) = notifications.next().await {
                trace!(
                    "Notification from {}: {:02X?}",
                    notification.uuid,
                    notification.value
                );
                inner.send(TransportEvent::CharacteristicValue {
                    characteristic: notification.uuid,
                    value: notification.value,
                    received_at: Utc::now(),
                    error: None,
                });
            }

            debug!("Notification stream of {} ended", id);
        });

        if let Some(previous) = self.notification_tasks.lock().insert(id, task) {
            previous.abort();
        }
    }
}

impl Transport for BtleplugTransport {
    fn start_scan(&self) {
        let inner = self.inner.clone();
        self.inner.runtime.spawn(async move {
            if let Err(e) = inner.adapter.start_scan(AdapterScanFilter::default()).await {
                warn!("Failed to start scan: {}", e);
            }
        });
    }

    fn stop_scan(&self) {
        let inner = self.inner.clone();
        self.inner.runtime.spawn(async move {
            if let Err(e) = inner.adapter.stop_scan().await {
                warn!("Failed to stop scan: {}", e);
            }
        });
    }

    fn connect(&self, id: Uuid) {
        let Some(peripheral) = self.inner.peripheral(&id) else {
            self.inner.send(TransportEvent::ConnectResult {
                id,
                error: Some(TransportError::new("unknown peripheral")),
            });
            return;
        };

        self.inner.links.lock().connecting(id);

        let inner = self.inner.clone();
        self.inner.runtime.spawn(async move {
            let error = match peripheral.connect().await {
                Ok(()) => {
                    inner.links.lock().established(id);
                    inner.start_notifications(id, peripheral);
                    None
                }
                Err(e) => {
                    inner.links.lock().connect_failed(id);
                    Some(TransportError::from(e))
                }
            };
            inner.send(TransportEvent::ConnectResult { id, error });
        });
    }

    fn disconnect(&self, id: Uuid) {
        let Some(peripheral) = self.inner.peripheral(&id) else {
            debug!("Disconnect from unknown peripheral {}", id);
            return;
        };

        self.inner.links.lock().request_disconnect(id);

        let inner = self.inner.clone();
        self.inner.runtime.spawn(async move {
            let result = peripheral.disconnect().await;
            // Not every platform reports a disconnect we asked for.
            if !peripheral.is_connected().await.unwrap_or(false) {
                inner.link_down(id);
                return;
            }
            if let Err(e) = result {
                warn!("Failed to disconnect from {}: {}", id, e);
                inner.disconnect_failed(id, e.into());
            }
        });
    }

    fn discover_services(&self, id: Uuid) {
        let Some(peripheral) = self.inner.peripheral(&id) else {
            self.inner.send(TransportEvent::ServicesDiscovered {
                id,
                services: Vec::new(),
                error: Some(TransportError::new("unknown peripheral")),
            });
            return;
        };

        let inner = self.inner.clone();
        self.inner.runtime.spawn(async move {
            let event = match peripheral.discover_services().await {
                Ok(()) => TransportEvent::ServicesDiscovered {
                    id,
                    services: peripheral.services().iter().map(|s| s.uuid).collect(),
                    error: None,
                },
                Err(e) => TransportEvent::ServicesDiscovered {
                    id,
                    services: Vec::new(),
                    error: Some(e.into()),
                },
            };
            inner.send(event);
        });
    }

    fn discover_characteristics(&self, id: Uuid, service: Uuid) {
        // btleplug resolves the whole GATT table during service discovery.
        let found = self
            .inner
            .peripheral(&id)
            .and_then(|p| p.services().into_iter().find(|s| s.uuid == service));

        let event = match found {
            Some(service) => TransportEvent::CharacteristicsDiscovered {
                service: service.uuid,
                characteristics: service.characteristics.iter().map(|c| c.uuid).collect(),
                error: None,
            },
            None => TransportEvent::CharacteristicsDiscovered {
                service,
                characteristics: Vec::new(),
                error: Some(TransportError::new("unknown service")),
            },
        };
        self.inner.send(event);
    }

    fn discover_descriptors(&self, id: Uuid, characteristic: Uuid) {
        let event = match self.inner.characteristic(&id, characteristic) {
            Some(c) => TransportEvent::DescriptorsDiscovered {
                characteristic,
                descriptors: c
                    .descriptors
                    .iter()
                    .map(|d| DescriptorId::new(characteristic, d.uuid))
                    .collect(),
                error: None,
            },
            None => TransportEvent::DescriptorsDiscovered {
                characteristic,
                descriptors: Vec::new(),
                error: Some(TransportError::new("unknown characteristic")),
            },
        };
        self.inner.send(event);
    }

    fn read_characteristic(&self, id: Uuid, characteristic: Uuid) {
        let (Some(peripheral), Some(target)) = (
            self.inner.peripheral(&id),
            self.inner.characteristic(&id, characteristic),
        ) else {
            self.inner.send(TransportEvent::CharacteristicValue {
                characteristic,
                value: Vec::new(),
                received_at: Utc::now(),
                error: Some(TransportError::new("unknown characteristic")),
            });
            return;
        };

        if !target.properties.contains(CharPropFlags::READ) {
            debug!("Characteristic {} is not readable", characteristic);
            return;
        }

        let inner = self.inner.clone();
        self.inner.runtime.spawn(async move {
            let result = peripheral.read(&target).await;
            let received_at = Utc::now();
            let event = match result {
                Ok(value) => TransportEvent::CharacteristicValue {
                    characteristic,
                    value,
                    received_at,
                    error: None,
                },
                Err(e) => TransportEvent::CharacteristicValue {
                    characteristic,
                    value: Vec::new(),
                    received_at,
                    error: Some(e.into()),
                },
            };
            inner.send(event);
        });
    }

    fn read_descriptor(&self, id: Uuid, descriptor: DescriptorId) {
        let (Some(peripheral), Some(target)) = (
            self.inner.peripheral(&id),
            self.inner.descriptor(&id, descriptor),
        ) else {
            self.inner.send(TransportEvent::DescriptorValue {
                descriptor,
                value: Vec::new(),
                error: Some(TransportError::new("unknown descriptor")),
            });
            return;
        };

        let inner = self.inner.clone();
        self.inner.runtime.spawn(async move {
            let event = match peripheral.read_descriptor(&target).await {
                Ok(value) => TransportEvent::DescriptorValue {
                    descriptor,
                    value,
                    error: None,
                },
                Err(e) => TransportEvent::DescriptorValue {
                    descriptor,
                    value: Vec::new(),
                    error: Some(e.into()),
                },
            };
            inner.send(event);
        });
    }

    fn set_notify(&self, id: Uuid, characteristic: Uuid, enabled: bool) {
        let (Some(peripheral), Some(target)) = (
            self.inner.peripheral(&id),
            self.inner.characteristic(&id, characteristic),
        ) else {
            debug!("Cannot change notifications of unknown {}", characteristic);
            return;
        };

        if !target
            .properties
            .intersects(CharPropFlags::NOTIFY | CharPropFlags::INDICATE)
        {
            trace!("Characteristic {} does not notify", characteristic);
            return;
        }

        self.inner.runtime.spawn(async move {
            let result = if enabled {
                peripheral.subscribe(&target).await
            } else {
                peripheral.unsubscribe(&target).await
            };
            match result {
                Ok(()) => debug!(
                    "Notifications for {} {}",
                    characteristic,
                    if enabled { "enabled" } else { "disabled" }
                ),
                Err(e) => warn!("Failed to change notifications for {}: {}", characteristic, e),
            }
        });
    }
}

/// Link bookkeeping per peripheral.
///
/// Every established link is reported down exactly once, with no error if we
/// asked for it.
#[derive(Debug, Default)]
struct Links {
    connected: HashSet<Uuid>,
    disconnect_requested: HashSet<Uuid>,
}

impl Links {
    fn connecting(&mut self, id: Uuid) {
        self.disconnect_requested.remove(&id);
    }

    fn established(&mut self, id: Uuid) {
        self.connected.insert(id);
    }

    fn connect_failed(&mut self, id: Uuid) {
        self.disconnect_requested.remove(&id);
    }

    fn request_disconnect(&mut self, id: Uuid) {
        self.disconnect_requested.insert(id);
    }

    /// The error to report for a link that went down, or `None` if there
    /// is nothing left to report.
    fn down(&mut self, id: Uuid) -> Option<Option<TransportError>> {
        let requested = self.disconnect_requested.remove(&id);
        if !self.connected.remove(&id) {
            return None;
        }
        if requested {
            Some(None)
        } else {
            Some(Some(TransportError::new("connection lost")))
        }
    }

    fn disconnect_failed(
        &mut self,
        id: Uuid,
        error: TransportError,
    ) -> Option<Option<TransportError>> {
        self.disconnect_requested.remove(&id);
        self.connected.remove(&id).then_some(Some(error))
    }
}

/// Map an adapter state to radio power, if known.
fn power_state(state: CentralState) -> Option<bool> {
    match state {
        CentralState::PoweredOn => Some(true),
        CentralState::PoweredOff => Some(false),
        _ => None,
    }
}

/// Radio power at startup. Nothing is assumed if the adapter cannot tell.
fn initial_power(state: btleplug::Result<CentralState>) -> Option<bool> {
    match state {
        Ok(state) => power_state(state),
        Err(e) => {
            warn!("Failed to read adapter state: {}", e);
            None
        }
    }
}
