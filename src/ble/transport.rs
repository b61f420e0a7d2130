//! Transport boundary between the session and the radio stack.
//!
//! The session issues requests through [`Transport`]; none of them block.
//! Results arrive later, serially, as [`TransportEvent`]s.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::TransportError;

/// Identity of a descriptor: its own UUID under its owning characteristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct DescriptorId {
    /// Characteristic the descriptor belongs to.
    pub characteristic: Uuid,
    /// Descriptor UUID.
    pub uuid: Uuid,
}

impl DescriptorId {
    /// Create a descriptor id.
    pub fn new(characteristic: Uuid, uuid: Uuid) -> Self {
        Self {
            characteristic,
            uuid,
        }
    }
}

/// Requests the session issues to the radio stack.
///
/// Implementations must return immediately and report the outcome as a
/// [`TransportEvent`].
#[cfg_attr(test, mockall::automock)]
pub trait Transport: Send + Sync {
    /// Start scanning for advertising peripherals.
    fn start_scan(&self);
    /// Stop scanning.
    fn stop_scan(&self);
    /// Connect to a peripheral.
    fn connect(&self, peripheral: Uuid);
    /// Disconnect from a peripheral.
    fn disconnect(&self, peripheral: Uuid);
    /// Discover the services of a connected peripheral.
    fn discover_services(&self, peripheral: Uuid);
    /// Discover the characteristics of a service.
    fn discover_characteristics(&self, peripheral: Uuid, service: Uuid);
    /// Discover the descriptors of a characteristic.
    fn discover_descriptors(&self, peripheral: Uuid, characteristic: Uuid);
    /// Read a characteristic value once.
    fn read_characteristic(&self, peripheral: Uuid, characteristic: Uuid);
    /// Read a descriptor value.
    fn read_descriptor(&self, peripheral: Uuid, descriptor: DescriptorId);
    /// Enable or disable value change notifications.
    fn set_notify(&self, peripheral: Uuid, characteristic: Uuid, enabled: bool);
}

/// Events delivered by the radio stack.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// Radio power changed.
    PowerStateChanged {
        /// Whether the radio is now powered on.
        powered_on: bool,
    },
    /// A peripheral advertised while scanning.
    PeripheralDiscovered {
        /// Peripheral identifier.
        id: Uuid,
        /// Advertised local name.
        name: Option<String>,
    },
    /// Outcome of a connect request.
    ConnectResult {
        /// Peripheral identifier.
        id: Uuid,
        /// Failure, if the connection was not established.
        error: Option<TransportError>,
    },
    /// The link to a peripheral went down.
    Disconnected {
        /// Peripheral identifier.
        id: Uuid,
        /// Present when the link was lost rather than closed.
        error: Option<TransportError>,
    },
    /// Services of the connected peripheral.
    ServicesDiscovered {
        /// Peripheral identifier.
        id: Uuid,
        /// Discovered service UUIDs.
        services: Vec<Uuid>,
        /// Failure of the discovery.
        error: Option<TransportError>,
    },
    /// Characteristics of a service.
    CharacteristicsDiscovered {
        /// Owning service.
        service: Uuid,
        /// Discovered characteristic UUIDs.
        characteristics: Vec<Uuid>,
        /// Failure of the discovery.
        error: Option<TransportError>,
    },
    /// Descriptors of a characteristic.
    DescriptorsDiscovered {
        /// Owning characteristic.
        characteristic: Uuid,
        /// Discovered descriptors.
        descriptors: Vec<DescriptorId>,
        /// Failure of the discovery.
        error: Option<TransportError>,
    },
    /// A descriptor value was read.
    DescriptorValue {
        /// The descriptor.
        descriptor: DescriptorId,
        /// Raw descriptor value.
        value: Vec<u8>,
        /// Failure of the read.
        error: Option<TransportError>,
    },
    /// A characteristic value was read or notified.
    CharacteristicValue {
        /// The characteristic.
        characteristic: Uuid,
        /// Raw payload.
        value: Vec<u8>,
        /// Arrival wall-clock time.
        received_at: DateTime<Utc>,
        /// Failure of the read.
        error: Option<TransportError>,
    },
}

/// Transport operations, used to label reported failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum TransportOperation {
    /// Connecting to a peripheral.
    Connect,
    /// Link loss.
    Disconnect,
    /// Service discovery.
    DiscoverServices,
    /// Characteristic discovery.
    DiscoverCharacteristics,
    /// Descriptor discovery.
    DiscoverDescriptors,
    /// Descriptor read.
    ReadDescriptor,
    /// Characteristic read or notification.
    ReadCharacteristic,
}

impl std::fmt::Display for TransportOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connect => write!(f, "connect"),
            Self::Disconnect => write!(f, "disconnect"),
            Self::DiscoverServices => write!(f, "discover services"),
            Self::DiscoverCharacteristics => write!(f, "discover characteristics"),
            Self::DiscoverDescriptors => write!(f, "discover descriptors"),
            Self::ReadDescriptor => write!(f, "read descriptor"),
            Self::ReadCharacteristic => write!(f, "read characteristic"),
        }
    }
}
