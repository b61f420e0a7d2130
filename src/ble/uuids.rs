//! BLE Service, Characteristic and Descriptor UUIDs.
//!
//! Contains the UUID constants used for SmartHome sensor communication.

use uuid::Uuid;

/// Advertised local name prefix of SmartHome sensor peripherals.
///
/// Firmware names every board `SmartHome_<id>`.
pub const PRODUCT_NAME_PREFIX: &str = "SmartHome";

// SmartHome environmental sensor characteristics (custom)
/// CO2 concentration characteristic UUID (ppm, fixed-point).
pub const CO2_CHARACTERISTIC_UUID: Uuid =
    Uuid::from_u128(0xd7d2905a_1233_11ec_82a8_0242ac130003);

// Standard GATT descriptors (Bluetooth SIG assigned numbers)
/// Characteristic Extended Properties descriptor UUID.
pub const EXTENDED_PROPERTIES_UUID: Uuid = Uuid::from_u128(0x0000_2900_0000_1000_8000_00805f9b34fb);
/// Characteristic User Description descriptor UUID.
pub const USER_DESCRIPTION_UUID: Uuid = Uuid::from_u128(0x0000_2901_0000_1000_8000_00805f9b34fb);
/// Client Characteristic Configuration descriptor UUID.
pub const CLIENT_CONFIGURATION_UUID: Uuid =
    Uuid::from_u128(0x0000_2902_0000_1000_8000_00805f9b34fb);
/// Server Characteristic Configuration descriptor UUID.
pub const SERVER_CONFIGURATION_UUID: Uuid =
    Uuid::from_u128(0x0000_2903_0000_1000_8000_00805f9b34fb);
/// Characteristic Presentation Format descriptor UUID.
pub const PRESENTATION_FORMAT_UUID: Uuid = Uuid::from_u128(0x0000_2904_0000_1000_8000_00805f9b34fb);
/// Characteristic Aggregate Format descriptor UUID.
pub const AGGREGATE_FORMAT_UUID: Uuid = Uuid::from_u128(0x0000_2905_0000_1000_8000_00805f9b34fb);

/// Known GATT descriptor kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DescriptorKind {
    /// Characteristic Extended Properties (0x2900).
    ExtendedProperties,
    /// Characteristic User Description (0x2901).
    UserDescription,
    /// Client Characteristic Configuration (0x2902).
    ClientConfiguration,
    /// Server Characteristic Configuration (0x2903).
    ServerConfiguration,
    /// Characteristic Presentation Format (0x2904).
    PresentationFormat,
    /// Characteristic Aggregate Format (0x2905).
    AggregateFormat,
    /// Anything else.
    Other,
}

impl DescriptorKind {
    /// Classify a descriptor UUID.
    pub fn from_uuid(uuid: &Uuid) -> Self {
        match *uuid {
            EXTENDED_PROPERTIES_UUID => Self::ExtendedProperties,
            USER_DESCRIPTION_UUID => Self::UserDescription,
            CLIENT_CONFIGURATION_UUID => Self::ClientConfiguration,
            SERVER_CONFIGURATION_UUID => Self::ServerConfiguration,
            PRESENTATION_FORMAT_UUID => Self::PresentationFormat,
            AGGREGATE_FORMAT_UUID => Self::AggregateFormat,
            _ => Self::Other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_co2_uuid_format() {
        assert_eq!(
            CO2_CHARACTERISTIC_UUID.to_string(),
            "d7d2905a-1233-11ec-82a8-0242ac130003"
        );
    }

    #[test]
    fn test_descriptor_uuid_format() {
        assert!(USER_DESCRIPTION_UUID.to_string().starts_with("00002901"));
        assert!(CLIENT_CONFIGURATION_UUID.to_string().starts_with("00002902"));
    }

    #[test]
    fn test_descriptor_kind() {
        assert_eq!(
            DescriptorKind::from_uuid(&USER_DESCRIPTION_UUID),
            DescriptorKind::UserDescription
        );
        assert_eq!(
            DescriptorKind::from_uuid(&AGGREGATE_FORMAT_UUID),
            DescriptorKind::AggregateFormat
        );
        assert_eq!(
            DescriptorKind::from_uuid(&CO2_CHARACTERISTIC_UUID),
            DescriptorKind::Other
        );
    }
}
