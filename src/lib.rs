// Allow unusual byte groupings for UUIDs which have standard format
#![allow(clippy::unusual_byte_groupings)]

//! # smarthome-ble
//!
//! A Rust library for reading SmartHome environmental sensor peripherals
//! (CO2, temperature, humidity) over Bluetooth Low Energy.
//!
//! The core is a session state machine that drives scan, connect, GATT
//! discovery, value streaming and disconnect for one peripheral at a time,
//! and keeps a named time series per sensor characteristic.
//!
//! ## Features
//!
//! - **Discovery**: Scan for peripherals advertising a `SmartHome` name
//! - **Sensor naming**: Series are named from each characteristic's user description
//! - **Value validation**: Fixed-point payloads outside plausible bounds are dropped
//! - **Reconnect**: Links lost with an error are re-established automatically
//! - **CO2 alerts**: Show/hide decisions from the latest CO2 reading
//! - **Export**: Recorded values as JSON
//! - **Weather**: Current outdoor conditions from OpenWeatherMap
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use smarthome_ble::{Error, Result, SessionEvent, SmartHomeManager};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let manager = SmartHomeManager::new().await?;
//!     let mut events = manager.subscribe();
//!
//!     // Wait for the radio before scanning
//!     while !manager.is_radio_on() {
//!         match events.recv().await {
//!             Ok(SessionEvent::RadioStateChanged { powered_on: true }) => break,
//!             Ok(_) => {}
//!             Err(_) => return Err(Error::BluetoothUnavailable),
//!         }
//!     }
//!     manager.start_scanning()?;
//!
//!     tokio::time::sleep(std::time::Duration::from_secs(5)).await;
//!
//!     if let Some(peripheral) = manager.scan_results().first() {
//!         println!("Connecting to {}", peripheral);
//!         manager.connect(peripheral.id)?;
//!     }
//!
//!     tokio::time::sleep(std::time::Duration::from_secs(30)).await;
//!
//!     for series in manager.sensor_series() {
//!         println!("{}: {:?}", series.name(), series.latest());
//!     }
//!     println!("{}", manager.export_json()?);
//!
//!     manager.shutdown();
//!     Ok(())
//! }
//! ```
//!
//! ## Custom transports
//!
//! [`SessionStateMachine`] only talks to the radio through the [`Transport`]
//! trait, and learns about results from [`TransportEvent`]s. Use
//! [`SmartHomeManager::with_transport`] to run a session on anything that
//! implements it.
//!
//! ## Platform Notes
//!
//! ### macOS
//! Requires Bluetooth permission. Add `NSBluetoothAlwaysUsageDescription`
//! to your Info.plist for bundled apps.
//!
//! ### Linux
//! Requires BlueZ. User may need to be in the `bluetooth` group.
//!
//! ### Windows
//! Requires Windows 10 or later with Bluetooth LE support.
//!
//! ## Feature Flags
//!
//! - `serialize`: Enable serialization/deserialization for data types

// Public modules
pub mod ble;
pub mod config;
pub mod data;
pub mod error;
pub mod events;
pub mod manager;
pub mod session;
pub mod weather;

// Re-exports for convenience
pub use config::{ReconnectPolicy, SessionConfig};
pub use error::{Error, Result, TransportError};
pub use events::{CallbackHandle, EventBus, SessionEvent};
pub use manager::SmartHomeManager;
pub use session::{Connection, LinkPhase, SessionState, SessionStateMachine, SessionStatus};
pub use weather::{OpenWeatherClient, WeatherConfig, WeatherProvider, WeatherReport};

// Re-export commonly used types from submodules
pub use ble::{
    BtleplugTransport, DescriptorId, PeripheralHandle, ScanFilter, Transport, TransportEvent,
    TransportOperation, CO2_CHARACTERISTIC_UUID, PRODUCT_NAME_PREFIX,
};
pub use data::{
    AirQuality, AlertDecision, ExportRecord, NotificationPolicy, SensorRegistry, SensorSeries,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_exports() {
        // Verify that key types are exported
        let _ = std::any::TypeId::of::<SmartHomeManager>();
        let _ = std::any::TypeId::of::<SessionStateMachine>();
        let _ = std::any::TypeId::of::<Error>();
        let _ = std::any::TypeId::of::<SensorSeries>();
        let _ = std::any::TypeId::of::<SessionEvent>();
        let _ = std::any::TypeId::of::<OpenWeatherClient>();
        let _ = std::any::TypeId::of::<BtleplugTransport>();
    }

    #[test]
    fn test_product_constants() {
        assert_eq!(PRODUCT_NAME_PREFIX, "SmartHome");
        assert_eq!(
            CO2_CHARACTERISTIC_UUID.to_string(),
            "d7d2905a-1233-11ec-82a8-0242ac130003"
        );
    }
}
