//! Recorded sensor data.
//!
//! Named time series per characteristic, their JSON export and the CO2 alert
//! policy.

pub mod air_quality;
pub mod export;
pub mod registry;
pub mod sensor;

pub use air_quality::{AirQuality, AlertDecision, NotificationPolicy};
pub use export::ExportRecord;
pub use registry::SensorRegistry;
pub use sensor::SensorSeries;
