//! BLE communication module.
//!
//! This module holds the radio-facing pieces of a sensor session: the
//! transport boundary and its btleplug implementation, scan filtering and
//! the characteristic value decoder.

pub mod adapter;
pub mod decoder;
pub mod peripheral;
pub mod scan_filter;
pub mod transport;
pub mod uuids;

pub use adapter::BtleplugTransport;
pub use decoder::{decode, Decoded, RejectReason, Sample};
pub use peripheral::{PeripheralHandle, ScanResultList};
pub use scan_filter::ScanFilter;
pub use transport::{DescriptorId, Transport, TransportEvent, TransportOperation};
pub use uuids::*;
