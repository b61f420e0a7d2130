//! Sensor time series.

use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;

/// One discovered characteristic's time series.
///
/// The series is created nameless when its characteristic is discovered; the
/// name arrives later from the characteristic's user description descriptor.
/// `values` and `timestamps` always have the same length.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct SensorSeries {
    characteristic_id: Uuid,
    name: String,
    values: Vec<f64>,
    timestamps: Vec<f64>,
}

impl SensorSeries {
    /// Create an empty, unnamed series.
    pub fn new(characteristic_id: Uuid) -> Self {
        Self {
            characteristic_id,
            name: String::new(),
            values: Vec::new(),
            timestamps: Vec::new(),
        }
    }

    /// The characteristic this series belongs to.
    pub fn characteristic_id(&self) -> Uuid {
        self.characteristic_id
    }

    /// Sensor name, empty until the user description resolved.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the name has been discovered.
    pub fn is_named(&self) -> bool {
        !self.name.is_empty()
    }

    /// Recorded values, oldest first.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Arrival times of the recorded values, seconds since the Unix epoch.
    pub fn timestamps(&self) -> &[f64] {
        &self.timestamps
    }

    /// Number of recorded samples.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if no samples are recorded.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Most recent value.
    pub fn latest(&self) -> Option<f64> {
        self.values.last().copied()
    }

    /// Arrival time of the first recorded sample.
    pub fn first_timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamps.first().and_then(|t| datetime_from_secs(*t))
    }

    /// Arrival time of the most recent sample.
    pub fn last_timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamps.last().and_then(|t| datetime_from_secs(*t))
    }

    /// Chart points: x is minutes since the first sample, y is the value.
    pub fn chart_points(&self) -> Vec<(f64, f64)> {
        let Some(start) = self.timestamps.first().copied() else {
            return Vec::new();
        };

        self.timestamps
            .iter()
            .zip(&self.values)
            .map(|(t, v)| ((t - start) / 60.0, *v))
            .collect()
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }

    pub(crate) fn push(&mut self, value: f64, timestamp: f64) {
        self.values.push(value);
        self.timestamps.push(timestamp);
    }

    pub(crate) fn clear(&mut self) {
        self.values.clear();
        self.timestamps.clear();
    }
}

/// Convert fractional Unix seconds to a UTC timestamp.
pub(crate) fn datetime_from_secs(secs: f64) -> Option<DateTime<Utc>> {
    let millis = (secs * 1000.0).round() as i64;
    Utc.timestamp_millis_opt(millis).single()
}

/// Convert a UTC timestamp to fractional Unix seconds.
pub(crate) fn secs_from_datetime(time: DateTime<Utc>) -> f64 {
    time.timestamp_millis() as f64 / 1000.0
}
