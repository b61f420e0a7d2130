//! Registry of discovered sensor series.

use indexmap::IndexMap;
use tracing::{debug, trace};
use uuid::Uuid;

use crate::data::export::ExportRecord;
use crate::data::sensor::SensorSeries;

/// Maps characteristic identities to named sensor series.
///
/// Entries keep their registration order, which is also the export order.
#[derive(Debug, Clone, Default)]
pub struct SensorRegistry {
    series: IndexMap<Uuid, SensorSeries>,
}

impl SensorRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an unnamed, empty series for `characteristic_id` unless one exists.
    ///
    /// Returns `true` if a new series was created.
    pub fn register_if_absent(&mut self, characteristic_id: Uuid) -> bool {
        if self.series.contains_key(&characteristic_id) {
            return false;
        }
        debug!("Registered sensor characteristic {}", characteristic_id);
        self.series
            .insert(characteristic_id, SensorSeries::new(characteristic_id));
        true
    }

    /// Give a series its name.
    ///
    /// Only the first non-empty name sticks. Returns `true` exactly when the
    /// name went from empty to non-empty.
    pub fn set_name(&mut self, characteristic_id: Uuid, name: &str) -> bool {
        if name.is_empty() {
            return false;
        }

        match self.series.get_mut(&characteristic_id) {
            Some(series) if !series.is_named() => {
                debug!("Characteristic {} named \"{}\"", characteristic_id, name);
                series.set_name(name.to_string());
                true
            }
            Some(series) => {
                trace!(
                    "Characteristic {} already named \"{}\", ignoring \"{}\"",
                    characteristic_id,
                    series.name(),
                    name
                );
                false
            }
            None => {
                debug!("Name for unknown characteristic {} ignored", characteristic_id);
                false
            }
        }
    }

    /// Append a sample to a named series.
    ///
    /// Unknown or still unnamed series buffer nothing; returns `true` if the
    /// sample was stored.
    pub fn append_sample(&mut self, characteristic_id: Uuid, value: f64, timestamp: f64) -> bool {
        match self.series.get_mut(&characteristic_id) {
            Some(series) if series.is_named() => {
                series.push(value, timestamp);
                true
            }
            Some(_) => {
                trace!(
                    "Dropping sample {} for unnamed characteristic {}",
                    value,
                    characteristic_id
                );
                false
            }
            None => false,
        }
    }

    /// Truncate one series' buffers, keeping the entry.
    ///
    /// Returns `false` if the characteristic is unknown.
    pub fn clear_series(&mut self, characteristic_id: Uuid) -> bool {
        match self.series.get_mut(&characteristic_id) {
            Some(series) => {
                series.clear();
                true
            }
            None => false,
        }
    }

    /// Truncate every series' buffers, keeping the entries.
    pub fn clear_values(&mut self) {
        for series in self.series.values_mut() {
            series.clear();
        }
    }

    /// Remove every entry.
    pub fn clear_all(&mut self) {
        self.series.clear();
    }

    /// Look up a series.
    pub fn get(&self, characteristic_id: &Uuid) -> Option<&SensorSeries> {
        self.series.get(characteristic_id)
    }

    /// Check whether a characteristic is registered.
    pub fn contains(&self, characteristic_id: &Uuid) -> bool {
        self.series.contains_key(characteristic_id)
    }

    /// Iterate over the series in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &SensorSeries> {
        self.series.values()
    }

    /// Copy of every series in registration order.
    pub fn snapshot(&self) -> Vec<SensorSeries> {
        self.series.values().cloned().collect()
    }

    /// Number of registered series.
    pub fn len(&self) -> usize {
        self.series.len()
    }

    /// Check if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Export records for every series in registration order.
    pub fn export_records(&self) -> Vec<ExportRecord> {
        self.series.values().map(ExportRecord::from).collect()
    }

    /// Render the registry in the JSON export format.
    pub fn export_json(&self) -> crate::Result<String> {
        crate::data::export::to_json(&self.export_records())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const CO2: Uuid = Uuid::from_u128(0xC02);
    const TEMP: Uuid = Uuid::from_u128(0x7E3);

    #[test]
    fn test_register_is_idempotent() {
        let mut registry = SensorRegistry::new();
        assert!(registry.register_if_absent(CO2));
        assert!(!registry.register_if_absent(CO2));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(&CO2).map(|s| s.name()), Some(""));
    }

    #[test]
    fn test_append_before_name_is_noop() {
        let mut registry = SensorRegistry::new();
        registry.register_if_absent(CO2);

        assert!(!registry.append_sample(CO2, 400.5, 1.0));
        assert!(registry.get(&CO2).map(|s| s.is_empty()).unwrap_or(false));

        assert!(registry.set_name(CO2, "CO2"));
        assert!(registry.append_sample(CO2, 400.5, 1.0));
        assert_eq!(registry.get(&CO2).map(|s| s.values().to_vec()), Some(vec![400.5]));
    }

    #[test]
    fn test_append_after_name_succeeds() {
        let mut registry = SensorRegistry::new();
        registry.register_if_absent(CO2);
        registry.set_name(CO2, "CO2");

        assert!(registry.append_sample(CO2, 400.5, 1.0));
        assert!(registry.append_sample(CO2, 401.0, 2.0));

        let series = registry.get(&CO2).unwrap();
        assert_eq!(series.values(), &[400.5, 401.0]);
        assert_eq!(series.timestamps(), &[1.0, 2.0]);
    }

    #[test]
    fn test_append_to_unknown_characteristic() {
        let mut registry = SensorRegistry::new();
        assert!(!registry.append_sample(CO2, 400.5, 1.0));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_set_name_transitions_once() {
        let mut registry = SensorRegistry::new();
        registry.register_if_absent(CO2);

        assert!(!registry.set_name(CO2, ""));
        assert!(registry.set_name(CO2, "CO2"));
        assert!(!registry.set_name(CO2, "CO2"));
        assert!(!registry.set_name(CO2, "Carbon dioxide"));
        assert_eq!(registry.get(&CO2).map(|s| s.name()), Some("CO2"));

        assert!(!registry.set_name(TEMP, "Temp"));
        assert!(!registry.contains(&TEMP));
    }

    #[test]
    fn test_clear_series_keeps_entry() {
        let mut registry = SensorRegistry::new();
        registry.register_if_absent(CO2);
        registry.set_name(CO2, "CO2");
        registry.append_sample(CO2, 400.5, 1.0);

        assert!(registry.clear_series(CO2));
        assert!(!registry.clear_series(TEMP));

        let series = registry.get(&CO2).unwrap();
        assert!(series.is_empty());
        assert!(series.timestamps().is_empty());
        assert_eq!(series.name(), "CO2");
    }

    #[test]
    fn test_clear_values_and_clear_all() {
        let mut registry = SensorRegistry::new();
        for (id, name) in [(CO2, "CO2"), (TEMP, "Temp")] {
            registry.register_if_absent(id);
            registry.set_name(id, name);
            registry.append_sample(id, 21.0, 1.0);
        }

        registry.clear_values();
        assert_eq!(registry.len(), 2);
        assert!(registry.iter().all(|s| s.is_empty()));

        registry.clear_all();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_export_in_registration_order() {
        let mut registry = SensorRegistry::new();
        registry.register_if_absent(CO2);
        registry.register_if_absent(TEMP);
        registry.set_name(TEMP, "Temp");
        registry.set_name(CO2, "CO2");
        registry.append_sample(CO2, 400.5, 1.0);

        assert_eq!(
            registry.export_json().unwrap(),
            r#"[{"name": "CO2", "value": [400.5]},{"name": "Temp", "value": []}]"#
        );
    }

    #[test]
    fn test_export_empty_registry() {
        assert_eq!(SensorRegistry::new().export_json().unwrap(), "[]");
    }
}
