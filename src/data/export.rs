//! JSON export of recorded sensor data.
//!
//! The export is a JSON array with one object per series:
//!
//! ```text
//! [{"name": "CO2", "value": [400.5]},{"name": "Temp", "value": []}]
//! ```
//!
//! The layout is part of the format: a space after each key colon and no
//! space between objects.

use serde::{Deserialize, Serialize};

use crate::data::sensor::SensorSeries;
use crate::error::Result;

/// One exported series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRecord {
    /// Sensor name.
    pub name: String,
    /// Recorded values, oldest first.
    pub value: Vec<f64>,
}

impl From<&SensorSeries> for ExportRecord {
    fn from(series: &SensorSeries) -> Self {
        Self {
            name: series.name().to_string(),
            value: series.values().to_vec(),
        }
    }
}

/// Render records in the export layout.
pub fn to_json(records: &[ExportRecord]) -> Result<String> {
    let mut out = String::from("[");
    for (i, record) in records.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str("{\"name\": ");
        out.push_str(&serde_json::to_string(&record.name)?);
        out.push_str(", \"value\": ");
        out.push_str(&serde_json::to_string(&record.value)?);
        out.push('}');
    }
    out.push(']');
    Ok(out)
}

/// Parse an export back into records.
pub fn from_json(json: &str) -> Result<Vec<ExportRecord>> {
    Ok(serde_json::from_str(json)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn record(name: &str, value: &[f64]) -> ExportRecord {
        ExportRecord {
            name: name.to_string(),
            value: value.to_vec(),
        }
    }

    #[test]
    fn test_exact_layout() {
        let json = to_json(&[record("CO2", &[400.5]), record("Temp", &[])]).unwrap();
        assert_eq!(
            json,
            r#"[{"name": "CO2", "value": [400.5]},{"name": "Temp", "value": []}]"#
        );
    }

    #[test]
    fn test_empty_export_is_valid_json() {
        let json = to_json(&[]).unwrap();
        assert_eq!(json, "[]");
        assert_eq!(from_json(&json).unwrap(), vec![]);
    }

    #[test]
    fn test_names_are_escaped() {
        let records = vec![record("Temp \"inside\"", &[21.5, 22.0])];
        let json = to_json(&records).unwrap();
        assert!(json.contains(r#""Temp \"inside\"""#));
        assert_eq!(from_json(&json).unwrap(), records);
    }

    #[test]
    fn test_whole_numbers_keep_decimal_point() {
        let json = to_json(&[record("Humidity", &[45.0])]).unwrap();
        assert_eq!(json, r#"[{"name": "Humidity", "value": [45.0]}]"#);
    }
}
