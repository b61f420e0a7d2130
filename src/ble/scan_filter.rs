//! Advertisement filtering.
//!
//! Decides which advertised devices are SmartHome sensor peripherals.

use uuid::Uuid;

use crate::ble::uuids::PRODUCT_NAME_PREFIX;

/// Predicate selecting candidate peripherals from advertisements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanFilter {
    name_prefix: String,
}

impl ScanFilter {
    /// Create a filter matching names that start with `name_prefix`.
    pub fn new(name_prefix: impl Into<String>) -> Self {
        Self {
            name_prefix: name_prefix.into(),
        }
    }

    /// The required name prefix.
    pub fn name_prefix(&self) -> &str {
        &self.name_prefix
    }

    /// Check whether an advertised name matches the product prefix.
    ///
    /// The match is case-sensitive and a missing name never matches.
    pub fn matches_name(&self, advertised_name: Option<&str>) -> bool {
        advertised_name
            .map(|name| name.starts_with(self.name_prefix.as_str()))
            .unwrap_or(false)
    }

    /// Decide whether `candidate` should be added to the scan results.
    ///
    /// True iff the advertised name is present, starts with the product
    /// prefix, and the candidate is not one of `known_ids`.
    pub fn accept<'a, I>(&self, advertised_name: Option<&str>, known_ids: I, candidate: &Uuid) -> bool
    where
        I: IntoIterator<Item = &'a Uuid>,
    {
        self.matches_name(advertised_name) && !known_ids.into_iter().any(|id| id == candidate)
    }
}

impl Default for ScanFilter {
    fn default() -> Self {
        Self::new(PRODUCT_NAME_PREFIX)
    }
}
