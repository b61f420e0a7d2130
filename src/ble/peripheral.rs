//! Discovered peripherals and the scan result list.

use indexmap::IndexMap;
use uuid::Uuid;

/// Identity of a discovered peripheral.
///
/// Handles are ephemeral: they live while the device is visible to the radio
/// or connected, and are never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct PeripheralHandle {
    /// Transport-assigned identifier.
    pub id: Uuid,
    /// Advertised local name, if any.
    pub display_name: Option<String>,
}

impl PeripheralHandle {
    /// Create a new handle.
    pub fn new(id: Uuid, display_name: Option<String>) -> Self {
        Self { id, display_name }
    }

    /// Name to show to a user, falling back to the identifier.
    pub fn label(&self) -> String {
        self.display_name
            .clone()
            .unwrap_or_else(|| self.id.to_string())
    }
}

impl std::fmt::Display for PeripheralHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.display_name {
            Some(name) => write!(f, "{} ({})", name, self.id),
            None => write!(f, "{}", self.id),
        }
    }
}

/// Ordered set of discovered peripherals, deduplicated by id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanResultList {
    entries: IndexMap<Uuid, PeripheralHandle>,
}

impl ScanResultList {
    /// Create an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a handle. Returns `false` if the id was already present.
    pub fn insert(&mut self, handle: PeripheralHandle) -> bool {
        if self.entries.contains_key(&handle.id) {
            return false;
        }
        self.entries.insert(handle.id, handle);
        true
    }

    /// Check whether an id is already listed.
    pub fn contains(&self, id: &Uuid) -> bool {
        self.entries.contains_key(id)
    }

    /// Look up a handle by id.
    pub fn get(&self, id: &Uuid) -> Option<&PeripheralHandle> {
        self.entries.get(id)
    }

    /// Iterate over the known ids in discovery order.
    pub fn ids(&self) -> impl Iterator<Item = &Uuid> {
        self.entries.keys()
    }

    /// Iterate over the handles in discovery order.
    pub fn iter(&self) -> impl Iterator<Item = &PeripheralHandle> {
        self.entries.values()
    }

    /// Copy of the handles in discovery order.
    pub fn to_vec(&self) -> Vec<PeripheralHandle> {
        self.entries.values().cloned().collect()
    }

    /// Remove every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of listed peripherals.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the list is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
