//! Session configuration.

use uuid::Uuid;

use crate::ble::uuids::{CO2_CHARACTERISTIC_UUID, PRODUCT_NAME_PREFIX};
use crate::data::air_quality::NotificationPolicy;

/// Default number of consecutive automatic reconnects.
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 3;

/// Automatic reconnect policy for links lost with an error.
///
/// Every error disconnect triggers one immediate reconnect attempt, up to
/// `max_attempts` in a row. The budget is restored by a user `connect` and by
/// the first sample accepted after a reconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct ReconnectPolicy {
    /// Maximum consecutive automatic reconnects. Zero disables reconnecting.
    pub max_attempts: u32,
}

impl ReconnectPolicy {
    /// Create a policy allowing `max_attempts` consecutive reconnects.
    pub fn new(max_attempts: u32) -> Self {
        Self { max_attempts }
    }

    /// Policy that never reconnects automatically.
    pub fn disabled() -> Self {
        Self::new(0)
    }

    /// Check whether another attempt is allowed after `attempts_made`.
    pub fn allows(&self, attempts_made: u32) -> bool {
        attempts_made < self.max_attempts
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RECONNECT_ATTEMPTS)
    }
}

/// Configuration of a sensor session.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct SessionConfig {
    /// Advertised name prefix of candidate peripherals.
    pub name_prefix: String,
    /// Characteristic carrying the CO2 reading.
    pub co2_characteristic: Uuid,
    /// Alert policy applied to CO2 samples.
    pub notification_policy: NotificationPolicy,
    /// Reconnect policy for links lost with an error.
    pub reconnect: ReconnectPolicy,
}

impl SessionConfig {
    /// Use a different name prefix.
    pub fn with_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.name_prefix = prefix.into();
        self
    }

    /// Use a different CO2 characteristic.
    pub fn with_co2_characteristic(mut self, uuid: Uuid) -> Self {
        self.co2_characteristic = uuid;
        self
    }

    /// Use a different CO2 alert policy.
    pub fn with_notification_policy(mut self, policy: NotificationPolicy) -> Self {
        self.notification_policy = policy;
        self
    }

    /// Use a different reconnect policy.
    pub fn with_reconnect(mut self, reconnect: ReconnectPolicy) -> Self {
        self.reconnect = reconnect;
        self
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            name_prefix: PRODUCT_NAME_PREFIX.to_string(),
            co2_characteristic: CO2_CHARACTERISTIC_UUID,
            notification_policy: NotificationPolicy::default(),
            reconnect: ReconnectPolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.name_prefix, "SmartHome");
        assert_eq!(config.co2_characteristic, CO2_CHARACTERISTIC_UUID);
        assert_eq!(config.notification_policy.threshold(), 1400.0);
        assert_eq!(config.reconnect.max_attempts, 3);
    }

    #[test]
    fn test_builder() {
        let co2 = Uuid::from_u128(42);
        let config = SessionConfig::default()
            .with_name_prefix("Lab")
            .with_co2_characteristic(co2)
            .with_notification_policy(NotificationPolicy::new(1000.0))
            .with_reconnect(ReconnectPolicy::disabled());

        assert_eq!(config.name_prefix, "Lab");
        assert_eq!(config.co2_characteristic, co2);
        assert_eq!(config.notification_policy.threshold(), 1000.0);
        assert!(!config.reconnect.allows(0));
    }

    #[test]
    fn test_reconnect_budget() {
        let policy = ReconnectPolicy::new(2);
        assert!(policy.allows(0));
        assert!(policy.allows(1));
        assert!(!policy.allows(2));
    }
}
