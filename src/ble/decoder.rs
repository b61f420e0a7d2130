//! Sensor value decoding.
//!
//! Sensor characteristics carry a single reading as an unsigned 32-bit
//! little-endian integer holding the value multiplied by 100:
//!
//! | Bytes | Content                         |
//! |-------|---------------------------------|
//! | 0..4  | `u32` LE, `value = raw / 100.0` |
//!
//! Readings outside `[-20.0, 5000.0]` are treated as transmission errors
//! and dropped.

use bytes::Buf;

/// Exact payload length of a sensor reading.
pub const VALUE_PAYLOAD_LEN: usize = 4;

/// Fixed-point scale: two implied decimal digits.
pub const FIXED_POINT_SCALE: f64 = 100.0;

/// Lowest physically plausible reading.
pub const MIN_PLAUSIBLE_VALUE: f64 = -20.0;

/// Highest physically plausible reading.
pub const MAX_PLAUSIBLE_VALUE: f64 = 5000.0;

/// A decoded, validated reading.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct Sample {
    /// Decoded value.
    pub value: f64,
    /// Arrival wall-clock time, seconds since the Unix epoch.
    pub timestamp: f64,
}

/// Why a payload was dropped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RejectReason {
    /// Payload was not exactly [`VALUE_PAYLOAD_LEN`] bytes.
    Malformed {
        /// Length of the rejected payload.
        len: usize,
    },
    /// Value fell outside the plausible bounds.
    OutOfRange {
        /// The implausible value.
        value: f64,
    },
}

/// Outcome of decoding a characteristic payload.
///
/// Neither `Empty` nor `Rejected` is an error: both are dropped silently.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Decoded {
    /// Zero-length payload.
    Empty,
    /// Payload dropped as malformed or implausible.
    Rejected(RejectReason),
    /// Accepted reading.
    Sample(Sample),
}

impl Decoded {
    /// The accepted sample, if any.
    pub fn sample(&self) -> Option<Sample> {
        match self {
            Self::Sample(sample) => Some(*sample),
            _ => None,
        }
    }
}

/// Check a value against the plausibility bounds.
#[inline]
pub fn is_plausible(value: f64) -> bool {
    // Lower bound is unreachable for unsigned payloads.
    !(value < MIN_PLAUSIBLE_VALUE || value > MAX_PLAUSIBLE_VALUE)
}

/// Decode a raw characteristic payload received at `timestamp`.
///
/// # Example
///
/// ```
/// use smarthome_ble::ble::decoder::{decode, Decoded};
///
/// let decoded = decode(&40050u32.to_le_bytes(), 1_700_000_000.0);
/// assert_eq!(decoded.sample().map(|s| s.value), Some(400.5));
/// assert_eq!(decode(&[], 0.0), Decoded::Empty);
/// ```
pub fn decode(payload: &[u8], timestamp: f64) -> Decoded {
    if payload.is_empty() {
        return Decoded::Empty;
    }

    if payload.len() != VALUE_PAYLOAD_LEN {
        return Decoded::Rejected(RejectReason::Malformed { len: payload.len() });
    }

    let mut buf = payload;
    let raw = buf.get_u32_le();
    let value = raw as f64 / FIXED_POINT_SCALE;

    if !is_plausible(value) {
        return Decoded::Rejected(RejectReason::OutOfRange { value });
    }

    Decoded::Sample(Sample { value, timestamp })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_decode_fixed_point() {
        let decoded = decode(&[0x71, 0x9C, 0x00, 0x00], 12.5);
        assert_eq!(
            decoded,
            Decoded::Sample(Sample {
                value: 400.49,
                timestamp: 12.5
            })
        );
    }

    #[test]
    fn test_decode_is_little_endian() {
        // 0x00000190 = 400 -> 4.0
        assert_eq!(decode(&[0x90, 0x01, 0x00, 0x00], 0.0).sample().map(|s| s.value), Some(4.0));
        // 400 sent big-endian decodes far out of range
        assert!(matches!(
            decode(&[0x00, 0x00, 0x01, 0x90], 0.0),
            Decoded::Rejected(RejectReason::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_decode_empty_payload() {
        assert_eq!(decode(&[], 1.0), Decoded::Empty);
        assert_eq!(decode(&[], 1.0).sample(), None);
    }

    #[test]
    fn test_decode_malformed_lengths() {
        assert_eq!(
            decode(&[1, 2, 3], 0.0),
            Decoded::Rejected(RejectReason::Malformed { len: 3 })
        );
        assert_eq!(
            decode(&[1, 2, 3, 4, 5], 0.0),
            Decoded::Rejected(RejectReason::Malformed { len: 5 })
        );
    }

    #[test]
    fn test_decode_upper_bound_inclusive() {
        assert_eq!(
            decode(&500_000u32.to_le_bytes(), 0.0).sample().map(|s| s.value),
            Some(5000.0)
        );
        assert_eq!(
            decode(&500_001u32.to_le_bytes(), 0.0),
            Decoded::Rejected(RejectReason::OutOfRange { value: 5000.01 })
        );
        assert!(matches!(
            decode(&u32::MAX.to_le_bytes(), 0.0),
            Decoded::Rejected(RejectReason::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_is_plausible_bounds() {
        assert!(is_plausible(-20.0));
        assert!(is_plausible(0.0));
        assert!(is_plausible(5000.0));
        assert!(!is_plausible(-20.01));
        assert!(!is_plausible(5000.01));
    }

    proptest! {
        #[test]
        fn prop_decode_accepts_plausible_range(y in 0u32..=429_999) {
            let decoded = decode(&y.to_le_bytes(), 3.0);
            prop_assert_eq!(
                decoded,
                Decoded::Sample(Sample { value: y as f64 / 100.0, timestamp: 3.0 })
            );
        }

        #[test]
        fn prop_decode_rejects_above_bound(y in 500_001u32..=u32::MAX) {
            let rejected = matches!(
                decode(&y.to_le_bytes(), 0.0),
                Decoded::Rejected(RejectReason::OutOfRange { .. })
            );
            prop_assert!(rejected);
        }
    }
}
