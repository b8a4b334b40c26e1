//! Bluetooth identifiers for Atmotube devices.
//!
//! This module contains the manufacturer id used in advertisements and the
//! GATT UUIDs read during an active poll.

use uuid::{Uuid, uuid};

/// Manufacturer id under which the Atmotube PRO broadcasts its payloads.
pub const MANUFACTURER_ID: u16 = 0xFFFF;

/// Atmotube custom GATT service.
pub const ATMOTUBE_SERVICE: Uuid = uuid!("db450001-8e9a-4818-add7-6ed94a328ab4");

// --- Atmotube Characteristic UUIDs ---

/// VOC concentration characteristic.
pub const VOC: Uuid = uuid!("db450002-8e9a-4818-add7-6ed94a328ab4");

/// BME280 environmental characteristic (humidity, temperature, pressure).
pub const ENVIRONMENTAL: Uuid = uuid!("db450003-8e9a-4818-add7-6ed94a328ab4");

/// Status characteristic (info byte and battery).
pub const STATUS: Uuid = uuid!("db450004-8e9a-4818-add7-6ed94a328ab4");

/// Particulate matter characteristic (PM1, PM2.5, PM10, PM4).
pub const PARTICULATE: Uuid = uuid!("db450005-8e9a-4818-add7-6ed94a328ab4");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_characteristics_share_service_base() {
        for uuid in [VOC, ENVIRONMENTAL, STATUS, PARTICULATE] {
            assert!(uuid.to_string().ends_with("-8e9a-4818-add7-6ed94a328ab4"));
            assert_ne!(uuid, ATMOTUBE_SERVICE);
        }
    }

    #[test]
    fn test_characteristics_are_distinct() {
        let all = [VOC, ENVIRONMENTAL, STATUS, PARTICULATE];
        for (i, a) in all.iter().enumerate() {
            for b in &all[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
