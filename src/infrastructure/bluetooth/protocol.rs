//! Well-known identifiers for the BLE serial profile.
//!
//! HM-10 style UART bridges expose a single service `FFE0` containing
//! one notify+write characteristic `FFE1`. Stacks that only accept full
//! UUIDs get the 16-bit short forms expanded onto the Bluetooth SIG base
//! UUID (`0000xxxx-0000-1000-8000-00805F9B34FB`).

use uuid::Uuid;

/// Bluetooth SIG base UUID with the 16-bit short form zeroed out.
const SIG_BASE_UUID: u128 = 0x0000_0000_0000_1000_8000_00805F9B34FB;

/// 16-bit short form of the serial service UUID.
pub const SERIAL_SERVICE_SHORT: u16 = 0xFFE0;

/// 16-bit short form of the serial data characteristic UUID.
pub const SERIAL_CHARACTERISTIC_SHORT: u16 = 0xFFE1;

/// Expand a 16-bit SIG short UUID to its full 128-bit form.
pub fn expand_short_uuid(short: u16) -> Uuid {
    Uuid::from_u128(SIG_BASE_UUID | ((short as u128) << 96))
}

/// Full UUID of the serial service (`FFE0`).
pub fn serial_service_uuid() -> Uuid {
    expand_short_uuid(SERIAL_SERVICE_SHORT)
}

/// Full UUID of the serial data characteristic (`FFE1`).
pub fn serial_characteristic_uuid() -> Uuid {
    expand_short_uuid(SERIAL_CHARACTERISTIC_SHORT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_short_uuid() {
        let uuid = expand_short_uuid(SERIAL_SERVICE_SHORT);
        assert_eq!(uuid.to_string(), "0000ffe0-0000-1000-8000-00805f9b34fb");
    }

    #[test]
    fn test_characteristic_uuid_expansion() {
        let uuid = serial_characteristic_uuid();
        assert_eq!(uuid.to_string(), "0000ffe1-0000-1000-8000-00805f9b34fb");
        assert_ne!(uuid, serial_service_uuid());
    }
}
