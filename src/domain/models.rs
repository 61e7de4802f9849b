use serde::{Deserialize, Serialize};
use std::fmt;

/// Power/availability state of the local Bluetooth adapter.
///
/// Updated only from radio callbacks. Everything else the core does is
/// gated on [`AdapterState::PoweredOn`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterState {
    Unknown,
    Resetting,
    Unsupported,
    Unauthorized,
    PoweredOff,
    PoweredOn,
}

impl AdapterState {
    /// Whether the adapter can currently scan and connect.
    pub fn is_powered_on(self) -> bool {
        self == AdapterState::PoweredOn
    }
}

/// Opaque identity of a remote peripheral, stable per physical device
/// for the lifetime of the radio stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeripheralId(pub u64);

impl fmt::Display for PeripheralId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#014X}", self.0)
    }
}

/// A peripheral sighted during the current scan session.
///
/// `rssi` is `None` for devices surfaced from the radio's
/// already-connected list, which arrive without a fresh advertisement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredPeripheral {
    pub id: PeripheralId,
    pub name: Option<String>,
    pub rssi: Option<i16>,
}

/// Whether writes wait for peripheral acknowledgment.
///
/// Genuine JNHuaMao HM-10 modules require `WithoutResponse`, while some
/// clones (e.g. Bolutek) only accept `WithResponse`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
    WithResponse,
    #[default]
    WithoutResponse,
}

/// Lifecycle phase of the serial link.
///
/// A session walks `Connecting → DiscoveringServices →
/// DiscoveringCharacteristic → Subscribing → Ready`; teardown passes
/// through `Disconnecting` when a link exists. `Idle` means no
/// connection attempt is in flight at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkPhase {
    Idle,
    Connecting,
    DiscoveringServices,
    DiscoveringCharacteristic,
    Subscribing,
    Ready,
    Disconnecting,
}

/// Point-in-time view of the core's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusSnapshot {
    pub adapter: AdapterState,
    pub phase: LinkPhase,
    pub peripheral: Option<PeripheralId>,
}

impl StatusSnapshot {
    /// Whether the link can send and receive right now.
    pub fn is_ready(&self) -> bool {
        self.adapter.is_powered_on() && self.phase == LinkPhase::Ready
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ready_requires_powered_adapter() {
        let snapshot = StatusSnapshot {
            adapter: AdapterState::PoweredOff,
            phase: LinkPhase::Ready,
            peripheral: Some(PeripheralId(1)),
        };
        assert!(!snapshot.is_ready());
    }

    #[test]
    fn test_peripheral_id_display() {
        assert_eq!(PeripheralId(0xAABBCCDDEEFF).to_string(), "0xAABBCCDDEEFF");
    }
}
