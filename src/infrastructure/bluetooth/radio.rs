//! Radio capability boundary.
//!
//! The platform BLE stack (CoreBluetooth, BlueZ, WinRT, a test double)
//! sits behind [`RadioLink`]: the core issues requests through the trait
//! and receives every outcome asynchronously as a [`RadioEvent`] on a
//! single serialized channel. The core never blocks on the radio and
//! never owns platform objects — peripherals, services, and
//! characteristics are referenced through opaque handles minted by the
//! adapter.

use crate::domain::models::{AdapterState, PeripheralId, WriteMode};
use uuid::Uuid;

/// Opaque, revocable reference to a discovered GATT service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ServiceHandle(pub u64);

/// Opaque, revocable reference to a discovered GATT characteristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CharacteristicHandle(pub u64);

/// A characteristic surfaced by discovery, with its UUID for matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacteristicInfo {
    pub handle: CharacteristicHandle,
    pub uuid: Uuid,
}

/// Requests the core issues to the platform radio stack.
///
/// Every operation is fire-and-forget: the stack acknowledges by
/// emitting the matching [`RadioEvent`] on the callback channel handed
/// to the core at construction. Implementations must deliver those
/// events in the order the stack produced them, on one channel — the
/// core's single-threaded state machine depends on it.
pub trait RadioLink: Send {
    /// Current adapter power state. Changes are also delivered as
    /// [`RadioEvent::AdapterStateChanged`].
    fn adapter_state(&self) -> AdapterState;

    /// Start a scan filtered to peripherals advertising `service`.
    /// Sightings arrive as [`RadioEvent::PeripheralDiscovered`].
    fn start_scan(&mut self, service: Uuid);

    /// Stop scanning. Safe to call when no scan is running.
    fn stop_scan(&mut self);

    /// Peripherals the stack already holds a link to that expose
    /// `service` (a bonded device won't advertise while connected).
    fn connected_peripherals(&self, service: Uuid) -> Vec<(PeripheralId, Option<String>)>;

    /// Open a link. Outcome arrives as [`RadioEvent::Connected`] or
    /// [`RadioEvent::ConnectFailed`].
    fn connect(&mut self, peripheral: PeripheralId);

    /// Close an established link or cancel a pending one. An
    /// established link is confirmed down via
    /// [`RadioEvent::Disconnected`]; a cancelled pending connect may
    /// never be confirmed at all.
    fn disconnect(&mut self, peripheral: PeripheralId);

    /// Discover services matching `filter`. Results arrive as
    /// [`RadioEvent::ServicesDiscovered`].
    fn discover_services(&mut self, peripheral: PeripheralId, filter: Uuid);

    /// Discover characteristics of `service` matching `filter`. Results
    /// arrive as [`RadioEvent::CharacteristicsDiscovered`].
    fn discover_characteristics(
        &mut self,
        peripheral: PeripheralId,
        service: ServiceHandle,
        filter: Uuid,
    );

    /// Enable or disable value notifications on a characteristic.
    /// Confirmed via [`RadioEvent::SubscriptionChanged`].
    fn set_notify(
        &mut self,
        peripheral: PeripheralId,
        characteristic: CharacteristicHandle,
        enabled: bool,
    );

    /// Write `bytes` to a characteristic.
    fn write(
        &mut self,
        peripheral: PeripheralId,
        characteristic: CharacteristicHandle,
        bytes: &[u8],
        mode: WriteMode,
    );

    /// Read the signal strength of a connected peripheral. Result
    /// arrives as [`RadioEvent::RssiRead`].
    fn read_rssi(&mut self, peripheral: PeripheralId);
}

/// Callbacks from the platform radio stack, delivered to the core on a
/// single serialized channel (mirroring the platform's delegate queue).
#[derive(Debug, Clone)]
pub enum RadioEvent {
    AdapterStateChanged(AdapterState),
    PeripheralDiscovered {
        peripheral: PeripheralId,
        name: Option<String>,
        rssi: Option<i16>,
    },
    Connected {
        peripheral: PeripheralId,
    },
    ConnectFailed {
        peripheral: PeripheralId,
        error: String,
    },
    /// Link went down — explicit disconnect confirmation or a link-level
    /// drop. `error` is `None` for a clean close.
    Disconnected {
        peripheral: PeripheralId,
        error: Option<String>,
    },
    /// Services matching the requested filter. Empty when the
    /// peripheral has none.
    ServicesDiscovered {
        peripheral: PeripheralId,
        services: Vec<ServiceHandle>,
    },
    /// Characteristics of one probed service matching the filter.
    CharacteristicsDiscovered {
        peripheral: PeripheralId,
        service: ServiceHandle,
        characteristics: Vec<CharacteristicInfo>,
    },
    /// Notification subscription state changed (or failed to).
    SubscriptionChanged {
        peripheral: PeripheralId,
        characteristic: CharacteristicHandle,
        enabled: bool,
        error: Option<String>,
    },
    /// A characteristic value notification pushed by the peripheral.
    NotificationReceived {
        peripheral: PeripheralId,
        characteristic: CharacteristicHandle,
        value: Vec<u8>,
    },
    RssiRead {
        peripheral: PeripheralId,
        rssi: i16,
    },
}
