//! Serial link lifecycle.
//!
//! One [`Connection`] models one attempt/session against a single
//! peripheral: created fresh on every `connect`, dropped on teardown, so
//! nothing leaks between attempts. The GATT negotiation steps — link up,
//! service discovery, characteristic discovery, notification
//! subscription — each advance the phase explicitly; the service drives
//! the radio between steps.

use crate::domain::error::SerialError;
use crate::domain::models::{LinkPhase, PeripheralId, WriteMode};
use crate::infrastructure::bluetooth::radio::{CharacteristicHandle, ServiceHandle};

#[derive(Debug)]
pub struct Connection {
    peripheral: PeripheralId,
    phase: LinkPhase,
    write_mode: WriteMode,
    /// Service probes still awaiting a characteristics callback.
    pending_probes: usize,
    /// Matched characteristic, staged until the subscription confirms.
    pending_characteristic: Option<CharacteristicHandle>,
    /// Write target. Present exactly while the phase is `Ready`.
    write_characteristic: Option<CharacteristicHandle>,
}

impl Connection {
    pub fn new(peripheral: PeripheralId, write_mode: WriteMode) -> Self {
        Self {
            peripheral,
            phase: LinkPhase::Connecting,
            write_mode,
            pending_probes: 0,
            pending_characteristic: None,
            write_characteristic: None,
        }
    }

    pub fn peripheral(&self) -> PeripheralId {
        self.peripheral
    }

    pub fn phase(&self) -> LinkPhase {
        self.phase
    }

    pub fn write_mode(&self) -> WriteMode {
        self.write_mode
    }

    pub fn is_ready(&self) -> bool {
        self.phase == LinkPhase::Ready
    }

    pub fn is_disconnecting(&self) -> bool {
        self.phase == LinkPhase::Disconnecting
    }

    /// Write target, present only while the link is ready.
    pub fn write_target(&self) -> Option<CharacteristicHandle> {
        self.write_characteristic
    }

    /// Link established; next step is service discovery.
    pub fn link_established(&mut self) {
        self.phase = LinkPhase::DiscoveringServices;
    }

    /// Services reported. An empty result means the peripheral does not
    /// speak the serial profile; otherwise every returned service gets
    /// probed for the serial characteristic, and the returned list says
    /// which.
    pub fn services_found(
        &mut self,
        services: Vec<ServiceHandle>,
    ) -> Result<Vec<ServiceHandle>, SerialError> {
        if services.is_empty() {
            return Err(SerialError::IncompatibleDevice);
        }
        self.pending_probes = services.len();
        self.phase = LinkPhase::DiscoveringCharacteristic;
        Ok(services)
    }

    /// One service's probe came back; `matched` carries the serial
    /// characteristic when that service had it.
    ///
    /// Returns `Ok(Some(handle))` when it is time to subscribe,
    /// `Ok(None)` while other probes are still outstanding (or the
    /// subscription is already underway), and `IncompatibleDevice` once
    /// every probe has come back empty.
    pub fn characteristic_probe(
        &mut self,
        matched: Option<CharacteristicHandle>,
    ) -> Result<Option<CharacteristicHandle>, SerialError> {
        self.pending_probes = self.pending_probes.saturating_sub(1);

        if let Some(handle) = matched {
            if self.phase == LinkPhase::DiscoveringCharacteristic {
                self.phase = LinkPhase::Subscribing;
                self.pending_characteristic = Some(handle);
                return Ok(Some(handle));
            }
            // A second service also carries the characteristic; the
            // first match is already subscribing.
            return Ok(None);
        }

        if self.pending_probes == 0 && self.phase == LinkPhase::DiscoveringCharacteristic {
            return Err(SerialError::IncompatibleDevice);
        }
        Ok(None)
    }

    /// Subscription confirmed: the staged handle becomes the write
    /// target and the link is usable.
    pub fn subscribed(&mut self) {
        self.write_characteristic = self.pending_characteristic.take();
        self.phase = LinkPhase::Ready;
    }

    /// User-initiated teardown has been requested; the write target is
    /// revoked immediately.
    pub fn begin_disconnect(&mut self) {
        self.write_characteristic = None;
        self.phase = LinkPhase::Disconnecting;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connection() -> Connection {
        Connection::new(PeripheralId(42), WriteMode::WithoutResponse)
    }

    #[test]
    fn test_write_target_present_only_when_ready() {
        let mut conn = connection();
        assert_eq!(conn.write_target(), None);

        conn.link_established();
        assert_eq!(conn.write_target(), None);

        conn.services_found(vec![ServiceHandle(1)]).unwrap();
        assert_eq!(conn.write_target(), None);

        let handle = CharacteristicHandle(9);
        assert_eq!(conn.characteristic_probe(Some(handle)), Ok(Some(handle)));
        assert_eq!(conn.phase(), LinkPhase::Subscribing);
        assert_eq!(conn.write_target(), None);

        conn.subscribed();
        assert!(conn.is_ready());
        assert_eq!(conn.write_target(), Some(handle));

        conn.begin_disconnect();
        assert_eq!(conn.write_target(), None);
    }

    #[test]
    fn test_no_services_is_incompatible() {
        let mut conn = connection();
        conn.link_established();
        assert_eq!(conn.services_found(vec![]), Err(SerialError::IncompatibleDevice));
    }

    #[test]
    fn test_all_probes_empty_is_incompatible() {
        let mut conn = connection();
        conn.link_established();
        conn.services_found(vec![ServiceHandle(1), ServiceHandle(2)])
            .unwrap();

        assert_eq!(conn.characteristic_probe(None), Ok(None));
        assert_eq!(conn.characteristic_probe(None), Err(SerialError::IncompatibleDevice));
    }

    #[test]
    fn test_late_probe_match_does_not_resubscribe() {
        let mut conn = connection();
        conn.link_established();
        conn.services_found(vec![ServiceHandle(1), ServiceHandle(2)])
            .unwrap();

        let first = CharacteristicHandle(5);
        assert_eq!(conn.characteristic_probe(Some(first)), Ok(Some(first)));
        // The trailing probe also matched, but a subscription is in flight.
        assert_eq!(conn.characteristic_probe(Some(CharacteristicHandle(6))), Ok(None));

        conn.subscribed();
        assert_eq!(conn.write_target(), Some(first));
    }
}
