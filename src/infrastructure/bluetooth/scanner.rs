//! Peripheral discovery bookkeeping.

use crate::domain::models::{DiscoveredPeripheral, PeripheralId};
use tracing::debug;

/// Deduplicating discovery set for one scan session.
///
/// Peripherals are kept in order of first sighting; later sightings of
/// the same identity refresh the stored signal strength and are not
/// reported again. Restarting the scan clears the set, so the
/// consumer's device list always reflects the current session. Display
/// ordering (e.g. by signal strength) is the consumer's business.
#[derive(Debug, Default)]
pub struct ScanController {
    discovered: Vec<DiscoveredPeripheral>,
    scanning: bool,
}

impl ScanController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_scanning(&self) -> bool {
        self.scanning
    }

    /// Begin a new scan session, dropping the previous session's results.
    pub fn begin(&mut self) {
        self.discovered.clear();
        self.scanning = true;
    }

    /// Mark the scan stopped. Idempotent. The discovered set survives so
    /// the consumer can still connect to a listed device.
    pub fn stop(&mut self) {
        self.scanning = false;
    }

    /// Record a sighting. Returns the peripheral when it is new to this
    /// session; a duplicate refreshes the stored RSSI and returns `None`.
    pub fn observe(
        &mut self,
        id: PeripheralId,
        name: Option<String>,
        rssi: Option<i16>,
    ) -> Option<&DiscoveredPeripheral> {
        if let Some(existing) = self.discovered.iter_mut().find(|p| p.id == id) {
            if rssi.is_some() {
                existing.rssi = rssi;
            }
            debug!("Repeat sighting of {}", id);
            return None;
        }
        self.discovered.push(DiscoveredPeripheral { id, name, rssi });
        self.discovered.last()
    }

    /// Peripherals discovered so far, in order of first sighting.
    pub fn discovered(&self) -> &[DiscoveredPeripheral] {
        &self.discovered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicates_are_suppressed() {
        let mut scanner = ScanController::new();
        scanner.begin();

        assert!(scanner.observe(PeripheralId(1), Some("HMSoft".into()), Some(-60)).is_some());
        assert!(scanner.observe(PeripheralId(2), None, Some(-80)).is_some());
        assert!(scanner.observe(PeripheralId(1), Some("HMSoft".into()), Some(-55)).is_none());

        let listed = scanner.discovered();
        assert_eq!(listed.len(), 2);
        // First occurrence wins for ordering, signal strength refreshes.
        assert_eq!(listed[0].id, PeripheralId(1));
        assert_eq!(listed[0].rssi, Some(-55));
    }

    #[test]
    fn test_rssi_not_erased_by_sighting_without_signal() {
        let mut scanner = ScanController::new();
        scanner.begin();
        scanner.observe(PeripheralId(7), None, Some(-42));
        scanner.observe(PeripheralId(7), None, None);
        assert_eq!(scanner.discovered()[0].rssi, Some(-42));
    }

    #[test]
    fn test_restart_clears_previous_session() {
        let mut scanner = ScanController::new();
        scanner.begin();
        scanner.observe(PeripheralId(1), None, Some(-60));
        scanner.stop();

        scanner.begin();
        assert!(scanner.discovered().is_empty());
        // The same identity is a fresh discovery in the new session.
        assert!(scanner.observe(PeripheralId(1), None, Some(-61)).is_some());
    }

    #[test]
    fn test_stop_is_idempotent() {
        let mut scanner = ScanController::new();
        scanner.stop();
        scanner.begin();
        scanner.stop();
        scanner.stop();
        assert!(!scanner.is_scanning());
    }
}
