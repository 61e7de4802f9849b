//! Adapter power-state tracking.

use crate::domain::models::AdapterState;
use tracing::info;

/// Tracks the radio adapter's power state.
///
/// The platform stack does not deliver a disconnect callback when the
/// adapter itself goes down, so losing `PoweredOn` has to tear down any
/// live connection from our side. The monitor records the transition;
/// the service acts on it.
#[derive(Debug)]
pub struct AdapterMonitor {
    state: AdapterState,
}

impl AdapterMonitor {
    pub fn new(initial: AdapterState) -> Self {
        Self { state: initial }
    }

    pub fn state(&self) -> AdapterState {
        self.state
    }

    /// Record a state change, returning the previous state.
    pub fn update(&mut self, new_state: AdapterState) -> AdapterState {
        let old = self.state;
        if old != new_state {
            info!("Adapter state changed: {:?} -> {:?}", old, new_state);
        }
        self.state = new_state;
        old
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_returns_previous_state() {
        let mut monitor = AdapterMonitor::new(AdapterState::Unknown);
        assert_eq!(monitor.update(AdapterState::PoweredOn), AdapterState::Unknown);
        assert_eq!(monitor.state(), AdapterState::PoweredOn);
        assert_eq!(monitor.update(AdapterState::PoweredOff), AdapterState::PoweredOn);
        assert!(!monitor.state().is_powered_on());
    }
}
