//! Consumer-facing events.
//!
//! The presentation layer registers exactly one [`SerialEvents`]
//! consumer and never touches the radio directly. Two callbacks must be
//! implemented by every consumer; the rest default to no-ops so a
//! consumer only writes the handlers it cares about.

use crate::domain::error::SerialError;
use crate::domain::models::{AdapterState, DiscoveredPeripheral, PeripheralId};
use tracing::trace;

/// Callbacks delivered to the registered consumer.
#[allow(unused_variables)]
pub trait SerialEvents: Send {
    /// The adapter's power state changed (e.g. Bluetooth toggled off).
    fn adapter_state_changed(&mut self, state: AdapterState);

    /// The link went away — explicitly, by link drop, or because the
    /// adapter lost power. `reason` is `None` for a clean user-initiated
    /// disconnect.
    fn disconnected(&mut self, peripheral: PeripheralId, reason: Option<SerialError>);

    /// A peripheral was sighted for the first time this scan session.
    fn peripheral_discovered(&mut self, peripheral: &DiscoveredPeripheral) {}

    /// Link established; GATT negotiation still in progress. Not usable
    /// yet — wait for [`SerialEvents::ready`].
    fn connected(&mut self, peripheral: PeripheralId) {}

    /// Subscription is live; the link can now send and receive.
    fn ready(&mut self, peripheral: PeripheralId) {}

    /// A connection attempt ended without reaching readiness.
    fn connect_failed(&mut self, peripheral: PeripheralId, reason: SerialError) {}

    /// A chunk of bytes arrived, exactly as the peripheral sent it.
    fn data_received(&mut self, bytes: &[u8]) {}

    /// The same chunk, when it happens to decode as UTF-8. Skipped
    /// entirely for non-text payloads.
    fn text_received(&mut self, text: &str) {}

    /// Result of a signal-strength read on the connected peripheral.
    fn rssi_read(&mut self, rssi: i16) {}
}

/// Funnel for all outbound notifications. Owns the one consumer.
pub struct EventDispatcher {
    consumer: Box<dyn SerialEvents>,
}

impl EventDispatcher {
    pub fn new(consumer: Box<dyn SerialEvents>) -> Self {
        Self { consumer }
    }

    pub fn adapter_state_changed(&mut self, state: AdapterState) {
        self.consumer.adapter_state_changed(state);
    }

    pub fn disconnected(&mut self, peripheral: PeripheralId, reason: Option<SerialError>) {
        self.consumer.disconnected(peripheral, reason);
    }

    pub fn peripheral_discovered(&mut self, peripheral: &DiscoveredPeripheral) {
        self.consumer.peripheral_discovered(peripheral);
    }

    pub fn connected(&mut self, peripheral: PeripheralId) {
        self.consumer.connected(peripheral);
    }

    pub fn ready(&mut self, peripheral: PeripheralId) {
        self.consumer.ready(peripheral);
    }

    pub fn connect_failed(&mut self, peripheral: PeripheralId, reason: SerialError) {
        self.consumer.connect_failed(peripheral, reason);
    }

    /// Delivers the chunk, plus its text form when it decodes cleanly.
    pub fn data_received(&mut self, bytes: &[u8]) {
        trace!("Received {} bytes", bytes.len());
        self.consumer.data_received(bytes);
        if let Ok(text) = std::str::from_utf8(bytes) {
            self.consumer.text_received(text);
        }
    }

    pub fn rssi_read(&mut self, rssi: i16) {
        self.consumer.rssi_read(rssi);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Consumer that only implements the two mandatory callbacks.
    struct MinimalConsumer {
        seen: Arc<Mutex<Vec<String>>>,
    }

    impl SerialEvents for MinimalConsumer {
        fn adapter_state_changed(&mut self, state: AdapterState) {
            self.seen.lock().unwrap().push(format!("adapter {state:?}"));
        }

        fn disconnected(&mut self, peripheral: PeripheralId, _reason: Option<SerialError>) {
            self.seen.lock().unwrap().push(format!("lost {peripheral}"));
        }
    }

    #[test]
    fn test_optional_events_default_to_noops() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut dispatcher = EventDispatcher::new(Box::new(MinimalConsumer { seen: seen.clone() }));

        // None of these panic or require an implementation.
        dispatcher.connected(PeripheralId(1));
        dispatcher.ready(PeripheralId(1));
        dispatcher.data_received(b"ignored");
        dispatcher.rssi_read(-60);

        dispatcher.adapter_state_changed(AdapterState::PoweredOn);
        dispatcher.disconnected(PeripheralId(1), None);
        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    struct TextCollector {
        texts: Arc<Mutex<Vec<String>>>,
        chunks: Arc<Mutex<Vec<Vec<u8>>>>,
    }

    impl SerialEvents for TextCollector {
        fn adapter_state_changed(&mut self, _state: AdapterState) {}
        fn disconnected(&mut self, _peripheral: PeripheralId, _reason: Option<SerialError>) {}

        fn data_received(&mut self, bytes: &[u8]) {
            self.chunks.lock().unwrap().push(bytes.to_vec());
        }

        fn text_received(&mut self, text: &str) {
            self.texts.lock().unwrap().push(text.to_string());
        }
    }

    #[test]
    fn test_text_delivery_skipped_for_invalid_utf8() {
        let texts = Arc::new(Mutex::new(Vec::new()));
        let chunks = Arc::new(Mutex::new(Vec::new()));
        let mut dispatcher = EventDispatcher::new(Box::new(TextCollector {
            texts: texts.clone(),
            chunks: chunks.clone(),
        }));

        dispatcher.data_received(b"OK+CONN");
        dispatcher.data_received(&[0xFF, 0xFE, 0x01]);

        assert_eq!(chunks.lock().unwrap().len(), 2);
        assert_eq!(*texts.lock().unwrap(), vec!["OK+CONN".to_string()]);
    }
}
