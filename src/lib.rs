//! Connection lifecycle and byte transport core for BLE serial
//! peripherals.
//!
//! HM-10 style modules expose a UART bridge over GATT: one service
//! (`FFE0`) with a single notify+write characteristic (`FFE1`). This
//! crate owns everything between "the user tapped a device in the list"
//! and "raw bytes flow both ways": adapter power tracking, deduplicated
//! scanning, the connect → discover → subscribe sequence, write-mode
//! handling, and buffered inbound data — driven entirely by
//! asynchronous radio callbacks it never blocks on.
//!
//! The platform radio stack sits behind [`RadioLink`]; the presentation
//! layer consumes [`SerialEvents`]. Neither side touches the other
//! directly:
//!
//! ```no_run
//! use ble_serial_bridge::{
//!     AdapterState, PeripheralId, SerialError, SerialEvents, SerialService, SessionConfig,
//! };
//!
//! struct Terminal;
//!
//! impl SerialEvents for Terminal {
//!     fn adapter_state_changed(&mut self, state: AdapterState) {
//!         println!("adapter: {state:?}");
//!     }
//!
//!     fn disconnected(&mut self, peripheral: PeripheralId, reason: Option<SerialError>) {
//!         println!("lost {peripheral}: {reason:?}");
//!     }
//!
//!     fn data_received(&mut self, bytes: &[u8]) {
//!         println!("<- {bytes:?}");
//!     }
//! }
//!
//! # async fn run(
//! #     radio: impl ble_serial_bridge::RadioLink + 'static,
//! #     radio_events: tokio::sync::mpsc::UnboundedReceiver<ble_serial_bridge::RadioEvent>,
//! # ) -> Result<(), SerialError> {
//! let handle = SerialService::spawn(
//!     radio,
//!     radio_events,
//!     Box::new(Terminal),
//!     SessionConfig::default(),
//! );
//! handle.start_scan().await?;
//! # Ok(())
//! # }
//! ```

pub mod domain;
pub mod infrastructure;

pub use domain::error::SerialError;
pub use domain::models::{
    AdapterState, DiscoveredPeripheral, LinkPhase, PeripheralId, StatusSnapshot, WriteMode,
};
pub use domain::settings::LogSettings;
pub use infrastructure::bluetooth::events::SerialEvents;
pub use infrastructure::bluetooth::radio::{
    CharacteristicHandle, CharacteristicInfo, RadioEvent, RadioLink, ServiceHandle,
};
pub use infrastructure::bluetooth::{SerialHandle, SerialService, SessionConfig};
pub use infrastructure::logging::{init_logger, LoggingGuard};
