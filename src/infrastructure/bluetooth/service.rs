//! Serial bridge service.
//!
//! Coordinates the adapter monitor, scan controller, connection
//! lifecycle, and inbound transport behind a channel façade. All state
//! lives on one task: public entry points post [`Command`]s onto the
//! command channel, the radio pushes [`RadioEvent`]s onto its callback
//! channel, and the task's select loop is the only place either is
//! handled. Nothing here blocks; anything longer-lived than input
//! validation reports back through [`SerialEvents`].

use crate::domain::error::SerialError;
use crate::domain::models::{
    AdapterState, LinkPhase, PeripheralId, StatusSnapshot, WriteMode,
};
use crate::infrastructure::bluetooth::adapter::AdapterMonitor;
use crate::infrastructure::bluetooth::connection::Connection;
use crate::infrastructure::bluetooth::events::{EventDispatcher, SerialEvents};
use crate::infrastructure::bluetooth::protocol;
use crate::infrastructure::bluetooth::radio::{
    CharacteristicInfo, RadioEvent, RadioLink, ServiceHandle,
};
use crate::infrastructure::bluetooth::scanner::ScanController;
use crate::infrastructure::bluetooth::transport::InboundBuffer;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

/// Resolved session configuration.
///
/// The write mode and UUID overrides come from wherever the embedding
/// application keeps its preferences; the core only sees the resolved
/// values. Defaults match the HM-10 profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Write mode for outbound data. Overridable per send.
    #[serde(default)]
    pub write_mode: WriteMode,
    /// Service advertised by the peripheral.
    #[serde(default = "default_service_uuid")]
    pub service_uuid: Uuid,
    /// Notify+write characteristic inside that service.
    #[serde(default = "default_characteristic_uuid")]
    pub characteristic_uuid: Uuid,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            write_mode: WriteMode::default(),
            service_uuid: default_service_uuid(),
            characteristic_uuid: default_characteristic_uuid(),
        }
    }
}

fn default_service_uuid() -> Uuid {
    protocol::serial_service_uuid()
}

fn default_characteristic_uuid() -> Uuid {
    protocol::serial_characteristic_uuid()
}

/// Requests marshaled onto the service task.
enum Command {
    StartScan {
        reply: oneshot::Sender<Result<(), SerialError>>,
    },
    StopScan,
    Connect {
        peripheral: PeripheralId,
        reply: oneshot::Sender<Result<(), SerialError>>,
    },
    Disconnect,
    Send {
        bytes: Vec<u8>,
        mode: Option<WriteMode>,
        reply: oneshot::Sender<Result<(), SerialError>>,
    },
    ReadRssi,
    Drain {
        reply: oneshot::Sender<Vec<u8>>,
    },
    Peek {
        reply: oneshot::Sender<Vec<u8>>,
    },
    Status {
        reply: oneshot::Sender<StatusSnapshot>,
    },
}

/// Cloneable façade over the service task.
///
/// Safe to use from any task or thread: every call posts onto the
/// service's command channel instead of touching shared state. Methods
/// returning a `Result` only report input validation (adapter gating,
/// readiness); connection outcomes and received data always arrive
/// through the registered [`SerialEvents`] consumer.
#[derive(Clone)]
pub struct SerialHandle {
    commands: mpsc::UnboundedSender<Command>,
}

impl SerialHandle {
    /// Start scanning for serial peripherals. Fails fast when the
    /// adapter is not powered on.
    pub async fn start_scan(&self) -> Result<(), SerialError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(Command::StartScan { reply: tx })
            .map_err(|_| SerialError::CoreStopped)?;
        rx.await.map_err(|_| SerialError::CoreStopped)?
    }

    /// Stop scanning. Idempotent; safe after the scan already ended.
    pub fn stop_scan(&self) {
        let _ = self.commands.send(Command::StopScan);
    }

    /// Begin connecting to a discovered peripheral, superseding any
    /// connection already pending or active. Progress arrives as
    /// `connected` → `ready`, or `connect_failed`.
    pub async fn connect(&self, peripheral: PeripheralId) -> Result<(), SerialError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(Command::Connect { peripheral, reply: tx })
            .map_err(|_| SerialError::CoreStopped)?;
        rx.await.map_err(|_| SerialError::CoreStopped)?
    }

    /// Disconnect, or cancel a pending connect. Idempotent.
    pub fn disconnect(&self) {
        let _ = self.commands.send(Command::Disconnect);
    }

    /// Write bytes to the peripheral using the session write mode.
    /// Rejected (nothing written) unless the link is ready.
    pub async fn send(&self, bytes: &[u8]) -> Result<(), SerialError> {
        self.send_with_mode(bytes, None).await
    }

    /// Write bytes with an explicit write mode for this send only.
    pub async fn send_with_mode(
        &self,
        bytes: &[u8],
        mode: Option<WriteMode>,
    ) -> Result<(), SerialError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(Command::Send {
                bytes: bytes.to_vec(),
                mode,
                reply: tx,
            })
            .map_err(|_| SerialError::CoreStopped)?;
        rx.await.map_err(|_| SerialError::CoreStopped)?
    }

    /// UTF-8 encode and send a string.
    pub async fn send_str(&self, text: &str) -> Result<(), SerialError> {
        self.send(text.as_bytes()).await
    }

    /// Request a signal-strength read; the result arrives as
    /// `rssi_read`. Skipped when the link is not ready.
    pub fn read_rssi(&self) {
        let _ = self.commands.send(Command::ReadRssi);
    }

    /// Take everything received since the last drain.
    pub async fn drain(&self) -> Result<Vec<u8>, SerialError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(Command::Drain { reply: tx })
            .map_err(|_| SerialError::CoreStopped)?;
        rx.await.map_err(|_| SerialError::CoreStopped)
    }

    /// Look at the accumulated bytes without consuming them.
    pub async fn peek(&self) -> Result<Vec<u8>, SerialError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(Command::Peek { reply: tx })
            .map_err(|_| SerialError::CoreStopped)?;
        rx.await.map_err(|_| SerialError::CoreStopped)
    }

    /// Current adapter state, link phase, and target peripheral.
    pub async fn status(&self) -> Result<StatusSnapshot, SerialError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(Command::Status { reply: tx })
            .map_err(|_| SerialError::CoreStopped)?;
        rx.await.map_err(|_| SerialError::CoreStopped)
    }

    /// Whether the link can send and receive right now.
    pub async fn is_ready(&self) -> bool {
        self.status().await.map(|s| s.is_ready()).unwrap_or(false)
    }
}

/// The serial bridge core. One instance per logical session, owned by
/// the composition root via the [`SerialHandle`] returned from
/// [`SerialService::spawn`].
pub struct SerialService<R: RadioLink> {
    radio: R,
    config: SessionConfig,
    monitor: AdapterMonitor,
    scanner: ScanController,
    connection: Option<Connection>,
    inbound: InboundBuffer,
    dispatcher: EventDispatcher,
}

impl<R: RadioLink + 'static> SerialService<R> {
    /// Spawn the service task and return its handle.
    ///
    /// `radio_events` must be the receiving end of the radio's
    /// serialized callback channel.
    pub fn spawn(
        radio: R,
        radio_events: mpsc::UnboundedReceiver<RadioEvent>,
        consumer: Box<dyn SerialEvents>,
        config: SessionConfig,
    ) -> SerialHandle {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let service = Self::new(radio, consumer, config);
        tokio::spawn(service.run(command_rx, radio_events));
        SerialHandle { commands: command_tx }
    }
}

impl<R: RadioLink> SerialService<R> {
    fn new(radio: R, consumer: Box<dyn SerialEvents>, config: SessionConfig) -> Self {
        let monitor = AdapterMonitor::new(radio.adapter_state());
        Self {
            radio,
            config,
            monitor,
            scanner: ScanController::new(),
            connection: None,
            inbound: InboundBuffer::new(),
            dispatcher: EventDispatcher::new(consumer),
        }
    }

    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut radio_events: mpsc::UnboundedReceiver<RadioEvent>,
    ) {
        loop {
            tokio::select! {
                Some(command) = commands.recv() => self.handle_command(command),
                Some(event) = radio_events.recv() => self.handle_radio_event(event),
                else => break,
            }
        }
        debug!("Serial service task finished");
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::StartScan { reply } => {
                let _ = reply.send(self.start_scan());
            }
            Command::StopScan => self.stop_scan(),
            Command::Connect { peripheral, reply } => {
                let _ = reply.send(self.connect(peripheral));
            }
            Command::Disconnect => self.disconnect(),
            Command::Send { bytes, mode, reply } => {
                let _ = reply.send(self.send(&bytes, mode));
            }
            Command::ReadRssi => self.read_rssi(),
            Command::Drain { reply } => {
                let _ = reply.send(self.inbound.drain());
            }
            Command::Peek { reply } => {
                let _ = reply.send(self.inbound.peek().to_vec());
            }
            Command::Status { reply } => {
                let _ = reply.send(self.status());
            }
        }
    }

    fn handle_radio_event(&mut self, event: RadioEvent) {
        match event {
            RadioEvent::AdapterStateChanged(state) => self.adapter_changed(state),
            RadioEvent::PeripheralDiscovered {
                peripheral,
                name,
                rssi,
            } => self.note_sighting(peripheral, name, rssi),
            RadioEvent::Connected { peripheral } => self.link_established(peripheral),
            RadioEvent::ConnectFailed { peripheral, error } => {
                self.connect_attempt_failed(peripheral, error)
            }
            RadioEvent::Disconnected { peripheral, error } => self.link_lost(peripheral, error),
            RadioEvent::ServicesDiscovered {
                peripheral,
                services,
            } => self.services_discovered(peripheral, services),
            RadioEvent::CharacteristicsDiscovered {
                peripheral,
                characteristics,
                ..
            } => self.characteristics_discovered(peripheral, characteristics),
            RadioEvent::SubscriptionChanged {
                peripheral,
                enabled,
                error,
                ..
            } => self.subscription_changed(peripheral, enabled, error),
            RadioEvent::NotificationReceived {
                peripheral, value, ..
            } => self.notification_received(peripheral, value),
            RadioEvent::RssiRead { peripheral, rssi } => self.rssi_result(peripheral, rssi),
        }
    }

    // ---- commands -------------------------------------------------

    fn start_scan(&mut self) -> Result<(), SerialError> {
        let state = self.monitor.state();
        if !state.is_powered_on() {
            warn!("Scan requested while adapter is {:?}", state);
            return Err(SerialError::AdapterUnavailable(state));
        }

        info!("Scanning for serial peripherals...");
        self.scanner.begin();
        self.radio.start_scan(self.config.service_uuid);

        // Peripherals the stack already holds a link to won't advertise,
        // so surface them directly. No advertisement means no RSSI.
        let known = self.radio.connected_peripherals(self.config.service_uuid);
        for (peripheral, name) in known {
            self.note_sighting(peripheral, name, None);
        }
        Ok(())
    }

    fn stop_scan(&mut self) {
        if self.scanner.is_scanning() {
            info!("Scan stopped");
        }
        self.scanner.stop();
        self.radio.stop_scan();
    }

    fn connect(&mut self, peripheral: PeripheralId) -> Result<(), SerialError> {
        let state = self.monitor.state();
        if !state.is_powered_on() {
            warn!("Connect requested while adapter is {:?}", state);
            return Err(SerialError::AdapterUnavailable(state));
        }

        // One connection at a time: a new attempt cancels whatever came
        // before it, pending or ready.
        if let Some(previous) = self.connection.take() {
            info!("Superseding connection to {}", previous.peripheral());
            self.radio.disconnect(previous.peripheral());
            self.inbound.clear();
            self.dispatcher.disconnected(previous.peripheral(), None);
        }

        info!("Connecting to {}", peripheral);
        self.connection = Some(Connection::new(peripheral, self.config.write_mode));
        self.radio.connect(peripheral);
        Ok(())
    }

    fn disconnect(&mut self) {
        let Some(conn) = self.connection.as_mut() else {
            // Nothing to tear down; redundant calls are fine.
            return;
        };
        let peripheral = conn.peripheral();
        match conn.phase() {
            LinkPhase::Connecting => {
                // No link yet. The stack won't confirm a cancelled
                // pending connect, so finish the teardown here.
                info!("Cancelling pending connection to {}", peripheral);
                self.radio.disconnect(peripheral);
                self.connection = None;
                self.inbound.clear();
                self.dispatcher.disconnected(peripheral, None);
            }
            LinkPhase::Disconnecting => {}
            _ => {
                info!("Disconnecting from {}", peripheral);
                conn.begin_disconnect();
                self.radio.disconnect(peripheral);
            }
        }
    }

    fn send(&mut self, bytes: &[u8], mode: Option<WriteMode>) -> Result<(), SerialError> {
        let Some(conn) = self.connection.as_ref() else {
            return Err(SerialError::WriteRejected);
        };
        let Some(target) = conn.write_target() else {
            return Err(SerialError::WriteRejected);
        };
        let mode = mode.unwrap_or(conn.write_mode());
        trace!("Writing {} bytes ({:?})", bytes.len(), mode);
        self.radio.write(conn.peripheral(), target, bytes, mode);
        Ok(())
    }

    fn read_rssi(&mut self) {
        match self.connection.as_ref() {
            Some(conn) if conn.is_ready() => self.radio.read_rssi(conn.peripheral()),
            _ => debug!("RSSI read skipped: link not ready"),
        }
    }

    fn status(&self) -> StatusSnapshot {
        StatusSnapshot {
            adapter: self.monitor.state(),
            phase: self
                .connection
                .as_ref()
                .map(|c| c.phase())
                .unwrap_or(LinkPhase::Idle),
            peripheral: self.connection.as_ref().map(|c| c.peripheral()),
        }
    }

    // ---- radio callbacks ------------------------------------------

    fn adapter_changed(&mut self, state: AdapterState) {
        self.monitor.update(state);
        self.dispatcher.adapter_state_changed(state);
        if state.is_powered_on() {
            return;
        }

        // The radio goes silent when the adapter dies: no disconnect
        // callback will follow, so the teardown happens here.
        self.scanner.stop();
        if let Some(conn) = self.connection.take() {
            warn!(
                "Adapter lost while {} was {:?}",
                conn.peripheral(),
                conn.phase()
            );
            self.inbound.clear();
            self.dispatcher.disconnected(
                conn.peripheral(),
                Some(SerialError::UnexpectedDisconnect(
                    "bluetooth adapter became unavailable".into(),
                )),
            );
        }
    }

    fn note_sighting(&mut self, peripheral: PeripheralId, name: Option<String>, rssi: Option<i16>) {
        if !self.scanner.is_scanning() {
            debug!("Sighting of {} outside an active scan", peripheral);
            return;
        }
        if let Some(discovered) = self.scanner.observe(peripheral, name, rssi) {
            self.dispatcher.peripheral_discovered(discovered);
        }
    }

    fn link_established(&mut self, peripheral: PeripheralId) {
        let Some(conn) = self.connection.as_mut() else {
            debug!("Connected callback for {} with no attempt in flight", peripheral);
            return;
        };
        if conn.peripheral() != peripheral || conn.phase() != LinkPhase::Connecting {
            debug!("Ignoring stale connected callback for {}", peripheral);
            return;
        }

        info!("Link to {} established, discovering services", peripheral);
        conn.link_established();
        self.dispatcher.connected(peripheral);
        self.radio
            .discover_services(peripheral, self.config.service_uuid);
    }

    fn connect_attempt_failed(&mut self, peripheral: PeripheralId, error: String) {
        let matches = self
            .connection
            .as_ref()
            .is_some_and(|c| c.peripheral() == peripheral);
        if !matches {
            return;
        }
        warn!("Connection to {} failed: {}", peripheral, error);
        self.connection = None;
        self.inbound.clear();
        self.dispatcher
            .connect_failed(peripheral, SerialError::ConnectError(error));
    }

    fn services_discovered(&mut self, peripheral: PeripheralId, services: Vec<ServiceHandle>) {
        let Some(conn) = self.connection.as_mut() else {
            return;
        };
        if conn.peripheral() != peripheral || conn.phase() != LinkPhase::DiscoveringServices {
            debug!("Ignoring stale service discovery for {}", peripheral);
            return;
        }

        match conn.services_found(services) {
            Ok(services) => {
                debug!("{} serial service(s) on {}", services.len(), peripheral);
                for service in services {
                    self.radio.discover_characteristics(
                        peripheral,
                        service,
                        self.config.characteristic_uuid,
                    );
                }
            }
            Err(reason) => self.fail_attempt(peripheral, reason),
        }
    }

    fn characteristics_discovered(
        &mut self,
        peripheral: PeripheralId,
        characteristics: Vec<CharacteristicInfo>,
    ) {
        let Some(conn) = self.connection.as_mut() else {
            return;
        };
        if conn.peripheral() != peripheral
            || !matches!(
                conn.phase(),
                LinkPhase::DiscoveringCharacteristic | LinkPhase::Subscribing
            )
        {
            debug!("Ignoring stale characteristic discovery for {}", peripheral);
            return;
        }

        let matched = characteristics
            .iter()
            .find(|c| c.uuid == self.config.characteristic_uuid)
            .map(|c| c.handle);

        match conn.characteristic_probe(matched) {
            Ok(Some(handle)) => {
                info!("Serial characteristic found on {}, subscribing", peripheral);
                self.radio.set_notify(peripheral, handle, true);
            }
            Ok(None) => {}
            Err(reason) => self.fail_attempt(peripheral, reason),
        }
    }

    fn subscription_changed(
        &mut self,
        peripheral: PeripheralId,
        enabled: bool,
        error: Option<String>,
    ) {
        let matches = self
            .connection
            .as_ref()
            .is_some_and(|c| c.peripheral() == peripheral && c.phase() == LinkPhase::Subscribing);
        if !matches {
            return;
        }

        if let Some(error) = error {
            self.fail_attempt(
                peripheral,
                SerialError::ConnectError(format!("subscription failed: {error}")),
            );
            return;
        }
        if !enabled {
            debug!("Unexpected unsubscribe confirmation from {}", peripheral);
            return;
        }

        if let Some(conn) = self.connection.as_mut() {
            conn.subscribed();
        }
        info!("{} is ready for serial traffic", peripheral);
        self.dispatcher.ready(peripheral);
    }

    fn link_lost(&mut self, peripheral: PeripheralId, error: Option<String>) {
        let Some(conn) = self.connection.as_ref() else {
            debug!("Disconnect callback for {} with no live connection", peripheral);
            return;
        };
        if conn.peripheral() != peripheral {
            return;
        }

        let reason = match (conn.is_disconnecting(), error) {
            // A clean close we asked for.
            (true, None) => None,
            // We asked, but the stack still reported a problem.
            (true, Some(error)) => Some(SerialError::UnexpectedDisconnect(error)),
            (false, Some(error)) => Some(SerialError::UnexpectedDisconnect(error)),
            (false, None) => Some(SerialError::UnexpectedDisconnect(
                "link closed by peripheral".into(),
            )),
        };

        info!("Disconnected from {}", peripheral);
        self.connection = None;
        self.inbound.clear();
        self.dispatcher.disconnected(peripheral, reason);
    }

    /// Terminal failure of the in-flight attempt: drop the link and
    /// report exactly once.
    fn fail_attempt(&mut self, peripheral: PeripheralId, reason: SerialError) {
        warn!("Connection attempt to {} failed: {}", peripheral, reason);
        self.connection = None;
        self.inbound.clear();
        self.radio.disconnect(peripheral);
        self.dispatcher.connect_failed(peripheral, reason);
    }

    fn notification_received(&mut self, peripheral: PeripheralId, value: Vec<u8>) {
        let relevant = self
            .connection
            .as_ref()
            .is_some_and(|c| c.peripheral() == peripheral);
        if !relevant {
            debug!("Dropping notification from unrelated peripheral {}", peripheral);
            return;
        }
        self.inbound.push(&value);
        self.dispatcher.data_received(&value);
    }

    fn rssi_result(&mut self, peripheral: PeripheralId, rssi: i16) {
        let relevant = self
            .connection
            .as_ref()
            .is_some_and(|c| c.peripheral() == peripheral);
        if relevant {
            self.dispatcher.rssi_read(rssi);
        }
    }
}
