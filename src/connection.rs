//! Connection controller
//!
//! Owns the single active connection and its state machine:
//!
//! ```text
//! Disconnected ──connect()──▶ Connecting ──channel open──▶ Connected
//!      ▲                         │                            │
//!      │                         │ open failed                │ disconnect()
//!      └─────────────────────────┴────────────────────────────┘ or stream end
//! ```
//!
//! While `Connected`, one dedicated `link-reader` worker runs a blocking
//! byte-at-a-time read loop, framing and decoding inline and publishing each
//! result to the dashboard store. Cancellation is exclusively closing the
//! channel, which fails the pending read and lets the worker exit; there is
//! no cooperative-polling path.

use crate::config::LinkConfig;
use crate::core::cell::StateCell;
use crate::core::dashboard::{DashboardState, LoadedState};
use crate::core::types::{ConnectionState, DeviceInfo, UNKNOWN_DEVICE_NAME};
use crate::error::{Error, Result};
use crate::protocol::{FrameStream, TelemetryDecoder};
use crate::store::DashboardStateStore;
use crate::transport::{ByteChannel, ChannelCloser, RadioTransport};
use parking_lot::Mutex;
use std::io::Read;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use uuid::Uuid;

/// Resources of the current connection: the closer used for cancellation and
/// the worker handle joined on teardown.
struct ActiveLink {
    closer: Box<dyn ChannelCloser>,
    worker: JoinHandle<()>,
}

/// State machine owning the single active device connection.
pub struct ConnectionController {
    transport: Arc<dyn RadioTransport>,
    decoder: Arc<TelemetryDecoder>,
    store: Arc<DashboardStateStore>,
    state: Arc<StateCell<ConnectionState>>,
    service_uuid: Uuid,
    buffer_capacity: usize,
    /// Generation counter distinguishing the current connection from stale
    /// workers of a previous one.
    session: Arc<AtomicU64>,
    /// In-flight guard: a second concurrent connect fails fast instead of
    /// racing the first.
    connecting: AtomicBool,
    active: Mutex<Option<ActiveLink>>,
}

impl ConnectionController {
    pub fn new(
        transport: Arc<dyn RadioTransport>,
        config: &LinkConfig,
        store: Arc<DashboardStateStore>,
    ) -> Self {
        Self {
            transport,
            decoder: Arc::new(TelemetryDecoder::new(config)),
            store,
            state: Arc::new(StateCell::new(ConnectionState::Disconnected)),
            service_uuid: config.channel.service_uuid,
            buffer_capacity: config.channel.buffer_capacity,
            session: Arc::new(AtomicU64::new(0)),
            connecting: AtomicBool::new(false),
            active: Mutex::new(None),
        }
    }

    /// Snapshot of the current connection state
    pub fn state(&self) -> ConnectionState {
        self.state.get()
    }

    /// Shared read-only view of the connection state for other components
    /// (discovery, presentation). Only this controller writes to it.
    pub fn state_cell(&self) -> Arc<StateCell<ConnectionState>> {
        Arc::clone(&self.state)
    }

    /// Connect to the device at `address`.
    ///
    /// Cancels any in-progress discovery, tears down an existing connection,
    /// opens the byte channel and starts the telemetry pipeline. On failure
    /// the state returns to `Disconnected` and the error is surfaced exactly
    /// once; there is no automatic retry.
    ///
    /// A call while another `connect` is still in flight fails with
    /// [`Error::ConnectBusy`].
    pub fn connect(&self, address: &str) -> Result<()> {
        if self.connecting.swap(true, Ordering::SeqCst) {
            return Err(Error::ConnectBusy);
        }
        let result = self.connect_inner(address);
        self.connecting.store(false, Ordering::SeqCst);
        result
    }

    fn connect_inner(&self, address: &str) -> Result<()> {
        // Scanning interferes with channel setup on shared radios.
        self.transport.cancel_discovery();

        // Invalidate the previous session before closing its channel so the
        // exiting worker cannot publish over the new attempt.
        let session = self.session.fetch_add(1, Ordering::SeqCst) + 1;
        self.teardown_active();

        self.state.set(ConnectionState::Connecting);
        log::info!("Connecting to {}", address);

        let channel = match self.transport.open_channel(address, self.service_uuid) {
            Ok(channel) => channel,
            Err(e) => {
                log::warn!("Connection to {} failed: {}", address, e);
                self.state.set(ConnectionState::Disconnected);
                return Err(e);
            }
        };

        let closer = channel.closer();
        let info = self.device_info_for(address);
        log::info!("Connected to {} ({})", info.name, info.address);

        self.store.publish(DashboardState::Loading);
        self.state.set(ConnectionState::Connected(info));

        let worker = match self.spawn_reader(channel, session) {
            Ok(worker) => worker,
            Err(e) => {
                closer.close();
                self.state.set(ConnectionState::Disconnected);
                self.store.publish(DashboardState::Disconnected);
                return Err(e.into());
            }
        };
        *self.active.lock() = Some(ActiveLink { closer, worker });

        Ok(())
    }

    /// Close the active channel, if any, and transition to `Disconnected`.
    ///
    /// Closing unblocks the worker's pending read; the worker is joined
    /// before this returns.
    pub fn disconnect(&self) {
        // Invalidate the session first so the exiting worker stays silent.
        self.session.fetch_add(1, Ordering::SeqCst);
        self.teardown_active();
        self.state.set(ConnectionState::Disconnected);
        self.store.publish(DashboardState::Disconnected);
    }

    fn teardown_active(&self) {
        let link = self.active.lock().take();
        if let Some(link) = link {
            log::debug!("Closing active channel");
            link.closer.close();
            if link.worker.join().is_err() {
                log::error!("Link reader worker panicked");
            }
        }
    }

    fn device_info_for(&self, address: &str) -> DeviceInfo {
        let name = self
            .transport
            .bonded_devices()
            .ok()
            .and_then(|devices| {
                devices
                    .into_iter()
                    .find(|device| device.address == address)
                    .map(|device| device.name)
            })
            .unwrap_or_else(|| UNKNOWN_DEVICE_NAME.to_string());

        DeviceInfo {
            name,
            address: address.to_string(),
            connected: true,
        }
    }

    fn spawn_reader(
        &self,
        channel: Box<dyn ByteChannel>,
        session: u64,
    ) -> std::io::Result<JoinHandle<()>> {
        let decoder = Arc::clone(&self.decoder);
        let store = Arc::clone(&self.store);
        let state = Arc::clone(&self.state);
        let sessions = Arc::clone(&self.session);
        let capacity = self.buffer_capacity;

        thread::Builder::new()
            .name("link-reader".to_string())
            .spawn(move || {
                reader_loop(channel, capacity, &decoder, &store);

                // Stream over: device-side hangup or disconnect(). Only the
                // current session's worker may publish the transition.
                if sessions.load(Ordering::SeqCst) == session {
                    log::info!("Byte stream ended, disconnecting");
                    state.set(ConnectionState::Disconnected);
                    store.publish(DashboardState::Disconnected);
                }
                log::debug!("Link reader exiting");
            })
    }
}

impl Drop for ConnectionController {
    fn drop(&mut self) {
        self.session.fetch_add(1, Ordering::SeqCst);
        self.teardown_active();
    }
}

/// Adapter exposing a boxed byte channel as `std::io::Read` for the framer.
struct ChannelReader(Box<dyn ByteChannel>);

impl Read for ChannelReader {
    fn read(&mut self, buffer: &mut [u8]) -> std::io::Result<usize> {
        self.0.read(buffer)
    }
}

/// Blocking read loop: frames, decodes inline and publishes until the
/// stream terminates. This worker is the only writer of the dashboard state
/// while it runs.
fn reader_loop(
    channel: Box<dyn ByteChannel>,
    capacity: usize,
    decoder: &TelemetryDecoder,
    store: &DashboardStateStore,
) {
    let mut previous: Option<LoadedState> = None;
    let frames = FrameStream::new(ChannelReader(channel), capacity);

    for frame in frames {
        let next = decoder.decode(&frame, previous.as_ref());
        if let DashboardState::Loaded(loaded) = &next {
            previous = Some(loaded.clone());
        }
        store.publish(next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::MockRadio;
    use std::time::Duration;

    fn controller_with(radio: &MockRadio) -> (ConnectionController, Arc<DashboardStateStore>) {
        let mut config = LinkConfig::rc_dashboard_defaults();
        config.geofence = None;
        let store = Arc::new(DashboardStateStore::new());
        let controller = ConnectionController::new(
            Arc::new(radio.clone()),
            &config,
            Arc::clone(&store),
        );
        (controller, store)
    }

    fn golden_payload() -> Vec<u8> {
        let mut payload = vec![0u8; 22];
        payload[12..14].copy_from_slice(&3000u16.to_be_bytes());
        payload[14..16].copy_from_slice(&5000u16.to_be_bytes());
        payload
    }

    #[test]
    fn test_connect_reaches_connected() {
        let radio = MockRadio::new();
        radio.add_endpoint("AA:BB:CC:DD:EE:FF");
        radio.add_bonded(DeviceInfo {
            name: "RC Car".to_string(),
            address: "AA:BB:CC:DD:EE:FF".to_string(),
            connected: false,
        });
        let (controller, store) = controller_with(&radio);

        assert_eq!(controller.state(), ConnectionState::Disconnected);
        controller.connect("AA:BB:CC:DD:EE:FF").unwrap();

        match controller.state() {
            ConnectionState::Connected(info) => {
                assert_eq!(info.name, "RC Car");
                assert_eq!(info.address, "AA:BB:CC:DD:EE:FF");
            }
            other => panic!("expected Connected, got {:?}", other),
        }
        assert_eq!(store.get(), DashboardState::Loading);

        controller.disconnect();
        assert_eq!(controller.state(), ConnectionState::Disconnected);
        assert_eq!(store.get(), DashboardState::Disconnected);
    }

    #[test]
    fn test_connect_passes_through_connecting() {
        let radio = MockRadio::new();
        radio.add_endpoint("AA:BB");
        radio.set_open_delay(Duration::from_millis(100));
        let (controller, _store) = controller_with(&radio);
        let controller = Arc::new(controller);

        let connecting = Arc::clone(&controller);
        let handle = std::thread::spawn(move || connecting.connect("AA:BB"));

        assert!(controller
            .state_cell()
            .wait_for(Duration::from_secs(1), |s| {
                *s == ConnectionState::Connecting
            }));
        assert!(controller
            .state_cell()
            .wait_for(Duration::from_secs(1), |s| s.is_connected()));
        handle.join().unwrap().unwrap();
        controller.disconnect();
    }

    #[test]
    fn test_connect_failure_returns_to_disconnected() {
        let radio = MockRadio::new();
        let (controller, store) = controller_with(&radio);

        let result = controller.connect("not-a-device");
        assert!(matches!(result, Err(Error::InvalidAddress(_))));
        assert_eq!(controller.state(), ConnectionState::Disconnected);
        // A failed attempt never went Connected, so the store was untouched.
        assert_eq!(store.get(), DashboardState::Loading);
    }

    #[test]
    fn test_connect_cancels_discovery() {
        let radio = MockRadio::new();
        radio.add_endpoint("AA:BB");
        radio.start_discovery().unwrap();
        let (controller, _store) = controller_with(&radio);

        controller.connect("AA:BB").unwrap();
        assert!(!radio.discovery_active());
        controller.disconnect();
    }

    #[test]
    fn test_telemetry_flows_into_store() {
        let radio = MockRadio::new();
        let channel = radio.add_endpoint("AA:BB");
        let (controller, store) = controller_with(&radio);

        controller.connect("AA:BB").unwrap();

        let mut record = golden_payload();
        record.extend_from_slice(b"\r\n");
        channel.inject(&record);

        assert!(store.wait_for(Duration::from_secs(1), |s| {
            s.as_loaded().map(|l| l.battery_soc == Some(50)) == Some(true)
        }));
        let loaded_state = store.get();
        let loaded = loaded_state.as_loaded().unwrap();
        assert_eq!(loaded.speed_rpm, Some(2000.0));
        assert!(loaded.radio_connected);

        controller.disconnect();
    }

    #[test]
    fn test_device_hangup_disconnects() {
        let radio = MockRadio::new();
        let channel = radio.add_endpoint("AA:BB");
        let (controller, store) = controller_with(&radio);

        controller.connect("AA:BB").unwrap();
        channel.close();

        assert!(controller
            .state_cell()
            .wait_for(Duration::from_secs(1), |s| {
                *s == ConnectionState::Disconnected
            }));
        assert!(store.wait_for(Duration::from_secs(1), |s| {
            *s == DashboardState::Disconnected
        }));
    }

    #[test]
    fn test_reconnect_after_disconnect() {
        let radio = MockRadio::new();
        radio.add_endpoint("AA:BB");
        let (controller, store) = controller_with(&radio);

        controller.connect("AA:BB").unwrap();
        controller.disconnect();

        // Second session starts clean.
        let channel = radio.add_endpoint("AA:BB");
        controller.connect("AA:BB").unwrap();
        assert!(controller.state().is_connected());
        assert_eq!(store.get(), DashboardState::Loading);

        let mut record = golden_payload();
        record.extend_from_slice(b"\r\n");
        channel.inject(&record);
        assert!(store.wait_for(Duration::from_secs(1), |s| s.as_loaded().is_some()));

        controller.disconnect();
    }

    #[test]
    fn test_connect_while_connected_replaces_link() {
        let radio = MockRadio::new();
        let first = radio.add_endpoint("AA:BB");
        radio.add_endpoint("CC:DD");
        let (controller, _store) = controller_with(&radio);

        controller.connect("AA:BB").unwrap();
        controller.connect("CC:DD").unwrap();

        // The first channel was closed when the second connect took over.
        assert!(first.is_closed());
        assert_eq!(
            controller.state().connected_address(),
            Some("CC:DD")
        );
        controller.disconnect();
    }
}
