//! Mock radio transport for testing
//!
//! `MockRadio` scripts the collaborator side of the boundary: which devices
//! are bonded, which addresses accept a channel, and whether discovery is
//! authorized. `MockChannel` reads genuinely block until bytes are injected
//! or the channel is closed, so connection tests exercise the real worker
//! cancellation path.

use super::{ByteChannel, ChannelCloser, RadioTransport};
use crate::core::types::DeviceInfo;
use crate::error::{Error, Result};
use parking_lot::{Condvar, Mutex};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

#[derive(Default)]
struct ChannelState {
    pending: VecDeque<u8>,
    closed: bool,
}

#[derive(Default)]
struct ChannelInner {
    state: Mutex<ChannelState>,
    wake: Condvar,
}

/// In-memory byte channel with blocking reads
#[derive(Clone, Default)]
pub struct MockChannel {
    inner: Arc<ChannelInner>,
}

impl MockChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inject bytes for the reading side to consume
    pub fn inject(&self, data: &[u8]) {
        let mut state = self.inner.state.lock();
        state.pending.extend(data);
        self.inner.wake.notify_all();
    }

    /// Close the channel, waking any blocked reader
    pub fn close(&self) {
        self.inner.state.lock().closed = true;
        self.inner.wake.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.state.lock().closed
    }
}

struct MockCloser {
    inner: Arc<ChannelInner>,
}

impl ChannelCloser for MockCloser {
    fn close(&self) {
        self.inner.state.lock().closed = true;
        self.inner.wake.notify_all();
    }
}

impl ByteChannel for MockChannel {
    fn read(&mut self, buffer: &mut [u8]) -> std::io::Result<usize> {
        let mut state = self.inner.state.lock();
        loop {
            if !state.pending.is_empty() {
                let count = state.pending.len().min(buffer.len());
                for slot in buffer.iter_mut().take(count) {
                    *slot = state.pending.pop_front().unwrap();
                }
                return Ok(count);
            }
            if state.closed {
                return Ok(0);
            }
            self.inner.wake.wait(&mut state);
        }
    }

    fn closer(&self) -> Box<dyn ChannelCloser> {
        Box::new(MockCloser {
            inner: Arc::clone(&self.inner),
        })
    }
}

#[derive(Default)]
struct RadioInner {
    available: AtomicBool,
    authorize_discovery: AtomicBool,
    discovering: AtomicBool,
    discovery_starts: AtomicUsize,
    discovery_cancels: AtomicUsize,
    bonded: Mutex<Vec<DeviceInfo>>,
    endpoints: Mutex<HashMap<String, MockChannel>>,
    open_delay: Mutex<Option<Duration>>,
}

/// Scriptable radio collaborator
#[derive(Clone)]
pub struct MockRadio {
    inner: Arc<RadioInner>,
}

impl MockRadio {
    /// An available radio with discovery authorized
    pub fn new() -> Self {
        let inner = RadioInner::default();
        inner.available.store(true, Ordering::Relaxed);
        inner.authorize_discovery.store(true, Ordering::Relaxed);
        Self {
            inner: Arc::new(inner),
        }
    }

    /// A radio that is absent or disabled
    pub fn unavailable() -> Self {
        let radio = Self::new();
        radio.inner.available.store(false, Ordering::Relaxed);
        radio
    }

    /// Make `start_discovery` fail as if scan authorization were missing
    pub fn deny_discovery(&self) {
        self.inner.authorize_discovery.store(false, Ordering::Relaxed);
    }

    pub fn add_bonded(&self, device: DeviceInfo) {
        self.inner.bonded.lock().push(device);
    }

    /// Register a reachable address; the returned handle injects bytes and
    /// simulates the device-side hangup.
    pub fn add_endpoint(&self, address: &str) -> MockChannel {
        let channel = MockChannel::new();
        self.inner
            .endpoints
            .lock()
            .insert(address.to_string(), channel.clone());
        channel
    }

    /// Delay `open_channel` so tests can observe the connecting phase
    pub fn set_open_delay(&self, delay: Duration) {
        *self.inner.open_delay.lock() = Some(delay);
    }

    pub fn discovery_active(&self) -> bool {
        self.inner.discovering.load(Ordering::Relaxed)
    }

    pub fn discovery_starts(&self) -> usize {
        self.inner.discovery_starts.load(Ordering::Relaxed)
    }

    pub fn discovery_cancels(&self) -> usize {
        self.inner.discovery_cancels.load(Ordering::Relaxed)
    }
}

impl Default for MockRadio {
    fn default() -> Self {
        Self::new()
    }
}

impl RadioTransport for MockRadio {
    fn is_available(&self) -> bool {
        self.inner.available.load(Ordering::Relaxed)
    }

    fn bonded_devices(&self) -> Result<Vec<DeviceInfo>> {
        Ok(self.inner.bonded.lock().clone())
    }

    fn start_discovery(&self) -> Result<()> {
        if !self.inner.authorize_discovery.load(Ordering::Relaxed) {
            return Err(Error::AuthorizationDenied("scan not permitted".to_string()));
        }
        self.inner.discovering.store(true, Ordering::Relaxed);
        self.inner.discovery_starts.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn cancel_discovery(&self) -> bool {
        self.inner.discovering.store(false, Ordering::Relaxed);
        self.inner.discovery_cancels.fetch_add(1, Ordering::Relaxed);
        true
    }

    fn open_channel(&self, address: &str, _service: Uuid) -> Result<Box<dyn ByteChannel>> {
        let delay = *self.inner.open_delay.lock();
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }
        match self.inner.endpoints.lock().get(address) {
            Some(channel) => Ok(Box::new(channel.clone())),
            None => Err(Error::InvalidAddress(address.to_string())),
        }
    }
}
