//! Device discovery registry
//!
//! Maintains the device list shown to the user: a periodically refreshed
//! bonded-device list merged with a cache of freshly announced devices. Two
//! background workers do the writing — a poll worker refreshing the bonded
//! list on an interval and an intake worker draining the announcement queue.
//! Discovery windows stop themselves on an independent timer so the caller
//! never blocks for the window.

use crate::config::LinkConfig;
use crate::core::cell::StateCell;
use crate::core::types::{ConnectionState, DeviceAnnouncement, DeviceInfo};
use crate::transport::RadioTransport;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use parking_lot::{Condvar, Mutex};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// How long the intake worker waits for an announcement before rechecking
/// the shutdown flag.
const INTAKE_POLL: Duration = Duration::from_millis(200);

/// Generation-counted discovery window. Bumping the generation cancels any
/// pending auto-stop.
#[derive(Default)]
struct ScanWindow {
    generation: Mutex<u64>,
    cancelled: Condvar,
}

/// Merges bonded devices with announced devices into the displayed list,
/// excluding whichever device is currently connected.
pub struct DiscoveryRegistry {
    transport: Arc<dyn RadioTransport>,
    connection: Arc<StateCell<ConnectionState>>,
    bonded: Arc<StateCell<Vec<DeviceInfo>>>,
    cache: Arc<Mutex<HashMap<String, DeviceInfo>>>,
    intake_tx: Sender<DeviceAnnouncement>,
    intake_rx: Receiver<DeviceAnnouncement>,
    window: Arc<ScanWindow>,
    shutdown: Arc<AtomicBool>,
    poll_wakeup: Arc<(Mutex<()>, Condvar)>,
    scan_interval: Duration,
    default_window: Duration,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl DiscoveryRegistry {
    pub fn new(
        transport: Arc<dyn RadioTransport>,
        connection: Arc<StateCell<ConnectionState>>,
        config: &LinkConfig,
    ) -> Self {
        let (intake_tx, intake_rx) = crossbeam_channel::unbounded();
        Self {
            transport,
            connection,
            bonded: Arc::new(StateCell::new(Vec::new())),
            cache: Arc::new(Mutex::new(HashMap::new())),
            intake_tx,
            intake_rx,
            window: Arc::new(ScanWindow::default()),
            shutdown: Arc::new(AtomicBool::new(false)),
            poll_wakeup: Arc::new((Mutex::new(()), Condvar::new())),
            scan_interval: Duration::from_millis(config.discovery.scan_interval_ms),
            default_window: Duration::from_millis(config.discovery.default_window_ms),
            workers: Mutex::new(Vec::new()),
        }
    }

    /// Whether the radio collaborator can discover devices at all
    pub fn is_supported(&self) -> bool {
        self.transport.is_available()
    }

    /// Start the poll and intake workers
    pub fn start(&self) -> crate::error::Result<()> {
        let mut workers = self.workers.lock();

        let poll = {
            let transport = Arc::clone(&self.transport);
            let bonded = Arc::clone(&self.bonded);
            let shutdown = Arc::clone(&self.shutdown);
            let wakeup = Arc::clone(&self.poll_wakeup);
            let interval = self.scan_interval;
            thread::Builder::new()
                .name("discovery-poll".to_string())
                .spawn(move || poll_loop(&transport, &bonded, &shutdown, &wakeup, interval))?
        };
        workers.push(poll);

        let intake = {
            let rx = self.intake_rx.clone();
            let cache = Arc::clone(&self.cache);
            let connection = Arc::clone(&self.connection);
            let shutdown = Arc::clone(&self.shutdown);
            thread::Builder::new()
                .name("discovery-intake".to_string())
                .spawn(move || intake_loop(&rx, &cache, &connection, &shutdown))?
        };
        workers.push(intake);

        log::info!("Discovery registry started");
        Ok(())
    }

    /// Queue a device announcement from the event collaborator
    pub fn announce(&self, announcement: DeviceAnnouncement) {
        if self.intake_tx.send(announcement).is_err() {
            log::debug!("Announcement dropped, intake queue closed");
        }
    }

    /// The merged device list: bonded devices plus announced devices,
    /// deduped by address (bonded wins), with the connected device excluded.
    pub fn devices(&self) -> Vec<DeviceInfo> {
        let connected = self.connection.get();
        let connected_address = connected.connected_address();

        let mut merged: Vec<DeviceInfo> = Vec::new();
        let mut push_unique = |device: DeviceInfo| {
            if Some(device.address.as_str()) != connected_address
                && !merged.iter().any(|d| d.address == device.address)
            {
                merged.push(device);
            }
        };

        for device in self.bonded.get() {
            push_unique(DeviceInfo {
                connected: false,
                ..device
            });
        }
        for device in self.cache.lock().values() {
            push_unique(device.clone());
        }
        merged
    }

    /// Start a discovery window that stops itself after `window`.
    ///
    /// Returns `false`, with no window scheduled, when the radio is
    /// unavailable or refuses to scan (missing authorization). Any
    /// previously running window is cancelled first. The caller is never
    /// blocked for the duration of the window.
    pub fn start_discovery(&self, window: Duration) -> bool {
        if !self.transport.is_available() {
            log::warn!("Radio unavailable, cannot start discovery");
            return false;
        }

        self.cancel_window();
        self.transport.cancel_discovery();

        if let Err(e) = self.transport.start_discovery() {
            log::error!("Cannot start discovery: {}", e);
            return false;
        }
        log::info!("Started device discovery for {:?}", window);

        let generation = *self.window.generation.lock();
        let scan_window = Arc::clone(&self.window);
        let transport = Arc::clone(&self.transport);
        let timer = thread::Builder::new()
            .name("discovery-timeout".to_string())
            .spawn(move || {
                if wait_for_window(&scan_window, generation, window) {
                    log::info!("Discovery window elapsed, stopping scan");
                    transport.cancel_discovery();
                }
            });
        if let Err(e) = timer {
            log::error!("Failed to schedule discovery stop: {}", e);
            self.transport.cancel_discovery();
            return false;
        }

        true
    }

    /// Start a discovery window of the configured default length
    pub fn start_default_discovery(&self) -> bool {
        self.start_discovery(self.default_window)
    }

    /// Stop scanning. Idempotent; safe to call when no discovery is active.
    pub fn end_discovery(&self) {
        self.cancel_window();
        self.transport.cancel_discovery();
    }

    fn cancel_window(&self) {
        *self.window.generation.lock() += 1;
        self.window.cancelled.notify_all();
    }

    /// Stop and join the background workers
    pub fn stop(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
        self.cancel_window();
        self.poll_wakeup.1.notify_all();

        let mut workers = self.workers.lock();
        for worker in workers.drain(..) {
            if worker.join().is_err() {
                log::error!("Discovery worker panicked");
            }
        }
    }
}

impl Drop for DiscoveryRegistry {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Returns true when the window elapsed without being cancelled.
fn wait_for_window(window: &ScanWindow, generation: u64, duration: Duration) -> bool {
    let deadline = Instant::now() + duration;
    let mut current = window.generation.lock();
    while *current == generation {
        if window
            .cancelled
            .wait_until(&mut current, deadline)
            .timed_out()
        {
            return *current == generation;
        }
    }
    false
}

fn poll_loop(
    transport: &Arc<dyn RadioTransport>,
    bonded: &StateCell<Vec<DeviceInfo>>,
    shutdown: &AtomicBool,
    wakeup: &(Mutex<()>, Condvar),
    interval: Duration,
) {
    while !shutdown.load(Ordering::Relaxed) {
        match transport.bonded_devices() {
            Ok(devices) => {
                log::debug!("Bonded device refresh: {} devices", devices.len());
                bonded.set(devices);
            }
            Err(e) => log::warn!("Bonded device refresh failed: {}", e),
        }

        let mut guard = wakeup.0.lock();
        if shutdown.load(Ordering::Relaxed) {
            break;
        }
        wakeup.1.wait_for(&mut guard, interval);
    }
    log::debug!("Discovery poll worker exiting");
}

fn intake_loop(
    rx: &Receiver<DeviceAnnouncement>,
    cache: &Mutex<HashMap<String, DeviceInfo>>,
    connection: &StateCell<ConnectionState>,
    shutdown: &AtomicBool,
) {
    while !shutdown.load(Ordering::Relaxed) {
        match rx.recv_timeout(INTAKE_POLL) {
            Ok(announcement) => apply_announcement(cache, connection, announcement),
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    log::debug!("Discovery intake worker exiting");
}

/// Upsert one announcement into the cache, or drop the entry when the
/// announced device is the one we are connected to.
fn apply_announcement(
    cache: &Mutex<HashMap<String, DeviceInfo>>,
    connection: &StateCell<ConnectionState>,
    announcement: DeviceAnnouncement,
) {
    let connected = connection.get();
    let mut cache = cache.lock();

    if connected.connected_address() == Some(announcement.address.as_str()) {
        cache.remove(&announcement.address);
        return;
    }

    log::info!("Device discovered: {}", announcement.address);
    let info = announcement.into_device_info();
    cache.insert(info.address.clone(), info);
}
