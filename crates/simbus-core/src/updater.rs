//! Background state updater.
//!
//! One long-lived OS thread wakes at a fixed ~100 Hz cadence and calls
//! [`crate::DeviceBackend::advance`] on every present device, so reads
//! observe time-varying data even when no transaction traffic is flowing.
//!
//! # Cancellation
//!
//! Shutdown is an mpsc channel rather than a polled flag: the tick loop
//! blocks in `recv_timeout`, and either an explicit send or the sender being
//! dropped ends the loop on the next tick boundary. [`Updater::shutdown`]
//! joins the thread, so by the time the simulator is torn down the updater
//! can no longer hold or acquire any lock.
//!
//! # Locking
//!
//! Each tick clones the `Arc`s of present devices during a brief bus-lock
//! hold, then invokes `advance` with no bus lock held. The updater therefore
//! only ever takes device-internal locks while holding nothing else, which
//! is why it cannot deadlock against transaction dispatch and cannot stall
//! lookups while a device's state is being mutated.

use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::device::DeviceBackend;
use crate::sim::Shared;

/// Update cadence (~100 Hz).
const TICK: Duration = Duration::from_millis(10);

pub(crate) struct Updater {
    stop: mpsc::Sender<()>,
    thread: Option<JoinHandle<()>>,
}

impl Updater {
    pub(crate) fn spawn(shared: Arc<Shared>) -> Self {
        let (stop, ticks) = mpsc::channel();
        let thread = std::thread::spawn(move || run(&shared, &ticks));
        Self { stop, thread: Some(thread) }
    }

    /// Signal the tick loop and block until the thread has exited.
    pub(crate) fn shutdown(&mut self) {
        let _ = self.stop.send(());
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for Updater {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run(shared: &Shared, stop: &Receiver<()>) {
    let mut scratch: Vec<Arc<dyn DeviceBackend>> = Vec::new();
    loop {
        match stop.recv_timeout(TICK) {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }

        for bus in shared.buses() {
            bus.collect_backends(&mut scratch);
            for backend in scratch.drain(..) {
                backend.advance();
            }
        }
    }
}
