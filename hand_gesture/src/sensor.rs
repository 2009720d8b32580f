//! Sensor supervision: hardware and simulated hand sources behind one trait.
//!
//! A [`LandmarkSource`] is built on its own thread by
//! [`SensorHandle::spawn`], so device handles never cross threads.  The
//! supervisor opens it (retrying while the device is merely unavailable),
//! pumps readings into a single-slot mailbox and closes it again on every
//! exit path.  Consumers only see the mailbox
//! and a [`SensorStatus`]; they don't know whether the hand came from real
//! hardware or the keyboard simulator.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use glam::Vec2;
use thiserror::Error;

use crate::landmarks::{HandPose, SensorReading};
use crate::mailbox::{mailbox, Publisher, Slot};

#[cfg(feature = "leap")]
pub mod leap;

// ════════════════════════════════════════════════════════════════════════════
// Errors / status
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SensorError {
    /// Detector not ready yet.  The supervisor retries after a delay.
    #[error("sensor unavailable: {0}")]
    Unavailable(String),
    /// Detector failed.  The sensor stays down for the rest of the session.
    #[error("sensor fault: {0}")]
    Fault(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SensorStatus {
    Starting = 0,
    Running  = 1,
    Retrying = 2,
    Faulted  = 3,
    Stopped  = 4,
}

impl SensorStatus {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => SensorStatus::Starting,
            1 => SensorStatus::Running,
            2 => SensorStatus::Retrying,
            3 => SensorStatus::Faulted,
            _ => SensorStatus::Stopped,
        }
    }

    /// Gesture input is gone for good; only manual toggles remain.
    pub fn is_degraded(self) -> bool { self == SensorStatus::Faulted }

    pub fn as_str(self) -> &'static str {
        match self {
            SensorStatus::Starting => "starting",
            SensorStatus::Running  => "running",
            SensorStatus::Retrying => "retrying",
            SensorStatus::Faulted  => "faulted",
            SensorStatus::Stopped  => "stopped",
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// LandmarkSource trait — unified interface for hw and sim
// ════════════════════════════════════════════════════════════════════════════

/// Anything that can produce hand landmark readings.
pub trait LandmarkSource: 'static {
    fn name(&self) -> &str;

    /// Acquire the device.
    fn open(&mut self) -> Result<(), SensorError>;

    /// Wait at most about one capture period for the next detector result.
    /// `Ok(None)` means the period passed without a result.
    fn next_reading(&mut self) -> Result<Option<SensorReading>, SensorError>;

    /// Release the device.  Called exactly once after a successful `open`.
    fn close(&mut self) {}
}

/// Calls `close` when dropped, including during unwinding.
struct OpenGuard<'a, S: LandmarkSource> {
    source: &'a mut S,
}

impl<S: LandmarkSource> Drop for OpenGuard<'_, S> {
    fn drop(&mut self) {
        self.source.close();
        tracing::debug!(target: "sensor", source = self.source.name(), "sensor closed");
    }
}

// ════════════════════════════════════════════════════════════════════════════
// SensorHandle — the supervisor thread
// ════════════════════════════════════════════════════════════════════════════

/// Owning handle to a running sensor.  Dropping it stops and joins the
/// thread, which releases the device.
pub struct SensorHandle {
    stop:   Arc<AtomicBool>,
    status: Arc<AtomicU8>,
    thread: Option<JoinHandle<()>>,
}

impl SensorHandle {
    /// Build a source with `make` on a new thread and supervise it there.
    /// Returns the handle plus the slot the frame loop reads from.
    pub fn spawn<S, F>(make: F, retry_delay: Duration) -> (Self, Slot<SensorReading>)
    where
        S: LandmarkSource,
        F: FnOnce() -> S + Send + 'static,
    {
        let (publisher, slot) = mailbox();
        let stop   = Arc::new(AtomicBool::new(false));
        let status = Arc::new(AtomicU8::new(SensorStatus::Starting as u8));

        let thread = {
            let stop   = Arc::clone(&stop);
            let status = Arc::clone(&status);
            thread::spawn(move || supervise(make(), publisher, &stop, &status, retry_delay))
        };

        (SensorHandle { stop, status, thread: Some(thread) }, slot)
    }

    pub fn status(&self) -> SensorStatus {
        SensorStatus::from_u8(self.status.load(Ordering::Acquire))
    }

    /// Stop the sensor and wait for the device to be released.
    pub fn shutdown(mut self) { self.stop_and_join(); }

    fn stop_and_join(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(t) = self.thread.take() {
            if t.join().is_err() {
                tracing::error!(target: "sensor", "sensor thread panicked");
                self.status.store(SensorStatus::Faulted as u8, Ordering::Release);
            }
        }
    }
}

impl Drop for SensorHandle {
    fn drop(&mut self) { self.stop_and_join(); }
}

fn set_status(status: &AtomicU8, s: SensorStatus) {
    status.store(s as u8, Ordering::Release);
}

/// Sleep in short slices so a stop request is honoured promptly.
fn pause(total: Duration, stop: &AtomicBool) {
    const SLICE: Duration = Duration::from_millis(10);
    let mut left = total;
    while !left.is_zero() && !stop.load(Ordering::Acquire) {
        let step = left.min(SLICE);
        thread::sleep(step);
        left -= step;
    }
}

enum SessionEnd {
    Stopped,
    Lost(String),
    Faulted,
}

fn supervise<S: LandmarkSource>(
    mut source:  S,
    publisher:   Publisher<SensorReading>,
    stop:        &AtomicBool,
    status:      &AtomicU8,
    retry_delay: Duration,
) {
    let name = source.name().to_string();
    tracing::info!(target: "sensor", source = %name, "sensor thread started");

    loop {
        if stop.load(Ordering::Acquire) {
            break;
        }
        match source.open() {
            Ok(()) => {}
            Err(SensorError::Unavailable(why)) => {
                tracing::warn!(target: "sensor", source = %name, %why, ?retry_delay, "sensor unavailable, retrying");
                set_status(status, SensorStatus::Retrying);
                pause(retry_delay, stop);
                continue;
            }
            Err(SensorError::Fault(why)) => {
                tracing::error!(target: "sensor", source = %name, %why, "sensor failed to open; gestures disabled");
                set_status(status, SensorStatus::Faulted);
                return;
            }
        }

        set_status(status, SensorStatus::Running);
        tracing::info!(target: "sensor", source = %name, "sensor running");

        match run_session(&mut source, &publisher, stop) {
            SessionEnd::Stopped => break,
            SessionEnd::Lost(why) => {
                tracing::warn!(target: "sensor", source = %name, %why, "sensor lost, reopening");
                set_status(status, SensorStatus::Retrying);
                pause(retry_delay, stop);
            }
            SessionEnd::Faulted => {
                set_status(status, SensorStatus::Faulted);
                return;
            }
        }
    }

    set_status(status, SensorStatus::Stopped);
    tracing::info!(target: "sensor", source = %name, "sensor thread stopped");
}

fn run_session<S: LandmarkSource>(
    source:    &mut S,
    publisher: &Publisher<SensorReading>,
    stop:      &AtomicBool,
) -> SessionEnd {
    let mut guard = OpenGuard { source };
    while !stop.load(Ordering::Acquire) {
        if publisher.is_orphaned() {
            return SessionEnd::Stopped;
        }
        match guard.source.next_reading() {
            Ok(Some(reading)) => { publisher.publish(reading); }
            Ok(None) => {}
            Err(SensorError::Unavailable(why)) => return SessionEnd::Lost(why),
            Err(SensorError::Fault(why)) => {
                tracing::error!(target: "sensor", source = guard.source.name(), %why, "sensor fault during capture; gestures disabled");
                return SessionEnd::Faulted;
            }
        }
    }
    SessionEnd::Stopped
}

// ════════════════════════════════════════════════════════════════════════════
// SimLandmarkSource — keyboard/mouse simulation (always available)
// ════════════════════════════════════════════════════════════════════════════

/// Poses the simulator can hold.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SimGesture {
    Fist,
    Open,
    Pinch,
    /// Three fingers up, inside the classifier's dead zone.
    Tracking,
}

impl SimGesture {
    fn pose(self, center: Vec2) -> HandPose {
        match self {
            SimGesture::Fist     => HandPose::fist(center),
            SimGesture::Open     => HandPose::open_palm(center),
            SimGesture::Pinch    => HandPose::pinch(center, 0.02),
            SimGesture::Tracking => HandPose::with_open_count(center, 3),
        }
    }
}

/// Raw input from the simulation window.
#[derive(Clone, Debug, PartialEq)]
pub enum SimInput {
    /// Put a hand in front of the "camera" holding this pose.
    Show(SimGesture),
    /// Move the palm centre (normalized image coordinates).
    MoveTo(Vec2),
    /// Take the hand out of view.
    Withdraw,
}

/// Hand source driven by [`SimInput`] events from the visualizer window.
///
/// Emits one synthetic reading per `period`, whether or not the input
/// changed, the way a camera-driven detector would.
pub struct SimLandmarkSource {
    rx:      Receiver<SimInput>,
    period:  Duration,
    center:  Vec2,
    gesture: Option<SimGesture>,
}

impl SimLandmarkSource {
    pub fn new(rx: Receiver<SimInput>, period: Duration) -> Self {
        SimLandmarkSource { rx, period, center: Vec2::new(0.5, 0.5), gesture: None }
    }

    fn apply(&mut self, input: SimInput) {
        match input {
            SimInput::Show(g)   => self.gesture = Some(g),
            SimInput::MoveTo(c) => self.center = c,
            SimInput::Withdraw  => self.gesture = None,
        }
    }

    fn current(&self) -> SensorReading {
        match self.gesture {
            Some(g) => g.pose(self.center).reading(),
            None    => SensorReading::NoHand,
        }
    }
}

impl LandmarkSource for SimLandmarkSource {
    fn name(&self) -> &str { "simulator" }

    fn open(&mut self) -> Result<(), SensorError> { Ok(()) }

    fn next_reading(&mut self) -> Result<Option<SensorReading>, SensorError> {
        match self.rx.recv_timeout(self.period) {
            Ok(input) => {
                self.apply(input);
                while let Ok(more) = self.rx.try_recv() {
                    self.apply(more);
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            // Window gone: keep the last pose until the supervisor stops us.
            Err(RecvTimeoutError::Disconnected) => thread::sleep(self.period),
        }
        Ok(Some(self.current()))
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
