//! LeapMotion hardware source (feature = "leap").
//!
//! Requires the LeapC shared library installed.  Leap reports joints in
//! millimetres above the device; we project the first tracked hand onto the
//! horizontal/vertical plane and normalise to the same image-space layout a
//! camera-based detector produces (y downward, roughly `[0, 1]`).

use glam::Vec2;
use leaprs::{Connection, ConnectionConfig, Event};

use super::{LandmarkSource, SensorError};
use crate::landmarks::{SensorReading, LANDMARK_COUNT, WRIST};

/// Interaction box mapped onto `[0, 1]²` (millimetres).  `x` is mirrored so
/// the result reads like an unflipped front-facing camera image.
const X_SPAN_MM:  f32 = 400.0;
const Y_FLOOR_MM: f32 = 80.0;
const Y_SPAN_MM:  f32 = 400.0;
const POLL_MS:    u64 = 100;

pub struct LeapLandmarkSource {
    connection: Option<Connection>,
}

impl LeapLandmarkSource {
    pub fn new() -> Self { LeapLandmarkSource { connection: None } }
}

impl Default for LeapLandmarkSource {
    fn default() -> Self { Self::new() }
}

fn project(x: f32, y: f32) -> Vec2 {
    Vec2::new(
        0.5 - x / X_SPAN_MM,
        1.0 - (y - Y_FLOOR_MM) / Y_SPAN_MM,
    )
}

impl LandmarkSource for LeapLandmarkSource {
    fn name(&self) -> &str { "leapmotion" }

    fn open(&mut self) -> Result<(), SensorError> {
        let mut connection = Connection::create(ConnectionConfig::default())
            .map_err(|e| SensorError::Fault(format!("LeapC connection: {:?}", e)))?;
        connection
            .open()
            .map_err(|e| SensorError::Unavailable(format!("LeapMotion device: {:?}", e)))?;
        self.connection = Some(connection);
        Ok(())
    }

    fn next_reading(&mut self) -> Result<Option<SensorReading>, SensorError> {
        let connection = self
            .connection
            .as_mut()
            .ok_or_else(|| SensorError::Unavailable("not opened".into()))?;

        let msg = match connection.poll(POLL_MS) {
            Ok(m)  => m,
            Err(_) => return Ok(None),
        };

        let Event::Tracking(frame) = msg.event() else {
            return Ok(None);
        };

        let Some(hand) = frame.hands().next() else {
            return Ok(Some(SensorReading::NoHand));
        };

        let mut points = vec![Vec2::ZERO; LANDMARK_COUNT];
        for (finger, digit) in hand.digits().enumerate().take(5) {
            let base = 1 + finger * 4;
            let knuckle = digit.proximal().prev_joint();
            let middle  = digit.intermediate().prev_joint();
            let last    = digit.distal().prev_joint();
            let tip     = digit.distal().next_joint();
            points[base]     = project(knuckle.x, knuckle.y);
            points[base + 1] = project(middle.x,  middle.y);
            points[base + 2] = project(last.x,    last.y);
            points[base + 3] = project(tip.x,     tip.y);
            if finger == 2 {
                // Carpal end of the middle metacarpal stands in for the wrist.
                let carpal = digit.metacarpal().prev_joint();
                points[WRIST] = project(carpal.x, carpal.y);
            }
        }
        Ok(Some(SensorReading::Landmarks(points)))
    }

    fn close(&mut self) {
        self.connection = None;
    }
}
