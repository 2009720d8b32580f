//! # hand_gesture
//!
//! Turns a stream of normalized 2D hand landmarks into discrete gestures and
//! a two-state interaction machine, and carries those samples from an
//! asynchronous sensor into a frame loop.
//!
//! ## Gesture → State mapping
//!
//! | Gesture | Condition | Interaction state |
//! |---|---|---|
//! | Pinch | thumb tip ↔ index tip < 0.05 | unchanged, magnify on |
//! | Fist | ≤ 1 finger open | Formed |
//! | Open | ≥ 4 fingers open | Scattered |
//! | Tracking | 2–3 fingers open | unchanged |
//! | None | no hand in frame | unchanged |
//!
//! The hand offset (middle-finger knuckle, mirrored to roughly `[-1, 1]`) is
//! reported whenever a hand is visible, whatever its label.
//!
//! ## Sensor plumbing
//!
//! A [`sensor::LandmarkSource`] runs on its own thread under a supervisor
//! that retries while the device is unavailable and gives up on a fault.
//! Samples land in a single-slot [`mailbox`] that the frame loop drains
//! without blocking.
//!
//! ## Feature flags
//!
//! * (default): [`sensor::SimLandmarkSource`] synthesises hands from
//!   keyboard/mouse commands.
//! * `leap`: `sensor::leap::LeapLandmarkSource` polls a LeapMotion
//!   controller via LeapC.

pub mod landmarks;
pub mod classifier;
pub mod state;
pub mod mailbox;
pub mod sensor;

pub use classifier::{ClassifierConfig, GestureClassifier, GestureEvent, GestureLabel};
pub use landmarks::{HandPose, LandmarkError, LandmarkSample, SensorReading};
pub use state::InteractionState;
