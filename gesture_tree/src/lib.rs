//! # gesture_tree
//!
//! A particle tree you conduct with one hand: close your fist and the
//! scattered cloud assembles into a tree, open your hand and it bursts
//! apart, pinch to pull the photo cards up in front of the camera.
//!
//! ## Gesture → Action mapping
//!
//! | Gesture | Action |
//! |---|---|
//! | Fist (0–1 fingers open) | Form the tree |
//! | Open palm (4–5 fingers open) | Scatter the tree |
//! | Pinch (thumb and index touching) | Magnify: photo cards line up in front of the camera |
//! | Any hand, moving | Orbit the camera |
//! | No hand, tree formed | Camera slowly auto-rotates |
//!
//! ## Feature flags
//!
//! * (default): **Simulation mode**: keyboard and mouse play the hand.
//! * `leap`: **Hardware mode**: polls a real LeapMotion controller via LeapC.
//!
//! ### Keyboard
//!
//! | Key | Action |
//! |---|---|
//! | `F` / `O` / `P` / `T` | Simulated fist / open / pinch / tracking hand |
//! | `H` | Withdraw the simulated hand |
//! | Mouse | Move the simulated hand |
//! | `Space` | Toggle formed / scattered |
//! | `1` / `2` | Scatter / form |
//! | `N` | Add the next configured photo |
//! | `Backspace` | Remove the newest photo |
//! | `Up` / `Down` | Zoom in / out |
//! | `Q` / `Escape` | Quit |

pub mod config;
pub mod assets;
pub mod visualizer;
pub mod app;

pub use app::{run, AppCommand, AppError, AppState};
pub use config::{AppConfig, CliArgs, ConfigError};
