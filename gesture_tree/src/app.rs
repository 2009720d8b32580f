//! Top-level application state machine.
//!
//! `AppState` owns the [`Scene`], the photo loader and the photo list.  It
//! applies user commands, attaches finished photo loads and ticks the
//! scene once per frame.  [`run`] wires it to the sensor thread and the
//! window.

use std::path::PathBuf;
use std::time::Instant;

use thiserror::Error;

use hand_gesture::sensor::{SensorHandle, SensorStatus};
use hand_gesture::{InteractionState, SensorReading};
use tree_morph::{PhotoId, Scene};

use crate::assets::{AssetLoader, THUMB_MAX};
use crate::config::{AppConfig, ConfigError};
use crate::visualizer::Visualizer;

/// Camera distance change per zoom key press.
pub const ZOOM_STEP: f32 = 2.0;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("window error: {0}")]
    Window(String),
}

/// Discrete user input from the window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AppCommand {
    Toggle,
    SetState(InteractionState),
    /// Add a card for the next configured photo, cycling through the list.
    AddNextPhoto,
    RemoveLastPhoto,
    /// Change the camera distance by this many world units.
    Zoom(f32),
    Quit,
}

// ════════════════════════════════════════════════════════════════════════════
// AppState
// ════════════════════════════════════════════════════════════════════════════

pub struct AppState {
    scene:       Scene,

    // ── photos ───────────────────────────────────────────────────────────
    loader:      AssetLoader,
    photo_paths: Vec<PathBuf>,
    next_photo:  usize,
    /// Cards in insertion order, loaded or not.
    cards:       Vec<PhotoId>,

    // ── status message ────────────────────────────────────────────────────
    pub status:  String,
}

impl AppState {
    pub fn new(cfg: AppConfig) -> Self {
        let scene = Scene::new(cfg.scene, cfg.classifier, cfg.seed);
        let mut app = AppState {
            scene,
            loader:      AssetLoader::spawn(THUMB_MAX),
            photo_paths: cfg.photos,
            next_photo:  0,
            cards:       Vec::new(),
            status:      String::from("Ready. Close your fist to form the tree"),
        };
        for _ in 0..app.photo_paths.len() {
            app.add_next_photo();
        }
        app
    }

    // ── process one AppCommand ───────────────────────────────────────────

    pub fn handle_command(&mut self, cmd: AppCommand) {
        match cmd {
            AppCommand::Toggle => {
                let s = self.scene.toggle();
                self.status = format!("Toggled: {}", s.name());
            }
            AppCommand::SetState(s) => {
                if self.scene.apply_toggle(s) {
                    self.status = format!("State: {}", s.name());
                }
            }
            AppCommand::AddNextPhoto => self.add_next_photo(),
            AppCommand::RemoveLastPhoto => {
                match self.cards.pop() {
                    Some(id) => {
                        self.scene.remove_photo(id);
                        self.status = format!("Photo removed, {} left", self.cards.len());
                    }
                    None => self.status = String::from("No photos to remove"),
                }
            }
            AppCommand::Zoom(delta) => {
                self.scene.zoom_by(delta);
                self.status = format!("Zoom: {:.0}", self.scene.camera().radius());
            }
            AppCommand::Quit => { /* handled in run loop */ }
        }
    }

    fn add_next_photo(&mut self) {
        if self.photo_paths.is_empty() {
            self.status = String::from("No photos configured");
            return;
        }
        let path = self.photo_paths[self.next_photo % self.photo_paths.len()].clone();
        self.next_photo += 1;
        let id = self.scene.add_photo();
        self.cards.push(id);
        self.loader.request(id, path);
    }

    /// Attach finished thumbnails; drop cards whose image failed.
    pub fn poll_assets(&mut self) {
        for outcome in self.loader.poll() {
            match outcome.result {
                Ok(asset) => {
                    if self.scene.attach_photo(outcome.id, asset) {
                        tracing::info!(target: "app", path = %outcome.path.display(), "photo loaded");
                    } else {
                        tracing::debug!(target: "app", id = outcome.id.0, "photo arrived after its card was removed");
                    }
                }
                Err(e) => {
                    tracing::warn!(target: "app", error = %e, "photo skipped");
                    self.scene.remove_photo(outcome.id);
                    self.cards.retain(|&c| c != outcome.id);
                    self.status = format!("Photo skipped: {}", outcome.path.display());
                }
            }
        }
    }

    // ── Per-frame tick ────────────────────────────────────────────────────

    pub fn tick(&mut self, reading: Option<SensorReading>, sensor: SensorStatus, dt: f32) {
        self.scene.set_degraded(sensor.is_degraded());
        self.poll_assets();

        let report = self.scene.tick(reading, dt);
        if let Some(s) = report.transitioned {
            self.status = format!("{}: {}", report.event.label.as_str(), s.name());
        }
    }

    // ── Accessors for the render loop ─────────────────────────────────────

    pub fn scene(&self) -> &Scene { &self.scene }
    pub fn card_count(&self) -> usize { self.cards.len() }
}

// ════════════════════════════════════════════════════════════════════════════
// run() — the main application loop
// ════════════════════════════════════════════════════════════════════════════

/// Run the full application.
///
/// Creates the window, the hand sensor (simulation by default, hardware
/// with `--features leap`) and drives the frame loop at ~60 fps.
pub fn run(cfg: AppConfig) -> Result<(), AppError> {
    // ── Hand sensor ───────────────────────────────────────────────────────
    #[cfg(not(feature = "leap"))]
    let (sim_tx, sensor, readings) = {
        use hand_gesture::sensor::SimLandmarkSource;
        let (tx, rx) = std::sync::mpsc::channel();
        let period   = cfg.sensor.sim_period();
        let (handle, slot) =
            SensorHandle::spawn(move || SimLandmarkSource::new(rx, period), cfg.sensor.retry_delay());
        (Some(tx), handle, slot)
    };
    #[cfg(feature = "leap")]
    let (sim_tx, sensor, readings) = {
        use hand_gesture::sensor::leap::LeapLandmarkSource;
        let (handle, slot) = SensorHandle::spawn(LeapLandmarkSource::new, cfg.sensor.retry_delay());
        (None, handle, slot)
    };

    // ── Visualizer (owns the window and the sim input sender) ────────────
    let mut vis = Visualizer::new(cfg.window.width, cfg.window.height, sim_tx)?;

    // ── App state ─────────────────────────────────────────────────────────
    let mut app = AppState::new(cfg);
    tracing::info!(target: "app", photos = app.card_count(), "scene ready");

    // ── Main loop ─────────────────────────────────────────────────────────
    let mut last = Instant::now();
    'frame: while vis.is_open() {
        // 1. Window input → commands (and sim hand input, sent directly)
        for cmd in vis.poll_input() {
            if cmd == AppCommand::Quit { break 'frame; }
            app.handle_command(cmd);
        }

        // 2. Per-frame logic
        let now = Instant::now();
        let dt  = now.duration_since(last).as_secs_f32();
        last    = now;
        app.tick(readings.take_latest(), sensor.status(), dt);

        // 3. Render
        vis.render(app.scene(), &app.status, sensor.status());
    }

    sensor.shutdown();
    Ok(())
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;
    use hand_gesture::HandPose;
    use std::time::Duration;
    use tree_morph::GroupsConfig;

    const DT: f32 = 1.0 / 60.0;

    fn config(photos: Vec<PathBuf>) -> AppConfig {
        let mut cfg = AppConfig::default();
        cfg.scene.groups = GroupsConfig {
            foliage_count:     30,
            heavy_count:       3,
            light_count:       3,
            extra_light_count: 3,
            trail_count:       10,
            ..GroupsConfig::default()
        };
        cfg.photos = photos;
        cfg
    }

    fn make_app() -> AppState { AppState::new(config(Vec::new())) }

    fn settle_assets(app: &mut AppState) {
        for _ in 0..400 {
            app.poll_assets();
            if app.scene().photos().len() == app.card_count()
                && app.scene().photos().iter().all(|c| c.is_ready())
            {
                return;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    fn temp_png(tag: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("gesture_tree_app_{}_{}.png", tag, std::process::id()));
        image::RgbaImage::from_pixel(4, 4, image::Rgba([10, 20, 30, 255])).save(&path).unwrap();
        path
    }

    #[test]
    fn toggle_flips_state() {
        let mut app = make_app();
        app.handle_command(AppCommand::Toggle);
        assert_eq!(app.scene().state(), InteractionState::Formed);
        app.handle_command(AppCommand::Toggle);
        assert_eq!(app.scene().state(), InteractionState::Scattered);
    }

    #[test]
    fn set_state_is_idempotent() {
        let mut app = make_app();
        app.handle_command(AppCommand::SetState(InteractionState::Formed));
        app.handle_command(AppCommand::SetState(InteractionState::Formed));
        assert_eq!(app.scene().state(), InteractionState::Formed);
    }

    #[test]
    fn gesture_overrides_manual_toggle() {
        let mut app = make_app();
        app.handle_command(AppCommand::Toggle);
        let open = HandPose::open_palm(Vec2::new(0.5, 0.5)).reading();
        app.tick(Some(open), SensorStatus::Running, DT);
        assert_eq!(app.scene().state(), InteractionState::Scattered);
    }

    #[test]
    fn add_photo_without_paths_is_a_no_op() {
        let mut app = make_app();
        app.handle_command(AppCommand::AddNextPhoto);
        assert_eq!(app.card_count(), 0);
        assert!(app.scene().photos().is_empty());
        app.handle_command(AppCommand::RemoveLastPhoto);
        assert_eq!(app.card_count(), 0);
    }

    #[test]
    fn broken_photo_is_dropped_others_survive() {
        let good = temp_png("good");
        let mut app = AppState::new(config(vec![good.clone(), PathBuf::from("/no/such/photo.png")]));
        assert_eq!(app.card_count(), 2);
        settle_assets(&mut app);
        std::fs::remove_file(&good).ok();

        assert_eq!(app.card_count(), 1);
        assert_eq!(app.scene().photos().len(), 1);
        assert!(app.scene().photos()[0].is_ready());
    }

    #[test]
    fn add_and_remove_cycle_through_paths() {
        let path = temp_png("cycle");
        let mut app = AppState::new(config(vec![path.clone()]));
        app.handle_command(AppCommand::AddNextPhoto);
        assert_eq!(app.card_count(), 2);
        settle_assets(&mut app);
        std::fs::remove_file(&path).ok();
        assert_eq!(app.scene().photos().len(), 2);

        app.handle_command(AppCommand::RemoveLastPhoto);
        assert_eq!(app.card_count(), 1);
        assert_eq!(app.scene().photos().len(), 1);
    }

    #[test]
    fn zoom_moves_camera() {
        let mut app = make_app();
        let before = app.scene().camera().radius();
        app.handle_command(AppCommand::Zoom(ZOOM_STEP));
        assert_eq!(app.scene().camera().radius(), before + ZOOM_STEP);
    }

    #[test]
    fn faulted_sensor_degrades_but_toggle_still_works() {
        let mut app = make_app();
        app.tick(None, SensorStatus::Faulted, DT);
        assert!(app.scene().is_degraded());
        app.handle_command(AppCommand::Toggle);
        app.tick(None, SensorStatus::Faulted, DT);
        assert_eq!(app.scene().state(), InteractionState::Formed);
        assert!(app.scene().factor() > 0.0);
    }
}
