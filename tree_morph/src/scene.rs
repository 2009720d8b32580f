//! One frame of the engine: classify the latest hand reading, settle the
//! interaction state, advance the morph factor, move every group and steer
//! the camera, strictly in that order.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use hand_gesture::{ClassifierConfig, GestureClassifier, GestureEvent, InteractionState, SensorReading};

use crate::camera::{CameraConfig, CameraController, CameraFrame};
use crate::groups::{GroupsConfig, ParticleGroupManager, PhotoAsset, PhotoCard, PhotoId, RenderInstance};
use crate::morph::{MorphConfig, MorphDriver};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub morph:  MorphConfig,
    pub camera: CameraConfig,
    pub groups: GroupsConfig,
}

/// What happened during one [`Scene::tick`].
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    pub event:        GestureEvent,
    pub state:        InteractionState,
    /// The new state when this tick changed it.
    pub transitioned: Option<InteractionState>,
    pub factor:       f32,
}

// ════════════════════════════════════════════════════════════════════════════
// Scene
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug)]
pub struct Scene {
    state:      InteractionState,
    classifier: GestureClassifier,
    morph:      MorphDriver,
    camera:     CameraController,
    groups:     ParticleGroupManager,
    rng:        StdRng,
    degraded:   bool,
}

impl Scene {
    /// Build the scene.  The same seed always yields the same layout.
    pub fn new(config: SceneConfig, classifier: ClassifierConfig, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let groups  = ParticleGroupManager::new(config.groups, &mut rng);
        Scene {
            state:      InteractionState::default(),
            classifier: GestureClassifier::new(classifier),
            morph:      MorphDriver::new(config.morph),
            camera:     CameraController::new(config.camera),
            groups,
            rng,
            degraded:   false,
        }
    }

    pub fn state(&self)        -> InteractionState { self.state }
    pub fn factor(&self)       -> f32 { self.morph.factor() }
    pub fn last_event(&self)   -> &GestureEvent { self.classifier.last() }
    pub fn camera_frame(&self) -> CameraFrame { self.camera.frame() }
    pub fn camera(&self)       -> &CameraController { &self.camera }
    pub fn groups(&self)       -> &ParticleGroupManager { &self.groups }
    pub fn is_degraded(&self)  -> bool { self.degraded }

    pub fn zoom_by(&mut self, delta: f32) { self.camera.zoom_by(delta); }

    /// Record whether the hand sensor has given up.  Manual toggling keeps
    /// working either way.
    pub fn set_degraded(&mut self, degraded: bool) {
        if degraded != self.degraded {
            if degraded {
                tracing::warn!(target: "scene", "hand tracking unavailable, manual toggle only");
            } else {
                tracing::info!(target: "scene", "hand tracking restored");
            }
        }
        self.degraded = degraded;
    }

    /// Explicit override; the next qualifying gesture may override it back.
    /// Returns true when the state changed.
    pub fn apply_toggle(&mut self, state: InteractionState) -> bool {
        self.set_state(state, "user")
    }

    pub fn toggle(&mut self) -> InteractionState {
        let next = self.state.toggled();
        self.apply_toggle(next);
        next
    }

    fn set_state(&mut self, state: InteractionState, cause: &'static str) -> bool {
        if state == self.state {
            return false;
        }
        tracing::info!(target: "scene", from = self.state.name(), to = state.name(), cause, "state transition");
        self.state = state;
        self.morph.set_target(state);
        true
    }

    /// Advance one frame.  `reading` is whatever the sensor published since
    /// the previous tick, if anything.
    pub fn tick(&mut self, reading: Option<SensorReading>, dt: f32) -> TickReport {
        let event = self.classifier.update(reading.as_ref());

        let transitioned = event
            .requested_state()
            .filter(|_| event.fresh)
            .filter(|&wanted| self.set_state(wanted, event.label.as_str()));

        let dt = self.morph.clamp_dt(dt);
        let m  = self.morph.advance(dt);

        let frame = self.camera.frame();
        let speed = self.morph.config().speed_multiplier;
        self.groups.tick(m, event.magnify, &frame, dt, speed);

        self.camera.update(&event, self.state, dt);

        TickReport { event, state: self.state, transitioned, factor: m }
    }

    // ── photos ────────────────────────────────────────────────────────────

    pub fn add_photo(&mut self) -> PhotoId { self.groups.add_photo(&mut self.rng) }

    pub fn attach_photo(&mut self, id: PhotoId, asset: Arc<PhotoAsset>) -> bool {
        self.groups.attach_asset(id, asset)
    }

    pub fn remove_photo(&mut self, id: PhotoId) -> bool { self.groups.remove_photo(id) }

    pub fn photos(&self) -> &[PhotoCard] { self.groups.photos() }

    pub fn instances(&self) -> impl Iterator<Item = RenderInstance<'_>> + '_ {
        self.groups.instances()
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;
    use hand_gesture::{GestureLabel, HandPose};

    const DT: f32 = 1.0 / 60.0;
    const CENTER: Vec2 = Vec2::new(0.5, 0.5);

    fn scene() -> Scene {
        let config = SceneConfig {
            groups: GroupsConfig {
                foliage_count:     40,
                heavy_count:       4,
                light_count:       4,
                extra_light_count: 4,
                trail_count:       10,
                ..GroupsConfig::default()
            },
            ..SceneConfig::default()
        };
        Scene::new(config, ClassifierConfig::default(), 3)
    }

    fn asset() -> Arc<PhotoAsset> {
        Arc::new(PhotoAsset { width: 2, height: 2, pixels: vec![0xFF808080; 4] })
    }

    #[test]
    fn fist_forms_immediately_and_factor_walks_linearly() {
        let mut s = scene();
        assert_eq!(s.state(), InteractionState::Scattered);
        assert_eq!(s.factor(), 0.0);

        let r = s.tick(Some(HandPose::fist(CENTER).reading()), DT);
        assert_eq!(r.event.label, GestureLabel::Fist);
        assert_eq!(r.state, InteractionState::Formed);
        assert_eq!(r.transitioned, Some(InteractionState::Formed));

        let step = DT * 1.5 + 1e-6;
        assert!(r.factor <= step);
        let mut prev = r.factor;
        for _ in 0..100 {
            let m = s.tick(None, DT).factor;
            assert!(m - prev <= step);
            assert!(m >= prev);
            prev = m;
        }
        assert_eq!(prev, 1.0);
    }

    #[test]
    fn tracking_leaves_state_alone() {
        let mut s = scene();
        let r = s.tick(Some(HandPose::with_open_count(CENTER, 3).reading()), DT);
        assert_eq!(r.event.label, GestureLabel::Tracking);
        assert_eq!(r.state, InteractionState::Scattered);
        assert_eq!(r.transitioned, None);
    }

    #[test]
    fn reused_event_does_not_retrigger_after_override() {
        let mut s = scene();
        s.tick(Some(HandPose::fist(CENTER).reading()), DT);
        assert_eq!(s.state(), InteractionState::Formed);

        s.apply_toggle(InteractionState::Scattered);
        let r = s.tick(None, DT);
        assert!(!r.event.fresh);
        assert_eq!(r.state, InteractionState::Scattered);

        let r = s.tick(Some(HandPose::fist(CENTER).reading()), DT);
        assert_eq!(r.state, InteractionState::Formed);
    }

    #[test]
    fn open_palm_scatters() {
        let mut s = scene();
        s.toggle();
        assert_eq!(s.state(), InteractionState::Formed);
        let r = s.tick(Some(HandPose::open_palm(CENTER).reading()), DT);
        assert_eq!(r.transitioned, Some(InteractionState::Scattered));
    }

    #[test]
    fn no_hand_keeps_state() {
        let mut s = scene();
        s.toggle();
        let r = s.tick(Some(SensorReading::NoHand), DT);
        assert_eq!(r.event.label, GestureLabel::None);
        assert_eq!(r.state, InteractionState::Formed);
    }

    #[test]
    fn pinch_lines_photos_up_in_front_of_camera() {
        let mut s = scene();
        for _ in 0..3 {
            let id = s.add_photo();
            s.attach_photo(id, asset());
        }
        let pinch = HandPose::pinch(CENTER, 0.02).reading();
        let r = s.tick(Some(pinch), DT);
        assert!(r.event.magnify);
        for _ in 0..120 { s.tick(None, DT); }

        let cam     = s.camera_frame();
        let targets = s.groups().photo_targets(&cam);
        let radius  = s.groups().config().magnify_radius;
        for t in &targets {
            assert!((t.distance(cam.position) - radius).abs() < 1e-3);
        }
        let ahead = cam.position + cam.forward() * radius;
        assert!(targets[1].distance(ahead) < 1e-3);

        for (card, t) in s.photos().iter().zip(&targets) {
            assert!(card.entity().current().distance(*t) < 0.01);
        }
    }

    #[test]
    fn stall_is_clamped() {
        let mut s = scene();
        s.toggle();
        let r = s.tick(None, 3.0);
        assert!((r.factor - 0.15).abs() < 1e-6);
    }

    #[test]
    fn degraded_flag_round_trips() {
        let mut s = scene();
        s.set_degraded(true);
        assert!(s.is_degraded());
        assert_eq!(s.toggle(), InteractionState::Formed);
        s.set_degraded(false);
        assert!(!s.is_degraded());
    }

    #[test]
    fn same_seed_same_layout() {
        let a = scene();
        let b = scene();
        let pa: Vec<_> = a.instances().map(|i| i.position).collect();
        let pb: Vec<_> = b.instances().map(|i| i.position).collect();
        assert_eq!(pa, pb);
    }
}
