//! Orbit camera steered by the hand offset.
//!
//! The camera lives on a sphere around `look_at`: radius from the user's
//! zoom, azimuth θ around the vertical axis, polar φ from straight up.
//! Cartesian conversion follows the usual `(r sinφ sinθ, r cosφ, r sinφ cosθ)`.

use std::f32::consts::{PI, TAU};

use glam::Vec3;
use serde::{Deserialize, Serialize};

use hand_gesture::{GestureEvent, InteractionState};

pub const MIN_POLAR: f32 = 0.1;
pub const MAX_POLAR: f32 = PI / 1.6;

/// Resting polar angle, slightly above the horizon.
pub const REST_POLAR: f32 = PI / 2.2;

const AZIMUTH_GAIN: f32 = -1.2;
const POLAR_GAIN:   f32 = 0.5;

/// Map an angle into [−π, π].
pub fn wrap_angle(a: f32) -> f32 {
    (a + PI).rem_euclid(TAU) - PI
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub radius:            f32,
    pub min_radius:        f32,
    pub max_radius:        f32,
    pub look_at:           [f32; 3],
    /// Azimuth drift while the formed tree is idle, rad/s.
    pub auto_rotate_speed: f32,
    /// Exponential smoothing rate toward hand-driven targets, 1/s.
    pub damping:           f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        CameraConfig {
            radius:            28.0,
            min_radius:        10.0,
            max_radius:        60.0,
            look_at:           [0.0, 0.0, 0.0],
            auto_rotate_speed: 0.3,
            damping:           3.0,
        }
    }
}

/// Resolved camera for one tick, handed to the renderer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraFrame {
    pub position:    Vec3,
    pub look_at:     Vec3,
    pub auto_rotate: bool,
    pub magnify:     bool,
}

impl CameraFrame {
    pub fn forward(&self) -> Vec3 {
        (self.look_at - self.position).normalize_or_zero()
    }

    /// Horizontal right vector of the view.
    pub fn right(&self) -> Vec3 {
        let r = self.forward().cross(Vec3::Y);
        if r.length_squared() < 1e-8 { Vec3::X } else { r.normalize() }
    }

    /// Camera-space up vector.
    pub fn up(&self) -> Vec3 {
        self.right().cross(self.forward())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// CameraController
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
pub struct CameraController {
    config:         CameraConfig,
    radius:         f32,
    azimuth:        f32,
    polar:          f32,
    target_azimuth: f32,
    target_polar:   f32,
    auto_rotate:    bool,
    magnify:        bool,
}

impl CameraController {
    pub fn new(config: CameraConfig) -> Self {
        let radius = config.radius.clamp(config.min_radius, config.max_radius);
        CameraController {
            config,
            radius,
            azimuth:        0.0,
            polar:          REST_POLAR,
            target_azimuth: 0.0,
            target_polar:   REST_POLAR,
            auto_rotate:    false,
            magnify:        false,
        }
    }

    pub fn azimuth(&self) -> f32 { self.azimuth }
    pub fn polar(&self)   -> f32 { self.polar }
    pub fn radius(&self)  -> f32 { self.radius }

    pub fn set_zoom(&mut self, radius: f32) {
        self.radius = radius.clamp(self.config.min_radius, self.config.max_radius);
    }

    pub fn zoom_by(&mut self, delta: f32) { self.set_zoom(self.radius + delta); }

    /// Advance one tick from this tick's gesture and the current state.
    pub fn update(&mut self, event: &GestureEvent, state: InteractionState, dt: f32) {
        self.magnify = event.magnify;

        if let (Some(offset), false) = (event.hand_offset, event.magnify) {
            self.target_azimuth = offset.x * AZIMUTH_GAIN;
            self.target_polar   = (REST_POLAR - offset.y * POLAR_GAIN).clamp(MIN_POLAR, MAX_POLAR);
            let k = (dt * self.config.damping).clamp(0.0, 1.0);
            // Shortest signed arc, so a hand returning after auto-rotate
            // never unwinds whole turns.
            let delta = wrap_angle(self.target_azimuth - self.azimuth);
            self.azimuth = wrap_angle(self.azimuth + delta * k);
            self.polar   += (self.target_polar - self.polar) * k;
        }

        self.auto_rotate = state == InteractionState::Formed
            && event.hand_offset.is_none()
            && !event.magnify;
        if self.auto_rotate {
            self.azimuth = wrap_angle(self.azimuth + self.config.auto_rotate_speed * dt.max(0.0));
            self.target_azimuth = self.azimuth;
        }
    }

    pub fn position(&self) -> Vec3 {
        let s = self.polar.sin();
        Vec3::from(self.config.look_at)
            + Vec3::new(
                self.radius * s * self.azimuth.sin(),
                self.radius * self.polar.cos(),
                self.radius * s * self.azimuth.cos(),
            )
    }

    pub fn frame(&self) -> CameraFrame {
        CameraFrame {
            position:    self.position(),
            look_at:     Vec3::from(self.config.look_at),
            auto_rotate: self.auto_rotate,
            magnify:     self.magnify,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
