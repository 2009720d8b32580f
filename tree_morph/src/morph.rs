//! The global morph factor and the per-entity position laws.
//!
//! The factor follows a clamped linear law so it reaches 0 or 1 exactly in
//! finite time.  Entities then either take the eased blend directly
//! (foliage) or chase the linear blend with first-order smoothing at their
//! own arrival rate (ornaments, trail, photos).

use serde::{Deserialize, Serialize};

use hand_gesture::InteractionState;

use crate::entity::Entity;

/// Remaining distances below this snap onto the target.
const SNAP_EPSILON: f32 = 1e-5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MorphConfig {
    /// Factor units per second.
    pub global_rate:      f32,
    /// Longest frame delta honoured, in seconds.
    pub max_dt:           f32,
    /// Scales every entity's arrival rate.
    pub speed_multiplier: f32,
}

impl Default for MorphConfig {
    fn default() -> Self {
        MorphConfig {
            global_rate:      1.5,
            max_dt:           0.1,
            speed_multiplier: 1.0,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// MorphDriver
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
pub struct MorphDriver {
    factor: f32,
    target: f32,
    config: MorphConfig,
}

impl MorphDriver {
    pub fn new(config: MorphConfig) -> Self {
        MorphDriver { factor: 0.0, target: 0.0, config }
    }

    pub fn factor(&self) -> f32 { self.factor }
    pub fn target(&self) -> f32 { self.target }
    pub fn config(&self) -> &MorphConfig { &self.config }

    pub fn set_target(&mut self, state: InteractionState) {
        self.target = state.morph_target();
    }

    /// Frame delta made safe: negative or NaN → 0, stalls capped at `max_dt`.
    pub fn clamp_dt(&self, dt: f32) -> f32 {
        if dt.is_nan() || dt <= 0.0 {
            0.0
        } else {
            dt.min(self.config.max_dt)
        }
    }

    /// Move the factor one step toward the target and return it.
    pub fn advance(&mut self, dt: f32) -> f32 {
        let step = self.clamp_dt(dt) * self.config.global_rate;
        let gap  = self.target - self.factor;
        self.factor = if gap.abs() <= step + SNAP_EPSILON {
            self.target
        } else {
            (self.factor + step.copysign(gap)).clamp(0.0, 1.0)
        };
        self.factor
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Position laws
// ════════════════════════════════════════════════════════════════════════════

/// `4x³` below one half, mirrored above.
pub fn ease_in_out_cubic(x: f32) -> f32 {
    let x = x.clamp(0.0, 1.0);
    if x < 0.5 {
        4.0 * x * x * x
    } else {
        1.0 - (-2.0 * x + 2.0).powi(3) / 2.0
    }
}

/// Foliage: place the entity exactly on the eased blend.
pub fn settle_eased(entity: &mut Entity, m: f32) {
    let p = entity.blend(ease_in_out_cubic(m));
    entity.set_current(p);
}

/// Ornaments, trail, photos: chase the linear blend at the entity's own rate.
pub fn chase(entity: &mut Entity, m: f32, dt: f32, speed_multiplier: f32) {
    let target = entity.blend(m);
    let k = (dt * entity.arrival_rate() * speed_multiplier).min(1.0);
    approach(entity, target, k);
}

/// Move `current` the fraction `k` of the way to `target`.
pub fn approach(entity: &mut Entity, target: glam::Vec3, k: f32) {
    let cur = entity.current();
    entity.set_current(cur + (target - cur) * k.clamp(0.0, 1.0));
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
