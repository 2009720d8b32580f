//! Per-tick gesture classification.
//!
//! The public interface is [`GestureClassifier::update`], called exactly once
//! per frame with the newest [`SensorReading`] (or `None` when the sensor has
//! not produced anything since the previous frame).

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::landmarks::{
    LandmarkSample, SensorReading, FINGER_JOINTS, INDEX_TIP, MIDDLE_MCP, THUMB_TIP, WRIST,
};
use crate::state::InteractionState;

// ════════════════════════════════════════════════════════════════════════════
// GestureLabel / GestureEvent
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GestureLabel {
    /// At most one finger open.
    Fist,
    /// Four or more fingers open.
    Open,
    /// Thumb and index tips touching.  Pre-empts every other label.
    Pinch,
    /// Intermediate pose, 2–3 fingers open.
    Tracking,
    /// No usable hand this tick.
    None,
}

impl GestureLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            GestureLabel::Fist     => "fist",
            GestureLabel::Open     => "open",
            GestureLabel::Pinch    => "pinch",
            GestureLabel::Tracking => "tracking",
            GestureLabel::None     => "none",
        }
    }
}

/// Classification output for one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct GestureEvent {
    pub label:       GestureLabel,
    /// Mirrored middle-knuckle position mapped to roughly `[-1, 1]`.
    /// Present whenever a valid hand is, regardless of label.
    pub hand_offset: Option<Vec2>,
    pub magnify:     bool,
    /// False when this tick reused the previous classification.
    pub fresh:       bool,
}

impl GestureEvent {
    pub fn none() -> Self {
        GestureEvent { label: GestureLabel::None, hand_offset: None, magnify: false, fresh: true }
    }

    /// The interaction state this gesture asks for, if any.
    pub fn requested_state(&self) -> Option<InteractionState> {
        match self.label {
            GestureLabel::Fist => Some(InteractionState::Formed),
            GestureLabel::Open => Some(InteractionState::Scattered),
            _                  => None,
        }
    }

    pub fn hand_present(&self) -> bool { self.hand_offset.is_some() }
}

// ════════════════════════════════════════════════════════════════════════════
// ClassifierConfig
// ════════════════════════════════════════════════════════════════════════════

/// Classification thresholds.  No hysteresis is applied around any of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Thumb–index tip distance below which the hand is pinching.
    pub pinch_threshold: f32,
    /// Open-finger count at or below which the hand is a fist.
    pub fist_max_open:   usize,
    /// Open-finger count at or above which the hand is open.
    pub open_min_open:   usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        ClassifierConfig {
            pinch_threshold: 0.05,
            fist_max_open:   1,
            open_min_open:   4,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Geometry
// ════════════════════════════════════════════════════════════════════════════

/// Number of fingers whose tip is farther from the wrist than their
/// proximal joint.
pub fn open_count(sample: &LandmarkSample) -> usize {
    let wrist = sample.point(WRIST);
    FINGER_JOINTS
        .iter()
        .filter(|&&(tip, proximal)| {
            sample.point(tip).distance(wrist) > sample.point(proximal).distance(wrist)
        })
        .count()
}

pub fn pinch_distance(sample: &LandmarkSample) -> f32 {
    sample.point(THUMB_TIP).distance(sample.point(INDEX_TIP))
}

/// Horizontal axis mirrored so moving the hand right moves the offset right
/// from the viewer's side of the camera.
pub fn hand_offset(sample: &LandmarkSample) -> Vec2 {
    let p = sample.point(MIDDLE_MCP);
    Vec2::new((1.0 - p.x - 0.5) * 2.0, (p.y - 0.5) * 2.0)
}

// ════════════════════════════════════════════════════════════════════════════
// GestureClassifier
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
pub struct GestureClassifier {
    config: ClassifierConfig,
    last:   GestureEvent,
}

impl GestureClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        GestureClassifier { config, last: GestureEvent::none() }
    }

    pub fn config(&self) -> &ClassifierConfig { &self.config }

    /// The event produced by the most recent [`update`](Self::update).
    pub fn last(&self) -> &GestureEvent { &self.last }

    /// Advance one tick.
    ///
    /// `None` means no new reading arrived since the previous tick: the
    /// previous event is repeated with `fresh = false`.  Only an explicit
    /// [`SensorReading::NoHand`] (or an unusable sample) yields
    /// [`GestureLabel::None`].
    pub fn update(&mut self, reading: Option<&SensorReading>) -> GestureEvent {
        let event = match reading {
            Some(r) => self.classify_reading(r),
            None    => GestureEvent { fresh: false, ..self.last.clone() },
        };
        if event.fresh && event.label != self.last.label {
            tracing::debug!(
                target: "gesture",
                from = self.last.label.as_str(),
                to = event.label.as_str(),
                "gesture label changed"
            );
        }
        self.last = event.clone();
        event
    }

    pub fn classify_reading(&self, reading: &SensorReading) -> GestureEvent {
        match reading.sample() {
            None => GestureEvent::none(),
            Some(Ok(sample)) => self.classify(&sample),
            Some(Err(e)) => {
                tracing::debug!(target: "gesture", error = %e, "discarding hand sample");
                GestureEvent::none()
            }
        }
    }

    /// Classify one valid sample.  Pure; does not touch the reuse slot.
    pub fn classify(&self, sample: &LandmarkSample) -> GestureEvent {
        let offset = Some(hand_offset(sample));
        let opened = open_count(sample);
        let pinch  = pinch_distance(sample);

        let (label, magnify) = if pinch < self.config.pinch_threshold {
            (GestureLabel::Pinch, true)
        } else if opened <= self.config.fist_max_open {
            (GestureLabel::Fist, false)
        } else if opened >= self.config.open_min_open {
            (GestureLabel::Open, false)
        } else {
            (GestureLabel::Tracking, false)
        };

        tracing::trace!(target: "gesture", opened, pinch, label = label.as_str());
        GestureEvent { label, hand_offset: offset, magnify, fresh: true }
    }
}

impl Default for GestureClassifier {
    fn default() -> Self { Self::new(ClassifierConfig::default()) }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmarks::HandPose;

    fn centre() -> Vec2 { Vec2::new(0.5, 0.5) }

    fn label_for(pose: &HandPose) -> GestureLabel {
        GestureClassifier::default().classify(&pose.sample()).label
    }

    #[test]
    fn open_count_matches_pose() {
        for n in 0..=5 {
            let pose = HandPose::with_open_count(centre(), n);
            assert_eq!(open_count(&pose.sample()), n, "pose with {} open", n);
        }
    }

    #[test]
    fn fist_and_single_finger_are_fist() {
        assert_eq!(label_for(&HandPose::fist(centre())), GestureLabel::Fist);
        assert_eq!(label_for(&HandPose::with_open_count(centre(), 1)), GestureLabel::Fist);
    }

    #[test]
    fn four_or_five_open_is_open() {
        assert_eq!(label_for(&HandPose::with_open_count(centre(), 4)), GestureLabel::Open);
        assert_eq!(label_for(&HandPose::open_palm(centre())), GestureLabel::Open);
    }

    #[test]
    fn two_or_three_open_is_tracking() {
        for n in [2, 3] {
            let ev = GestureClassifier::default()
                .classify(&HandPose::with_open_count(centre(), n).sample());
            assert_eq!(ev.label, GestureLabel::Tracking);
            assert!(!ev.magnify);
            assert_eq!(ev.requested_state(), None);
        }
    }

    #[test]
    fn pinch_preempts_open() {
        let pose = HandPose::pinch(centre(), 0.03);
        let s    = pose.sample();
        assert_eq!(open_count(&s), 5);
        let ev = GestureClassifier::default().classify(&s);
        assert_eq!(ev.label, GestureLabel::Pinch);
        assert!(ev.magnify);
        assert_eq!(ev.requested_state(), None);
    }

    #[test]
    fn pinch_threshold_is_strict() {
        let ev = GestureClassifier::default().classify(&HandPose::pinch(centre(), 0.051).sample());
        assert_eq!(ev.label, GestureLabel::Open);
        assert!(!ev.magnify);
    }

    #[test]
    fn fist_requests_formed_open_requests_scattered() {
        let c  = GestureClassifier::default();
        let ev = c.classify(&HandPose::fist(centre()).sample());
        assert_eq!(ev.requested_state(), Some(InteractionState::Formed));
        let ev = c.classify(&HandPose::open_palm(centre()).sample());
        assert_eq!(ev.requested_state(), Some(InteractionState::Scattered));
    }

    #[test]
    fn offset_mirrors_horizontal_axis() {
        // Middle knuckle sits 0.04 below the palm centre.
        let ev = GestureClassifier::default().classify(&HandPose::fist(Vec2::new(0.2, 0.46)).sample());
        let off = ev.hand_offset.unwrap();
        assert!((off.x - 0.6).abs() < 1e-5, "x = {}", off.x);
        assert!(off.y.abs() < 1e-5, "y = {}", off.y);
    }

    #[test]
    fn offset_present_for_every_label() {
        let c = GestureClassifier::default();
        for pose in [
            HandPose::fist(centre()),
            HandPose::open_palm(centre()),
            HandPose::pinch(centre(), 0.01),
            HandPose::with_open_count(centre(), 3),
        ] {
            assert!(c.classify(&pose.sample()).hand_offset.is_some());
        }
    }

    #[test]
    fn no_hand_is_none_without_offset() {
        let mut c = GestureClassifier::default();
        let ev = c.update(Some(&SensorReading::NoHand));
        assert_eq!(ev.label, GestureLabel::None);
        assert_eq!(ev.hand_offset, None);
        assert!(!ev.magnify);
        assert!(ev.fresh);
    }

    #[test]
    fn invalid_geometry_is_treated_as_no_hand() {
        let mut c = GestureClassifier::default();
        let ev = c.update(Some(&SensorReading::Landmarks(vec![Vec2::ZERO; 5])));
        assert_eq!(ev.label, GestureLabel::None);
        assert_eq!(ev.hand_offset, None);
    }

    #[test]
    fn missing_reading_reuses_previous_event() {
        let mut c = GestureClassifier::default();
        c.update(Some(&HandPose::fist(centre()).reading()));
        let ev = c.update(None);
        assert_eq!(ev.label, GestureLabel::Fist);
        assert!(ev.hand_offset.is_some());
        assert!(!ev.fresh);
    }

    #[test]
    fn custom_thresholds_apply() {
        let cfg = ClassifierConfig { pinch_threshold: 0.2, ..ClassifierConfig::default() };
        let ev  = GestureClassifier::new(cfg).classify(&HandPose::open_palm(centre()).sample());
        assert_eq!(ev.label, GestureLabel::Pinch);
    }
}
