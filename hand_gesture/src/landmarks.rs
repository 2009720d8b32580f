//! Hand landmark topology, validated samples and a pose synthesiser.
//!
//! Landmarks follow the common 21-point hand layout: the wrist, then four
//! joints per finger from knuckle to tip.  Coordinates are normalized image
//! space: `x` to the right, `y` downward, both roughly in `[0, 1]`.

use glam::Vec2;
use thiserror::Error;

// ════════════════════════════════════════════════════════════════════════════
// Landmark indices
// ════════════════════════════════════════════════════════════════════════════

pub const LANDMARK_COUNT: usize = 21;

pub const WRIST:      usize = 0;
pub const THUMB_CMC:  usize = 1;
pub const THUMB_MCP:  usize = 2;
pub const THUMB_IP:   usize = 3;
pub const THUMB_TIP:  usize = 4;
pub const INDEX_MCP:  usize = 5;
pub const INDEX_PIP:  usize = 6;
pub const INDEX_DIP:  usize = 7;
pub const INDEX_TIP:  usize = 8;
pub const MIDDLE_MCP: usize = 9;
pub const MIDDLE_PIP: usize = 10;
pub const MIDDLE_DIP: usize = 11;
pub const MIDDLE_TIP: usize = 12;
pub const RING_MCP:   usize = 13;
pub const RING_PIP:   usize = 14;
pub const RING_DIP:   usize = 15;
pub const RING_TIP:   usize = 16;
pub const PINKY_MCP:  usize = 17;
pub const PINKY_PIP:  usize = 18;
pub const PINKY_DIP:  usize = 19;
pub const PINKY_TIP:  usize = 20;

/// `(tip, proximal joint)` per finger, thumb first.  A finger counts as open
/// when its tip is farther from the wrist than its proximal joint.
pub const FINGER_JOINTS: [(usize, usize); 5] = [
    (THUMB_TIP,  THUMB_MCP),
    (INDEX_TIP,  INDEX_PIP),
    (MIDDLE_TIP, MIDDLE_PIP),
    (RING_TIP,   RING_PIP),
    (PINKY_TIP,  PINKY_PIP),
];

// ════════════════════════════════════════════════════════════════════════════
// SensorReading / LandmarkSample
// ════════════════════════════════════════════════════════════════════════════

/// One result from the hand detector.
///
/// `NoHand` is an explicit "detector ran and saw nothing", distinct from
/// the frame loop simply not having a new reading yet.
#[derive(Clone, Debug, PartialEq)]
pub enum SensorReading {
    Landmarks(Vec<Vec2>),
    NoHand,
}

impl SensorReading {
    /// Validate the raw points.  `None` for an explicit no-hand reading.
    pub fn sample(&self) -> Option<Result<LandmarkSample, LandmarkError>> {
        match self {
            SensorReading::Landmarks(points) => Some(LandmarkSample::from_points(points)),
            SensorReading::NoHand            => None,
        }
    }
}

/// A sample rejected for geometry reasons.  Callers treat it as no hand.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LandmarkError {
    #[error("hand sample has {found} landmarks, {LANDMARK_COUNT} required")]
    MissingJoints { found: usize },
    #[error("landmark {index} is not a finite coordinate")]
    NonFinite { index: usize },
}

/// A complete, finite set of 21 landmarks for one hand.
#[derive(Clone, Debug, PartialEq)]
pub struct LandmarkSample {
    points: [Vec2; LANDMARK_COUNT],
}

impl LandmarkSample {
    /// Build from detector output.  Points beyond the 21st are ignored.
    pub fn from_points(points: &[Vec2]) -> Result<Self, LandmarkError> {
        if points.len() < LANDMARK_COUNT {
            return Err(LandmarkError::MissingJoints { found: points.len() });
        }
        let mut out = [Vec2::ZERO; LANDMARK_COUNT];
        for (index, (slot, p)) in out.iter_mut().zip(points).enumerate() {
            if !p.is_finite() {
                return Err(LandmarkError::NonFinite { index });
            }
            *slot = *p;
        }
        Ok(LandmarkSample { points: out })
    }

    pub fn point(&self, index: usize) -> Vec2 { self.points[index] }
    pub fn points(&self) -> &[Vec2; LANDMARK_COUNT] { &self.points }
}

impl TryFrom<&[Vec2]> for LandmarkSample {
    type Error = LandmarkError;
    fn try_from(points: &[Vec2]) -> Result<Self, Self::Error> {
        LandmarkSample::from_points(points)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// HandPose — synthetic hands for the simulator and tests
// ════════════════════════════════════════════════════════════════════════════

/// Finger axis angles in degrees from straight up, thumb first.
const FINGER_ANGLES: [f32; 5] = [-75.0, -20.0, 0.0, 20.0, 40.0];

/// Joint distances from the wrist (knuckle → tip) at scale 1.
const OPEN_REACH:         [f32; 4] = [0.06, 0.09, 0.12,  0.15];
const CURLED_REACH:       [f32; 4] = [0.06, 0.09, 0.07,  0.05];
const CURLED_THUMB_REACH: [f32; 4] = [0.06, 0.09, 0.085, 0.08];

/// Order in which fingers open for [`HandPose::with_open_count`].
const OPEN_ORDER: [usize; 5] = [1, 2, 3, 4, 0];

/// A simple geometric hand: straight fingers fanned from the wrist, each
/// either extended or curled back toward the palm.
///
/// At the default scale curled thumb and index tips stay more than 0.06
/// apart, so a fist never reads as a pinch; scales below ~0.75 lose that.
#[derive(Clone, Debug, PartialEq)]
pub struct HandPose {
    /// Palm centre in normalized image coordinates.
    pub center:    Vec2,
    pub scale:     f32,
    /// Thumb, index, middle, ring, pinky.
    pub open:      [bool; 5],
    /// When set, the thumb tip is placed this far left of the index tip.
    pub pinch_gap: Option<f32>,
}

impl HandPose {
    pub fn with_open_count(center: Vec2, count: usize) -> Self {
        let mut open = [false; 5];
        for &finger in OPEN_ORDER.iter().take(count.min(5)) {
            open[finger] = true;
        }
        HandPose { center, scale: 1.0, open, pinch_gap: None }
    }

    pub fn fist(center: Vec2) -> Self { Self::with_open_count(center, 0) }

    pub fn open_palm(center: Vec2) -> Self { Self::with_open_count(center, 5) }

    /// All five fingers extended with thumb and index tips `gap` apart.
    pub fn pinch(center: Vec2, gap: f32) -> Self {
        HandPose { pinch_gap: Some(gap), ..Self::open_palm(center) }
    }

    pub fn wrist(&self) -> Vec2 {
        self.center + Vec2::new(0.0, 0.10 * self.scale)
    }

    /// The 21 landmarks for this pose.
    pub fn landmarks(&self) -> Vec<Vec2> {
        let wrist = self.wrist();
        let mut points = vec![wrist; LANDMARK_COUNT];

        for finger in 0..5 {
            let angle = FINGER_ANGLES[finger].to_radians();
            let dir   = Vec2::new(angle.sin(), -angle.cos());
            let reach = match (self.open[finger], finger) {
                (true, _)  => &OPEN_REACH,
                (false, 0) => &CURLED_THUMB_REACH,
                (false, _) => &CURLED_REACH,
            };
            let base = 1 + finger * 4;
            for (joint, d) in reach.iter().enumerate() {
                points[base + joint] = wrist + dir * (d * self.scale);
            }
        }

        if let Some(gap) = self.pinch_gap {
            points[THUMB_TIP] = points[INDEX_TIP] - Vec2::new(gap, 0.0);
        }
        points
    }

    pub fn reading(&self) -> SensorReading {
        SensorReading::Landmarks(self.landmarks())
    }

    pub fn sample(&self) -> LandmarkSample {
        let points = self.landmarks();
        let mut out = [Vec2::ZERO; LANDMARK_COUNT];
        out.copy_from_slice(&points);
        LandmarkSample { points: out }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
