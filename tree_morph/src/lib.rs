//! # tree_morph
//!
//! A particle ensemble that morphs between a scattered cloud and a formed
//! tree silhouette, driven by the interaction state from [`hand_gesture`].
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use hand_gesture::{ClassifierConfig, HandPose};
//! use tree_morph::{Scene, SceneConfig};
//! use glam::Vec2;
//!
//! let mut scene = Scene::new(SceneConfig::default(), ClassifierConfig::default(), 7);
//!
//! // A closed fist forms the tree…
//! let fist = HandPose::fist(Vec2::new(0.5, 0.5)).reading();
//! scene.tick(Some(fist), 1.0 / 60.0);
//!
//! // …and the factor walks toward 1 over the following frames.
//! for _ in 0..60 { scene.tick(None, 1.0 / 60.0); }
//! for inst in scene.instances() {
//!     let _ = (inst.position, inst.scale, inst.alpha);
//! }
//! ```
//!
//! ## Two-tier motion
//!
//! | Group | Motion |
//! |---|---|
//! | Foliage | eased blend of scatter → formed, one coherent cloud |
//! | Ornaments (heavy / light / extra-light) | each entity chases the blend at its own arrival rate |
//! | Spiral trail | chasing, fades in as the tree forms |
//! | Photo cards | chasing; snap to a camera-facing arc while magnified |

pub mod sampler;
pub mod entity;
pub mod morph;
pub mod camera;
pub mod groups;
pub mod scene;

pub use camera::{CameraConfig, CameraController, CameraFrame};
pub use entity::{Entity, Role, Weight};
pub use groups::{GroupKind, GroupsConfig, ParticleGroupManager, PhotoAsset, PhotoCard, PhotoId, RenderInstance};
pub use morph::{MorphConfig, MorphDriver};
pub use scene::{Scene, SceneConfig, TickReport};
