//! Particle groups and the photo-card gallery.
//!
//! Every group shares the one global morph factor.  Foliage is placed on the
//! eased blend directly; every other group chases it per entity.  Photo
//! cards are also magnify-aware: while magnified they leave the tree and
//! line up on an arc in front of the camera.

use std::f32::consts::PI;
use std::sync::Arc;

use glam::Vec3;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::camera::CameraFrame;
use crate::entity::{Entity, Role, Weight};
use crate::morph::{approach, chase, ease_in_out_cubic, settle_eased};
use crate::sampler::{sample_cone, sample_sphere, spiral_point, ConeSpec, DensityBias, SpiralSpec};

// ════════════════════════════════════════════════════════════════════════════
// Configuration
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupsConfig {
    pub foliage_count:     usize,
    pub heavy_count:       usize,
    pub light_count:       usize,
    pub extra_light_count: usize,
    pub trail_count:       usize,
    /// Radius of the scattered cloud.
    pub scatter_radius:    f32,
    pub foliage_cone:      ConeSpec,
    /// Shared by ornaments and photo cards.
    pub ornament_cone:     ConeSpec,
    pub spiral:            SpiralSpec,
    /// Distance from the camera to the magnified photo arc.
    pub magnify_radius:    f32,
    /// Fixed approach rate of photo cards while magnified, 1/s.
    pub magnify_speed:     f32,
}

impl Default for GroupsConfig {
    fn default() -> Self {
        GroupsConfig {
            foliage_count:     4000,
            heavy_count:       40,
            light_count:       150,
            extra_light_count: 300,
            trail_count:       500,
            scatter_radius:    16.0,
            foliage_cone: ConeSpec {
                height:      14.0,
                base_radius: 5.5,
                y_offset:    -7.0,
                bias:        DensityBias::DenseBottom(1.5),
                thickness:   0.4,
            },
            ornament_cone: ConeSpec {
                height:      13.5,
                base_radius: 5.6,
                y_offset:    -7.0,
                bias:        DensityBias::Uniform,
                thickness:   0.8,
            },
            spiral: SpiralSpec {
                turns:       5.0,
                height:      14.0,
                base_radius: 6.2,
                y_offset:    -7.0,
            },
            magnify_radius:    8.0,
            magnify_speed:     6.0,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// ParticleGroup
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupKind {
    Foliage,
    Ornaments(Weight),
    Trail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Motion {
    Eased,
    Chasing,
}

#[derive(Debug, Clone)]
pub struct ParticleGroup {
    kind:     GroupKind,
    motion:   Motion,
    entities: Vec<Entity>,
}

impl ParticleGroup {
    pub fn kind(&self) -> GroupKind { self.kind }
    pub fn entities(&self) -> &[Entity] { &self.entities }
    pub fn len(&self) -> usize { self.entities.len() }
    pub fn is_empty(&self) -> bool { self.entities.is_empty() }

    fn tick(&mut self, m: f32, dt: f32, speed_multiplier: f32) {
        match self.motion {
            Motion::Eased => {
                for e in &mut self.entities { settle_eased(e, m); }
            }
            Motion::Chasing => {
                for e in &mut self.entities { chase(e, m, dt, speed_multiplier); }
            }
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Photo cards
// ════════════════════════════════════════════════════════════════════════════

/// A decoded photo thumbnail, ARGB row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoAsset {
    pub width:  u32,
    pub height: u32,
    pub pixels: Vec<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PhotoId(pub u64);

#[derive(Debug, Clone)]
pub struct PhotoCard {
    id:     PhotoId,
    entity: Entity,
    /// Empty until the asset finishes loading.
    asset:  Option<Arc<PhotoAsset>>,
}

impl PhotoCard {
    pub fn id(&self) -> PhotoId { self.id }
    pub fn entity(&self) -> &Entity { &self.entity }
    pub fn asset(&self) -> Option<&PhotoAsset> { self.asset.as_deref() }
    pub fn is_ready(&self) -> bool { self.asset.is_some() }
}

/// Point `index` of `count` on a half circle of `radius` around the camera,
/// in the camera's horizontal plane, swept from its left through straight
/// ahead to its right.
pub fn arc_target(index: usize, count: usize, camera: &CameraFrame, radius: f32) -> Vec3 {
    let count = count.max(1) as f32;
    let angle = -PI / 2.0 + PI * (index as f32 + 0.5) / count;
    camera.position + (camera.forward() * angle.cos() + camera.right() * angle.sin()) * radius
}

// ════════════════════════════════════════════════════════════════════════════
// RenderInstance
// ════════════════════════════════════════════════════════════════════════════

/// Resolved transform for one live entity this tick.
#[derive(Debug, Clone, Copy)]
pub struct RenderInstance<'a> {
    pub position: Vec3,
    /// Euler angles, radians.
    pub rotation: Vec3,
    pub scale:    f32,
    pub alpha:    f32,
    pub color:    u32,
    pub role:     Role,
    pub photo:    Option<&'a PhotoAsset>,
}

// ════════════════════════════════════════════════════════════════════════════
// ParticleGroupManager
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
pub struct ParticleGroupManager {
    config:     GroupsConfig,
    groups:     Vec<ParticleGroup>,
    photos:     Vec<PhotoCard>,
    next_photo: u64,
    factor:     f32,
    magnify:    bool,
    camera:     Option<CameraFrame>,
    /// Seconds since construction; drives render-time spin.
    elapsed:    f32,
}

impl ParticleGroupManager {
    /// Generate every procedural group.  Runs once; the groups live for
    /// the whole session.
    pub fn new<R: Rng + ?Sized>(config: GroupsConfig, rng: &mut R) -> Self {
        let mut groups = Vec::with_capacity(5);

        let foliage = (0..config.foliage_count)
            .map(|_| {
                let formed  = sample_cone(rng, &config.foliage_cone);
                let scatter = sample_sphere(rng, config.scatter_radius);
                Entity::spawn(rng, Role::Foliage, formed, scatter)
            })
            .collect();
        groups.push(ParticleGroup { kind: GroupKind::Foliage, motion: Motion::Eased, entities: foliage });

        for (weight, count) in [
            (Weight::Heavy,      config.heavy_count),
            (Weight::Light,      config.light_count),
            (Weight::ExtraLight, config.extra_light_count),
        ] {
            let entities = (0..count)
                .map(|_| {
                    let formed  = sample_cone(rng, &config.ornament_cone);
                    let scatter = sample_sphere(rng, config.scatter_radius);
                    Entity::spawn(rng, Role::Ornament(weight), formed, scatter)
                })
                .collect();
            groups.push(ParticleGroup {
                kind:   GroupKind::Ornaments(weight),
                motion: Motion::Chasing,
                entities,
            });
        }

        let trail_n = config.trail_count;
        let trail = (0..trail_n)
            .map(|i| {
                let t       = if trail_n > 1 { i as f32 / (trail_n - 1) as f32 } else { 0.0 };
                let formed  = spiral_point(t, &config.spiral);
                let scatter = sample_sphere(rng, config.scatter_radius);
                Entity::spawn(rng, Role::Trail, formed, scatter)
            })
            .collect();
        groups.push(ParticleGroup { kind: GroupKind::Trail, motion: Motion::Chasing, entities: trail });

        tracing::info!(
            target: "groups",
            entities = groups.iter().map(ParticleGroup::len).sum::<usize>(),
            "particle groups generated"
        );

        ParticleGroupManager {
            config,
            groups,
            photos:     Vec::new(),
            next_photo: 0,
            factor:     0.0,
            magnify:    false,
            camera:     None,
            elapsed:    0.0,
        }
    }

    pub fn config(&self) -> &GroupsConfig { &self.config }
    pub fn groups(&self) -> &[ParticleGroup] { &self.groups }
    pub fn photos(&self) -> &[PhotoCard] { &self.photos }

    pub fn group(&self, kind: GroupKind) -> Option<&ParticleGroup> {
        self.groups.iter().find(|g| g.kind == kind)
    }

    // ── photo lifecycle ───────────────────────────────────────────────────

    /// Create a card with fresh positions.  It renders once an asset is
    /// attached.
    pub fn add_photo<R: Rng + ?Sized>(&mut self, rng: &mut R) -> PhotoId {
        let id      = PhotoId(self.next_photo);
        self.next_photo += 1;
        let formed  = sample_cone(rng, &self.config.ornament_cone);
        let scatter = sample_sphere(rng, self.config.scatter_radius);
        let entity  = Entity::spawn(rng, Role::Photo, formed, scatter);
        self.photos.push(PhotoCard { id, entity, asset: None });
        tracing::debug!(target: "groups", id = id.0, "photo card added");
        id
    }

    /// Returns false when the card is already gone.
    pub fn attach_asset(&mut self, id: PhotoId, asset: Arc<PhotoAsset>) -> bool {
        match self.photos.iter_mut().find(|c| c.id == id) {
            Some(card) => { card.asset = Some(asset); true }
            None       => false,
        }
    }

    /// Drop the card and its hold on the asset.
    pub fn remove_photo(&mut self, id: PhotoId) -> bool {
        let before = self.photos.len();
        self.photos.retain(|c| c.id != id);
        let removed = self.photos.len() != before;
        if removed {
            tracing::debug!(target: "groups", id = id.0, "photo card removed");
        }
        removed
    }

    // ── per tick ──────────────────────────────────────────────────────────

    /// Arc slot of every card in order.  Only loaded cards take a slot;
    /// cards still loading get `None` and stay with the tree.
    fn arc_slots(&self) -> (Vec<Option<usize>>, usize) {
        let mut next = 0;
        let slots = self
            .photos
            .iter()
            .map(|c| {
                c.is_ready().then(|| {
                    next += 1;
                    next - 1
                })
            })
            .collect();
        (slots, next)
    }

    /// Where each photo card is heading this tick.
    pub fn photo_targets(&self, camera: &CameraFrame) -> Vec<Vec3> {
        let (slots, n) = self.arc_slots();
        self.photos
            .iter()
            .zip(slots)
            .map(|(card, slot)| match slot {
                Some(i) if self.magnify => arc_target(i, n, camera, self.config.magnify_radius),
                _ => card.entity.blend(self.factor),
            })
            .collect()
    }

    pub fn tick(&mut self, m: f32, magnify: bool, camera: &CameraFrame, dt: f32, speed_multiplier: f32) {
        self.factor  = m;
        self.magnify = magnify;
        self.camera  = Some(*camera);
        self.elapsed += dt;

        for g in &mut self.groups {
            g.tick(m, dt, speed_multiplier);
        }

        let (slots, n) = self.arc_slots();
        let k      = (dt * self.config.magnify_speed).min(1.0);
        let radius = self.config.magnify_radius;
        for (card, slot) in self.photos.iter_mut().zip(slots) {
            match slot {
                Some(i) if magnify => approach(&mut card.entity, arc_target(i, n, camera, radius), k),
                _ => chase(&mut card.entity, m, dt, speed_multiplier),
            }
        }
    }

    // ── render output ─────────────────────────────────────────────────────

    fn alpha_for(&self, role: Role) -> f32 {
        match role {
            Role::Foliage => 0.55 + 0.45 * ease_in_out_cubic(self.factor),
            Role::Trail   => self.factor,
            _             => 1.0,
        }
    }

    fn instance<'a>(&self, e: &Entity, photo: Option<&'a PhotoAsset>) -> RenderInstance<'a> {
        let spin = e.role().profile().spin * self.elapsed;
        let mut rotation = e.rotation() + Vec3::new(0.0, spin, 0.0);
        if e.role() == Role::Photo {
            rotation = match self.camera {
                Some(cam) => {
                    let to_cam = cam.position - e.current();
                    Vec3::new(0.0, to_cam.x.atan2(to_cam.z), 0.0)
                }
                None => Vec3::ZERO,
            };
        }
        RenderInstance {
            position: e.current(),
            rotation,
            scale:    e.scale(),
            alpha:    self.alpha_for(e.role()),
            color:    e.color(),
            role:     e.role(),
            photo,
        }
    }

    /// Every live entity.  Photo cards still loading are skipped.
    pub fn instances(&self) -> impl Iterator<Item = RenderInstance<'_>> + '_ {
        let procedural = self
            .groups
            .iter()
            .flat_map(|g| g.entities.iter())
            .map(move |e| self.instance(e, None));
        let photos = self
            .photos
            .iter()
            .filter_map(move |c| c.asset().map(|a| self.instance(&c.entity, Some(a))));
        procedural.chain(photos)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
