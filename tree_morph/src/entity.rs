//! Particle entities and their per-role constants.

use std::f32::consts::TAU;

use glam::Vec3;
use rand::Rng;

// ════════════════════════════════════════════════════════════════════════════
// Role — closed set of entity kinds
// ════════════════════════════════════════════════════════════════════════════

/// Ornament weight class.  Heavier ornaments arrive later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Weight {
    /// Gift boxes.
    Heavy,
    /// Baubles.
    Light,
    /// Fairy lights.
    ExtraLight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Foliage,
    Ornament(Weight),
    Trail,
    Photo,
}

/// Constants resolved from a [`Role`] when an entity is built.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoleProfile {
    /// Inclusive arrival-rate range (1/s).
    pub arrival: (f32, f32),
    pub scale:   (f32, f32),
    /// ARGB colours, one picked per entity.
    pub palette: &'static [u32],
    /// Yaw spin in rad/s applied at render time.
    pub spin:    f32,
}

const FOLIAGE: RoleProfile = RoleProfile {
    arrival: (1.0, 1.0),
    scale:   (0.04, 0.09),
    palette: &[0xFF0B6623, 0xFF1E7B3A, 0xFF2E8B57, 0xFF3CB371],
    spin:    0.0,
};

const HEAVY: RoleProfile = RoleProfile {
    arrival: (0.8, 1.2),
    scale:   (0.35, 0.55),
    palette: &[0xFFB22222, 0xFFD4AF37, 0xFF8B0000],
    spin:    0.4,
};

const LIGHT: RoleProfile = RoleProfile {
    arrival: (1.6, 2.2),
    scale:   (0.20, 0.30),
    palette: &[0xFFFF4040, 0xFFFFD700, 0xFFC0C0C0, 0xFF4169E1],
    spin:    0.9,
};

const EXTRA_LIGHT: RoleProfile = RoleProfile {
    arrival: (2.6, 3.4),
    scale:   (0.08, 0.12),
    palette: &[0xFFFFF8DC, 0xFFFFE4B5, 0xFFFFFACD],
    spin:    2.0,
};

const TRAIL: RoleProfile = RoleProfile {
    arrival: (2.0, 3.0),
    scale:   (0.05, 0.10),
    palette: &[0xFFFFD700, 0xFFFFF5C0],
    spin:    0.0,
};

const PHOTO: RoleProfile = RoleProfile {
    arrival: (1.0, 1.6),
    scale:   (0.9, 1.1),
    palette: &[0xFFFFFFFF],
    spin:    0.0,
};

impl Role {
    pub fn profile(self) -> &'static RoleProfile {
        match self {
            Role::Foliage                      => &FOLIAGE,
            Role::Ornament(Weight::Heavy)      => &HEAVY,
            Role::Ornament(Weight::Light)      => &LIGHT,
            Role::Ornament(Weight::ExtraLight) => &EXTRA_LIGHT,
            Role::Trail                        => &TRAIL,
            Role::Photo                        => &PHOTO,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Entity
// ════════════════════════════════════════════════════════════════════════════

/// Arrival rates are clamped to at least this.
pub const MIN_ARRIVAL_RATE: f32 = 0.05;
pub const MIN_SCALE:        f32 = 1e-3;

/// One particle: two anchor positions plus its displayed position.
///
/// Everything except `current` is fixed at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    formed:       Vec3,
    scatter:      Vec3,
    rotation:     Vec3,
    scale:        f32,
    arrival_rate: f32,
    role:         Role,
    color:        u32,
    current:      Vec3,
}

impl Entity {
    /// Build an entity from explicit parameters.  Non-positive or non-finite
    /// arrival rates and scales are clamped.
    pub fn new(
        role:         Role,
        formed:       Vec3,
        scatter:      Vec3,
        rotation:     Vec3,
        scale:        f32,
        arrival_rate: f32,
        color:        u32,
    ) -> Self {
        let arrival_rate = if arrival_rate.is_finite() && arrival_rate >= MIN_ARRIVAL_RATE {
            arrival_rate
        } else {
            tracing::warn!(target: "entity", arrival_rate, ?role, "arrival rate clamped");
            MIN_ARRIVAL_RATE
        };
        let scale = if scale.is_finite() { scale.max(MIN_SCALE) } else { MIN_SCALE };
        Entity { formed, scatter, rotation, scale, arrival_rate, role, color, current: scatter }
    }

    /// Build an entity whose rate, scale, colour and rotation are drawn from
    /// its role's profile.
    pub fn spawn<R: Rng + ?Sized>(rng: &mut R, role: Role, formed: Vec3, scatter: Vec3) -> Self {
        let p        = role.profile();
        let arrival  = rng.gen_range(p.arrival.0..=p.arrival.1);
        let scale    = rng.gen_range(p.scale.0..=p.scale.1);
        let color    = p.palette[rng.gen_range(0..p.palette.len())];
        let rotation = Vec3::new(
            rng.gen::<f32>() * TAU,
            rng.gen::<f32>() * TAU,
            rng.gen::<f32>() * TAU,
        );
        Entity::new(role, formed, scatter, rotation, scale, arrival, color)
    }

    pub fn formed(&self)       -> Vec3 { self.formed }
    pub fn scatter(&self)      -> Vec3 { self.scatter }
    pub fn rotation(&self)     -> Vec3 { self.rotation }
    pub fn scale(&self)        -> f32  { self.scale }
    pub fn arrival_rate(&self) -> f32  { self.arrival_rate }
    pub fn role(&self)         -> Role { self.role }
    pub fn color(&self)        -> u32  { self.color }
    pub fn current(&self)      -> Vec3 { self.current }

    /// Where this entity sits for morph factor `m`, ignoring lag.
    pub fn blend(&self, m: f32) -> Vec3 {
        self.scatter.lerp(self.formed, m)
    }

    pub(crate) fn set_current(&mut self, p: Vec3) { self.current = p; }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn starts_at_scatter_position() {
        let e = Entity::new(Role::Trail, Vec3::Y, Vec3::X, Vec3::ZERO, 1.0, 1.0, 0);
        assert_eq!(e.current(), Vec3::X);
    }

    #[test]
    fn bad_arrival_rate_is_clamped() {
        for rate in [0.0, -3.0, f32::NAN] {
            let e = Entity::new(Role::Photo, Vec3::ZERO, Vec3::ZERO, Vec3::ZERO, 1.0, rate, 0);
            assert_eq!(e.arrival_rate(), MIN_ARRIVAL_RATE);
        }
    }

    #[test]
    fn bad_scale_is_clamped_positive() {
        let e = Entity::new(Role::Photo, Vec3::ZERO, Vec3::ZERO, Vec3::ZERO, -1.0, 1.0, 0);
        assert!(e.scale() > 0.0);
    }

    #[test]
    fn spawn_respects_profile() {
        let mut rng = StdRng::seed_from_u64(9);
        for role in [
            Role::Foliage,
            Role::Ornament(Weight::Heavy),
            Role::Ornament(Weight::Light),
            Role::Ornament(Weight::ExtraLight),
            Role::Trail,
            Role::Photo,
        ] {
            let p = role.profile();
            for _ in 0..50 {
                let e = Entity::spawn(&mut rng, role, Vec3::ONE, Vec3::ZERO);
                assert!(e.arrival_rate() >= p.arrival.0 && e.arrival_rate() <= p.arrival.1);
                assert!(e.scale() >= p.scale.0 && e.scale() <= p.scale.1);
                assert!(p.palette.contains(&e.color()));
                assert_eq!(e.role(), role);
            }
        }
    }

    #[test]
    fn heavier_ornaments_are_slower() {
        let heavy = Role::Ornament(Weight::Heavy).profile();
        let light = Role::Ornament(Weight::Light).profile();
        let extra = Role::Ornament(Weight::ExtraLight).profile();
        assert!(heavy.arrival.1 < light.arrival.0);
        assert!(light.arrival.1 < extra.arrival.0);
    }

    #[test]
    fn blend_endpoints() {
        let e = Entity::new(Role::Trail, Vec3::Y, Vec3::X, Vec3::ZERO, 1.0, 1.0, 0);
        assert_eq!(e.blend(0.0), Vec3::X);
        assert_eq!(e.blend(1.0), Vec3::Y);
    }
}
