//! Procedural point generators for the two layouts.
//!
//! Every function takes the random source explicitly so a seeded
//! [`rand::rngs::StdRng`] reproduces a layout exactly.

use std::f32::consts::TAU;

use glam::Vec3;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Uniform point inside a sphere.
///
/// The radius uses the cube root of a uniform draw so equal volumes get equal
/// counts; a linear radius would crowd the centre.
pub fn sample_sphere<R: Rng + ?Sized>(rng: &mut R, radius: f32) -> Vec3 {
    let theta = TAU * rng.gen::<f32>();
    let phi   = (2.0 * rng.gen::<f32>() - 1.0).acos();
    let r     = radius * rng.gen::<f32>().cbrt();
    Vec3::new(
        r * phi.sin() * theta.cos(),
        r * phi.sin() * theta.sin(),
        r * phi.cos(),
    )
}

// ════════════════════════════════════════════════════════════════════════════
// Cone
// ════════════════════════════════════════════════════════════════════════════

/// How height fractions are distributed along the cone axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DensityBias {
    Uniform,
    /// `u^p` with `p > 1` packs points toward the base.
    DenseBottom(f32),
}

impl DensityBias {
    pub fn apply(self, u: f32) -> f32 {
        match self {
            DensityBias::Uniform        => u,
            DensityBias::DenseBottom(p) => u.powf(p.max(1.0)),
        }
    }
}

/// An apex-up cone standing on `y = y_offset`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConeSpec {
    pub height:      f32,
    pub base_radius: f32,
    pub y_offset:    f32,
    pub bias:        DensityBias,
    /// Upper bound of the random radial jitter added to each point.
    pub thickness:   f32,
}

pub fn sample_cone<R: Rng + ?Sized>(rng: &mut R, spec: &ConeSpec) -> Vec3 {
    let height = spec.height.max(f32::EPSILON);
    let h      = spec.bias.apply(rng.gen::<f32>()) * height;
    let r      = (height - h) / height * spec.base_radius + rng.gen::<f32>() * spec.thickness;
    let angle  = rng.gen::<f32>() * TAU;
    Vec3::new(r * angle.cos(), h + spec.y_offset, r * angle.sin())
}

// ════════════════════════════════════════════════════════════════════════════
// Spiral
// ════════════════════════════════════════════════════════════════════════════

/// A helix wound around the cone from base to apex.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpiralSpec {
    pub turns:       f32,
    pub height:      f32,
    pub base_radius: f32,
    pub y_offset:    f32,
}

/// Point at `t ∈ [0, 1]` along the spiral, bottom to top.
pub fn spiral_point(t: f32, spec: &SpiralSpec) -> Vec3 {
    let t     = t.clamp(0.0, 1.0);
    let r     = (1.0 - t) * spec.base_radius;
    let angle = t * spec.turns * TAU;
    Vec3::new(r * angle.cos(), t * spec.height + spec.y_offset, r * angle.sin())
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const N: usize = 20_000;

    fn cone(bias: DensityBias) -> ConeSpec {
        ConeSpec { height: 10.0, base_radius: 4.0, y_offset: -5.0, bias, thickness: 0.5 }
    }

    fn median(mut v: Vec<f32>) -> f32 {
        v.sort_by(|a, b| a.total_cmp(b));
        v[v.len() / 2]
    }

    #[test]
    fn sphere_samples_stay_inside() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..N {
            assert!(sample_sphere(&mut rng, 3.0).length() <= 3.0 + 1e-4);
        }
    }

    #[test]
    fn sphere_mean_radius_is_three_quarters() {
        let mut rng = StdRng::seed_from_u64(2);
        let mean = (0..N).map(|_| sample_sphere(&mut rng, 4.0).length()).sum::<f32>() / N as f32;
        assert!((mean - 3.0).abs() < 0.05, "mean radius {}", mean);
    }

    #[test]
    fn sphere_is_not_hemispherical() {
        let mut rng = StdRng::seed_from_u64(3);
        let above = (0..N).filter(|_| sample_sphere(&mut rng, 1.0).z > 0.0).count();
        let frac  = above as f32 / N as f32;
        assert!((frac - 0.5).abs() < 0.02, "fraction above {}", frac);
    }

    #[test]
    fn seeded_sampling_is_reproducible() {
        let a: Vec<Vec3> = {
            let mut rng = StdRng::seed_from_u64(42);
            (0..16).map(|_| sample_cone(&mut rng, &cone(DensityBias::Uniform))).collect()
        };
        let b: Vec<Vec3> = {
            let mut rng = StdRng::seed_from_u64(42);
            (0..16).map(|_| sample_cone(&mut rng, &cone(DensityBias::Uniform))).collect()
        };
        assert_eq!(a, b);
    }

    #[test]
    fn cone_points_respect_height_and_radius() {
        let spec    = cone(DensityBias::DenseBottom(1.5));
        let mut rng = StdRng::seed_from_u64(4);
        for _ in 0..N {
            let p = sample_cone(&mut rng, &spec);
            let h = p.y - spec.y_offset;
            assert!((0.0..=spec.height).contains(&h));
            let max_r = (spec.height - h) / spec.height * spec.base_radius + spec.thickness;
            assert!(Vec3::new(p.x, 0.0, p.z).length() <= max_r + 1e-4);
        }
    }

    #[test]
    fn dense_bottom_lowers_median_height() {
        let mut rng = StdRng::seed_from_u64(5);
        let uniform: Vec<f32> =
            (0..N).map(|_| sample_cone(&mut rng, &cone(DensityBias::Uniform)).y).collect();
        let biased: Vec<f32> =
            (0..N).map(|_| sample_cone(&mut rng, &cone(DensityBias::DenseBottom(1.5))).y).collect();
        assert!(median(biased) < median(uniform));
    }

    #[test]
    fn bias_below_one_is_treated_as_uniform() {
        assert_eq!(DensityBias::DenseBottom(0.5).apply(0.25), 0.25);
    }

    #[test]
    fn spiral_runs_base_to_apex() {
        let spec = SpiralSpec { turns: 3.0, height: 12.0, base_radius: 5.0, y_offset: -6.0 };
        let bottom = spiral_point(0.0, &spec);
        let top    = spiral_point(1.0, &spec);
        assert!((bottom - Vec3::new(5.0, -6.0, 0.0)).length() < 1e-5);
        assert!((top.y - 6.0).abs() < 1e-5);
        assert!(Vec3::new(top.x, 0.0, top.z).length() < 1e-5);
    }
}
