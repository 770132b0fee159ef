//! Slow floating motion for the Earth group.

use cgmath::Vector3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::{config::FloatConfig, data_structures::instance::Instance};

/// Upper bound of the random phase offset.
pub const MAX_OFFSET: f64 = 10_000.0;

/// Remap `x` from `[a1, a2]` to `[b1, b2]`.
pub fn map_linear(x: f32, a1: f32, a2: f32, b1: f32, b2: f32) -> f32 {
    b1 + (x - a1) * (b2 - b1) / (a2 - a1)
}

/// Euler angles (X, Y, Z order) and height of the floating group.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FloatPose {
    pub rotation: [f32; 3],
    pub height: f32,
}

impl FloatPose {
    pub fn to_instance(self) -> Instance {
        let mut instance = Instance {
            position: Vector3::new(0.0, self.height, 0.0),
            ..Default::default()
        };
        let [x, y, z] = self.rotation;
        instance.set_euler_xyz(x, y, z);
        instance
    }
}

#[derive(Debug, Clone)]
pub struct FloatMotion {
    config: FloatConfig,
    offset: f64,
}

impl FloatMotion {
    pub fn new(config: FloatConfig, offset: f64) -> Self {
        Self { config, offset }
    }

    /// Offset drawn from `[0, MAX_OFFSET)` so two scenes with different seeds
    /// don't float in sync.
    pub fn seeded(config: FloatConfig, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        Self::new(config, rng.random::<f64>() * MAX_OFFSET)
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    pub fn pose(&self, elapsed: f32) -> FloatPose {
        let FloatConfig {
            speed,
            rotation_intensity,
            float_intensity,
            floating_range: (low, high),
        } = self.config;
        // The offset is large, so the phase is formed in f64
        let phase = ((self.offset + elapsed as f64) / 4.0 * speed as f64) as f32;
        let (sin, cos) = (phase.sin(), phase.cos());
        FloatPose {
            rotation: [
                cos / 8.0 * rotation_intensity,
                sin / 8.0 * rotation_intensity,
                sin / 20.0 * rotation_intensity,
            ],
            height: map_linear(sin / 10.0, -0.1, 0.1, low, high) * float_intensity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_remap_linearly() {
        assert!(map_linear(0.0, -0.1, 0.1, -0.1, 0.1).abs() < 1e-6);
        assert!((map_linear(0.1, -0.1, 0.1, 0.0, 1.0) - 1.0).abs() < 1e-6);
        assert!((map_linear(-0.1, -0.1, 0.1, 2.0, 4.0) - 2.0).abs() < 1e-6);
    }

    #[test]
    fn should_stay_within_bounds() {
        let motion = FloatMotion::seeded(FloatConfig::default(), 11);
        for step in 0..2000 {
            let pose = motion.pose(step as f32 * 0.37);
            assert!(pose.rotation[0].abs() <= 0.1 / 8.0 + 1e-6);
            assert!(pose.rotation[1].abs() <= 0.1 / 8.0 + 1e-6);
            assert!(pose.rotation[2].abs() <= 0.1 / 20.0 + 1e-6);
            assert!(pose.height.abs() <= 0.1 * 0.3 + 1e-6);
        }
    }

    #[test]
    fn should_draw_offset_from_seed() {
        let a = FloatMotion::seeded(FloatConfig::default(), 5);
        let b = FloatMotion::seeded(FloatConfig::default(), 5);
        assert_eq!(a.offset(), b.offset());
        assert!((0.0..MAX_OFFSET).contains(&a.offset()));
    }

    #[test]
    fn should_start_from_the_offset_phase() {
        let motion = FloatMotion::new(FloatConfig::default(), 0.0);
        let pose = motion.pose(0.0);
        assert!((pose.rotation[0] - 0.1 / 8.0).abs() < 1e-6);
        assert!(pose.rotation[1].abs() < 1e-6);
        assert!(pose.height.abs() < 1e-6);
    }
}
