//! Scripted input for headless play: wanders in random directions, turns back
//! toward the middle near the floor edges and hops now and then.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sandbox_shared::config::FloorConfig;
use sandbox_shared::vec3::Vec3;

use crate::input::KeyState;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct WalkerOutput {
    pub keys: KeyState,
    /// Camera yaw in radians, see `CameraBasis::from_yaw`.
    pub yaw: f64,
    pub jump: bool,
}

const HOLD_MIN: f64 = 0.5;
const HOLD_MAX: f64 = 2.5;
const IDLE_CHANCE: f64 = 0.15;
const STRAFE_CHANCE: f64 = 0.25;
/// Fraction of the half-extent past which the walker heads home.
const EDGE_FRACTION: f64 = 0.8;
const JUMP_CHANCE: f64 = 0.01;
const JUMP_COOLDOWN: f64 = 1.0;

#[derive(Debug)]
pub struct Walker {
    hold: f64,
    jump_cooldown: f64,
    output: WalkerOutput,
    rng: ChaCha8Rng,
}

impl Default for Walker {
    fn default() -> Self {
        Self::with_seed(1)
    }
}

impl Walker {
    pub fn with_seed(seed: u64) -> Self {
        Self {
            hold: 0.0,
            jump_cooldown: 0.0,
            output: WalkerOutput::default(),
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn update(&mut self, dt: f64, position: Vec3, floor: &FloorConfig) -> WalkerOutput {
        self.hold = (self.hold - dt).max(0.0);
        self.jump_cooldown = (self.jump_cooldown - dt).max(0.0);

        let near_edge = position.x.abs() > floor.width / 2.0 * EDGE_FRACTION
            || position.z.abs() > floor.height / 2.0 * EDGE_FRACTION;

        if near_edge {
            // Face the origin; forward is (-sin yaw, 0, -cos yaw)
            self.output.yaw = position.x.atan2(position.z);
            self.output.keys = KeyState {
                forward: true,
                ..Default::default()
            };
            self.hold = HOLD_MIN;
        } else if self.hold <= 0.0 {
            self.output.yaw = self.rng.gen_range(0.0..std::f64::consts::TAU);
            let mut keys = KeyState::default();
            if !self.rng.gen_bool(IDLE_CHANCE) {
                keys.forward = true;
                if self.rng.gen_bool(STRAFE_CHANCE) {
                    if self.rng.gen_bool(0.5) {
                        keys.left = true;
                    } else {
                        keys.right = true;
                    }
                }
            }
            self.output.keys = keys;
            self.hold = self.rng.gen_range(HOLD_MIN..HOLD_MAX);
        }

        self.output.jump = false;
        if self.jump_cooldown <= 0.0 && self.rng.gen_bool(JUMP_CHANCE) {
            self.output.jump = true;
            self.jump_cooldown = JUMP_COOLDOWN;
        }

        self.output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::CameraBasis;
    use sandbox_shared::vec3;

    const DT: f64 = 1.0 / 60.0;

    #[test]
    fn heads_back_from_the_edge() {
        let mut walker = Walker::default();
        let floor = FloorConfig::default();
        let position = Vec3::new(45.0, 1.0, -10.0);

        let out = walker.update(DT, position, &floor);
        let direction = CameraBasis::from_yaw(out.yaw).move_direction(&out.keys);

        // Moving toward the origin shrinks the distance to it
        let next = vec3::add(position, direction);
        assert!(vec3::length(next) < vec3::length(position));
        assert!(direction.x < 0.0);
    }

    #[test]
    fn same_seed_same_walk() {
        let floor = FloorConfig::default();
        let mut a = Walker::with_seed(42);
        let mut b = Walker::with_seed(42);
        for _ in 0..300 {
            assert_eq!(
                a.update(DT, Vec3::ZERO, &floor),
                b.update(DT, Vec3::ZERO, &floor)
            );
        }
    }

    #[test]
    fn full_width_seeds_give_different_walks() {
        let floor = FloorConfig::default();
        let mut low = Walker::with_seed(5);
        let mut high = Walker::with_seed(5 | 1 << 40);
        let differs = (0..300).any(|_| {
            low.update(DT, Vec3::ZERO, &floor) != high.update(DT, Vec3::ZERO, &floor)
        });
        assert!(differs);
    }

    #[test]
    fn keeps_direction_while_holding() {
        let floor = FloorConfig::default();
        let mut walker = Walker::with_seed(7);
        let first = walker.update(DT, Vec3::ZERO, &floor);
        // Minimum hold is longer than one frame
        let second = walker.update(DT, Vec3::ZERO, &floor);
        assert_eq!(first.yaw, second.yaw);
        assert_eq!(first.keys, second.keys);
    }

    #[test]
    fn jumps_are_spaced_out() {
        let floor = FloorConfig::default();
        let mut walker = Walker::with_seed(3);
        let mut last_jump: Option<usize> = None;
        for frame in 0..6000 {
            if walker.update(DT, Vec3::ZERO, &floor).jump {
                if let Some(prev) = last_jump {
                    assert!((frame - prev) as f64 * DT >= JUMP_COOLDOWN - 1e-9);
                }
                last_jump = Some(frame);
            }
        }
    }
}
