//! Local player kinematics.
//!
//! Movement constants are calibrated per 60 Hz frame. `update(dt)` converts a
//! wall-clock delta into a frame count so the feel does not depend on the
//! refresh rate; at exactly one reference frame the step is the plain
//! `velocity *= friction; velocity += accel; position += velocity` update.

use sandbox_shared::config::{FloorConfig, PlayerConfig};
use sandbox_shared::protocol::PlayerState;
use sandbox_shared::vec3::{self, Vec3};
use sandbox_shared::world::BoundingSphere;

use crate::collision;
use crate::input::{CameraBasis, KeyState};

/// Duration of one reference frame.
pub const REFERENCE_FRAME_SECS: f64 = 1.0 / 60.0;

/// Upper bound on frames simulated by a single update, so a stalled tab does
/// not teleport the player.
const MAX_FRAMES_PER_UPDATE: f64 = 4.0;

const SPAWN_POSITION: Vec3 = Vec3 {
    x: 0.0,
    y: 1.0,
    z: 0.0,
};

/// Position, velocity and collision radius of a moving sphere.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KinematicBody {
    pub position: Vec3,
    pub velocity: Vec3,
    pub radius: f64,
}

impl KinematicBody {
    pub fn new(position: Vec3, radius: f64) -> Self {
        Self {
            position,
            velocity: Vec3::ZERO,
            radius,
        }
    }

    pub fn bounding_sphere(&self) -> BoundingSphere {
        BoundingSphere::new(self.position, self.radius)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum VerticalMode {
    /// Movement stays on the horizontal plane.
    #[default]
    Flat,
    /// Jumping, gravity and ground bounces.
    Bounce,
}

#[derive(Debug, Clone)]
pub struct PlayerSimulator {
    config: PlayerConfig,
    floor: FloorConfig,
    mode: VerticalMode,
    body: KinematicBody,
    acceleration: Vec3,
    keys: KeyState,
    camera: CameraBasis,
    grounded: bool,
    jump_requested: bool,
}

impl PlayerSimulator {
    pub fn new(config: PlayerConfig, floor: FloorConfig, mode: VerticalMode) -> Self {
        Self {
            config,
            floor,
            mode,
            body: KinematicBody::new(SPAWN_POSITION, config.radius),
            acceleration: Vec3::ZERO,
            keys: KeyState::default(),
            camera: CameraBasis::default(),
            grounded: false,
            jump_requested: false,
        }
    }

    pub fn set_keys(&mut self, keys: KeyState) {
        self.keys = keys;
    }

    pub fn keys_mut(&mut self) -> &mut KeyState {
        &mut self.keys
    }

    pub fn set_camera(&mut self, camera: CameraBasis) {
        self.camera = camera;
    }

    /// Ask for a jump on the next update. Only honoured in bounce mode while
    /// standing on the floor.
    pub fn request_jump(&mut self) {
        self.jump_requested = true;
    }

    pub fn mode(&self) -> VerticalMode {
        self.mode
    }

    pub fn is_grounded(&self) -> bool {
        self.grounded
    }

    pub fn body(&self) -> &KinematicBody {
        &self.body
    }

    /// Mutable access for the collision resolver.
    pub fn body_mut(&mut self) -> &mut KinematicBody {
        &mut self.body
    }

    pub fn position(&self) -> Vec3 {
        self.body.position
    }

    pub fn velocity(&self) -> Vec3 {
        self.body.velocity
    }

    /// The state sent to the server after each tick.
    pub fn player_state(&self) -> PlayerState {
        PlayerState {
            position: self.body.position,
        }
    }

    /// Advance by `dt` seconds of wall-clock time.
    pub fn update(&mut self, dt: f64) {
        let frames = if dt.is_finite() {
            (dt / REFERENCE_FRAME_SECS).clamp(0.0, MAX_FRAMES_PER_UPDATE)
        } else {
            0.0
        };
        self.step(frames);
    }

    /// Advance by `frames` reference frames (fractional allowed).
    pub fn step(&mut self, frames: f64) {
        let decay = self.config.friction.powf(frames);
        let velocity = &mut self.body.velocity;
        velocity.x *= decay;
        velocity.z *= decay;
        match self.mode {
            VerticalMode::Flat => velocity.y *= decay,
            VerticalMode::Bounce => {
                if self.jump_requested && self.grounded {
                    velocity.y = self.config.jump_speed;
                    self.grounded = false;
                }
                if !self.grounded {
                    velocity.y += self.config.gravity * frames;
                }
            }
        }
        self.jump_requested = false;

        let direction = self.camera.move_direction(&self.keys);
        self.acceleration = vec3::scale(direction, self.config.speed);

        self.body.velocity = vec3::add(self.body.velocity, vec3::scale(self.acceleration, frames));
        self.body.position = vec3::add(self.body.position, vec3::scale(self.body.velocity, frames));

        self.enforce_bounds();
        if self.mode == VerticalMode::Bounce {
            self.settle_on_ground();
        }

        self.acceleration = Vec3::ZERO;
    }

    /// Collision response for this tick: push out of `obstacles` in order,
    /// then re-apply the floor bounds. Returns the number of contacts.
    pub fn collide(&mut self, obstacles: &[BoundingSphere]) -> usize {
        let contacts = collision::resolve(&mut self.body, obstacles);
        self.enforce_bounds();
        contacts
    }

    /// Keep the sphere inside the floor rectangle and above the floor plane.
    /// Only the position is corrected so the player slides along edges.
    pub fn enforce_bounds(&mut self) {
        let r = self.body.radius;
        let half_w = self.floor.width / 2.0 - r;
        let half_h = self.floor.height / 2.0 - r;
        let p = &mut self.body.position;
        p.x = p.x.max(-half_w).min(half_w);
        p.z = p.z.max(-half_h).min(half_h);
        if self.mode == VerticalMode::Flat {
            p.y = p.y.max(r);
        }
    }

    fn settle_on_ground(&mut self) {
        let r = self.body.radius;
        let body = &mut self.body;
        if body.position.y <= r {
            body.position.y = r;
            if body.velocity.y < 0.0 {
                body.velocity.y = -body.velocity.y * self.config.bounce_factor;
            }
            if body.velocity.y.abs() < self.config.rest_threshold {
                body.velocity.y = 0.0;
                self.grounded = true;
            }
        } else if self.grounded {
            // Pushed up by an obstacle; fall back down.
            self.grounded = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat() -> PlayerSimulator {
        PlayerSimulator::new(
            PlayerConfig::default(),
            FloorConfig::default(),
            VerticalMode::Flat,
        )
    }

    fn bouncy() -> PlayerSimulator {
        PlayerSimulator::new(
            PlayerConfig::default(),
            FloorConfig::default(),
            VerticalMode::Bounce,
        )
    }

    #[test]
    fn spawns_above_origin_at_rest() {
        let sim = flat();
        assert_eq!(sim.position(), Vec3::new(0.0, 1.0, 0.0));
        assert_eq!(sim.velocity(), Vec3::ZERO);
    }

    #[test]
    fn clamp_at_floor_edge_keeps_velocity() {
        let mut sim = flat();
        sim.body_mut().position = Vec3::new(49.0, 1.0, 0.0);
        sim.body_mut().velocity = Vec3::new(22.0, 0.0, 0.0);

        sim.step(1.0);

        // 22 * 0.5 friction would put the player at x = 60
        assert_eq!(sim.position().x, 49.5);
        assert_eq!(sim.velocity().x, 11.0);
    }

    #[test]
    fn clamp_applies_on_negative_z_edge() {
        let mut sim = flat();
        sim.body_mut().position = Vec3::new(0.0, 1.0, -49.4);
        sim.body_mut().velocity = Vec3::new(0.0, 0.0, -4.0);
        sim.update(REFERENCE_FRAME_SECS);
        assert_eq!(sim.position().z, -49.5);
        assert!(sim.velocity().z < 0.0);
    }

    #[test]
    fn obstacle_at_the_edge_cannot_push_player_off_the_floor() {
        let mut sim = flat();
        sim.body_mut().position = Vec3::new(49.4, 1.0, 0.0);
        sim.set_keys(KeyState {
            right: true,
            ..Default::default()
        });
        sim.update(REFERENCE_FRAME_SECS);

        // The push alone would land at x = 50.1
        let rock = BoundingSphere::new(Vec3::new(48.6, 1.0, 0.0), 1.0);
        assert_eq!(sim.collide(&[rock]), 1);

        assert_eq!(sim.position().x, 49.5);
        assert_eq!(sim.player_state().position.x, 49.5);
        assert!(sim.velocity().x.abs() < 1e-12);
    }

    #[test]
    fn one_frame_matches_per_frame_rule() {
        let mut sim = flat();
        sim.set_keys(KeyState {
            forward: true,
            ..Default::default()
        });
        sim.step(1.0);

        // velocity = 0 * friction + speed along -Z
        assert!((sim.velocity().z + 0.1).abs() < 1e-12);
        assert!((sim.position().z + 0.1).abs() < 1e-12);
        assert_eq!(sim.position().y, 1.0);
    }

    #[test]
    fn opposite_keys_do_not_accelerate() {
        let mut sim = flat();
        sim.set_keys(KeyState {
            left: true,
            right: true,
            ..Default::default()
        });
        for _ in 0..10 {
            sim.update(REFERENCE_FRAME_SECS);
        }
        assert_eq!(sim.velocity(), Vec3::ZERO);
        assert_eq!(sim.position(), Vec3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn friction_stops_a_released_player() {
        let mut sim = flat();
        sim.set_keys(KeyState {
            right: true,
            ..Default::default()
        });
        for _ in 0..30 {
            sim.update(REFERENCE_FRAME_SECS);
        }
        assert!(sim.velocity().x > 0.0);

        sim.set_keys(KeyState::default());
        for _ in 0..60 {
            sim.update(REFERENCE_FRAME_SECS);
        }
        assert!(sim.velocity().x.abs() < 1e-9);
    }

    #[test]
    fn bad_dt_is_a_no_op() {
        let mut sim = flat();
        sim.body_mut().velocity = Vec3::new(1.0, 0.0, 0.0);
        sim.update(f64::NAN);
        sim.update(-1.0);
        assert_eq!(sim.position(), Vec3::new(0.0, 1.0, 0.0));
        assert!(sim.position().is_finite());
    }

    #[test]
    fn huge_dt_is_capped() {
        let mut sim = flat();
        sim.set_keys(KeyState {
            right: true,
            ..Default::default()
        });
        sim.update(10.0);
        let mut capped = flat();
        capped.set_keys(KeyState {
            right: true,
            ..Default::default()
        });
        capped.step(MAX_FRAMES_PER_UPDATE);
        assert_eq!(sim.position(), capped.position());
    }

    #[test]
    fn bounce_mode_falls_and_comes_to_rest() {
        let mut sim = bouncy();
        assert!(!sim.is_grounded());
        for _ in 0..600 {
            sim.update(REFERENCE_FRAME_SECS);
        }
        assert!(sim.is_grounded());
        assert_eq!(sim.position().y, 0.5);
        assert_eq!(sim.velocity().y, 0.0);
    }

    #[test]
    fn jump_only_from_the_ground() {
        let mut sim = bouncy();
        // Airborne at spawn: the request is dropped
        sim.request_jump();
        sim.step(1.0);
        assert!(sim.velocity().y < 0.0);

        for _ in 0..600 {
            sim.step(1.0);
        }
        assert!(sim.is_grounded());

        sim.request_jump();
        sim.step(1.0);
        assert!(!sim.is_grounded());
        assert!(sim.position().y > 0.5);

        // A second request mid-air does nothing
        let vy = sim.velocity().y;
        sim.request_jump();
        sim.step(1.0);
        assert!(sim.velocity().y < vy);
    }

    #[test]
    fn ground_contact_reverses_and_damps() {
        let mut sim = bouncy();
        sim.body_mut().position = Vec3::new(0.0, 0.6, 0.0);
        sim.body_mut().velocity = Vec3::new(0.0, -0.5, 0.0);
        sim.step(1.0);
        assert_eq!(sim.position().y, 0.5);
        // (-0.5 - 0.1) * -0.5
        assert!((sim.velocity().y - 0.3).abs() < 1e-12);
        assert!(!sim.is_grounded());
    }

    #[test]
    fn bounce_mode_keeps_vertical_speed_from_friction() {
        let mut sim = bouncy();
        sim.body_mut().position = Vec3::new(0.0, 10.0, 0.0);
        sim.body_mut().velocity = Vec3::new(1.0, 1.0, 0.0);
        sim.step(1.0);
        assert!((sim.velocity().x - 0.5).abs() < 1e-12);
        assert!((sim.velocity().y - 0.9).abs() < 1e-12);
    }
}
