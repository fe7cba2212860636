use sandbox_shared::vec3::{self, Vec3};

/// The movement keys the simulator understands. Anything else is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveKey {
    Forward,
    Back,
    Left,
    Right,
}

impl MoveKey {
    /// Map a browser `KeyboardEvent.key` name. Both WASD and ZQSD (AZERTY)
    /// layouts are accepted, plus the arrow keys.
    pub fn from_key_name(name: &str) -> Option<MoveKey> {
        match name.to_ascii_uppercase().as_str() {
            "W" | "Z" | "ARROWUP" => Some(MoveKey::Forward),
            "S" | "ARROWDOWN" => Some(MoveKey::Back),
            "A" | "Q" | "ARROWLEFT" => Some(MoveKey::Left),
            "D" | "ARROWRIGHT" => Some(MoveKey::Right),
            _ => None,
        }
    }
}

/// Pressed state of the fixed movement key set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyState {
    pub forward: bool,
    pub back: bool,
    pub left: bool,
    pub right: bool,
}

impl KeyState {
    pub fn set(&mut self, key: MoveKey, pressed: bool) {
        match key {
            MoveKey::Forward => self.forward = pressed,
            MoveKey::Back => self.back = pressed,
            MoveKey::Left => self.left = pressed,
            MoveKey::Right => self.right = pressed,
        }
    }

    pub fn is_pressed(&self, key: MoveKey) -> bool {
        match key {
            MoveKey::Forward => self.forward,
            MoveKey::Back => self.back,
            MoveKey::Left => self.left,
            MoveKey::Right => self.right,
        }
    }

    /// Handle a key-down/key-up by name. Returns false for unrecognized keys.
    pub fn handle_key(&mut self, name: &str, pressed: bool) -> bool {
        match MoveKey::from_key_name(name) {
            Some(key) => {
                self.set(key, pressed);
                true
            }
            None => false,
        }
    }

    pub fn any(&self) -> bool {
        self.forward || self.back || self.left || self.right
    }
}

/// Camera orientation the movement keys are relative to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraBasis {
    pub forward: Vec3,
    pub right: Vec3,
}

impl Default for CameraBasis {
    fn default() -> Self {
        Self::from_yaw(0.0)
    }
}

impl CameraBasis {
    pub fn new(forward: Vec3, right: Vec3) -> Self {
        Self { forward, right }
    }

    /// Camera turned `yaw` radians counter-clockwise (seen from above) from
    /// looking down -Z.
    pub fn from_yaw(yaw: f64) -> Self {
        Self {
            forward: vec3::rotate_around_axis(Vec3::new(0.0, 0.0, -1.0), Vec3::Y, yaw),
            right: vec3::rotate_around_axis(Vec3::X, Vec3::Y, yaw),
        }
    }

    /// Unit horizontal direction for the pressed keys, or zero when nothing
    /// is pressed or opposite keys cancel out.
    pub fn move_direction(&self, keys: &KeyState) -> Vec3 {
        let forward = vec3::flatten(self.forward);
        let right = vec3::flatten(self.right);

        let mut direction = Vec3::ZERO;
        if keys.forward {
            direction = vec3::add(direction, forward);
        }
        if keys.back {
            direction = vec3::sub(direction, forward);
        }
        if keys.right {
            direction = vec3::add(direction, right);
        }
        if keys.left {
            direction = vec3::sub(direction, right);
        }
        vec3::normalize_or_zero(direction)
    }
}
