use crate::world::Shape;

/// Player tunables. Speed, friction and gravity are per 60 Hz frame.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerConfig {
    pub radius: f64,
    pub color: u32,
    pub speed: f64,
    /// Velocity multiplier applied once per frame, in (0, 1)
    pub friction: f64,
    pub jump_speed: f64,
    /// Vertical acceleration per frame (negative is down)
    pub gravity: f64,
    /// Fraction of vertical speed kept after a ground bounce
    pub bounce_factor: f64,
    /// Bounces slower than this come to rest
    pub rest_threshold: f64,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            radius: 0.5,
            color: 0xff0000,
            speed: 0.1,
            friction: 0.5,
            jump_speed: 1.0,
            gravity: -0.1,
            bounce_factor: 0.5,
            rest_threshold: 0.05,
        }
    }
}

impl PlayerConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !self.radius.is_finite() || self.radius <= 0.0 {
            return Err("player radius must be finite and > 0".to_string());
        }
        if self.color > 0xFFFFFF {
            return Err("player color must be a 24-bit RGB value".to_string());
        }
        if !self.speed.is_finite() || self.speed < 0.0 {
            return Err("player speed must be finite and >= 0".to_string());
        }
        if !(self.friction > 0.0 && self.friction < 1.0) {
            return Err("player friction must be in (0, 1)".to_string());
        }
        if !self.jump_speed.is_finite() || self.jump_speed < 0.0 {
            return Err("jump_speed must be finite and >= 0".to_string());
        }
        if !self.gravity.is_finite() || self.gravity > 0.0 {
            return Err("gravity must be finite and <= 0".to_string());
        }
        if !(0.0..1.0).contains(&self.bounce_factor) {
            return Err("bounce_factor must be in [0, 1)".to_string());
        }
        if !self.rest_threshold.is_finite() || self.rest_threshold < 0.0 {
            return Err("rest_threshold must be finite and >= 0".to_string());
        }
        Ok(())
    }
}

/// Floor extents on the XZ plane, centered on the origin.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FloorConfig {
    pub width: f64,
    pub height: f64,
}

impl Default for FloorConfig {
    fn default() -> Self {
        Self {
            width: 100.0,
            height: 100.0,
        }
    }
}

impl FloorConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !self.width.is_finite() || self.width <= 0.0 {
            return Err("floor width must be finite and > 0".to_string());
        }
        if !self.height.is_finite() || self.height <= 0.0 {
            return Err("floor height must be finite and > 0".to_string());
        }
        Ok(())
    }
}

/// Ranges the world generator draws from.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RandomObjectsConfig {
    pub count: usize,
    pub shapes: Vec<Shape>,
    pub messages: Vec<String>,
    /// Inclusive RGB range
    pub color_range: [u32; 2],
    /// Inclusive edge length / diameter range
    pub size_range: [f64; 2],
}

impl Default for RandomObjectsConfig {
    fn default() -> Self {
        Self {
            count: 5,
            shapes: vec![Shape::Sphere],
            messages: vec![
                "Explore me!".to_string(),
                "Hidden message here".to_string(),
                "Click to discover more".to_string(),
                "Keep going!".to_string(),
            ],
            color_range: [0x000000, 0x000000],
            size_range: [2.0, 2.0],
        }
    }
}

impl RandomObjectsConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.shapes.is_empty() {
            return Err("at least one object shape is required".to_string());
        }
        if self.messages.is_empty() {
            return Err("at least one object message is required".to_string());
        }
        let [c_min, c_max] = self.color_range;
        if c_min > c_max || c_max > 0xFFFFFF {
            return Err("color_range must be ordered 24-bit RGB values".to_string());
        }
        let [s_min, s_max] = self.size_range;
        if !s_min.is_finite() || !s_max.is_finite() || s_min <= 0.0 || s_min > s_max {
            return Err("size_range must be finite, > 0 and ordered".to_string());
        }
        Ok(())
    }
}

/// Everything the client-side simulation and world generation need.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SandboxConfig {
    pub player: PlayerConfig,
    pub floor: FloorConfig,
    pub random_objects: RandomObjectsConfig,
}

impl SandboxConfig {
    pub fn validate(&self) -> Result<(), String> {
        self.player.validate()?;
        self.floor.validate()?;
        self.random_objects.validate()?;
        if 2.0 * self.player.radius >= self.floor.width.min(self.floor.height) {
            return Err("player does not fit on the floor".to_string());
        }
        Ok(())
    }
}
