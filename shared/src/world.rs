//! Decorative world objects: the shared description every client renders and
//! collides against, the random generator, and the snapshot file format.

use std::path::Path;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize};
use ts_rs::TS;

use crate::config::{FloorConfig, RandomObjectsConfig};
use crate::vec3::{self, Vec3};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../bindings/")]
#[serde(rename_all = "lowercase")]
pub enum Shape {
    Box,
    Sphere,
}

/// One immutable world object. `size` is the edge length of a box or the
/// diameter of a sphere; objects rest on the floor so `position.y == size / 2`
/// for generated ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../bindings/")]
pub struct WorldObjectSpec {
    pub shape: Shape,
    pub size: f64,
    #[serde(deserialize_with = "deserialize_color")]
    pub color: u32,
    pub position: Vec3,
    pub message: String,
}

impl WorldObjectSpec {
    pub fn bounding_sphere(&self) -> BoundingSphere {
        let radius = match self.shape {
            Shape::Sphere => self.size / 2.0,
            Shape::Box => self.size * 3f64.sqrt() / 2.0,
        };
        BoundingSphere::new(self.position, radius)
    }
}

/// Older snapshots stored colors as fractional numbers; keep the integer part.
fn deserialize_color<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    let value = f64::deserialize(deserializer)?;
    if !value.is_finite() || !(0.0..=16_777_215.0).contains(&value) {
        return Err(D::Error::custom(format!("color {value} is not a 24-bit RGB value")));
    }
    Ok(value.floor() as u32)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingSphere {
    pub center: Vec3,
    pub radius: f64,
}

impl BoundingSphere {
    pub fn new(center: Vec3, radius: f64) -> Self {
        Self { center, radius }
    }

    /// Strict overlap: spheres that only touch do not intersect.
    pub fn intersects(&self, other: &BoundingSphere) -> bool {
        vec3::distance(self.center, other.center) < self.radius + other.radius
    }
}

/// Draw `config.count` objects, each field independently and uniformly from
/// its configured range, scattered over the floor. Returns an empty list when
/// either config fails validation (no shapes or messages, reversed ranges, an
/// empty floor), since there is nothing sensible to draw from.
pub fn generate(
    config: &RandomObjectsConfig,
    floor: &FloorConfig,
    rng: &mut impl Rng,
) -> Vec<WorldObjectSpec> {
    if config.validate().is_err() || floor.validate().is_err() {
        return Vec::new();
    }

    let half_w = floor.width / 2.0;
    let half_h = floor.height / 2.0;
    let [size_min, size_max] = config.size_range;
    let [color_min, color_max] = config.color_range;

    let mut objects = Vec::with_capacity(config.count);
    for _ in 0..config.count {
        let (Some(&shape), Some(message)) =
            (config.shapes.choose(rng), config.messages.choose(rng))
        else {
            return Vec::new();
        };
        let size = rng.gen_range(size_min..=size_max);
        let color = rng.gen_range(color_min..=color_max);
        let position = Vec3::new(
            rng.gen_range(-half_w..half_w),
            size / 2.0,
            rng.gen_range(-half_h..half_h),
        );

        objects.push(WorldObjectSpec {
            shape,
            size,
            color,
            position,
            message: message.clone(),
        });
    }
    objects
}

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("invalid world schema: {0}")]
    Json(#[from] serde_json::Error),
    #[error("world schema I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Snapshot document: the serializable projection of the world objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../bindings/")]
#[serde(rename_all = "camelCase")]
pub struct WorldSchema {
    pub random_objects: Vec<WorldObjectSpec>,
}

/// Render objects as a pretty-printed schema document.
pub fn serialize(objects: &[WorldObjectSpec]) -> Result<String, SchemaError> {
    let schema = WorldSchema {
        random_objects: objects.to_vec(),
    };
    Ok(serde_json::to_string_pretty(&schema)?)
}

pub fn deserialize(document: &str) -> Result<Vec<WorldObjectSpec>, SchemaError> {
    let schema: WorldSchema = serde_json::from_str(document)?;
    Ok(schema.random_objects)
}

pub fn save_to_file(path: &Path, objects: &[WorldObjectSpec]) -> Result<(), SchemaError> {
    std::fs::write(path, serialize(objects)?)?;
    Ok(())
}

pub fn load_from_file(path: &Path) -> Result<Vec<WorldObjectSpec>, SchemaError> {
    deserialize(&std::fs::read_to_string(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn wide_config() -> RandomObjectsConfig {
        RandomObjectsConfig {
            count: 64,
            shapes: vec![Shape::Box, Shape::Sphere],
            messages: vec!["a".to_string(), "b".to_string()],
            color_range: [0x101010, 0xf0f0f0],
            size_range: [1.0, 4.0],
        }
    }

    #[test]
    fn generated_objects_respect_ranges() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let config = wide_config();
        let floor = FloorConfig::default();
        let objects = generate(&config, &floor, &mut rng);

        assert_eq!(objects.len(), 64);
        for obj in &objects {
            assert!((1.0..=4.0).contains(&obj.size));
            assert!((0x101010..=0xf0f0f0).contains(&obj.color));
            assert!(obj.position.x >= -50.0 && obj.position.x < 50.0);
            assert!(obj.position.z >= -50.0 && obj.position.z < 50.0);
            assert_eq!(obj.position.y, obj.size / 2.0);
            assert!(config.messages.contains(&obj.message));
        }
        assert!(objects.iter().any(|o| o.shape == Shape::Box));
        assert!(objects.iter().any(|o| o.shape == Shape::Sphere));
    }

    #[test]
    fn degenerate_ranges_pin_the_value() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let objects = generate(
            &RandomObjectsConfig::default(),
            &FloorConfig::default(),
            &mut rng,
        );
        assert_eq!(objects.len(), 5);
        assert!(objects.iter().all(|o| o.size == 2.0 && o.color == 0));
    }

    #[test]
    fn empty_message_pool_generates_nothing() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut config = RandomObjectsConfig::default();
        config.messages.clear();
        assert!(generate(&config, &FloorConfig::default(), &mut rng).is_empty());
    }

    #[test]
    fn invalid_ranges_generate_nothing() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let floor = FloorConfig::default();

        let mut reversed_size = wide_config();
        reversed_size.size_range = [4.0, 1.0];
        assert!(generate(&reversed_size, &floor, &mut rng).is_empty());

        let mut reversed_color = wide_config();
        reversed_color.color_range = [0xffffff, 0];
        assert!(generate(&reversed_color, &floor, &mut rng).is_empty());

        let flat_floor = FloorConfig {
            width: 0.0,
            height: 100.0,
        };
        assert!(generate(&wide_config(), &flat_floor, &mut rng).is_empty());
    }

    #[test]
    fn schema_round_trip_is_lossless() {
        let mut rng = ChaCha8Rng::seed_from_u64(99);
        let objects = generate(&wide_config(), &FloorConfig::default(), &mut rng);

        let document = serialize(&objects).unwrap();
        assert!(document.contains("\"randomObjects\""));
        assert_eq!(deserialize(&document).unwrap(), objects);
    }

    #[test]
    fn fractional_color_is_truncated() {
        let document = r#"{"randomObjects":[{"shape":"box","size":3,"color":255.75,
            "position":{"x":1,"y":1.5,"z":-2},"message":"hi"}]}"#;
        let objects = deserialize(document).unwrap();
        assert_eq!(objects[0].shape, Shape::Box);
        assert_eq!(objects[0].color, 255);
        assert_eq!(objects[0].position, Vec3::new(1.0, 1.5, -2.0));
    }

    #[test]
    fn unknown_shape_is_rejected() {
        let document = r#"{"randomObjects":[{"shape":"cone","size":1,"color":0,
            "position":{"x":0,"y":0,"z":0},"message":""}]}"#;
        assert!(matches!(deserialize(document), Err(SchemaError::Json(_))));
    }

    #[test]
    fn box_bounding_sphere_encloses_corners() {
        let obj = WorldObjectSpec {
            shape: Shape::Box,
            size: 2.0,
            color: 0,
            position: Vec3::new(0.0, 1.0, 0.0),
            message: String::new(),
        };
        let sphere = obj.bounding_sphere();
        assert!((sphere.radius - 3f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn touching_spheres_do_not_intersect() {
        let a = BoundingSphere::new(Vec3::ZERO, 1.0);
        let b = BoundingSphere::new(Vec3::new(2.0, 0.0, 0.0), 1.0);
        assert!(!a.intersects(&b));
        let c = BoundingSphere::new(Vec3::new(1.9, 0.0, 0.0), 1.0);
        assert!(a.intersects(&c));
    }

    #[test]
    fn save_and_load_file() {
        let path = std::env::temp_dir().join(format!("world-schema-{}.json", std::process::id()));
        let objects = vec![WorldObjectSpec {
            shape: Shape::Sphere,
            size: 2.0,
            color: 0x00ff00,
            position: Vec3::new(3.0, 1.0, 4.0),
            message: "Keep going!".to_string(),
        }];
        save_to_file(&path, &objects).unwrap();
        let loaded = load_from_file(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(loaded, objects);
    }
}
