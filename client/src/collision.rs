//! Sphere-vs-sphere collision response between the player and static world
//! objects. Objects never move; the player is pushed out and loses the part
//! of its velocity that points into the obstacle.

use sandbox_shared::vec3;
use sandbox_shared::world::BoundingSphere;

use crate::simulator::KinematicBody;

/// Resolve each overlapping obstacle once, in slice order. Corrections are
/// applied sequentially, so an earlier push can create or remove a later
/// overlap. Returns the number of contacts resolved.
pub fn resolve(body: &mut KinematicBody, obstacles: &[BoundingSphere]) -> usize {
    let mut contacts = 0;
    for obstacle in obstacles {
        let player = body.bounding_sphere();
        if !player.intersects(obstacle) {
            continue;
        }

        // Coincident centers fall back to +X
        let normal = vec3::normalize(vec3::sub(player.center, obstacle.center));
        let depth = player.radius + obstacle.radius - vec3::distance(player.center, obstacle.center);

        body.position = vec3::add(body.position, vec3::scale(normal, depth));
        body.position.y = body.position.y.max(body.radius);
        body.velocity = vec3::project_on_plane(body.velocity, normal);

        contacts += 1;
    }
    contacts
}

/// Repeat [`resolve`] until a pass finds no overlap or `max_passes` passes
/// have run. Returns the total number of contacts resolved.
pub fn resolve_iterative(
    body: &mut KinematicBody,
    obstacles: &[BoundingSphere],
    max_passes: usize,
) -> usize {
    let mut total = 0;
    for _ in 0..max_passes {
        let contacts = resolve(body, obstacles);
        if contacts == 0 {
            break;
        }
        total += contacts;
    }
    total
}
