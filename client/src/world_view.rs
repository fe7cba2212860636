use std::collections::HashMap;

use sandbox_shared::protocol::{ConnectionId, PlayerState, WorldStateMsg};
use sandbox_shared::world::{BoundingSphere, WorldObjectSpec};

use crate::sync_client::WorldUpdate;

/// The client's read-only copy of everything it does not simulate itself:
/// other players and the world objects.
#[derive(Debug, Clone)]
pub struct WorldView {
    self_id: ConnectionId,
    remote_players: HashMap<ConnectionId, PlayerState>,
    objects: Vec<WorldObjectSpec>,
    obstacles: Vec<BoundingSphere>,
    generation: u64,
}

impl WorldView {
    pub fn new(self_id: ConnectionId) -> Self {
        Self {
            self_id,
            remote_players: HashMap::new(),
            objects: Vec::new(),
            obstacles: Vec::new(),
            generation: 0,
        }
    }

    pub fn self_id(&self) -> &ConnectionId {
        &self.self_id
    }

    pub fn apply(&mut self, update: WorldUpdate) {
        match update {
            WorldUpdate::CurrentWorldState(world) | WorldUpdate::NewWorldGenerated(world) => {
                self.replace(world);
            }
            WorldUpdate::NewPlayer(p) | WorldUpdate::UpdatePlayer(p) => {
                if p.id != self.self_id {
                    self.remote_players.insert(p.id, p.state);
                }
            }
            WorldUpdate::RemovePlayer { id } => {
                self.remote_players.remove(&id);
            }
        }
    }

    fn replace(&mut self, world: WorldStateMsg) {
        let self_id = &self.self_id;
        self.remote_players = world
            .players
            .into_iter()
            .filter(|(id, _)| id != self_id)
            .collect();
        self.obstacles = world
            .random_objects
            .iter()
            .map(WorldObjectSpec::bounding_sphere)
            .collect();
        self.objects = world.random_objects;
        self.generation += 1;
    }

    pub fn remote_players(&self) -> &HashMap<ConnectionId, PlayerState> {
        &self.remote_players
    }

    pub fn remote_player(&self, id: &ConnectionId) -> Option<&PlayerState> {
        self.remote_players.get(id)
    }

    pub fn objects(&self) -> &[WorldObjectSpec] {
        &self.objects
    }

    /// Collision proxies for `objects()`, in the same order.
    pub fn obstacles(&self) -> &[BoundingSphere] {
        &self.obstacles
    }

    /// Bumped every time the object list is replaced.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}
