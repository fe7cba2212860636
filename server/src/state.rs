use sandbox_shared::protocol::{
    ClientMsg, ConnectionId, PlayerState, PlayerWire, ServerMsg, WorldStateMsg,
};
use sandbox_shared::world::WorldObjectSpec;
use std::collections::{HashMap, HashSet};

/// Who receives a dispatched message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Audience {
    Only(ConnectionId),
    AllExcept(ConnectionId),
    All,
}

impl Audience {
    pub fn includes(&self, id: &ConnectionId) -> bool {
        match self {
            Audience::Only(target) => target == id,
            Audience::AllExcept(origin) => origin != id,
            Audience::All => true,
        }
    }
}

/// A message produced by a state transition, with its addressees.
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatch {
    pub audience: Audience,
    pub msg: ServerMsg,
}

/// Lifecycle of one connection. Closing a connection removes it entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionPhase {
    Connected,
    Initialized,
}

/// Authoritative world owned by the world loop task.
///
/// A player entry exists exactly for the open connections that have sent
/// `initPlayer`. Handlers never fail: events that do not fit the
/// connection's phase are dropped.
#[derive(Debug, Default)]
pub struct WorldState {
    pub players: HashMap<ConnectionId, PlayerState>,
    pub random_objects: Vec<WorldObjectSpec>,
    connections: HashSet<ConnectionId>,
    next_connection_seq: u64,
}

impl WorldState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a newly opened connection under a fresh id.
    pub fn connect(&mut self) -> ConnectionId {
        self.next_connection_seq += 1;
        let id = ConnectionId::from_sequence(self.next_connection_seq);
        self.connections.insert(id.clone());
        id
    }

    pub fn phase(&self, id: &ConnectionId) -> Option<ConnectionPhase> {
        if self.players.contains_key(id) {
            Some(ConnectionPhase::Initialized)
        } else if self.connections.contains(id) {
            Some(ConnectionPhase::Connected)
        } else {
            None
        }
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn snapshot(&self) -> WorldStateMsg {
        WorldStateMsg {
            players: self.players.clone(),
            random_objects: self.random_objects.clone(),
        }
    }

    /// Route one inbound client event to its handler.
    pub fn handle(&mut self, id: &ConnectionId, msg: ClientMsg) -> Vec<Dispatch> {
        match msg {
            ClientMsg::InitPlayer(data) => self.init_player(id, data),
            ClientMsg::UpdatePlayer(data) => self.update_player(id, data),
            ClientMsg::GenerateWorld(world) => self.generate_world(id, world.random_objects),
        }
    }

    /// Store (or overwrite) the sender's player, reply with the full world and
    /// announce the player to everyone else.
    pub fn init_player(&mut self, id: &ConnectionId, data: PlayerState) -> Vec<Dispatch> {
        if !self.connections.contains(id) {
            tracing::debug!("initPlayer from unknown connection {}", id);
            return Vec::new();
        }
        self.players.insert(id.clone(), data);

        vec![
            Dispatch {
                audience: Audience::Only(id.clone()),
                msg: ServerMsg::CurrentWorldState(self.snapshot()),
            },
            Dispatch {
                audience: Audience::AllExcept(id.clone()),
                msg: ServerMsg::NewPlayer(PlayerWire {
                    id: id.clone(),
                    state: data,
                }),
            },
        ]
    }

    /// Overwrite an initialized player and relay it to everyone else.
    pub fn update_player(&mut self, id: &ConnectionId, data: PlayerState) -> Vec<Dispatch> {
        let Some(entry) = self.players.get_mut(id) else {
            tracing::debug!("updatePlayer before initPlayer from {}", id);
            return Vec::new();
        };
        *entry = data;

        vec![Dispatch {
            audience: Audience::AllExcept(id.clone()),
            msg: ServerMsg::UpdatePlayer(PlayerWire {
                id: id.clone(),
                state: data,
            }),
        }]
    }

    /// Full snapshot for a connection that fell behind the broadcast stream
    /// and may have missed roster deltas.
    pub fn resync(&self, id: &ConnectionId) -> Vec<Dispatch> {
        if !self.connections.contains(id) {
            return Vec::new();
        }
        vec![Dispatch {
            audience: Audience::Only(id.clone()),
            msg: ServerMsg::CurrentWorldState(self.snapshot()),
        }]
    }

    /// Forget a closed connection; announce the departure if it had a player.
    pub fn disconnect(&mut self, id: &ConnectionId) -> Vec<Dispatch> {
        self.connections.remove(id);
        if self.players.remove(id).is_none() {
            return Vec::new();
        }

        vec![Dispatch {
            audience: Audience::AllExcept(id.clone()),
            msg: ServerMsg::RemovePlayer { id: id.clone() },
        }]
    }

    /// Replace the object list and push it, with the current roster, to every
    /// connection including the sender.
    pub fn generate_world(
        &mut self,
        id: &ConnectionId,
        random_objects: Vec<WorldObjectSpec>,
    ) -> Vec<Dispatch> {
        if !self.connections.contains(id) {
            tracing::debug!("generateWorld from unknown connection {}", id);
            return Vec::new();
        }
        self.random_objects = random_objects;

        vec![Dispatch {
            audience: Audience::All,
            msg: ServerMsg::NewWorldGenerated(self.snapshot()),
        }]
    }
}
