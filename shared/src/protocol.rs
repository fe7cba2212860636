use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::vec3::Vec3;
use crate::world::WorldObjectSpec;

/// Protocol version - increment when making breaking changes.
pub const PROTOCOL_VERSION: u32 = 1;

/// Server-assigned identity of one connection. Never reused within a server
/// process, so a reconnecting client always shows up as a new player.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../bindings/")]
#[serde(transparent)]
pub struct ConnectionId(String);

impl ConnectionId {
    pub fn from_sequence(seq: u64) -> Self {
        Self(format!("c{seq}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What a client reports about its own player.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../bindings/")]
pub struct PlayerState {
    pub position: Vec3,
}

/// A player relayed to other clients, tagged with its owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../bindings/")]
pub struct PlayerWire {
    pub id: ConnectionId,
    #[serde(flatten)]
    pub state: PlayerState,
}

/// Full world snapshot: roster plus object list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../bindings/")]
#[serde(rename_all = "camelCase")]
pub struct WorldStateMsg {
    pub players: HashMap<ConnectionId, PlayerState>,
    pub random_objects: Vec<WorldObjectSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../bindings/")]
#[serde(rename_all = "camelCase")]
pub struct WelcomeMsg {
    pub protocol_version: u32,
    pub self_id: ConnectionId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../bindings/")]
#[serde(rename_all = "camelCase")]
pub struct GenerateWorldMsg {
    pub random_objects: Vec<WorldObjectSpec>,
}

// === Server -> Client ===

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../bindings/")]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMsg {
    Welcome(WelcomeMsg),
    /// Reply to the sender of `initPlayer`
    CurrentWorldState(WorldStateMsg),
    NewPlayer(PlayerWire),
    UpdatePlayer(PlayerWire),
    RemovePlayer { id: ConnectionId },
    NewWorldGenerated(WorldStateMsg),
}

// === Client -> Server ===

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../bindings/")]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMsg {
    InitPlayer(PlayerState),
    UpdatePlayer(PlayerState),
    GenerateWorld(GenerateWorldMsg),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::Shape;

    #[test]
    fn connection_ids_from_distinct_sequences_differ() {
        assert_ne!(ConnectionId::from_sequence(1), ConnectionId::from_sequence(2));
        assert_eq!(ConnectionId::from_sequence(7).as_str(), "c7");
    }

    #[test]
    fn typescript_bindings_go_to_the_workspace_bindings_dir() {
        let path = ServerMsg::output_path().unwrap();
        assert!(path.starts_with(".."));
        assert!(path.ends_with("bindings/ServerMsg.ts"));
        let path = Vec3::output_path().unwrap();
        assert!(path.ends_with("bindings/Vec3.ts"));
    }

    #[test]
    fn client_msg_init_player_wire_shape() {
        let msg = ClientMsg::InitPlayer(PlayerState {
            position: Vec3::new(0.0, 1.0, 0.0),
        });
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(
            json,
            r#"{"type":"initPlayer","position":{"x":0.0,"y":1.0,"z":0.0}}"#
        );
        let parsed: ClientMsg = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, msg);
    }

    #[test]
    fn client_msg_generate_world_uses_camel_case() {
        let json = r#"{"type":"generateWorld","randomObjects":[{"shape":"sphere","size":2,
            "color":0,"position":{"x":1,"y":1,"z":1},"message":"Keep going!"}]}"#;
        match serde_json::from_str::<ClientMsg>(json).unwrap() {
            ClientMsg::GenerateWorld(g) => {
                assert_eq!(g.random_objects.len(), 1);
                assert_eq!(g.random_objects[0].shape, Shape::Sphere);
            }
            other => panic!("Expected GenerateWorld, got {:?}", other),
        }
    }

    #[test]
    fn relayed_player_is_flat() {
        let msg = ServerMsg::UpdatePlayer(PlayerWire {
            id: ConnectionId::from_sequence(3),
            state: PlayerState {
                position: Vec3::new(1.0, 2.0, 3.0),
            },
        });
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["type"], "updatePlayer");
        assert_eq!(value["id"], "c3");
        assert_eq!(value["position"]["z"], 3.0);
        let parsed: ServerMsg = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, msg);
    }

    #[test]
    fn remove_player_carries_id() {
        let msg = ServerMsg::RemovePlayer {
            id: ConnectionId::from_sequence(9),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(json, r#"{"type":"removePlayer","id":"c9"}"#);
    }

    #[test]
    fn world_state_keys_players_by_id() {
        let mut players = HashMap::new();
        players.insert(
            ConnectionId::from_sequence(1),
            PlayerState {
                position: Vec3::ZERO,
            },
        );
        let msg = ServerMsg::NewWorldGenerated(WorldStateMsg {
            players,
            random_objects: Vec::new(),
        });
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["type"], "newWorldGenerated");
        assert!(value["players"]["c1"]["position"].is_object());
        assert!(value["randomObjects"].as_array().unwrap().is_empty());
    }

    #[test]
    fn unknown_client_msg_type_is_rejected() {
        assert!(serde_json::from_str::<ClientMsg>(r#"{"type":"teleport"}"#).is_err());
    }
}
