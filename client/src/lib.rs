//! Client side of the sandbox: the per-frame player simulation, collision
//! against world objects, and the connection to the sync server.
//!
//! A renderer drives this once per frame: `PlayerSimulator::update`, then
//! `PlayerSimulator::collide` (which resolves contacts and re-clamps to the
//! floor), then `SyncClient::update_player`, and draws the remote players
//! held in a `WorldView`.

pub mod collision;
pub mod input;
pub mod simulator;
pub mod sync_client;
pub mod walker;
pub mod world_view;
