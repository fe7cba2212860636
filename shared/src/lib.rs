//! Types shared between the sandbox server and its clients: vector math,
//! tunables, world objects and the wire protocol.

pub mod config;
pub mod protocol;
pub mod vec3;
pub mod world;
