//! Sandbox sync server library.
//!
//! This module exposes the server components for use in tests and binaries.

pub mod config;
pub mod state;
pub mod world_loop;
pub mod ws;
