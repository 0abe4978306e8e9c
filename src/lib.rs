//! Personal video game backlog: a per-user catalog of titles with platform,
//! play status, rating, notes and an optional cover image.
//!
//! The core (`state`) only talks to the collaborator traits in `backend`;
//! the desktop binary wires in the local SQLite and filesystem versions.

pub mod account;
pub mod backend;
pub mod config;
pub mod error;
pub mod logging;
pub mod state;

#[cfg(test)]
mod testing;
