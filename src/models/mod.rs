//! Core data models for banner tracking.

mod banner;
mod endgame;
mod entity;
mod ids;

pub use banner::*;
pub use endgame::*;
pub use entity::*;
pub use ids::*;
