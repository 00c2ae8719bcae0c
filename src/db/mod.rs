//! Settings persistence.
//!
//! - `model`: the settings row as stored and the update payloads.
//! - `repo`: SQL functions over the single-row `settings` table.

pub mod model;
pub mod repo;

pub use repo::*;

pub use model::{DisplaySettingsUpdate, InventorySettingsUpdate};
