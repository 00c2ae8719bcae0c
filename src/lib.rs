//! Restoqit: a self-hosted household dashboard over a Grocy instance.
//!
//! The crate fetches stock, shopping lists and weather, joins them into the
//! views the dashboard shows, and keeps per-installation settings in SQLite.

pub mod aggregate;
pub mod config;
pub mod db;
pub mod inventory;
pub mod model;
pub mod overview;
pub mod weather;
