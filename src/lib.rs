//! Commander Customizer — reassigns commander voice lines and portraits.
//!
//! Reads the game's official voice mods, re-targets every audio event that a
//! chosen donor voice plays for onto a set of recipient commanders, and emits
//! one merged voice mod plus copied portraits. Audio files are never
//! duplicated: merged paths link back to the donor mods they came from.

pub mod config;
pub mod core;
pub mod schema;
