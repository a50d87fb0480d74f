//! Procedural floor generation for grid-based dungeon crawlers.
//!
//! A floor starts as a coarse `grid_plan::GridPlan` filled by one of the `grid_path`
//! templates, is expanded into a tile-level `floor_plan::FloorPlan`, and is then refined by
//! the optional steps: a boss room with its vault (`boss_vault`), locked side rooms dug into
//! the rock (`detour`), and sealed boundaries around chosen rooms (`seal`).
//! `map_types::floor::FloorGenSpec` strings the whole thing together from a RON description.

pub mod boss_vault;
pub mod detour;
pub mod error;
pub mod filter;
pub mod floor_plan;
pub mod geometry;
pub mod graph;
pub mod grid_path;
pub mod grid_plan;
pub mod map_types;
pub mod room_gen;
pub mod sampling;
pub mod seal;
pub mod tags;
pub mod tile_map;

mod symmetric_map;

pub use error::{GenError, GenResult};
