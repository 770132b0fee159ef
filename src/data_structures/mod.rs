//! Engine data structures: meshes, materials, textures, scene graphs, and instances.
//!
//! This module contains the core data types for scene representation:
//!
//! - `colour` converts authored sRGB / HSL colours into linear shading space
//! - `model` contains mesh and material definitions and the instanced draw helper
//! - `texture` contains GPU texture wrapper and creation utilities
//! - `instance` holds per-instance transformation data
//! - `scene_graph` enables hierarchical scene organization

pub mod colour;
pub mod instance;
pub mod model;
pub mod scene_graph;
pub mod texture;
