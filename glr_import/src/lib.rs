//! Importer for GLR scene rips of Nintendo 64 games.
//!
//! A GLR file is a flat list of triangles, each carrying the RDP pipeline state it was
//! drawn with. Importing a file goes through these steps:
//! - [read_scene_file] parses and validates the file into a [SceneModel].
//! - [TriangleFilter] removes triangles by the texture bound to unit 0.
//! - [GeometryBuilder] flattens triangles into [MeshBuffers] with per-corner colors and UVs.
//! - [synthesize] turns each distinct [MaterialKey] into a [Material] whose shading graph
//!   approximates the color combiner and blender.
//! - [ImportSession::import_file] ties these together and links an [ImportedScene] into a
//!   [SceneSink].
//!
//! Materials and texture images are shared by every file imported through the same
//! [ImportSession]. [import_batch] imports several files and reports failures per file.

#![warn(missing_docs, missing_debug_implementations, rust_2018_idioms)]

pub use assemble::*;
pub use config::*;
pub use error::*;
pub use filter::*;
pub use format::*;
pub use geometry::*;
pub use material::*;
pub use scene::*;
pub use session::*;

mod assemble;
mod config;
mod error;
mod filter;
mod format;
mod geometry;
mod material;
mod scene;
mod session;
#[cfg(test)]
mod test_util;
