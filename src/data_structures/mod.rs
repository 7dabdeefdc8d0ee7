//! Graphics objects: thin owners of one GPU resource each.
//!
//! - `geometry` is a vertex buffer plus its attribute layout
//! - `shader` holds compiled stages and linked programs with cached uniforms
//! - `texture` is a 2D image, optionally streamed in from a file
//! - `mesh` is geometry loaded from OBJ files
//! - `material` is a program with the standard transform/colour uniforms and an optional texture

pub mod geometry;
pub mod material;
pub mod mesh;
pub mod shader;
pub mod texture;
