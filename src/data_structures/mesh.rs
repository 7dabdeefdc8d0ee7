//! Meshes loaded from Wavefront OBJ files.

use anyhow::Result;

use crate::{
    context::Gl,
    data_structures::geometry::{GeometryBuffer, OBJ_LAYOUT},
    resources::{self, mesh},
};

/// A named geometry buffer in the `[3, 2, 3]` OBJ layout.
#[derive(Debug)]
pub struct Mesh<G: Gl> {
    pub name: String,
    pub geometry: GeometryBuffer<G>,
}

impl<G: Gl> Mesh<G> {
    /// Builds a mesh from already interleaved `[3, 2, 3]` vertex data.
    pub fn from_vertices(gl: &G, name: &str, vertices: &[f32]) -> Result<Self> {
        let mut geometry = GeometryBuffer::new(gl)?;
        geometry
            .vertex_layout(gl, &OBJ_LAYOUT)
            .vertex_data(gl, vertices);
        log::debug!("mesh {} holds {} vertices", name, geometry.vertices());
        Ok(Self {
            name: name.to_string(),
            geometry,
        })
    }

    pub fn from_obj_str(gl: &G, name: &str, obj_text: &str) -> Result<Self> {
        let models = mesh::parse_obj(obj_text)?;
        Self::from_vertices(gl, name, &mesh::interleave(&models))
    }

    /// Fetches and uploads an OBJ file.
    pub async fn from_obj(gl: &G, file_name: &str) -> Result<Self> {
        let models = mesh::load_obj(file_name).await?;
        Self::from_vertices(gl, file_name, &mesh::interleave(&models))
    }

    /// Like [`from_obj`](Self::from_obj), falling back to the built-in copy of the
    /// file when the fetch fails.
    pub async fn from_obj_or_builtin(gl: &G, file_name: &str) -> Result<Self> {
        match mesh::load_obj(file_name).await {
            Ok(models) => Self::from_vertices(gl, file_name, &mesh::interleave(&models)),
            Err(e) => match resources::builtin::obj(file_name) {
                Some(text) => {
                    log::warn!("{} could not be loaded ({:#}), using the built-in mesh", file_name, e);
                    Self::from_obj_str(gl, file_name, text)
                }
                None => Err(e),
            },
        }
    }

    pub fn draw(&self, gl: &G) {
        self.geometry.draw(gl);
    }

    pub fn vertices(&self) -> usize {
        self.geometry.vertices()
    }

    pub fn free(self, gl: &G) {
        self.geometry.free(gl);
    }
}
