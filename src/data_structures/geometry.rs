//! Vertex storage: one vertex array object plus the buffer it reads from.

use anyhow::Result;

use crate::{context::Gl, error::GfxError};

/// Position, texture coordinate and normal: the layout OBJ meshes are expanded to.
pub const OBJ_LAYOUT: [u32; 3] = [3, 2, 3];

const FLOAT_SIZE: u32 = std::mem::size_of::<f32>() as u32;

/// A vertex buffer together with the attribute layout used to read it.
///
/// The layout is a list of float groups, one per attribute slot. Slot `i` reads
/// `layout[i]` floats starting right after the floats of slot `i - 1`. The vertex
/// count is derived from the uploaded data and the layout and is kept in sync
/// whenever either changes.
#[derive(Debug)]
pub struct GeometryBuffer<G: Gl> {
    vertex_array: G::VertexArray,
    buffer: G::Buffer,
    layout: Vec<u32>,
    stride: u32,
    length: usize,
    vertices: usize,
}

impl<G: Gl> GeometryBuffer<G> {
    pub fn new(gl: &G) -> Result<Self> {
        let vertex_array = gl.create_vertex_array().map_err(|reason| GfxError::Create {
            what: "vertex array",
            reason,
        })?;
        let buffer = match gl.create_buffer() {
            Ok(buffer) => buffer,
            Err(reason) => {
                gl.delete_vertex_array(vertex_array);
                return Err(GfxError::Create {
                    what: "vertex buffer",
                    reason,
                }
                .into());
            }
        };

        Ok(Self {
            vertex_array,
            buffer,
            layout: Vec::new(),
            stride: 0,
            length: 0,
            vertices: 0,
        })
    }

    /// Declares the attribute layout, replacing any previous one.
    ///
    /// Slots of the previous layout that the new one no longer uses are disabled.
    pub fn vertex_layout(&mut self, gl: &G, layout: &[u32]) -> &mut Self {
        let previous = self.layout.len();
        self.layout = layout.to_vec();
        self.stride = layout.iter().sum();
        let stride_bytes = (self.stride * FLOAT_SIZE) as i32;

        self.bind(gl);
        let mut offset = 0;
        for (slot, size) in layout.iter().enumerate() {
            gl.vertex_attrib_pointer_f32(slot as u32, *size as i32, stride_bytes, offset);
            gl.enable_vertex_attrib_array(slot as u32);
            offset += (*size * FLOAT_SIZE) as i32;
        }
        for slot in layout.len()..previous {
            gl.disable_vertex_attrib_array(slot as u32);
        }
        self.unbind(gl);

        self.recount();
        self
    }

    /// Uploads a flat float sequence, replacing the previous contents.
    pub fn vertex_data(&mut self, gl: &G, data: &[f32]) -> &mut Self {
        self.length = data.len();
        self.bind(gl);
        gl.upload_array_buffer(bytemuck::cast_slice(data));
        self.unbind(gl);
        self.recount();
        self
    }

    /// Draws every vertex as a triangle list. Does nothing while there are no vertices.
    pub fn draw(&self, gl: &G) {
        if self.vertices == 0 {
            return;
        }
        self.bind(gl);
        gl.draw_triangles(0, self.vertices as i32);
        self.unbind(gl);
    }

    /// Releases the GPU objects.
    pub fn free(self, gl: &G) {
        gl.delete_buffer(self.buffer);
        gl.delete_vertex_array(self.vertex_array);
    }

    pub fn layout(&self) -> &[u32] {
        &self.layout
    }

    /// Floats per vertex.
    pub fn stride(&self) -> u32 {
        self.stride
    }

    pub fn stride_bytes(&self) -> u32 {
        self.stride * FLOAT_SIZE
    }

    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.vertices == 0
    }

    pub fn vertices(&self) -> usize {
        self.vertices
    }

    fn recount(&mut self) {
        self.vertices = match self.stride {
            0 => 0,
            stride => self.length / stride as usize,
        };
    }

    fn bind(&self, gl: &G) {
        gl.bind_vertex_array(Some(self.vertex_array));
        gl.bind_array_buffer(Some(self.buffer));
    }

    fn unbind(&self, gl: &G) {
        gl.bind_array_buffer(None);
        gl.bind_vertex_array(None);
    }
}
