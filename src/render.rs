//! Draw-call composition.
//!
//! The [`Renderer`] pairs a [`Mesh`] with a [`Material`] per draw call and owns
//! the little global state the demo touches: the clear colour and depth testing.

use crate::{
    context::Gl,
    data_structures::{material::Material, mesh::Mesh},
};

#[derive(Debug, Default)]
pub struct Renderer {
    depth_test: bool,
    draws: usize,
}

impl Renderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears colour and depth of the bound frame buffer.
    pub fn clear<G: Gl>(&self, gl: &G, colour: [f32; 4]) {
        gl.clear(colour);
    }

    pub fn depth_testing<G: Gl>(&mut self, gl: &G, enabled: bool) {
        gl.set_depth_test(enabled);
        self.depth_test = enabled;
    }

    pub fn is_depth_testing(&self) -> bool {
        self.depth_test
    }

    /// Draws `mesh` with `material`'s program and texture.
    pub fn draw<G: Gl>(&mut self, gl: &G, mesh: &Mesh<G>, material: &Material<G>) {
        if mesh.vertices() == 0 {
            log::warn!("you attempted to draw the empty mesh {}", mesh.name);
            return;
        }
        material.bind(gl);
        mesh.draw(gl);
        material.unbind(gl);
        self.draws += 1;
    }

    /// Draw calls issued so far.
    pub fn draws(&self) -> usize {
        self.draws
    }
}
