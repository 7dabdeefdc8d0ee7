//! Shader stages and linked programs.
//!
//! A [`ShaderStage`] is one compiled unit of GLSL. A [`ShaderProgram`] joins
//! stages and links them. At link time the program's active uniforms are
//! collected into a name table, so every `set_*` call is a map lookup and a
//! name the program does not expose is reported instead of silently ignored.

use std::collections::HashMap;

use anyhow::Result;

use crate::{
    context::{Gl, StageKind, UniformKind},
    error::GfxError,
};

/// One compiled shader stage.
#[derive(Debug)]
pub struct ShaderStage<G: Gl> {
    shader: G::Shader,
    kind: StageKind,
}

impl<G: Gl> ShaderStage<G> {
    /// Compiles `source` as a stage of `kind`.
    ///
    /// On a compile error the stage is deleted and the driver's info log is
    /// returned inside [`GfxError::Compile`].
    pub fn new(gl: &G, kind: StageKind, source: &str) -> Result<Self> {
        let shader = gl.create_shader(kind).map_err(|reason| GfxError::Create {
            what: "shader stage",
            reason,
        })?;
        gl.compile_shader(shader, source);
        if !gl.shader_compile_status(shader) {
            let log = gl.shader_info_log(shader);
            gl.delete_shader(shader);
            return Err(GfxError::Compile { stage: kind, log }.into());
        }
        Ok(Self { shader, kind })
    }

    pub fn kind(&self) -> StageKind {
        self.kind
    }

    pub fn free(self, gl: &G) {
        gl.delete_shader(self.shader);
    }
}

/// A cached uniform slot of a linked program.
#[derive(Clone, Debug)]
pub struct Uniform<L> {
    pub location: L,
    pub kind: UniformKind,
    /// Array length, 1 for plain uniforms.
    pub size: i32,
}

/// A program made of joined stages.
#[derive(Debug)]
pub struct ShaderProgram<G: Gl> {
    program: G::Program,
    stages: Vec<ShaderStage<G>>,
    linked: bool,
    uniforms: HashMap<String, Uniform<G::UniformLocation>>,
}

impl<G: Gl> ShaderProgram<G> {
    pub fn new(gl: &G) -> Result<Self> {
        let program = gl.create_program().map_err(|reason| GfxError::Create {
            what: "program",
            reason,
        })?;
        Ok(Self {
            program,
            stages: Vec::new(),
            linked: false,
            uniforms: HashMap::new(),
        })
    }

    /// Attaches a compiled stage. The program owns the stage from here on.
    pub fn join(&mut self, gl: &G, stage: ShaderStage<G>) -> &mut Self {
        gl.attach_shader(self.program, stage.shader);
        self.stages.push(stage);
        self
    }

    /// Links the joined stages and caches the active uniforms by name.
    pub fn link(&mut self, gl: &G) -> Result<&mut Self> {
        gl.link_program(self.program);
        self.linked = gl.program_link_status(self.program);
        if !self.linked {
            let log = gl.program_info_log(self.program);
            return Err(GfxError::Link { log }.into());
        }

        self.uniforms.clear();
        for active in gl.active_uniforms(self.program) {
            // Arrays are reported as `name[0]`; they are addressed by their base name.
            let name = active
                .name
                .strip_suffix("[0]")
                .unwrap_or(&active.name)
                .to_string();
            match gl.uniform_location(self.program, &active.name) {
                Some(location) => {
                    self.uniforms.insert(
                        name,
                        Uniform {
                            location,
                            kind: active.kind,
                            size: active.size,
                        },
                    );
                }
                // Uniform block members have no standalone location.
                None => log::debug!("active uniform {} has no location", active.name),
            }
        }
        log::debug!(
            "linked program with {} stages and {} uniforms",
            self.stages.len(),
            self.uniforms.len()
        );
        Ok(self)
    }

    pub fn bind(&self, gl: &G) -> &Self {
        gl.use_program(Some(self.program));
        self
    }

    pub fn unbind(&self, gl: &G) -> &Self {
        gl.use_program(None);
        self
    }

    pub fn is_linked(&self) -> bool {
        self.linked
    }

    pub fn has_uniform(&self, name: &str) -> bool {
        self.uniforms.contains_key(name)
    }

    pub fn uniform(&self, name: &str) -> Option<&Uniform<G::UniformLocation>> {
        self.uniforms.get(name)
    }

    pub fn uniform_names(&self) -> impl Iterator<Item = &str> {
        self.uniforms.keys().map(String::as_str)
    }

    /// Integer or sampler uniform (texture units are set this way).
    pub fn set_1i(&mut self, gl: &G, name: &str, x: i32) -> Result<&mut Self> {
        let location = self.location(name, UniformKind::Int)?;
        gl.uniform_1_i32(location, x);
        Ok(self)
    }

    pub fn set_1f(&mut self, gl: &G, name: &str, x: f32) -> Result<&mut Self> {
        let location = self.location(name, UniformKind::Float)?;
        gl.uniform_1_f32(location, x);
        Ok(self)
    }

    pub fn set_2f(&mut self, gl: &G, name: &str, x: f32, y: f32) -> Result<&mut Self> {
        let location = self.location(name, UniformKind::Vec2)?;
        gl.uniform_2_f32(location, x, y);
        Ok(self)
    }

    pub fn set_3f(&mut self, gl: &G, name: &str, x: f32, y: f32, z: f32) -> Result<&mut Self> {
        let location = self.location(name, UniformKind::Vec3)?;
        gl.uniform_3_f32(location, x, y, z);
        Ok(self)
    }

    pub fn set_4f(
        &mut self,
        gl: &G,
        name: &str,
        x: f32,
        y: f32,
        z: f32,
        w: f32,
    ) -> Result<&mut Self> {
        let location = self.location(name, UniformKind::Vec4)?;
        gl.uniform_4_f32(location, x, y, z, w);
        Ok(self)
    }

    /// Column-major 4x4 matrix.
    pub fn set_4x4f(&mut self, gl: &G, name: &str, matrix: &[f32; 16]) -> Result<&mut Self> {
        let location = self.location(name, UniformKind::Mat4)?;
        gl.uniform_matrix_4_f32(location, matrix);
        Ok(self)
    }

    /// Deletes the program together with its stages.
    pub fn free(self, gl: &G) {
        gl.delete_program(self.program);
        for stage in self.stages {
            stage.free(gl);
        }
    }

    fn location(&self, name: &str, written: UniformKind) -> Result<&G::UniformLocation> {
        let uniform = self
            .uniforms
            .get(name)
            .ok_or_else(|| GfxError::UnknownUniform {
                name: name.to_string(),
            })?;
        if !uniform.kind.accepts(written) {
            return Err(GfxError::UniformKind {
                name: name.to_string(),
                declared: uniform.kind,
                written,
            }
            .into());
        }
        Ok(&uniform.location)
    }
}
