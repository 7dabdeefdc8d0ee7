//! Materials: a shader program built from two user functions plus the
//! standard transform and colour uniforms every mesh draw uses.
//!
//! The vertex code must define `vec4 vertex()` and the fragment code
//! `vec4 shader()`. Both are pasted into a GLSL ES 3.00 prelude that declares:
//!
//! - attributes `a_Position` (slot 0), `a_TexCoord` (slot 1), `a_Normal` (slot 2)
//! - uniforms `u_Projection`, `u_View`, `u_Model`, `u_Color`, `u_Texture`
//! - the varying `v_TexCoord`
//!
//! Uniforms the user code never reads are removed by the shader compiler; the
//! setters here skip those instead of failing.

use anyhow::Result;

use crate::{
    context::{Gl, StageKind},
    data_structures::{
        shader::{ShaderProgram, ShaderStage},
        texture::Texture,
    },
};

const VERTEX_PRELUDE: &str = "#version 300 es
precision highp float;
layout(location = 0) in vec3 a_Position;
layout(location = 1) in vec2 a_TexCoord;
layout(location = 2) in vec3 a_Normal;
uniform mat4 u_Projection;
uniform mat4 u_View;
uniform mat4 u_Model;
out vec2 v_TexCoord;
";

const VERTEX_MAIN: &str = "
void main() {
    v_TexCoord = a_TexCoord;
    gl_Position = vertex();
}
";

const FRAGMENT_PRELUDE: &str = "#version 300 es
precision mediump float;
uniform vec4 u_Color;
uniform sampler2D u_Texture;
in vec2 v_TexCoord;
out vec4 o_Color;
";

const FRAGMENT_MAIN: &str = "
void main() {
    o_Color = shader();
}
";

/// Vertex function used when a material is created without one.
pub const DEFAULT_VERTEX: &str = "
vec4 vertex() {
    return u_Projection * u_View * u_Model * vec4(a_Position, 1.0);
}
";

/// Fragment function used when a material is created without one.
pub const DEFAULT_FRAGMENT: &str = "
vec4 shader() {
    return u_Color * texture(u_Texture, v_TexCoord);
}
";

/// Directional lighting with a fixed light, tinted by `u_Color`.
pub mod lit {
    pub const VERTEX: &str = "
out float v_Brightness;
vec4 vertex() {
    vec3 lightDirection = normalize(vec3(1.0, -1.0, -1.0));
    vec4 worldPoint = u_Model * vec4(a_Position, 1.0);
    vec4 worldPointPlusNormal = u_Model * vec4(a_Position + normalize(a_Normal), 1.0);
    v_Brightness = -dot(normalize(worldPointPlusNormal.xyz - worldPoint.xyz), lightDirection);
    return u_Projection * u_View * worldPoint;
}
";

    pub const FRAGMENT: &str = "
in float v_Brightness;
vec4 shader() {
    return vec4(u_Color.rgb * vec3(v_Brightness), 1.0);
}
";

    /// Same light, modulated by `u_Texture`.
    pub const TEXTURED_FRAGMENT: &str = "
in float v_Brightness;
vec4 shader() {
    vec3 albedo = u_Color.rgb * texture(u_Texture, v_TexCoord).rgb;
    return vec4(albedo * vec3(v_Brightness), 1.0);
}
";
}

pub fn vertex_source(body: &str) -> String {
    format!("{VERTEX_PRELUDE}{body}{VERTEX_MAIN}")
}

pub fn fragment_source(body: &str) -> String {
    format!("{FRAGMENT_PRELUDE}{body}{FRAGMENT_MAIN}")
}

#[derive(Debug)]
pub struct Material<G: Gl> {
    program: ShaderProgram<G>,
    texture: Option<Texture<G>>,
}

impl<G: Gl> Material<G> {
    /// Compiles and links a material. `None` picks the default function for that stage.
    pub fn new(gl: &G, vertex: Option<&str>, fragment: Option<&str>) -> Result<Self> {
        let vertex = ShaderStage::new(
            gl,
            StageKind::Vertex,
            &vertex_source(vertex.unwrap_or(DEFAULT_VERTEX)),
        )?;
        let fragment = match ShaderStage::new(
            gl,
            StageKind::Fragment,
            &fragment_source(fragment.unwrap_or(DEFAULT_FRAGMENT)),
        ) {
            Ok(fragment) => fragment,
            Err(e) => {
                vertex.free(gl);
                return Err(e);
            }
        };

        let mut program = match ShaderProgram::new(gl) {
            Ok(program) => program,
            Err(e) => {
                vertex.free(gl);
                fragment.free(gl);
                return Err(e);
            }
        };
        program.join(gl, vertex).join(gl, fragment);
        let linked = program.link(gl).map(|_| ());
        if let Err(e) = linked {
            program.free(gl);
            return Err(e);
        }

        let mut material = Self {
            program,
            texture: None,
        };
        if let Err(e) = material.reset_uniforms(gl) {
            material.free(gl);
            return Err(e);
        }
        Ok(material)
    }

    fn reset_uniforms(&mut self, gl: &G) -> Result<()> {
        self.set_projection(gl, &crate::math::IDENTITY)?;
        self.set_view(gl, &crate::math::IDENTITY)?;
        self.set_model(gl, &crate::math::IDENTITY)?;
        self.set_color(gl, [1.0; 4])
    }

    /// The directional-light material the demo scene is drawn with.
    pub fn lit(gl: &G) -> Result<Self> {
        Self::new(gl, Some(lit::VERTEX), Some(lit::FRAGMENT))
    }

    pub fn set_projection(&mut self, gl: &G, matrix: &[f32; 16]) -> Result<()> {
        self.set_matrix(gl, "u_Projection", matrix)
    }

    pub fn set_view(&mut self, gl: &G, matrix: &[f32; 16]) -> Result<()> {
        self.set_matrix(gl, "u_View", matrix)
    }

    pub fn set_model(&mut self, gl: &G, matrix: &[f32; 16]) -> Result<()> {
        self.set_matrix(gl, "u_Model", matrix)
    }

    pub fn set_color(&mut self, gl: &G, [r, g, b, a]: [f32; 4]) -> Result<()> {
        if self.program.has_uniform("u_Color") {
            self.program.bind(gl);
            self.program.set_4f(gl, "u_Color", r, g, b, a)?;
        }
        Ok(())
    }

    /// Samples `texture` from unit 0, replacing (and freeing) the previous one.
    pub fn set_texture(&mut self, gl: &G, texture: Texture<G>) -> Result<()> {
        if self.program.has_uniform("u_Texture") {
            self.program.bind(gl);
            self.program.set_1i(gl, "u_Texture", 0)?;
        }
        if let Some(old) = self.texture.replace(texture) {
            old.free(gl);
        }
        Ok(())
    }

    pub fn texture(&self) -> Option<&Texture<G>> {
        self.texture.as_ref()
    }

    pub fn program(&self) -> &ShaderProgram<G> {
        &self.program
    }

    /// Lets direct access set uniforms declared by custom material code.
    pub fn program_mut(&mut self) -> &mut ShaderProgram<G> {
        &mut self.program
    }

    /// Swaps in a texture image that finished loading.
    pub fn poll(&mut self, gl: &G) {
        if let Some(texture) = self.texture.as_mut() {
            texture.poll(gl);
        }
    }

    pub fn bind(&self, gl: &G) {
        self.program.bind(gl);
        if let Some(texture) = &self.texture {
            texture.bind(gl, 0);
        }
    }

    pub fn unbind(&self, gl: &G) {
        self.program.unbind(gl);
    }

    pub fn free(self, gl: &G) {
        self.program.free(gl);
        if let Some(texture) = self.texture {
            texture.free(gl);
        }
    }

    fn set_matrix(&mut self, gl: &G, name: &str, matrix: &[f32; 16]) -> Result<()> {
        if self.program.has_uniform(name) {
            self.program.bind(gl);
            self.program.set_4x4f(gl, name, matrix)?;
        }
        Ok(())
    }
}
