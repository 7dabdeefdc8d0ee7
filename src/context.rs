//! The graphics context seam.
//!
//! [`Gl`] is the narrow slice of a WebGL2-style context that the object
//! wrappers in [`crate::data_structures`] and the [`crate::render::Renderer`]
//! actually use. Handles are associated types so the same wrapper code runs on
//! top of [`glow::Context`] (WebGL2 in the browser, desktop GL natively) and on
//! the recording context the test-suite uses.

use std::fmt::Debug;

use glow::HasContext;

/// Which programmable stage a shader source compiles to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StageKind {
    Vertex,
    Fragment,
}

/// Shape of an active uniform as reported by the linked program.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UniformKind {
    Int,
    Bool,
    Sampler2D,
    Float,
    Vec2,
    Vec3,
    Vec4,
    Mat4,
    Other(u32),
}

impl UniformKind {
    pub fn from_gl(utype: u32) -> Self {
        match utype {
            glow::INT => Self::Int,
            glow::BOOL => Self::Bool,
            glow::SAMPLER_2D => Self::Sampler2D,
            glow::FLOAT => Self::Float,
            glow::FLOAT_VEC2 => Self::Vec2,
            glow::FLOAT_VEC3 => Self::Vec3,
            glow::FLOAT_VEC4 => Self::Vec4,
            glow::FLOAT_MAT4 => Self::Mat4,
            other => Self::Other(other),
        }
    }

    /// Whether a value written as `written` may be stored in a uniform of this kind.
    pub fn accepts(self, written: UniformKind) -> bool {
        match written {
            Self::Int => matches!(self, Self::Int | Self::Bool | Self::Sampler2D),
            Self::Float => matches!(self, Self::Float | Self::Bool),
            other => self == other,
        }
    }
}

/// One entry of the program's active uniform list.
#[derive(Clone, Debug, PartialEq)]
pub struct ActiveUniform {
    pub name: String,
    pub size: i32,
    pub kind: UniformKind,
}

/// How texture coordinates outside `[0, 1]` are resolved.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Wrap {
    #[default]
    Repeat,
    ClampToEdge,
    MirroredRepeat,
}

/// Minification and magnification filter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Filter {
    #[default]
    Nearest,
    Linear,
}

/// Sampling state applied to a texture when its image is (re)defined.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TextureOptions {
    pub wrap: Wrap,
    pub filter: Filter,
}

/// The graphics-context operations the wrapper is built on.
///
/// All calls act on the context's current binding state, exactly like the
/// underlying API: `upload_array_buffer` writes to whatever buffer was bound
/// with `bind_array_buffer`, `tex_image_2d_rgba` to the bound 2D texture and so
/// on. Only object creation can fail.
pub trait Gl {
    type Buffer: Copy + Debug;
    type VertexArray: Copy + Debug;
    type Shader: Copy + Debug;
    type Program: Copy + Debug;
    type Texture: Copy + Debug;
    type UniformLocation: Clone + Debug;

    fn create_vertex_array(&self) -> Result<Self::VertexArray, String>;
    fn delete_vertex_array(&self, vertex_array: Self::VertexArray);
    fn bind_vertex_array(&self, vertex_array: Option<Self::VertexArray>);

    fn create_buffer(&self) -> Result<Self::Buffer, String>;
    fn delete_buffer(&self, buffer: Self::Buffer);
    fn bind_array_buffer(&self, buffer: Option<Self::Buffer>);
    /// Replaces the contents of the bound array buffer (static usage).
    fn upload_array_buffer(&self, data: &[u8]);
    /// Describes attribute `index` as `size` floats at byte `offset` within a vertex of `stride` bytes.
    fn vertex_attrib_pointer_f32(&self, index: u32, size: i32, stride: i32, offset: i32);
    fn enable_vertex_attrib_array(&self, index: u32);
    fn disable_vertex_attrib_array(&self, index: u32);
    fn draw_triangles(&self, first: i32, count: i32);

    fn create_shader(&self, stage: StageKind) -> Result<Self::Shader, String>;
    /// Sets the source of `shader` and compiles it.
    fn compile_shader(&self, shader: Self::Shader, source: &str);
    fn shader_compile_status(&self, shader: Self::Shader) -> bool;
    fn shader_info_log(&self, shader: Self::Shader) -> String;
    fn delete_shader(&self, shader: Self::Shader);

    fn create_program(&self) -> Result<Self::Program, String>;
    fn attach_shader(&self, program: Self::Program, shader: Self::Shader);
    fn link_program(&self, program: Self::Program);
    fn program_link_status(&self, program: Self::Program) -> bool;
    fn program_info_log(&self, program: Self::Program) -> String;
    fn delete_program(&self, program: Self::Program);
    fn use_program(&self, program: Option<Self::Program>);
    fn active_uniforms(&self, program: Self::Program) -> Vec<ActiveUniform>;
    fn uniform_location(&self, program: Self::Program, name: &str)
    -> Option<Self::UniformLocation>;

    fn uniform_1_i32(&self, location: &Self::UniformLocation, x: i32);
    fn uniform_1_f32(&self, location: &Self::UniformLocation, x: f32);
    fn uniform_2_f32(&self, location: &Self::UniformLocation, x: f32, y: f32);
    fn uniform_3_f32(&self, location: &Self::UniformLocation, x: f32, y: f32, z: f32);
    fn uniform_4_f32(&self, location: &Self::UniformLocation, x: f32, y: f32, z: f32, w: f32);
    fn uniform_matrix_4_f32(&self, location: &Self::UniformLocation, matrix: &[f32; 16]);

    fn create_texture(&self) -> Result<Self::Texture, String>;
    fn delete_texture(&self, texture: Self::Texture);
    /// Selects texture unit `slot` (0-based) for subsequent binds.
    fn active_texture(&self, slot: u32);
    fn bind_texture_2d(&self, texture: Option<Self::Texture>);
    /// Defines the bound 2D texture's level 0 image from tightly packed RGBA8 pixels.
    fn tex_image_2d_rgba(&self, width: u32, height: u32, pixels: &[u8]);
    fn texture_sampling(&self, options: TextureOptions);

    /// Clears colour and depth of the bound frame buffer.
    fn clear(&self, colour: [f32; 4]);
    fn set_depth_test(&self, enabled: bool);
    fn viewport(&self, x: i32, y: i32, width: i32, height: i32);
}

fn wrap_to_gl(wrap: Wrap) -> i32 {
    (match wrap {
        Wrap::Repeat => glow::REPEAT,
        Wrap::ClampToEdge => glow::CLAMP_TO_EDGE,
        Wrap::MirroredRepeat => glow::MIRRORED_REPEAT,
    }) as i32
}

fn filter_to_gl(filter: Filter) -> i32 {
    (match filter {
        Filter::Nearest => glow::NEAREST,
        Filter::Linear => glow::LINEAR,
    }) as i32
}

// Every call below is a thin forward. The handles passed in were created by this
// same context, which is the only requirement glow places on these calls.
impl Gl for glow::Context {
    type Buffer = <glow::Context as HasContext>::Buffer;
    type VertexArray = <glow::Context as HasContext>::VertexArray;
    type Shader = <glow::Context as HasContext>::Shader;
    type Program = <glow::Context as HasContext>::Program;
    type Texture = <glow::Context as HasContext>::Texture;
    type UniformLocation = <glow::Context as HasContext>::UniformLocation;

    fn create_vertex_array(&self) -> Result<Self::VertexArray, String> {
        unsafe { HasContext::create_vertex_array(self) }
    }

    fn delete_vertex_array(&self, vertex_array: Self::VertexArray) {
        unsafe { HasContext::delete_vertex_array(self, vertex_array) }
    }

    fn bind_vertex_array(&self, vertex_array: Option<Self::VertexArray>) {
        unsafe { HasContext::bind_vertex_array(self, vertex_array) }
    }

    fn create_buffer(&self) -> Result<Self::Buffer, String> {
        unsafe { HasContext::create_buffer(self) }
    }

    fn delete_buffer(&self, buffer: Self::Buffer) {
        unsafe { HasContext::delete_buffer(self, buffer) }
    }

    fn bind_array_buffer(&self, buffer: Option<Self::Buffer>) {
        unsafe { HasContext::bind_buffer(self, glow::ARRAY_BUFFER, buffer) }
    }

    fn upload_array_buffer(&self, data: &[u8]) {
        unsafe {
            HasContext::buffer_data_u8_slice(self, glow::ARRAY_BUFFER, data, glow::STATIC_DRAW)
        }
    }

    fn vertex_attrib_pointer_f32(&self, index: u32, size: i32, stride: i32, offset: i32) {
        unsafe {
            HasContext::vertex_attrib_pointer_f32(
                self,
                index,
                size,
                glow::FLOAT,
                false,
                stride,
                offset,
            )
        }
    }

    fn enable_vertex_attrib_array(&self, index: u32) {
        unsafe { HasContext::enable_vertex_attrib_array(self, index) }
    }

    fn disable_vertex_attrib_array(&self, index: u32) {
        unsafe { HasContext::disable_vertex_attrib_array(self, index) }
    }

    fn draw_triangles(&self, first: i32, count: i32) {
        unsafe { HasContext::draw_arrays(self, glow::TRIANGLES, first, count) }
    }

    fn create_shader(&self, stage: StageKind) -> Result<Self::Shader, String> {
        let shader_type = match stage {
            StageKind::Vertex => glow::VERTEX_SHADER,
            StageKind::Fragment => glow::FRAGMENT_SHADER,
        };
        unsafe { HasContext::create_shader(self, shader_type) }
    }

    fn compile_shader(&self, shader: Self::Shader, source: &str) {
        unsafe {
            HasContext::shader_source(self, shader, source);
            HasContext::compile_shader(self, shader);
        }
    }

    fn shader_compile_status(&self, shader: Self::Shader) -> bool {
        unsafe { HasContext::get_shader_compile_status(self, shader) }
    }

    fn shader_info_log(&self, shader: Self::Shader) -> String {
        unsafe { HasContext::get_shader_info_log(self, shader) }
    }

    fn delete_shader(&self, shader: Self::Shader) {
        unsafe { HasContext::delete_shader(self, shader) }
    }

    fn create_program(&self) -> Result<Self::Program, String> {
        unsafe { HasContext::create_program(self) }
    }

    fn attach_shader(&self, program: Self::Program, shader: Self::Shader) {
        unsafe { HasContext::attach_shader(self, program, shader) }
    }

    fn link_program(&self, program: Self::Program) {
        unsafe { HasContext::link_program(self, program) }
    }

    fn program_link_status(&self, program: Self::Program) -> bool {
        unsafe { HasContext::get_program_link_status(self, program) }
    }

    fn program_info_log(&self, program: Self::Program) -> String {
        unsafe { HasContext::get_program_info_log(self, program) }
    }

    fn delete_program(&self, program: Self::Program) {
        unsafe { HasContext::delete_program(self, program) }
    }

    fn use_program(&self, program: Option<Self::Program>) {
        unsafe { HasContext::use_program(self, program) }
    }

    fn active_uniforms(&self, program: Self::Program) -> Vec<ActiveUniform> {
        unsafe {
            let count = HasContext::get_active_uniforms(self, program);
            (0..count)
                .filter_map(|index| HasContext::get_active_uniform(self, program, index))
                .map(|uniform| ActiveUniform {
                    name: uniform.name,
                    size: uniform.size,
                    kind: UniformKind::from_gl(uniform.utype),
                })
                .collect()
        }
    }

    fn uniform_location(
        &self,
        program: Self::Program,
        name: &str,
    ) -> Option<Self::UniformLocation> {
        unsafe { HasContext::get_uniform_location(self, program, name) }
    }

    fn uniform_1_i32(&self, location: &Self::UniformLocation, x: i32) {
        unsafe { HasContext::uniform_1_i32(self, Some(location), x) }
    }

    fn uniform_1_f32(&self, location: &Self::UniformLocation, x: f32) {
        unsafe { HasContext::uniform_1_f32(self, Some(location), x) }
    }

    fn uniform_2_f32(&self, location: &Self::UniformLocation, x: f32, y: f32) {
        unsafe { HasContext::uniform_2_f32(self, Some(location), x, y) }
    }

    fn uniform_3_f32(&self, location: &Self::UniformLocation, x: f32, y: f32, z: f32) {
        unsafe { HasContext::uniform_3_f32(self, Some(location), x, y, z) }
    }

    fn uniform_4_f32(&self, location: &Self::UniformLocation, x: f32, y: f32, z: f32, w: f32) {
        unsafe { HasContext::uniform_4_f32(self, Some(location), x, y, z, w) }
    }

    fn uniform_matrix_4_f32(&self, location: &Self::UniformLocation, matrix: &[f32; 16]) {
        unsafe { HasContext::uniform_matrix_4_f32_slice(self, Some(location), false, matrix) }
    }

    fn create_texture(&self) -> Result<Self::Texture, String> {
        unsafe { HasContext::create_texture(self) }
    }

    fn delete_texture(&self, texture: Self::Texture) {
        unsafe { HasContext::delete_texture(self, texture) }
    }

    fn active_texture(&self, slot: u32) {
        unsafe { HasContext::active_texture(self, glow::TEXTURE0 + slot) }
    }

    fn bind_texture_2d(&self, texture: Option<Self::Texture>) {
        unsafe { HasContext::bind_texture(self, glow::TEXTURE_2D, texture) }
    }

    fn tex_image_2d_rgba(&self, width: u32, height: u32, pixels: &[u8]) {
        unsafe {
            HasContext::tex_image_2d(
                self,
                glow::TEXTURE_2D,
                0,
                glow::RGBA as i32,
                width as i32,
                height as i32,
                0,
                glow::RGBA,
                glow::UNSIGNED_BYTE,
                glow::PixelUnpackData::Slice(Some(pixels)),
            )
        }
    }

    fn texture_sampling(&self, options: TextureOptions) {
        let wrap = wrap_to_gl(options.wrap);
        let filter = filter_to_gl(options.filter);
        unsafe {
            HasContext::tex_parameter_i32(self, glow::TEXTURE_2D, glow::TEXTURE_WRAP_S, wrap);
            HasContext::tex_parameter_i32(self, glow::TEXTURE_2D, glow::TEXTURE_WRAP_T, wrap);
            HasContext::tex_parameter_i32(self, glow::TEXTURE_2D, glow::TEXTURE_MIN_FILTER, filter);
            HasContext::tex_parameter_i32(self, glow::TEXTURE_2D, glow::TEXTURE_MAG_FILTER, filter);
        }
    }

    fn clear(&self, colour: [f32; 4]) {
        let [r, g, b, a] = colour;
        unsafe {
            HasContext::clear_color(self, r, g, b, a);
            HasContext::clear(self, glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT);
        }
    }

    fn set_depth_test(&self, enabled: bool) {
        unsafe {
            if enabled {
                HasContext::enable(self, glow::DEPTH_TEST);
            } else {
                HasContext::disable(self, glow::DEPTH_TEST);
            }
        }
    }

    fn viewport(&self, x: i32, y: i32, width: i32, height: i32) {
        unsafe { HasContext::viewport(self, x, y, width, height) }
    }
}
