#![allow(dead_code)]

use std::{
    cell::{Cell, RefCell},
    collections::HashMap,
    path::PathBuf,
    rc::Rc,
};

use vrgl::{
    Matrix4, Vector3,
    audio::AudioSink,
    context::{ActiveUniform, Gl, StageKind, TextureOptions, UniformKind},
    flow::RenderTarget,
    math,
};

/// A uniform location of the recording context.
#[derive(Clone, Debug, PartialEq)]
pub struct MockLocation {
    pub program: u32,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq)]
pub enum UniformValue {
    Int(i32),
    Float(Vec<f32>),
    Mat4([f32; 16]),
}

/// Every call the context received, in order.
#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    CreateVertexArray(u32),
    DeleteVertexArray(u32),
    BindVertexArray(Option<u32>),
    CreateBuffer(u32),
    DeleteBuffer(u32),
    BindArrayBuffer(Option<u32>),
    UploadArrayBuffer { buffer: Option<u32>, bytes: usize },
    VertexAttribPointer { index: u32, size: i32, stride: i32, offset: i32 },
    EnableVertexAttribArray(u32),
    DisableVertexAttribArray(u32),
    DrawTriangles { vertex_array: Option<u32>, first: i32, count: i32 },
    CreateShader(u32, StageKind),
    CompileShader(u32),
    DeleteShader(u32),
    CreateProgram(u32),
    AttachShader { program: u32, shader: u32 },
    LinkProgram(u32),
    DeleteProgram(u32),
    UseProgram(Option<u32>),
    Uniform { location: MockLocation, value: UniformValue },
    CreateTexture(u32),
    DeleteTexture(u32),
    ActiveTexture(u32),
    BindTexture(Option<u32>),
    TexImage { texture: Option<u32>, width: u32, height: u32 },
    TextureSampling(TextureOptions),
    Clear([f32; 4]),
    DepthTest(bool),
    Viewport(i32, i32, i32, i32),
    BindTarget,
}

#[derive(Debug, Default)]
struct Compiled {
    source: String,
    ok: bool,
    log: String,
}

/**
 * A `Gl` implementation that records calls instead of drawing.
 *
 * Compilation fails for sources containing `#error`. Linking collects the
 * `uniform` declarations of the attached sources and, like a real driver,
 * only reports those that are referenced somewhere besides their declaration.
 */
#[derive(Debug, Default)]
pub struct MockGl {
    calls: RefCell<Vec<Call>>,
    next_id: Cell<u32>,
    shaders: RefCell<HashMap<u32, Compiled>>,
    programs: RefCell<HashMap<u32, Vec<u32>>>,
    linked: RefCell<HashMap<u32, Vec<ActiveUniform>>>,
    link_error: RefCell<Option<String>>,
    fail_textures: Cell<bool>,
    fail_programs: Cell<bool>,
    vertex_array: Cell<Option<u32>>,
    array_buffer: Cell<Option<u32>>,
    texture: Cell<Option<u32>>,
    images: RefCell<HashMap<u32, (u32, u32, Vec<u8>)>>,
}

impl MockGl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `link_program` fail with `log`.
    pub fn fail_next_link(&self, log: &str) {
        *self.link_error.borrow_mut() = Some(log.to_string());
    }

    /// Makes `create_program` fail from now on.
    pub fn fail_programs(&self) {
        self.fail_programs.set(true);
    }

    /// Makes `create_texture` fail from now on.
    pub fn fail_textures(&self) {
        self.fail_textures.set(true);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn reset_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    pub fn record(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }

    pub fn count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.calls.borrow().iter().filter(|c| predicate(c)).count()
    }

    pub fn draw_calls(&self) -> Vec<(Option<u32>, i32)> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|c| match c {
                Call::DrawTriangles {
                    vertex_array,
                    count,
                    ..
                } => Some((*vertex_array, *count)),
                _ => None,
            })
            .collect()
    }

    /// The uniform values written, by name, in order.
    pub fn uniform_writes(&self, name: &str) -> Vec<UniformValue> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|c| match c {
                Call::Uniform { location, value } if location.name == name => Some(value.clone()),
                _ => None,
            })
            .collect()
    }

    /// The image last defined for `texture`.
    pub fn image(&self, texture: u32) -> Option<(u32, u32, Vec<u8>)> {
        self.images.borrow().get(&texture).cloned()
    }

    pub fn bound_texture(&self) -> Option<u32> {
        self.texture.get()
    }

    fn next(&self) -> u32 {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        id
    }

    fn uniform(&self, location: &MockLocation, value: UniformValue) {
        self.record(Call::Uniform {
            location: location.clone(),
            value,
        });
    }
}

fn uniform_kind(glsl_type: &str) -> UniformKind {
    match glsl_type {
        "int" => UniformKind::Int,
        "bool" => UniformKind::Bool,
        "sampler2D" => UniformKind::Sampler2D,
        "float" => UniformKind::Float,
        "vec2" => UniformKind::Vec2,
        "vec3" => UniformKind::Vec3,
        "vec4" => UniformKind::Vec4,
        "mat4" => UniformKind::Mat4,
        _ => UniformKind::Other(0),
    }
}

fn references(source: &str, name: &str) -> usize {
    source
        .match_indices(name)
        .filter(|(at, _)| {
            let before = source[..*at].chars().next_back();
            let after = source[at + name.len()..].chars().next();
            let ident = |c: Option<char>| c.is_some_and(|c| c.is_alphanumeric() || c == '_');
            !ident(before) && !ident(after)
        })
        .count()
}

fn active_uniforms(source: &str) -> Vec<ActiveUniform> {
    let mut uniforms = Vec::new();
    for line in source.lines() {
        let mut words = line.split_whitespace();
        if words.next() != Some("uniform") {
            continue;
        }
        let (Some(glsl_type), Some(declared)) = (words.next(), words.next()) else {
            continue;
        };
        let declared = declared.trim_end_matches(';');
        let (name, size) = match declared.split_once('[') {
            Some((name, rest)) => (name, rest.trim_end_matches(']').parse().unwrap_or(1)),
            None => (declared, 1),
        };
        if references(source, name) < 2 {
            continue;
        }
        uniforms.push(ActiveUniform {
            name: if size > 1 {
                format!("{name}[0]")
            } else {
                name.to_string()
            },
            size,
            kind: uniform_kind(glsl_type),
        });
    }
    uniforms
}

impl Gl for MockGl {
    type Buffer = u32;
    type VertexArray = u32;
    type Shader = u32;
    type Program = u32;
    type Texture = u32;
    type UniformLocation = MockLocation;

    fn create_vertex_array(&self) -> Result<u32, String> {
        let id = self.next();
        self.record(Call::CreateVertexArray(id));
        Ok(id)
    }

    fn delete_vertex_array(&self, vertex_array: u32) {
        self.record(Call::DeleteVertexArray(vertex_array));
    }

    fn bind_vertex_array(&self, vertex_array: Option<u32>) {
        self.vertex_array.set(vertex_array);
        self.record(Call::BindVertexArray(vertex_array));
    }

    fn create_buffer(&self) -> Result<u32, String> {
        let id = self.next();
        self.record(Call::CreateBuffer(id));
        Ok(id)
    }

    fn delete_buffer(&self, buffer: u32) {
        self.record(Call::DeleteBuffer(buffer));
    }

    fn bind_array_buffer(&self, buffer: Option<u32>) {
        self.array_buffer.set(buffer);
        self.record(Call::BindArrayBuffer(buffer));
    }

    fn upload_array_buffer(&self, data: &[u8]) {
        self.record(Call::UploadArrayBuffer {
            buffer: self.array_buffer.get(),
            bytes: data.len(),
        });
    }

    fn vertex_attrib_pointer_f32(&self, index: u32, size: i32, stride: i32, offset: i32) {
        self.record(Call::VertexAttribPointer {
            index,
            size,
            stride,
            offset,
        });
    }

    fn enable_vertex_attrib_array(&self, index: u32) {
        self.record(Call::EnableVertexAttribArray(index));
    }

    fn disable_vertex_attrib_array(&self, index: u32) {
        self.record(Call::DisableVertexAttribArray(index));
    }

    fn draw_triangles(&self, first: i32, count: i32) {
        self.record(Call::DrawTriangles {
            vertex_array: self.vertex_array.get(),
            first,
            count,
        });
    }

    fn create_shader(&self, stage: StageKind) -> Result<u32, String> {
        let id = self.next();
        self.shaders.borrow_mut().insert(id, Compiled::default());
        self.record(Call::CreateShader(id, stage));
        Ok(id)
    }

    fn compile_shader(&self, shader: u32, source: &str) {
        let ok = !source.contains("#error");
        let log = if ok {
            String::new()
        } else {
            "ERROR: 0:1: '#error' : user error".to_string()
        };
        self.shaders.borrow_mut().insert(
            shader,
            Compiled {
                source: source.to_string(),
                ok,
                log,
            },
        );
        self.record(Call::CompileShader(shader));
    }

    fn shader_compile_status(&self, shader: u32) -> bool {
        self.shaders.borrow().get(&shader).is_some_and(|s| s.ok)
    }

    fn shader_info_log(&self, shader: u32) -> String {
        self.shaders
            .borrow()
            .get(&shader)
            .map(|s| s.log.clone())
            .unwrap_or_default()
    }

    fn delete_shader(&self, shader: u32) {
        self.shaders.borrow_mut().remove(&shader);
        self.record(Call::DeleteShader(shader));
    }

    fn create_program(&self) -> Result<u32, String> {
        if self.fail_programs.get() {
            return Err("out of program names".to_string());
        }
        let id = self.next();
        self.programs.borrow_mut().insert(id, Vec::new());
        self.record(Call::CreateProgram(id));
        Ok(id)
    }

    fn attach_shader(&self, program: u32, shader: u32) {
        if let Some(stages) = self.programs.borrow_mut().get_mut(&program) {
            stages.push(shader);
        }
        self.record(Call::AttachShader { program, shader });
    }

    fn link_program(&self, program: u32) {
        self.record(Call::LinkProgram(program));
        if self.link_error.borrow().is_some() {
            return;
        }
        let shaders = self.shaders.borrow();
        let source: String = self
            .programs
            .borrow()
            .get(&program)
            .into_iter()
            .flatten()
            .filter_map(|id| shaders.get(id))
            .map(|s| s.source.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        self.linked
            .borrow_mut()
            .insert(program, active_uniforms(&source));
    }

    fn program_link_status(&self, program: u32) -> bool {
        self.linked.borrow().contains_key(&program)
    }

    fn program_info_log(&self, _: u32) -> String {
        self.link_error.borrow_mut().take().unwrap_or_default()
    }

    fn delete_program(&self, program: u32) {
        self.programs.borrow_mut().remove(&program);
        self.linked.borrow_mut().remove(&program);
        self.record(Call::DeleteProgram(program));
    }

    fn use_program(&self, program: Option<u32>) {
        self.record(Call::UseProgram(program));
    }

    fn active_uniforms(&self, program: u32) -> Vec<ActiveUniform> {
        self.linked
            .borrow()
            .get(&program)
            .cloned()
            .unwrap_or_default()
    }

    fn uniform_location(&self, program: u32, name: &str) -> Option<MockLocation> {
        let linked = self.linked.borrow();
        let known = linked.get(&program)?.iter().any(|u| u.name == name);
        known.then(|| MockLocation {
            program,
            name: name.trim_end_matches("[0]").to_string(),
        })
    }

    fn uniform_1_i32(&self, location: &MockLocation, x: i32) {
        self.uniform(location, UniformValue::Int(x));
    }

    fn uniform_1_f32(&self, location: &MockLocation, x: f32) {
        self.uniform(location, UniformValue::Float(vec![x]));
    }

    fn uniform_2_f32(&self, location: &MockLocation, x: f32, y: f32) {
        self.uniform(location, UniformValue::Float(vec![x, y]));
    }

    fn uniform_3_f32(&self, location: &MockLocation, x: f32, y: f32, z: f32) {
        self.uniform(location, UniformValue::Float(vec![x, y, z]));
    }

    fn uniform_4_f32(&self, location: &MockLocation, x: f32, y: f32, z: f32, w: f32) {
        self.uniform(location, UniformValue::Float(vec![x, y, z, w]));
    }

    fn uniform_matrix_4_f32(&self, location: &MockLocation, matrix: &[f32; 16]) {
        self.uniform(location, UniformValue::Mat4(*matrix));
    }

    fn create_texture(&self) -> Result<u32, String> {
        if self.fail_textures.get() {
            return Err("out of texture names".to_string());
        }
        let id = self.next();
        self.record(Call::CreateTexture(id));
        Ok(id)
    }

    fn delete_texture(&self, texture: u32) {
        self.images.borrow_mut().remove(&texture);
        self.record(Call::DeleteTexture(texture));
    }

    fn active_texture(&self, slot: u32) {
        self.record(Call::ActiveTexture(slot));
    }

    fn bind_texture_2d(&self, texture: Option<u32>) {
        self.texture.set(texture);
        self.record(Call::BindTexture(texture));
    }

    fn tex_image_2d_rgba(&self, width: u32, height: u32, pixels: &[u8]) {
        let texture = self.texture.get();
        if let Some(id) = texture {
            self.images
                .borrow_mut()
                .insert(id, (width, height, pixels.to_vec()));
        }
        self.record(Call::TexImage {
            texture,
            width,
            height,
        });
    }

    fn texture_sampling(&self, options: TextureOptions) {
        self.record(Call::TextureSampling(options));
    }

    fn clear(&self, colour: [f32; 4]) {
        self.record(Call::Clear(colour));
    }

    fn set_depth_test(&self, enabled: bool) {
        self.record(Call::DepthTest(enabled));
    }

    fn viewport(&self, x: i32, y: i32, width: i32, height: i32) {
        self.record(Call::Viewport(x, y, width, height));
    }
}

/// Stands in for the XR layer's frame buffer.
pub struct RecordingTarget;

impl RenderTarget<MockGl> for RecordingTarget {
    fn bind(&self, gl: &MockGl) {
        gl.record(Call::BindTarget);
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum AudioEvent {
    Position(Vector3<f32>),
    Looping(bool),
    Start,
    Stop,
    Listener(Vector3<f32>),
}

/// An `AudioSink` that logs into a shared list so tests can inspect it after
/// handing the sink over.
#[derive(Clone, Debug, Default)]
pub struct MockAudioSink {
    pub events: Rc<RefCell<Vec<AudioEvent>>>,
    pub ended: Rc<Cell<bool>>,
}

impl MockAudioSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AudioEvent> {
        self.events.borrow().clone()
    }

    pub fn starts(&self) -> usize {
        self.events
            .borrow()
            .iter()
            .filter(|e| **e == AudioEvent::Start)
            .count()
    }

    pub fn stops(&self) -> usize {
        self.events
            .borrow()
            .iter()
            .filter(|e| **e == AudioEvent::Stop)
            .count()
    }
}

impl AudioSink for MockAudioSink {
    fn set_position(&mut self, position: Vector3<f32>) {
        self.events.borrow_mut().push(AudioEvent::Position(position));
    }

    fn set_looping(&mut self, looping: bool) {
        self.events.borrow_mut().push(AudioEvent::Looping(looping));
    }

    fn start(&mut self) -> anyhow::Result<()> {
        self.events.borrow_mut().push(AudioEvent::Start);
        Ok(())
    }

    fn stop(&mut self) {
        self.events.borrow_mut().push(AudioEvent::Stop);
    }

    fn set_listener(&mut self, viewer: &Matrix4<f32>) {
        self.events
            .borrow_mut()
            .push(AudioEvent::Listener(math::position_of(viewer)));
    }

    fn take_ended(&mut self) -> bool {
        self.ended.replace(false)
    }
}

/// Writes a `width` x `height` PNG filled with `pixel` to the temp directory.
pub fn png_fixture(name: &str, width: u32, height: u32, pixel: [u8; 4]) -> PathBuf {
    let path = std::env::temp_dir().join(format!("vrgl-{}-{}.png", name, std::process::id()));
    image::RgbaImage::from_pixel(width, height, image::Rgba(pixel))
        .save(&path)
        .expect("Failed to write the PNG fixture");
    path
}

/// Polls until `done` holds, giving background loads up to five seconds.
pub fn wait_until(mut done: impl FnMut() -> bool) -> bool {
    let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
    while std::time::Instant::now() < deadline {
        if done() {
            return true;
        }
        std::thread::sleep(std::time::Duration::from_millis(10));
    }
    done()
}
