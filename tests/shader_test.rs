use vrgl::{
    GfxError,
    context::{StageKind, UniformKind},
    data_structures::{
        material::{self, Material},
        shader::{ShaderProgram, ShaderStage},
    },
};

use crate::common::test_utils::{Call, MockGl, UniformValue};
mod common;

const VERTEX: &str = "#version 300 es
uniform mat4 u_Matrix;
uniform vec4 u_Lights[4];
uniform float u_Unused;
in vec3 a_Position;
void main() {
    gl_Position = u_Matrix * vec4(a_Position, 1.0) + u_Lights[1];
}
";

const FRAGMENT: &str = "#version 300 es
precision mediump float;
uniform sampler2D u_Image;
out vec4 o_Color;
void main() {
    o_Color = texture(u_Image, vec2(0.5));
}
";

fn program(gl: &MockGl) -> ShaderProgram<MockGl> {
    let vertex = ShaderStage::new(gl, StageKind::Vertex, VERTEX).unwrap();
    let fragment = ShaderStage::new(gl, StageKind::Fragment, FRAGMENT).unwrap();
    let mut program = ShaderProgram::new(gl).unwrap();
    program.join(gl, vertex).join(gl, fragment);
    program.link(gl).unwrap();
    program
}

fn gfx_error(e: anyhow::Error) -> GfxError {
    e.downcast::<GfxError>().expect("Expected a GfxError")
}

#[test]
fn compile_errors_carry_the_log() {
    let gl = MockGl::new();
    let err = ShaderStage::new(&gl, StageKind::Fragment, "#error broken").unwrap_err();

    match gfx_error(err) {
        GfxError::Compile { stage, log } => {
            assert_eq!(stage, StageKind::Fragment);
            assert!(log.contains("#error"), "{log}");
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(gl.count(|c| matches!(c, Call::DeleteShader(_))), 1);
}

#[test]
fn link_errors_are_reported() {
    let gl = MockGl::new();
    let vertex = ShaderStage::new(&gl, StageKind::Vertex, VERTEX).unwrap();
    let mut program = ShaderProgram::new(&gl).unwrap();
    program.join(&gl, vertex);

    gl.fail_next_link("missing fragment shader");
    let err = program.link(&gl).unwrap_err();
    assert_eq!(
        gfx_error(err),
        GfxError::Link {
            log: "missing fragment shader".to_string()
        }
    );
    assert!(!program.is_linked());
}

#[test]
fn uniform_table_is_built_at_link_time() {
    let gl = MockGl::new();
    let program = program(&gl);

    let mut names: Vec<_> = program.uniform_names().collect();
    names.sort();
    assert_eq!(names, vec!["u_Image", "u_Lights", "u_Matrix"]);

    let lights = program.uniform("u_Lights").unwrap();
    assert_eq!(lights.size, 4);
    assert_eq!(lights.kind, UniformKind::Vec4);
    assert!(!program.has_uniform("u_Unused"));
}

#[test]
fn setters_write_through_cached_locations() {
    let gl = MockGl::new();
    let mut program = program(&gl);
    program.bind(&gl);
    program
        .set_4x4f(&gl, "u_Matrix", &vrgl::math::IDENTITY)
        .unwrap()
        .set_1i(&gl, "u_Image", 2)
        .unwrap()
        .set_4f(&gl, "u_Lights", 1.0, 0.5, 0.25, 1.0)
        .unwrap();

    assert_eq!(
        gl.uniform_writes("u_Matrix"),
        vec![UniformValue::Mat4(vrgl::math::IDENTITY)]
    );
    assert_eq!(gl.uniform_writes("u_Image"), vec![UniformValue::Int(2)]);
    assert_eq!(
        gl.uniform_writes("u_Lights"),
        vec![UniformValue::Float(vec![1.0, 0.5, 0.25, 1.0])]
    );
}

#[test]
fn unknown_uniforms_are_errors() {
    let gl = MockGl::new();
    let mut program = program(&gl);

    let err = program.set_1f(&gl, "u_Unused", 1.0).unwrap_err();
    assert_eq!(
        gfx_error(err),
        GfxError::UnknownUniform {
            name: "u_Unused".to_string()
        }
    );
    assert!(gl.uniform_writes("u_Unused").is_empty());
}

#[test]
fn values_of_the_wrong_shape_are_rejected() {
    let gl = MockGl::new();
    let mut program = program(&gl);

    let err = program.set_3f(&gl, "u_Matrix", 1.0, 2.0, 3.0).unwrap_err();
    assert_eq!(
        gfx_error(err),
        GfxError::UniformKind {
            name: "u_Matrix".to_string(),
            declared: UniformKind::Mat4,
            written: UniformKind::Vec3,
        }
    );
}

#[test]
fn free_deletes_program_and_stages() {
    let gl = MockGl::new();
    let program = program(&gl);
    program.free(&gl);

    assert_eq!(gl.count(|c| matches!(c, Call::DeleteProgram(_))), 1);
    assert_eq!(gl.count(|c| matches!(c, Call::DeleteShader(_))), 2);
}

#[test]
fn material_wraps_user_functions() {
    let source = material::vertex_source(material::DEFAULT_VERTEX);
    assert!(source.starts_with("#version 300 es"));
    assert!(source.contains("vec4 vertex()"));
    assert!(source.contains("gl_Position = vertex();"));

    let gl = MockGl::new();
    let material = Material::new(&gl, None, None).unwrap();
    for name in ["u_Projection", "u_View", "u_Model", "u_Color", "u_Texture"] {
        assert!(material.program().has_uniform(name), "{name}");
    }
    assert_eq!(
        gl.uniform_writes("u_Color"),
        vec![UniformValue::Float(vec![1.0; 4])]
    );
}

#[test]
fn lit_material_skips_uniforms_the_compiler_removed() {
    let gl = MockGl::new();
    let mut material = Material::lit(&gl).unwrap();
    assert!(!material.program().has_uniform("u_Texture"));

    material.set_color(&gl, [0.5, 0.5, 0.5, 1.0]).unwrap();
    material.set_view(&gl, &vrgl::math::IDENTITY).unwrap();
    assert_eq!(gl.uniform_writes("u_Color").len(), 2);
}

#[test]
fn broken_material_code_frees_what_was_compiled() {
    let gl = MockGl::new();
    let err = Material::new(&gl, None, Some("#error no shader() here")).unwrap_err();
    assert!(matches!(
        gfx_error(err),
        GfxError::Compile {
            stage: StageKind::Fragment,
            ..
        }
    ));
    // The broken fragment stage and the vertex stage compiled before it.
    assert_eq!(gl.count(|c| matches!(c, Call::DeleteShader(_))), 2);
    assert_eq!(gl.count(|c| matches!(c, Call::CreateProgram(_))), 0);
}

#[test]
fn material_frees_its_stages_when_no_program_can_be_created() {
    let gl = MockGl::new();
    gl.fail_programs();
    let err = Material::new(&gl, None, None).unwrap_err();

    assert!(matches!(
        gfx_error(err),
        GfxError::Create { what: "program", .. }
    ));
    let created = gl.count(|c| matches!(c, Call::CreateShader(..)));
    assert_eq!(created, 2);
    assert_eq!(gl.count(|c| matches!(c, Call::DeleteShader(_))), created);
}
