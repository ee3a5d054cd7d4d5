//! Shader compilation, reflection, recompilation and material binding.

mod common;

use std::collections::BTreeMap;

use glam::{Mat4, Vec4};
use rstest::rstest;

use common::{
    color_shader, color_shader_descriptor, dummy_context, triangle, BROKEN_FRAGMENT,
    COLOR_FRAGMENT, COLOR_VERTEX, TINT_FRAGMENT,
};
use simple_render_engine::backend::BackendCommand;
use simple_render_engine::{
    BackendError, BindError, CompileError, DefaultShader, DummyBackend, RenderConfig, RenderContext,
    RenderPassDescriptor, ShaderDescriptor, ShaderStage, UniformType, UniformValue,
};

// ============================================================================
// Compilation
// ============================================================================

#[rstest]
#[case::standard(DefaultShader::Standard, &["color", "tex", "specularity"])]
#[case::unlit(DefaultShader::Unlit, &["color", "tex"])]
#[case::sprite(DefaultShader::UnlitSprite, &["tex"])]
#[case::debug_uv(DefaultShader::DebugUv, &[])]
#[case::debug_normals(DefaultShader::DebugNormals, &[])]
fn test_default_shaders_compile(#[case] kind: DefaultShader, #[case] params: &[&str]) {
    let mut ctx = dummy_context();
    let shader = ctx.default_shader(kind).unwrap();
    assert_eq!(shader.name(), kind.name());

    let material = shader.create_material();
    for name in params {
        assert!(material.get(name).is_some(), "{} lacks '{name}'", kind.name());
    }
    assert!(shader.reflection().attribute("position").is_some());
}

#[test]
fn test_default_shaders_are_shared() {
    let mut ctx = dummy_context();
    let first = ctx.default_shader(DefaultShader::Unlit).unwrap();
    let second = ctx.default_shader(DefaultShader::Unlit).unwrap();
    assert_eq!(first.id(), second.id());
    assert_eq!(ctx.backend().live_program_count(), 1);
    assert_eq!(ctx.shaders().live_count(), 1);
}

#[test]
fn test_reflection_reports_engine_globals() {
    let mut ctx = dummy_context();
    let shader = color_shader(&mut ctx);
    let reflection = shader.reflection();

    let model = reflection.uniform("g_model").unwrap();
    assert_eq!(model.ty, UniformType::Mat4);
    assert!(model.is_engine_global());
    assert_eq!(reflection.uniform("color").unwrap().ty, UniformType::Vec4);

    let lights = reflection.uniform("g_lightPosType").unwrap();
    assert_eq!(lights.array_size, simple_render_engine::MAX_SCENE_LIGHTS as u32);
}

#[test]
fn test_missing_fragment_stage_fails() {
    let mut ctx = dummy_context();
    let err = ctx
        .create_shader(ShaderDescriptor::new("vertex only").with_vertex(COLOR_VERTEX))
        .unwrap_err();
    assert_eq!(err, CompileError::MissingStage(ShaderStage::Fragment));
    assert_eq!(ctx.backend().live_program_count(), 0);
}

#[test]
fn test_syntax_error_reports_stage_and_allocates_nothing() {
    let mut ctx = dummy_context();
    let err = ctx
        .create_shader(
            ShaderDescriptor::new("broken")
                .with_vertex(COLOR_VERTEX)
                .with_fragment(BROKEN_FRAGMENT),
        )
        .unwrap_err();
    assert_eq!(err.stage(), Some(ShaderStage::Fragment));
    assert!(!err.to_string().is_empty());
    assert_eq!(ctx.backend().live_program_count(), 0);
    assert_eq!(ctx.shaders().live_count(), 0);
}

#[test]
fn test_missing_include_is_a_preprocess_error() {
    let mut ctx = dummy_context();
    let vertex = COLOR_VERTEX.replace("engine/globals.glsl", "engine/nope.glsl");
    let err = ctx
        .create_shader(
            ShaderDescriptor::new("bad include")
                .with_vertex(vertex)
                .with_fragment(COLOR_FRAGMENT),
        )
        .unwrap_err();
    assert!(matches!(
        err,
        CompileError::Preprocess {
            stage: ShaderStage::Vertex,
            ..
        }
    ));
}

#[test]
fn test_registered_include_is_resolved() {
    let mut ctx = dummy_context();
    ctx.register_include(
        "app/material.glsl",
        "layout(set = 0, binding = 1) uniform Material {\n    vec4 color;\n};\n",
    );
    let fragment = "#version 450
#include \"app/material.glsl\"
layout(location = 0) out vec4 fragColor;
void main() {
    fragColor = color;
}
";
    let shader = ctx
        .create_shader(
            ShaderDescriptor::new("included")
                .with_vertex(COLOR_VERTEX)
                .with_fragment(fragment),
        )
        .unwrap();
    assert!(shader.reflection().uniform("color").is_some());
}

#[test]
fn test_config_defines_reach_shaders() {
    common::init_logging();
    let config = RenderConfig::default().with_define("TINT_SCALE", "0.5");
    let mut ctx = RenderContext::with_config(DummyBackend::new(), config);
    let fragment = "#version 450
layout(location = 0) out vec4 fragColor;
void main() {
    fragColor = vec4(TINT_SCALE);
}
";
    assert!(ctx
        .create_shader(
            ShaderDescriptor::new("defined")
                .with_vertex(COLOR_VERTEX)
                .with_fragment(fragment),
        )
        .is_ok());

    let precompiled = ctx.precompile(fragment, ShaderStage::Fragment).unwrap();
    assert!(precompiled.contains("#define FRAGMENT"));
    assert!(precompiled.contains("#define TINT_SCALE 0.5"));
}

#[test]
fn test_allocation_failure_surfaces_from_factory() {
    let mut ctx = dummy_context();
    ctx.backend_mut().fail_next_allocation();
    let err = ctx.create_shader(color_shader_descriptor("oom")).unwrap_err();
    assert_eq!(err, CompileError::Backend(BackendError::OutOfMemory));
    assert_eq!(ctx.shaders().live_count(), 0);

    assert!(ctx.create_shader(color_shader_descriptor("ok")).is_ok());
}

// ============================================================================
// Recompilation
// ============================================================================

fn sources(vertex: &str, fragment: &str) -> BTreeMap<ShaderStage, String> {
    BTreeMap::from([
        (ShaderStage::Vertex, vertex.to_string()),
        (ShaderStage::Fragment, fragment.to_string()),
    ])
}

#[test]
fn test_failed_recompile_keeps_previous_program() {
    let mut ctx = dummy_context();
    let shader = color_shader(&mut ctx);
    let program = shader.program();
    let reflection = shader.reflection();
    let generation = shader.generation();

    let err = ctx
        .recompile_shader(&shader, sources(COLOR_VERTEX, BROKEN_FRAGMENT))
        .unwrap_err();
    assert_eq!(err.stage(), Some(ShaderStage::Fragment));

    assert_eq!(shader.program(), program);
    assert_eq!(*shader.reflection(), *reflection);
    assert_eq!(shader.generation(), generation);
    assert_eq!(shader.source(ShaderStage::Fragment).as_deref(), Some(COLOR_FRAGMENT));
    assert_eq!(ctx.backend().live_program_count(), 1);

    // Still drawable with the old program
    let mesh = triangle(&mut ctx);
    let material = shader.create_material();
    let mut pass = ctx.render_pass(RenderPassDescriptor::new("main"));
    pass.draw(&mesh, Mat4::IDENTITY, &[&material]).unwrap();
    pass.finish();
    assert!(ctx
        .backend()
        .commands()
        .contains(&BackendCommand::SetProgram(program)));
}

#[test]
fn test_recompile_swaps_program_and_releases_the_old_one() {
    let mut ctx = dummy_context();
    let shader = color_shader(&mut ctx);
    let old_program = shader.program();

    ctx.recompile_shader(&shader, sources(COLOR_VERTEX, TINT_FRAGMENT))
        .unwrap();
    assert_ne!(shader.program(), old_program);
    assert_eq!(shader.generation(), 1);
    assert!(shader.reflection().uniform("tint").is_some());
    assert!(shader.reflection().uniform("color").is_none());

    ctx.end_frame();
    assert!(!ctx.backend().is_program_alive(old_program));
    assert!(ctx.backend().is_program_alive(shader.program()));
}

#[test]
fn test_recompile_rebinds_program_in_the_next_draw() {
    let mut ctx = dummy_context();
    let shader = color_shader(&mut ctx);
    let mesh = triangle(&mut ctx);
    let material = shader.create_material();

    {
        let mut pass = ctx.render_pass(RenderPassDescriptor::new("before"));
        pass.draw(&mesh, Mat4::IDENTITY, &[&material]).unwrap();
    }
    ctx.recompile_shader(&shader, sources(COLOR_VERTEX, COLOR_FRAGMENT))
        .unwrap();
    ctx.backend_mut().clear_commands();

    let mut pass = ctx.render_pass(RenderPassDescriptor::new("after"));
    pass.draw(&mesh, Mat4::IDENTITY, &[&material]).unwrap();
    pass.finish();
    assert!(ctx
        .backend()
        .commands()
        .contains(&BackendCommand::SetProgram(shader.program())));
}

// ============================================================================
// Materials
// ============================================================================

#[test]
fn test_material_set_end_to_end() {
    let mut ctx = dummy_context();
    let shader = color_shader(&mut ctx);
    let mut material = shader.create_material();
    let count = material.uniform_count();

    material.set("color", Vec4::new(1.0, 0.0, 0.0, 1.0)).unwrap();
    assert_eq!(
        material.set("missing", 1.0f32),
        Err(BindError::UnknownUniform("missing".into()))
    );
    assert_eq!(material.uniform_count(), count);
    assert!(matches!(
        material.get("color"),
        Some(UniformValue::Vec4(v)) if *v == Vec4::new(1.0, 0.0, 0.0, 1.0)
    ));
}

#[rstest]
#[case::float(UniformValue::Float(1.0))]
#[case::mat4(UniformValue::Mat4(Mat4::IDENTITY))]
#[case::int(UniformValue::Int(3))]
fn test_mistyped_set_leaves_material_unchanged(#[case] value: UniformValue) {
    let mut ctx = dummy_context();
    let shader = color_shader(&mut ctx);
    let mut material = shader.create_material();
    material.set("color", Vec4::ONE).unwrap();

    let err = material.set("color", value).unwrap_err();
    assert!(matches!(err, BindError::TypeMismatch { .. }));
    assert!(matches!(
        material.get("color"),
        Some(UniformValue::Vec4(v)) if *v == Vec4::ONE
    ));
}

#[test]
fn test_material_follows_recompiled_uniforms() {
    let mut ctx = dummy_context();
    let shader = color_shader(&mut ctx);
    let mut material = shader.create_material();
    material.set("color", Vec4::ONE).unwrap();

    ctx.recompile_shader(&shader, sources(COLOR_VERTEX, TINT_FRAGMENT))
        .unwrap();
    // Readers drop the removed uniform before any rebuild
    assert!(material.get("color").is_none());
    assert_eq!(material.uniform_count(), 0);

    assert_eq!(
        material.set("color", Vec4::ONE),
        Err(BindError::UnknownUniform("color".into()))
    );
    material.set("tint", Vec4::new(0.0, 1.0, 0.0, 1.0)).unwrap();
    material.set("strength", 0.5f32).unwrap();
    let names: Vec<&str> = material.iter().map(|(name, _)| name).collect();
    assert_eq!(names, ["tint", "strength"]);
}

#[test]
fn test_recompile_keeps_matching_material_values() {
    let mut ctx = dummy_context();
    let shader = color_shader(&mut ctx);
    let mut material = shader.create_material();
    material.set("color", Vec4::new(1.0, 0.0, 0.0, 1.0)).unwrap();

    let fragment = COLOR_FRAGMENT
        .replace("vec4 color;", "vec4 color;\n    float strength;")
        .replace("fragColor = color;", "fragColor = color * strength;");
    ctx.recompile_shader(&shader, sources(COLOR_VERTEX, &fragment))
        .unwrap();

    assert!(material.refresh());
    assert!(!material.refresh());
    assert!(matches!(
        material.get("color"),
        Some(UniformValue::Vec4(v)) if *v == Vec4::new(1.0, 0.0, 0.0, 1.0)
    ));
    assert!(matches!(material.get("strength"), Some(UniformValue::Float(v)) if *v == 0.0));
}

#[test]
fn test_engine_globals_are_not_material_parameters() {
    let mut ctx = dummy_context();
    let shader = color_shader(&mut ctx);
    let mut material = shader.create_material();
    assert!(material.get("g_model").is_none());
    assert!(matches!(
        material.set("g_model", Mat4::IDENTITY),
        Err(BindError::UnknownUniform(_))
    ));
}
