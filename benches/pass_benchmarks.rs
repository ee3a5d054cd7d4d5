use criterion::{Criterion, black_box, criterion_group, criterion_main};

use glam::{Mat4, Vec3, Vec4};

use simple_render_engine::{
    DefaultShader, DummyBackend, MeshDescriptor, RenderContext, RenderPassDescriptor,
    ShaderStage, WorldLights,
};

// ---------------------------------------------------------------------------
// Mesh generation
// ---------------------------------------------------------------------------

fn bench_generate_sphere(c: &mut Criterion) {
    c.bench_function("mesh_descriptor_sphere_32x16", |b| {
        b.iter(|| black_box(MeshDescriptor::sphere(black_box(32), black_box(16))));
    });
}

fn bench_generate_plane(c: &mut Criterion) {
    c.bench_function("mesh_descriptor_plane_64", |b| {
        b.iter(|| black_box(MeshDescriptor::plane(10.0, 10.0, black_box(64))));
    });
}

// ---------------------------------------------------------------------------
// Shaders
// ---------------------------------------------------------------------------

fn bench_compile_standard(c: &mut Criterion) {
    c.bench_function("compile_standard_shader", |b| {
        b.iter_with_setup(
            || RenderContext::new(DummyBackend::new()),
            |mut ctx| {
                let shader = ctx
                    .create_shader(DefaultShader::Standard.descriptor())
                    .unwrap();
                black_box(shader);
            },
        );
    });
}

fn bench_precompile(c: &mut Criterion) {
    let ctx = RenderContext::new(DummyBackend::new());
    let source = DefaultShader::Standard.descriptor().sources[&ShaderStage::Fragment].clone();
    c.bench_function("precompile_standard_fragment", |b| {
        b.iter(|| black_box(ctx.precompile(black_box(&source), ShaderStage::Fragment).unwrap()));
    });
}

// ---------------------------------------------------------------------------
// Render passes
// ---------------------------------------------------------------------------

fn bench_pass_same_material(c: &mut Criterion) {
    let mut ctx = RenderContext::new(DummyBackend::new());
    let shader = ctx.default_shader(DefaultShader::Standard).unwrap();
    let mesh = ctx.create_mesh(MeshDescriptor::cube()).unwrap();
    let mut material = shader.create_material();
    material.set("color", Vec4::ONE).unwrap();

    c.bench_function("pass_1000_draws_one_material", |b| {
        b.iter(|| {
            ctx.backend_mut().clear_commands();
            let mut pass = ctx.render_pass(
                RenderPassDescriptor::new("bench").with_lights(WorldLights::default()),
            );
            for i in 0..1000 {
                let transform = Mat4::from_translation(Vec3::new(i as f32, 0.0, 0.0));
                pass.draw(&mesh, transform, &[&material]).unwrap();
            }
            pass.finish();
            black_box(ctx.end_frame());
        });
    });
}

fn bench_pass_alternating_materials(c: &mut Criterion) {
    let mut ctx = RenderContext::new(DummyBackend::new());
    let standard = ctx.default_shader(DefaultShader::Standard).unwrap();
    let unlit = ctx.default_shader(DefaultShader::Unlit).unwrap();
    let cube = ctx.create_mesh(MeshDescriptor::cube()).unwrap();
    let sphere = ctx.create_mesh(MeshDescriptor::sphere(16, 8)).unwrap();
    let materials = [standard.create_material(), unlit.create_material()];
    let meshes = [cube, sphere];

    c.bench_function("pass_1000_draws_alternating", |b| {
        b.iter(|| {
            ctx.backend_mut().clear_commands();
            let mut pass = ctx.render_pass(RenderPassDescriptor::new("bench"));
            for i in 0..1000 {
                let transform = Mat4::from_translation(Vec3::new(i as f32, 0.0, 0.0));
                pass.draw(&meshes[i % 2], transform, &[&materials[(i / 2) % 2]])
                    .unwrap();
            }
            pass.finish();
            black_box(ctx.end_frame());
        });
    });
}

criterion_group!(
    benches,
    bench_generate_sphere,
    bench_generate_plane,
    bench_compile_standard,
    bench_precompile,
    bench_pass_same_material,
    bench_pass_alternating_materials,
);
criterion_main!(benches);
