//! Resource creation, weak registries, deferred release and frame totals.

mod common;

use glam::{UVec2, Vec3};
use rstest::rstest;

use common::{checker_texture, color_shader, dummy_context, split_quad, triangle};
use simple_render_engine::{
    BackendError, FramebufferDescriptor, MeshDescriptor, ResourceError, SpriteAtlasDescriptor,
    SpriteRegion, TextureDescriptor,
};

#[test]
fn test_registries_list_in_creation_order() {
    let mut ctx = dummy_context();
    let a = checker_texture(&mut ctx, 8);
    let b = ctx
        .create_texture(TextureDescriptor::solid_color([255, 0, 0, 255]).with_name("red"))
        .unwrap();
    let c = ctx
        .create_texture(TextureDescriptor::solid_color([0, 255, 0, 255]).with_name("green"))
        .unwrap();

    let names: Vec<String> = ctx
        .textures()
        .live()
        .iter()
        .map(|t| t.name().to_string())
        .collect();
    assert_eq!(names, vec!["checker", "red", "green"]);

    drop(b);
    let ids: Vec<u64> = ctx.textures().live().iter().map(|t| t.id()).collect();
    assert_eq!(ids, vec![a.id(), c.id()]);
}

#[test]
fn test_registries_do_not_keep_resources_alive() {
    let mut ctx = dummy_context();
    let mesh = triangle(&mut ctx);
    assert_eq!(std::sync::Arc::strong_count(&mesh), 1);
    drop(mesh);
    assert_eq!(ctx.meshes().live_count(), 0);
}

#[test]
fn test_gpu_objects_are_released_at_end_of_frame() {
    let mut ctx = dummy_context();
    let mesh = split_quad(&mut ctx);
    let texture = checker_texture(&mut ctx, 8);
    let shader = color_shader(&mut ctx);
    let program = shader.program();
    let buffers = ctx.backend().live_buffer_count();
    assert!(buffers > 0);

    drop(mesh);
    drop(texture);
    drop(shader);
    // Nothing is destroyed until the context drains its queue
    assert_eq!(ctx.backend().live_buffer_count(), buffers);
    assert_eq!(ctx.backend().live_texture_count(), 1);
    assert!(ctx.backend().is_program_alive(program));

    ctx.end_frame();
    assert_eq!(ctx.backend().live_buffer_count(), 0);
    assert_eq!(ctx.backend().live_texture_count(), 0);
    assert!(!ctx.backend().is_program_alive(program));
}

#[test]
fn test_end_frame_reports_resource_totals() {
    let mut ctx = dummy_context();
    let mesh = split_quad(&mut ctx);
    let small = checker_texture(&mut ctx, 8);
    let large = checker_texture(&mut ctx, 16);

    let stats = ctx.end_frame();
    assert_eq!(stats.mesh_count, 1);
    assert_eq!(stats.texture_count, 2);
    assert_eq!(stats.mesh_bytes, mesh.data_size());
    assert_eq!(stats.texture_bytes, small.data_size() + large.data_size());
    assert!(large.data_size() > small.data_size());

    assert_eq!(ctx.frame_count(), 1);
    assert_eq!(ctx.last_frame_stats(), stats);
    assert_eq!(ctx.frame_history().len(), 1);
}

#[test]
fn test_resources_may_outlive_the_context() {
    let mut ctx = dummy_context();
    let mesh = triangle(&mut ctx);
    let shader = color_shader(&mut ctx);
    let material = shader.create_material();
    drop(ctx);

    assert_eq!(mesh.vertex_count(), 3);
    drop(material);
    drop(shader);
    drop(mesh);
}

// ============================================================================
// Invalid descriptors
// ============================================================================

#[rstest]
#[case::no_positions(MeshDescriptor::new("empty"))]
#[case::short_normals(
    MeshDescriptor::new("short normals")
        .with_positions(vec![Vec3::ZERO, Vec3::X, Vec3::Y])
        .with_normals(vec![Vec3::Z])
)]
#[case::index_out_of_range(
    MeshDescriptor::new("bad index")
        .with_positions(vec![Vec3::ZERO, Vec3::X, Vec3::Y])
        .with_index_set(vec![0, 1, 3])
)]
fn test_invalid_mesh_allocates_nothing(#[case] desc: MeshDescriptor) {
    let mut ctx = dummy_context();
    let result = ctx.create_mesh(desc);
    assert!(matches!(result, Err(ResourceError::InvalidDescriptor(_))));
    assert_eq!(ctx.backend().live_buffer_count(), 0);
    assert_eq!(ctx.meshes().live_count(), 0);
}

#[rstest]
#[case::empty(TextureDescriptor::from_pixels(0, 4, Vec::new()))]
#[case::short_data(TextureDescriptor::from_pixels(4, 4, vec![0; 10]))]
#[case::non_square_cube(TextureDescriptor::cubemap(4, 2, std::array::from_fn(|_| vec![0; 32])))]
#[case::size_overflows(TextureDescriptor::from_pixels(u32::MAX, u32::MAX, vec![0; 16]))]
fn test_invalid_texture_allocates_nothing(#[case] desc: TextureDescriptor) {
    let mut ctx = dummy_context();
    let result = ctx.create_texture(desc);
    assert!(matches!(result, Err(ResourceError::InvalidDescriptor(_))));
    assert_eq!(ctx.backend().live_texture_count(), 0);
}

#[test]
fn test_large_render_target_is_accepted() {
    let mut ctx = dummy_context();
    let texture = ctx
        .create_texture(TextureDescriptor::render_target(65536, 65536))
        .unwrap();
    assert_eq!(texture.size(), (65536, 65536));
    assert!(texture.data_size() >= 65536 * 65536 * 4);
}

#[test]
fn test_allocation_failure_is_reported() {
    let mut ctx = dummy_context();
    ctx.backend_mut().fail_next_allocation();
    let result = ctx.create_mesh(MeshDescriptor::cube());
    assert_eq!(
        result.unwrap_err(),
        ResourceError::Backend(BackendError::OutOfMemory)
    );
    assert_eq!(ctx.backend().live_buffer_count(), 0);

    ctx.backend_mut().fail_next_allocation();
    assert!(ctx.create_texture(TextureDescriptor::solid_color([0; 4])).is_err());
    assert_eq!(ctx.textures().live_count(), 0);
}

#[rstest]
#[case::past_right_edge(UVec2::new(12, 0), UVec2::new(8, 8))]
#[case::past_bottom_edge(UVec2::new(0, 12), UVec2::new(8, 8))]
#[case::empty(UVec2::ZERO, UVec2::new(0, 8))]
#[case::end_overflows(UVec2::new(u32::MAX, 0), UVec2::new(8, 8))]
#[case::height_overflows(UVec2::new(0, 4), UVec2::new(8, u32::MAX))]
fn test_sprites_must_lie_inside_the_texture(#[case] position: UVec2, #[case] size: UVec2) {
    let mut ctx = dummy_context();
    let texture = checker_texture(&mut ctx, 16);
    let result = ctx.create_sprite_atlas(
        SpriteAtlasDescriptor::new("icons", texture.clone())
            .with_sprite("ok", SpriteRegion::new(UVec2::ZERO, UVec2::new(8, 8)))
            .with_sprite("outside", SpriteRegion::new(position, size)),
    );
    assert!(matches!(result, Err(ResourceError::InvalidDescriptor(_))));
    assert_eq!(ctx.sprite_atlases().live_count(), 0);
}

#[test]
fn test_sprite_names_must_be_unique() {
    let mut ctx = dummy_context();
    let texture = checker_texture(&mut ctx, 16);

    let result = ctx.create_sprite_atlas(
        SpriteAtlasDescriptor::new("dupes", texture)
            .with_sprite("a", SpriteRegion::new(UVec2::ZERO, UVec2::new(8, 8)))
            .with_sprite("a", SpriteRegion::new(UVec2::new(8, 8), UVec2::new(8, 8))),
    );
    assert!(matches!(result, Err(ResourceError::InvalidDescriptor(_))));
    assert_eq!(ctx.sprite_atlases().live_count(), 0);
}

#[test]
fn test_framebuffer_targets_must_match() {
    let mut ctx = dummy_context();
    let color = ctx
        .create_texture(TextureDescriptor::render_target(64, 64))
        .unwrap();
    let depth = ctx
        .create_texture(TextureDescriptor::depth_target(32, 32))
        .unwrap();

    let mismatched = FramebufferDescriptor::new("mismatched")
        .with_color_texture(color.clone())
        .with_depth_texture(depth);
    assert!(matches!(
        ctx.create_framebuffer(mismatched),
        Err(ResourceError::InvalidDescriptor(_))
    ));
    assert!(matches!(
        ctx.create_framebuffer(FramebufferDescriptor::new("empty")),
        Err(ResourceError::InvalidDescriptor(_))
    ));

    let framebuffer = ctx
        .create_framebuffer(FramebufferDescriptor::new("ok").with_color_texture(color))
        .unwrap();
    assert_eq!(framebuffer.size(), (64, 64));
    assert_eq!(ctx.framebuffers().live_count(), 1);
}
