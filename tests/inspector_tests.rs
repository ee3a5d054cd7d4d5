//! Inspector listing, previews, statistics and the live shader editor,
//! driven through a recording UI surface.

mod common;

use glam::{UVec2, Vec2};

use common::{
    checker_texture, color_shader, dummy_context, triangle, RecordingSurface, UiEvent,
    BROKEN_FRAGMENT, COLOR_VERTEX,
};
use simple_render_engine::inspector::Palette;
use simple_render_engine::{
    DefaultShader, FramebufferDescriptor, Inspector, InspectorConfig, Metric, RenderStats,
    ShaderStage, SpriteAtlasDescriptor, SpriteRegion, TextureDescriptor,
};

const EDITOR_TITLE: &str = "Edit shader 'color'";

// ============================================================================
// Listing
// ============================================================================

#[test]
fn test_lists_live_resources() {
    let mut ctx = dummy_context();
    let _shader = color_shader(&mut ctx);
    let _mesh = triangle(&mut ctx);
    let _checker = checker_texture(&mut ctx, 8);
    let color = ctx
        .create_texture(TextureDescriptor::render_target(64, 32).with_name("offscreen color"))
        .unwrap();
    let _framebuffer = ctx
        .create_framebuffer(FramebufferDescriptor::new("offscreen").with_color_texture(color))
        .unwrap();

    let mut inspector = Inspector::default();
    let mut ui = RecordingSurface::new();
    inspector.render_gui(&mut ctx, &mut ui);

    assert_eq!(ui.windows(), vec!["Inspector"]);
    let headers = ui.headers();
    assert!(headers.contains(&"Shaders (1)"));
    assert!(headers.contains(&"Textures (2)"));
    assert!(headers.contains(&"Meshes (1)"));
    assert!(headers.contains(&"Sprite atlases (0)"));
    assert!(headers.contains(&"Framebuffers (1)"));

    let nodes = ui.tree_nodes();
    for name in ["color", "triangle", "checker", "offscreen color", "offscreen"] {
        assert!(nodes.contains(&name), "missing node '{name}'");
    }
    assert_eq!(ui.value_of("Backend"), Some("Dummy Backend"));
    assert_eq!(ui.value_of("Surface"), Some("800x600"));
    assert_eq!(ui.value_of("#define MAX_LIGHTS"), Some("4"));
    assert_eq!(ui.value_of("Color targets"), Some("1"));
    assert_eq!(ui.value_of("Depth target"), Some("false"));
    assert!(ui.errors().is_empty());
}

#[test]
fn test_dropped_resources_disappear() {
    let mut ctx = dummy_context();
    let checker = checker_texture(&mut ctx, 8);
    let mut inspector = Inspector::default();

    let mut ui = RecordingSurface::new();
    inspector.render_gui(&mut ctx, &mut ui);
    assert!(ui.tree_nodes().contains(&"checker"));

    drop(checker);
    let mut ui = RecordingSurface::new();
    inspector.render_gui(&mut ctx, &mut ui);
    assert!(!ui.tree_nodes().contains(&"checker"));
    assert!(ui.headers().contains(&"Textures (0)"));
}

#[test]
fn test_preview_textures_are_reused_across_frames() {
    let mut ctx = dummy_context();
    let _shader = color_shader(&mut ctx);
    let _mesh = triangle(&mut ctx);
    // Mesh previews of normal-less meshes use this one
    let _unlit = ctx.default_shader(DefaultShader::Unlit).unwrap();

    let mut inspector = Inspector::default();
    let mut ui = RecordingSurface::new();
    inspector.render_gui(&mut ctx, &mut ui);
    let first_frame_images = ui.images().len();
    let textures = ctx.backend().live_texture_count();
    assert!(first_frame_images >= 3);
    inspector.record_frame(ctx.end_frame(), 16.0);

    for _ in 0..3 {
        let mut ui = RecordingSurface::new();
        inspector.render_gui(&mut ctx, &mut ui);
        assert_eq!(ui.images().len(), first_frame_images);
        inspector.record_frame(ctx.end_frame(), 16.0);
    }
    assert_eq!(ctx.backend().live_texture_count(), textures);
    // Pool textures are not registered
    assert_eq!(ctx.textures().live_count(), 0);
}

#[test]
fn test_cubemaps_and_depth_textures_have_no_image() {
    let mut ctx = dummy_context();
    let faces: [Vec<u8>; 6] = std::array::from_fn(|_| vec![255; 2 * 2 * 4]);
    let _cube = ctx
        .create_texture(TextureDescriptor::cubemap(2, 2, faces).with_name("sky"))
        .unwrap();
    let _depth = ctx
        .create_texture(TextureDescriptor::depth_target(16, 16).with_name("depth"))
        .unwrap();

    let mut inspector = Inspector::default();
    let mut ui = RecordingSurface::new();
    inspector.render_gui(&mut ctx, &mut ui);

    assert!(ui.tree_nodes().contains(&"sky"));
    assert!(ui.tree_nodes().contains(&"depth"));
    assert!(ui.images().is_empty());
}

#[test]
fn test_texture_image_keeps_aspect() {
    let mut ctx = dummy_context();
    let _wide = ctx
        .create_texture(TextureDescriptor::from_pixels(64, 32, vec![0; 64 * 32 * 4]))
        .unwrap();

    let mut inspector = Inspector::new(InspectorConfig::default().with_preview_display_size(100.0));
    let mut ui = RecordingSurface::new();
    inspector.render_gui(&mut ctx, &mut ui);

    let images = ui.images();
    assert_eq!(images.len(), 1);
    assert_eq!(images[0].size, Vec2::new(100.0, 50.0));
    assert!(images[0].border.is_some());
}

// ============================================================================
// Sprite atlases
// ============================================================================

#[test]
fn test_sprite_selection_drives_uv_image() {
    let mut ctx = dummy_context();
    let texture = checker_texture(&mut ctx, 32);
    let _atlas = ctx
        .create_sprite_atlas(
            SpriteAtlasDescriptor::new("icons", texture)
                .with_sprite("left", SpriteRegion::new(UVec2::ZERO, UVec2::new(16, 16)))
                .with_sprite("right", SpriteRegion::new(UVec2::new(16, 0), UVec2::new(16, 16))),
        )
        .unwrap();
    let mut inspector = Inspector::default();

    let mut ui = RecordingSurface::new();
    inspector.render_gui(&mut ctx, &mut ui);
    let image = *ui.images().last().unwrap();
    assert_eq!(image.uv_min, Vec2::ZERO);
    assert_eq!(image.uv_max, Vec2::new(0.5, 0.5));
    assert_eq!(ui.value_of("Position"), Some("0, 0"));

    let mut ui = RecordingSurface::new().selecting("Sprite", 1);
    inspector.render_gui(&mut ctx, &mut ui);
    let image = *ui.images().last().unwrap();
    assert_eq!(image.uv_min, Vec2::new(0.5, 0.0));
    assert_eq!(image.uv_max, Vec2::new(1.0, 0.5));

    // The selection sticks without further input
    let mut ui = RecordingSurface::new();
    inspector.render_gui(&mut ctx, &mut ui);
    assert_eq!(ui.value_of("Position"), Some("16, 0"));
    assert!(ui.events.iter().any(|e| matches!(
        e,
        UiEvent::Combo(label, items, Some(1)) if label == "Sprite" && items.len() == 2
    )));
}

#[test]
fn test_selection_is_forgotten_with_the_atlas() {
    let mut ctx = dummy_context();
    let texture = checker_texture(&mut ctx, 32);
    let atlas = ctx
        .create_sprite_atlas(
            SpriteAtlasDescriptor::new("icons", texture)
                .with_sprite("left", SpriteRegion::new(UVec2::ZERO, UVec2::new(16, 16)))
                .with_sprite("right", SpriteRegion::new(UVec2::new(16, 0), UVec2::new(16, 16))),
        )
        .unwrap();
    let id = atlas.id();
    let mut inspector = Inspector::default();

    let mut ui = RecordingSurface::new().selecting("Sprite", 1);
    inspector.render_gui(&mut ctx, &mut ui);
    assert_eq!(inspector.selected_sprite(id), Some(1));

    drop(atlas);
    inspector.render_gui(&mut ctx, &mut RecordingSurface::new());
    assert_eq!(inspector.selected_sprite(id), None);
}

#[test]
fn test_empty_atlas_shows_no_sprites() {
    let mut ctx = dummy_context();
    let texture = checker_texture(&mut ctx, 8);
    let _atlas = ctx
        .create_sprite_atlas(SpriteAtlasDescriptor::new("empty", texture))
        .unwrap();

    let mut inspector = Inspector::default();
    let mut ui = RecordingSurface::new();
    inspector.render_gui(&mut ctx, &mut ui);
    assert!(ui.events.contains(&UiEvent::Text("No sprites".to_string())));
}

// ============================================================================
// Statistics
// ============================================================================

#[test]
fn test_recorded_frames_feed_the_plots() {
    let mut ctx = dummy_context();
    let mut inspector = Inspector::new(InspectorConfig::default().with_frames(10));
    for i in 1..=5u32 {
        let stats = RenderStats {
            draw_calls: i,
            ..Default::default()
        };
        inspector.record_frame(stats, i as f32 * 10.0);
    }

    let stats = inspector.statistics();
    assert_eq!(stats.len(), 5);
    assert_eq!(stats.average(Metric::DrawCalls), 3.0);
    assert_eq!(stats.max(Metric::FrameTime), 50.0);
    assert_eq!(inspector.frame_count(), 5);

    let mut ui = RecordingSurface::new();
    inspector.render_gui(&mut ctx, &mut ui);
    let plots = ui.plots();
    assert!(plots.contains(&("Draw calls: avg 3.00, max 5.00", 5)));
    assert!(plots.contains(&("Frame time (ms): avg 30.00, max 50.00", 5)));
    assert_eq!(ui.value_of("Frames"), Some("5"));
}

#[test]
fn test_first_update_is_timed_from_construction() {
    let mut inspector = Inspector::default();
    std::thread::sleep(std::time::Duration::from_millis(5));
    inspector.update(RenderStats::default());
    assert!(inspector.statistics().max(Metric::FrameTime) >= 5.0);
}

#[test]
fn test_statistics_window_is_bounded() {
    let mut inspector = Inspector::new(InspectorConfig::default().with_frames(3));
    for i in 1..=5u32 {
        let stats = RenderStats {
            draw_calls: i,
            ..Default::default()
        };
        inspector.record_frame(stats, 1.0);
    }
    assert_eq!(inspector.statistics().len(), 3);
    assert_eq!(
        inspector.statistics().series(Metric::DrawCalls),
        vec![3.0, 4.0, 5.0]
    );
}

// ============================================================================
// Visibility
// ============================================================================

#[test]
fn test_hidden_inspector_draws_nothing() {
    let mut ctx = dummy_context();
    let mut inspector = Inspector::default();
    inspector.set_visible(false);

    let mut ui = RecordingSurface::new();
    inspector.render_gui(&mut ctx, &mut ui);
    assert!(ui.events.is_empty());
}

#[test]
fn test_closing_the_window_hides_the_inspector() {
    let mut ctx = dummy_context();
    let mut inspector = Inspector::default();

    let mut ui = RecordingSurface::new().closing("Inspector");
    inspector.render_gui(&mut ctx, &mut ui);
    assert!(!inspector.is_visible());
}

// ============================================================================
// Shader editor
// ============================================================================

#[test]
fn test_edit_button_opens_the_editor() {
    let mut ctx = dummy_context();
    let shader = color_shader(&mut ctx);
    let mut inspector = Inspector::default();

    let mut ui = RecordingSurface::new().clicking("Edit");
    inspector.render_gui(&mut ctx, &mut ui);

    assert_eq!(inspector.editing_shader().unwrap().id(), shader.id());
    assert!(ui.windows().contains(&EDITOR_TITLE));
    let (stage, text) = inspector.editor_text().unwrap();
    assert_eq!(stage, ShaderStage::Vertex);
    assert_eq!(text, COLOR_VERTEX);
}

#[test]
fn test_editor_compile_reports_errors_then_recovers() {
    let mut ctx = dummy_context();
    let shader = color_shader(&mut ctx);
    let program = shader.program();
    let mut inspector = Inspector::default();
    inspector.set_visible(false);
    inspector.edit_shader(&shader);

    inspector.set_editor_text(BROKEN_FRAGMENT);
    let mut ui = RecordingSurface::new().clicking("Compile");
    inspector.render_gui(&mut ctx, &mut ui);

    let errors = inspector.editor_errors().unwrap();
    assert!(!errors.is_empty());
    assert_eq!(ui.errors(), vec![errors.as_str()]);
    assert_eq!(shader.generation(), 0);
    assert_eq!(shader.program(), program);
    assert!(inspector.editing_shader().is_some());

    inspector.set_editor_text(COLOR_VERTEX);
    let mut ui = RecordingSurface::new().clicking("Compile");
    inspector.render_gui(&mut ctx, &mut ui);

    assert!(inspector.editor_errors().is_none());
    assert!(ui.errors().is_empty());
    assert_eq!(shader.generation(), 1);
    assert_ne!(shader.program(), program);
}

#[test]
fn test_closing_the_editor_window_ends_the_session() {
    let mut ctx = dummy_context();
    let shader = color_shader(&mut ctx);
    let mut inspector = Inspector::default();
    inspector.edit_shader(&shader);

    let mut ui = RecordingSurface::new().closing(EDITOR_TITLE);
    inspector.render_gui(&mut ctx, &mut ui);
    assert!(inspector.editing_shader().is_none());
    assert!(inspector.editor_text().is_none());
}

#[test]
fn test_dropped_shader_ends_the_session() {
    let mut ctx = dummy_context();
    let shader = color_shader(&mut ctx);
    let mut inspector = Inspector::default();
    inspector.set_visible(false);
    inspector.edit_shader(&shader);
    drop(shader);

    let mut ui = RecordingSurface::new();
    inspector.render_gui(&mut ctx, &mut ui);
    assert!(ui.windows().is_empty());
    assert!(inspector.editing_shader().is_none());
}

#[test]
fn test_show_precompiled_is_read_only() {
    let mut ctx = dummy_context();
    let shader = color_shader(&mut ctx);
    let mut inspector = Inspector::default();
    inspector.set_visible(false);
    inspector.edit_shader(&shader);

    let mut ui = RecordingSurface::new().checking("Show precompiled", true);
    inspector.render_gui(&mut ctx, &mut ui);
    let (text, read_only, palette) = ui.last_code_editor().unwrap();
    assert!(text.contains("#define VERTEX"));
    assert!(text.contains("uniform EngineGlobals"));
    assert!(read_only);
    assert_eq!(palette, Palette::Light);

    let mut ui = RecordingSurface::new().checking("Show precompiled", false);
    inspector.render_gui(&mut ctx, &mut ui);
    let (text, read_only, palette) = ui.last_code_editor().unwrap();
    assert_eq!(text, COLOR_VERTEX);
    assert!(!read_only);
    assert_eq!(palette, Palette::Dark);
}

#[test]
fn test_stage_combo_switches_sources() {
    let mut ctx = dummy_context();
    let shader = color_shader(&mut ctx);
    let mut inspector = Inspector::default();
    inspector.set_visible(false);
    inspector.edit_shader(&shader);

    let mut ui = RecordingSurface::new().selecting("Stage", 1);
    inspector.render_gui(&mut ctx, &mut ui);
    let (stage, text) = inspector.editor_text().unwrap();
    assert_eq!(stage, ShaderStage::Fragment);
    assert_eq!(Some(text), shader.source(ShaderStage::Fragment));
}
