//! Whole frames: queue, run, read back, present.

use rcomp_engine::RendererConfig;
use rcomp_engine::coords::{ColorF, FPoint, FRect, Rect, Rgba8};
use rcomp_engine::engine::{CompositingEngine, RecordingEngine, SoftwareEngine};
use rcomp_engine::render::{BlendMode, FlipMode, PixelFormat, QuadTransform, Renderer, ScaleMode, TextureId};
use rcomp_engine::scene::{CommandList, GeometryInput};
use rcomp_engine::window::{HeadlessWindow, Window};
use test_log::test;

const RED: Rgba8 = Rgba8::new(255, 0, 0, 255);
const BLUE: Rgba8 = Rgba8::new(0, 0, 255, 255);

fn renderer(w: u32, h: u32) -> Renderer<RecordingEngine> {
    let mut engine = RecordingEngine::new(SoftwareEngine::new());
    let window = HeadlessWindow::new(&mut engine, w, h).unwrap();
    Renderer::new(engine, Some(window), RendererConfig::default()).unwrap()
}

fn rgb(c: Option<Rgba8>) -> Option<(u8, u8, u8)> {
    c.map(|c| (c.r, c.g, c.b))
}

/// 2x2 texture: red, green / blue, white.
fn quad_texture(r: &mut Renderer<RecordingEngine>) -> TextureId {
    let tex = r.create_texture(2, 2, PixelFormat::Argb8888).unwrap();
    r.set_texture_scale_mode(tex, ScaleMode::Nearest).unwrap();
    let pixels: Vec<u8> = [0xFFFF_0000u32, 0xFF00_FF00, 0xFF00_00FF, 0xFFFF_FFFF]
        .iter()
        .flat_map(|p| p.to_ne_bytes())
        .collect();
    r.update_texture(tex, None, &pixels, 8).unwrap();
    tex
}

#[test]
fn clear_then_present_shows_on_display() {
    let mut r = renderer(100, 100);
    let mut list = CommandList::new();
    list.push_clear(ColorF::rgb(1.0, 0.0, 0.0));
    r.run(&list).unwrap();
    r.present().unwrap();

    let display = r.window().unwrap().display().unwrap().surface;
    let engine = r.engine().inner();
    for (x, y) in [(0, 0), (50, 50), (99, 99)] {
        assert_eq!(engine.pixel(display, x, y), Some(RED.to_argb()));
    }
}

#[test]
fn opaque_fill_covers_only_its_rect() {
    let mut r = renderer(100, 100);
    let mut list = CommandList::new();
    list.push_fill_rects(
        &[FRect::new(0.0, 0.0, 10.0, 10.0)],
        ColorF::rgb(0.0, 0.0, 1.0),
        BlendMode::None,
    )
    .unwrap();
    let stats = r.run(&list).unwrap();
    assert_eq!(stats.fills, 1);
    assert_eq!(stats.composite_calls, 0);

    let px = r.read_pixels(None).unwrap();
    assert_eq!(px.pixel(5, 5), Some(BLUE));
    assert_eq!(rgb(px.pixel(50, 50)), Some((0, 0, 0)));
}

#[test]
fn blended_fill_goes_through_solid_surface() {
    let mut r = renderer(20, 20);
    let mut list = CommandList::new();
    list.push_clear(ColorF::BLACK);
    list.push_fill_rects(
        &[FRect::new(2.0, 2.0, 4.0, 4.0), FRect::new(10.0, 10.0, 2.0, 2.0)],
        ColorF::rgb(0.0, 1.0, 0.0),
        BlendMode::Blend,
    )
    .unwrap();
    let stats = r.run(&list).unwrap();
    assert_eq!(stats.composite_calls, 1);

    let px = r.read_pixels(None).unwrap();
    assert_eq!(rgb(px.pixel(3, 3)), Some((0, 255, 0)));
    assert_eq!(rgb(px.pixel(11, 11)), Some((0, 255, 0)));
    assert_eq!(rgb(px.pixel(8, 8)), Some((0, 0, 0)));
}

#[test]
fn viewport_offsets_points_and_clip_limits_them() {
    let mut r = renderer(20, 20);
    let mut list = CommandList::new();
    list.push_viewport(Rect::new(5, 5, 10, 10));
    list.push_points(
        &[FPoint::new(0.0, 0.0), FPoint::new(12.0, 0.0)],
        ColorF::rgb(1.0, 0.0, 0.0),
        BlendMode::None,
    )
    .unwrap();
    r.run(&list).unwrap();

    let px = r.read_pixels(None).unwrap();
    assert_eq!(px.pixel(5, 5), Some(RED));
    // (17, 5) lies outside the viewport.
    assert_eq!(rgb(px.pixel(17, 5)), Some((0, 0, 0)));
}

#[test]
fn line_joints_are_drawn_once() {
    let mut r = renderer(10, 10);
    let mut list = CommandList::new();
    list.push_clear(ColorF::BLACK);
    list.push_lines(
        &[FPoint::new(1.0, 1.0), FPoint::new(5.0, 1.0), FPoint::new(5.0, 5.0)],
        ColorF::new(1.0, 1.0, 1.0, 0.5),
        BlendMode::Add,
    )
    .unwrap();
    r.run(&list).unwrap();

    let px = r.read_pixels(None).unwrap();
    let joint = px.pixel(5, 1).unwrap();
    let mid = px.pixel(3, 1).unwrap();
    assert_eq!(joint, mid);
    assert_eq!(rgb(px.pixel(5, 5)), rgb(Some(mid)));
}

#[test]
fn copy_places_texels() {
    let mut r = renderer(8, 8);
    let tex = quad_texture(&mut r);
    let mut list = CommandList::new();
    list.push_copy(
        tex,
        ColorF::WHITE,
        BlendMode::None,
        FRect::new(0.0, 0.0, 2.0, 2.0),
        FRect::new(2.0, 2.0, 4.0, 4.0),
    )
    .unwrap();
    r.run(&list).unwrap();

    let px = r.read_pixels(None).unwrap();
    assert_eq!(rgb(px.pixel(2, 2)), Some((255, 0, 0)));
    assert_eq!(rgb(px.pixel(5, 2)), Some((0, 255, 0)));
    assert_eq!(rgb(px.pixel(2, 5)), Some((0, 0, 255)));
    assert_eq!(rgb(px.pixel(5, 5)), Some((255, 255, 255)));
    assert_eq!(rgb(px.pixel(1, 1)), Some((0, 0, 0)));
}

#[test]
fn horizontal_flip_mirrors_texels() {
    let mut r = renderer(8, 8);
    let tex = quad_texture(&mut r);
    let xf = QuadTransform {
        flip: FlipMode::Horizontal,
        ..QuadTransform::default()
    };
    let mut list = CommandList::new();
    list.push_copy_ex(
        tex,
        ColorF::WHITE,
        BlendMode::None,
        FRect::new(0.0, 0.0, 2.0, 2.0),
        FRect::new(0.0, 0.0, 4.0, 4.0),
        &xf,
    )
    .unwrap();
    r.run(&list).unwrap();

    let px = r.read_pixels(None).unwrap();
    assert_eq!(rgb(px.pixel(0, 0)), Some((0, 255, 0)));
    assert_eq!(rgb(px.pixel(3, 0)), Some((255, 0, 0)));
    assert_eq!(rgb(px.pixel(0, 3)), Some((255, 255, 255)));
}

#[test]
fn textured_geometry_samples_primary_surface() {
    let mut r = renderer(8, 8);
    let tex = quad_texture(&mut r);
    r.set_texture_color_mod(tex, 0.0, 0.0, 0.0).unwrap();

    let positions = [
        FPoint::new(0.0, 0.0),
        FPoint::new(8.0, 0.0),
        FPoint::new(0.0, 8.0),
    ];
    let uvs = [
        FPoint::new(0.0, 0.0),
        FPoint::new(0.5, 0.0),
        FPoint::new(0.0, 0.5),
    ];
    let mut list = CommandList::new();
    list.push_geometry(Some(tex), ColorF::WHITE, BlendMode::None, &GeometryInput::new(&positions, &uvs))
        .unwrap();
    let stats = r.run(&list).unwrap();
    assert_eq!(stats.composite_calls, 1);

    // Tint is ignored for geometry.
    let px = r.read_pixels(None).unwrap();
    assert_eq!(rgb(px.pixel(1, 1)), Some((255, 0, 0)));
}

#[test]
fn texture_target_receives_draws() {
    let mut r = renderer(8, 8);
    let target = r.create_texture(4, 4, PixelFormat::Argb8888).unwrap();
    r.set_render_target(Some(target)).unwrap();

    let mut list = CommandList::new();
    list.push_clear(ColorF::rgb(0.0, 0.0, 1.0));
    r.run(&list).unwrap();
    assert_eq!(r.read_pixels(None).unwrap().pixel(3, 3), Some(BLUE));

    r.set_render_target(None).unwrap();
    let window_px = r.read_pixels(None).unwrap();
    assert_eq!(window_px.pixel(0, 0), Some(Rgba8::TRANSPARENT));

    // The target texture can now be copied like any other.
    let mut list = CommandList::new();
    list.push_copy(
        target,
        ColorF::WHITE,
        BlendMode::None,
        FRect::new(0.0, 0.0, 4.0, 4.0),
        FRect::new(0.0, 0.0, 4.0, 4.0),
    )
    .unwrap();
    r.run(&list).unwrap();
    assert_eq!(r.read_pixels(None).unwrap().pixel(2, 2), Some(BLUE));
}

#[test]
fn present_after_resize_uses_new_size() {
    let mut r = renderer(10, 10);
    let mut list = CommandList::new();
    list.push_clear(ColorF::rgb(1.0, 0.0, 0.0));
    r.run(&list).unwrap();

    {
        let (engine, window) = r.parts_mut();
        window.unwrap().resize(engine, 30, 5);
    }
    r.window_resized();
    r.run(&list).unwrap();
    r.present().unwrap();

    let display = r.window().unwrap().display().unwrap().surface;
    assert_eq!(r.engine().inner().surface_size(display), Some((30, 5)));
    assert_eq!(r.engine().inner().pixel(display, 29, 4), Some(RED.to_argb()));
}
