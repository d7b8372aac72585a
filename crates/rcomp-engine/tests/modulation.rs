//! Texture color modulation caching through the public renderer API.

use rcomp_engine::RendererConfig;
use rcomp_engine::coords::{ColorF, FRect, Rect};
use rcomp_engine::engine::{EngineCall, RecordingEngine, SoftwareEngine};
use rcomp_engine::render::{BlendMode, ModulationStats, PixelFormat, Renderer, TextureId, modulate_pixel};
use rcomp_engine::scene::CommandList;
use rcomp_engine::window::HeadlessWindow;
use test_log::test;

const BASE: u32 = 0xFFC8_6432;

fn setup() -> (Renderer<RecordingEngine>, TextureId) {
    let mut engine = RecordingEngine::new(SoftwareEngine::new());
    let window = HeadlessWindow::new(&mut engine, 16, 16).unwrap();
    let mut r = Renderer::new(engine, Some(window), RendererConfig::default()).unwrap();
    let tex = r.create_texture(4, 4, PixelFormat::Argb8888).unwrap();
    r.update_texture(tex, None, &uniform(4, 4, BASE), 16).unwrap();
    (r, tex)
}

fn uniform(w: usize, h: usize, argb: u32) -> Vec<u8> {
    std::iter::repeat_n(argb.to_ne_bytes(), w * h).flatten().collect()
}

fn queue_at(r: &Renderer<RecordingEngine>, list: &mut CommandList, tex: TextureId, x: f32, y: f32) {
    r.queue_copy(
        list,
        tex,
        ColorF::WHITE,
        BlendMode::None,
        FRect::new(0.0, 0.0, 4.0, 4.0),
        FRect::new(x, y, 4.0, 4.0),
    )
    .unwrap();
}

fn copy_frame(r: &mut Renderer<RecordingEngine>, tex: TextureId) {
    let mut list = CommandList::new();
    queue_at(r, &mut list, tex, 0.0, 0.0);
    r.run(&list).unwrap();
}

fn target_pixel(r: &mut Renderer<RecordingEngine>, x: u32, y: u32) -> u32 {
    r.read_pixels(None).unwrap().argb(x, y).unwrap()
}

fn stats(cache_populations: u64, recomputes: u64, region_updates: u64) -> ModulationStats {
    ModulationStats {
        cache_populations,
        recomputes,
        region_updates,
    }
}

#[test]
fn untinted_copy_never_touches_cache() {
    let (mut r, tex) = setup();
    copy_frame(&mut r, tex);
    assert_eq!(r.modulation_stats(tex).unwrap(), stats(0, 0, 0));
    assert_eq!(target_pixel(&mut r, 1, 1), BASE);
}

#[test]
fn same_tint_recomputes_once() {
    let (mut r, tex) = setup();
    r.set_texture_color_mod(tex, 0.5, 0.5, 0.5).unwrap();
    copy_frame(&mut r, tex);
    copy_frame(&mut r, tex);
    copy_frame(&mut r, tex);

    assert_eq!(r.modulation_stats(tex).unwrap(), stats(1, 1, 0));
    assert_eq!(target_pixel(&mut r, 1, 1), 0xFF64_3219);
}

#[test]
fn tint_change_reuses_cache() {
    let (mut r, tex) = setup();
    r.set_texture_color_mod(tex, 0.5, 0.5, 0.5).unwrap();
    copy_frame(&mut r, tex);
    r.set_texture_color_mod(tex, 1.0, 0.0, 0.25).unwrap();
    copy_frame(&mut r, tex);

    assert_eq!(r.modulation_stats(tex).unwrap(), stats(1, 2, 0));
    assert_eq!(target_pixel(&mut r, 2, 2), modulate_pixel(BASE, [1.0, 0.0, 0.25]));
}

#[test]
fn tint_change_within_one_queue_keeps_each_copy_tint() {
    let (mut r, tex) = setup();
    let mut list = CommandList::new();
    r.set_texture_color_mod(tex, 1.0, 0.0, 0.0).unwrap();
    queue_at(&r, &mut list, tex, 0.0, 0.0);
    r.set_texture_color_mod(tex, 0.0, 1.0, 0.0).unwrap();
    queue_at(&r, &mut list, tex, 8.0, 8.0);

    let frame = r.run(&list).unwrap();

    assert_eq!(frame.composite_calls, 2);
    assert_eq!(r.modulation_stats(tex).unwrap(), stats(1, 2, 0));
    assert_eq!(target_pixel(&mut r, 1, 1), 0xFFC8_0000);
    assert_eq!(target_pixel(&mut r, 9, 9), 0xFF00_6400);
}

#[test]
fn update_remodulates_only_the_region() {
    let (mut r, tex) = setup();
    r.set_texture_color_mod(tex, 0.5, 0.5, 0.5).unwrap();
    copy_frame(&mut r, tex);

    r.update_texture(tex, Some(Rect::new(0, 0, 2, 2)), &uniform(2, 2, 0xFFFF_FFFF), 8)
        .unwrap();
    copy_frame(&mut r, tex);

    assert_eq!(r.modulation_stats(tex).unwrap(), stats(1, 1, 1));
    assert_eq!(target_pixel(&mut r, 0, 0), 0xFF7F_7F7F);
    assert_eq!(target_pixel(&mut r, 3, 3), 0xFF64_3219);
}

#[test]
fn unlock_forces_recompute() {
    let (mut r, tex) = setup();
    r.set_texture_color_mod(tex, 0.5, 0.5, 0.5).unwrap();
    copy_frame(&mut r, tex);

    {
        let lock = r.lock_texture(tex, Some(Rect::new(3, 3, 1, 1))).unwrap();
        lock.pixels.copy_from_slice(&0xFF00_0000u32.to_ne_bytes());
    }
    r.unlock_texture(tex).unwrap();
    copy_frame(&mut r, tex);

    assert_eq!(r.modulation_stats(tex).unwrap(), stats(1, 2, 0));
    assert_eq!(target_pixel(&mut r, 3, 3), 0xFF00_0000);
    assert_eq!(target_pixel(&mut r, 0, 0), 0xFF64_3219);
}

#[test]
fn locked_texture_is_skipped() {
    let (mut r, tex) = setup();
    let _ = r.lock_texture(tex, None).unwrap();

    r.engine_mut().clear_calls();
    let mut list = CommandList::new();
    list.push_copy(
        tex,
        ColorF::WHITE,
        BlendMode::Blend,
        FRect::new(0.0, 0.0, 4.0, 4.0),
        FRect::new(0.0, 0.0, 4.0, 4.0),
    )
    .unwrap();
    let frame = r.run(&list).unwrap();

    assert_eq!(frame.skipped, 1);
    assert_eq!(r.engine().count(|c| matches!(c, EngineCall::Composite { .. })), 0);
}

#[test]
fn out_of_memory_leaves_texture_usable() {
    let (mut r, tex) = setup();
    copy_frame(&mut r, tex);
    r.set_texture_color_mod(tex, 0.5, 0.5, 0.5).unwrap();

    r.engine_mut().inner_mut().set_budget(Some(0));
    let mut list = CommandList::new();
    queue_at(&r, &mut list, tex, 0.0, 0.0);
    assert!(r.run(&list).is_err());

    r.engine_mut().inner_mut().set_budget(None);
    r.run(&list).unwrap();
    assert_eq!(r.modulation_stats(tex).unwrap().recomputes, 1);
}
