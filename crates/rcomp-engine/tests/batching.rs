//! Copy coalescing as seen from the engine side.

use proptest::prelude::*;
use rcomp_engine::RendererConfig;
use rcomp_engine::coords::{ColorF, FRect};
use rcomp_engine::engine::{MAX_QUADS, RecordingEngine, SoftwareEngine};
use rcomp_engine::render::{BlendMode, PixelFormat, Renderer, TextureId};
use rcomp_engine::scene::CommandList;
use rcomp_engine::window::HeadlessWindow;

fn setup(config: RendererConfig) -> (Renderer<RecordingEngine>, TextureId) {
    let mut engine = RecordingEngine::new(SoftwareEngine::new());
    let window = HeadlessWindow::new(&mut engine, 64, 64).unwrap();
    let mut r = Renderer::new(engine, Some(window), config).unwrap();
    let tex = r.create_texture(4, 4, PixelFormat::Argb8888).unwrap();
    (r, tex)
}

fn push_copies(list: &mut CommandList, tex: TextureId, count: usize, blend: BlendMode) {
    for i in 0..count {
        let x = (i % 60) as f32;
        let y = ((i / 60) % 60) as f32;
        list.push_copy(
            tex,
            ColorF::WHITE,
            blend,
            FRect::new(0.0, 0.0, 4.0, 4.0),
            FRect::new(x, y, 4.0, 4.0),
        )
        .unwrap();
    }
}

#[test]
fn identical_copies_share_one_call() {
    let (mut r, tex) = setup(RendererConfig::default());
    let mut list = CommandList::new();
    push_copies(&mut list, tex, 7, BlendMode::Blend);

    r.engine_mut().clear_calls();
    let stats = r.run(&list).unwrap();

    let calls = r.engine().composite_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, 14);
    assert_eq!(stats.composite_calls, 1);
}

#[test]
fn blend_change_breaks_batch() {
    let (mut r, tex) = setup(RendererConfig::default());
    let mut list = CommandList::new();
    push_copies(&mut list, tex, 3, BlendMode::Blend);
    push_copies(&mut list, tex, 2, BlendMode::Add);
    push_copies(&mut list, tex, 1, BlendMode::Blend);

    r.engine_mut().clear_calls();
    r.run(&list).unwrap();

    let triangles: Vec<usize> = r.engine().composite_calls().iter().map(|c| c.0).collect();
    assert_eq!(triangles, vec![6, 4, 2]);
}

#[test]
fn state_command_breaks_batch() {
    let (mut r, tex) = setup(RendererConfig::default());
    let mut list = CommandList::new();
    push_copies(&mut list, tex, 2, BlendMode::Blend);
    list.push_no_op();
    push_copies(&mut list, tex, 2, BlendMode::Blend);

    r.engine_mut().clear_calls();
    r.run(&list).unwrap();
    assert_eq!(r.engine().composite_calls().len(), 2);
}

#[test]
fn lowered_quad_limit_splits_sooner() {
    let config = RendererConfig {
        max_quads: 3,
        ..RendererConfig::default()
    };
    let (mut r, tex) = setup(config);
    let mut list = CommandList::new();
    push_copies(&mut list, tex, 7, BlendMode::Blend);

    r.engine_mut().clear_calls();
    r.run(&list).unwrap();

    let triangles: Vec<usize> = r.engine().composite_calls().iter().map(|c| c.0).collect();
    assert_eq!(triangles, vec![6, 6, 2]);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(12))]

    #[test]
    fn copies_split_at_max_quads(count in 1usize..=2 * MAX_QUADS + 50) {
        let (mut r, tex) = setup(RendererConfig::default());
        let mut list = CommandList::new();
        push_copies(&mut list, tex, count, BlendMode::Blend);

        r.engine_mut().clear_calls();
        r.run(&list).unwrap();

        let calls = r.engine().composite_calls();
        prop_assert_eq!(calls.len(), count.div_ceil(MAX_QUADS));
        prop_assert!(calls.iter().all(|c| c.0 <= 2 * MAX_QUADS));
        prop_assert_eq!(calls.iter().map(|c| c.0).sum::<usize>(), 2 * count);
    }
}
