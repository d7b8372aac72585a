use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use rcomp_engine::Renderer;
use rcomp_engine::engine::SoftwareEngine;
use rcomp_engine::logging::{LoggingConfig, init_logging};
use rcomp_engine::window::HeadlessWindow;

mod scene;

use scene::Scene;

/// Renders a JSON scene through the software engine and saves the result as PNG.
#[derive(Parser, Debug)]
#[command(name = "rcomp-studio", version, about)]
struct Args {
    /// Scene description to render.
    scene: PathBuf,

    /// Output image; defaults to the scene path with a `.png` extension.
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Log filter, e.g. `debug` or `rcomp_engine::render=trace`.
    #[arg(long = "log")]
    log_filter: Option<String>,
}

impl Args {
    fn out_path(&self) -> PathBuf {
        self.out
            .clone()
            .unwrap_or_else(|| self.scene.with_extension("png"))
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let out = args.out_path();
    init_logging(LoggingConfig {
        env_filter: args.log_filter.clone(),
        ..LoggingConfig::default()
    });

    let text = std::fs::read_to_string(&args.scene)
        .with_context(|| format!("reading {}", args.scene.display()))?;
    let scene = Scene::from_json(&text)?;

    let mut engine = SoftwareEngine::new();
    let mut window = HeadlessWindow::with_border(&mut engine, scene.width, scene.height, scene.border)
        .context("failed to allocate the display surface")?;
    if scene.renderer.vsync {
        window.set_refresh_rate(60);
    }

    let mut renderer = Renderer::new(engine, Some(window), scene.renderer)?;
    let textures = scene.load_textures(&mut renderer)?;
    let list = scene.command_list(&renderer, &textures)?;

    for frame in 0..scene.frames {
        let stats = renderer.run(&list).with_context(|| format!("frame {frame}"))?;
        renderer.present().with_context(|| format!("presenting frame {frame}"))?;
        log::info!(
            "frame {frame}: {} commands, {} composite calls ({} failed), {} fills",
            stats.commands,
            stats.composite_calls,
            stats.failed_calls,
            stats.fills
        );
    }

    let pixels = renderer.read_pixels(None)?;
    let img = image::RgbaImage::from_raw(pixels.width, pixels.height, pixels.to_rgba_bytes())
        .context("pixel buffer does not match its size")?;
    img.save(&out)
        .with_context(|| format!("writing {}", out.display()))?;

    let diag = renderer.diagnostics();
    println!(
        "rendered {}x{} ({} frame(s)) -> {}  [engine failures: {}, unsupported: {}]",
        scene.width,
        scene.height,
        scene.frames,
        out.display(),
        diag.engine_failures(),
        diag.unsupported_total()
    );

    let (mut engine, window) = renderer.destroy();
    if let Some(window) = window {
        window.free(&mut engine);
    }
    Ok(())
}
