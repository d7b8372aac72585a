use crate::config::RendererConfig;
use crate::coords::{ColorF, FRect, Rect};
use crate::engine::{CompositingEngine, LockedPixels, SurfaceId, Vertex};
use crate::error::{RenderError, Result};
use crate::logging::{Diagnostics, DiagnosticsSink};
use crate::scene::{CommandList, RenderCommand, VertexArena};
use crate::window::{HeadlessWindow, Window};

use super::blend::{BlendMode, ScaleMode};
use super::clip::{ClipState, ClipTracker};
use super::modulation;
use super::pixels::PixelBuffer;
use super::processor::{FrameStats, Processor};
use super::vertex::QuadTransform;
use super::texture::{ModulationStats, PixelFormat, Texture, TextureId, TextureStore};

/// Direct write access to a locked texture region.
///
/// `pixels` starts at the region's top-left pixel; rows are `pitch` bytes
/// apart. Release with `Renderer::unlock_texture`.
#[derive(Debug)]
pub struct TextureLock<'a> {
    pub pixels: &'a mut [u8],
    pub pitch: usize,
    pub rect: Rect,
}

/// Batched 2D renderer bound to one window (or none, for offscreen use).
///
/// Targets are allocated lazily: the window target on first activation and
/// again after `window_resized`.
pub struct Renderer<E: CompositingEngine, W: Window = HeadlessWindow> {
    engine: E,
    window: Option<W>,
    config: RendererConfig,
    vsync: bool,

    /// Window-sized target; `None` until activation or after a resize.
    window_target: Option<SurfaceId>,
    /// Texture bound with `set_render_target`.
    texture_target: Option<TextureId>,
    /// Surface the clip tracker was last reset for.
    active: Option<SurfaceId>,

    solid: Option<SurfaceId>,
    solid_color: Option<u32>,

    textures: TextureStore,
    clip: ClipTracker,
    diagnostics: Diagnostics,

    scratch: Vec<Vertex>,
    rects: Vec<Rect>,
}

impl<E: CompositingEngine, W: Window> Renderer<E, W> {
    pub fn new(engine: E, window: Option<W>, config: RendererConfig) -> Result<Self> {
        let diagnostics = Diagnostics::new(config.diagnostics);
        Self::with_diagnostics(engine, window, config, diagnostics)
    }

    /// Like `new`, routing rate-limited diagnostics to `sink`.
    pub fn with_sink(
        engine: E,
        window: Option<W>,
        config: RendererConfig,
        sink: Box<dyn DiagnosticsSink>,
    ) -> Result<Self> {
        let diagnostics = Diagnostics::with_sink(config.diagnostics, sink);
        Self::with_diagnostics(engine, window, config, diagnostics)
    }

    fn with_diagnostics(
        engine: E,
        window: Option<W>,
        config: RendererConfig,
        diagnostics: Diagnostics,
    ) -> Result<Self> {
        let bounds = window
            .as_ref()
            .map(|w| {
                let (width, height) = w.size();
                Rect::from_size(width, height)
            })
            .unwrap_or_default();

        log::info!(
            "renderer created (window: {}, vsync: {}, max quads: {})",
            window.is_some(),
            config.vsync,
            config.effective_max_quads()
        );

        Ok(Self {
            engine,
            window,
            vsync: config.vsync,
            config,
            window_target: None,
            texture_target: None,
            active: None,
            solid: None,
            solid_color: None,
            textures: TextureStore::default(),
            clip: ClipTracker::new(bounds),
            diagnostics,
            scratch: Vec::new(),
            rects: Vec::new(),
        })
    }

    // ── accessors ─────────────────────────────────────────────────────────

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn window(&self) -> Option<&W> {
        self.window.as_ref()
    }

    /// Engine and window together, e.g. to resize a headless window.
    pub fn parts_mut(&mut self) -> (&mut E, Option<&mut W>) {
        (&mut self.engine, self.window.as_mut())
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn clip_state(&self) -> ClipState {
        self.clip.state()
    }

    pub fn vsync(&self) -> bool {
        self.vsync
    }

    pub fn set_vsync(&mut self, enabled: bool) {
        log::debug!("vsync {}", if enabled { "on" } else { "off" });
        self.vsync = enabled;
    }

    /// Accepted for API parity; the renderer caches no engine state that
    /// could go stale behind its back.
    pub fn invalidate_cached_state(&mut self) {}

    // ── targets ───────────────────────────────────────────────────────────

    /// Resolves the current target, allocating the window target and the
    /// solid-color surface on demand. Returns the surface and whether it
    /// belongs to a texture.
    pub fn activate(&mut self) -> Result<(SurfaceId, bool)> {
        if self.solid.is_none() {
            let solid = self
                .engine
                .allocate_surface(1, 1, 32)
                .ok_or(RenderError::oom("solid color surface"))?;
            self.solid = Some(solid);
            self.solid_color = None;
        }

        let bound = self
            .texture_target
            .and_then(|id| self.textures.get(id))
            .map(|tex| tex.surface);
        let (surface, is_texture) = match bound {
            Some(surface) => (surface, true),
            None => (self.ensure_window_target()?, false),
        };

        if self.active != Some(surface) {
            let (w, h) = self
                .engine
                .surface_size(surface)
                .ok_or(RenderError::NoRenderTarget)?;
            self.clip.reset(Rect::from_size(w, h));
            self.active = Some(surface);
        }

        Ok((surface, is_texture))
    }

    fn ensure_window_target(&mut self) -> Result<SurfaceId> {
        if let Some(surface) = self.window_target {
            return Ok(surface);
        }

        let window = self.window.as_ref().ok_or(RenderError::NoRenderTarget)?;
        let (width, height) = window.size();
        let surface = self
            .engine
            .allocate_surface(width, height, 32)
            .ok_or(RenderError::oom("window render target"))?;
        log::debug!("allocated {width}x{height} window target {surface:?}");
        self.window_target = Some(surface);
        Ok(surface)
    }

    /// Frees the window target; the next activation reallocates it at the
    /// window's new size.
    pub fn window_resized(&mut self) {
        if let Some(surface) = self.window_target.take() {
            log::debug!("window resized, dropping target {surface:?}");
            self.engine.free_surface(surface);
            if self.active == Some(surface) {
                self.active = None;
            }
        }
    }

    /// Binds draws to `texture`'s surface, or back to the window with `None`.
    pub fn set_render_target(&mut self, texture: Option<TextureId>) -> Result<()> {
        if let Some(id) = texture {
            if self.textures.get(id).is_none() {
                return Err(RenderError::InvalidTexture(id));
            }
        }
        self.texture_target = texture;
        Ok(())
    }

    pub fn render_target(&self) -> Option<TextureId> {
        self.texture_target
    }

    pub fn output_size(&mut self) -> Result<(u32, u32)> {
        let (surface, _) = self.activate()?;
        self.engine
            .surface_size(surface)
            .ok_or(RenderError::NoRenderTarget)
    }

    // ── textures ──────────────────────────────────────────────────────────

    /// Creates a zero-filled texture. Only `PixelFormat::Argb8888` is accepted.
    pub fn create_texture(&mut self, width: u32, height: u32, format: PixelFormat) -> Result<TextureId> {
        if format != PixelFormat::Argb8888 {
            return Err(RenderError::UnsupportedFormat(format));
        }
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidRect);
        }

        let surface = self
            .engine
            .allocate_surface(width, height, 32)
            .ok_or(RenderError::oom("texture surface"))?;
        let id = self.textures.insert(Texture::new(surface, width, height));
        log::debug!("texture {id:?} {width}x{height} on {surface:?}");
        Ok(id)
    }

    fn texture(&self, id: TextureId) -> Result<&Texture> {
        self.textures.get(id).ok_or(RenderError::InvalidTexture(id))
    }

    fn texture_mut(&mut self, id: TextureId) -> Result<&mut Texture> {
        self.textures
            .get_mut(id)
            .ok_or(RenderError::InvalidTexture(id))
    }

    pub fn texture_size(&self, id: TextureId) -> Result<(u32, u32)> {
        let tex = self.texture(id)?;
        Ok((tex.width, tex.height))
    }

    /// RGB tint applied when the texture is copied; `(1, 1, 1)` disables it.
    /// Negative and NaN factors are treated as 0.
    pub fn set_texture_color_mod(&mut self, id: TextureId, r: f32, g: f32, b: f32) -> Result<()> {
        let sanitize = |v: f32| if v.is_nan() { 0.0 } else { v.max(0.0) };
        self.texture_mut(id)?.tint = [sanitize(r), sanitize(g), sanitize(b)];
        Ok(())
    }

    pub fn texture_color_mod(&self, id: TextureId) -> Result<[f32; 3]> {
        Ok(self.texture(id)?.tint)
    }

    /// Queues a copy of `id` carrying its current color modulation.
    ///
    /// Later `set_texture_color_mod` calls do not affect copies already
    /// queued.
    pub fn queue_copy(
        &self,
        list: &mut CommandList,
        id: TextureId,
        color: ColorF,
        blend: BlendMode,
        src: FRect,
        dst: FRect,
    ) -> Result<()> {
        let tint = self.texture(id)?.tint;
        list.push_tinted_copy(id, tint, color, blend, src, dst, None)
    }

    /// `queue_copy` with rotation, flip and scale.
    #[allow(clippy::too_many_arguments)]
    pub fn queue_copy_ex(
        &self,
        list: &mut CommandList,
        id: TextureId,
        color: ColorF,
        blend: BlendMode,
        src: FRect,
        dst: FRect,
        transform: &QuadTransform,
    ) -> Result<()> {
        let tint = self.texture(id)?.tint;
        list.push_tinted_copy(id, tint, color, blend, src, dst, Some(transform))
    }

    pub fn set_texture_blend_mode(&mut self, id: TextureId, mode: BlendMode) -> Result<()> {
        self.texture_mut(id)?.blend_mode = mode;
        if mode == BlendMode::Mod {
            self.diagnostics.unsupported("blend-mod");
        }
        Ok(())
    }

    pub fn texture_blend_mode(&self, id: TextureId) -> Result<BlendMode> {
        Ok(self.texture(id)?.blend_mode)
    }

    /// Anything but `Nearest` enables bilinear source filtering.
    pub fn set_texture_scale_mode(&mut self, id: TextureId, mode: ScaleMode) -> Result<()> {
        self.texture_mut(id)?.scale_mode = mode;
        Ok(())
    }

    pub fn modulation_stats(&self, id: TextureId) -> Result<ModulationStats> {
        Ok(self.texture(id)?.stats)
    }

    /// Copies caller ARGB8888 rows into `rect` (whole texture if `None`).
    ///
    /// With a tint active the modulated copy is brought up to date before
    /// returning.
    pub fn update_texture(
        &mut self,
        id: TextureId,
        rect: Option<Rect>,
        pixels: &[u8],
        pitch: usize,
    ) -> Result<()> {
        let tex = self
            .textures
            .get_mut(id)
            .ok_or(RenderError::InvalidTexture(id))?;
        if tex.locked.is_some() {
            return Err(RenderError::TextureLocked(id));
        }

        let rect = rect.unwrap_or(tex.bounds());
        if rect.is_empty() || !tex.bounds().contains_rect(rect) {
            return Err(RenderError::InvalidRect);
        }

        self.engine.write_pixels(tex.surface, rect, pixels, pitch)?;
        modulation::update_region(&mut self.engine, tex, rect, pixels, pitch)
    }

    /// Maps `rect` (whole texture if `None`) of the primary surface for writing.
    ///
    /// The texture is skipped by draws until `unlock_texture`.
    pub fn lock_texture(&mut self, id: TextureId, rect: Option<Rect>) -> Result<TextureLock<'_>> {
        let tex = self
            .textures
            .get_mut(id)
            .ok_or(RenderError::InvalidTexture(id))?;
        if tex.locked.is_some() {
            return Err(RenderError::TextureLocked(id));
        }

        let rect = rect.unwrap_or(tex.bounds());
        if rect.is_empty() || !tex.bounds().contains_rect(rect) {
            return Err(RenderError::InvalidRect);
        }

        let LockedPixels { bytes, pitch, .. } = self.engine.lock(tex.surface)?;
        tex.locked = Some(rect);

        let start = rect.y as usize * pitch + rect.x as usize * 4;
        let end = (rect.bottom() as usize - 1) * pitch + rect.right() as usize * 4;
        Ok(TextureLock {
            pixels: &mut bytes[start..end],
            pitch,
            rect,
        })
    }

    /// Releases a lock taken with `lock_texture`. Unlocked textures are a no-op.
    pub fn unlock_texture(&mut self, id: TextureId) -> Result<()> {
        let tex = self
            .textures
            .get_mut(id)
            .ok_or(RenderError::InvalidTexture(id))?;
        let Some(rect) = tex.locked.take() else {
            return Ok(());
        };

        self.engine.unlock(tex.surface);
        modulation::refresh_region(&mut self.engine, tex, rect)
    }

    /// Frees the texture's surfaces and caches. Returns `false` for unknown
    /// or already destroyed handles. A texture bound as target is unbound.
    pub fn destroy_texture(&mut self, id: TextureId) -> bool {
        let Some(tex) = self.textures.remove(id) else {
            return false;
        };

        if tex.locked.is_some() {
            self.engine.unlock(tex.surface);
        }
        for surface in tex.surfaces() {
            self.engine.free_surface(surface);
            if self.active == Some(surface) {
                self.active = None;
            }
        }
        if self.texture_target == Some(id) {
            self.texture_target = None;
        }
        log::debug!("texture {id:?} destroyed");
        true
    }

    // ── frames ────────────────────────────────────────────────────────────

    /// Executes a command queue against the current target.
    ///
    /// Engine failures inside the queue are logged (rate-limited) and skipped.
    pub fn run_command_queue(
        &mut self,
        commands: &[RenderCommand],
        arena: &VertexArena,
    ) -> Result<FrameStats> {
        let (target, target_is_texture) = self.activate()?;
        let solid = self.solid.ok_or(RenderError::NoRenderTarget)?;

        let processor = Processor {
            engine: &mut self.engine,
            textures: &mut self.textures,
            clip: &mut self.clip,
            diagnostics: &mut self.diagnostics,
            scratch: &mut self.scratch,
            rects: &mut self.rects,
            target,
            target_is_texture,
            solid,
            solid_color: &mut self.solid_color,
            max_quads: self.config.effective_max_quads(),
        };
        let stats = processor.run(commands, arena)?;
        log::trace!("frame: {stats:?}");
        Ok(stats)
    }

    pub fn run(&mut self, list: &CommandList) -> Result<FrameStats> {
        self.run_command_queue(list.commands(), list.arena())
    }

    /// Reads `rect` (whole target if `None`) of the current target.
    pub fn read_pixels(&mut self, rect: Option<Rect>) -> Result<PixelBuffer> {
        let (surface, _) = self.activate()?;
        let bounds = self.clip.bounds();
        let rect = rect.unwrap_or(bounds);
        if rect.is_empty() || !bounds.contains_rect(rect) {
            return Err(RenderError::InvalidRect);
        }

        let pitch = rect.w as usize * 4;
        let mut bytes = vec![0u8; pitch * rect.h as usize];
        self.engine.read_pixels(surface, rect, &mut bytes, pitch)?;
        Ok(PixelBuffer::from_ne_bytes(rect.w as u32, rect.h as u32, &bytes))
    }

    /// Blits the window target onto the window's display surface.
    ///
    /// Waits for vertical blank first when vsync is on; the blit runs under
    /// the window's layer lock. Without a window or a mapped display this
    /// does nothing.
    pub fn present(&mut self) -> Result<()> {
        if self.window.is_none() {
            return Ok(());
        }
        let source = self.ensure_window_target()?;

        let Some(window) = self.window.as_mut() else {
            return Ok(());
        };
        let Some(display) = window.display() else {
            return Ok(());
        };

        if self.vsync {
            window.wait_vblank();
        }

        let (win_w, win_h) = window.size();
        let width = win_w.min(display.width);
        let height = win_h.min(display.height);

        let result = {
            let _layer = window.lock_layer();
            self.engine.blit(
                source,
                display.surface,
                Rect::from_size(width, height),
                display.x,
                display.y,
            )
        };

        result.map_err(|e| {
            log::error!("present blit failed: {e}");
            RenderError::EngineFailure(e)
        })
    }

    /// Frees every surface the renderer owns and hands back the engine and window.
    pub fn destroy(mut self) -> (E, Option<W>) {
        let textures: Vec<Texture> = self.textures.drain().collect();
        for tex in textures {
            if tex.locked.is_some() {
                self.engine.unlock(tex.surface);
            }
            for surface in tex.surfaces() {
                self.engine.free_surface(surface);
            }
        }
        if let Some(surface) = self.window_target.take() {
            self.engine.free_surface(surface);
        }
        if let Some(surface) = self.solid.take() {
            self.engine.free_surface(surface);
        }
        log::debug!("renderer destroyed");
        (self.engine, self.window)
    }
}
