//! Texture records and their generational store.

use crate::coords::Rect;
use crate::engine::SurfaceId;

use super::{BlendMode, ScaleMode};

/// Texture pixel formats a caller may ask for. Only `Argb8888` is accepted.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    Argb8888,
    Abgr8888,
    Rgba8888,
    Bgra8888,
    Xrgb8888,
    Rgb565,
}

impl PixelFormat {
    #[inline]
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Rgb565 => 2,
            _ => 4,
        }
    }
}

/// Generational texture handle. Stale handles never resolve to a newer texture.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId {
    index: u32,
    generation: u32,
}

impl TextureId {
    #[inline]
    pub const fn from_raw_parts(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    #[inline]
    pub const fn index(self) -> u32 {
        self.index
    }

    #[inline]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

/// Modulation work done for one texture.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct ModulationStats {
    /// RAM cache filled from the primary surface.
    pub cache_populations: u64,
    /// Full recomputes of the modulated surface.
    pub recomputes: u64,
    /// Partial recomputes driven by `update_texture`.
    pub region_updates: u64,
}

/// Tint that disables modulation.
pub(crate) const NO_TINT: [f32; 3] = [1.0, 1.0, 1.0];

#[derive(Debug)]
pub(crate) struct Texture {
    pub width: u32,
    pub height: u32,
    pub surface: SurfaceId,
    /// Tinted copy of `surface`; present only once modulation was needed.
    pub modulated: Option<SurfaceId>,
    /// Untinted ARGB copy of `surface`, filled once.
    pub ram_cache: Option<Vec<u32>>,
    /// Color modulation recorded into copies queued through the renderer.
    pub tint: [f32; 3],
    /// Tint the modulated surface was last computed with.
    pub cached_tint: Option<[f32; 3]>,
    pub blend_mode: BlendMode,
    pub scale_mode: ScaleMode,
    pub locked: Option<Rect>,
    pub stats: ModulationStats,
}

impl Texture {
    pub fn new(surface: SurfaceId, width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            surface,
            modulated: None,
            ram_cache: None,
            tint: NO_TINT,
            cached_tint: None,
            blend_mode: BlendMode::default(),
            scale_mode: ScaleMode::default(),
            locked: None,
            stats: ModulationStats::default(),
        }
    }

    #[inline]
    pub fn bounds(&self) -> Rect {
        Rect::from_size(self.width, self.height)
    }

    #[inline]
    pub fn is_modulated(&self) -> bool {
        self.tint != NO_TINT
    }

    /// Surface a copy with `tint` should sample: the modulated copy once it
    /// holds that tint, the primary surface otherwise.
    #[inline]
    pub fn source_surface(&self, tint: [f32; 3]) -> SurfaceId {
        match self.modulated {
            Some(m) if tint != NO_TINT && self.cached_tint == Some(tint) => m,
            _ => self.surface,
        }
    }

    /// Surfaces owned by this texture, for freeing.
    pub fn surfaces(&self) -> impl Iterator<Item = SurfaceId> {
        std::iter::once(self.surface).chain(self.modulated)
    }
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    texture: Option<Texture>,
}

/// Slot map of textures keyed by `TextureId`.
#[derive(Debug, Default)]
pub(crate) struct TextureStore {
    slots: Vec<Slot>,
    free: Vec<u32>,
}

impl TextureStore {
    pub fn insert(&mut self, texture: Texture) -> TextureId {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.texture = Some(texture);
            return TextureId::from_raw_parts(index, slot.generation);
        }

        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 1,
            texture: Some(texture),
        });
        TextureId::from_raw_parts(index, 1)
    }

    pub fn get(&self, id: TextureId) -> Option<&Texture> {
        self.slots
            .get(id.index as usize)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.texture.as_ref())
    }

    pub fn get_mut(&mut self, id: TextureId) -> Option<&mut Texture> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.texture.as_mut())
    }

    /// Removes and returns the texture; the slot's generation is bumped.
    pub fn remove(&mut self, id: TextureId) -> Option<Texture> {
        let slot = self
            .slots
            .get_mut(id.index as usize)
            .filter(|s| s.generation == id.generation)?;
        let texture = slot.texture.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        Some(texture)
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.texture.is_some()).count()
    }

    pub fn drain(&mut self) -> impl Iterator<Item = Texture> + '_ {
        self.free.clear();
        self.slots.drain(..).filter_map(|s| s.texture)
    }
}
