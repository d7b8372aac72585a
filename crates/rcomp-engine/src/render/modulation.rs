//! CPU-side texture color modulation.
//!
//! The engine cannot tint while compositing, so a tinted copy of each
//! modulated texture is kept in a second surface. It is recomputed from an
//! untinted RAM copy, and only when the tint changed.

use crate::coords::Rect;
use crate::engine::{CompositingEngine, LockedPixels};
use crate::error::{RenderError, Result};

use super::texture::{NO_TINT, Texture};

/// Outcome of `enable_modulation`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Modulation {
    /// Tint is `(1, 1, 1)`; draw the primary surface.
    Disabled,
    /// Modulated surface already matches the tint.
    Cached,
    /// Modulated surface was rewritten.
    Recomputed,
}

/// Scales R, G and B by `tint`, truncating and clamping; alpha is kept.
#[inline]
pub fn modulate_pixel(argb: u32, tint: [f32; 3]) -> u32 {
    let scale = |shift: u32, t: f32| -> u32 {
        let v = ((argb >> shift) & 0xFF) as f32 * t;
        (v.clamp(0.0, 255.0) as u32) << shift
    };
    (argb & 0xFF00_0000) | scale(16, tint[0]) | scale(8, tint[1]) | scale(0, tint[2])
}

/// Brings the modulated surface up to date with `tint`.
///
/// On allocation failure nothing is committed and the call may be retried.
pub(crate) fn enable_modulation<E: CompositingEngine>(
    engine: &mut E,
    tex: &mut Texture,
    tint: [f32; 3],
) -> Result<Modulation> {
    if tint == NO_TINT {
        return Ok(Modulation::Disabled);
    }
    if tex.cached_tint == Some(tint) && tex.modulated.is_some() {
        return Ok(Modulation::Cached);
    }

    let fresh_cache = match tex.ram_cache {
        Some(_) => None,
        None => Some(read_cache(engine, tex)?),
    };

    let modulated = match tex.modulated {
        Some(m) => m,
        None => engine
            .allocate_surface(tex.width, tex.height, 32)
            .ok_or(RenderError::oom("modulated texture surface"))?,
    };
    tex.modulated = Some(modulated);

    if let Some(cache) = fresh_cache {
        tex.ram_cache = Some(cache);
        tex.stats.cache_populations += 1;
    }

    let width = tex.width as usize;
    let Some(cache) = tex.ram_cache.as_deref() else {
        return Err(RenderError::oom("texture ram cache"));
    };

    let locked = engine.lock(modulated)?;
    write_modulated(locked, cache, width, tex.bounds(), tint);
    engine.unlock(modulated);

    tex.cached_tint = Some(tint);
    tex.stats.recomputes += 1;
    log::trace!("texture on {:?} remodulated with {tint:?}", tex.surface);
    Ok(Modulation::Recomputed)
}

/// Keeps caches coherent after caller pixels were written to `rect` of the
/// primary surface.
///
/// With a live cache and modulated surface only `rect` is recomputed, from
/// the caller's pixels and with the tint the surface already holds. Otherwise
/// a full pass runs if the texture is tinted.
pub(crate) fn update_region<E: CompositingEngine>(
    engine: &mut E,
    tex: &mut Texture,
    rect: Rect,
    pixels: &[u8],
    pitch: usize,
) -> Result<()> {
    let width = tex.width as usize;
    if let Some(cache) = tex.ram_cache.as_mut() {
        patch_cache(cache, width, rect, pixels, pitch);
    }

    match (tex.modulated, tex.cached_tint) {
        (Some(modulated), Some(tint)) if tex.ram_cache.is_some() => {
            let locked = engine.lock(modulated)?;
            write_modulated_rows(locked, pixels, pitch, rect, tint);
            engine.unlock(modulated);
            tex.stats.region_updates += 1;
            Ok(())
        }
        _ if tex.is_modulated() => {
            let tint = tex.tint;
            tex.cached_tint = None;
            enable_modulation(engine, tex, tint).map(|_| ())
        }
        _ => Ok(()),
    }
}

/// Re-reads `rect` of the primary surface into the RAM cache after a
/// lock/unlock cycle and marks the modulated surface stale.
pub(crate) fn refresh_region<E: CompositingEngine>(
    engine: &mut E,
    tex: &mut Texture,
    rect: Rect,
) -> Result<()> {
    let Some(cache) = tex.ram_cache.as_mut() else {
        return Ok(());
    };
    if rect.is_empty() {
        return Ok(());
    }

    let pitch = rect.w as usize * 4;
    let mut region = vec![0u8; pitch * rect.h as usize];
    engine.read_pixels(tex.surface, rect, &mut region, pitch)?;
    patch_cache(cache, tex.width as usize, rect, &region, pitch);
    tex.cached_tint = None;
    Ok(())
}

fn read_cache<E: CompositingEngine>(engine: &mut E, tex: &Texture) -> Result<Vec<u32>> {
    let count = tex.width as usize * tex.height as usize;
    let mut cache: Vec<u32> = Vec::new();
    cache
        .try_reserve_exact(count)
        .map_err(|_| RenderError::oom("texture ram cache"))?;
    cache.resize(count, 0);

    engine.read_pixels(
        tex.surface,
        tex.bounds(),
        bytemuck::cast_slice_mut(cache.as_mut_slice()),
        tex.width as usize * 4,
    )?;
    Ok(cache)
}

fn patch_cache(cache: &mut [u32], width: usize, rect: Rect, pixels: &[u8], pitch: usize) {
    for row in 0..rect.h as usize {
        let src = &pixels[row * pitch..row * pitch + rect.w as usize * 4];
        let off = (rect.y as usize + row) * width + rect.x as usize;
        for (dst, px) in cache[off..off + rect.w as usize]
            .iter_mut()
            .zip(src.chunks_exact(4))
        {
            *dst = u32::from_ne_bytes([px[0], px[1], px[2], px[3]]);
        }
    }
}

fn write_modulated(locked: LockedPixels<'_>, cache: &[u32], width: usize, bounds: Rect, tint: [f32; 3]) {
    for y in 0..bounds.h as usize {
        let src = &cache[y * width..(y + 1) * width];
        let dst = &mut locked.bytes[y * locked.pitch..y * locked.pitch + width * 4];
        for (out, &px) in dst.chunks_exact_mut(4).zip(src) {
            out.copy_from_slice(&modulate_pixel(px, tint).to_ne_bytes());
        }
    }
}

fn write_modulated_rows(
    locked: LockedPixels<'_>,
    pixels: &[u8],
    pitch: usize,
    rect: Rect,
    tint: [f32; 3],
) {
    let row_bytes = rect.w as usize * 4;
    for row in 0..rect.h as usize {
        let src = &pixels[row * pitch..row * pitch + row_bytes];
        let off = (rect.y as usize + row) * locked.pitch + rect.x as usize * 4;
        let dst = &mut locked.bytes[off..off + row_bytes];
        for (out, px) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
            let argb = u32::from_ne_bytes([px[0], px[1], px[2], px[3]]);
            out.copy_from_slice(&modulate_pixel(argb, tint).to_ne_bytes());
        }
    }
}
