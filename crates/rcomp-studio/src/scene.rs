//! JSON scene description and its translation into command lists.

use std::collections::HashMap;

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use rcomp_engine::RendererConfig;
use rcomp_engine::coords::{ColorF, FPoint, FRect, Rect};
use rcomp_engine::engine::CompositingEngine;
use rcomp_engine::render::{BlendMode, FlipMode, PixelFormat, QuadTransform, Renderer, ScaleMode, TextureId};
use rcomp_engine::scene::{CommandList, GeometryInput, Indices};
use rcomp_engine::window::Window;

#[derive(Debug, Deserialize)]
pub struct Scene {
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub border: u32,
    /// Frames to run and present; each replays `commands`.
    #[serde(default = "one")]
    pub frames: u32,
    #[serde(default)]
    pub renderer: RendererConfig,
    #[serde(default)]
    pub textures: Vec<TextureSpec>,
    pub commands: Vec<Op>,
}

fn one() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
pub struct TextureSpec {
    pub name: String,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub fill: TextureFill,
    #[serde(default)]
    pub color_mod: Option<[f32; 3]>,
    #[serde(default)]
    pub blend: Option<BlendMode>,
    #[serde(default)]
    pub scale: Option<ScaleMode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextureFill {
    Solid([f32; 4]),
    Checker { a: [f32; 4], b: [f32; 4], cell: u32 },
    Gradient { from: [f32; 4], to: [f32; 4] },
}

impl Default for TextureFill {
    fn default() -> Self {
        TextureFill::Solid([1.0; 4])
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Op {
    Clear {
        color: [f32; 4],
    },
    Viewport {
        rect: [i32; 4],
    },
    Clip {
        rect: Option<[i32; 4]>,
    },
    Points {
        points: Vec<[f32; 2]>,
        color: [f32; 4],
        #[serde(default)]
        blend: BlendMode,
    },
    Lines {
        points: Vec<[f32; 2]>,
        color: [f32; 4],
        #[serde(default)]
        blend: BlendMode,
    },
    FillRects {
        rects: Vec<[f32; 4]>,
        color: [f32; 4],
        #[serde(default)]
        blend: BlendMode,
    },
    Copy {
        texture: String,
        #[serde(default)]
        src: Option<[f32; 4]>,
        dst: [f32; 4],
        #[serde(default = "white")]
        color: [f32; 4],
        #[serde(default)]
        blend: Option<BlendMode>,
        #[serde(default)]
        angle: f64,
        /// Rotation center relative to `dst`; its middle when absent.
        #[serde(default)]
        center: Option<[f32; 2]>,
        #[serde(default)]
        flip: FlipMode,
        /// Overrides the texture's `color_mod` for this copy only.
        #[serde(default)]
        tint: Option<[f32; 3]>,
    },
    Geometry {
        texture: String,
        positions: Vec<[f32; 2]>,
        uvs: Vec<[f32; 2]>,
        #[serde(default)]
        indices: Option<Vec<u32>>,
        #[serde(default = "white")]
        color: [f32; 4],
        #[serde(default)]
        blend: Option<BlendMode>,
    },
}

fn white() -> [f32; 4] {
    [1.0; 4]
}

fn color([r, g, b, a]: [f32; 4]) -> ColorF {
    ColorF::new(r, g, b, a)
}

fn point([x, y]: [f32; 2]) -> FPoint {
    FPoint::new(x, y)
}

fn frect([x, y, w, h]: [f32; 4]) -> FRect {
    FRect::new(x, y, w, h)
}

fn rect([x, y, w, h]: [i32; 4]) -> Rect {
    Rect::new(x, y, w, h)
}

impl Scene {
    pub fn from_json(text: &str) -> Result<Self> {
        let scene: Scene = serde_json::from_str(text).context("invalid scene JSON")?;
        anyhow::ensure!(scene.width > 0 && scene.height > 0, "scene has zero size");
        Ok(scene)
    }

    /// Creates and fills every texture, returning name → handle.
    pub fn load_textures<E, W>(&self, renderer: &mut Renderer<E, W>) -> Result<HashMap<String, TextureId>>
    where
        E: CompositingEngine,
        W: Window,
    {
        let mut ids = HashMap::with_capacity(self.textures.len());
        for spec in &self.textures {
            let id = renderer
                .create_texture(spec.width, spec.height, PixelFormat::Argb8888)
                .with_context(|| format!("creating texture `{}`", spec.name))?;

            let pixels = spec.pixels();
            renderer
                .update_texture(id, None, &pixels, spec.width as usize * 4)
                .with_context(|| format!("uploading texture `{}`", spec.name))?;

            if let Some([r, g, b]) = spec.color_mod {
                renderer.set_texture_color_mod(id, r, g, b)?;
            }
            if let Some(blend) = spec.blend {
                renderer.set_texture_blend_mode(id, blend)?;
            }
            if let Some(scale) = spec.scale {
                renderer.set_texture_scale_mode(id, scale)?;
            }

            log::debug!("texture `{}` -> {id:?}", spec.name);
            if ids.insert(spec.name.clone(), id).is_some() {
                bail!("duplicate texture name `{}`", spec.name);
            }
        }
        Ok(ids)
    }

    /// Builds the frame's command list. Copies without an explicit blend
    /// mode use the texture's.
    pub fn command_list<E, W>(
        &self,
        renderer: &Renderer<E, W>,
        textures: &HashMap<String, TextureId>,
    ) -> Result<CommandList>
    where
        E: CompositingEngine,
        W: Window,
    {
        let lookup = |name: &str| {
            textures
                .get(name)
                .copied()
                .with_context(|| format!("unknown texture `{name}`"))
        };

        let mut list = CommandList::new();
        for (i, op) in self.commands.iter().enumerate() {
            let queued = match op {
                Op::Clear { color: c } => {
                    list.push_clear(color(*c));
                    Ok(())
                }
                Op::Viewport { rect: r } => {
                    list.push_viewport(rect(*r));
                    Ok(())
                }
                Op::Clip { rect: r } => {
                    list.push_clip_rect(r.map(rect).unwrap_or_default(), r.is_some());
                    Ok(())
                }
                Op::Points {
                    points,
                    color: c,
                    blend,
                } => {
                    let points: Vec<FPoint> = points.iter().copied().map(point).collect();
                    list.push_points(&points, color(*c), *blend)
                }
                Op::Lines {
                    points,
                    color: c,
                    blend,
                } => {
                    let points: Vec<FPoint> = points.iter().copied().map(point).collect();
                    list.push_lines(&points, color(*c), *blend)
                }
                Op::FillRects {
                    rects,
                    color: c,
                    blend,
                } => {
                    let rects: Vec<FRect> = rects.iter().copied().map(frect).collect();
                    list.push_fill_rects(&rects, color(*c), *blend)
                }
                Op::Copy {
                    texture,
                    src,
                    dst,
                    color: c,
                    blend,
                    angle,
                    center,
                    flip,
                    tint,
                } => {
                    let id = lookup(texture)?;
                    let (w, h) = renderer.texture_size(id)?;
                    let src = src.map(frect).unwrap_or(FRect::new(0.0, 0.0, w as f32, h as f32));
                    let dst = frect(*dst);
                    let blend = match blend {
                        Some(b) => *b,
                        None => renderer.texture_blend_mode(id)?,
                    };
                    let tint = match tint {
                        Some(t) => *t,
                        None => renderer.texture_color_mod(id)?,
                    };

                    let xf = (*angle != 0.0 || *flip != FlipMode::None).then(|| QuadTransform {
                        angle: *angle,
                        center: center
                            .map(point)
                            .unwrap_or(FPoint::new(dst.w / 2.0, dst.h / 2.0)),
                        flip: *flip,
                        ..QuadTransform::default()
                    });
                    list.push_tinted_copy(id, tint, color(*c), blend, src, dst, xf.as_ref())
                }
                Op::Geometry {
                    texture,
                    positions,
                    uvs,
                    indices,
                    color: c,
                    blend,
                } => {
                    let id = lookup(texture)?;
                    let blend = match blend {
                        Some(b) => *b,
                        None => renderer.texture_blend_mode(id)?,
                    };
                    let positions: Vec<FPoint> = positions.iter().copied().map(point).collect();
                    let uvs: Vec<FPoint> = uvs.iter().copied().map(point).collect();
                    let mut input = GeometryInput::new(&positions, &uvs);
                    input.indices = indices.as_deref().map(Indices::U32);
                    list.push_geometry(Some(id), color(*c), blend, &input)
                }
            };
            queued.with_context(|| format!("queuing command #{i}"))?;
        }
        Ok(list)
    }
}

impl TextureSpec {
    /// ARGB8888 rows in native byte order.
    fn pixels(&self) -> Vec<u8> {
        let (w, h) = (self.width, self.height);
        let argb = |c: [f32; 4]| rcomp_engine::coords::Rgba8::from_f32(color(c)).to_argb();

        let mut out = Vec::with_capacity(w as usize * h as usize * 4);
        for y in 0..h {
            for x in 0..w {
                let px = match &self.fill {
                    TextureFill::Solid(c) => argb(*c),
                    TextureFill::Checker { a, b, cell } => {
                        let cell = (*cell).max(1);
                        if ((x / cell) + (y / cell)) % 2 == 0 {
                            argb(*a)
                        } else {
                            argb(*b)
                        }
                    }
                    TextureFill::Gradient { from, to } => {
                        let t = if w > 1 { x as f32 / (w - 1) as f32 } else { 0.0 };
                        let mut c = [0.0; 4];
                        for (i, ch) in c.iter_mut().enumerate() {
                            *ch = from[i] + (to[i] - from[i]) * t;
                        }
                        argb(c)
                    }
                };
                out.extend_from_slice(&px.to_ne_bytes());
            }
        }
        out
    }
}
