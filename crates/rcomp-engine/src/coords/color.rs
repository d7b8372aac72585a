/// Straight-alpha float color, channels nominally in `[0, 1]`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ColorF {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl ColorF {
    pub const WHITE: ColorF = ColorF::new(1.0, 1.0, 1.0, 1.0);
    pub const BLACK: ColorF = ColorF::new(0.0, 0.0, 0.0, 1.0);

    #[inline]
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    #[inline]
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self::new(r, g, b, 1.0)
    }

    #[inline]
    pub fn is_finite(self) -> bool {
        self.r.is_finite() && self.g.is_finite() && self.b.is_finite() && self.a.is_finite()
    }
}

impl Default for ColorF {
    fn default() -> Self {
        Self::WHITE
    }
}

/// 8-bit RGBA color as carried by render commands.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct Rgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba8 {
    pub const TRANSPARENT: Rgba8 = Rgba8::new(0, 0, 0, 0);

    #[inline]
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Converts float channels: clamp to `[0, 1]`, then `floor(channel * 255)`.
    ///
    /// NaN maps to 0.
    #[inline]
    pub fn from_f32(color: ColorF) -> Self {
        Self {
            r: channel_to_u8(color.r),
            g: channel_to_u8(color.g),
            b: channel_to_u8(color.b),
            a: channel_to_u8(color.a),
        }
    }

    /// Packs as `0xAARRGGBB`.
    #[inline]
    pub const fn to_argb(self) -> u32 {
        (self.a as u32) << 24 | (self.r as u32) << 16 | (self.g as u32) << 8 | self.b as u32
    }

    #[inline]
    pub const fn from_argb(argb: u32) -> Self {
        Self {
            a: (argb >> 24) as u8,
            r: (argb >> 16) as u8,
            g: (argb >> 8) as u8,
            b: argb as u8,
        }
    }

    #[inline]
    pub const fn is_opaque(self) -> bool {
        self.a == 255
    }
}

impl From<ColorF> for Rgba8 {
    fn from(color: ColorF) -> Self {
        Rgba8::from_f32(color)
    }
}

#[inline]
fn channel_to_u8(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).floor() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_f32_floors_each_channel() {
        let c = Rgba8::from_f32(ColorF::new(0.5, 1.0, 0.0, 0.999));
        // 0.5 * 255 = 127.5, 0.999 * 255 = 254.745
        assert_eq!(c, Rgba8::new(127, 255, 0, 254));
    }

    #[test]
    fn from_f32_clamps_out_of_range() {
        let c = Rgba8::from_f32(ColorF::new(-1.0, 2.0, f32::NAN, 1.0));
        assert_eq!(c, Rgba8::new(0, 255, 0, 255));
    }

    #[test]
    fn argb_packing() {
        let c = Rgba8::new(0x11, 0x22, 0x33, 0x44);
        assert_eq!(c.to_argb(), 0x4411_2233);
        assert_eq!(Rgba8::from_argb(0x4411_2233), c);
    }
}
