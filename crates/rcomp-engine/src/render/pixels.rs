use crate::coords::Rgba8;

/// ARGB8888 pixels read back from a render target, row-major, no padding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u32>,
}

impl PixelBuffer {
    pub(crate) fn from_ne_bytes(width: u32, height: u32, bytes: &[u8]) -> Self {
        let pixels = bytes
            .chunks_exact(4)
            .map(|b| u32::from_ne_bytes([b[0], b[1], b[2], b[3]]))
            .collect();
        Self {
            width,
            height,
            pixels,
        }
    }

    #[inline]
    pub fn argb(&self, x: u32, y: u32) -> Option<u32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels.get((y * self.width + x) as usize).copied()
    }

    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba8> {
        self.argb(x, y).map(Rgba8::from_argb)
    }

    /// RGBA byte order, for image encoders.
    pub fn to_rgba_bytes(&self) -> Vec<u8> {
        self.pixels
            .iter()
            .flat_map(|&p| {
                let c = Rgba8::from_argb(p);
                [c.r, c.g, c.b, c.a]
            })
            .collect()
    }
}
