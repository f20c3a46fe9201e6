/// A width×height buffer of RGBA8 pixels with a top-left origin.
///
/// Produced by the text rasterizer and by frame composition. Rasters are
/// treated as immutable once handed to a layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterImage {
    /// Raw pixel data, 4 bytes per pixel, row-major.
    pub data: Vec<u8>,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl RasterImage {
    /// Create a new raster filled with zeros (transparent black).
    pub fn new(width: u32, height: u32) -> Self {
        let size = (width as usize) * (height as usize) * 4;
        Self {
            data: vec![0u8; size],
            width,
            height,
        }
    }

    /// Create a raster filled with a solid color.
    pub fn solid(width: u32, height: u32, color: &crate::Color) -> Self {
        let pixel = color.to_rgba8();
        let pixel_count = (width as usize) * (height as usize);
        let mut data = Vec::with_capacity(pixel_count * 4);
        for _ in 0..pixel_count {
            data.extend_from_slice(&pixel);
        }
        Self {
            data,
            width,
            height,
        }
    }

    /// Wrap raw RGBA8 bytes. Fails if the length does not match the dimensions.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        if data.len() != (width as usize) * (height as usize) * 4 {
            return None;
        }
        Some(Self {
            data,
            width,
            height,
        })
    }

    /// `(width, height)` pair.
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Total number of pixels.
    pub fn pixel_count(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    /// Get the RGBA value at a pixel coordinate. Returns None if out of bounds.
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        Some([
            self.data[offset],
            self.data[offset + 1],
            self.data[offset + 2],
            self.data[offset + 3],
        ])
    }

    /// Set the RGBA value at a pixel coordinate. No-op if out of bounds.
    pub fn set_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let offset = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        self.data[offset..offset + 4].copy_from_slice(&rgba);
    }

    /// Whether any pixel has non-zero alpha.
    pub fn has_visible_pixels(&self) -> bool {
        self.data.chunks_exact(4).any(|p| p[3] > 0)
    }

    /// Copy this raster into a transparent canvas of `canvas_size` at `anchor`.
    ///
    /// Hold frames use this so their footprint matches the animated layer
    /// they replace.
    pub fn padded(&self, canvas_size: (u32, u32), anchor: (i32, i32)) -> RasterImage {
        let mut canvas = RasterImage::new(canvas_size.0, canvas_size.1);
        canvas.composite_over(self, anchor.0, anchor.1);
        canvas
    }

    /// Alpha-composite `src` on top of `self` at position (dx, dy) (source-over).
    pub fn composite_over(&mut self, src: &RasterImage, dx: i32, dy: i32) {
        let dst_width = self.width as i32;
        let dst_height = self.height as i32;

        let mut start_y = 0;
        let mut end_y = src.height as i32;
        let mut start_x = 0;
        let mut end_x = src.width as i32;

        if dy < 0 {
            start_y = -dy;
        }
        if dy + end_y > dst_height {
            end_y = dst_height - dy;
        }
        if dx < 0 {
            start_x = -dx;
        }
        if dx + end_x > dst_width {
            end_x = dst_width - dx;
        }

        if start_x >= end_x || start_y >= end_y {
            return;
        }

        let src_stride = (src.width * 4) as usize;
        let dst_stride = (self.width * 4) as usize;

        for sy in start_y..end_y {
            let dst_y = dy + sy;
            let src_row_start = (sy as usize * src_stride) + (start_x as usize * 4);
            let dst_row_start = (dst_y as usize * dst_stride) + ((dx + start_x) as usize * 4);
            let len = (end_x - start_x) as usize * 4;

            let src_slice = &src.data[src_row_start..src_row_start + len];
            let dst_slice = &mut self.data[dst_row_start..dst_row_start + len];

            for (s, d) in src_slice.chunks_exact(4).zip(dst_slice.chunks_exact_mut(4)) {
                blend_pixel(d, s);
            }
        }
    }
}

/// Source-over blend of one straight-alpha pixel onto another.
#[inline]
fn blend_pixel(d: &mut [u8], s: &[u8]) {
    let sa = s[3] as u32;
    if sa == 0 {
        return;
    }
    if sa == 255 {
        d.copy_from_slice(s);
        return;
    }

    let da = d[3] as u32;
    let inv_sa = 255 - sa;
    let out_a = sa + ((da * inv_sa) / 255);
    if out_a == 0 {
        return;
    }

    for c in 0..3 {
        let out = (s[c] as u32 * sa * 255 + d[c] as u32 * da * inv_sa) / (out_a * 255);
        d[c] = out.min(255) as u8;
    }
    d[3] = out_a as u8;
}
