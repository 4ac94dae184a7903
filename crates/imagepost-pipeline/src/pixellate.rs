//! Pixellate: replace every `scale × scale` cell with its mean colour.
//!
//! The cell grid is fixed in filter space: cell edges sit on multiples
//! of `scale` from the filter-space origin, whatever the working extent.
//! Stages that grow the canvas (tile, bloom, gloom) therefore never
//! shift the blocks seen in the cropped output. Cells cut off by the
//! extent are averaged over the pixels they actually cover.

use crate::types::{Image, RgbaImage};

/// Block mosaic with a fixed cell size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pixellate {
    /// Cell side length in pixels.
    pub scale: f32,
}

impl Pixellate {
    /// Default cell size.
    pub const DEFAULT_SCALE: f32 = 24.0;

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn cell(&self) -> u32 {
        if self.scale.is_finite() {
            self.scale.round().max(1.0) as u32
        } else {
            1
        }
    }

    /// Apply the mosaic. Extent is unchanged.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn apply(&self, image: &Image) -> Image {
        let cell = self.cell();
        if cell == 1 {
            return image.clone();
        }

        let extent = image.extent();
        let src = image.pixels();
        let mut out = RgbaImage::new(extent.width, extent.height);
        let step = i64::from(cell);

        // Buffer-local [start, end) spans of every grid cell along an axis.
        let spans = |origin: i64, len: u32| {
            let first = origin.div_euclid(step) * step;
            let end = origin + i64::from(len);
            (0..)
                .map(move |k| first + k * step)
                .take_while(move |&edge| edge < end)
                .map(move |edge| {
                    let lo = (edge.max(origin) - origin) as u32;
                    let hi = ((edge + step).min(end) - origin) as u32;
                    (lo, hi)
                })
        };

        for (y0, y1) in spans(extent.y, extent.height) {
            for (x0, x1) in spans(extent.x, extent.width) {
                let mut sum = [0u64; 4];
                for y in y0..y1 {
                    for x in x0..x1 {
                        for (acc, &v) in sum.iter_mut().zip(src.get_pixel(x, y).0.iter()) {
                            *acc += u64::from(v);
                        }
                    }
                }
                let count = u64::from(x1 - x0) * u64::from(y1 - y0);
                let mean = image::Rgba(sum.map(|s| ((s + count / 2) / count) as u8));

                for y in y0..y1 {
                    for x in x0..x1 {
                        out.put_pixel(x, y, mean);
                    }
                }
            }
        }

        Image::from_parts(out, extent).unwrap_or_else(|| image.clone())
    }
}

impl Default for Pixellate {
    fn default() -> Self {
        Self {
            scale: Self::DEFAULT_SCALE,
        }
    }
}
