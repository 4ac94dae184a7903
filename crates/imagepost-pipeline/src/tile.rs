//! Eightfold reflected tiling.
//!
//! Every filter-space point is folded into one triangular eighth of a
//! square tile (mirror in x, mirror in y, mirror across the diagonal)
//! and sampled from the source there. The result is an endless
//! kaleidoscope pattern; a window of it one tile wider than the source
//! on every side is materialized, so the working extent grows.

use crate::types::{Extent, Image, RgbaImage};

/// Parameters of the eightfold reflected tile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReflectedTile {
    /// Tile centre in filter space.
    pub center: (f32, f32),
    /// Tile rotation in radians.
    pub angle: f32,
    /// Side length of the square tile in pixels.
    pub width: f32,
}

impl ReflectedTile {
    /// Default tile centre.
    pub const DEFAULT_CENTER: (f32, f32) = (150.0, 150.0);
    /// Default rotation.
    pub const DEFAULT_ANGLE: f32 = 0.0;
    /// Default tile width.
    pub const DEFAULT_WIDTH: f32 = 100.0;

    /// Width clamped to at least one pixel.
    fn tile_width(&self) -> f32 {
        if self.width.is_finite() {
            self.width.max(1.0)
        } else {
            Self::DEFAULT_WIDTH
        }
    }

    /// How far the working extent grows on each side.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn margin(&self) -> u32 {
        self.tile_width().ceil() as u32
    }

    /// Extent of the materialized output for an input extent.
    #[must_use]
    pub fn output_extent(&self, input: Extent) -> Extent {
        input.grow(self.margin())
    }

    /// Apply the tiling. The caller guarantees `image` is non-empty.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    pub fn apply(&self, image: &Image) -> Image {
        let width = self.tile_width();
        let period = width * 2.0;
        let (sin, cos) = self.angle.sin_cos();
        let (cx, cy) = self.center;
        let out_extent = self.output_extent(image.extent());

        let fold = |a: f32| {
            let m = a.rem_euclid(period);
            if m > width { period - m } else { m }
        };

        let pixels = RgbaImage::from_fn(out_extent.width, out_extent.height, |i, j| {
            let px = (out_extent.x + i64::from(i)) as f32 + 0.5;
            let py = (out_extent.y + i64::from(j)) as f32 + 0.5;
            let (dx, dy) = (px - cx, py - cy);

            // Into tile space, fold, back into filter space.
            let u = dx.mul_add(cos, dy * sin);
            let v = (-dx).mul_add(sin, dy * cos);
            let (mut fu, mut fv) = (fold(u), fold(v));
            if fv > fu {
                std::mem::swap(&mut fu, &mut fv);
            }
            let sx = fu.mul_add(cos, -(fv * sin)) + cx;
            let sy = fu.mul_add(sin, fv * cos) + cy;

            image.sample_clamped(sx.floor() as i64, sy.floor() as i64)
        });

        Image::from_parts(pixels, out_extent).unwrap_or_else(|| image.clone())
    }
}

impl Default for ReflectedTile {
    fn default() -> Self {
        Self {
            center: Self::DEFAULT_CENTER,
            angle: Self::DEFAULT_ANGLE,
            width: Self::DEFAULT_WIDTH,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Two-axis gradient so reflections are visible.
    #[allow(clippy::cast_possible_truncation)]
    fn gradient(w: u32, h: u32) -> Image {
        Image::new(RgbaImage::from_fn(w, h, |x, y| {
            image::Rgba([(x * 8) as u8, (y * 8) as u8, 0, 255])
        }))
    }

    fn small_tile() -> ReflectedTile {
        ReflectedTile {
            center: (0.0, 0.0),
            angle: 0.0,
            width: 8.0,
        }
    }

    fn at(image: &Image, x: i64, y: i64) -> [u8; 4] {
        image.sample_clamped(x, y).0
    }

    #[test]
    fn output_extent_grows_by_tile_width() {
        let img = gradient(16, 16);
        let tiled = ReflectedTile::default().apply(&img);
        assert_eq!(tiled.extent(), Extent::new(-100, -100, 216, 216));
        assert_eq!(tiled.pixels().width(), 216);
    }

    #[test]
    fn pattern_is_symmetric_across_the_diagonal() {
        let tiled = small_tile().apply(&gradient(16, 16));
        for (x, y) in [(1, 5), (2, 7), (3, 4), (6, 0)] {
            assert_eq!(at(&tiled, x, y), at(&tiled, y, x), "diagonal mirror at ({x}, {y})");
        }
    }

    #[test]
    fn pattern_mirrors_across_tile_edges() {
        let tiled = small_tile().apply(&gradient(16, 16));
        // Mirror across x = 0: pixel x maps to -1 - x.
        for (x, y) in [(1, 2), (3, 5), (6, 6)] {
            assert_eq!(at(&tiled, x, y), at(&tiled, -1 - x, y), "x mirror at ({x}, {y})");
            assert_eq!(at(&tiled, x, y), at(&tiled, x, -1 - y), "y mirror at ({x}, {y})");
        }
    }

    #[test]
    fn pattern_repeats_with_period_of_two_tiles() {
        let tiled = small_tile().apply(&gradient(16, 16));
        for (x, y) in [(1, 2), (3, 5), (-4, 6)] {
            assert_eq!(at(&tiled, x, y), at(&tiled, x + 16, y));
            assert_eq!(at(&tiled, x, y), at(&tiled, x, y + 16));
        }
    }

    #[test]
    fn non_finite_width_falls_back_to_default() {
        let tile = ReflectedTile {
            width: f32::NAN,
            ..ReflectedTile::default()
        };
        assert_eq!(tile.margin(), 100);
    }

    #[test]
    fn tiny_width_clamps_to_one_pixel() {
        let tile = ReflectedTile {
            width: 0.0,
            ..ReflectedTile::default()
        };
        assert_eq!(tile.margin(), 1);
    }
}
