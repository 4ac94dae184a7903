//! Final render: crop the working image back to a target extent.
//!
//! Tiling, bloom and gloom grow the working extent; the displayed
//! result must always cover exactly the bounds of the image that
//! entered the pipeline. Any target pixel outside the working extent
//! is rendered transparent.

use crate::types::{Extent, Image, PipelineError, RgbaImage};

/// Render `working` into a new bitmap covering exactly `target`.
///
/// # Errors
///
/// Returns [`PipelineError::Rasterization`] if `target` has zero area
/// or `working` is empty.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn rasterize(working: &Image, target: Extent) -> Result<Image, PipelineError> {
    if target.is_empty() {
        return Err(PipelineError::Rasterization(format!(
            "target extent {target} has zero area"
        )));
    }
    let source = working.extent();
    if source.is_empty() {
        return Err(PipelineError::Rasterization(format!(
            "working image extent {source} has zero area"
        )));
    }

    // Fast path: nothing to crop.
    if source == target {
        return Ok(working.clone());
    }

    let src = working.pixels();
    let pixels = RgbaImage::from_fn(target.width, target.height, |i, j| {
        let x = target.x + i64::from(i);
        let y = target.y + i64::from(j);
        if source.contains(x, y) {
            *src.get_pixel((x - source.x) as u32, (y - source.y) as u32)
        } else {
            image::Rgba([0, 0, 0, 0])
        }
    });

    Image::from_parts(pixels, target).ok_or_else(|| {
        PipelineError::Rasterization(format!("failed to allocate bitmap for {target}"))
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn numbered(extent: Extent) -> Image {
        #[allow(clippy::cast_possible_truncation)]
        let pixels = RgbaImage::from_fn(extent.width, extent.height, |x, y| {
            image::Rgba([x as u8, y as u8, 7, 255])
        });
        Image::from_parts(pixels, extent).unwrap()
    }

    #[test]
    fn crops_grown_working_image_to_target() {
        let working = numbered(Extent::new(-3, -2, 10, 10));
        let out = rasterize(&working, Extent::at_origin(4, 5)).unwrap();
        assert_eq!(out.extent(), Extent::at_origin(4, 5));
        // Target (0, 0) is working pixel (3, 2).
        assert_eq!(out.pixels().get_pixel(0, 0).0, [3, 2, 7, 255]);
        assert_eq!(out.pixels().get_pixel(3, 4).0, [6, 6, 7, 255]);
    }

    #[test]
    fn uncovered_pixels_are_transparent() {
        let working = numbered(Extent::new(2, 0, 2, 2));
        let out = rasterize(&working, Extent::at_origin(4, 2)).unwrap();
        assert_eq!(out.pixels().get_pixel(0, 0).0, [0, 0, 0, 0]);
        assert_eq!(out.pixels().get_pixel(2, 1).0, [0, 1, 7, 255]);
    }

    #[test]
    fn identical_extent_is_passthrough() {
        let working = numbered(Extent::at_origin(3, 3));
        let out = rasterize(&working, working.extent()).unwrap();
        assert_eq!(out, working);
    }

    #[test]
    fn zero_area_target_is_an_error() {
        let working = numbered(Extent::at_origin(3, 3));
        let result = rasterize(&working, Extent::at_origin(0, 3));
        assert!(matches!(result, Err(PipelineError::Rasterization(_))));
    }

    #[test]
    fn empty_working_image_is_an_error() {
        let working = Image::new(RgbaImage::new(0, 0));
        let result = rasterize(&working, Extent::at_origin(3, 3));
        assert!(matches!(result, Err(PipelineError::Rasterization(_))));
    }
}
