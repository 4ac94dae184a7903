//! imagepost-pipeline: gated photo filter pipeline (sans-IO).
//!
//! Takes a photo scaled to its view and renders it through a fixed
//! chain of filters:
//! gaussian blur -> reflected tile? -> bloom? -> gloom? -> pixellate?
//! where each `?` stage is switched by a boolean gate. The rendered
//! bitmap always covers exactly the bounds of the source image.
//!
//! This crate has **no I/O dependencies** -- it operates on in-memory
//! byte slices and pixel buffers. Reading and writing files lives in
//! the `imagepost` binary.

pub mod blur;
pub mod decode;
pub mod diagnostics;
pub mod glow;
pub mod pipeline;
pub mod pixellate;
pub mod raster;
pub mod scale;
pub mod session;
pub mod stage;
pub mod tile;
pub mod types;
pub mod worker;

pub use decode::decode;
pub use diagnostics::{PipelineDiagnostics, StageDiagnostics};
pub use glow::{Bloom, Gloom};
pub use pipeline::{Pipeline, run_pipeline};
pub use pixellate::Pixellate;
pub use scale::{ResampleFilter, scale_to_view};
pub use session::EditSession;
pub use stage::{FilterStage, Stage};
pub use tile::ReflectedTile;
pub use types::{
    Dimensions, Extent, FilterConfig, Gate, Image, PipelineError, RenderLimits, RgbaImage,
};
pub use worker::{RenderOutcome, RenderWorker};

/// Decode raw image bytes, scale them to a view and render them with
/// `config`.
///
/// Convenience wrapper for callers that hold encoded bytes rather than
/// an already-scaled [`Image`].
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] if `image_bytes` is empty,
/// [`PipelineError::ImageDecode`] if the format is unrecognized, and
/// any scaling or render error.
pub fn process(
    image_bytes: &[u8],
    view: Dimensions,
    screen_scale: f32,
    config: &FilterConfig,
) -> Result<Image, PipelineError> {
    let photo = decode::decode_dynamic(image_bytes)?;
    let scaled = scale_to_view(&photo, view, screen_scale, ResampleFilter::default())?;
    run_pipeline(Some(&scaled), config)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn encode_png(img: &RgbaImage) -> Vec<u8> {
        let mut buf = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut buf);
        image::ImageEncoder::write_image(
            encoder,
            img.as_raw(),
            img.width(),
            img.height(),
            image::ExtendedColorType::Rgba8,
        )
        .unwrap();
        buf
    }

    fn view(width: u32, height: u32) -> Dimensions {
        Dimensions { width, height }
    }

    #[test]
    fn process_empty_input() {
        let result = process(&[], view(10, 10), 1.0, &FilterConfig::default());
        assert!(matches!(result, Err(PipelineError::EmptyInput)));
    }

    #[test]
    fn process_corrupt_input() {
        let result = process(&[0xFF, 0x00], view(10, 10), 1.0, &FilterConfig::default());
        assert!(matches!(result, Err(PipelineError::ImageDecode(_))));
    }

    #[test]
    fn process_scales_then_filters() {
        let png = encode_png(&RgbaImage::from_pixel(80, 40, image::Rgba([120, 90, 60, 255])));
        let config = FilterConfig {
            blur_radius: 2.0,
            gloom_enabled: true,
            ..FilterConfig::default()
        };
        let out = process(&png, view(20, 20), 2.0, &config).unwrap();
        assert_eq!(out.extent(), Extent::at_origin(40, 20));
    }

    #[test]
    fn process_rejects_zero_sized_view() {
        let png = encode_png(&RgbaImage::from_pixel(8, 8, image::Rgba([1, 2, 3, 255])));
        let result = process(&png, view(0, 8), 1.0, &FilterConfig::default());
        assert!(matches!(result, Err(PipelineError::InvalidConfig(_))));
    }
}
