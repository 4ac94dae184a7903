//! Image decoding.
//!
//! Accepts raw image bytes (PNG, JPEG, BMP, WebP) and produces an RGBA
//! [`Image`] anchored at the filter-space origin. This is where a picked
//! photo enters the system, before it is scaled to the view.

use image::DynamicImage;

use crate::types::{Image, PipelineError};

/// Decode raw image bytes into a [`DynamicImage`].
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] if `bytes` is empty.
/// Returns [`PipelineError::ImageDecode`] if the image format is
/// unrecognized or the data is corrupt.
pub fn decode_dynamic(bytes: &[u8]) -> Result<DynamicImage, PipelineError> {
    if bytes.is_empty() {
        return Err(PipelineError::EmptyInput);
    }

    Ok(image::load_from_memory(bytes)?)
}

/// Decode raw image bytes into an RGBA [`Image`].
///
/// # Errors
///
/// Same as [`decode_dynamic`].
pub fn decode(bytes: &[u8]) -> Result<Image, PipelineError> {
    Ok(Image::new(decode_dynamic(bytes)?.to_rgba8()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{Extent, RgbaImage};

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

    #[test]
    fn empty_input_returns_error() {
        assert!(matches!(decode(&[]), Err(PipelineError::EmptyInput)));
    }

    #[test]
    fn corrupt_bytes_returns_image_decode_error() {
        let result = decode(&[0xFF, 0xFE, 0x00, 0x01]);
        assert!(matches!(result, Err(PipelineError::ImageDecode(_))));
    }

    #[test]
    fn png_decodes_to_origin_anchored_rgba() {
        let src = RgbaImage::from_fn(17, 31, |x, _| image::Rgba([128, 64, 32, if x == 0 { 0 } else { 255 }]));
        let decoded = decode(&encode_png(&src)).unwrap();
        assert_eq!(decoded.extent(), Extent::at_origin(17, 31));
        assert_eq!(decoded.pixels(), &src);
    }
}
