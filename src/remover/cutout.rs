//! Decode → segment → apply mask → PNG encode.
//!
//! Everything here is synchronous and CPU-bound; [`BackgroundRemover`]
//! runs it on the blocking pool.
//!
//! [`BackgroundRemover`]: super::BackgroundRemover

use std::io::Cursor;

use bytes::Bytes;
use image::codecs::png::PngEncoder;
use image::imageops::{self, FilterType};
use image::{DynamicImage, ExtendedColorType, GrayImage, ImageEncoder, ImageReader, RgbaImage};

use super::segmenter::Segmenter;
use crate::error::ProcessingError;

/// The eight-byte PNG file signature.
pub const PNG_SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

/// Remove the background from encoded image bytes and return a PNG.
pub fn cut_out<S: Segmenter + ?Sized>(
    segmenter: &S,
    data: &[u8],
) -> Result<Bytes, ProcessingError> {
    let image = decode_image(data)?;

    let mask = segmenter.segment(&image.to_rgb8())?;
    if mask.width() == 0 || mask.height() == 0 {
        return Err(ProcessingError::Model(format!(
            "{} returned an empty mask",
            segmenter.name()
        )));
    }

    let cutout = apply_mask(&image, &mask);
    encode_png(&cutout)
}

/// Decode image bytes, guessing the format from the content.
pub fn decode_image(data: &[u8]) -> Result<DynamicImage, ProcessingError> {
    ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| ProcessingError::Decode(e.to_string()))?
        .decode()
        .map_err(|e| ProcessingError::Decode(e.to_string()))
}

/// Use `mask` as the alpha channel of `image`.
///
/// The mask is resized to the image dimensions when they differ. Any alpha
/// the source already had is replaced.
pub fn apply_mask(image: &DynamicImage, mask: &GrayImage) -> RgbaImage {
    let mut rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();

    let resized;
    let mask = if mask.dimensions() == (width, height) {
        mask
    } else {
        resized = imageops::resize(mask, width, height, FilterType::Lanczos3);
        &resized
    };

    for (x, y, pixel) in rgba.enumerate_pixels_mut() {
        pixel[3] = mask.get_pixel(x, y)[0];
    }

    rgba
}

/// Encode an RGBA image as PNG.
pub fn encode_png(image: &RgbaImage) -> Result<Bytes, ProcessingError> {
    let mut output = Vec::new();
    PngEncoder::new(&mut output)
        .write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            ExtendedColorType::Rgba8,
        )
        .map_err(|e| ProcessingError::Encode(e.to_string()))?;

    Ok(Bytes::from(output))
}

/// Check for the PNG file signature.
#[inline]
pub fn is_png(data: &[u8]) -> bool {
    data.starts_with(&PNG_SIGNATURE)
}
