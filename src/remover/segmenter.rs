//! Segmentation model interface and the tensor conversions shared by
//! U²-Net style models.

use image::imageops::{self, FilterType};
use image::{GrayImage, Luma, RgbImage};
use ndarray::{Array4, ArrayView2};

use crate::error::ProcessingError;

/// Square input resolution of U²-Net style models.
pub const MODEL_INPUT_SIZE: u32 = 320;

/// ImageNet channel means.
pub const MEAN: [f32; 3] = [0.485, 0.456, 0.406];

/// ImageNet channel standard deviations.
pub const STD: [f32; 3] = [0.229, 0.224, 0.225];

/// A model that separates foreground from background.
///
/// `segment` is called from a blocking worker thread, never from the async
/// request path, so implementations are free to do heavy synchronous work.
pub trait Segmenter: Send + Sync + 'static {
    /// Short model name for logs and the health endpoint.
    fn name(&self) -> &str;

    /// Produce a foreground mask for `image` (255 = foreground, 0 =
    /// background).
    ///
    /// The mask may have any resolution; the caller rescales it to the
    /// source image.
    fn segment(&self, image: &RgbImage) -> Result<GrayImage, ProcessingError>;
}

/// Convert an image into a `[1, 3, 320, 320]` NCHW tensor.
///
/// The image is resized without preserving aspect ratio, scaled by its
/// brightest channel value, then normalized with ImageNet mean/std.
pub fn image_to_tensor(image: &RgbImage) -> Array4<f32> {
    let size = MODEL_INPUT_SIZE;
    let resized = imageops::resize(image, size, size, FilterType::Lanczos3);

    let max = resized
        .as_raw()
        .iter()
        .copied()
        .max()
        .map(f32::from)
        .unwrap_or(0.0)
        .max(1e-6);

    let mut tensor = Array4::zeros((1, 3, size as usize, size as usize));
    for (x, y, pixel) in resized.enumerate_pixels() {
        for c in 0..3 {
            let value = f32::from(pixel[c]) / max;
            tensor[[0, c, y as usize, x as usize]] = (value - MEAN[c]) / STD[c];
        }
    }

    tensor
}

/// Turn a raw `[H, W]` prediction into an 8-bit mask.
///
/// Values are min-max normalized. A flat prediction carries no contrast to
/// stretch, so it is clamped to `[0, 1]` instead.
pub fn prediction_to_mask(prediction: ArrayView2<f32>) -> GrayImage {
    let (height, width) = prediction.dim();

    let (min, max) = prediction
        .iter()
        .fold((f32::MAX, f32::MIN), |(min, max), &v| (min.min(v), max.max(v)));
    let range = max - min;

    GrayImage::from_fn(width as u32, height as u32, |x, y| {
        let raw = prediction[[y as usize, x as usize]];
        let value = if range > f32::EPSILON {
            (raw - min) / range
        } else {
            raw.clamp(0.0, 1.0)
        };
        Luma([(value * 255.0).round() as u8])
    })
}
