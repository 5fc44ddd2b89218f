use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage, Rgba, RgbaImage};

use super::model::{InferenceError, Predictor};
use super::preprocess::{SEGMENTER_INPUT_SIZE, segmenter_image, segmenter_input};

/// Pixels strictly above this probability belong to the mask.
pub const MASK_THRESHOLD: f32 = 0.5;
pub const OVERLAY_ALPHA: f32 = 0.4;
pub const HIGHLIGHT: [u8; 3] = [255, 0, 0];

#[derive(Debug, thiserror::Error)]
pub enum SegmentationError {
    #[error("Segmentation inference failed: {0}")]
    Inference(#[from] InferenceError),
}

#[derive(Debug, Clone)]
pub struct Segmentation {
    /// 255 where the model flagged tumor, 0 elsewhere.
    pub mask: GrayImage,
    /// Highlight overlay composited over the grayscale model input.
    pub composite: RgbImage,
}

impl Segmentation {
    pub fn tumor_pixels(&self) -> usize {
        self.mask.pixels().filter(|p| p.0[0] > 0).count()
    }

    /// Flagged fraction of the canvas.
    pub fn coverage(&self) -> f32 {
        let total = (self.mask.width() * self.mask.height()) as f32;
        if total == 0.0 {
            0.0
        } else {
            self.tumor_pixels() as f32 / total
        }
    }

    /// The raw translucent overlay: highlight colour everywhere, alpha only
    /// over masked pixels.
    pub fn overlay(&self) -> RgbaImage {
        let alpha = (OVERLAY_ALPHA * 255.0).round() as u8;
        RgbaImage::from_fn(self.mask.width(), self.mask.height(), |x, y| {
            let a = if self.mask.get_pixel(x, y).0[0] > 0 { alpha } else { 0 };
            Rgba([HIGHLIGHT[0], HIGHLIGHT[1], HIGHLIGHT[2], a])
        })
    }
}

pub fn binarize(probabilities: &[f32], size: u32) -> Result<GrayImage, InferenceError> {
    let expected = (size * size) as usize;
    if probabilities.len() != expected {
        return Err(InferenceError::OutputShape {
            expected: format!("{size}x{size} mask ({expected} values)"),
            actual: format!("{} values", probabilities.len()),
        });
    }
    Ok(GrayImage::from_fn(size, size, |x, y| {
        let p = probabilities[(y * size + x) as usize];
        Luma([if p > MASK_THRESHOLD { 255 } else { 0 }])
    }))
}

fn composite(base: &GrayImage, mask: &GrayImage) -> RgbImage {
    RgbImage::from_fn(base.width(), base.height(), |x, y| {
        let gray = base.get_pixel(x, y).0[0] as f32;
        if mask.get_pixel(x, y).0[0] == 0 {
            let g = gray as u8;
            return Rgb([g, g, g]);
        }
        let blend = |channel: u8| {
            (gray * (1.0 - OVERLAY_ALPHA) + channel as f32 * OVERLAY_ALPHA).round() as u8
        };
        Rgb([blend(HIGHLIGHT[0]), blend(HIGHLIGHT[1]), blend(HIGHLIGHT[2])])
    })
}

pub fn segment(
    model: &dyn Predictor,
    image: &DynamicImage,
) -> Result<Segmentation, SegmentationError> {
    let gray = segmenter_image(image);
    let input = segmenter_input(&gray);
    let output = model.predict(input.view())?;
    let probabilities: Vec<f32> = output.iter().copied().collect();
    let mask = binarize(&probabilities, SEGMENTER_INPUT_SIZE)?;

    let base = GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        Luma([(gray.get_pixel(x, y).0[0] * 255.0).round() as u8])
    });
    let composite = composite(&base, &mask);
    Ok(Segmentation { mask, composite })
}
