use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageBuffer, Luma};
use ndarray::Array4;

pub const CLASSIFIER_INPUT_SIZE: u32 = 128;
pub const SEGMENTER_INPUT_SIZE: u32 = 256;

pub type GrayF32Image = ImageBuffer<Luma<f32>, Vec<f32>>;

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("Uploaded file is empty")]
    Empty,
    #[error("Image decoding failed: {0}")]
    Image(#[from] image::ImageError),
}

pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage, DecodeError> {
    if bytes.is_empty() {
        return Err(DecodeError::Empty);
    }
    Ok(image::load_from_memory(bytes)?)
}

/// Classifier input: BGR channel order, hard resize to 128x128, scaled to
/// [0, 1], NHWC with a batch of one.
pub fn classifier_input(image: &DynamicImage) -> Array4<f32> {
    let size = CLASSIFIER_INPUT_SIZE;
    let rgb = image
        .resize_exact(size, size, FilterType::Triangle)
        .to_rgb8();

    let mut tensor = Array4::zeros((1, size as usize, size as usize, 3));
    for (x, y, pixel) in rgb.enumerate_pixels() {
        let [r, g, b] = pixel.0;
        let (x, y) = (x as usize, y as usize);
        tensor[[0, y, x, 0]] = b as f32 / 255.0;
        tensor[[0, y, x, 1]] = g as f32 / 255.0;
        tensor[[0, y, x, 2]] = r as f32 / 255.0;
    }
    tensor
}

/// Grayscale in [0, 1], bilinear resized to 256x256. Conversion to float
/// happens before the resize so interpolation works on unquantized values.
pub fn segmenter_image(image: &DynamicImage) -> GrayF32Image {
    let gray = image.to_luma8();
    let (width, height) = gray.dimensions();
    let scaled: GrayF32Image = ImageBuffer::from_fn(width, height, |x, y| {
        Luma([gray.get_pixel(x, y).0[0] as f32 / 255.0])
    });
    let size = SEGMENTER_INPUT_SIZE;
    let mut resized = imageops::resize(&scaled, size, size, FilterType::Triangle);
    for pixel in resized.pixels_mut() {
        pixel.0[0] = pixel.0[0].clamp(0.0, 1.0);
    }
    resized
}

pub fn segmenter_input(gray: &GrayF32Image) -> Array4<f32> {
    let (width, height) = gray.dimensions();
    let mut tensor = Array4::zeros((1, height as usize, width as usize, 1));
    for (x, y, pixel) in gray.enumerate_pixels() {
        tensor[[0, y as usize, x as usize, 0]] = pixel.0[0];
    }
    tensor
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Rgb, RgbImage, Rgba, RgbaImage};
    use std::io::Cursor;

    fn encode_png(image: &DynamicImage) -> Vec<u8> {
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn test_decode_png() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(10, 6, Rgb([1, 2, 3])));
        let decoded = decode_image(&encode_png(&img)).unwrap();
        assert_eq!(decoded.width(), 10);
        assert_eq!(decoded.height(), 6);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            decode_image(b"definitely not an image"),
            Err(DecodeError::Image(_))
        ));
        assert!(matches!(decode_image(&[]), Err(DecodeError::Empty)));
    }

    #[test]
    fn test_classifier_input_shape_and_range_for_any_source() {
        let sources = vec![
            DynamicImage::ImageLuma8(GrayImage::from_pixel(512, 512, Luma([200]))),
            DynamicImage::ImageRgb8(RgbImage::from_pixel(33, 71, Rgb([255, 0, 9]))),
            DynamicImage::ImageRgba8(RgbaImage::from_pixel(1, 1, Rgba([0, 128, 255, 10]))),
        ];
        for source in sources {
            let tensor = classifier_input(&source);
            assert_eq!(tensor.shape(), &[1, 128, 128, 3]);
            assert!(tensor.iter().all(|v| (0.0..=1.0).contains(v)));
        }
    }

    #[test]
    fn test_classifier_input_is_bgr() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(16, 16, Rgb([255, 0, 51])));
        let tensor = classifier_input(&img);
        assert!((tensor[[0, 5, 5, 0]] - 0.2).abs() < 1e-6);
        assert_eq!(tensor[[0, 5, 5, 1]], 0.0);
        assert_eq!(tensor[[0, 5, 5, 2]], 1.0);
    }

    #[test]
    fn test_segmenter_input_shape_and_range() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(300, 120, Rgb([255, 255, 255])));
        let gray = segmenter_image(&img);
        assert_eq!(gray.dimensions(), (256, 256));
        let tensor = segmenter_input(&gray);
        assert_eq!(tensor.shape(), &[1, 256, 256, 1]);
        assert!(tensor.iter().all(|v| (0.0..=1.0).contains(v)));
        assert!((tensor[[0, 128, 128, 0]] - 1.0).abs() < 1e-5);
    }
}
