//! Image preprocessing
//!
//! Deterministic transform matching the model's training regime:
//! RGB decode, non-aspect-preserving resize to 224x224, scale to [0,1],
//! channel-wise ImageNet normalization. Output is an NCHW batch of one.

use image::{imageops::FilterType, DynamicImage};
use ndarray::Array4;

use super::IMG_SIZE;

/// ImageNet channel means the model was trained with
pub const MEAN: [f32; 3] = [0.485, 0.456, 0.406];

/// ImageNet channel standard deviations
pub const STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Convert a decoded image into a normalized (1, 3, 224, 224) tensor
pub fn to_tensor(img: &DynamicImage) -> Array4<f32> {
    let size = IMG_SIZE as usize;
    let resized = img
        .resize_exact(IMG_SIZE, IMG_SIZE, FilterType::Triangle)
        .to_rgb8();

    let mut tensor = Array4::<f32>::zeros((1, 3, size, size));
    for (x, y, pixel) in resized.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, c, y as usize, x as usize]] =
                (pixel[c] as f32 / 255.0 - MEAN[c]) / STD[c];
        }
    }

    tensor
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    #[test]
    fn test_output_shape() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(640, 480));
        let tensor = to_tensor(&img);
        assert_eq!(tensor.shape(), &[1, 3, 224, 224]);
    }

    #[test]
    fn test_solid_color_normalization() {
        // Pure red stays uniform under resize, so every spatial position
        // carries the per-channel normalized value.
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(50, 40, Rgb([255, 0, 0])));
        let tensor = to_tensor(&img);

        assert!(close(tensor[[0, 0, 0, 0]], (1.0 - MEAN[0]) / STD[0]));
        assert!(close(tensor[[0, 1, 112, 112]], (0.0 - MEAN[1]) / STD[1]));
        assert!(close(tensor[[0, 2, 223, 223]], (0.0 - MEAN[2]) / STD[2]));
    }

    #[test]
    fn test_deterministic() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_fn(30, 30, |x, y| {
            Rgb([(x * 8) as u8, (y * 8) as u8, 127])
        }));
        assert_eq!(to_tensor(&img), to_tensor(&img));
    }
}
