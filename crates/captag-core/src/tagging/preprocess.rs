//! Image preprocessing for WD tagger inference.
//!
//! WD taggers expect:
//! - Transparent pixels composited over white
//! - The image padded to a white square, then resized to `S×S`
//! - Channel order: BGR, values in 0..255 (no normalization)
//! - Tensor layout: NHWC [1, S, S, 3]

use image::imageops::FilterType;
use image::{DynamicImage, Rgb, RgbImage};
use ndarray::Array4;

const CHANNELS: usize = 3;
const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

/// Preprocess an image for the tagger.
pub fn preprocess(image: &DynamicImage, image_size: u32) -> Array4<f32> {
    let flat = flatten_on_white(image);
    let squared = pad_to_square(&flat);
    let resized = image::imageops::resize(&squared, image_size, image_size, FilterType::CatmullRom);

    let size = image_size as usize;
    let mut tensor = Array4::<f32>::zeros((1, size, size, CHANNELS));
    for (x, y, pixel) in resized.enumerate_pixels() {
        let [r, g, b] = pixel.0;
        let (x, y) = (x as usize, y as usize);
        tensor[[0, y, x, 0]] = b as f32;
        tensor[[0, y, x, 1]] = g as f32;
        tensor[[0, y, x, 2]] = r as f32;
    }
    tensor
}

fn flatten_on_white(image: &DynamicImage) -> RgbImage {
    if !image.color().has_alpha() {
        return image.to_rgb8();
    }
    let rgba = image.to_rgba8();
    let mut out = RgbImage::new(rgba.width(), rgba.height());
    for (x, y, pixel) in rgba.enumerate_pixels() {
        let [r, g, b, a] = pixel.0;
        let a = a as u32;
        let blend = |c: u8| ((c as u32 * a + 255 * (255 - a)) / 255) as u8;
        out.put_pixel(x, y, Rgb([blend(r), blend(g), blend(b)]));
    }
    out
}

fn pad_to_square(image: &RgbImage) -> RgbImage {
    let (w, h) = image.dimensions();
    if w == h {
        return image.clone();
    }
    let side = w.max(h);
    let mut canvas = RgbImage::from_pixel(side, side, WHITE);
    let x = ((side - w) / 2) as i64;
    let y = ((side - h) / 2) as i64;
    image::imageops::overlay(&mut canvas, image, x, y);
    canvas
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn test_preprocess_shape_is_nhwc() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(640, 480));
        let tensor = preprocess(&img, 448);
        assert_eq!(tensor.shape(), &[1, 448, 448, 3]);
    }

    #[test]
    fn test_channels_are_bgr_unnormalized() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, Rgb([200, 100, 10])));
        let tensor = preprocess(&img, 4);
        assert_eq!(tensor[[0, 2, 2, 0]], 10.0);
        assert_eq!(tensor[[0, 2, 2, 1]], 100.0);
        assert_eq!(tensor[[0, 2, 2, 2]], 200.0);
    }

    #[test]
    fn test_padding_is_white() {
        // Tall black strip: left and right columns come from the padding.
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(2, 10, Rgb([0, 0, 0])));
        let tensor = preprocess(&img, 10);
        assert_eq!(tensor[[0, 5, 0, 0]], 255.0);
        assert_eq!(tensor[[0, 5, 5, 0]], 0.0);
    }

    #[test]
    fn test_transparent_pixels_become_white() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 0])));
        let tensor = preprocess(&img, 4);
        assert!(tensor.iter().all(|&v| v == 255.0));
    }
}
