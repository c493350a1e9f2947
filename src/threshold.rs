use image::{GrayImage, ImageBuffer, Luma};

use crate::image_utils::{gaussian_filter, BACKGROUND, FOREGROUND};

/// Inverted adaptive threshold against a Gaussian-weighted local mean.
///
/// A pixel becomes foreground when its intensity lies below
/// `local_mean - constant`, so dark strokes on a lighter surround light up.
/// `block_size` must be odd.
pub fn adaptive_threshold_inv(image: &GrayImage, block_size: u32, constant: f64) -> GrayImage {
    let (width, height) = image.dimensions();
    let local_mean = gaussian_filter(image, block_size);
    let constant = constant as f32;

    ImageBuffer::from_fn(width, height, |x, y| {
        let intensity = image.get_pixel(x, y)[0] as f32;
        let threshold = local_mean[(y * width + x) as usize] - constant;
        if intensity < threshold {
            Luma([FOREGROUND])
        } else {
            Luma([BACKGROUND])
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_utils::count_foreground;

    #[test]
    fn uniform_image_has_no_foreground() {
        for level in [0u8, 90, 255] {
            let image = GrayImage::from_pixel(40, 30, Luma([level]));
            let binary = adaptive_threshold_inv(&image, 15, 5.0);
            assert_eq!(count_foreground(&binary), 0);
        }
    }

    #[test]
    fn dark_stroke_on_light_background_is_foreground() {
        // 4 px wide dark vertical stroke
        let image = GrayImage::from_fn(40, 20, |x, _| {
            if (18..22).contains(&x) { Luma([20]) } else { Luma([220]) }
        });
        let binary = adaptive_threshold_inv(&image, 15, 5.0);

        for y in 0..20 {
            for x in 18..22 {
                assert_eq!(binary.get_pixel(x, y)[0], FOREGROUND);
            }
            assert_eq!(binary.get_pixel(2, y)[0], BACKGROUND);
            assert_eq!(binary.get_pixel(37, y)[0], BACKGROUND);
        }
    }

    #[test]
    fn output_is_strictly_binary_and_deterministic() {
        let image = GrayImage::from_fn(32, 32, |x, y| Luma([((x * 7 + y * 13) % 256) as u8]));
        let first = adaptive_threshold_inv(&image, 15, 5.0);
        let second = adaptive_threshold_inv(&image, 15, 5.0);
        assert_eq!(first, second);
        assert!(first.pixels().all(|p| p[0] == FOREGROUND || p[0] == BACKGROUND));
    }

    #[test]
    fn larger_constant_never_adds_foreground() {
        let image = GrayImage::from_fn(32, 32, |x, y| Luma([((x * x + y * 3) % 200) as u8]));
        let loose = count_foreground(&adaptive_threshold_inv(&image, 15, 2.0));
        let strict = count_foreground(&adaptive_threshold_inv(&image, 15, 20.0));
        assert!(strict <= loose);
    }
}
