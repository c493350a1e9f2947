use image::{GrayImage, Luma};
use log::debug;

use crate::config::PipelineConfig;
use crate::errors::{DonutMaskError, Result};
use crate::image_utils::{create_kernel, in_bounds, BACKGROUND, FOREGROUND};

/// Offsets of the set cells of a structuring element, relative to its anchor
struct KernelOffsets {
    offsets: Vec<(i64, i64)>,
}

impl KernelOffsets {
    fn from_kernel(kernel: &GrayImage) -> Self {
        let (k_width, k_height) = kernel.dimensions();
        let k_radius_x = (k_width / 2) as i64;
        let k_radius_y = (k_height / 2) as i64;

        let offsets = kernel
            .enumerate_pixels()
            .filter(|(_, _, p)| p[0] > 0)
            .map(|(kx, ky, _)| (kx as i64 - k_radius_x, ky as i64 - k_radius_y))
            .collect();

        Self { offsets }
    }
}

/// Binary erosion: a pixel stays set only if every in-bounds kernel cell lands on a set pixel
fn erode_with(image: &GrayImage, kernel: &KernelOffsets) -> GrayImage {
    let (width, height) = image.dimensions();
    let mut result = GrayImage::new(width, height);

    for y in 0..height {
        for x in 0..width {
            if image.get_pixel(x, y)[0] == BACKGROUND {
                continue;
            }

            let mut erode = false;
            for &(dx, dy) in &kernel.offsets {
                let img_x = x as i64 + dx;
                let img_y = y as i64 + dy;

                if in_bounds(img_x, img_y, width, height)
                    && image.get_pixel(img_x as u32, img_y as u32)[0] == BACKGROUND
                {
                    erode = true;
                    break;
                }
            }

            if !erode {
                result.put_pixel(x, y, Luma([FOREGROUND]));
            }
        }
    }

    result
}

/// Binary dilation: a pixel is set if any in-bounds kernel cell lands on a set pixel
fn dilate_with(image: &GrayImage, kernel: &KernelOffsets) -> GrayImage {
    let (width, height) = image.dimensions();
    let mut result = GrayImage::new(width, height);

    for y in 0..height {
        for x in 0..width {
            let mut dilate = false;
            for &(dx, dy) in &kernel.offsets {
                let img_x = x as i64 + dx;
                let img_y = y as i64 + dy;

                if in_bounds(img_x, img_y, width, height)
                    && image.get_pixel(img_x as u32, img_y as u32)[0] != BACKGROUND
                {
                    dilate = true;
                    break;
                }
            }

            if dilate {
                result.put_pixel(x, y, Luma([FOREGROUND]));
            }
        }
    }

    result
}

/// Applies morphological erosion with the given structuring element
pub fn erode(image: &GrayImage, kernel: &GrayImage) -> GrayImage {
    erode_with(image, &KernelOffsets::from_kernel(kernel))
}

/// Applies morphological dilation with the given structuring element
pub fn dilate(image: &GrayImage, kernel: &GrayImage) -> GrayImage {
    dilate_with(image, &KernelOffsets::from_kernel(kernel))
}

fn check_kernel(kernel: &GrayImage) -> Result<()> {
    let (k_width, k_height) = kernel.dimensions();
    if k_width == 0 || k_height == 0 {
        return Err(DonutMaskError::Config(
            "Kernel size must be greater than 0".to_string(),
        ));
    }
    Ok(())
}

/// Apply morphological opening: `iterations` erosions followed by as many dilations
pub fn apply_opening(image: &GrayImage, kernel: &GrayImage, iterations: u32) -> Result<GrayImage> {
    check_kernel(kernel)?;
    let offsets = KernelOffsets::from_kernel(kernel);

    let mut result = image.clone();
    for _ in 0..iterations {
        result = erode_with(&result, &offsets);
    }
    for _ in 0..iterations {
        result = dilate_with(&result, &offsets);
    }

    Ok(result)
}

/// Apply morphological closing: `iterations` dilations followed by as many erosions
pub fn apply_closing(image: &GrayImage, kernel: &GrayImage, iterations: u32) -> Result<GrayImage> {
    check_kernel(kernel)?;
    let offsets = KernelOffsets::from_kernel(kernel);

    let mut result = image.clone();
    for _ in 0..iterations {
        result = dilate_with(&result, &offsets);
    }
    for _ in 0..iterations {
        result = erode_with(&result, &offsets);
    }

    Ok(result)
}

/// Remove speckles, then close small gaps in a thresholded bitmap
pub fn clean_bitmap(binary: &GrayImage, config: &PipelineConfig) -> Result<GrayImage> {
    let kernel = create_kernel(config.morph_kernel_shape, config.morph_kernel_size);

    let opened = apply_opening(binary, &kernel, config.opening_iterations)?;
    let closed = apply_closing(&opened, &kernel, config.closing_iterations)?;

    debug!(
        "Morphological cleanup: {:?} {}px kernel, opening x{}, closing x{}",
        config.morph_kernel_shape,
        config.morph_kernel_size,
        config.opening_iterations,
        config.closing_iterations
    );

    Ok(closed)
}
