use image::{DynamicImage, GrayImage, ImageBuffer, Luma, Rgb, RgbImage};

use crate::config::KernelShape;
use crate::errors::{DonutMaskError, Result};

/// Value written into a bitmap or mask for "set" pixels
pub const FOREGROUND: u8 = 255;
/// Value written into a bitmap or mask for "unset" pixels
pub const BACKGROUND: u8 = 0;

/// An in-memory input picture, either color or single channel.
///
/// Each stage builds a new buffer from the one it receives, so a `Raster`
/// handed to the pipeline is never modified.
#[derive(Debug, Clone, PartialEq)]
pub enum Raster {
    Color(RgbImage),
    Gray(GrayImage),
}

impl Raster {
    /// Wrap an interleaved RGB buffer, rejecting length mismatches
    pub fn from_raw_rgb(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * 3;
        let actual = data.len();
        RgbImage::from_raw(width, height, data)
            .map(Raster::Color)
            .ok_or_else(|| {
                DonutMaskError::InvalidImage(format!(
                    "RGB buffer of {} bytes does not match {}x{} (expected {})",
                    actual, width, height, expected
                ))
            })
    }

    /// Wrap a single-channel buffer, rejecting length mismatches
    pub fn from_raw_gray(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize;
        let actual = data.len();
        GrayImage::from_raw(width, height, data)
            .map(Raster::Gray)
            .ok_or_else(|| {
                DonutMaskError::InvalidImage(format!(
                    "gray buffer of {} bytes does not match {}x{} (expected {})",
                    actual, width, height, expected
                ))
            })
    }

    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            Raster::Color(image) => image.dimensions(),
            Raster::Gray(image) => image.dimensions(),
        }
    }

    /// True when either dimension is zero
    pub fn is_empty(&self) -> bool {
        let (width, height) = self.dimensions();
        width == 0 || height == 0
    }

    /// Color view of the raster; gray input is replicated to three channels
    pub fn to_rgb(&self) -> RgbImage {
        match self {
            Raster::Color(image) => image.clone(),
            Raster::Gray(image) => {
                let (width, height) = image.dimensions();
                ImageBuffer::from_fn(width, height, |x, y| {
                    let v = image.get_pixel(x, y)[0];
                    Rgb([v, v, v])
                })
            }
        }
    }
}

impl From<DynamicImage> for Raster {
    fn from(image: DynamicImage) -> Self {
        match image {
            DynamicImage::ImageLuma8(gray) => Raster::Gray(gray),
            other => Raster::Color(other.to_rgb8()),
        }
    }
}

impl From<RgbImage> for Raster {
    fn from(image: RgbImage) -> Self {
        Raster::Color(image)
    }
}

impl From<GrayImage> for Raster {
    fn from(image: GrayImage) -> Self {
        Raster::Gray(image)
    }
}

/// Height that keeps the aspect ratio when the width becomes `target_width`
pub fn scaled_height(width: u32, height: u32, target_width: u32) -> u32 {
    let scaled = (target_width as f64 * height as f64 / width as f64).round();
    (scaled as u32).max(1)
}

/// Rescale a raster to `target_width`, preserving aspect ratio
pub fn normalize_raster(raster: &Raster, target_width: u32) -> Result<RgbImage> {
    if raster.is_empty() {
        let (width, height) = raster.dimensions();
        return Err(DonutMaskError::InvalidImage(format!(
            "raster has zero extent ({}x{})",
            width, height
        )));
    }
    if target_width == 0 {
        return Err(DonutMaskError::Config(
            "target_width must be > 0".to_string(),
        ));
    }

    let (width, height) = raster.dimensions();
    let target_height = scaled_height(width, height, target_width);
    Ok(resize_area(&raster.to_rgb(), target_width, target_height))
}

/// For every destination index along one axis, the source indices it covers
/// and the length of each overlap
fn area_weights(src_len: u32, dst_len: u32) -> Vec<Vec<(u32, f64)>> {
    let scale = src_len as f64 / dst_len as f64;

    (0..dst_len)
        .map(|d| {
            let start = d as f64 * scale;
            let end = start + scale;
            let first = start.floor() as u32;
            let last = (end.ceil() as u32).min(src_len);

            (first..last)
                .filter_map(|s| {
                    let overlap = end.min(s as f64 + 1.0) - start.max(s as f64);
                    (overlap > 0.0).then_some((s, overlap))
                })
                .collect()
        })
        .collect()
}

/// Resize an image using area-weighted averaging of the covered source pixels
pub fn resize_area(image: &RgbImage, width: u32, height: u32) -> RgbImage {
    let (src_width, src_height) = image.dimensions();
    if (src_width, src_height) == (width, height) {
        return image.clone();
    }

    let x_weights = area_weights(src_width, width);
    let y_weights = area_weights(src_height, height);

    let mut result = RgbImage::new(width, height);
    for (y, row_span) in y_weights.iter().enumerate() {
        for (x, col_span) in x_weights.iter().enumerate() {
            let mut acc = [0.0f64; 3];
            let mut total = 0.0;

            for &(sy, wy) in row_span {
                for &(sx, wx) in col_span {
                    let weight = wx * wy;
                    let pixel = image.get_pixel(sx, sy);
                    for c in 0..3 {
                        acc[c] += pixel[c] as f64 * weight;
                    }
                    total += weight;
                }
            }

            if total > 0.0 {
                let channel = |c: usize| (acc[c] / total).round().clamp(0.0, 255.0) as u8;
                result.put_pixel(x as u32, y as u32, Rgb([channel(0), channel(1), channel(2)]));
            }
        }
    }

    result
}

/// Convert to single-channel intensity with the ITU-R BT.601 luma weights
pub fn to_luminance(image: &RgbImage) -> GrayImage {
    let (width, height) = image.dimensions();
    ImageBuffer::from_fn(width, height, |x, y| {
        let p = image.get_pixel(x, y);
        let luma = 0.299 * p[0] as f32 + 0.587 * p[1] as f32 + 0.114 * p[2] as f32;
        Luma([luma.round().clamp(0.0, 255.0) as u8])
    })
}

/// Standard deviation used for a Gaussian kernel of the given odd size
pub fn gaussian_sigma(kernel_size: u32) -> f32 {
    0.3 * ((kernel_size as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

/// Normalized 1-D Gaussian weights of length `kernel_size`
pub fn gaussian_kernel_1d(kernel_size: u32) -> Vec<f32> {
    let sigma = gaussian_sigma(kernel_size);
    let radius = (kernel_size / 2) as i32;

    let weights: Vec<f32> = (-radius..=radius)
        .map(|i| (-((i * i) as f32) / (2.0 * sigma * sigma)).exp())
        .collect();
    let sum: f32 = weights.iter().sum();

    weights.into_iter().map(|w| w / sum).collect()
}

/// Separable Gaussian filter, edges replicated; returns row-major values
pub fn gaussian_filter(image: &GrayImage, kernel_size: u32) -> Vec<f32> {
    let (width, height) = image.dimensions();
    let (w, h) = (width as i64, height as i64);
    let kernel = gaussian_kernel_1d(kernel_size);
    let radius = (kernel.len() / 2) as i64;

    // Horizontal pass
    let mut horizontal = vec![0.0f32; (width * height) as usize];
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0.0;
            for (k, weight) in kernel.iter().enumerate() {
                let sx = (x + k as i64 - radius).clamp(0, w - 1);
                acc += weight * image.get_pixel(sx as u32, y as u32)[0] as f32;
            }
            horizontal[(y * w + x) as usize] = acc;
        }
    }

    // Vertical pass
    let mut result = vec![0.0f32; (width * height) as usize];
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0.0;
            for (k, weight) in kernel.iter().enumerate() {
                let sy = (y + k as i64 - radius).clamp(0, h - 1);
                acc += weight * horizontal[(sy * w + x) as usize];
            }
            result[(y * w + x) as usize] = acc;
        }
    }

    result
}

/// Gaussian blur with a square `kernel_size` x `kernel_size` window
pub fn gaussian_blur(image: &GrayImage, kernel_size: u32) -> GrayImage {
    let (width, height) = image.dimensions();
    let filtered = gaussian_filter(image, kernel_size);
    ImageBuffer::from_fn(width, height, |x, y| {
        let v = filtered[(y * width + x) as usize];
        Luma([v.round().clamp(0.0, 255.0) as u8])
    })
}

/// Intensity conversion followed by noise-suppressing blur
pub fn preprocess(image: &RgbImage, blur_kernel_size: u32) -> GrayImage {
    gaussian_blur(&to_luminance(image), blur_kernel_size)
}

/// Build a structuring element of the requested shape
pub fn create_kernel(shape: KernelShape, size: u32) -> GrayImage {
    match shape {
        KernelShape::Square => create_square_kernel(size),
        KernelShape::Ellipse => create_circular_kernel(size),
    }
}

/// Structuring element with every cell set
pub fn create_square_kernel(size: u32) -> GrayImage {
    ImageBuffer::from_pixel(size, size, Luma([FOREGROUND]))
}

/// Disc-shaped structuring element
pub fn create_circular_kernel(diameter: u32) -> GrayImage {
    if diameter == 0 {
        return ImageBuffer::new(0, 0);
    }

    let center = (diameter - 1) as f32 / 2.0;

    // Odd diameters reach the pixel centers on the axes, even ones fill out to the corners
    let radius_sq = if diameter % 2 == 1 {
        ((diameter - 1) as f32 / 2.0).powi(2)
    } else {
        (diameter as f32 / 2.0).powi(2)
    };

    ImageBuffer::from_fn(diameter, diameter, |x, y| {
        let dx = x as f32 - center;
        let dy = y as f32 - center;
        if dx * dx + dy * dy <= radius_sq + 1e-6 {
            Luma([FOREGROUND])
        } else {
            Luma([BACKGROUND])
        }
    })
}

/// Check if a point is inside the image bounds
#[inline]
pub fn in_bounds(x: i64, y: i64, width: u32, height: u32) -> bool {
    x >= 0 && y >= 0 && x < width as i64 && y < height as i64
}

/// Number of set pixels in a binary image
pub fn count_foreground(image: &GrayImage) -> u64 {
    image.pixels().filter(|p| p[0] != BACKGROUND).count() as u64
}
