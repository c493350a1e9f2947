use bresenham::Bresenham;
use image::{GrayImage, Luma, Rgb, RgbImage};

use crate::contours::Boundary;
use crate::donut::DonutCandidate;
use crate::image_utils::{count_foreground, in_bounds, BACKGROUND, FOREGROUND};

/// The three region masks derived from a selected donut
#[derive(Debug, Clone, PartialEq)]
pub struct MaskSet {
    /// Pixels enclosed by the inner boundary (the hole)
    pub inner: GrayImage,
    /// Pixels outside the outer boundary (the background)
    pub outer: GrayImage,
    /// Pixels between the two boundaries (the ring itself)
    pub body: GrayImage,
}

impl MaskSet {
    pub fn inner_area(&self) -> u64 {
        count_foreground(&self.inner)
    }

    pub fn outer_area(&self) -> u64 {
        count_foreground(&self.outer)
    }

    pub fn body_area(&self) -> u64 {
        count_foreground(&self.body)
    }
}

/// Copies of the normalized image with regions painted over in the fill color
#[derive(Debug, Clone, PartialEq)]
pub struct MaskedImages {
    /// Hole painted over
    pub inner_filled: RgbImage,
    /// Background painted over
    pub outer_filled: RgbImage,
    /// Hole and background painted over, leaving only the ring
    pub body_only: RgbImage,
}

fn set_pixel(mask: &mut GrayImage, x: i64, y: i64, value: u8) {
    let (width, height) = mask.dimensions();
    if in_bounds(x, y, width, height) {
        mask.put_pixel(x as u32, y as u32, Luma([value]));
    }
}

/// Pixels on the closed polyline through `points`, vertices included
fn outline_pixels(points: &[(i32, i32)]) -> Vec<(i64, i64)> {
    let n = points.len();
    let mut pixels: Vec<(i64, i64)> = points.iter().map(|&(x, y)| (x as i64, y as i64)).collect();

    if n < 2 {
        return pixels;
    }

    for i in 0..n {
        let (x0, y0) = points[i];
        let (x1, y1) = points[(i + 1) % n];
        let line = Bresenham::new((x0 as isize, y0 as isize), (x1 as isize, y1 as isize));
        pixels.extend(line.map(|(x, y)| (x as i64, y as i64)));
    }

    pixels
}

/// Paint the polygon described by `points`, interior and edge, with `value`.
///
/// Interior pixels are those whose centers fall inside the polygon under
/// the even-odd rule.
pub fn fill_polygon(mask: &mut GrayImage, points: &[(i32, i32)], value: u8) {
    if points.is_empty() {
        return;
    }

    let (width, height) = mask.dimensions();
    let n = points.len();

    if n >= 3 {
        let min_y = points.iter().map(|p| p.1).min().unwrap_or(0).max(0) as i64;
        let max_y = points.iter().map(|p| p.1).max().unwrap_or(0).min(height as i32 - 1) as i64;

        let mut crossings: Vec<f64> = Vec::new();
        for y in min_y..=max_y {
            let yf = y as f64;
            crossings.clear();

            for i in 0..n {
                let (x0, y0) = points[i];
                let (x1, y1) = points[(i + 1) % n];
                let (y0f, y1f) = (y0 as f64, y1 as f64);

                // Half-open rule so shared vertices are counted once
                if (y0f <= yf && yf < y1f) || (y1f <= yf && yf < y0f) {
                    let t = (yf - y0f) / (y1f - y0f);
                    crossings.push(x0 as f64 + t * (x1 - x0) as f64);
                }
            }

            crossings.sort_by(|a, b| a.total_cmp(b));
            for pair in crossings.chunks_exact(2) {
                let start = pair[0].ceil().max(0.0) as i64;
                let end = pair[1].floor().min(width as f64 - 1.0) as i64;
                for x in start..=end {
                    set_pixel(mask, x, y, value);
                }
            }
        }
    }

    for (x, y) in outline_pixels(points) {
        set_pixel(mask, x, y, value);
    }
}

/// Mask with every pixel enclosed by `boundary` set
pub fn boundary_mask(boundary: &Boundary, width: u32, height: u32) -> GrayImage {
    let mut mask = GrayImage::new(width, height);
    fill_polygon(&mut mask, boundary.points(), FOREGROUND);
    mask
}

/// Logical complement of a binary mask
pub fn invert_mask(mask: &GrayImage) -> GrayImage {
    let mut inverted = mask.clone();
    for pixel in inverted.pixels_mut() {
        pixel[0] = if pixel[0] == BACKGROUND { FOREGROUND } else { BACKGROUND };
    }
    inverted
}

/// Rasterize the hole, background and body masks of a selected donut
pub fn composite_masks(candidate: &DonutCandidate, width: u32, height: u32) -> MaskSet {
    let inner = boundary_mask(&candidate.inner, width, height);
    let outer_interior = boundary_mask(&candidate.outer, width, height);
    let outer = invert_mask(&outer_interior);

    let mut body = outer_interior;
    for (body_pixel, inner_pixel) in body.pixels_mut().zip(inner.pixels()) {
        if inner_pixel[0] != BACKGROUND {
            body_pixel[0] = BACKGROUND;
        }
    }

    MaskSet { inner, outer, body }
}

/// Copy of `image` with every pixel set in any of `masks` replaced by `color`
pub fn paint_masked(image: &RgbImage, masks: &[&GrayImage], color: [u8; 3]) -> RgbImage {
    let mut painted = image.clone();
    for (x, y, pixel) in painted.enumerate_pixels_mut() {
        if masks.iter().any(|m| m.get_pixel(x, y)[0] != BACKGROUND) {
            *pixel = Rgb(color);
        }
    }
    painted
}

/// Build the three filled derivative images from the normalized image
pub fn apply_masks(image: &RgbImage, masks: &MaskSet, fill_color: [u8; 3]) -> MaskedImages {
    MaskedImages {
        inner_filled: paint_masked(image, &[&masks.inner], fill_color),
        outer_filled: paint_masked(image, &[&masks.outer], fill_color),
        body_only: paint_masked(image, &[&masks.inner, &masks.outer], fill_color),
    }
}

/// Copy of `image` with every boundary outlined in `color`
pub fn draw_boundaries(image: &RgbImage, boundaries: &[Boundary], color: [u8; 3], thickness: u32) -> RgbImage {
    let mut overlay = image.clone();
    let (width, height) = overlay.dimensions();
    let thickness = thickness.max(1) as i64;
    let low = -((thickness - 1) / 2);
    let high = low + thickness - 1;

    for boundary in boundaries {
        for (x, y) in outline_pixels(boundary.points()) {
            for dy in low..=high {
                for dx in low..=high {
                    let (px, py) = (x + dx, y + dy);
                    if in_bounds(px, py, width, height) {
                        overlay.put_pixel(px as u32, py as u32, Rgb(color));
                    }
                }
            }
        }
    }

    overlay
}
