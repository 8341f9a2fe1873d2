//! Image preprocessing for table region detection.

use image::imageops;
use image::{DynamicImage, GrayImage, Luma};
use imageproc::contours::Contour;
use imageproc::distance_transform::Norm;
use imageproc::edges::canny;
use imageproc::morphology::dilate;

use crate::geometry::{polygon_area, BoundingBox};

/// Foreground value in binary masks.
pub const FOREGROUND: u8 = 255;

/// Convert any image to 8-bit grayscale.
pub fn to_gray(image: &DynamicImage) -> GrayImage {
    image.to_luma8()
}

/// Inverted global threshold: pixels at or below `threshold` become foreground.
pub fn binary_threshold_inv(image: &GrayImage, threshold: u8) -> GrayImage {
    let mut result = GrayImage::new(image.width(), image.height());
    for (x, y, pixel) in image.enumerate_pixels() {
        let value = if pixel[0] <= threshold { FOREGROUND } else { 0 };
        result.put_pixel(x, y, Luma([value]));
    }
    result
}

/// Inverted mean adaptive threshold.
///
/// A pixel becomes foreground when it is at or below the mean of its
/// `block_size` x `block_size` neighbourhood minus `c`. The local mean is
/// read from an integral image, so the cost does not depend on the block size.
pub fn adaptive_threshold_inv(image: &GrayImage, block_size: u32, c: i32) -> GrayImage {
    let (width, height) = image.dimensions();
    let mut result = GrayImage::new(width, height);
    if width == 0 || height == 0 {
        return result;
    }

    let integral = integral_image(image);
    let stride = width as usize + 1;
    let half_block = block_size / 2;

    for y in 0..height {
        let y_start = y.saturating_sub(half_block) as usize;
        let y_end = (y + half_block + 1).min(height) as usize;
        for x in 0..width {
            let x_start = x.saturating_sub(half_block) as usize;
            let x_end = (x + half_block + 1).min(width) as usize;

            let sum = integral[y_end * stride + x_end] + integral[y_start * stride + x_start]
                - integral[y_start * stride + x_end]
                - integral[y_end * stride + x_start];
            let count = ((y_end - y_start) * (x_end - x_start)) as u64;

            let threshold = (sum / count) as i32 - c;
            let pixel_value = image.get_pixel(x, y)[0] as i32;

            let output = if pixel_value <= threshold { FOREGROUND } else { 0 };
            result.put_pixel(x, y, Luma([output]));
        }
    }

    result
}

/// Summed-area table with one row and column of zero padding.
fn integral_image(image: &GrayImage) -> Vec<u64> {
    let (width, height) = image.dimensions();
    let stride = width as usize + 1;
    let mut table = vec![0u64; stride * (height as usize + 1)];

    for y in 0..height as usize {
        let mut row_sum = 0u64;
        for x in 0..width as usize {
            row_sum += image.get_pixel(x as u32, y as u32)[0] as u64;
            table[(y + 1) * stride + x + 1] = table[y * stride + x + 1] + row_sum;
        }
    }

    table
}

/// Canny edges followed by a one-pixel dilation, so thin double edges merge.
pub fn dilated_edges(image: &GrayImage, low: f32, high: f32) -> GrayImage {
    let edges = canny(image, low, high);
    dilate(&edges, Norm::LInf, 1)
}

/// Mean pixel intensity (0.0 for an empty image).
pub fn mean_intensity(image: &GrayImage) -> f32 {
    let count = image.width() as u64 * image.height() as u64;
    if count == 0 {
        return 0.0;
    }
    let sum: u64 = image.pixels().map(|p| p[0] as u64).sum();
    sum as f32 / count as f32
}

/// Crop a region, clipped to the image bounds.
pub fn crop(image: &GrayImage, bbox: &BoundingBox) -> GrayImage {
    let (width, height) = image.dimensions();
    let x = (bbox.x.max(0.0) as u32).min(width);
    let y = (bbox.y.max(0.0) as u32).min(height);
    let w = (bbox.width.max(0.0) as u32).min(width - x);
    let h = (bbox.height.max(0.0) as u32).min(height - y);
    imageops::crop_imm(image, x, y, w, h).to_image()
}

/// Axis-aligned bounding box of a contour.
pub fn contour_bbox(contour: &Contour<u32>) -> Option<BoundingBox> {
    let first = contour.points.first()?;
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
    for p in &contour.points {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    Some(BoundingBox::from_corners(
        min_x as f32,
        min_y as f32,
        (max_x + 1) as f32,
        (max_y + 1) as f32,
    ))
}

/// Area enclosed by a contour's boundary points.
pub fn contour_area(contour: &Contour<u32>) -> f32 {
    let points: Vec<(f32, f32)> = contour.points.iter().map(|p| (p.x as f32, p.y as f32)).collect();
    polygon_area(&points)
}
