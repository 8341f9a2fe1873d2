//! Rectangular contour table detection.

use image::GrayImage;
use imageproc::contours::find_contours;
use tracing::debug;

use super::preprocessing::{binary_threshold_inv, contour_area, contour_bbox};
use super::DetectedRegion;
use crate::models::config::DetectionConfig;
use crate::models::table::TableMethod;

/// Contour detector: inverted binary threshold, then every contour (outer
/// borders and holes) whose bounding box is large, not too elongated and
/// mostly filled by the contour itself.
pub fn detect_contour_tables(image: &GrayImage, config: &DetectionConfig) -> Vec<DetectedRegion> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Vec::new();
    }

    let mask = binary_threshold_inv(image, config.binary_threshold);
    let contours = find_contours::<u32>(&mask);
    debug!("Contour detector: {} contours", contours.len());

    contours
        .iter()
        .filter_map(|contour| {
            let bbox = contour_bbox(contour)?;
            if bbox.width < config.min_contour_width as f32 || bbox.height < config.min_contour_height as f32 {
                return None;
            }

            let aspect = bbox.width / bbox.height;
            if aspect < config.min_aspect_ratio || aspect > config.max_aspect_ratio {
                return None;
            }

            let fill = contour_area(contour) / bbox.area();
            if fill <= config.min_fill_ratio {
                return None;
            }

            Some(DetectedRegion {
                bbox,
                method: TableMethod::ContourDetection,
                confidence: config.contour_confidence,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;
    use imageproc::drawing::draw_hollow_rect_mut;
    use imageproc::rect::Rect;

    #[test]
    fn test_accepts_large_rectangle() {
        let mut img = GrayImage::from_pixel(500, 300, Luma([255]));
        draw_hollow_rect_mut(&mut img, Rect::at(50, 50).of_size(300, 150), Luma([0]));

        let regions = detect_contour_tables(&img, &DetectionConfig::default());
        assert!(!regions.is_empty());
        assert!(regions.iter().all(|r| r.method == TableMethod::ContourDetection));
        assert!(regions.iter().any(|r| (r.bbox.width - 300.0).abs() <= 2.0));
    }

    #[test]
    fn test_rejects_small_and_elongated_shapes() {
        let mut img = GrayImage::from_pixel(800, 300, Luma([255]));
        // Too small.
        draw_hollow_rect_mut(&mut img, Rect::at(10, 10).of_size(100, 60), Luma([0]));
        // Aspect ratio 7.
        draw_hollow_rect_mut(&mut img, Rect::at(10, 150).of_size(770, 110), Luma([0]));

        assert!(detect_contour_tables(&img, &DetectionConfig::default()).is_empty());
    }

    #[test]
    fn test_rejects_sparse_diagonal() {
        let mut img = GrayImage::from_pixel(400, 300, Luma([255]));
        for i in 0..250u32 {
            img.put_pixel(50 + i, 20 + i, Luma([0]));
            img.put_pixel(51 + i, 20 + i, Luma([0]));
        }

        assert!(detect_contour_tables(&img, &DetectionConfig::default()).is_empty());
    }
}
