//! Morphology and projection profile table detection.

use image::GrayImage;
use imageproc::contours::{find_contours, BorderType};
use imageproc::distance_transform::Norm;
use imageproc::morphology::{close, dilate};
use tracing::debug;

use super::preprocessing::{adaptive_threshold_inv, contour_bbox, FOREGROUND};
use super::DetectedRegion;
use crate::geometry::BoundingBox;
use crate::models::config::DetectionConfig;
use crate::models::table::TableMethod;

/// Count ruling lines inside `bbox` by projecting the mask onto both axes.
///
/// A row (column) is active when at least `fill_ratio` of its pixels inside
/// the box are foreground; each run of active rows (columns) is one line.
/// Returns `(horizontal_lines, vertical_lines)`.
pub fn count_projection_lines(mask: &GrayImage, bbox: &BoundingBox, fill_ratio: f32) -> (usize, usize) {
    let (width, height) = mask.dimensions();
    let x0 = (bbox.x.max(0.0) as u32).min(width);
    let y0 = (bbox.y.max(0.0) as u32).min(height);
    let x1 = (bbox.right().max(0.0) as u32).min(width);
    let y1 = (bbox.bottom().max(0.0) as u32).min(height);
    if x1 <= x0 || y1 <= y0 {
        return (0, 0);
    }

    let box_width = (x1 - x0) as f32;
    let box_height = (y1 - y0) as f32;

    let mut row_counts = vec![0u32; (y1 - y0) as usize];
    let mut col_counts = vec![0u32; (x1 - x0) as usize];
    for y in y0..y1 {
        for x in x0..x1 {
            if mask.get_pixel(x, y)[0] == FOREGROUND {
                row_counts[(y - y0) as usize] += 1;
                col_counts[(x - x0) as usize] += 1;
            }
        }
    }

    let horizontal = count_runs(row_counts.iter().map(|&c| c as f32 / box_width >= fill_ratio));
    let vertical = count_runs(col_counts.iter().map(|&c| c as f32 / box_height >= fill_ratio));
    (horizontal, vertical)
}

fn count_runs(active: impl Iterator<Item = bool>) -> usize {
    let mut runs = 0;
    let mut previous = false;
    for on in active {
        if on && !previous {
            runs += 1;
        }
        previous = on;
    }
    runs
}

/// Grid detector: adaptive threshold, close, dilate, external contours,
/// projection line count per contour box.
pub fn detect_grid_tables(image: &GrayImage, config: &DetectionConfig) -> Vec<DetectedRegion> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Vec::new();
    }

    let mask = adaptive_threshold_inv(image, config.adaptive_block_size, config.adaptive_c);
    let closed = close(&mask, Norm::LInf, 1);
    let dilated = dilate(&closed, Norm::LInf, 1);

    let contours = find_contours::<u32>(&dilated);
    let mut regions = Vec::new();
    let mut examined = 0usize;

    for contour in contours
        .iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
    {
        let Some(bbox) = contour_bbox(contour) else {
            continue;
        };
        // Too small to hold more than min_grid_lines rulings per axis.
        let min_extent = (config.min_grid_lines * 2) as f32;
        if bbox.width <= min_extent || bbox.height <= min_extent {
            continue;
        }
        examined += 1;

        let (horizontal, vertical) = count_projection_lines(&mask, &bbox, config.projection_fill_ratio);
        if horizontal > config.min_grid_lines && vertical > config.min_grid_lines {
            debug!(
                "Grid detector: {}x{} box at ({}, {}) with {} horizontal / {} vertical lines",
                bbox.width, bbox.height, bbox.x, bbox.y, horizontal, vertical
            );
            regions.push(DetectedRegion {
                bbox,
                method: TableMethod::GridDetection,
                confidence: config.grid_confidence,
            });
        }
    }

    debug!("Grid detector: {} candidate boxes, {} tables", examined, regions.len());
    regions
}
