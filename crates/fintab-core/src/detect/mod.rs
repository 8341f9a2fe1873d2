//! Table region detection on page images.
//!
//! Three independent heuristics run over the same grayscale page:
//! - [`lines`]: Canny edges, dilation and Hough lines, grouped into
//!   connected horizontal/vertical networks.
//! - [`grid`]: adaptive threshold and morphology, then a projection
//!   profile count of ruling lines inside each external contour.
//! - [`contour`]: rectangular, well-filled contours after a global threshold.
//!
//! Their detections are concatenated and overlapping ones collapsed with
//! [`suppress_overlaps`]. [`layout`] rebuilds lineless tables from OCR words.

pub mod contour;
pub mod grid;
pub mod layout;
pub mod lines;
pub mod preprocessing;

use image::GrayImage;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::geometry::BoundingBox;
use crate::models::config::DetectionConfig;
use crate::models::table::TableMethod;

/// A candidate table region, without cell content.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectedRegion {
    pub bbox: BoundingBox,
    pub method: TableMethod,
    pub confidence: f32,
}

/// Keep the highest-confidence region of every overlapping cluster.
///
/// Two regions overlap when their intersection exceeds `threshold` of the
/// smaller region's area. Ties keep the earlier region.
pub fn suppress_overlaps(mut regions: Vec<DetectedRegion>, threshold: f32) -> Vec<DetectedRegion> {
    regions.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut kept: Vec<DetectedRegion> = Vec::with_capacity(regions.len());
    for region in regions {
        if kept.iter().all(|k| k.bbox.overlap_ratio(&region.bbox) <= threshold) {
            kept.push(region);
        }
    }
    kept
}

/// Runs the enabled region detectors over a page image.
#[derive(Debug, Clone, Default)]
pub struct RegionTableDetector {
    config: DetectionConfig,
}

impl RegionTableDetector {
    pub fn new(config: DetectionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// Detect table regions, sorted by confidence (highest first).
    pub fn detect(&self, image: &GrayImage) -> Vec<DetectedRegion> {
        let mut regions = Vec::new();

        if self.config.enable_lines {
            let found = lines::detect_line_tables(image, &self.config);
            debug!("Line detector found {} regions", found.len());
            regions.extend(found);
        }
        if self.config.enable_grid {
            let found = grid::detect_grid_tables(image, &self.config);
            debug!("Grid detector found {} regions", found.len());
            regions.extend(found);
        }
        if self.config.enable_contours {
            let found = contour::detect_contour_tables(image, &self.config);
            debug!("Contour detector found {} regions", found.len());
            regions.extend(found);
        }

        let total = regions.len();
        let kept = suppress_overlaps(regions, self.config.overlap_threshold);
        debug!("Region detection: {} candidates, {} after overlap suppression", total, kept.len());
        kept
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(x: f32, confidence: f32, method: TableMethod) -> DetectedRegion {
        DetectedRegion {
            bbox: BoundingBox::new(x, 0.0, 100.0, 100.0),
            method,
            confidence,
        }
    }

    #[test]
    fn test_suppress_keeps_higher_confidence() {
        let regions = vec![
            region(0.0, 0.7, TableMethod::ContourDetection),
            region(10.0, 0.85, TableMethod::GridDetection),
            region(500.0, 0.8, TableMethod::LineDetection),
        ];
        let kept = suppress_overlaps(regions, 0.5);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].method, TableMethod::GridDetection);
        assert_eq!(kept[1].method, TableMethod::LineDetection);
    }

    #[test]
    fn test_suppress_keeps_disjoint() {
        let regions = vec![
            region(0.0, 0.7, TableMethod::ContourDetection),
            region(60.0, 0.7, TableMethod::ContourDetection),
        ];
        // 40% overlap stays below the threshold.
        assert_eq!(suppress_overlaps(regions, 0.5).len(), 2);
    }

    #[test]
    fn test_disabled_detectors_find_nothing() {
        let config = DetectionConfig {
            enable_lines: false,
            enable_grid: false,
            enable_contours: false,
            ..DetectionConfig::default()
        };
        let image = GrayImage::from_pixel(50, 50, image::Luma([0]));
        assert!(RegionTableDetector::new(config).detect(&image).is_empty());
    }
}
