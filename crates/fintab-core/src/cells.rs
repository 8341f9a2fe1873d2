//! Grid inference inside a table crop and per-cell OCR.

use image::{DynamicImage, GrayImage};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::detect::lines::{axis_segments, group_by_axis, HoughParams};
use crate::detect::preprocessing::{crop, dilated_edges, mean_intensity};
use crate::geometry::{Axis, BoundingBox};
use crate::models::config::{DetectionConfig, GridConfig};
use crate::ocr::OcrProvider;

/// One cell of an inferred grid, in table-crop pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellCoordinate {
    pub row: usize,
    pub col: usize,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CellCoordinate {
    pub fn bbox(&self) -> BoundingBox {
        BoundingBox::new(self.x as f32, self.y as f32, self.width as f32, self.height as f32)
    }
}

/// Rows and columns of a ruled table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridStructure {
    pub rows: usize,
    pub columns: usize,
    /// Row-major cells.
    pub cells: Vec<CellCoordinate>,
}

impl GridStructure {
    /// Cells between consecutive horizontal and vertical line positions.
    ///
    /// Returns `None` with fewer than two lines on either axis.
    pub fn from_positions(horizontal: &[f32], vertical: &[f32]) -> Option<Self> {
        if horizontal.len() < 2 || vertical.len() < 2 {
            return None;
        }

        let ys: Vec<u32> = horizontal.iter().map(|y| y.max(0.0).round() as u32).collect();
        let xs: Vec<u32> = vertical.iter().map(|x| x.max(0.0).round() as u32).collect();

        let mut cells = Vec::with_capacity((ys.len() - 1) * (xs.len() - 1));
        for (row, y) in ys.windows(2).enumerate() {
            for (col, x) in xs.windows(2).enumerate() {
                cells.push(CellCoordinate {
                    row,
                    col,
                    x: x[0],
                    y: y[0],
                    width: x[1].saturating_sub(x[0]),
                    height: y[1].saturating_sub(y[0]),
                });
            }
        }

        Some(Self {
            rows: ys.len() - 1,
            columns: xs.len() - 1,
            cells,
        })
    }
}

/// Infers the grid of a ruled table from its crop.
#[derive(Debug, Clone, Default)]
pub struct GridExtractor {
    grid: GridConfig,
    detection: DetectionConfig,
}

impl GridExtractor {
    pub fn new(grid: GridConfig, detection: DetectionConfig) -> Self {
        Self { grid, detection }
    }

    /// Hough lines inside the crop, grouped per axis; group positions are the
    /// grid lines. Lines must span a good share of the crop so cell content
    /// does not produce grid lines.
    pub fn extract_grid(&self, table_image: &GrayImage) -> Option<GridStructure> {
        let (width, height) = table_image.dimensions();
        if width < 2 || height < 2 {
            return None;
        }

        let edges = dilated_edges(table_image, self.detection.canny_low, self.detection.canny_high);
        let params = HoughParams {
            vote_threshold: (width.min(height) as f32 * self.grid.hough_vote_fraction) as u32,
            suppression_radius: self.detection.hough_suppression_radius,
            angle_tolerance_deg: self.detection.angle_tolerance_deg,
            segment_gap: self.detection.segment_gap,
        };

        let min_h = width as f32 * self.grid.min_line_fraction;
        let min_v = height as f32 * self.grid.min_line_fraction;
        let segments: Vec<_> = axis_segments(&edges, &params)
            .into_iter()
            .filter(|(axis, s)| match axis {
                Axis::Horizontal => s.length() >= min_h,
                Axis::Vertical => s.length() >= min_v,
            })
            .collect();

        let (horizontal, vertical) = group_by_axis(&segments, self.grid.line_group_threshold);
        let ys: Vec<f32> = horizontal.iter().map(|g| g.position()).collect();
        let xs: Vec<f32> = vertical.iter().map(|g| g.position()).collect();

        let grid = GridStructure::from_positions(&ys, &xs);
        match &grid {
            Some(g) => debug!("Grid: {} rows x {} columns", g.rows, g.columns),
            None => debug!(
                "No grid: {} horizontal / {} vertical lines",
                ys.len(),
                xs.len()
            ),
        }
        grid
    }
}

/// Runs OCR over every non-blank cell of a grid.
pub struct CellTextExtractor<'a> {
    ocr: &'a dyn OcrProvider,
    padding: u32,
    blank_intensity: f32,
    language: String,
}

impl<'a> CellTextExtractor<'a> {
    pub fn new(ocr: &'a dyn OcrProvider, config: &GridConfig, language: impl Into<String>) -> Self {
        Self {
            ocr,
            padding: config.cell_padding,
            blank_intensity: config.blank_intensity,
            language: language.into(),
        }
    }

    /// Cell text as a `rows x columns` matrix.
    ///
    /// Blank cells and cells whose OCR call fails hold an empty string.
    pub fn extract_cell_text(&self, table_image: &GrayImage, grid: &GridStructure) -> Vec<Vec<String>> {
        let mut matrix = vec![vec![String::new(); grid.columns]; grid.rows];
        let mut recognized = 0usize;

        for cell in &grid.cells {
            let Some(slot) = matrix.get_mut(cell.row).and_then(|r| r.get_mut(cell.col)) else {
                continue;
            };

            let region = self.inner_region(cell);
            let cell_image = crop(table_image, &region);
            if cell_image.width() == 0 || cell_image.height() == 0 {
                continue;
            }
            if mean_intensity(&cell_image) > self.blank_intensity {
                continue;
            }

            match self.ocr.recognize(&DynamicImage::ImageLuma8(cell_image), &self.language) {
                Ok(output) => {
                    *slot = output.text.split_whitespace().collect::<Vec<_>>().join(" ");
                    recognized += 1;
                }
                Err(e) => {
                    warn!("OCR failed for cell ({}, {}): {}", cell.row, cell.col, e);
                }
            }
        }

        debug!("Recognized {} of {} cells", recognized, grid.cells.len());
        matrix
    }

    /// Cell box shrunk by the padding, unless that would leave nothing.
    fn inner_region(&self, cell: &CellCoordinate) -> BoundingBox {
        let pad = self.padding;
        if cell.width > pad * 2 && cell.height > pad * 2 {
            BoundingBox::new(
                (cell.x + pad) as f32,
                (cell.y + pad) as f32,
                (cell.width - pad * 2) as f32,
                (cell.height - pad * 2) as f32,
            )
        } else {
            cell.bbox()
        }
    }
}
