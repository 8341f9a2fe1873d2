//! Tables from page images: region detection, grid inference and cell OCR.

use std::sync::Arc;

use image::DynamicImage;
use tracing::{debug, warn};

use super::{BackendKind, RawTable, TableBackend};
use crate::cells::{CellTextExtractor, GridExtractor};
use crate::detect::layout::reconstruct_table;
use crate::detect::preprocessing::{crop, to_gray};
use crate::detect::RegionTableDetector;
use crate::document::{Document, PageRange};
use crate::error::BackendError;
use crate::models::config::{FintabConfig, GridConfig};
use crate::models::result::DocumentKind;
use crate::models::table::TableMethod;
use crate::ocr::OcrProvider;

/// Image pipeline over scanned pages and image files.
pub struct ImagePipelineBackend {
    detector: RegionTableDetector,
    grid_extractor: GridExtractor,
    grid: GridConfig,
    ocr: Arc<dyn OcrProvider>,
    language: String,
    layout_fallback: bool,
    layout_confidence: f32,
}

impl ImagePipelineBackend {
    pub fn new(config: &FintabConfig, ocr: Arc<dyn OcrProvider>) -> Self {
        Self {
            detector: RegionTableDetector::new(config.detection.clone()),
            grid_extractor: GridExtractor::new(config.grid.clone(), config.detection.clone()),
            grid: config.grid.clone(),
            ocr,
            language: config.ocr.language.clone(),
            layout_fallback: config.collector.ocr_layout_fallback,
            layout_confidence: config.collector.ocr_layout_confidence,
        }
    }

    /// Tables on one page image.
    pub fn extract_page(&self, page: u32, image: &DynamicImage) -> Vec<RawTable> {
        let gray = to_gray(image);
        let regions = self.detector.detect(&gray);

        if regions.is_empty() {
            debug!("Page {}: no table regions", page);
            return if self.layout_fallback {
                self.layout_table(page, image).into_iter().collect()
            } else {
                Vec::new()
            };
        }

        let cells = CellTextExtractor::new(self.ocr.as_ref(), &self.grid, self.language.as_str());
        let (width, height) = gray.dimensions();
        let mut tables = Vec::new();

        for region in regions {
            let area = region.bbox.expand(self.grid.crop_margin as f32, width as f32, height as f32);
            let table_image = crop(&gray, &area);

            let Some(grid) = self.grid_extractor.extract_grid(&table_image) else {
                debug!("Page {}: no grid inside {:?} region", page, region.method);
                continue;
            };

            let matrix = cells.extract_cell_text(&table_image, &grid);
            if matrix.iter().flatten().all(|cell| cell.is_empty()) {
                debug!("Page {}: {}x{} grid without text", page, grid.rows, grid.columns);
                continue;
            }

            tables.push(
                RawTable::from_matrix(page, matrix)
                    .with_bbox(region.bbox)
                    .with_method(region.method, region.confidence),
            );
        }

        tables
    }

    /// Lineless table from full-page OCR word boxes.
    fn layout_table(&self, page: u32, image: &DynamicImage) -> Option<RawTable> {
        let output = match self.ocr.recognize(image, &self.language) {
            Ok(output) => output,
            Err(e) => {
                warn!("Page {}: full-page OCR failed: {}", page, e);
                return None;
            }
        };

        let layout = reconstruct_table(&output.words)?;
        debug!("Page {}: rebuilt {}-row table from OCR words", page, layout.rows.len());
        Some(
            RawTable::from_matrix(page, layout.rows)
                .with_bbox(layout.bbox)
                .with_method(TableMethod::Ocr, self.layout_confidence),
        )
    }
}

impl TableBackend for ImagePipelineBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::ImagePipeline
    }

    fn method(&self) -> TableMethod {
        TableMethod::Ocr
    }

    fn confidence(&self) -> f32 {
        self.layout_confidence
    }

    fn supports(&self, kind: DocumentKind) -> bool {
        matches!(kind, DocumentKind::Image | DocumentKind::Pdf)
    }

    fn extract(&self, document: &Document, pages: &PageRange) -> Result<Vec<RawTable>, BackendError> {
        let images = document.page_images(pages);
        debug!("Image pipeline: {} page images", images.len());

        Ok(images
            .iter()
            .flat_map(|(page, image)| self.extract_page(*page, image))
            .collect())
    }
}
