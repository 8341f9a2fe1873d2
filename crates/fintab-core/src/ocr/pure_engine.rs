//! Native OCR engine using `pure-onnx-ocr`.

use std::path::Path;
use std::sync::Mutex;
use std::time::Instant;

use image::{DynamicImage, GenericImageView};
use tracing::{debug, info};

use super::{OcrOutput, OcrProvider, OcrWord};
use crate::detect::preprocessing::mean_intensity;
use crate::error::OcrError;
use crate::models::config::OcrConfig;

/// Mean intensity above which a region is treated as blank.
const BLANK_INTENSITY: f32 = 250.0;

/// OCR engine backed by `pure-onnx-ocr` (pure Rust, no external ONNX Runtime).
///
/// Uses the Latin recognition model, so the language hint is informational.
pub struct PureOcrEngine {
    engine: Mutex<pure_onnx_ocr::engine::OcrEngine>,
    config: OcrConfig,
}

impl PureOcrEngine {
    /// Create an engine from model files in a directory.
    ///
    /// Expects `det.onnx`, `latin_rec.onnx` and `latin_dict.txt`.
    pub fn from_dir(model_dir: &Path, config: OcrConfig) -> Result<Self, OcrError> {
        let det_path = model_dir.join("det.onnx");
        let rec_path = model_dir.join("latin_rec.onnx");
        let dict_path = model_dir.join("latin_dict.txt");

        for path in [&det_path, &rec_path, &dict_path] {
            if !path.exists() {
                return Err(OcrError::ModelLoad(format!("missing model file {}", path.display())));
            }
        }

        let engine = pure_onnx_ocr::engine::OcrEngineBuilder::new()
            .det_model_path(&det_path)
            .rec_model_path(&rec_path)
            .dictionary_path(&dict_path)
            .build()
            .map_err(|e| OcrError::ModelLoad(format!("pure-onnx-ocr: {}", e)))?;

        info!("Loaded pure-onnx-ocr engine from {}", model_dir.display());

        Ok(Self {
            engine: Mutex::new(engine),
            config,
        })
    }

    /// Create an engine from the configured model directory.
    pub fn from_config(config: &OcrConfig) -> Result<Self, OcrError> {
        let dir = config
            .model_dir
            .as_deref()
            .ok_or_else(|| OcrError::ModelLoad("no OCR model directory configured".to_string()))?;
        Self::from_dir(dir, config.clone())
    }

    fn clean_text(&self, text: &str) -> String {
        if self.config.keep_unk {
            text.to_string()
        } else {
            text.replace("[UNK]", " ").trim().to_string()
        }
    }
}

impl OcrProvider for PureOcrEngine {
    fn recognize(&self, image: &DynamicImage, language_hint: &str) -> Result<OcrOutput, OcrError> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(OcrError::InvalidImage(format!("{}x{} image", width, height)));
        }
        if mean_intensity(&image.to_luma8()) > BLANK_INTENSITY {
            return Ok(OcrOutput::empty());
        }

        let start = Instant::now();
        debug!("Recognizing {}x{} image (hint: {})", width, height, language_hint);

        let results = {
            let engine = self
                .engine
                .lock()
                .map_err(|_| OcrError::Recognition("OCR engine lock poisoned".to_string()))?;
            engine
                .run_from_image(image)
                .map_err(|e| OcrError::Recognition(format!("pure-onnx-ocr: {}", e)))?
        };

        let words: Vec<OcrWord> = results
            .iter()
            .filter_map(|r| {
                let text = self.clean_text(&r.text);
                if text.is_empty() {
                    return None;
                }
                let (x0, y0, x1, y1) = polygon_rect(&r.bounding_box);
                Some(OcrWord::new(text, r.confidence, x0, y0, x1 - x0, y1 - y0))
            })
            .collect();

        let output = OcrOutput::from_words(words);
        debug!(
            "OCR complete: {} words in {}ms",
            output.words.len(),
            start.elapsed().as_millis()
        );
        Ok(output)
    }

    fn name(&self) -> &str {
        "pure-onnx-ocr"
    }
}

/// Axis-aligned rectangle `(min_x, min_y, max_x, max_y)` of a detection polygon.
fn polygon_rect(polygon: &pure_onnx_ocr::Polygon<f64>) -> (f32, f32, f32, f32) {
    polygon.exterior().coords().fold(
        (f32::INFINITY, f32::INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY),
        |(x0, y0, x1, y1), c| {
            let (x, y) = (c.x as f32, c.y as f32);
            (x0.min(x), y0.min(y), x1.max(x), y1.max(y))
        },
    )
}
