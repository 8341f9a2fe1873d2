//! OCR capability used by the image pipeline.
//!
//! Text recognition itself is external: anything implementing
//! [`OcrProvider`] can be plugged into the pipeline. With the `native`
//! feature, [`PureOcrEngine`] wraps `pure-onnx-ocr` (PaddleOCR models,
//! pure Rust inference).

#[cfg(feature = "native")]
mod pure_engine;

#[cfg(feature = "native")]
pub use pure_engine::PureOcrEngine;

use image::DynamicImage;
use serde::{Deserialize, Serialize};

use crate::error::OcrError;
use crate::geometry::{group_positions, BoundingBox};

/// A recognized word with its box in image pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrWord {
    pub text: String,
    /// Recognition confidence (0.0 - 1.0).
    pub confidence: f32,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    /// Text line index in reading order.
    pub line_num: u32,
}

impl OcrWord {
    /// Create a word on line 0.
    pub fn new(text: impl Into<String>, confidence: f32, x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            text: text.into(),
            confidence,
            x,
            y,
            width,
            height,
            line_num: 0,
        }
    }

    /// Vertical center.
    pub fn center_y(&self) -> f32 {
        self.y + self.height / 2.0
    }

    /// Right edge.
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// Word box.
    pub fn bbox(&self) -> BoundingBox {
        BoundingBox::new(self.x, self.y, self.width, self.height)
    }
}

/// Result of recognizing one image or region.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OcrOutput {
    /// Full text, lines separated by newlines.
    pub text: String,
    /// Words in reading order.
    pub words: Vec<OcrWord>,
}

impl OcrOutput {
    /// Output for a blank region.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Plain text without word boxes.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            words: Vec::new(),
        }
    }

    /// Build output from unordered words: assign line numbers, sort into
    /// reading order (top-to-bottom, left-to-right) and join the text.
    pub fn from_words(mut words: Vec<OcrWord>) -> Self {
        if words.is_empty() {
            return Self::empty();
        }

        let centers: Vec<f32> = words.iter().map(OcrWord::center_y).collect();
        let tolerance = median_height(words.iter().map(|w| w.height)) / 2.0;
        for (line, members) in group_positions(&centers, tolerance).into_iter().enumerate() {
            for idx in members {
                words[idx].line_num = line as u32;
            }
        }

        words.sort_by(|a, b| a.line_num.cmp(&b.line_num).then(a.x.total_cmp(&b.x)));

        let mut text = String::new();
        let mut current_line = words[0].line_num;
        for (i, word) in words.iter().enumerate() {
            if i > 0 {
                text.push(if word.line_num == current_line { ' ' } else { '\n' });
            }
            current_line = word.line_num;
            text.push_str(&word.text);
        }

        Self { text, words }
    }

    /// Whether nothing was recognized.
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty() && self.words.is_empty()
    }
}

/// Median of word heights, at least one pixel.
pub fn median_height(heights: impl IntoIterator<Item = f32>) -> f32 {
    let mut heights: Vec<f32> = heights.into_iter().collect();
    if heights.is_empty() {
        return 1.0;
    }
    heights.sort_by(f32::total_cmp);
    heights[heights.len() / 2].max(1.0)
}

/// Text recognition capability.
///
/// Implementations must return an empty [`OcrOutput`] for blank or
/// near-blank regions rather than an error.
pub trait OcrProvider: Send + Sync {
    /// Recognize text in an image region.
    fn recognize(&self, image: &DynamicImage, language_hint: &str) -> Result<OcrOutput, OcrError>;

    /// Name used in logs.
    fn name(&self) -> &str {
        "ocr"
    }
}
