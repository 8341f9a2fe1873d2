#![allow(dead_code)]

use std::path::Path;

use fintab_core::error::OcrError;
use fintab_core::ocr::{OcrOutput, OcrProvider};
use image::{DynamicImage, GrayImage, Luma};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

pub const HEADERS: [&str; 6] = ["Security", "ISIN", "Quantity", "Price", "Value", "Weight"];

/// Ten holdings with valid ISINs.
pub const HOLDINGS: [[&str; 6]; 10] = [
    ["Apple Inc", "US0378331005", "100", "185.50", "18,550.00", "12.5%"],
    ["Microsoft Corp", "US5949181045", "50", "410.00", "20,500.00", "13.8%"],
    ["Alphabet Inc", "US02079K3059", "80", "140.25", "11,220.00", "7.6%"],
    ["Amazon.com Inc", "US0231351067", "60", "178.00", "10,680.00", "7.2%"],
    ["Tesla Inc", "US88160R1014", "40", "250.00", "10,000.00", "6.7%"],
    ["NVIDIA Corp", "US67066G1040", "30", "880.00", "26,400.00", "17.8%"],
    ["Nestle SA", "CH0038863350", "120", "95.40", "11,448.00", "7.7%"],
    ["Siemens AG", "DE0007164600", "70", "175.00", "12,250.00", "8.3%"],
    ["BP plc", "GB0002374006", "900", "5.10", "4,590.00", "3.1%"],
    ["iShares Core MSCI World", "IE00B4L5Y983", "250", "90.60", "22,650.00", "15.3%"],
];

/// Distinct widths so a cell crop identifies its column; all narrower than
/// the contour detector's minimum width.
pub const COLUMN_WIDTHS: [u32; 6] = [190, 175, 120, 105, 150, 90];
pub const MARGIN: u32 = 40;
pub const RULING: u32 = 2;
/// Inner padding the cell extractor trims from each side.
pub const CELL_PADDING: u32 = 4;

pub fn row_heights() -> Vec<u32> {
    (0..=HOLDINGS.len() as u32).map(|i| 36 + 8 * i).collect()
}

/// Text of a cell, row 0 being the header.
pub fn cell_text(row: usize, col: usize) -> &'static str {
    if row == 0 { HEADERS[col] } else { HOLDINGS[row - 1][col] }
}

/// A ruled portfolio table on a white page.
///
/// Cell content is drawn as short vertical strokes with a per-row offset,
/// so ink is present without forming long straight edges.
pub fn portfolio_table_image() -> GrayImage {
    let heights = row_heights();
    let table_w: u32 = COLUMN_WIDTHS.iter().sum();
    let table_h: u32 = heights.iter().sum();
    let mut img = GrayImage::from_pixel(table_w + 2 * MARGIN + RULING, table_h + 2 * MARGIN + RULING, Luma([255]));
    let black = Luma([0u8]);

    let mut ys = vec![MARGIN];
    for h in &heights {
        ys.push(ys[ys.len() - 1] + h);
    }
    let mut xs = vec![MARGIN];
    for w in COLUMN_WIDTHS {
        xs.push(xs[xs.len() - 1] + w);
    }

    for &y in &ys {
        draw_filled_rect_mut(&mut img, Rect::at(MARGIN as i32, y as i32).of_size(table_w + RULING, RULING), black);
    }
    for &x in &xs {
        draw_filled_rect_mut(&mut img, Rect::at(x as i32, MARGIN as i32).of_size(RULING, table_h + RULING), black);
    }

    for (row, pair) in ys.windows(2).enumerate() {
        let (top, height) = (pair[0], pair[1] - pair[0]);
        let stroke_h = (height - 2 * CELL_PADDING) / 3;
        let stroke_y = top + height / 2 - stroke_h / 2;
        let offset = (row as u32 * 5) % 12;

        for cell in xs.windows(2) {
            let mut x = cell[0] + RULING + CELL_PADDING + 4 + offset;
            let end = cell[1] - CELL_PADDING - 6;
            while x + 3 <= end {
                draw_filled_rect_mut(&mut img, Rect::at(x as i32, stroke_y as i32).of_size(3, stroke_h), black);
                x += 12;
            }
        }
    }

    img
}

/// OCR that reads a cell's text from the crop dimensions.
///
/// Large images (pages, whole tables) read as blank.
pub struct GridCellOcr;

impl GridCellOcr {
    fn nearest(value: u32, candidates: &[u32]) -> Option<usize> {
        candidates
            .iter()
            .enumerate()
            .min_by_key(|(_, c)| (**c as i64 - value as i64).abs())
            .filter(|(_, c)| (**c as i64 - value as i64).abs() <= 4)
            .map(|(i, _)| i)
    }
}

impl OcrProvider for GridCellOcr {
    fn recognize(&self, image: &DynamicImage, _language_hint: &str) -> Result<OcrOutput, OcrError> {
        let (w, h) = (image.width(), image.height());
        if w > 300 || h > 300 {
            return Ok(OcrOutput::empty());
        }
        let col = Self::nearest(w + 2 * CELL_PADDING, &COLUMN_WIDTHS);
        let row = Self::nearest(h + 2 * CELL_PADDING, &row_heights());
        Ok(match (row, col) {
            (Some(row), Some(col)) => OcrOutput::from_text(cell_text(row, col)),
            _ => OcrOutput::empty(),
        })
    }

    fn name(&self) -> &str {
        "grid-cell-mock"
    }
}

/// Single-font PDF whose pages hold the given text lines.
pub fn create_text_pdf(path: &Path, pages: &[Vec<&str>]) -> Result<(), Box<dyn std::error::Error>> {
    let mut doc = Document::with_version("1.5");

    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut page_ids = Vec::new();
    for lines in pages {
        let mut operations = vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 10.into()]),
            Operation::new("TL", vec![14.into()]),
            Operation::new("Td", vec![40.into(), 800.into()]),
        ];
        for (index, line) in lines.iter().enumerate() {
            operations.push(Operation::new("Tj", vec![Object::string_literal(*line)]));
            if index + 1 < lines.len() {
                operations.push(Operation::new("T*", vec![]));
            }
        }
        operations.push(Operation::new("ET", vec![]));

        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        page_ids.push(page_id);
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => page_ids.iter().map(|id| (*id).into()).collect::<Vec<Object>>(),
            "Count" => i64::try_from(page_ids.len())?,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();
    doc.save(path)?;
    Ok(())
}
