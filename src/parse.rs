use std::collections::BTreeMap;
use std::fmt;

use lopdf::content::Operation;
use lopdf::{Document, Encoding, Object};
use tracing::{debug, trace, warn};

use crate::error::{Result, StampError};
use crate::fonts::{sanitize_font_name, GlyphWidths};
use crate::logging::STAMP_EXTRACT;
use crate::matcher::TextItem;
use crate::overlay::TextExtractor;

/// Affine matrix `[a b c d e f]` in PDF row-vector convention.
pub type Matrix = [f32; 6];

pub const IDENTITY: Matrix = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

/// Gap, as a fraction of the font size, that reads as a word space.
const WORD_GAP_RATIO: f32 = 0.3;

/// A positioned run of text produced by one text-showing operator.
#[derive(Debug, Clone, PartialEq)]
pub struct TextFragment {
    pub text: String,
    /// Text rendering matrix at the start of the string.
    pub transform: Matrix,
    pub font_name: Option<String>,
    pub font_size: f32,
    pub page_number: u32,
}

impl TextFragment {
    /// The translation part of the transform, in page user space.
    pub fn anchor(&self) -> (f32, f32) {
        (self.transform[4], self.transform[5])
    }
}

impl TextItem for TextFragment {
    fn text(&self) -> &str {
        &self.text
    }
}

impl fmt::Display for TextFragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (x, y) = self.anchor();
        write!(
            f,
            "\"{}\" at ({:.2}, {:.2}) {}pt{}",
            self.text,
            x,
            y,
            self.font_size,
            self.font_name
                .as_ref()
                .map(|n| format!(" {}", n))
                .unwrap_or_default()
        )
    }
}

/// One entry of a page's extracted content, in content-stream order.
#[derive(Debug, Clone, PartialEq)]
pub enum PageContent {
    Text(TextFragment),
    BeginMarkedContent { tag: String },
    EndMarkedContent,
}

impl PageContent {
    pub fn as_text(&self) -> Option<&TextFragment> {
        match self {
            PageContent::Text(fragment) => Some(fragment),
            _ => None,
        }
    }
}

/// Keeps only the entries with a text payload, preserving order.
pub fn text_fragments(contents: Vec<PageContent>) -> Vec<TextFragment> {
    contents
        .into_iter()
        .filter_map(|content| match content {
            PageContent::Text(fragment) => Some(fragment),
            _ => None,
        })
        .collect()
}

pub fn multiply_matrices(a: &Matrix, b: &Matrix) -> Matrix {
    [
        a[0] * b[0] + a[1] * b[2],
        a[0] * b[1] + a[1] * b[3],
        a[2] * b[0] + a[3] * b[2],
        a[2] * b[1] + a[3] * b[3],
        a[4] * b[0] + a[5] * b[2] + b[4],
        a[4] * b[1] + a[5] * b[3] + b[5],
    ]
}

pub fn translate_matrix(x: f32, y: f32) -> Matrix {
    [1.0, 0.0, 0.0, 1.0, x, y]
}

fn operand_as_float(obj: &Object) -> f32 {
    match obj {
        Object::Integer(i) => *i as f32,
        Object::Real(f) => *f,
        _ => 0.0,
    }
}

fn matrix_from_operands(op: &Operation) -> Matrix {
    op.operands
        .iter()
        .map(operand_as_float)
        .collect::<Vec<f32>>()
        .try_into()
        .unwrap_or(IDENTITY)
}

struct PageFont<'a> {
    base_font: Option<String>,
    encoding: Option<Encoding<'a>>,
    widths: GlyphWidths,
}

impl PageFont<'_> {
    fn decode(&self, bytes: &[u8]) -> String {
        if let Some(encoding) = &self.encoding {
            match Document::decode_text(encoding, bytes) {
                Ok(text) => return text,
                Err(e) => warn!(target: STAMP_EXTRACT, "falling back to Latin-1 decoding: {}", e),
            }
        }
        bytes.iter().map(|b| char::from(*b)).collect()
    }
}

/// Text parameters saved and restored by `q`/`Q`.
#[derive(Clone, Debug)]
struct GraphicsState {
    ctm: Matrix,
    font_key: Option<Vec<u8>>,
    font_size: f32,
    character_spacing: f32,  // Tc
    word_spacing: f32,       // Tw
    horizontal_scaling: f32, // Tz, as a fraction
    leading: f32,            // TL
    rise: f32,               // Ts
}

impl Default for GraphicsState {
    fn default() -> Self {
        GraphicsState {
            ctm: IDENTITY,
            font_key: None,
            font_size: 0.0,
            character_spacing: 0.0,
            word_spacing: 0.0,
            horizontal_scaling: 1.0,
            leading: 0.0,
            rise: 0.0,
        }
    }
}

struct PageInterpreter<'a> {
    page_number: u32,
    fonts: BTreeMap<Vec<u8>, PageFont<'a>>,
    fallback_font: PageFont<'a>,
    current: GraphicsState,
    saved: Vec<GraphicsState>,
    text_matrix: Matrix,      // Tm
    text_line_matrix: Matrix, // Tlm
    /// User-space point where the previous fragment ended.
    last_end: Option<(f32, f32)>,
    contents: Vec<PageContent>,
}

enum ShowElement<'o> {
    Text(&'o [u8]),
    Adjust(f32),
}

impl<'a> PageInterpreter<'a> {
    fn new(doc: &'a Document, page_number: u32, page_id: lopdf::ObjectId) -> Result<Self> {
        let page_fonts = doc.get_page_fonts(page_id)?;
        let fonts = page_fonts
            .into_iter()
            .map(|(key, dict)| {
                let encoding = match dict.get_font_encoding(doc) {
                    Ok(encoding) => Some(encoding),
                    Err(e) => {
                        warn!(
                            target: STAMP_EXTRACT,
                            font = %String::from_utf8_lossy(&key),
                            "no usable encoding: {}", e
                        );
                        None
                    }
                };
                let base_font = dict
                    .get(b"BaseFont")
                    .and_then(Object::as_name)
                    .map(|name| sanitize_font_name(&String::from_utf8_lossy(name)).to_string())
                    .ok();
                let font = PageFont {
                    base_font,
                    encoding,
                    widths: GlyphWidths::from_font(doc, dict),
                };
                (key, font)
            })
            .collect();

        Ok(PageInterpreter {
            page_number,
            fonts,
            fallback_font: PageFont {
                base_font: None,
                encoding: None,
                widths: GlyphWidths::default(),
            },
            current: GraphicsState::default(),
            saved: Vec::new(),
            text_matrix: IDENTITY,
            text_line_matrix: IDENTITY,
            last_end: None,
            contents: Vec::new(),
        })
    }

    fn move_line(&mut self, tx: f32, ty: f32) {
        self.text_line_matrix = multiply_matrices(&translate_matrix(tx, ty), &self.text_line_matrix);
        self.text_matrix = self.text_line_matrix;
    }

    fn text_rendering_matrix(&self) -> Matrix {
        let gs = &self.current;
        let params = [
            gs.font_size * gs.horizontal_scaling,
            0.0,
            0.0,
            gs.font_size,
            0.0,
            gs.rise,
        ];
        multiply_matrices(&params, &multiply_matrices(&self.text_matrix, &gs.ctm))
    }

    /// Appends a space to the previous fragment when `transform` starts on
    /// the same line, past a word gap from where that fragment ended.
    fn mark_word_gap(&mut self, transform: &Matrix) {
        let Some((end_x, end_y)) = self.last_end else {
            return;
        };
        let size = transform[2].hypot(transform[3]);
        let same_line = (transform[5] - end_y).abs() <= 0.1 * size;
        if !same_line || transform[4] - end_x <= WORD_GAP_RATIO * size {
            return;
        }

        let previous = self.contents.iter_mut().rev().find_map(|content| match content {
            PageContent::Text(fragment) => Some(fragment),
            _ => None,
        });
        if let Some(previous) = previous {
            if !previous.text.is_empty() && !previous.text.ends_with(' ') {
                previous.text.push(' ');
            }
        }
    }

    /// Emits one fragment for a show operator and advances the text matrix
    /// past every shown glyph and kerning adjustment.
    fn show(&mut self, elements: &[ShowElement<'_>]) {
        let transform = self.text_rendering_matrix();
        self.mark_word_gap(&transform);

        let gs = &self.current;
        let font = gs
            .font_key
            .as_ref()
            .and_then(|key| self.fonts.get(key))
            .unwrap_or(&self.fallback_font);

        let mut text = String::new();
        let mut advance = 0.0;
        let mut gap_pending = false;
        for element in elements {
            match element {
                ShowElement::Text(bytes) => {
                    if gap_pending && !text.is_empty() && !text.ends_with(' ') {
                        text.push(' ');
                    }
                    gap_pending = false;
                    text.push_str(&font.decode(bytes));
                    for code in font.widths.codes(bytes) {
                        let mut glyph_advance =
                            font.widths.width(code) / 1000.0 * gs.font_size + gs.character_spacing;
                        if code == 32 && !font.widths.is_two_byte() {
                            glyph_advance += gs.word_spacing;
                        }
                        advance += glyph_advance * gs.horizontal_scaling;
                    }
                }
                ShowElement::Adjust(amount) => {
                    // Negative adjustments move right, in thousandths of an em
                    if -amount / 1000.0 > WORD_GAP_RATIO {
                        gap_pending = true;
                    }
                    advance -= amount / 1000.0 * gs.font_size * gs.horizontal_scaling;
                }
            }
        }

        let fragment = TextFragment {
            text,
            transform,
            font_name: font.base_font.clone(),
            font_size: gs.font_size,
            page_number: self.page_number,
        };
        trace!(target: STAMP_EXTRACT, "{}", fragment);
        self.contents.push(PageContent::Text(fragment));

        self.text_matrix = multiply_matrices(&translate_matrix(advance, 0.0), &self.text_matrix);
        let end = multiply_matrices(&self.text_matrix, &self.current.ctm);
        self.last_end = Some((end[4], end[5]));
    }

    fn handle_operator(&mut self, op: &Operation) {
        match op.operator.as_ref() {
            "q" => self.saved.push(self.current.clone()),
            "Q" => {
                if let Some(state) = self.saved.pop() {
                    self.current = state;
                }
            }
            "cm" => {
                let matrix = matrix_from_operands(op);
                self.current.ctm = multiply_matrices(&matrix, &self.current.ctm);
            }
            "BT" => {
                self.text_matrix = IDENTITY;
                self.text_line_matrix = IDENTITY;
            }
            "Tf" => {
                if let (Some(Object::Name(font_key)), Some(size)) =
                    (op.operands.first(), op.operands.get(1))
                {
                    self.current.font_key = Some(font_key.clone());
                    self.current.font_size = operand_as_float(size);
                }
            }
            "Tc" => {
                if let Some(spacing) = op.operands.first() {
                    self.current.character_spacing = operand_as_float(spacing);
                }
            }
            "Tw" => {
                if let Some(spacing) = op.operands.first() {
                    self.current.word_spacing = operand_as_float(spacing);
                }
            }
            "Tz" => {
                if let Some(scale_percent) = op.operands.first() {
                    self.current.horizontal_scaling = operand_as_float(scale_percent) / 100.0;
                }
            }
            "TL" => {
                if let Some(leading) = op.operands.first() {
                    self.current.leading = operand_as_float(leading);
                }
            }
            "Ts" => {
                if let Some(rise) = op.operands.first() {
                    self.current.rise = operand_as_float(rise);
                }
            }
            "Tm" => {
                let m = matrix_from_operands(op);
                self.text_matrix = m;
                self.text_line_matrix = m;
            }
            "Td" | "TD" => {
                if let (Some(tx), Some(ty)) = (op.operands.first(), op.operands.get(1)) {
                    let (tx, ty) = (operand_as_float(tx), operand_as_float(ty));
                    if op.operator == "TD" {
                        self.current.leading = -ty;
                    }
                    self.move_line(tx, ty);
                }
            }
            "T*" => self.move_line(0.0, -self.current.leading),
            "Tj" => {
                if let Some(Object::String(bytes, _)) = op.operands.first() {
                    self.show(&[ShowElement::Text(bytes)]);
                }
            }
            "TJ" => {
                if let Some(Object::Array(items)) = op.operands.first() {
                    let elements: Vec<ShowElement<'_>> = items
                        .iter()
                        .filter_map(|item| match item {
                            Object::String(bytes, _) => Some(ShowElement::Text(bytes)),
                            Object::Integer(_) | Object::Real(_) => {
                                Some(ShowElement::Adjust(operand_as_float(item)))
                            }
                            _ => None,
                        })
                        .collect();
                    self.show(&elements);
                }
            }
            "'" => {
                self.move_line(0.0, -self.current.leading);
                if let Some(Object::String(bytes, _)) = op.operands.first() {
                    self.show(&[ShowElement::Text(bytes)]);
                }
            }
            "\"" => {
                if let [aw, ac, Object::String(bytes, _)] = op.operands.as_slice() {
                    self.current.word_spacing = operand_as_float(aw);
                    self.current.character_spacing = operand_as_float(ac);
                    self.move_line(0.0, -self.current.leading);
                    self.show(&[ShowElement::Text(bytes)]);
                }
            }
            "BMC" | "BDC" => {
                let tag = match op.operands.first() {
                    Some(Object::Name(name)) => String::from_utf8_lossy(name).into_owned(),
                    _ => String::new(),
                };
                self.contents.push(PageContent::BeginMarkedContent { tag });
            }
            "EMC" => self.contents.push(PageContent::EndMarkedContent),
            _ => {}
        }
    }
}

/// Interprets the content stream of a 1-based page and returns its text
/// fragments and marked-content markers in stream order.
pub fn page_content(doc: &Document, page_number: u32) -> Result<Vec<PageContent>> {
    let pages = doc.get_pages();
    let page_id = *pages.get(&page_number).ok_or(StampError::PageNotFound {
        page: page_number,
        page_count: pages.len(),
    })?;

    let content = doc.get_and_decode_page_content(page_id)?;
    let mut interpreter = PageInterpreter::new(doc, page_number, page_id)?;

    for op in &content.operations {
        interpreter.handle_operator(op);
    }

    debug!(
        target: STAMP_EXTRACT,
        page = page_number,
        entries = interpreter.contents.len(),
        "extracted page content"
    );

    Ok(interpreter.contents)
}

/// Read-only extraction handle over a parsed document.
#[derive(Debug)]
pub struct LopdfExtractor {
    doc: Document,
}

impl LopdfExtractor {
    pub fn new(doc: Document) -> Self {
        LopdfExtractor { doc }
    }

    pub fn load_mem(bytes: &[u8]) -> Result<Self> {
        Ok(LopdfExtractor::new(Document::load_mem(bytes)?))
    }
}

impl TextExtractor for LopdfExtractor {
    fn page_fragments(&self, page_number: u32) -> Result<Vec<TextFragment>> {
        Ok(text_fragments(page_content(&self.doc, page_number)?))
    }
}
