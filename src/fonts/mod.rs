use lopdf::{Dictionary, Document, Object};

/// Width used for codes a simple font does not list, in glyph space units.
const PROPORTIONAL_FALLBACK_WIDTH: f32 = 500.0;
const MONOSPACE_WIDTH: f32 = 600.0;
const CID_DEFAULT_WIDTH: f32 = 1000.0;

/// Glyph advance widths for one font, in thousandths of text space.
#[derive(Debug, Clone)]
pub struct GlyphWidths {
    first_char: u32,
    widths: Vec<f32>,
    missing_width: f32,
    two_byte: bool,
}

impl Default for GlyphWidths {
    fn default() -> Self {
        GlyphWidths {
            first_char: 0,
            widths: Vec::new(),
            missing_width: PROPORTIONAL_FALLBACK_WIDTH,
            two_byte: false,
        }
    }
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        _ => obj,
    }
}

fn as_number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(f) => Some(*f),
        _ => None,
    }
}

impl GlyphWidths {
    /// Reads `/FirstChar` and `/Widths` from a simple font, or `/DW` from the
    /// descendant of a Type0 font. Standard 14 fonts without a widths array
    /// fall back to a fixed width (exact for Courier).
    pub fn from_font(doc: &Document, font: &Dictionary) -> Self {
        let subtype = font
            .get(b"Subtype")
            .and_then(Object::as_name)
            .unwrap_or_default();

        if subtype == b"Type0" {
            let default_width = font
                .get(b"DescendantFonts")
                .map(|obj| resolve(doc, obj))
                .and_then(Object::as_array)
                .ok()
                .and_then(|descendants| descendants.first())
                .map(|obj| resolve(doc, obj))
                .and_then(|obj| obj.as_dict().ok())
                .and_then(|descendant| descendant.get(b"DW").ok())
                .and_then(as_number)
                .unwrap_or(CID_DEFAULT_WIDTH);

            return GlyphWidths {
                first_char: 0,
                widths: Vec::new(),
                missing_width: default_width,
                two_byte: true,
            };
        }

        let base_font = font
            .get(b"BaseFont")
            .and_then(Object::as_name)
            .map(|name| String::from_utf8_lossy(name).into_owned())
            .unwrap_or_default();
        let missing_width = if sanitize_font_name(&base_font).starts_with("Courier") {
            MONOSPACE_WIDTH
        } else {
            PROPORTIONAL_FALLBACK_WIDTH
        };

        let first_char = font
            .get(b"FirstChar")
            .ok()
            .and_then(as_number)
            .map(|n| n as u32)
            .unwrap_or(0);
        let widths: Vec<f32> = font
            .get(b"Widths")
            .map(|obj| resolve(doc, obj))
            .and_then(Object::as_array)
            .map(|arr| {
                arr.iter()
                    .map(|w| as_number(resolve(doc, w)).unwrap_or(missing_width))
                    .collect()
            })
            .unwrap_or_default();

        GlyphWidths {
            first_char,
            widths,
            missing_width,
            two_byte: false,
        }
    }

    pub fn is_two_byte(&self) -> bool {
        self.two_byte
    }

    /// Character codes of a shown string.
    pub fn codes(&self, bytes: &[u8]) -> Vec<u32> {
        if self.two_byte {
            bytes
                .chunks(2)
                .map(|pair| pair.iter().fold(0u32, |acc, b| (acc << 8) | u32::from(*b)))
                .collect()
        } else {
            bytes.iter().map(|b| u32::from(*b)).collect()
        }
    }

    pub fn width(&self, code: u32) -> f32 {
        code.checked_sub(self.first_char)
            .and_then(|i| self.widths.get(i as usize))
            .copied()
            .unwrap_or(self.missing_width)
    }
}

/// Strips subset prefixes (`ABCDEF+`) and PostScript suffixes, and maps
/// common aliases to their standard 14 names.
pub fn sanitize_font_name(raw_name: &str) -> &str {
    let without_subset = raw_name.rsplit('+').next().unwrap_or(raw_name);
    let cleaned = without_subset
        .strip_suffix("PSMT")
        .or_else(|| without_subset.strip_suffix("MT"))
        .or_else(|| without_subset.strip_suffix("PS"))
        .unwrap_or(without_subset);

    if cleaned.starts_with("TimesNewRoman") {
        return match cleaned.trim_start_matches("TimesNewRoman").trim_start_matches(',') {
            "Bold" => "Times-Bold",
            "Italic" => "Times-Italic",
            "BoldItalic" => "Times-BoldItalic",
            _ => "Times-Roman",
        };
    }

    match cleaned {
        "Arial" => "Helvetica",
        "Arial-Bold" | "Arial,Bold" | "ArialBold" => "Helvetica-Bold",
        "CourierNew" => "Courier",
        _ => cleaned,
    }
}
