use std::collections::{BTreeMap, BTreeSet};

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use tracing::debug;

use crate::error::{Result, StampError};
use crate::logging::STAMP_DRAW;
use crate::overlay::PageCanvas;

/// Font used for overlays, matching the default form font of most editors.
pub const DEFAULT_FONT: &str = "Helvetica";

/// Attributes shared by every draw of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawStyle {
    /// Standard 14 base font name.
    pub font: String,
    pub size: f32,
    /// RGB components in `0..=1`.
    pub color: [f32; 3],
}

impl DrawStyle {
    pub fn new(size: f32, color: [f32; 3]) -> Self {
        DrawStyle {
            font: DEFAULT_FONT.to_string(),
            size,
            color,
        }
    }
}

/// Where and how a single string is drawn.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawOptions {
    pub x: f32,
    pub y: f32,
    pub size: f32,
    pub font: String,
    pub color: [f32; 3],
}

impl DrawOptions {
    pub fn at(x: f32, y: f32, style: &DrawStyle) -> Self {
        DrawOptions {
            x,
            y,
            size: style.size,
            font: style.font.clone(),
            color: style.color,
        }
    }
}

fn win_ansi_code(ch: char) -> Option<u8> {
    let code = match ch {
        '\u{20}'..='\u{7e}' | '\u{a0}'..='\u{ff}' => ch as u8,
        '€' => 0x80,
        '‚' => 0x82,
        'ƒ' => 0x83,
        '„' => 0x84,
        '…' => 0x85,
        '†' => 0x86,
        '‡' => 0x87,
        'ˆ' => 0x88,
        '‰' => 0x89,
        'Š' => 0x8a,
        '‹' => 0x8b,
        'Œ' => 0x8c,
        'Ž' => 0x8e,
        '‘' => 0x91,
        '’' => 0x92,
        '“' => 0x93,
        '”' => 0x94,
        '•' => 0x95,
        '–' => 0x96,
        '—' => 0x97,
        '˜' => 0x98,
        '™' => 0x99,
        'š' => 0x9a,
        '›' => 0x9b,
        'œ' => 0x9c,
        'ž' => 0x9e,
        'Ÿ' => 0x9f,
        _ => return None,
    };
    Some(code)
}

/// Encodes `text` for a standard font with `WinAnsiEncoding`.
pub fn encode_win_ansi(text: &str) -> Result<Vec<u8>> {
    text.chars()
        .map(|ch| {
            win_ansi_code(ch).ok_or_else(|| StampError::Unencodable {
                ch,
                text: text.to_string(),
            })
        })
        .collect()
}

/// Mutable drawing handle over a parsed document.
///
/// Each draw appends a content stream to the page. The first draw on a page
/// also wraps the existing content in `q`/`Q` so graphics state left over by
/// the original stream cannot move or recolor the overlay.
#[derive(Debug)]
pub struct LopdfCanvas {
    doc: Document,
    font_objects: BTreeMap<String, ObjectId>,
    wrapped_pages: BTreeSet<ObjectId>,
}

impl LopdfCanvas {
    pub fn new(doc: Document) -> Self {
        LopdfCanvas {
            doc,
            font_objects: BTreeMap::new(),
            wrapped_pages: BTreeSet::new(),
        }
    }

    pub fn load_mem(bytes: &[u8]) -> Result<Self> {
        Ok(LopdfCanvas::new(Document::load_mem(bytes)?))
    }

    fn page_id(&self, page_index: usize) -> Result<ObjectId> {
        let pages = self.doc.get_pages();
        let page = page_index as u32 + 1;
        pages
            .get(&page)
            .copied()
            .ok_or(StampError::PageNotFound {
                page,
                page_count: pages.len(),
            })
    }

    fn content_refs(&self, page_id: ObjectId) -> Result<Vec<Object>> {
        let page = self.doc.get_dictionary(page_id)?;
        let refs = match page.get(b"Contents") {
            Ok(Object::Array(items)) => items.clone(),
            Ok(Object::Reference(id)) => match self.doc.get_object(*id) {
                Ok(Object::Array(items)) => items.clone(),
                _ => vec![Object::Reference(*id)],
            },
            Ok(other) => vec![other.clone()],
            Err(_) => Vec::new(),
        };
        Ok(refs)
    }

    fn push_content(&mut self, page_id: ObjectId, bytes: Vec<u8>, prepend: bool) -> Result<()> {
        let mut refs = self.content_refs(page_id)?;
        let stream_id = self.doc.add_object(Stream::new(dictionary! {}, bytes));
        if prepend {
            refs.insert(0, Object::Reference(stream_id));
        } else {
            refs.push(Object::Reference(stream_id));
        }
        self.doc
            .get_object_mut(page_id)?
            .as_dict_mut()?
            .set("Contents", Object::Array(refs));
        Ok(())
    }

    fn wrap_existing_content(&mut self, page_id: ObjectId) -> Result<()> {
        if !self.wrapped_pages.insert(page_id) {
            return Ok(());
        }
        if self.content_refs(page_id)?.is_empty() {
            return Ok(());
        }
        self.push_content(page_id, b"q\n".to_vec(), true)?;
        self.push_content(page_id, b"\nQ\n".to_vec(), false)
    }

    fn inherited_resources(&self, page_id: ObjectId) -> Result<Dictionary> {
        let mut node = self.doc.get_dictionary(page_id)?;
        // Page trees are shallow; the bound only guards against cycles.
        for _ in 0..64 {
            let Ok(parent_id) = node.get(b"Parent").and_then(Object::as_reference) else {
                break;
            };
            let parent = self.doc.get_dictionary(parent_id)?;
            match parent.get(b"Resources") {
                Ok(Object::Reference(id)) => return Ok(self.doc.get_dictionary(*id)?.clone()),
                Ok(Object::Dictionary(dict)) => return Ok(dict.clone()),
                _ => node = parent,
            }
        }
        Ok(Dictionary::new())
    }

    /// The page's own resource dictionary, copying inherited resources onto
    /// the page when it has none.
    fn resources_mut(&mut self, page_id: ObjectId) -> Result<&mut Dictionary> {
        let own = match self.doc.get_dictionary(page_id)?.get(b"Resources") {
            Ok(Object::Reference(id)) => Some(Some(*id)),
            Ok(Object::Dictionary(_)) => Some(None),
            _ => None,
        };
        let indirect = match own {
            Some(indirect) => indirect,
            None => {
                let inherited = self.inherited_resources(page_id)?;
                self.doc
                    .get_object_mut(page_id)?
                    .as_dict_mut()?
                    .set("Resources", Object::Dictionary(inherited));
                None
            }
        };

        let resources = match indirect {
            Some(id) => self.doc.get_object_mut(id)?.as_dict_mut()?,
            None => self
                .doc
                .get_object_mut(page_id)?
                .as_dict_mut()?
                .get_mut(b"Resources")?
                .as_dict_mut()?,
        };
        Ok(resources)
    }

    fn font_object(&mut self, base_font: &str) -> ObjectId {
        if let Some(id) = self.font_objects.get(base_font) {
            return *id;
        }
        let id = self.doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => Object::Name(base_font.as_bytes().to_vec()),
            "Encoding" => "WinAnsiEncoding",
        });
        self.font_objects.insert(base_font.to_string(), id);
        id
    }

    /// Registers `base_font` in the page's font resources and returns the
    /// resource name to select it with `Tf`.
    fn register_font(&mut self, page_id: ObjectId, base_font: &str) -> Result<Vec<u8>> {
        let name = format!("PdfStamp{}", base_font.replace('-', "")).into_bytes();
        let font_id = self.font_object(base_font);

        let shared_fonts = match self.resources_mut(page_id)?.get(b"Font") {
            Ok(Object::Reference(id)) => Some(*id),
            _ => None,
        };
        let fonts = match shared_fonts {
            Some(id) => self.doc.get_object_mut(id)?.as_dict_mut()?,
            None => {
                let resources = self.resources_mut(page_id)?;
                if !matches!(resources.get(b"Font"), Ok(Object::Dictionary(_))) {
                    resources.set("Font", Dictionary::new());
                }
                resources.get_mut(b"Font")?.as_dict_mut()?
            }
        };
        fonts.set(name.clone(), Object::Reference(font_id));

        Ok(name)
    }
}

impl PageCanvas for LopdfCanvas {
    fn draw_text(&mut self, page_index: usize, text: &str, options: &DrawOptions) -> Result<()> {
        let page_id = self.page_id(page_index)?;
        let encoded = encode_win_ansi(text)?;

        self.wrap_existing_content(page_id)?;
        let font_name = self.register_font(page_id, &options.font)?;

        let [r, g, b] = options.color;
        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec![Object::Name(font_name), options.size.into()]),
                Operation::new("rg", vec![r.into(), g.into(), b.into()]),
                Operation::new(
                    "Tm",
                    vec![
                        1.into(),
                        0.into(),
                        0.into(),
                        1.into(),
                        options.x.into(),
                        options.y.into(),
                    ],
                ),
                Operation::new("Tj", vec![Object::String(encoded, StringFormat::Literal)]),
                Operation::new("ET", vec![]),
                Operation::new("Q", vec![]),
            ],
        };
        // Streams are concatenated when read; keep operators separated.
        let mut bytes = content.encode()?;
        bytes.push(b'\n');
        self.push_content(page_id, bytes, false)?;

        debug!(
            target: STAMP_DRAW,
            page = page_index + 1,
            x = options.x,
            y = options.y,
            "drew {:?}",
            text
        );
        Ok(())
    }

    fn save(&mut self) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        self.doc
            .save_to(&mut buffer)
            .map_err(|e| StampError::Save(e.to_string()))?;
        Ok(buffer)
    }
}
