//! Text PDF writer with an embedded Unicode font
//!
//! Pages are laid out upstream as fixed-width lines; this module turns them
//! into A4 pages set in DejaVu Sans Mono. The font is embedded as a
//! CIDFontType2 under Identity-H, so strings are two-byte glyph ids, and a
//! ToUnicode map lets viewers and extractors recover the characters.

use super::ExportError;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream, StringFormat};
use std::collections::BTreeMap;
use std::fmt::Write;
use ttf_parser::{Face, GlyphId};

/// A4 in points
const PAGE_WIDTH: i64 = 595;
const PAGE_HEIGHT: i64 = 842;
const MARGIN: i64 = 50;
const FONT_SIZE: i64 = 10;
const LEADING: i64 = 14;

/// DejaVu Sans Mono advances about 0.6 em per glyph
pub const CHARS_PER_LINE: usize = ((PAGE_WIDTH - 2 * MARGIN) * 10 / (FONT_SIZE * 6)) as usize;
pub const LINES_PER_PAGE: usize = ((PAGE_HEIGHT - 2 * MARGIN) / LEADING) as usize;

static FONT_DATA: &[u8] = include_bytes!("../../assets/fonts/DejaVuSansMono.ttf");
const BASE_FONT: &str = "DejaVuSansMono";

/// bfchar blocks may hold at most 100 entries
const CMAP_BLOCK: usize = 100;

const CMAP_HEADER: &str = "/CIDInit /ProcSet findresource begin
12 dict begin
begincmap
/CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def
/CMapName /Adobe-Identity-UCS def
/CMapType 2 def
1 begincodespacerange
<0000> <FFFF>
endcodespacerange
";

const CMAP_FOOTER: &str = "endcmap
CMapName currentdict /CMap defineresource pop
end
end
";

/// Glyph lookup for the embedded font, remembering which glyphs the
/// document uses and the character each one stands for
struct Glyphs {
    face: Face<'static>,
    used: BTreeMap<u16, char>,
}

impl Glyphs {
    fn load() -> Result<Self, ExportError> {
        let face = Face::parse(FONT_DATA, 0)
            .map_err(|e| ExportError::Pdf(format!("embedded font: {}", e)))?;
        Ok(Self {
            face,
            used: BTreeMap::new(),
        })
    }

    /// Big-endian glyph ids for Identity-H. Characters the font lacks
    /// become .notdef (glyph 0) and get no ToUnicode entry.
    fn encode(&mut self, text: &str) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(text.len() * 2);
        for c in text.chars() {
            let c = if c.is_control() { ' ' } else { c };
            let gid = self.face.glyph_index(c).map_or(0, |g| g.0);
            if gid != 0 {
                self.used.entry(gid).or_insert(c);
            }
            bytes.extend_from_slice(&gid.to_be_bytes());
        }
        bytes
    }

    /// Font units to PDF glyph space (1/1000 em)
    fn scale(&self, units: i32) -> i64 {
        let per_em = i64::from(self.face.units_per_em().max(1));
        i64::from(units) * 1000 / per_em
    }

    fn width(&self, gid: u16) -> i64 {
        let advance = self.face.glyph_hor_advance(GlyphId(gid)).unwrap_or(0);
        self.scale(i32::from(advance))
    }

    /// `W` entries in the `c [w]` form, one per used glyph
    fn widths(&self) -> Vec<Object> {
        self.used
            .keys()
            .flat_map(|&gid| {
                [
                    Object::Integer(i64::from(gid)),
                    Object::Array(vec![Object::Integer(self.width(gid))]),
                ]
            })
            .collect()
    }

    fn to_unicode_cmap(&self) -> String {
        let mut cmap = String::from(CMAP_HEADER);
        let entries: Vec<(&u16, &char)> = self.used.iter().collect();

        for block in entries.chunks(CMAP_BLOCK) {
            let _ = writeln!(cmap, "{} beginbfchar", block.len());
            for (gid, c) in block {
                let mut units = [0u16; 2];
                let utf16: String = c
                    .encode_utf16(&mut units)
                    .iter()
                    .map(|unit| format!("{:04X}", unit))
                    .collect();
                let _ = writeln!(cmap, "<{:04X}> <{}>", gid, utf16);
            }
            cmap.push_str("endbfchar\n");
        }

        cmap.push_str(CMAP_FOOTER);
        cmap
    }

    /// Add the Type0 font and its descendants; returns the Type0 font id
    fn embed(&self, doc: &mut Document) -> ObjectId {
        let face = &self.face;
        let bbox = face.global_bounding_box();
        let cap_height = face.capital_height().unwrap_or(face.ascender());

        let file_id = doc.add_object(Stream::new(
            dictionary! { "Length1" => FONT_DATA.len() as i64 },
            FONT_DATA.to_vec(),
        ));

        let descriptor_id = doc.add_object(dictionary! {
            "Type" => "FontDescriptor",
            "FontName" => BASE_FONT,
            // FixedPitch | Nonsymbolic
            "Flags" => Object::Integer(33),
            "FontBBox" => vec![
                Object::Integer(self.scale(bbox.x_min.into())),
                Object::Integer(self.scale(bbox.y_min.into())),
                Object::Integer(self.scale(bbox.x_max.into())),
                Object::Integer(self.scale(bbox.y_max.into())),
            ],
            "ItalicAngle" => Object::Integer(0),
            "Ascent" => self.scale(face.ascender().into()),
            "Descent" => self.scale(face.descender().into()),
            "CapHeight" => self.scale(cap_height.into()),
            "StemV" => Object::Integer(80),
            "FontFile2" => file_id,
        });

        let cid_font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "CIDFontType2",
            "BaseFont" => BASE_FONT,
            "CIDSystemInfo" => dictionary! {
                "Registry" => Object::string_literal("Adobe"),
                "Ordering" => Object::string_literal("Identity"),
                "Supplement" => Object::Integer(0),
            },
            "FontDescriptor" => descriptor_id,
            "DW" => self.width(0),
            "W" => self.widths(),
            "CIDToGIDMap" => "Identity",
        });

        let to_unicode_id = doc.add_object(Stream::new(
            dictionary! {},
            self.to_unicode_cmap().into_bytes(),
        ));

        doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type0",
            "BaseFont" => BASE_FONT,
            "Encoding" => "Identity-H",
            "DescendantFonts" => vec![Object::Reference(cid_font_id)],
            "ToUnicode" => to_unicode_id,
        })
    }
}

fn page_content(lines: &[String], glyphs: &mut Glyphs) -> Content {
    let mut operations = vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec!["F1".into(), Object::Integer(FONT_SIZE)]),
        Operation::new("TL", vec![Object::Integer(LEADING)]),
        Operation::new(
            "Td",
            vec![
                Object::Integer(MARGIN),
                Object::Integer(PAGE_HEIGHT - MARGIN - FONT_SIZE),
            ],
        ),
    ];

    for line in lines {
        operations.push(Operation::new(
            "Tj",
            vec![Object::String(glyphs.encode(line), StringFormat::Hexadecimal)],
        ));
        operations.push(Operation::new("T*", vec![]));
    }

    operations.push(Operation::new("ET", vec![]));
    Content { operations }
}

/// Write pages of pre-wrapped lines. Each inner list must fit one page.
pub fn write_pages(pages: &[Vec<String>]) -> Result<Vec<u8>, ExportError> {
    let mut glyphs = Glyphs::load()?;
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for lines in pages {
        let encoded = page_content(lines, &mut glyphs)
            .encode()
            .map_err(|e| ExportError::Pdf(e.to_string()))?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
        let page_id: ObjectId = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    // Every page is encoded by now, so the glyph set is complete
    let font_id = glyphs.embed(&mut doc);
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => Object::Integer(count),
            "Resources" => resources_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(PAGE_WIDTH),
                Object::Integer(PAGE_HEIGHT),
            ],
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)
        .map_err(|e| ExportError::Pdf(e.to_string()))?;
    Ok(bytes)
}
