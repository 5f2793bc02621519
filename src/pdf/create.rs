//! Single-page watermark overlay creation using lopdf

use std::io::Write;

use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use tracing::debug;

use crate::error::Result;
use crate::layout::{tile_origins, PageDimensions};

/// Distance between repeated watermark lines, in points
pub const LINE_STRIDE: f64 = 200.0;

/// Resource names used inside the overlay page
const FONT_NAME: &str = "F1";
const GSTATE_NAME: &str = "GS1";

/// Options for creating a watermark overlay PDF
#[derive(Debug, Clone)]
pub struct OverlayOptions {
    /// Watermark text
    pub text: String,
    /// Fill opacity (0.0 to 1.0)
    pub opacity: f32,
    /// Text rotation in degrees, counter-clockwise
    pub angle: f32,
    /// Font size in points
    pub font_size: f32,
    /// Overlay page size
    pub page: PageDimensions,
}

impl Default for OverlayOptions {
    fn default() -> Self {
        Self {
            text: String::new(),
            opacity: 0.3,
            angle: 45.0,
            font_size: 48.0,
            page: PageDimensions::letter(),
        }
    }
}

/// Build a one-page PDF holding the tiled, rotated watermark text.
///
/// Every line gets its own rotated text matrix, so the page coordinate
/// system is never rotated and spacing stays even at any angle. Empty text
/// yields a blank page.
pub fn create_overlay_document(options: &OverlayOptions) -> Result<Document> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = use_helvetica_font(&mut doc);

    let mut gstate = Dictionary::new();
    gstate.set("Type", Object::Name(b"ExtGState".to_vec()));
    gstate.set("ca", Object::Real(options.opacity.clamp(0.0, 1.0)));
    gstate.set("CA", Object::Real(options.opacity.clamp(0.0, 1.0)));
    let gstate_id = doc.add_object(Object::Dictionary(gstate));

    let mut fonts = Dictionary::new();
    fonts.set(FONT_NAME, Object::Reference(font_id));
    let mut gstates = Dictionary::new();
    gstates.set(GSTATE_NAME, Object::Reference(gstate_id));
    let mut resources = Dictionary::new();
    resources.set("Font", Object::Dictionary(fonts));
    resources.set("ExtGState", Object::Dictionary(gstates));

    let content = generate_overlay_content(options);
    let content_id = doc.add_object(Stream::new(Dictionary::new(), content.into_bytes()));

    let width = options.page.width.pt() as f32;
    let height = options.page.height.pt() as f32;

    let mut page = Dictionary::new();
    page.set("Type", Object::Name(b"Page".to_vec()));
    page.set("Parent", Object::Reference(pages_id));
    page.set("MediaBox", Object::Array(vec![
        Object::Integer(0),
        Object::Integer(0),
        Object::Real(width),
        Object::Real(height),
    ]));
    page.set("Resources", Object::Dictionary(resources));
    page.set("Contents", Object::Reference(content_id));
    let page_id = doc.add_object(Object::Dictionary(page));

    let mut pages = Dictionary::new();
    pages.set("Type", Object::Name(b"Pages".to_vec()));
    pages.set("Count", Object::Integer(1));
    pages.set("Kids", Object::Array(vec![Object::Reference(page_id)]));
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let mut catalog = Dictionary::new();
    catalog.set("Type", Object::Name(b"Catalog".to_vec()));
    catalog.set("Pages", Object::Reference(pages_id));
    let catalog_id = doc.add_object(Object::Dictionary(catalog));
    doc.trailer.set("Root", Object::Reference(catalog_id));

    Ok(doc)
}

/// Create the overlay and write it to `out`
pub fn write_overlay_pdf<W: Write>(options: &OverlayOptions, out: &mut W) -> Result<()> {
    let mut doc = create_overlay_document(options)?;
    doc.compress();
    doc.save_to(out)?;
    debug!(text = %options.text, angle = options.angle, "overlay PDF written");
    Ok(())
}

/// Helvetica is one of the standard 14 fonts, so nothing is embedded
fn use_helvetica_font(doc: &mut Document) -> ObjectId {
    let mut font = Dictionary::new();
    font.set("Type", Object::Name(b"Font".to_vec()));
    font.set("Subtype", Object::Name(b"Type1".to_vec()));
    font.set("BaseFont", Object::Name(b"Helvetica".to_vec()));
    font.set("Encoding", Object::Name(b"WinAnsiEncoding".to_vec()));
    doc.add_object(Object::Dictionary(font))
}

/// Generate the content stream for the tiled watermark
fn generate_overlay_content(options: &OverlayOptions) -> String {
    let mut content = String::new();
    let angle = options.angle as f64;
    let (sin, cos) = angle.to_radians().sin_cos();
    let font_size = options.font_size as f64;
    let line_width = helvetica_text_width(&options.text, font_size);
    let text = escape_pdf_string(&options.text);

    content.push_str("q\n");
    content.push_str(&format!("/{} gs\n", GSTATE_NAME));
    content.push_str("0 g\n");
    content.push_str("BT\n");
    content.push_str(&format!("/{} {} Tf\n", FONT_NAME, fmt_num(font_size)));

    let origins = if options.text.is_empty() {
        Vec::new()
    } else {
        tile_origins(&options.page, angle, LINE_STRIDE, line_width)
    };

    for (x, y) in origins {
        content.push_str(&format!(
            "{} {} {} {} {} {} Tm\n",
            fmt_num(cos),
            fmt_num(sin),
            fmt_num(-sin),
            fmt_num(cos),
            fmt_num(x),
            fmt_num(y),
        ));
        content.push_str(&format!("({}) Tj\n", text));
    }

    content.push_str("ET\n");
    content.push_str("Q\n");
    content
}

fn fmt_num(v: f64) -> String {
    let s = format!("{:.3}", v);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    match s {
        "-0" | "" => "0".to_string(),
        _ => s.to_string(),
    }
}

/// Escape text for a PDF literal string in WinAnsiEncoding.
///
/// Characters outside Latin-1 become `?`; non-ASCII Latin-1 is written as
/// octal escapes so the content stream stays ASCII.
fn escape_pdf_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '(' => out.push_str("\\("),
            ')' => out.push_str("\\)"),
            '\r' => out.push_str("\\r"),
            '\n' => out.push_str("\\n"),
            ' '..='~' => out.push(c),
            c if (c as u32) < 256 => out.push_str(&format!("\\{:03o}", c as u32)),
            _ => out.push('?'),
        }
    }
    out
}

/// Helvetica advance widths for chars 32-126, in 1/1000 em
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // '0'..'?'
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // '@'..'O'
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // 'P'..'_'
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // '`'..'o'
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // 'p'..'~'
];

/// Width of `text` set in Helvetica at `font_size`, in points
fn helvetica_text_width(text: &str, font_size: f64) -> f64 {
    let units: u32 = text
        .chars()
        .map(|c| match c {
            ' '..='~' => HELVETICA_WIDTHS[(c as usize) - 32] as u32,
            _ => 556,
        })
        .sum();
    units as f64 * font_size / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(text: &str) -> OverlayOptions {
        OverlayOptions {
            text: text.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_overlay_has_single_letter_page() {
        let doc = create_overlay_document(&options("@YourChannel")).unwrap();
        let pages = doc.get_pages();
        assert_eq!(pages.len(), 1);

        let page = doc.get_object(pages[&1]).unwrap().as_dict().unwrap();
        let media_box = page.get(b"MediaBox").unwrap().as_array().unwrap();
        assert_eq!(media_box.len(), 4);
    }

    #[test]
    fn test_content_repeats_text_with_rotation() {
        let content = generate_overlay_content(&options("wm"));
        let lines = content.matches("(wm) Tj").count();
        assert_eq!(lines, 7);
        // cos 45 = sin 45 = 0.707
        assert!(content.contains("0.707 0.707 -0.707 0.707 "));
        assert!(content.contains("/GS1 gs"));
        assert!(content.contains("/F1 48 Tf"));
    }

    #[test]
    fn test_zero_angle_uses_identity_rotation() {
        let content = generate_overlay_content(&OverlayOptions {
            angle: 0.0,
            ..options("x")
        });
        assert!(content.contains("1 0 0 1 "));
    }

    #[test]
    fn test_empty_text_gives_blank_overlay() {
        let content = generate_overlay_content(&options(""));
        assert!(!content.contains("Tj"));

        let mut buf = Vec::new();
        write_overlay_pdf(&options(""), &mut buf).unwrap();
        assert_eq!(Document::load_mem(&buf).unwrap().get_pages().len(), 1);
    }

    #[test]
    fn test_escape_pdf_string() {
        assert_eq!(escape_pdf_string("a(b)c\\"), "a\\(b\\)c\\\\");
        assert_eq!(escape_pdf_string("café"), "caf\\351");
        assert_eq!(escape_pdf_string("日本"), "??");
    }

    #[test]
    fn test_helvetica_width() {
        // 'A' = 667, 'i' = 222
        assert!((helvetica_text_width("Ai", 10.0) - 8.89).abs() < 1e-9);
        assert_eq!(helvetica_text_width("", 10.0), 0.0);
    }

    #[test]
    fn test_fmt_num() {
        assert_eq!(fmt_num(1.0), "1");
        assert_eq!(fmt_num(-0.0001), "0");
        assert_eq!(fmt_num(12.5), "12.5");
        assert_eq!(fmt_num(0.70710678), "0.707");
    }

    #[test]
    fn test_overlay_round_trips_through_bytes() {
        let mut buf = Vec::new();
        write_overlay_pdf(&options("@YourChannel"), &mut buf).unwrap();
        let doc = Document::load_mem(&buf).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }
}
