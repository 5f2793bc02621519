//! Watermark image rendering
//!
//! Renders watermark text onto a transparent RGBA canvas sized to the text
//! footprint plus a fixed margin. The canvas is then scaled and composited
//! by the video tool.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use ab_glyph::{point, Font, FontVec, PxScale, ScaleFont};
use image::{ImageFormat, Rgba, RgbaImage};
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Font file tried first when no explicit font is configured
pub const DEFAULT_FONT_NAME: &str = "arial.ttf";

/// Environment variable that overrides the font path
pub const FONT_PATH_ENV: &str = "WATERMARK_FONT_PATH";

/// Transparent margin around the text on every side, in pixels
pub const MARGIN: u32 = 10;

/// DejaVu Sans, used whenever no configured font can be read
const EMBEDDED_FONT: &[u8] = include_bytes!("fonts/DejaVuSans.ttf");

/// RGB color
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub const fn white() -> Self {
        Self::new(255, 255, 255)
    }

    /// Parse a color name or `#RGB` / `#RRGGBB`
    pub fn parse(spec: &str) -> Option<Self> {
        let spec = spec.trim();
        if let Some(hex) = spec.strip_prefix('#') {
            return parse_hex(hex);
        }

        let color = match spec.to_ascii_lowercase().as_str() {
            "white" => Self::white(),
            "black" => Self::new(0, 0, 0),
            "red" => Self::new(255, 0, 0),
            "green" => Self::new(0, 128, 0),
            "lime" => Self::new(0, 255, 0),
            "blue" => Self::new(0, 0, 255),
            "yellow" => Self::new(255, 255, 0),
            "cyan" | "aqua" => Self::new(0, 255, 255),
            "magenta" | "fuchsia" => Self::new(255, 0, 255),
            "gray" | "grey" => Self::new(128, 128, 128),
            "silver" => Self::new(192, 192, 192),
            "orange" => Self::new(255, 165, 0),
            _ => return None,
        };
        Some(color)
    }

    /// Like [`Color::parse`] but falls back to white
    pub fn parse_or_white(spec: &str) -> Self {
        Self::parse(spec).unwrap_or_else(|| {
            warn!(color = spec, "unknown color, using white");
            Self::white()
        })
    }
}

fn parse_hex(hex: &str) -> Option<Color> {
    let digit = |s: &str| u8::from_str_radix(s, 16).ok();
    match hex.len() {
        3 => Some(Color::new(
            digit(&hex[0..1])? * 17,
            digit(&hex[1..2])? * 17,
            digit(&hex[2..3])? * 17,
        )),
        6 => Some(Color::new(
            digit(&hex[0..2])?,
            digit(&hex[2..4])?,
            digit(&hex[4..6])?,
        )),
        _ => None,
    }
}

/// Options for rendering a watermark image
#[derive(Debug, Clone)]
pub struct TextImageOptions {
    pub text: String,
    /// Font size in pixels
    pub font_size: f32,
    pub color: Color,
    /// Opacity (0.0 to 1.0)
    pub opacity: f32,
}

/// Load the configured font, falling back to the embedded DejaVu Sans.
///
/// The lookup order is `font_path`, then [`FONT_PATH_ENV`], then
/// [`DEFAULT_FONT_NAME`] in the working directory. A missing or unreadable
/// font is logged and never fatal.
pub fn load_font(font_path: Option<&Path>) -> Result<FontVec> {
    let configured = font_path
        .map(Path::to_path_buf)
        .or_else(|| std::env::var_os(FONT_PATH_ENV).map(PathBuf::from));
    let explicit = configured.is_some();
    let requested = configured.unwrap_or_else(|| PathBuf::from(DEFAULT_FONT_NAME));

    if let Some(font) = try_load(&requested) {
        return Ok(font);
    }
    if explicit {
        warn!(font = %requested.display(), "font unavailable, using embedded DejaVu Sans");
    } else {
        debug!(font = %requested.display(), "default font absent, using embedded DejaVu Sans");
    }

    embedded_font()
}

/// The font compiled into the binary
pub fn embedded_font() -> Result<FontVec> {
    FontVec::try_from_vec(EMBEDDED_FONT.to_vec())
        .map_err(|e| Error::Render(format!("embedded font is unreadable: {}", e)))
}

fn try_load(path: &Path) -> Option<FontVec> {
    let data = fs::read(path).ok()?;
    match FontVec::try_from_vec(data) {
        Ok(font) => {
            debug!(font = %path.display(), "loaded font");
            Some(font)
        }
        Err(e) => {
            warn!(font = %path.display(), "invalid font file: {}", e);
            None
        }
    }
}

/// Measure rendered text, returning (width, height) in pixels
///
/// Empty text has no footprint at all.
pub fn measure_text(font: &FontVec, text: &str, font_size: f32) -> (u32, u32) {
    if text.is_empty() {
        return (0, 0);
    }
    let scaled = font.as_scaled(PxScale::from(font_size));

    let mut width = 0.0f32;
    let mut prev = None;
    for c in text.chars() {
        let id = scaled.glyph_id(c);
        if let Some(prev) = prev {
            width += scaled.kern(prev, id);
        }
        width += scaled.h_advance(id);
        prev = Some(id);
    }

    (width.ceil().max(0.0) as u32, scaled.height().ceil() as u32)
}

/// Render text onto a transparent canvas with a [`MARGIN`] on every side.
///
/// Empty text gives a fully transparent `2 * MARGIN` square.
pub fn render_text_image(font: &FontVec, options: &TextImageOptions) -> Result<RgbaImage> {
    if !(options.font_size > 0.0) {
        return Err(Error::Render(format!("invalid font size {}", options.font_size)));
    }

    let scale = PxScale::from(options.font_size);
    let scaled = font.as_scaled(scale);
    let (text_w, text_h) = measure_text(font, &options.text, options.font_size);
    let width = text_w + 2 * MARGIN;
    let height = text_h + 2 * MARGIN;

    let mut canvas = RgbaImage::new(width, height);
    let alpha = options.opacity.clamp(0.0, 1.0) * 255.0;
    let Color { r, g, b } = options.color;

    let baseline = MARGIN as f32 + scaled.ascent();
    let mut cursor = MARGIN as f32;
    let mut prev = None;

    for c in options.text.chars() {
        let id = scaled.glyph_id(c);
        if let Some(prev) = prev {
            cursor += scaled.kern(prev, id);
        }

        let glyph = id.with_scale_and_position(scale, point(cursor, baseline));
        if let Some(outlined) = font.outline_glyph(glyph) {
            let bounds = outlined.px_bounds();
            outlined.draw(|px, py, coverage| {
                let x = px as i64 + bounds.min.x as i64;
                let y = py as i64 + bounds.min.y as i64;
                if x < 0 || y < 0 || x >= width as i64 || y >= height as i64 {
                    return;
                }
                let a = (coverage.clamp(0.0, 1.0) * alpha).round() as u8;
                let pixel = canvas.get_pixel_mut(x as u32, y as u32);
                // Overlapping glyph edges keep the stronger coverage
                if a > pixel[3] {
                    *pixel = Rgba([r, g, b, a]);
                }
            });
        }

        cursor += scaled.h_advance(id);
        prev = Some(id);
    }

    Ok(canvas)
}

/// Render the watermark and write it as PNG into `out`
pub fn write_watermark_png<W: Write + std::io::Seek>(
    font: &FontVec,
    options: &TextImageOptions,
    out: W,
) -> Result<(u32, u32)> {
    let image = render_text_image(font, options)?;
    let mut writer = BufWriter::new(out);
    image.write_to(&mut writer, ImageFormat::Png)?;
    writer.flush()?;
    Ok(image.dimensions())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn font() -> FontVec {
        load_font(Some(Path::new("/nonexistent/arial.ttf"))).unwrap()
    }

    #[test]
    fn test_missing_font_falls_back_to_embedded() {
        let fallback = font();
        let embedded = embedded_font().unwrap();
        assert_eq!(
            measure_text(&fallback, "@YourChannel", 24.0),
            measure_text(&embedded, "@YourChannel", 24.0)
        );
    }

    #[test]
    fn test_named_colors() {
        assert_eq!(Color::parse("white"), Some(Color::white()));
        assert_eq!(Color::parse("Black"), Some(Color::new(0, 0, 0)));
        assert_eq!(Color::parse("grey"), Color::parse("gray"));
        assert_eq!(Color::parse("chartreuse-ish"), None);
    }

    #[test]
    fn test_hex_colors() {
        assert_eq!(Color::parse("#FFF"), Some(Color::white()));
        assert_eq!(Color::parse("#ff8000"), Some(Color::new(255, 128, 0)));
        assert_eq!(Color::parse("#12"), None);
        assert_eq!(Color::parse("#GGGGGG"), None);
    }

    #[test]
    fn test_unknown_color_falls_back_to_white() {
        assert_eq!(Color::parse_or_white("mauve-ish"), Color::white());
    }

    #[test]
    fn test_canvas_is_text_plus_margin() {
        let font = font();
        let options = TextImageOptions {
            text: "@YourChannel".to_string(),
            font_size: 24.0,
            color: Color::white(),
            opacity: 0.7,
        };

        let (w, h) = measure_text(&font, &options.text, options.font_size);
        let image = render_text_image(&font, &options).unwrap();

        assert_eq!(image.dimensions(), (w + 2 * MARGIN, h + 2 * MARGIN));
        // Margin stays transparent
        assert_eq!(image.get_pixel(0, 0)[3], 0);
        // Some pixel is painted, and none exceeds the requested opacity
        let max_alpha = image.pixels().map(|p| p[3]).max().unwrap();
        assert!(max_alpha > 0);
        assert!(max_alpha <= (0.7f32 * 255.0).round() as u8);
    }

    #[test]
    fn test_empty_text_renders_blank_margin_canvas() {
        let font = font();
        let options = TextImageOptions {
            text: String::new(),
            font_size: 24.0,
            color: Color::white(),
            opacity: 1.0,
        };

        let image = render_text_image(&font, &options).unwrap();

        assert_eq!(measure_text(&font, "", 24.0), (0, 0));
        assert_eq!(image.dimensions(), (2 * MARGIN, 2 * MARGIN));
        assert!(image.pixels().all(|p| p[3] == 0));
    }

    #[test]
    fn test_png_output_decodes() {
        let font = font();
        let options = TextImageOptions {
            text: "wm".to_string(),
            font_size: 16.0,
            color: Color::parse_or_white("yellow"),
            opacity: 0.5,
        };

        let mut buf = Cursor::new(Vec::new());
        let dims = write_watermark_png(&font, &options, &mut buf).unwrap();
        let decoded = image::load_from_memory_with_format(buf.get_ref(), ImageFormat::Png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), dims);
    }
}
