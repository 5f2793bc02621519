//! Watermark application for video and PDF files
//!
//! Each operation renders a temporary overlay asset, hands it to ffmpeg or the
//! PDF stamper, and removes the asset again whatever the outcome. The `try_`
//! variants return the reason for a failure; the plain variants log it and
//! collapse to `bool`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tempfile::NamedTempFile;
use tracing::{error, info};

use crate::error::{Error, Result};
use crate::pdf::{stamp_overlay, write_overlay_pdf, OverlayOptions};
use crate::render::{load_font, write_watermark_png, Color, TextImageOptions};
use crate::settings::{Position, SettingsStore, WatermarkSettings};
use crate::video::{build_ffmpeg_args, ffmpeg_path, run_tool, DEFAULT_TIMEOUT};

/// File extensions treated as video
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "mkv", "avi", "webm", "m4v", "flv", "wmv", "mpg", "mpeg", "3gp"];

/// Kind of media a file holds, judged by extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Video,
    Pdf,
}

impl MediaKind {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        if ext == "pdf" {
            Some(MediaKind::Pdf)
        } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            Some(MediaKind::Video)
        } else {
            None
        }
    }
}

/// Parameters for a video watermark
#[derive(Debug, Clone)]
pub struct VideoWatermark {
    pub text: String,
    pub position: Position,
    pub opacity: f32,
    pub font_size: u32,
    pub color: String,
}

impl From<&WatermarkSettings> for VideoWatermark {
    fn from(settings: &WatermarkSettings) -> Self {
        Self {
            text: settings.text.clone(),
            position: settings.position,
            opacity: settings.opacity,
            font_size: settings.font_size,
            color: settings.color.clone(),
        }
    }
}

/// Parameters for a PDF watermark
#[derive(Debug, Clone)]
pub struct PdfWatermark {
    pub text: String,
    pub opacity: f32,
    pub angle: f32,
    pub font_size: u32,
}

impl From<&WatermarkSettings> for PdfWatermark {
    fn from(settings: &WatermarkSettings) -> Self {
        Self {
            text: settings.text.clone(),
            opacity: settings.pdf_opacity,
            angle: settings.pdf_angle,
            font_size: settings.pdf_font_size,
        }
    }
}

/// Applies watermarks, owning the tool and font configuration
#[derive(Debug, Clone)]
pub struct WatermarkApplier {
    ffmpeg: PathBuf,
    font_path: Option<PathBuf>,
    timeout: Option<Duration>,
    scratch_dir: PathBuf,
}

impl Default for WatermarkApplier {
    fn default() -> Self {
        Self::new()
    }
}

impl WatermarkApplier {
    pub fn new() -> Self {
        Self {
            ffmpeg: ffmpeg_path(None),
            font_path: None,
            timeout: Some(DEFAULT_TIMEOUT),
            scratch_dir: std::env::temp_dir(),
        }
    }

    /// Use a specific ffmpeg binary
    pub fn with_ffmpeg(mut self, path: impl Into<PathBuf>) -> Self {
        self.ffmpeg = path.into();
        self
    }

    /// Use a specific font file for video overlays
    pub fn with_font(mut self, path: impl Into<PathBuf>) -> Self {
        self.font_path = Some(path.into());
        self
    }

    /// Bound each ffmpeg run; `None` waits indefinitely
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Directory for temporary overlay assets
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = dir.into();
        self
    }

    /// Stamp `watermark` onto a video. Returns `false` on any failure.
    pub fn apply_video_watermark(&self, input: &Path, output: &Path, watermark: &VideoWatermark) -> bool {
        match self.try_apply_video_watermark(input, output, watermark) {
            Ok(()) => true,
            Err(e) => {
                error!(reason = e.reason(), input = %input.display(), "Error applying video watermark: {}", e);
                false
            }
        }
    }

    /// Stamp `watermark` onto a PDF. Returns `false` on any failure.
    pub fn apply_pdf_watermark(&self, input: &Path, output: &Path, watermark: &PdfWatermark) -> bool {
        match self.try_apply_pdf_watermark(input, output, watermark) {
            Ok(_) => true,
            Err(e) => {
                error!(reason = e.reason(), input = %input.display(), "Error applying PDF watermark: {}", e);
                false
            }
        }
    }

    pub fn try_apply_video_watermark(&self, input: &Path, output: &Path, watermark: &VideoWatermark) -> Result<()> {
        if !input.exists() {
            return Err(Error::FileNotFound(input.to_path_buf()));
        }

        // Removed on drop, on every return path
        let mut overlay = self.temp_asset(".png")?;

        let font = load_font(self.font_path.as_deref())?;
        let options = TextImageOptions {
            text: watermark.text.clone(),
            font_size: watermark.font_size as f32,
            color: Color::parse_or_white(&watermark.color),
            opacity: watermark.opacity,
        };
        let (w, h) = write_watermark_png(&font, &options, overlay.as_file_mut())?;

        let args = build_ffmpeg_args(input, overlay.path(), output, watermark.position);
        run_tool(&self.ffmpeg, &args, self.timeout)?;

        info!(
            input = %input.display(),
            output = %output.display(),
            overlay_size = %format!("{}x{}", w, h),
            position = %watermark.position,
            "video watermarked"
        );
        Ok(())
    }

    /// Returns the number of pages stamped
    pub fn try_apply_pdf_watermark(&self, input: &Path, output: &Path, watermark: &PdfWatermark) -> Result<usize> {
        if !input.exists() {
            return Err(Error::FileNotFound(input.to_path_buf()));
        }

        let mut overlay = self.temp_asset(".pdf")?;
        let options = OverlayOptions {
            text: watermark.text.clone(),
            opacity: watermark.opacity,
            angle: watermark.angle,
            font_size: watermark.font_size as f32,
            ..Default::default()
        };
        write_overlay_pdf(&options, overlay.as_file_mut())?;

        let pages = stamp_overlay(input, overlay.path(), output)?;

        info!(input = %input.display(), output = %output.display(), pages, "PDF watermarked");
        Ok(pages)
    }

    /// Watermark `input` using the stored settings, choosing the path by file type.
    ///
    /// Returns `Ok(false)` without touching anything when watermarking is disabled.
    pub fn apply_from_settings(&self, store: &SettingsStore, input: &Path, output: &Path) -> Result<bool> {
        let settings = store.watermark_status();
        if !settings.enabled {
            info!(input = %input.display(), "watermark disabled, skipping");
            return Ok(false);
        }

        match MediaKind::from_path(input) {
            Some(MediaKind::Video) => {
                self.try_apply_video_watermark(input, output, &VideoWatermark::from(&settings))?
            }
            Some(MediaKind::Pdf) => {
                self.try_apply_pdf_watermark(input, output, &PdfWatermark::from(&settings))?;
            }
            None => return Err(Error::UnsupportedMedia(input.to_path_buf())),
        }
        Ok(true)
    }

    fn temp_asset(&self, suffix: &str) -> Result<NamedTempFile> {
        Ok(tempfile::Builder::new()
            .prefix("watermark-")
            .suffix(suffix)
            .tempfile_in(&self.scratch_dir)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_kind_from_extension() {
        assert_eq!(MediaKind::from_path(Path::new("clip.MP4")), Some(MediaKind::Video));
        assert_eq!(MediaKind::from_path(Path::new("a/b/doc.pdf")), Some(MediaKind::Pdf));
        assert_eq!(MediaKind::from_path(Path::new("notes.txt")), None);
        assert_eq!(MediaKind::from_path(Path::new("noext")), None);
    }

    #[test]
    fn test_parameters_from_settings() {
        let settings = WatermarkSettings::default();

        let video = VideoWatermark::from(&settings);
        assert_eq!(video.position, Position::BottomRight);
        assert_eq!(video.font_size, 24);

        let pdf = PdfWatermark::from(&settings);
        assert_eq!(pdf.opacity, 0.3);
        assert_eq!(pdf.angle, 45.0);
        assert_eq!(pdf.font_size, 48);
    }

    #[test]
    fn test_missing_input_fails_cleanly() {
        let applier = WatermarkApplier::new();
        let ok = applier.apply_pdf_watermark(
            Path::new("missing.pdf"),
            Path::new("out.pdf"),
            &PdfWatermark::from(&WatermarkSettings::default()),
        );
        assert!(!ok);
    }
}
