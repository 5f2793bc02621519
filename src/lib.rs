//! Media Watermark Library
//!
//! Stamps a text watermark onto videos and PDFs, driven by a small JSON
//! settings file. This library provides functionality to:
//! - Persist watermark settings (text, anchor, opacity, sizes) to JSON
//! - Render the watermark text to a transparent PNG
//! - Composite that image onto a video with ffmpeg
//! - Tile rotated watermark text across every page of a PDF
//!
//! # Example
//!
//! ```no_run
//! use media_watermark::{SettingsStore, WatermarkApplier, PdfWatermark};
//! use std::path::Path;
//!
//! let store = SettingsStore::open_default().expect("Failed to load settings");
//! let settings = store.watermark_status();
//!
//! let applier = WatermarkApplier::new();
//! let ok = applier.apply_pdf_watermark(
//!     Path::new("handout.pdf"),
//!     Path::new("handout-stamped.pdf"),
//!     &PdfWatermark::from(&settings),
//! );
//! assert!(ok);
//! ```

pub mod applier;
pub mod error;
pub mod layout;
pub mod logging;
pub mod pdf;
pub mod render;
pub mod settings;
pub mod video;

// Re-export commonly used items
pub use applier::{MediaKind, PdfWatermark, VideoWatermark, WatermarkApplier};
pub use error::{Error, Result};
pub use settings::{BotConfig, Position, SettingUpdate, SettingsStore, WatermarkSettings};
