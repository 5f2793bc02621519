//! PDF watermarking module

pub mod create;
pub mod merge;
pub mod metadata;

// Re-export commonly used items
pub use create::{create_overlay_document, write_overlay_pdf, OverlayOptions};
pub use merge::{stamp_document, stamp_overlay};
pub use metadata::{count_pages, extract_metadata, PdfMetadata};
