//! Video watermarking through an external ffmpeg process

pub mod ffmpeg;
pub mod filter;

// Re-export commonly used items
pub use ffmpeg::{ffmpeg_path, run_tool, DEFAULT_TIMEOUT};
pub use filter::{build_ffmpeg_args, build_filter_graph, OVERLAY_HEIGHT_RATIO};
