//! ffmpeg filter graph and argument construction

use std::ffi::OsString;
use std::path::Path;

use crate::settings::Position;

/// Inset from the frame edge for corner anchors, in pixels
pub const EDGE_INSET: i64 = 10;

/// Overlay height as a fraction of the source frame height
pub const OVERLAY_HEIGHT_RATIO: f64 = 0.1;

impl Position {
    /// ffmpeg `overlay` coordinates for this anchor
    pub fn overlay_expr(&self) -> &'static str {
        match self {
            Position::TopLeft => "10:10",
            Position::TopRight => "main_w-overlay_w-10:10",
            Position::BottomLeft => "10:main_h-overlay_h-10",
            Position::BottomRight => "main_w-overlay_w-10:main_h-overlay_h-10",
            Position::Center => "(main_w-overlay_w)/2:(main_h-overlay_h)/2",
        }
    }

    /// Pixel offset of an overlay of `w`x`h` on a frame of `frame_w`x`frame_h`.
    ///
    /// Evaluates the same formula as [`Position::overlay_expr`].
    pub fn offset(&self, frame_w: i64, frame_h: i64, w: i64, h: i64) -> (i64, i64) {
        match self {
            Position::TopLeft => (EDGE_INSET, EDGE_INSET),
            Position::TopRight => (frame_w - w - EDGE_INSET, EDGE_INSET),
            Position::BottomLeft => (EDGE_INSET, frame_h - h - EDGE_INSET),
            Position::BottomRight => (frame_w - w - EDGE_INSET, frame_h - h - EDGE_INSET),
            Position::Center => ((frame_w - w) / 2, (frame_h - h) / 2),
        }
    }
}

/// Filter graph that scales the overlay (input 1) against the video (input 0)
/// and composites it at `position`. Audio is untouched.
pub fn build_filter_graph(position: Position) -> String {
    format!(
        "[1][0]scale2ref=w=oh*mdar:h=ih*{}[wm][vid];[vid][wm]overlay={}",
        OVERLAY_HEIGHT_RATIO,
        position.overlay_expr()
    )
}

/// Full ffmpeg argument list for stamping `overlay` onto `input`
pub fn build_ffmpeg_args(
    input: &Path,
    overlay: &Path,
    output: &Path,
    position: Position,
) -> Vec<OsString> {
    vec![
        "-y".into(),
        "-i".into(),
        input.into(),
        "-i".into(),
        overlay.into(),
        "-filter_complex".into(),
        build_filter_graph(position).into(),
        "-codec:a".into(),
        "copy".into(),
        output.into(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offsets_for_every_anchor() {
        let (fw, fh, w, h) = (1920, 1080, 300, 108);

        assert_eq!(Position::TopLeft.offset(fw, fh, w, h), (10, 10));
        assert_eq!(Position::TopRight.offset(fw, fh, w, h), (1920 - 300 - 10, 10));
        assert_eq!(Position::BottomLeft.offset(fw, fh, w, h), (10, 1080 - 108 - 10));
        assert_eq!(
            Position::BottomRight.offset(fw, fh, w, h),
            (1920 - 300 - 10, 1080 - 108 - 10)
        );
        assert_eq!(Position::Center.offset(fw, fh, w, h), ((1920 - 300) / 2, (1080 - 108) / 2));
    }

    #[test]
    fn test_unknown_anchor_uses_bottom_right() {
        let fallback = Position::from_name("somewhere");
        assert_eq!(fallback.offset(640, 360, 64, 36), (566, 314));
        assert_eq!(fallback.overlay_expr(), Position::BottomRight.overlay_expr());
    }

    #[test]
    fn test_filter_graph() {
        assert_eq!(
            build_filter_graph(Position::TopLeft),
            "[1][0]scale2ref=w=oh*mdar:h=ih*0.1[wm][vid];[vid][wm]overlay=10:10"
        );
        assert!(build_filter_graph(Position::Center)
            .ends_with("overlay=(main_w-overlay_w)/2:(main_h-overlay_h)/2"));
    }

    #[test]
    fn test_ffmpeg_args_order() {
        let args = build_ffmpeg_args(
            Path::new("in.mp4"),
            Path::new("/tmp/wm.png"),
            Path::new("out.mp4"),
            Position::BottomRight,
        );
        let args: Vec<String> = args.iter().map(|a| a.to_string_lossy().into_owned()).collect();

        assert_eq!(args[..5], ["-y", "-i", "in.mp4", "-i", "/tmp/wm.png"]);
        assert_eq!(args[5], "-filter_complex");
        assert_eq!(args[7..], ["-codec:a", "copy", "out.mp4"]);
    }
}
