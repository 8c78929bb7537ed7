//! FFmpeg video filter definitions for the title overlay and final upscale.

use std::path::{Path, PathBuf};

use promo_models::{EncodingProfile, UpscaleTarget};

use crate::command::FfmpegCommand;
use crate::text_layout::TitleLayout;

// =============================================================================
// Overlay style (builder pattern)
// =============================================================================

/// Visual style of the title box.
///
/// ```ignore
/// let style = OverlayStyle::default().with_font_file("/usr/share/fonts/Roboto.ttf");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayStyle {
    pub font_color: String,
    pub box_color: String,
    pub box_border: u32,
    pub line_spacing: u32,
    /// Font with the needed glyphs; ffmpeg's default font is used when unset.
    pub font_file: Option<PathBuf>,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            font_color: "white".to_string(),
            box_color: "black@0.85".to_string(),
            box_border: 20,
            line_spacing: 8,
            font_file: None,
        }
    }
}

impl OverlayStyle {
    pub fn with_font_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.font_file = Some(path.into());
        self
    }
}

// =============================================================================
// Filter builders
// =============================================================================

fn escape_filter_path(path: &Path) -> String {
    path.to_string_lossy()
        .replace('\\', "\\\\")
        .replace('\'', "\\'")
        .replace(':', "\\:")
}

/// Build the `drawtext` filter for a laid out title.
///
/// Text is horizontally centered and drawn on an opaque box.
pub fn drawtext_filter(layout: &TitleLayout, style: &OverlayStyle) -> String {
    let mut filter = format!(
        "drawtext=text='{}':fontsize={}:fontcolor={}:x=(w-text_w)/2:y={}:box=1:boxcolor={}:boxborderw={}:line_spacing={}",
        layout.escaped_text(),
        layout.fontsize,
        style.font_color,
        layout.y_offset,
        style.box_color,
        style.box_border,
        style.line_spacing,
    );

    if let Some(font) = &style.font_file {
        filter.push_str(&format!(":fontfile='{}'", escape_filter_path(font)));
    }

    filter
}

/// Scale to fit inside `target` keeping aspect ratio, then pad with black.
pub fn upscale_filter(target: UpscaleTarget) -> String {
    let UpscaleTarget { width, height } = target;
    format!(
        "scale={w}:{h}:force_original_aspect_ratio=decrease:flags=lanczos,pad={w}:{h}:(ow-iw)/2:(oh-ih)/2:black",
        w = width,
        h = height
    )
}

// =============================================================================
// Commands
// =============================================================================

/// Burn the title into the video, passing audio through.
pub fn text_overlay_command(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    layout: &TitleLayout,
    style: &OverlayStyle,
) -> FfmpegCommand {
    FfmpegCommand::new(input, output)
        .video_filter(drawtext_filter(layout, style))
        .encoding(&EncodingProfile::video_only())
}

/// Final high-quality upscale with fast-start.
pub fn upscale_command(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    target: UpscaleTarget,
) -> FfmpegCommand {
    FfmpegCommand::new(input, output)
        .video_filter(upscale_filter(target))
        .encoding(&EncodingProfile::upscale())
}
