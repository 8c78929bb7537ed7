#![deny(unreachable_patterns)]
//! FFmpeg CLI wrapper for product promo assembly.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building and a subprocess runner
//! - FFprobe inspection behind the [`Prober`] capability
//! - Command builders for trim, concat, audio mux, title overlay and upscale
//! - The title layout heuristic used by the overlay stage
//! - A retrying clip downloader with post-download validation

pub mod audio;
pub mod clip;
pub mod command;
pub mod download;
pub mod error;
pub mod filters;
pub mod probe;
pub mod retry;
pub mod text_layout;

pub use audio::{mux_audio_command, normalize_audio_command};
pub use clip::{concat_command, concat_manifest, trim_command, write_concat_manifest, TrimPlan};
pub use command::{
    check_ffmpeg, check_ffprobe, tail_lines, FfmpegCommand, FfmpegRunner, Transcoder,
};
pub use download::{DownloadConfig, Fetcher, HttpFetcher, RetryingDownloader};
pub use error::{MediaError, MediaResult};
pub use filters::{
    drawtext_filter, text_overlay_command, upscale_command, upscale_filter, OverlayStyle,
};
pub use probe::{probe_video, FfprobeProber, Prober, VideoInfo};
pub use retry::{retry_async, RetryConfig, RetryResult};
pub use text_layout::{
    escape_drawtext, layout_title, wrap_text, LayoutStrategy, TitleLayout, WidthClass, LINE_BREAK,
};
