//! Video encoding configuration.

use serde::{Deserialize, Serialize};

/// Default video codec (H.264)
pub const DEFAULT_VIDEO_CODEC: &str = "libx264";
/// Default audio codec
pub const DEFAULT_AUDIO_CODEC: &str = "aac";
/// Default encoding preset
pub const DEFAULT_PRESET: &str = "medium";
/// Default CRF for intermediate stages
pub const DEFAULT_CRF: u8 = 23;
/// Default audio bitrate for source clips
pub const DEFAULT_AUDIO_BITRATE: &str = "128k";
/// Sample rate shared by clips and voice-over
pub const DEFAULT_SAMPLE_RATE: u32 = 48_000;
/// Output frame rate for trimmed and merged clips
pub const DEFAULT_FRAME_RATE: u32 = 30;

/// Final vertical output resolution.
pub const UPSCALE_WIDTH: u32 = 1080;
pub const UPSCALE_HEIGHT: u32 = 1920;

/// Encoding parameters for one transcode stage.
///
/// `None` audio codec fields mean the stream is passed through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodingProfile {
    /// Video codec (e.g., "libx264")
    pub codec: String,

    /// Encoding preset (e.g., "medium", "slow")
    pub preset: String,

    /// Constant Rate Factor (quality, 0-51, lower is better)
    pub crf: u8,

    /// Audio codec, or "copy"
    pub audio_codec: String,

    /// Audio bitrate (ignored when audio is copied)
    pub audio_bitrate: Option<String>,

    /// Audio sample rate (ignored when audio is copied)
    pub sample_rate: Option<u32>,

    /// Forced output frame rate
    pub frame_rate: Option<u32>,

    /// Move the moov atom to the front of the file
    pub faststart: bool,
}

impl Default for EncodingProfile {
    fn default() -> Self {
        Self::clip()
    }
}

impl EncodingProfile {
    /// Uniform profile for trimmed clips and the concatenated file.
    pub fn clip() -> Self {
        Self {
            codec: DEFAULT_VIDEO_CODEC.to_string(),
            preset: DEFAULT_PRESET.to_string(),
            crf: DEFAULT_CRF,
            audio_codec: DEFAULT_AUDIO_CODEC.to_string(),
            audio_bitrate: Some(DEFAULT_AUDIO_BITRATE.to_string()),
            sample_rate: Some(DEFAULT_SAMPLE_RATE),
            frame_rate: Some(DEFAULT_FRAME_RATE),
            faststart: false,
        }
    }

    /// Same as [`EncodingProfile::clip`] with fast-start enabled.
    pub fn merged() -> Self {
        Self {
            faststart: true,
            ..Self::clip()
        }
    }

    /// Re-encode video, pass audio through (mux and overlay stages).
    pub fn video_only() -> Self {
        Self {
            codec: DEFAULT_VIDEO_CODEC.to_string(),
            preset: DEFAULT_PRESET.to_string(),
            crf: DEFAULT_CRF,
            audio_codec: "copy".to_string(),
            audio_bitrate: None,
            sample_rate: None,
            frame_rate: None,
            faststart: false,
        }
    }

    /// Slower, higher quality encode for the final upscale.
    pub fn upscale() -> Self {
        Self {
            preset: "slow".to_string(),
            crf: 18,
            faststart: true,
            ..Self::video_only()
        }
    }

    /// Whether the audio stream is passed through untouched.
    pub fn copies_audio(&self) -> bool {
        self.audio_codec == "copy"
    }

    /// Convert to FFmpeg output arguments.
    pub fn to_ffmpeg_args(&self) -> Vec<String> {
        let mut args = vec![
            "-c:v".to_string(),
            self.codec.clone(),
            "-preset".to_string(),
            self.preset.clone(),
            "-crf".to_string(),
            self.crf.to_string(),
            "-c:a".to_string(),
            self.audio_codec.clone(),
        ];

        if !self.copies_audio() {
            if let Some(bitrate) = &self.audio_bitrate {
                args.extend(["-b:a".to_string(), bitrate.clone()]);
            }
            if let Some(rate) = self.sample_rate {
                args.extend(["-ar".to_string(), rate.to_string()]);
            }
        }

        if let Some(fps) = self.frame_rate {
            args.extend(["-r".to_string(), fps.to_string()]);
        }

        if self.faststart {
            args.extend(["-movflags".to_string(), "+faststart".to_string()]);
        }

        args
    }
}

/// Voice-over normalization applied before muxing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioNormalization {
    pub sample_rate: u32,
    pub channels: u8,
    pub codec: String,
    pub bitrate: String,
}

impl Default for AudioNormalization {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            channels: 2,
            codec: DEFAULT_AUDIO_CODEC.to_string(),
            bitrate: "192k".to_string(),
        }
    }
}

impl AudioNormalization {
    /// Convert to FFmpeg output arguments.
    pub fn to_ffmpeg_args(&self) -> Vec<String> {
        vec![
            "-ar".to_string(),
            self.sample_rate.to_string(),
            "-ac".to_string(),
            self.channels.to_string(),
            "-c:a".to_string(),
            self.codec.clone(),
            "-b:a".to_string(),
            self.bitrate.clone(),
        ]
    }
}

/// Resolution of the published video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpscaleTarget {
    pub width: u32,
    pub height: u32,
}

impl Default for UpscaleTarget {
    fn default() -> Self {
        Self {
            width: UPSCALE_WIDTH,
            height: UPSCALE_HEIGHT,
        }
    }
}

impl std::fmt::Display for UpscaleTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clip_profile_args() {
        let args = EncodingProfile::clip().to_ffmpeg_args();
        assert_eq!(
            args,
            vec![
                "-c:v", "libx264", "-preset", "medium", "-crf", "23", "-c:a", "aac", "-b:a",
                "128k", "-ar", "48000", "-r", "30"
            ]
        );
    }

    #[test]
    fn test_merged_profile_has_faststart() {
        let args = EncodingProfile::merged().to_ffmpeg_args();
        assert!(args.ends_with(&["-movflags".to_string(), "+faststart".to_string()]));
    }

    #[test]
    fn test_copy_audio_skips_audio_params() {
        let args = EncodingProfile::upscale().to_ffmpeg_args();
        assert!(args.contains(&"copy".to_string()));
        assert!(args.contains(&"slow".to_string()));
        assert!(args.contains(&"18".to_string()));
        assert!(!args.contains(&"-b:a".to_string()));
        assert!(!args.contains(&"-ar".to_string()));
    }

    #[test]
    fn test_audio_normalization_args() {
        let args = AudioNormalization::default().to_ffmpeg_args();
        assert_eq!(
            args,
            vec!["-ar", "48000", "-ac", "2", "-c:a", "aac", "-b:a", "192k"]
        );
    }
}
