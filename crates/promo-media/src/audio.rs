//! Voice-over normalization and muxing.

use std::path::Path;

use promo_models::{AudioNormalization, EncodingProfile};

use crate::command::FfmpegCommand;

/// Re-encode a synthesized voice-over to the clip sample layout.
pub fn normalize_audio_command(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    normalization: &AudioNormalization,
) -> FfmpegCommand {
    FfmpegCommand::new(input, output).output_args(normalization.to_ffmpeg_args())
}

/// Replace the video's audio with `audio`, ending with the shorter stream.
pub fn mux_audio_command(
    video: impl AsRef<Path>,
    audio: impl AsRef<Path>,
    output: impl AsRef<Path>,
) -> FfmpegCommand {
    FfmpegCommand::new(video, output)
        .add_input(audio)
        .map("0:v")
        .map("1:a")
        .encoding(&EncodingProfile::video_only())
        .shortest()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_command() {
        let args = normalize_audio_command(
            "voiceover.wav",
            "voiceover_normalized.aac",
            &AudioNormalization::default(),
        )
        .build_args();
        assert_eq!(
            args[3..].join(" "),
            "-i voiceover.wav -ar 48000 -ac 2 -c:a aac -b:a 192k voiceover_normalized.aac"
        );
    }

    #[test]
    fn test_mux_command() {
        let args = mux_audio_command("merged_temp.mp4", "voice.aac", "out.mp4").build_args();
        assert_eq!(
            args[3..].join(" "),
            "-i merged_temp.mp4 -i voice.aac -map 0:v -map 1:a -c:v libx264 -preset medium -crf 23 -c:a copy -shortest out.mp4"
        );
    }
}
