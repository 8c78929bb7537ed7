//! Trim and concatenate source clips.
//!
//! Clips are cut to drop the first and last two seconds, re-encoded to one
//! uniform profile and then joined with the concat demuxer. Re-encoding at
//! the trim step is what lets the concat step read mixed-source clips.

use std::path::Path;

use promo_models::EncodingProfile;

use crate::command::FfmpegCommand;
use crate::error::MediaResult;

/// Seconds removed from the start of every clip.
pub const TRIM_HEAD_SECS: f64 = 2.0;
/// Seconds removed from the end of every clip.
pub const TRIM_TAIL_SECS: f64 = 2.0;

/// What to do with one downloaded clip.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrimPlan {
    /// Re-encode `duration` seconds starting at `start`.
    Cut { start: f64, duration: f64 },
    /// Clip too short to trim; copy it unchanged.
    KeepOriginal,
}

impl TrimPlan {
    pub fn for_duration(duration: f64) -> Self {
        let kept = duration - TRIM_HEAD_SECS - TRIM_TAIL_SECS;
        if kept > 0.0 {
            Self::Cut {
                start: TRIM_HEAD_SECS,
                duration: kept,
            }
        } else {
            Self::KeepOriginal
        }
    }
}

/// Cut `[start, start + duration)` out of `input` with the clip profile.
pub fn trim_command(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    start: f64,
    duration: f64,
) -> FfmpegCommand {
    FfmpegCommand::new(input, output)
        .seek(start)
        .duration(duration)
        .encoding(&EncodingProfile::clip())
}

/// Concat demuxer list for `count` trimmed clips, in order.
///
/// Entries are relative to the list file's directory.
pub fn concat_manifest(count: usize) -> String {
    (0..count)
        .map(|i| format!("file 'trimmed_{}.mp4'\n", i))
        .collect()
}

/// Write the concat list next to the trimmed clips.
pub async fn write_concat_manifest(path: impl AsRef<Path>, count: usize) -> MediaResult<()> {
    tokio::fs::write(path, concat_manifest(count)).await?;
    Ok(())
}

/// Join the clips listed in `manifest` into one fast-start file.
pub fn concat_command(manifest: impl AsRef<Path>, output: impl AsRef<Path>) -> FfmpegCommand {
    FfmpegCommand::new(manifest, output)
        .input_args(["-f", "concat", "-safe", "0"])
        .encoding(&EncodingProfile::merged())
}
