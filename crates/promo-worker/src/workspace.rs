//! On-disk layout of one product's intermediate files.

use std::path::{Component, Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::error::{WorkerError, WorkerResult};

/// Directory tree rebuilt from scratch for every product.
///
/// ```text
/// <root>/video-data.json
/// <root>/videos/   video_{i}.mp4, trimmed_{i}.mp4, concat_list.txt
/// <root>/output/   merged_temp.mp4 ... final_merged_video_1080p.mp4
/// <root>/scripts/  generated_script.txt, short_title.txt
/// ```
#[derive(Debug, Clone)]
pub struct PipelineWorkspace {
    root: PathBuf,
}

impl PipelineWorkspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn videos_dir(&self) -> PathBuf {
        self.root.join("videos")
    }

    pub fn output_dir(&self) -> PathBuf {
        self.root.join("output")
    }

    pub fn scripts_dir(&self) -> PathBuf {
        self.root.join("scripts")
    }

    pub fn document_path(&self) -> PathBuf {
        self.root.join("video-data.json")
    }

    pub fn source_clip(&self, index: usize) -> PathBuf {
        self.videos_dir().join(format!("video_{}.mp4", index))
    }

    pub fn trimmed_clip(&self, index: usize) -> PathBuf {
        self.videos_dir().join(format!("trimmed_{}.mp4", index))
    }

    pub fn concat_manifest(&self) -> PathBuf {
        self.videos_dir().join("concat_list.txt")
    }

    pub fn merged(&self) -> PathBuf {
        self.output_dir().join("merged_temp.mp4")
    }

    pub fn voiceover(&self) -> PathBuf {
        self.output_dir().join("voiceover.wav")
    }

    pub fn normalized_voiceover(&self) -> PathBuf {
        self.output_dir().join("voiceover_normalized.aac")
    }

    pub fn with_audio(&self) -> PathBuf {
        self.output_dir().join("merged_with_audio.mp4")
    }

    pub fn titled(&self) -> PathBuf {
        self.output_dir().join("final_merged_video.mp4")
    }

    pub fn final_video(&self) -> PathBuf {
        self.output_dir().join("final_merged_video_1080p.mp4")
    }

    pub fn script(&self) -> PathBuf {
        self.scripts_dir().join("generated_script.txt")
    }

    pub fn short_title(&self) -> PathBuf {
        self.scripts_dir().join("short_title.txt")
    }

    /// Wipe the tree and recreate the empty directories.
    ///
    /// Refuses to touch an empty path or a filesystem root.
    pub async fn reset(&self) -> WorkerResult<()> {
        if self.root.as_os_str().is_empty() || is_root(&self.root) {
            return Err(WorkerError::workspace(format!(
                "refusing to reset workspace at '{}'",
                self.root.display()
            )));
        }

        match tokio::fs::remove_dir_all(&self.root).await {
            Ok(()) => debug!("Removed workspace {}", self.root.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(WorkerError::workspace(format!(
                    "failed to clear {}: {}",
                    self.root.display(),
                    e
                )))
            }
        }

        for dir in [self.videos_dir(), self.output_dir(), self.scripts_dir()] {
            tokio::fs::create_dir_all(&dir).await.map_err(|e| {
                WorkerError::workspace(format!("failed to create {}: {}", dir.display(), e))
            })?;
        }
        Ok(())
    }

    /// Write the raw `video_data` document for the script generator.
    pub async fn persist_document(&self, document: &Value) -> WorkerResult<PathBuf> {
        let path = self.document_path();
        let json = serde_json::to_vec_pretty(document)
            .map_err(|e| WorkerError::workspace(format!("failed to encode video_data: {}", e)))?;
        tokio::fs::write(&path, json).await?;
        Ok(path)
    }
}

fn is_root(path: &Path) -> bool {
    let mut components = path.components().filter(|c| !matches!(c, Component::CurDir));
    match components.next() {
        None => true,
        Some(Component::RootDir) | Some(Component::Prefix(_)) => {
            components.all(|c| matches!(c, Component::RootDir))
        }
        Some(_) => false,
    }
}
