use std::io;
use std::path::{Path, PathBuf};

const VIDEO_EXTENSIONS: &[&str] = &["mp4", "webm"];
const AUDIO_EXTENSIONS: &[&str] = &["wav", "mp3"];

/// Artifact layout for one workspace root. Later units find the files earlier
/// units produced for the same video id through these paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn content_dir(&self, video_id: &str) -> PathBuf {
        self.root.join(video_id)
    }

    pub async fn ensure_content_dir(&self, video_id: &str) -> io::Result<PathBuf> {
        let dir = self.content_dir(video_id);
        tokio::fs::create_dir_all(&dir).await?;
        Ok(dir)
    }

    pub fn video_path(&self, video_id: &str, extension: &str) -> PathBuf {
        self.content_dir(video_id).join(format!("video.{extension}"))
    }

    pub async fn find_video(&self, video_id: &str) -> Option<PathBuf> {
        self.find_first(video_id, "video", VIDEO_EXTENSIONS).await
    }

    pub fn thumbnail_path(&self, video_id: &str) -> PathBuf {
        self.content_dir(video_id).join("thumbnail.jpg")
    }

    pub fn audio_path(&self, video_id: &str, extension: &str) -> PathBuf {
        self.content_dir(video_id).join(format!("audio.{extension}"))
    }

    pub async fn find_audio(&self, video_id: &str) -> Option<PathBuf> {
        self.find_first(video_id, "audio", AUDIO_EXTENSIONS).await
    }

    /// Whisper names its output after the audio file stem.
    pub fn subtitle_path(&self, video_id: &str) -> PathBuf {
        self.content_dir(video_id).join("audio.srt")
    }

    pub fn translated_subtitle_path(&self, video_id: &str, lang: &str) -> PathBuf {
        self.content_dir(video_id).join(format!("subtitle_{lang}.srt"))
    }

    pub fn metadata_path(&self, video_id: &str) -> PathBuf {
        self.content_dir(video_id).join("metadata.json")
    }

    async fn find_first(&self, video_id: &str, stem: &str, extensions: &[&str]) -> Option<PathBuf> {
        for extension in extensions {
            let candidate = self.content_dir(video_id).join(format!("{stem}.{extension}"));
            if exists(&candidate).await {
                return Some(candidate);
            }
        }
        None
    }
}

pub(crate) async fn exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[tokio::test]
    async fn find_video_prefers_mp4_then_webm() {
        let dir = TempDir::new().unwrap();
        let workspace = Workspace::new(dir.path());
        let content = workspace.ensure_content_dir("abc123").await.unwrap();

        assert_eq!(workspace.find_video("abc123").await, None);

        std::fs::write(content.join("video.webm"), b"").unwrap();
        assert_eq!(
            workspace.find_video("abc123").await,
            Some(workspace.video_path("abc123", "webm"))
        );

        std::fs::write(content.join("video.mp4"), b"").unwrap();
        assert_eq!(
            workspace.find_video("abc123").await,
            Some(workspace.video_path("abc123", "mp4"))
        );
    }

    #[test]
    fn artifact_paths_live_under_content_dir() {
        let workspace = Workspace::new("/data/reel");
        assert_eq!(
            workspace.translated_subtitle_path("abc123", "zh-CN"),
            PathBuf::from("/data/reel/abc123/subtitle_zh-CN.srt")
        );
        assert_eq!(
            workspace.subtitle_path("abc123"),
            PathBuf::from("/data/reel/abc123/audio.srt")
        );
    }
}
