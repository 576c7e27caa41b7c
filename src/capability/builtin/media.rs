use async_trait::async_trait;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::capability::{Capability, CapabilityError, StructuredInput, parse_input};
use crate::exec::{CommandSpec, run_capture};

use super::workspace::{Workspace, exists};
use super::{DOWNLOAD_THUMBNAIL, DOWNLOAD_VIDEO, EXTRACT_AUDIO, SOURCE_URL_PREFIX};

const DOWNLOAD_VIDEO_DESCRIPTION: &str = r#"Download the source video to local storage with yt-dlp.
Input: a video id string, or JSON:
{
  "video_id": "source video id (required)",
  "quality": "best | 1080p | 720p | 480p (optional, default: best)",
  "format": "mp4 | webm (optional, default: mp4)"
}
Returns: local path of the downloaded video, e.g. /workspace/abc123/video.mp4
Example inputs: "dQw4w9WgXcQ" or {"video_id": "dQw4w9WgXcQ", "quality": "1080p"}"#;

const DOWNLOAD_THUMBNAIL_DESCRIPTION: &str = r#"Download the source video's thumbnail (cover image) as JPEG.
Input: a video id string, or JSON:
{
  "video_id": "source video id (required)"
}
Returns: local path of the thumbnail, e.g. /workspace/abc123/thumbnail.jpg"#;

const EXTRACT_AUDIO_DESCRIPTION: &str = r#"Extract the audio track from the downloaded video with ffmpeg. Requires download_video first.
Input: a video id string, or JSON:
{
  "video_id": "video id (required)",
  "format": "wav | mp3 (optional, default: wav)",
  "sample_rate": sample rate in Hz (optional, default: 16000),
  "channels": 1 or 2 (optional, default: 1)
}
Returns: local path of the audio file, e.g. /workspace/abc123/audio.wav"#;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum VideoQuality {
    #[default]
    #[serde(rename = "best")]
    Best,
    #[serde(rename = "1080p")]
    P1080,
    #[serde(rename = "720p")]
    P720,
    #[serde(rename = "480p")]
    P480,
}

impl VideoQuality {
    fn format_selector(self) -> String {
        let height = match self {
            VideoQuality::Best => return "bestvideo+bestaudio/best".to_string(),
            VideoQuality::P1080 => 1080,
            VideoQuality::P720 => 720,
            VideoQuality::P480 => 480,
        };
        format!("bestvideo[height<={height}]+bestaudio/best[height<={height}]")
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoFormat {
    #[default]
    Mp4,
    Webm,
}

impl VideoFormat {
    fn extension(self) -> &'static str {
        match self {
            VideoFormat::Mp4 => "mp4",
            VideoFormat::Webm => "webm",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DownloadVideoInput {
    pub video_id: String,
    #[serde(default)]
    pub quality: VideoQuality,
    #[serde(default)]
    pub format: VideoFormat,
}

impl StructuredInput for DownloadVideoInput {
    fn from_content_id(content_id: &str) -> Self {
        Self {
            video_id: content_id.to_string(),
            quality: VideoQuality::default(),
            format: VideoFormat::default(),
        }
    }

    fn content_id(&self) -> &str {
        &self.video_id
    }
}

pub struct DownloadVideo {
    workspace: Workspace,
    program: String,
}

impl DownloadVideo {
    pub fn new(workspace: Workspace, program: &str) -> Self {
        Self {
            workspace,
            program: program.to_string(),
        }
    }

    fn command(&self, input: &DownloadVideoInput) -> CommandSpec {
        let template = self
            .workspace
            .content_dir(&input.video_id)
            .join("video.%(ext)s");
        CommandSpec::new(&self.program)
            .arg("-f")
            .arg(input.quality.format_selector())
            .arg("--merge-output-format")
            .arg(input.format.extension())
            .arg("--no-playlist")
            .arg("-o")
            .path_arg(&template)
            .arg(format!("{SOURCE_URL_PREFIX}{}", input.video_id))
    }
}

#[async_trait]
impl Capability for DownloadVideo {
    fn name(&self) -> &str {
        DOWNLOAD_VIDEO
    }

    fn description(&self) -> &str {
        DOWNLOAD_VIDEO_DESCRIPTION
    }

    async fn call(
        &self,
        cancel: &CancellationToken,
        input: &str,
    ) -> Result<String, CapabilityError> {
        let input: DownloadVideoInput = parse_input(input)?;
        self.workspace.ensure_content_dir(&input.video_id).await?;

        run_capture(cancel, &self.command(&input)).await?;

        let path = self
            .workspace
            .video_path(&input.video_id, input.format.extension());
        if !exists(&path).await {
            return Err(CapabilityError::ExecutionFailed(format!(
                "download finished but {} was not created",
                path.display()
            )));
        }

        info!(video_id = %input.video_id, path = %path.display(), "Video downloaded");
        Ok(path.display().to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DownloadThumbnailInput {
    pub video_id: String,
}

impl StructuredInput for DownloadThumbnailInput {
    fn from_content_id(content_id: &str) -> Self {
        Self {
            video_id: content_id.to_string(),
        }
    }

    fn content_id(&self) -> &str {
        &self.video_id
    }
}

pub struct DownloadThumbnail {
    workspace: Workspace,
    program: String,
}

impl DownloadThumbnail {
    pub fn new(workspace: Workspace, program: &str) -> Self {
        Self {
            workspace,
            program: program.to_string(),
        }
    }

    fn command(&self, input: &DownloadThumbnailInput) -> CommandSpec {
        let template = self
            .workspace
            .content_dir(&input.video_id)
            .join("thumbnail.%(ext)s");
        CommandSpec::new(&self.program)
            .args([
                "--skip-download",
                "--write-thumbnail",
                "--convert-thumbnails",
                "jpg",
                "--no-playlist",
                "-o",
            ])
            .path_arg(&template)
            .arg(format!("{SOURCE_URL_PREFIX}{}", input.video_id))
    }
}

#[async_trait]
impl Capability for DownloadThumbnail {
    fn name(&self) -> &str {
        DOWNLOAD_THUMBNAIL
    }

    fn description(&self) -> &str {
        DOWNLOAD_THUMBNAIL_DESCRIPTION
    }

    async fn call(
        &self,
        cancel: &CancellationToken,
        input: &str,
    ) -> Result<String, CapabilityError> {
        let input: DownloadThumbnailInput = parse_input(input)?;
        self.workspace.ensure_content_dir(&input.video_id).await?;

        run_capture(cancel, &self.command(&input)).await?;

        let path = self.workspace.thumbnail_path(&input.video_id);
        if !exists(&path).await {
            return Err(CapabilityError::ExecutionFailed(format!(
                "thumbnail download finished but {} was not created",
                path.display()
            )));
        }
        Ok(path.display().to_string())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    #[default]
    Wav,
    Mp3,
}

impl AudioFormat {
    fn extension(self) -> &'static str {
        match self {
            AudioFormat::Wav => "wav",
            AudioFormat::Mp3 => "mp3",
        }
    }

    fn codec_args(self) -> [&'static str; 2] {
        match self {
            AudioFormat::Wav => ["-acodec", "pcm_s16le"],
            AudioFormat::Mp3 => ["-b:a", "192k"],
        }
    }
}

fn default_sample_rate() -> u32 {
    16_000
}

fn default_channels() -> u8 {
    1
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExtractAudioInput {
    pub video_id: String,
    #[serde(default)]
    pub format: AudioFormat,
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    #[serde(default = "default_channels")]
    pub channels: u8,
}

impl StructuredInput for ExtractAudioInput {
    fn from_content_id(content_id: &str) -> Self {
        Self {
            video_id: content_id.to_string(),
            format: AudioFormat::default(),
            sample_rate: default_sample_rate(),
            channels: default_channels(),
        }
    }

    fn content_id(&self) -> &str {
        &self.video_id
    }
}

pub struct ExtractAudio {
    workspace: Workspace,
    program: String,
}

impl ExtractAudio {
    pub fn new(workspace: Workspace, program: &str) -> Self {
        Self {
            workspace,
            program: program.to_string(),
        }
    }

    fn command(&self, input: &ExtractAudioInput, video: &std::path::Path) -> CommandSpec {
        let output = self
            .workspace
            .audio_path(&input.video_id, input.format.extension());
        CommandSpec::new(&self.program)
            .args(["-y", "-loglevel", "error", "-i"])
            .path_arg(video)
            .arg("-vn")
            .arg("-ac")
            .arg(input.channels.to_string())
            .arg("-ar")
            .arg(input.sample_rate.to_string())
            .args(input.format.codec_args())
            .path_arg(&output)
    }
}

#[async_trait]
impl Capability for ExtractAudio {
    fn name(&self) -> &str {
        EXTRACT_AUDIO
    }

    fn description(&self) -> &str {
        EXTRACT_AUDIO_DESCRIPTION
    }

    async fn call(
        &self,
        cancel: &CancellationToken,
        input: &str,
    ) -> Result<String, CapabilityError> {
        let input: ExtractAudioInput = parse_input(input)?;
        if !matches!(input.channels, 1 | 2) {
            return Err(CapabilityError::InvalidInput(format!(
                "channels must be 1 or 2, got {}",
                input.channels
            )));
        }

        let video = self
            .workspace
            .find_video(&input.video_id)
            .await
            .ok_or_else(|| {
                CapabilityError::MissingArtifact(format!(
                    "no downloaded video for {}; run {DOWNLOAD_VIDEO} first",
                    input.video_id
                ))
            })?;

        run_capture(cancel, &self.command(&input, &video)).await?;

        let path = self
            .workspace
            .audio_path(&input.video_id, input.format.extension());
        Ok(path.display().to_string())
    }
}
