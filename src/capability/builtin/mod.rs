//! Built-in capability units for the ingest-to-publish workflow.
//!
//! Media units drive external programs (`yt-dlp`, `ffmpeg`, `whisper`, the
//! platform uploader); translation and metadata units ask the planner model.
//! Every unit reads and writes artifacts under `<workspace>/<video_id>/`.

mod media;
mod publish;
mod subtitle;
mod workspace;

use std::sync::Arc;

use crate::config::ToolchainSettings;
use crate::planner::PlannerClient;

use super::registry::{CapabilityRegistry, DuplicateCapability};

pub use media::{
    DownloadThumbnail, DownloadThumbnailInput, DownloadVideo, DownloadVideoInput, ExtractAudio,
    ExtractAudioInput,
};
pub use publish::{
    GenerateMetadata, GenerateMetadataInput, UploadVideo, UploadVideoInput, VideoMetadata,
};
pub use subtitle::{
    Cue, GenerateSubtitle, GenerateSubtitleInput, TranslateSubtitle, TranslateSubtitleInput,
    parse_srt, render_srt,
};
pub use workspace::Workspace;

pub const DOWNLOAD_VIDEO: &str = "download_video";
pub const DOWNLOAD_THUMBNAIL: &str = "download_thumbnail";
pub const EXTRACT_AUDIO: &str = "extract_audio";
pub const GENERATE_SUBTITLE: &str = "generate_subtitle";
pub const TRANSLATE_SUBTITLE: &str = "translate_subtitle";
pub const GENERATE_METADATA: &str = "generate_metadata";
pub const UPLOAD_VIDEO: &str = "upload_video";

pub(crate) const SOURCE_URL_PREFIX: &str = "https://www.youtube.com/watch?v=";

/// Shared construction parameters for the built-in units.
#[derive(Clone)]
pub struct Toolbox {
    pub workspace: Workspace,
    pub toolchain: ToolchainSettings,
    pub planner: Arc<dyn PlannerClient>,
    pub target_lang: String,
}

/// Registry holding every built-in unit.
pub fn builtin_registry(toolbox: &Toolbox) -> Result<CapabilityRegistry, DuplicateCapability> {
    let workspace = toolbox.workspace.clone();
    let toolchain = &toolbox.toolchain;

    let mut registry = CapabilityRegistry::new();
    registry.register(Arc::new(DownloadVideo::new(
        workspace.clone(),
        &toolchain.yt_dlp,
    )))?;
    registry.register(Arc::new(DownloadThumbnail::new(
        workspace.clone(),
        &toolchain.yt_dlp,
    )))?;
    registry.register(Arc::new(ExtractAudio::new(
        workspace.clone(),
        &toolchain.ffmpeg,
    )))?;
    registry.register(Arc::new(GenerateSubtitle::new(
        workspace.clone(),
        &toolchain.whisper,
    )))?;
    registry.register(Arc::new(TranslateSubtitle::new(
        workspace.clone(),
        toolbox.planner.clone(),
        &toolbox.target_lang,
    )))?;
    registry.register(Arc::new(GenerateMetadata::new(
        workspace.clone(),
        toolbox.planner.clone(),
        &toolbox.target_lang,
    )))?;
    registry.register(Arc::new(UploadVideo::new(workspace, &toolchain.uploader)))?;
    Ok(registry)
}
