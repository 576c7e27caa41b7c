use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::capability::{Capability, CapabilityError, StructuredInput, parse_input};
use crate::exec::{CommandSpec, run_capture};
use crate::planner::{PlannerClient, PlannerMessage, extract_json_object};

use super::workspace::{Workspace, exists};
use super::{GENERATE_METADATA, GENERATE_SUBTITLE, UPLOAD_VIDEO};

const MAX_TITLE_CHARS: usize = 80;
const TRANSCRIPT_EXCERPT_CHARS: usize = 4000;
const PLATFORM_ID_PREFIX: &str = "BV";
const PLATFORM_ID_LEN: usize = 12;

const GENERATE_METADATA_DESCRIPTION: &str = r#"Write a localized title, description and tags for the video from its subtitles. Requires generate_subtitle (translate_subtitle is used when present).
Input: a video id string, or JSON:
{
  "video_id": "video id (required)",
  "target_lang": "language of the generated text (optional, default: the configured target language)",
  "style": "professional | casual (optional, default: professional)"
}
Returns: JSON object {"title", "description", "tags", "category_id"}, also saved as /workspace/abc123/metadata.json"#;

const UPLOAD_VIDEO_DESCRIPTION: &str = r#"Publish the downloaded video to the target platform. Missing fields are taken from generate_metadata output.
Input: a video id string, or JSON:
{
  "video_id": "video id (required)",
  "title": "video title (optional)",
  "description": "video description (optional)",
  "tags": ["tag1", "tag2"] or "tag1,tag2" (optional),
  "category_id": platform category number (optional),
  "cover_path": "path to a cover image (optional, default: downloaded thumbnail)"
}
Returns: the platform id of the published video, e.g. BV1xx411c7mD"#;

/// Publishing metadata produced by the planner and consumed by the uploader.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoMetadata {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<u32>,
}

impl VideoMetadata {
    fn normalize(mut self) -> Self {
        self.title = truncate_chars(self.title.trim(), MAX_TITLE_CHARS);
        self.description = self.description.trim().to_string();
        self.tags = self
            .tags
            .into_iter()
            .map(|tag| tag.trim().to_string())
            .filter(|tag| !tag.is_empty())
            .collect();
        self
    }
}

fn truncate_chars(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetadataStyle {
    #[default]
    Professional,
    Casual,
}

impl MetadataStyle {
    fn instruction(self) -> &'static str {
        match self {
            MetadataStyle::Professional => "informative and professional",
            MetadataStyle::Casual => "lively and casual",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GenerateMetadataInput {
    pub video_id: String,
    #[serde(default)]
    pub target_lang: Option<String>,
    #[serde(default)]
    pub style: MetadataStyle,
}

impl StructuredInput for GenerateMetadataInput {
    fn from_content_id(content_id: &str) -> Self {
        Self {
            video_id: content_id.to_string(),
            target_lang: None,
            style: MetadataStyle::default(),
        }
    }

    fn content_id(&self) -> &str {
        &self.video_id
    }
}

pub struct GenerateMetadata {
    workspace: Workspace,
    planner: Arc<dyn PlannerClient>,
    default_target_lang: String,
}

impl GenerateMetadata {
    pub fn new(workspace: Workspace, planner: Arc<dyn PlannerClient>, target_lang: &str) -> Self {
        Self {
            workspace,
            planner,
            default_target_lang: target_lang.to_string(),
        }
    }

    /// Prefers the translated subtitle, falling back to the original transcript.
    async fn transcript(&self, video_id: &str, lang: &str) -> Result<String, CapabilityError> {
        let translated = self.workspace.translated_subtitle_path(video_id, lang);
        let original = self.workspace.subtitle_path(video_id);

        let path = if exists(&translated).await {
            translated
        } else if exists(&original).await {
            original
        } else {
            return Err(CapabilityError::MissingArtifact(format!(
                "no subtitle for {video_id}; run {GENERATE_SUBTITLE} first"
            )));
        };

        let text = super::parse_srt(&tokio::fs::read_to_string(&path).await?)
            .into_iter()
            .map(|cue| cue.text)
            .collect::<Vec<_>>()
            .join(" ");
        Ok(truncate_chars(&text, TRANSCRIPT_EXCERPT_CHARS))
    }
}

#[async_trait]
impl Capability for GenerateMetadata {
    fn name(&self) -> &str {
        GENERATE_METADATA
    }

    fn description(&self) -> &str {
        GENERATE_METADATA_DESCRIPTION
    }

    async fn call(
        &self,
        cancel: &CancellationToken,
        input: &str,
    ) -> Result<String, CapabilityError> {
        let input: GenerateMetadataInput = parse_input(input)?;
        let target_lang = input
            .target_lang
            .clone()
            .filter(|lang| !lang.trim().is_empty())
            .unwrap_or_else(|| self.default_target_lang.clone());
        let transcript = self.transcript(&input.video_id, &target_lang).await?;

        let system = format!(
            "You write publishing metadata for re-uploaded videos. Write in {target_lang} and keep the tone {}. \
Reply with one JSON object: {{\"title\": string of at most {MAX_TITLE_CHARS} characters, \
\"description\": string, \"tags\": array of up to 10 short strings, \"category_id\": integer or null}}.",
            input.style.instruction()
        );
        let reply = self
            .planner
            .chat(
                cancel,
                &[
                    PlannerMessage::system(system),
                    PlannerMessage::user(format!("Video transcript:\n{transcript}")),
                ],
            )
            .await?;

        let fragment = extract_json_object(&reply).ok_or_else(|| {
            CapabilityError::ExecutionFailed(
                "metadata reply did not contain a JSON object".to_string(),
            )
        })?;
        let metadata: VideoMetadata = serde_json::from_str::<VideoMetadata>(&fragment)
            .map_err(|err| {
                CapabilityError::ExecutionFailed(format!("failed to parse metadata reply: {err}"))
            })?
            .normalize();
        if metadata.title.is_empty() {
            return Err(CapabilityError::ExecutionFailed(
                "metadata reply has an empty title".to_string(),
            ));
        }

        let pretty = serde_json::to_string_pretty(&metadata)
            .map_err(|err| CapabilityError::ExecutionFailed(err.to_string()))?;
        self.workspace.ensure_content_dir(&input.video_id).await?;
        tokio::fs::write(self.workspace.metadata_path(&input.video_id), pretty).await?;

        info!(video_id = %input.video_id, title = %metadata.title, "Metadata generated");
        serde_json::to_string(&metadata)
            .map_err(|err| CapabilityError::ExecutionFailed(err.to_string()))
    }
}

/// Tags given either as a JSON list or a comma-separated string.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum TagList {
    List(Vec<String>),
    Csv(String),
}

impl TagList {
    fn into_vec(self) -> Vec<String> {
        match self {
            TagList::List(tags) => tags,
            TagList::Csv(joined) => joined.split(',').map(str::to_string).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UploadVideoInput {
    pub video_id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Option<TagList>,
    #[serde(default)]
    pub category_id: Option<u32>,
    #[serde(default)]
    pub cover_path: Option<PathBuf>,
}

impl StructuredInput for UploadVideoInput {
    fn from_content_id(content_id: &str) -> Self {
        Self {
            video_id: content_id.to_string(),
            title: None,
            description: None,
            tags: None,
            category_id: None,
            cover_path: None,
        }
    }

    fn content_id(&self) -> &str {
        &self.video_id
    }
}

pub struct UploadVideo {
    workspace: Workspace,
    program: String,
}

impl UploadVideo {
    pub fn new(workspace: Workspace, program: &str) -> Self {
        Self {
            workspace,
            program: program.to_string(),
        }
    }

    /// Explicit input fields win over the saved metadata file.
    async fn resolve_metadata(
        &self,
        input: &UploadVideoInput,
    ) -> Result<VideoMetadata, CapabilityError> {
        let path = self.workspace.metadata_path(&input.video_id);
        let saved = if exists(&path).await {
            let raw = tokio::fs::read_to_string(&path).await?;
            serde_json::from_str::<VideoMetadata>(&raw).map_err(|err| {
                CapabilityError::InvalidInput(format!(
                    "{} is not valid metadata: {err}",
                    path.display()
                ))
            })?
        } else {
            VideoMetadata::default()
        };

        let metadata = VideoMetadata {
            title: input.title.clone().unwrap_or(saved.title),
            description: input.description.clone().unwrap_or(saved.description),
            tags: input
                .tags
                .clone()
                .map(TagList::into_vec)
                .unwrap_or(saved.tags),
            category_id: input.category_id.or(saved.category_id),
        }
        .normalize();

        if metadata.title.is_empty() {
            return Err(CapabilityError::MissingArtifact(format!(
                "no title for {}; pass one or run {GENERATE_METADATA} first",
                input.video_id
            )));
        }
        Ok(metadata)
    }

    fn command(
        &self,
        video: &std::path::Path,
        metadata: &VideoMetadata,
        cover: Option<&std::path::Path>,
    ) -> CommandSpec {
        let mut spec = CommandSpec::new(&self.program)
            .arg("upload")
            .arg("--title")
            .arg(&metadata.title)
            .arg("--desc")
            .arg(&metadata.description);
        if !metadata.tags.is_empty() {
            spec = spec.arg("--tag").arg(metadata.tags.join(","));
        }
        if let Some(category) = metadata.category_id {
            spec = spec.arg("--tid").arg(category.to_string());
        }
        if let Some(cover) = cover {
            spec = spec.arg("--cover").path_arg(cover);
        }
        spec.path_arg(video)
    }
}

#[async_trait]
impl Capability for UploadVideo {
    fn name(&self) -> &str {
        UPLOAD_VIDEO
    }

    fn description(&self) -> &str {
        UPLOAD_VIDEO_DESCRIPTION
    }

    async fn call(
        &self,
        cancel: &CancellationToken,
        input: &str,
    ) -> Result<String, CapabilityError> {
        let input: UploadVideoInput = parse_input(input)?;
        let video = self
            .workspace
            .find_video(&input.video_id)
            .await
            .ok_or_else(|| {
                CapabilityError::MissingArtifact(format!(
                    "no downloaded video for {}; run download_video first",
                    input.video_id
                ))
            })?;
        let metadata = self.resolve_metadata(&input).await?;

        let cover = match input.cover_path.clone() {
            Some(path) => Some(path),
            None => {
                let thumbnail = self.workspace.thumbnail_path(&input.video_id);
                exists(&thumbnail).await.then_some(thumbnail)
            }
        };

        let output = run_capture(cancel, &self.command(&video, &metadata, cover.as_deref())).await?;
        let platform_id = extract_platform_id(&output.stdout)
            .or_else(|| extract_platform_id(&output.stderr))
            .or_else(|| {
                output
                    .stdout
                    .lines()
                    .rev()
                    .map(str::trim)
                    .find(|line| !line.is_empty())
                    .map(str::to_string)
            })
            .ok_or_else(|| {
                CapabilityError::ExecutionFailed(
                    "uploader finished without reporting a video id".to_string(),
                )
            })?;

        if !platform_id.starts_with(PLATFORM_ID_PREFIX) {
            warn!(reported = %platform_id, "Uploader output did not contain a BV id");
        }
        info!(video_id = %input.video_id, platform_id = %platform_id, "Video published");
        Ok(platform_id)
    }
}

/// Finds the first `BV` id (BV followed by ten alphanumerics) in uploader output.
fn extract_platform_id(output: &str) -> Option<String> {
    let bytes = output.as_bytes();
    let mut search_from = 0;
    while let Some(offset) = output[search_from..].find(PLATFORM_ID_PREFIX) {
        let start = search_from + offset;
        let end = start + PLATFORM_ID_LEN;
        let preceded_by_word = start > 0 && bytes[start - 1].is_ascii_alphanumeric();
        if end <= bytes.len()
            && !preceded_by_word
            && bytes[start + PLATFORM_ID_PREFIX.len()..end]
                .iter()
                .all(u8::is_ascii_alphanumeric)
            && bytes.get(end).is_none_or(|next| !next.is_ascii_alphanumeric())
        {
            return Some(output[start..end].to_string());
        }
        search_from = start + PLATFORM_ID_PREFIX.len();
    }
    None
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use tempfile::TempDir;

    use super::*;
    use crate::planner::PlannerError;

    struct ScriptedPlanner {
        reply: String,
        prompts: Mutex<Vec<Vec<PlannerMessage>>>,
    }

    impl ScriptedPlanner {
        fn new(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: reply.to_string(),
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl PlannerClient for ScriptedPlanner {
        async fn chat(
            &self,
            _cancel: &CancellationToken,
            messages: &[PlannerMessage],
        ) -> Result<String, PlannerError> {
            self.prompts.lock().unwrap().push(messages.to_vec());
            Ok(self.reply.clone())
        }
    }

    async fn workspace_with_subtitle(dir: &TempDir) -> Workspace {
        let workspace = Workspace::new(dir.path());
        workspace.ensure_content_dir("abc123").await.unwrap();
        std::fs::write(
            workspace.subtitle_path("abc123"),
            "1\n00:00:01,000 --> 00:00:02,000\nHow to build a bridge\n",
        )
        .unwrap();
        workspace
    }

    #[tokio::test]
    async fn generate_metadata_saves_normalized_json() {
        let dir = TempDir::new().unwrap();
        let workspace = workspace_with_subtitle(&dir).await;
        let long_title = "x".repeat(120);
        let reply = format!(
            "Here you go:\n```json\n{{\"title\": \"{long_title}\", \"description\": \"Bridges\", \"tags\": [\" build \", \"\"], \"category_id\": 36}}\n```"
        );
        let planner = ScriptedPlanner::new(&reply);
        let tool = GenerateMetadata::new(workspace.clone(), planner.clone(), "zh-CN");

        let output = tool.call(&CancellationToken::new(), "abc123").await.unwrap();
        let returned: VideoMetadata = serde_json::from_str(&output).unwrap();
        assert_eq!(returned.title.chars().count(), MAX_TITLE_CHARS);
        assert_eq!(returned.tags, vec!["build".to_string()]);
        assert_eq!(returned.category_id, Some(36));

        let saved: VideoMetadata = serde_json::from_str(
            &std::fs::read_to_string(workspace.metadata_path("abc123")).unwrap(),
        )
        .unwrap();
        assert_eq!(saved, returned);

        let prompts = planner.prompts.lock().unwrap();
        assert!(prompts[0][1].content.contains("How to build a bridge"));
    }

    #[tokio::test]
    async fn generate_metadata_prefers_translated_subtitle() {
        let dir = TempDir::new().unwrap();
        let workspace = workspace_with_subtitle(&dir).await;
        std::fs::write(
            workspace.translated_subtitle_path("abc123", "zh-CN"),
            "1\n00:00:01,000 --> 00:00:02,000\n如何建造一座桥\n",
        )
        .unwrap();
        let planner = ScriptedPlanner::new(r#"{"title": "桥", "description": "", "tags": []}"#);
        let tool = GenerateMetadata::new(workspace, planner.clone(), "zh-CN");

        tool.call(&CancellationToken::new(), "abc123").await.unwrap();
        let prompts = planner.prompts.lock().unwrap();
        assert!(prompts[0][1].content.contains("如何建造一座桥"));
    }

    #[tokio::test]
    async fn generate_metadata_rejects_reply_without_json() {
        let dir = TempDir::new().unwrap();
        let workspace = workspace_with_subtitle(&dir).await;
        let tool = GenerateMetadata::new(workspace, ScriptedPlanner::new("no idea"), "zh-CN");

        let err = tool
            .call(&CancellationToken::new(), "abc123")
            .await
            .unwrap_err();
        assert!(matches!(err, CapabilityError::ExecutionFailed(_)));
    }

    #[tokio::test]
    async fn upload_merges_input_over_saved_metadata() {
        let dir = TempDir::new().unwrap();
        let workspace = Workspace::new(dir.path());
        workspace.ensure_content_dir("abc123").await.unwrap();
        std::fs::write(
            workspace.metadata_path("abc123"),
            r#"{"title": "Saved", "description": "Saved desc", "tags": ["a"], "category_id": 17}"#,
        )
        .unwrap();
        let tool = UploadVideo::new(workspace, "biliup");

        let input: UploadVideoInput =
            parse_input(r#"{"video_id": "abc123", "title": "Override", "tags": "x, y"}"#).unwrap();
        let metadata = tool.resolve_metadata(&input).await.unwrap();
        assert_eq!(metadata.title, "Override");
        assert_eq!(metadata.description, "Saved desc");
        assert_eq!(metadata.tags, vec!["x".to_string(), "y".to_string()]);
        assert_eq!(metadata.category_id, Some(17));
    }

    #[test]
    fn upload_command_includes_optional_flags() {
        let tool = UploadVideo::new(Workspace::new("/data"), "biliup");
        let metadata = VideoMetadata {
            title: "A bridge".to_string(),
            description: "desc".to_string(),
            tags: vec!["a".to_string(), "b".to_string()],
            category_id: Some(36),
        };
        let spec = tool.command(
            std::path::Path::new("/data/abc123/video.mp4"),
            &metadata,
            Some(std::path::Path::new("/data/abc123/thumbnail.jpg")),
        );
        assert_eq!(
            spec.to_string(),
            "biliup upload --title 'A bridge' --desc desc --tag a,b --tid 36 --cover /data/abc123/thumbnail.jpg /data/abc123/video.mp4"
        );
    }

    #[tokio::test]
    async fn upload_reports_platform_id_from_uploader_output() {
        let dir = TempDir::new().unwrap();
        let workspace = Workspace::new(dir.path());
        workspace.ensure_content_dir("abc123").await.unwrap();
        std::fs::write(workspace.video_path("abc123", "mp4"), b"").unwrap();
        // `echo` prints its arguments, so the upload command line becomes the output.
        let tool = UploadVideo::new(workspace, "echo");

        let id = tool
            .call(
                &CancellationToken::new(),
                r#"{"video_id": "abc123", "title": "BV1xx411c7mD"}"#,
            )
            .await
            .unwrap();
        assert_eq!(id, "BV1xx411c7mD");
    }

    #[tokio::test]
    async fn upload_requires_downloaded_video() {
        let dir = TempDir::new().unwrap();
        let tool = UploadVideo::new(Workspace::new(dir.path()), "biliup");
        let err = tool
            .call(&CancellationToken::new(), "abc123")
            .await
            .unwrap_err();
        assert!(matches!(err, CapabilityError::MissingArtifact(_)));
    }

    #[test]
    fn extract_platform_id_requires_word_boundaries() {
        assert_eq!(
            extract_platform_id("upload ok: BV1xx411c7mD\n"),
            Some("BV1xx411c7mD".to_string())
        );
        assert_eq!(extract_platform_id("ABV1xx411c7mD"), None);
        assert_eq!(extract_platform_id("BV123"), None);
    }
}
