use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::capability::{
    Capability, CapabilityError, StructuredInput, parse_input, validate_language_code,
};
use crate::exec::{CommandSpec, run_capture};
use crate::planner::{PlannerClient, PlannerMessage, extract_json_array};

use super::workspace::{Workspace, exists};
use super::{EXTRACT_AUDIO, GENERATE_SUBTITLE, TRANSLATE_SUBTITLE};

/// Cues sent to the model per translation request.
const TRANSLATION_BATCH: usize = 40;

const GENERATE_SUBTITLE_DESCRIPTION: &str = r#"Transcribe the extracted audio into a timed SRT subtitle file with Whisper. Requires extract_audio first.
Input: a video id string, or JSON:
{
  "video_id": "video id (required)",
  "language": "spoken language code such as en, zh, ja, or auto (optional, default: auto)",
  "model": "tiny | base | small | medium | large (optional, default: base)"
}
Returns: local path of the subtitle file, e.g. /workspace/abc123/audio.srt"#;

const TRANSLATE_SUBTITLE_DESCRIPTION: &str = r#"Translate the generated subtitle file into a target language, keeping cue numbers and timestamps. Requires generate_subtitle first.
Input: a video id string, or JSON:
{
  "video_id": "video id (required)",
  "target_lang": "target language code such as zh-CN, zh-TW, en, ja, ko (optional, default: the configured target language)",
  "source_lang": "source language code or auto (optional, default: auto)"
}
Returns: local path of the translated subtitle file, e.g. /workspace/abc123/subtitle_zh-CN.srt
Example input: {"video_id": "abc123", "target_lang": "zh-CN"}"#;

/// One SRT cue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cue {
    pub index: String,
    pub timing: String,
    pub text: String,
}

/// Parses SRT text, skipping blocks without a `-->` timing line.
pub fn parse_srt(contents: &str) -> Vec<Cue> {
    let normalized = contents.replace("\r\n", "\n");
    let mut cues = Vec::new();

    for block in normalized.split("\n\n") {
        let mut lines = block.lines().filter(|line| !line.trim().is_empty());
        let (Some(index), Some(timing)) = (lines.next(), lines.next()) else {
            continue;
        };
        if !timing.contains("-->") {
            continue;
        }

        cues.push(Cue {
            index: index.trim().trim_start_matches('\u{feff}').to_string(),
            timing: timing.trim().to_string(),
            text: lines.collect::<Vec<_>>().join("\n"),
        });
    }

    cues
}

pub fn render_srt(cues: &[Cue]) -> String {
    cues.iter()
        .map(|cue| format!("{}\n{}\n{}\n", cue.index, cue.timing, cue.text))
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WhisperModel {
    Tiny,
    #[default]
    Base,
    Small,
    Medium,
    Large,
}

impl WhisperModel {
    fn as_str(self) -> &'static str {
        match self {
            WhisperModel::Tiny => "tiny",
            WhisperModel::Base => "base",
            WhisperModel::Small => "small",
            WhisperModel::Medium => "medium",
            WhisperModel::Large => "large",
        }
    }
}

fn auto_language() -> String {
    "auto".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GenerateSubtitleInput {
    pub video_id: String,
    #[serde(default = "auto_language")]
    pub language: String,
    #[serde(default)]
    pub model: WhisperModel,
}

impl StructuredInput for GenerateSubtitleInput {
    fn from_content_id(content_id: &str) -> Self {
        Self {
            video_id: content_id.to_string(),
            language: auto_language(),
            model: WhisperModel::default(),
        }
    }

    fn content_id(&self) -> &str {
        &self.video_id
    }
}

pub struct GenerateSubtitle {
    workspace: Workspace,
    program: String,
}

impl GenerateSubtitle {
    pub fn new(workspace: Workspace, program: &str) -> Self {
        Self {
            workspace,
            program: program.to_string(),
        }
    }

    fn command(&self, input: &GenerateSubtitleInput, audio: &std::path::Path) -> CommandSpec {
        let mut spec = CommandSpec::new(&self.program)
            .path_arg(audio)
            .arg("--model")
            .arg(input.model.as_str())
            .arg("--output_format")
            .arg("srt")
            .arg("--output_dir")
            .path_arg(&self.workspace.content_dir(&input.video_id));
        if input.language != "auto" {
            spec = spec.arg("--language").arg(&input.language);
        }
        spec
    }
}

#[async_trait]
impl Capability for GenerateSubtitle {
    fn name(&self) -> &str {
        GENERATE_SUBTITLE
    }

    fn description(&self) -> &str {
        GENERATE_SUBTITLE_DESCRIPTION
    }

    async fn call(
        &self,
        cancel: &CancellationToken,
        input: &str,
    ) -> Result<String, CapabilityError> {
        let input: GenerateSubtitleInput = parse_input(input)?;
        let audio = self
            .workspace
            .find_audio(&input.video_id)
            .await
            .ok_or_else(|| {
                CapabilityError::MissingArtifact(format!(
                    "no extracted audio for {}; run {EXTRACT_AUDIO} first",
                    input.video_id
                ))
            })?;

        run_capture(cancel, &self.command(&input, &audio)).await?;

        let path = self.workspace.subtitle_path(&input.video_id);
        if !exists(&path).await {
            return Err(CapabilityError::ExecutionFailed(format!(
                "transcription finished but {} was not created",
                path.display()
            )));
        }
        Ok(path.display().to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TranslateSubtitleInput {
    pub video_id: String,
    #[serde(default)]
    pub target_lang: Option<String>,
    #[serde(default = "auto_language")]
    pub source_lang: String,
}

impl StructuredInput for TranslateSubtitleInput {
    fn from_content_id(content_id: &str) -> Self {
        Self {
            video_id: content_id.to_string(),
            target_lang: None,
            source_lang: auto_language(),
        }
    }

    fn content_id(&self) -> &str {
        &self.video_id
    }
}

pub struct TranslateSubtitle {
    workspace: Workspace,
    planner: Arc<dyn PlannerClient>,
    default_target_lang: String,
}

impl TranslateSubtitle {
    pub fn new(workspace: Workspace, planner: Arc<dyn PlannerClient>, target_lang: &str) -> Self {
        Self {
            workspace,
            planner,
            default_target_lang: target_lang.to_string(),
        }
    }

    async fn translate_batch(
        &self,
        cancel: &CancellationToken,
        texts: &[&str],
        source_lang: &str,
        target_lang: &str,
    ) -> Result<Vec<String>, CapabilityError> {
        let source = if source_lang == "auto" {
            "the detected source language".to_string()
        } else {
            source_lang.to_string()
        };
        let system = format!(
            "You translate video subtitles from {source} into {target_lang}. \
You receive a JSON array of subtitle lines. Reply with a JSON array of the same \
length containing the translation of each line in order. Keep line breaks inside \
a line. Reply with the JSON array only."
        );
        let payload = serde_json::to_string(texts)
            .map_err(|err| CapabilityError::ExecutionFailed(err.to_string()))?;

        let reply = self
            .planner
            .chat(
                cancel,
                &[PlannerMessage::system(system), PlannerMessage::user(payload)],
            )
            .await?;

        let fragment = extract_json_array(&reply).ok_or_else(|| {
            CapabilityError::ExecutionFailed(
                "translation reply did not contain a JSON array".to_string(),
            )
        })?;
        let translated: Vec<String> = serde_json::from_str(&fragment).map_err(|err| {
            CapabilityError::ExecutionFailed(format!("failed to parse translation reply: {err}"))
        })?;

        if translated.len() != texts.len() {
            return Err(CapabilityError::ExecutionFailed(format!(
                "translation returned {} lines for {} cues",
                translated.len(),
                texts.len()
            )));
        }
        Ok(translated)
    }
}

#[async_trait]
impl Capability for TranslateSubtitle {
    fn name(&self) -> &str {
        TRANSLATE_SUBTITLE
    }

    fn description(&self) -> &str {
        TRANSLATE_SUBTITLE_DESCRIPTION
    }

    async fn call(
        &self,
        cancel: &CancellationToken,
        input: &str,
    ) -> Result<String, CapabilityError> {
        let input: TranslateSubtitleInput = parse_input(input)?;
        let target_lang = input
            .target_lang
            .clone()
            .filter(|lang| !lang.trim().is_empty())
            .unwrap_or_else(|| self.default_target_lang.clone());
        validate_language_code(&target_lang)?;

        let source_path = self.workspace.subtitle_path(&input.video_id);
        if !exists(&source_path).await {
            return Err(CapabilityError::MissingArtifact(format!(
                "no subtitle for {}; run {GENERATE_SUBTITLE} first",
                input.video_id
            )));
        }

        let mut cues = parse_srt(&tokio::fs::read_to_string(&source_path).await?);
        if cues.is_empty() {
            return Err(CapabilityError::ExecutionFailed(format!(
                "{} contains no subtitle cues",
                source_path.display()
            )));
        }

        for (batch_index, batch) in cues.chunks_mut(TRANSLATION_BATCH).enumerate() {
            if cancel.is_cancelled() {
                return Err(CapabilityError::Cancelled);
            }
            debug!(batch = batch_index + 1, cues = batch.len(), "Translating subtitle batch");

            let texts: Vec<&str> = batch.iter().map(|cue| cue.text.as_str()).collect();
            let translated = self
                .translate_batch(cancel, &texts, &input.source_lang, &target_lang)
                .await?;
            for (cue, text) in batch.iter_mut().zip(translated) {
                cue.text = text;
            }
        }

        let output_path = self
            .workspace
            .translated_subtitle_path(&input.video_id, &target_lang);
        tokio::fs::write(&output_path, render_srt(&cues)).await?;

        info!(
            video_id = %input.video_id,
            target_lang = %target_lang,
            cues = cues.len(),
            "Subtitle translated"
        );
        Ok(output_path.display().to_string())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use tempfile::TempDir;

    use super::*;
    use crate::planner::PlannerError;

    const SAMPLE_SRT: &str = "1\r\n00:00:01,000 --> 00:00:02,000\r\nHello there\r\n\r\n2\r\n00:00:03,000 --> 00:00:04,500\r\nGeneral\r\nKenobi\r\n";

    /// Answers each translation request by upper-casing the lines it receives.
    struct UppercaseTranslator {
        requests: Mutex<Vec<Vec<PlannerMessage>>>,
    }

    #[async_trait]
    impl PlannerClient for UppercaseTranslator {
        async fn chat(
            &self,
            _cancel: &CancellationToken,
            messages: &[PlannerMessage],
        ) -> Result<String, PlannerError> {
            self.requests.lock().unwrap().push(messages.to_vec());
            let lines: Vec<String> = serde_json::from_str(&messages[1].content).unwrap();
            let upper: Vec<String> = lines.iter().map(|line| line.to_uppercase()).collect();
            Ok(serde_json::to_string(&upper).unwrap())
        }
    }

    #[test]
    fn parse_srt_handles_crlf_and_multiline_cues() {
        let cues = parse_srt(SAMPLE_SRT);
        assert_eq!(cues.len(), 2);
        assert_eq!(cues[0].timing, "00:00:01,000 --> 00:00:02,000");
        assert_eq!(cues[1].text, "General\nKenobi");
    }

    #[test]
    fn render_srt_separates_cues_with_blank_lines() {
        let rendered = render_srt(&parse_srt(SAMPLE_SRT));
        assert_eq!(
            rendered,
            "1\n00:00:01,000 --> 00:00:02,000\nHello there\n\n2\n00:00:03,000 --> 00:00:04,500\nGeneral\nKenobi\n"
        );
    }

    #[test]
    fn whisper_command_passes_language_only_when_set() {
        let tool = GenerateSubtitle::new(Workspace::new("/data"), "whisper");
        let audio = std::path::Path::new("/data/abc123/audio.wav");

        let auto = tool.command(&GenerateSubtitleInput::from_content_id("abc123"), audio);
        assert!(!auto.args.contains(&"--language".to_string()));

        let input: GenerateSubtitleInput =
            parse_input(r#"{"video_id": "abc123", "language": "en", "model": "small"}"#).unwrap();
        let explicit = tool.command(&input, audio);
        assert_eq!(
            explicit.to_string(),
            "whisper /data/abc123/audio.wav --model small --output_format srt --output_dir /data/abc123 --language en"
        );
    }

    #[tokio::test]
    async fn translate_writes_target_language_file() {
        let dir = TempDir::new().unwrap();
        let workspace = Workspace::new(dir.path());
        workspace.ensure_content_dir("abc123").await.unwrap();
        std::fs::write(workspace.subtitle_path("abc123"), SAMPLE_SRT).unwrap();

        let translator = Arc::new(UppercaseTranslator {
            requests: Mutex::new(Vec::new()),
        });
        let tool = TranslateSubtitle::new(workspace.clone(), translator.clone(), "zh-CN");

        let path = tool
            .call(
                &CancellationToken::new(),
                r#"{"video_id": "abc123", "target_lang": "ja"}"#,
            )
            .await
            .unwrap();

        let expected = workspace.translated_subtitle_path("abc123", "ja");
        assert_eq!(path, expected.display().to_string());
        let written = parse_srt(&std::fs::read_to_string(expected).unwrap());
        assert_eq!(written[0].text, "HELLO THERE");
        assert_eq!(written[1].text, "GENERAL\nKENOBI");
        assert_eq!(written[1].timing, "00:00:03,000 --> 00:00:04,500");

        let requests = translator.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert!(requests[0][0].content.contains("into ja"));
    }

    #[tokio::test]
    async fn translate_uses_default_target_for_bare_id() {
        let dir = TempDir::new().unwrap();
        let workspace = Workspace::new(dir.path());
        workspace.ensure_content_dir("abc123").await.unwrap();
        std::fs::write(workspace.subtitle_path("abc123"), SAMPLE_SRT).unwrap();

        let translator = Arc::new(UppercaseTranslator {
            requests: Mutex::new(Vec::new()),
        });
        let tool = TranslateSubtitle::new(workspace.clone(), translator, "zh-CN");

        let path = tool.call(&CancellationToken::new(), "abc123").await.unwrap();
        assert!(path.ends_with("subtitle_zh-CN.srt"));
    }

    #[tokio::test]
    async fn translate_requires_source_subtitle() {
        let dir = TempDir::new().unwrap();
        let translator = Arc::new(UppercaseTranslator {
            requests: Mutex::new(Vec::new()),
        });
        let tool = TranslateSubtitle::new(Workspace::new(dir.path()), translator, "zh-CN");

        let err = tool
            .call(&CancellationToken::new(), "abc123")
            .await
            .unwrap_err();
        assert!(matches!(err, CapabilityError::MissingArtifact(_)));
    }

    #[tokio::test]
    async fn translate_rejects_path_like_target_language() {
        let dir = TempDir::new().unwrap();
        let workspace = Workspace::new(dir.path());
        workspace.ensure_content_dir("abc123").await.unwrap();
        std::fs::write(workspace.subtitle_path("abc123"), SAMPLE_SRT).unwrap();

        let translator = Arc::new(UppercaseTranslator {
            requests: Mutex::new(Vec::new()),
        });
        let tool = TranslateSubtitle::new(workspace, translator.clone(), "zh-CN");

        let err = tool
            .call(
                &CancellationToken::new(),
                r#"{"video_id": "abc123", "target_lang": "x/../../../escaped"}"#,
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CapabilityError::InvalidInput(message) if message.contains("language")
        ));
        assert!(translator.requests.lock().unwrap().is_empty());
    }
}
