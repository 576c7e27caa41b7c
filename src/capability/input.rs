use serde::de::DeserializeOwned;

use super::error::CapabilityError;

/// Structured input for a capability that also accepts a bare video id.
pub trait StructuredInput: DeserializeOwned {
    /// Builds the input with every optional field at its default.
    fn from_content_id(content_id: &str) -> Self;

    fn content_id(&self) -> &str;
}

/// Parses capability input: a JSON object when the text starts with `{`,
/// otherwise a bare (optionally quoted) video id.
pub fn parse_input<T: StructuredInput>(input: &str) -> Result<T, CapabilityError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(CapabilityError::InvalidInput(
            "expected a video id or a JSON object, got empty input".to_string(),
        ));
    }

    let parsed = if trimmed.starts_with('{') {
        serde_json::from_str::<T>(trimmed)
            .map_err(|err| CapabilityError::InvalidInput(format!("malformed JSON input: {err}")))?
    } else {
        T::from_content_id(unquote(trimmed))
    };

    validate_content_id(parsed.content_id())?;
    Ok(parsed)
}

/// Video ids become directory names, so only `[A-Za-z0-9_-]` is accepted.
pub fn validate_content_id(content_id: &str) -> Result<(), CapabilityError> {
    validate_path_token("video_id", content_id)
}

/// Language codes end up in artifact file names; same character set as ids.
pub fn validate_language_code(lang: &str) -> Result<(), CapabilityError> {
    validate_path_token("language", lang)
}

fn validate_path_token(field: &str, value: &str) -> Result<(), CapabilityError> {
    if value.is_empty() {
        return Err(CapabilityError::InvalidInput(format!(
            "{field} cannot be empty"
        )));
    }

    let valid = value
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_');
    if !valid {
        return Err(CapabilityError::InvalidInput(format!(
            "{field} '{value}' contains unsupported characters"
        )));
    }

    Ok(())
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .unwrap_or(value)
        .trim()
}
