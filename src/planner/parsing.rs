use serde::Deserialize;

use super::error::ProtocolError;
use super::types::PlannedAction;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ActionPayload {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    tool_name: Option<String>,
    #[serde(default)]
    tool_input: Option<String>,
    #[serde(default)]
    result: Option<String>,
    #[serde(default)]
    reasoning: Option<String>,
}

/// Parses a raw planner reply into exactly one action.
///
/// `<think>` blocks emitted by reasoning models and a surrounding markdown
/// fence are removed first; what remains must be a single JSON object with
/// the protocol's fields and nothing else.
pub fn parse_action(response: &str) -> Result<PlannedAction, ProtocolError> {
    let cleaned = strip_think_blocks(response);
    let body = strip_code_fence(cleaned.trim());
    if !body.starts_with('{') {
        return Err(ProtocolError::NoJson);
    }

    let payload: ActionPayload =
        serde_json::from_str(body).map_err(|source| ProtocolError::Malformed { source })?;
    let reasoning = payload.reasoning.unwrap_or_default();

    match payload.kind.as_str() {
        "tool" => {
            let tool_name = payload
                .tool_name
                .filter(|name| !name.trim().is_empty())
                .ok_or(ProtocolError::MissingField {
                    kind: "tool",
                    field: "tool_name",
                })?;
            Ok(PlannedAction::InvokeTool {
                tool_name,
                tool_input: payload.tool_input.unwrap_or_default(),
                reasoning,
            })
        }
        "finish" => Ok(PlannedAction::Finish {
            result: payload.result.unwrap_or_default(),
            reasoning,
        }),
        other => Err(ProtocolError::UnknownKind(other.to_string())),
    }
}

pub(crate) fn strip_think_blocks(input: &str) -> String {
    let mut cleaned = input.to_string();

    while let Some(think_start) = cleaned.find("<think>") {
        if let Some(think_end_pos) = cleaned[think_start..].find("</think>") {
            let absolute_end = think_start + think_end_pos + "</think>".len();
            cleaned.replace_range(think_start..absolute_end, "");
        } else {
            cleaned.replace_range(think_start.., "");
            break;
        }
    }

    cleaned
}

fn strip_code_fence(input: &str) -> &str {
    let Some(rest) = input.strip_prefix("```") else {
        return input;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Returns the first balanced `{...}` object in `input` after removing think blocks.
pub(crate) fn extract_json_object(input: &str) -> Option<String> {
    extract_balanced(&strip_think_blocks(input), '{', '}')
}

/// Returns the first balanced `[...]` array in `input` after removing think blocks.
pub(crate) fn extract_json_array(input: &str) -> Option<String> {
    extract_balanced(&strip_think_blocks(input), '[', ']')
}

fn extract_balanced(input: &str, open: char, close: char) -> Option<String> {
    let trimmed = input.trim();
    let start = trimmed.find(open)?;

    let mut depth = 0;
    let mut in_string = false;
    let mut escaped = false;
    for (idx, ch) in trimmed[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            c if c == open => depth += 1,
            c if c == close => {
                depth -= 1;
                if depth == 0 {
                    return Some(trimmed[start..=start + idx].to_string());
                }
            }
            _ => {}
        }
    }

    None
}
