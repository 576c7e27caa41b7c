use crate::capability::CapabilityRegistry;

const PLANNER_RULES: &str = r#"Reply with exactly one JSON object and nothing else:
{
  "type": "tool" or "finish",
  "tool_name": "capability to call (type=tool only)",
  "tool_input": "input string for the capability (type=tool only)",
  "result": "final answer for the user (type=finish only)",
  "reasoning": "why you chose this step"
}

RULES
1. Call one capability per reply.
2. Decide the next step from the outputs of earlier steps.
3. When the task is complete, reply with type=finish.
4. If a capability reports an error, try another approach or finish and report the failure.
5. When a capability accepts JSON input, pass it as a string in `tool_input`.
6. No markdown, no code fences, no text outside the JSON object."#;

/// Builds the system message: role, capability catalogue, then the action protocol.
pub fn render_system_prompt(registry: &CapabilityRegistry) -> String {
    let mut catalogue = String::from("Available capabilities:\n");
    for capability in registry.iter() {
        catalogue.push_str(&format!(
            "- {}: {}\n",
            capability.name(),
            capability.description()
        ));
    }

    format!(
        "You are a task execution assistant for a video publishing workflow. \
Analyse the user's task and call the available capabilities in a sensible order.\n\n\
{catalogue}\n{PLANNER_RULES}"
    )
}
