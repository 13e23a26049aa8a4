//! Canonical request to `OpenAI` chat completion format

use prompti_config::ModelConfig;
use serde_json::json;

use super::file_placeholder;
use crate::protocol::openai::{
    OpenAiContent, OpenAiContentPart, OpenAiFunction, OpenAiFunctionCall, OpenAiImageUrl, OpenAiMessage,
    OpenAiRequest, OpenAiResponseFormat, OpenAiStreamOptions, OpenAiTool, OpenAiToolCall,
};
use crate::types::{Part, Request, Role, ToolChoice, ToolParams};

/// Build the chat completion body for `request`
///
/// Sampling values missing from the request fall back to the config
/// defaults. `include_usage` asks streaming responses for a final usage
/// chunk.
pub fn to_openai(request: &Request, config: &ModelConfig, include_usage: bool) -> OpenAiRequest {
    let reasoning = is_reasoning_model(&config.model);
    let max_tokens = request.max_tokens.or(config.max_tokens);

    let mut wire = OpenAiRequest {
        model: config.model.clone(),
        messages: convert_messages(request),
        stream: request.stream,
        stream_options: (request.stream && include_usage).then_some(OpenAiStreamOptions { include_usage: true }),
        temperature: request.temperature.or(config.temperature),
        top_p: if reasoning { None } else { request.top_p.or(config.top_p) },
        n: request.n,
        seed: request.seed,
        logit_bias: request.logit_bias.clone(),
        stop: (!request.stop.is_empty()).then(|| request.stop.clone()),
        response_format: request
            .response_format
            .as_ref()
            .map(|format_type| OpenAiResponseFormat {
                format_type: format_type.clone(),
            }),
        user: request.trace.user_id.clone(),
        ..OpenAiRequest::default()
    };

    if reasoning {
        wire.max_completion_tokens = max_tokens;
    } else {
        wire.max_tokens = max_tokens;
    }

    if let Some(params) = request.tool_params.as_ref().filter(|p| !p.tools.is_empty()) {
        apply_tools(&mut wire, params);
    }

    wire
}

/// Reasoning models take `max_completion_tokens` and reject `top_p`
fn is_reasoning_model(model: &str) -> bool {
    let name = model.rsplit('/').next().unwrap_or(model);
    ["o1", "o3", "o4", "gpt-5"].iter().any(|prefix| name.starts_with(prefix))
}

fn apply_tools(wire: &mut OpenAiRequest, params: &ToolParams) {
    wire.tools = Some(
        params
            .tools
            .iter()
            .map(|tool| OpenAiTool {
                tool_type: "function",
                function: OpenAiFunction {
                    name: tool.name.clone(),
                    description: tool.description.clone(),
                    parameters: tool.parameters.clone(),
                },
            })
            .collect(),
    );

    wire.tool_choice = match &params.choice {
        ToolChoice::Auto => None,
        ToolChoice::None => Some(json!("none")),
        ToolChoice::Required => Some(json!("required")),
        ToolChoice::Force(name) => Some(json!({"type": "function", "function": {"name": name}})),
    };

    if !params.parallel_allowed {
        wire.parallel_tool_calls = Some(false);
    }
}

fn convert_messages(request: &Request) -> Vec<OpenAiMessage> {
    let mut out: Vec<OpenAiMessage> = Vec::with_capacity(request.messages.len());

    for message in &request.messages {
        let role = message.role.as_str();

        let converted = match &message.part {
            Part::Text(text) | Part::Thinking(text) => text_message(role, text.clone()),
            Part::ImageUrl(url) => OpenAiMessage {
                role,
                content: Some(OpenAiContent::Parts(vec![OpenAiContentPart::ImageUrl {
                    image_url: OpenAiImageUrl { url: url.clone() },
                }])),
                tool_calls: None,
                tool_call_id: None,
            },
            Part::File { url, .. } => text_message(role, file_placeholder(url)),
            Part::ToolUse(call) => {
                let tool_call = OpenAiToolCall {
                    id: call.id.clone(),
                    call_type: "function".to_owned(),
                    function: OpenAiFunctionCall {
                        name: call.name.clone(),
                        arguments: call.arguments.to_string(),
                    },
                };

                // Parallel calls arrive as separate canonical messages but
                // must share one assistant turn on the wire
                if let Some(previous) = out.last_mut()
                    && previous.role == Role::Assistant.as_str()
                {
                    previous.tool_calls.get_or_insert_with(Vec::new).push(tool_call);
                    continue;
                }

                OpenAiMessage {
                    role: Role::Assistant.as_str(),
                    content: None,
                    tool_calls: Some(vec![tool_call]),
                    tool_call_id: None,
                }
            }
            Part::ToolResult(result) => OpenAiMessage {
                role: Role::Tool.as_str(),
                content: Some(OpenAiContent::Text(result.content_text())),
                tool_calls: None,
                tool_call_id: Some(result.call_id.clone()),
            },
            Part::Data(_) | Part::Error(_) => continue,
        };

        out.push(converted);
    }

    out
}

const fn text_message(role: &'static str, text: String) -> OpenAiMessage {
    OpenAiMessage {
        role,
        content: Some(OpenAiContent::Text(text)),
        tool_calls: None,
        tool_call_id: None,
    }
}
