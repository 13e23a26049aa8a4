//! Canonical request to Anthropic Messages format

use prompti_config::ModelConfig;

use super::file_placeholder;
use crate::protocol::anthropic::{
    AnthropicContentBlock, AnthropicMessage, AnthropicRequest, AnthropicSource, AnthropicTool, AnthropicToolChoice,
};
use crate::types::{Part, Request, Role, ToolChoice, ToolParams};

/// Default max tokens when not specified (Anthropic requires this field)
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Build the Messages API body for `request`
///
/// System messages move to the top-level `system` field and consecutive
/// blocks with the same role are folded into one message, since the API
/// requires alternating roles.
pub fn to_anthropic(request: &Request, config: &ModelConfig) -> AnthropicRequest {
    let mut system: Vec<&str> = Vec::new();
    let mut messages: Vec<AnthropicMessage> = Vec::new();

    for message in &request.messages {
        if message.role == Role::System {
            if let Some(text) = message.text() {
                system.push(text);
            }
            continue;
        }

        let Some(block) = to_block(&message.part) else {
            continue;
        };

        // Tool results travel on user turns
        let role = match message.role {
            Role::Assistant => "assistant",
            Role::User | Role::Tool | Role::System => "user",
        };

        match messages.last_mut() {
            Some(last) if last.role == role => last.content.push(block),
            _ => messages.push(AnthropicMessage {
                role,
                content: vec![block],
            }),
        }
    }

    let mut wire = AnthropicRequest {
        model: config.model.clone(),
        max_tokens: request.max_tokens.or(config.max_tokens).unwrap_or(DEFAULT_MAX_TOKENS),
        system: (!system.is_empty()).then(|| system.join("\n\n")),
        messages,
        stream: request.stream,
        temperature: request.temperature.or(config.temperature),
        top_p: request.top_p.or(config.top_p),
        top_k: request.top_k,
        stop_sequences: (!request.stop.is_empty()).then(|| request.stop.clone()),
        ..AnthropicRequest::default()
    };

    if let Some(params) = request.tool_params.as_ref().filter(|p| !p.tools.is_empty()) {
        apply_tools(&mut wire, params);
    }

    wire
}

fn to_block(part: &Part) -> Option<AnthropicContentBlock> {
    let block = match part {
        Part::Text(text) => AnthropicContentBlock::Text { text: text.clone() },
        Part::Thinking(thinking) => AnthropicContentBlock::Thinking {
            thinking: thinking.clone(),
        },
        Part::ImageUrl(url) => AnthropicContentBlock::Image { source: source(url) },
        Part::File { url, mime_type } => {
            let is_pdf = mime_type.as_deref() == Some("application/pdf")
                || url.starts_with("data:application/pdf")
                || url.to_ascii_lowercase().ends_with(".pdf");

            if is_pdf {
                AnthropicContentBlock::Document { source: source(url) }
            } else {
                AnthropicContentBlock::Text {
                    text: file_placeholder(url),
                }
            }
        }
        Part::ToolUse(call) => AnthropicContentBlock::ToolUse {
            id: call.id.clone(),
            name: call.name.clone(),
            input: call.arguments.clone(),
        },
        Part::ToolResult(result) => AnthropicContentBlock::ToolResult {
            tool_use_id: result.call_id.clone(),
            content: result.content_text(),
            is_error: result.is_error,
        },
        Part::Data(_) | Part::Error(_) => return None,
    };

    Some(block)
}

/// Inline `data:` URIs become base64 sources, anything else a URL source
fn source(url: &str) -> AnthropicSource {
    if let Some(rest) = url.strip_prefix("data:")
        && let Some((header, data)) = rest.split_once(',')
        && let Some(media_type) = header.strip_suffix(";base64")
    {
        return AnthropicSource::Base64 {
            media_type: media_type.to_owned(),
            data: data.to_owned(),
        };
    }

    AnthropicSource::Url { url: url.to_owned() }
}

fn apply_tools(wire: &mut AnthropicRequest, params: &ToolParams) {
    wire.tools = Some(
        params
            .tools
            .iter()
            .map(|tool| AnthropicTool {
                name: tool.name.clone(),
                description: tool.description.clone(),
                input_schema: tool.parameters.clone(),
            })
            .collect(),
    );

    let disable_parallel = (!params.parallel_allowed).then_some(true);

    let (choice_type, name) = match &params.choice {
        // Auto is the API default; only spelled out to carry the parallel flag
        ToolChoice::Auto if disable_parallel.is_none() => return,
        ToolChoice::Auto => ("auto", None),
        ToolChoice::None => ("none", None),
        ToolChoice::Required => ("any", None),
        ToolChoice::Force(name) => ("tool", Some(name.clone())),
    };

    wire.tool_choice = Some(AnthropicToolChoice {
        choice_type,
        name,
        disable_parallel_tool_use: disable_parallel.filter(|_| choice_type != "none"),
    });
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::*;
    use crate::types::{Message, ToolSpec};

    fn wire(request: &Request) -> Value {
        serde_json::to_value(to_anthropic(request, &ModelConfig::new("anthropic", "claude-3-5-haiku-latest"))).unwrap()
    }

    fn with_tools(choice: ToolChoice) -> Request {
        Request::new(vec![Message::user("time?")]).with_tools(
            ToolParams::new(vec![ToolSpec::new("get_time", "Current time", json!({"type": "object"}))])
                .with_choice(choice),
        )
    }

    #[test]
    fn minimal_request_shape() {
        let request = Request::new(vec![Message::user("hi")]).with_stream(false);

        assert_eq!(
            wire(&request),
            json!({
                "model": "claude-3-5-haiku-latest",
                "max_tokens": 4096,
                "messages": [{"role": "user", "content": [{"type": "text", "text": "hi"}]}],
                "stream": false
            })
        );
    }

    #[test]
    fn system_messages_are_lifted() {
        let request = Request::new(vec![
            Message::system("Be brief."),
            Message::system("Answer in French."),
            Message::user("hi"),
        ]);

        let body = wire(&request);
        assert_eq!(body["system"], "Be brief.\n\nAnswer in French.");
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn tool_round_trip_blocks() {
        let request = Request::new(vec![
            Message::user("time?"),
            Message::tool_use("toolu_1", "get_time", json!({"tz": "UTC"})),
            Message::tool_result("toolu_1", json!({"time": "12:00"})),
        ]);

        let messages = wire(&request)["messages"].clone();
        assert_eq!(
            messages[1],
            json!({
                "role": "assistant",
                "content": [{"type": "tool_use", "id": "toolu_1", "name": "get_time", "input": {"tz": "UTC"}}]
            })
        );
        assert_eq!(
            messages[2],
            json!({
                "role": "user",
                "content": [{"type": "tool_result", "tool_use_id": "toolu_1", "content": "{\"time\":\"12:00\"}"}]
            })
        );
    }

    #[test]
    fn consecutive_same_role_blocks_merge() {
        let request = Request::new(vec![
            Message::user("look at this"),
            Message::new(Role::User, Part::ImageUrl("https://x.test/cat.png".to_owned())),
        ]);

        let messages = wire(&request)["messages"].clone();
        assert_eq!(messages.as_array().unwrap().len(), 1);
        assert_eq!(
            messages[0]["content"][1],
            json!({"type": "image", "source": {"type": "url", "url": "https://x.test/cat.png"}})
        );
    }

    #[test]
    fn data_uri_image_becomes_base64() {
        let request = Request::new(vec![Message::new(
            Role::User,
            Part::ImageUrl("data:image/png;base64,iVBORw0KGgo=".to_owned()),
        )]);

        assert_eq!(
            wire(&request)["messages"][0]["content"][0]["source"],
            json!({"type": "base64", "media_type": "image/png", "data": "iVBORw0KGgo="})
        );
    }

    #[test]
    fn pdf_is_a_document_other_files_are_text() {
        let request = Request::new(vec![
            Message::new(
                Role::User,
                Part::File {
                    url: "https://x.test/report.PDF".to_owned(),
                    mime_type: None,
                },
            ),
            Message::new(
                Role::User,
                Part::File {
                    url: "https://x.test/data.csv".to_owned(),
                    mime_type: Some("text/csv".to_owned()),
                },
            ),
        ]);

        let content = wire(&request)["messages"][0]["content"].clone();
        assert_eq!(content[0]["type"], "document");
        assert_eq!(content[1], json!({"type": "text", "text": "[file: https://x.test/data.csv]"}));
    }

    #[test]
    fn internal_kinds_are_dropped() {
        let request = Request::new(vec![
            Message::user("hi"),
            Message::new(Role::Assistant, Part::Data(json!({"x": 1}))),
            Message::new(Role::Assistant, Part::Error("boom".to_owned())),
        ]);

        assert_eq!(wire(&request)["messages"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn forced_tool_choice_spelling() {
        let body = wire(&with_tools(ToolChoice::Force("get_time".to_owned())));

        assert_eq!(body["tool_choice"], json!({"type": "tool", "name": "get_time"}));
        assert_eq!(
            body["tools"][0],
            json!({"name": "get_time", "description": "Current time", "input_schema": {"type": "object"}})
        );
    }

    #[test]
    fn tool_policies_map_to_anthropic_values() {
        assert!(wire(&with_tools(ToolChoice::Auto)).get("tool_choice").is_none());
        assert_eq!(wire(&with_tools(ToolChoice::None))["tool_choice"], json!({"type": "none"}));
        assert_eq!(wire(&with_tools(ToolChoice::Required))["tool_choice"], json!({"type": "any"}));
    }

    #[test]
    fn serial_tool_use_is_carried_on_auto() {
        let mut request = with_tools(ToolChoice::Auto);
        if let Some(params) = request.tool_params.as_mut() {
            params.parallel_allowed = false;
        }

        assert_eq!(
            wire(&request)["tool_choice"],
            json!({"type": "auto", "disable_parallel_tool_use": true})
        );
    }

    #[test]
    fn sampling_knobs_are_renamed() {
        let mut request = Request::new(vec![Message::user("hi")]);
        request.stop = vec!["\n\nHuman:".to_owned()];
        request.top_k = Some(40);
        request.max_tokens = Some(512);

        let body = wire(&request);
        assert_eq!(body["stop_sequences"], json!(["\n\nHuman:"]));
        assert_eq!(body["top_k"], 40);
        assert_eq!(body["max_tokens"], 512);
        assert!(body.get("stop").is_none());
    }
}
