mod harness;

use harness::mock_vendor::{MockVendor, Reply};
use harness::{client, events, text_of};
use prompti_llm::{Message, Request, StreamEvent, ToolChoice, ToolParams, ToolSpec, VendorError};
use serde_json::{Value, json};

fn hello() -> Request {
    Request::new(vec![Message::user("hi")])
}

fn text_stream(pieces: &[&str]) -> Vec<Value> {
    let mut frames = vec![
        json!({"type": "message_start", "message": {"id": "msg_1", "usage": {"input_tokens": 9, "output_tokens": 1}}}),
        json!({"type": "content_block_start", "index": 0, "content_block": {"type": "text", "text": ""}}),
        json!({"type": "ping"}),
    ];
    frames.extend(pieces.iter().map(|piece| {
        json!({"type": "content_block_delta", "index": 0, "delta": {"type": "text_delta", "text": piece}})
    }));
    frames.extend([
        json!({"type": "content_block_stop", "index": 0}),
        json!({"type": "message_delta", "delta": {"stop_reason": "end_turn"}, "usage": {"output_tokens": 7}}),
        json!({"type": "message_stop"}),
    ]);
    frames
}

#[tokio::test]
async fn non_streaming_reply_is_one_text_event() {
    let mock = MockVendor::start(vec![Reply::Json(json!({"content": [{"type": "text", "text": "Hello"}]}))])
        .await
        .unwrap();
    let (client, _) = client("anthropic", "claude-3-5-haiku-latest", mock.base_url());

    let messages = client.run(&hello().with_stream(false)).unwrap().into_messages().await.unwrap();

    assert_eq!(messages, vec![Message::assistant("Hello")]);
    assert_eq!(mock.last_path().as_deref(), Some("/v1/messages"));

    let headers = mock.last_headers();
    assert_eq!(headers.api_key.as_deref(), Some("sk-test"));
    assert_eq!(headers.anthropic_version.as_deref(), Some("2023-06-01"));
    assert!(headers.authorization.is_none());
}

#[tokio::test]
async fn text_blocks_are_concatenated() {
    let mock = MockVendor::start(vec![Reply::Json(json!({
        "content": [
            {"type": "text", "text": "Hello, "},
            {"type": "text", "text": "world"}
        ],
        "usage": {"input_tokens": 5, "output_tokens": 3}
    }))])
    .await
    .unwrap();
    let (client, _) = client("claude", "claude-3-5-haiku-latest", mock.base_url());

    let events = events(client.run(&hello().with_stream(false)).unwrap()).await;
    assert_eq!(events, vec![StreamEvent::Text("Hello, world".to_owned())]);
}

#[tokio::test]
async fn streamed_text_matches_non_streamed_content() {
    let mock = MockVendor::start(vec![
        Reply::sse(&text_stream(&["Hel", "lo ", "there"])),
        Reply::Json(json!({"content": [{"type": "text", "text": "Hello there"}]})),
    ])
    .await
    .unwrap();
    let (client, _) = client("anthropic", "claude-3-5-haiku-latest", mock.base_url());

    let streamed = events(client.run(&hello()).unwrap()).await;
    let whole = events(client.run(&hello().with_stream(false)).unwrap()).await;

    assert_eq!(text_of(&streamed), "Hello there");
    assert_eq!(text_of(&whole), text_of(&streamed));
}

#[tokio::test]
async fn streamed_tool_use_block() {
    let frames = [
        json!({"type": "message_start", "message": {"usage": {"input_tokens": 30}}}),
        json!({"type": "content_block_start", "index": 0, "content_block": {"type": "text", "text": ""}}),
        json!({"type": "content_block_delta", "index": 0, "delta": {"type": "text_delta", "text": "Checking."}}),
        json!({"type": "content_block_stop", "index": 0}),
        json!({"type": "content_block_start", "index": 1,
               "content_block": {"type": "tool_use", "id": "toolu_01", "name": "get_weather", "input": {}}}),
        json!({"type": "content_block_delta", "index": 1, "delta": {"type": "input_json_delta", "partial_json": ""}}),
        json!({"type": "content_block_delta", "index": 1, "delta": {"type": "input_json_delta", "partial_json": "{\"location\":"}}),
        json!({"type": "content_block_delta", "index": 1, "delta": {"type": "input_json_delta", "partial_json": " \"Oslo\"}"}}),
        json!({"type": "content_block_stop", "index": 1}),
        json!({"type": "message_delta", "delta": {"stop_reason": "tool_use"}, "usage": {"output_tokens": 40}}),
        json!({"type": "message_stop"}),
    ];

    let mock = MockVendor::start(vec![Reply::sse(&frames)]).await.unwrap();
    let (client, _) = client("anthropic", "claude-sonnet-4-0", mock.base_url());

    let events = events(client.run(&hello()).unwrap()).await;

    assert_eq!(events.len(), 2);
    assert_eq!(events[0], StreamEvent::Text("Checking.".to_owned()));
    let StreamEvent::ToolUse(call) = &events[1] else {
        panic!("expected a tool call, got {:?}", events[1]);
    };
    assert_eq!(call.id, "toolu_01");
    assert_eq!(call.arguments, json!({"location": "Oslo"}));
}

#[tokio::test]
async fn error_frame_ends_the_stream() {
    let frames = [
        json!({"type": "content_block_delta", "index": 0, "delta": {"type": "text_delta", "text": "partial"}}),
        json!({"type": "error", "error": {"type": "overloaded_error", "message": "Overloaded"}}),
        json!({"type": "content_block_delta", "index": 0, "delta": {"type": "text_delta", "text": "ignored"}}),
    ];

    let mock = MockVendor::start(vec![Reply::sse(&frames)]).await.unwrap();
    let (client, metrics) = client("anthropic", "claude-sonnet-4-0", mock.base_url());

    let events = events(client.run(&hello()).unwrap()).await;

    assert_eq!(events.len(), 2);
    assert!(matches!(&events[1], StreamEvent::Error(VendorError { status: 200, body }) if body.contains("Overloaded")));
    assert_eq!(metrics.finished(), vec![("vendor_error".to_owned(), true)]);
    assert_eq!(mock.requests(), 1);
}

#[tokio::test]
async fn forced_tool_choice_on_the_wire() {
    let mock = MockVendor::start(vec![Reply::Json(json!({"content": [{"type": "text", "text": "12:00"}]}))])
        .await
        .unwrap();
    let (client, _) = client("anthropic", "claude-3-5-haiku-latest", mock.base_url());

    let request = Request::new(vec![Message::system("Be terse."), Message::user("time?")])
        .with_stream(false)
        .with_tools(
            ToolParams::new(vec![ToolSpec::new("get_time", "Current time", json!({"type": "object"}))])
                .with_choice(ToolChoice::Force("get_time".to_owned())),
        );
    events(client.run(&request).unwrap()).await;

    let body = mock.last_body();
    assert_eq!(body["tool_choice"], json!({"type": "tool", "name": "get_time"}));
    assert_eq!(body["system"], "Be terse.");
    assert_eq!(body["tools"][0]["input_schema"], json!({"type": "object"}));
    assert_eq!(body["max_tokens"], 4096);
}
