//! Backend adapter tests
//!
//! Ordering and round-trip properties across all three wire families.

use modelgate::backends::{adapter_for, BackendAdapter};
use modelgate::models::canonical::{
    BackendKind, CanonicalChatRequest, CanonicalEvent, ChatMessage, ModelBinding, Role, WireMode,
};

fn binding(kind: BackendKind, model: &str) -> ModelBinding {
    ModelBinding {
        id: "b-1".into(),
        key: "test".into(),
        model: model.into(),
        kind,
        base_url: "https://api.example.com/v1".into(),
        credential: Some("sk-test".into()),
        wire_mode: WireMode::Auto,
        supports_reasoning: false,
        price_input_per_million: None,
        price_output_per_million: None,
        currency: "USD".into(),
    }
}

fn request(kind: BackendKind, model: &str, stream: bool, reasoning: bool) -> CanonicalChatRequest {
    CanonicalChatRequest {
        binding: binding(kind, model),
        messages: vec![ChatMessage::new(Role::User, "say hello")],
        temperature: Some(0.7),
        max_tokens: Some(100),
        stream,
        reasoning,
    }
}

/// Fixture streams whose deltas concatenate to "Hello, world!"
fn fixture_chunks(kind: BackendKind) -> Vec<&'static [u8]> {
    match kind {
        BackendKind::ChatCompletions => vec![
            b"data: {\"choices\":[{\"index\":0,\"delta\":{\"content\":\"Hello\"}}]}\n\n",
            b"data: {\"choices\":[{\"index\":0,\"delta\":{\"content\":\", \"}}]}\n\n",
            b"data: {\"choices\":[{\"index\":0,\"delta\":{\"content\":\"world!\"}}]}\n\n",
            b"data: [DONE]\n\n",
        ],
        BackendKind::Responses => vec![
            b"data: {\"type\":\"response.created\"}\n\n",
            b"data: {\"type\":\"response.output_text.delta\",\"delta\":\"Hello\"}\n\n",
            b"data: {\"type\":\"response.output_text.delta\",\"delta\":\", \"}\n\n",
            b"data: {\"type\":\"response.output_text.delta\",\"delta\":\"world!\"}\n\n",
            b"data: {\"type\":\"response.completed\"}\n\n",
        ],
        BackendKind::LocalNdjson => vec![
            b"{\"message\":{\"role\":\"assistant\",\"content\":\"Hello\"},\"done\":false}\n",
            b"{\"message\":{\"role\":\"assistant\",\"content\":\", \"},\"done\":false}\n",
            b"{\"message\":{\"role\":\"assistant\",\"content\":\"world!\"},\"done\":false}\n",
            b"{\"done\":true}\n",
        ],
    }
}

const ALL_KINDS: [BackendKind; 3] = [
    BackendKind::ChatCompletions,
    BackendKind::Responses,
    BackendKind::LocalNdjson,
];

#[test]
fn test_events_preserve_arrival_order() {
    for kind in ALL_KINDS {
        let mut normalizer = adapter_for(kind).normalizer();

        let mut events = Vec::new();
        for chunk in fixture_chunks(kind) {
            events.extend(normalizer.feed(chunk));
        }
        events.extend(normalizer.finish());

        let text: String = events
            .iter()
            .filter_map(|event| match event {
                CanonicalEvent::Delta { text } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(text, "Hello, world!", "kind {:?}", kind);
        assert_eq!(events.last(), Some(&CanonicalEvent::Done), "kind {:?}", kind);
    }
}

#[test]
fn test_no_delta_after_terminal() {
    for kind in ALL_KINDS {
        let mut normalizer = adapter_for(kind).normalizer();

        let mut events = Vec::new();
        for chunk in fixture_chunks(kind) {
            events.extend(normalizer.feed(chunk));
        }
        // Feed the fixture again after its terminal: everything must be
        // discarded, not buffered.
        for chunk in fixture_chunks(kind) {
            events.extend(normalizer.feed(chunk));
        }
        events.extend(normalizer.finish());

        let terminal_at = events.iter().position(|event| event.is_terminal()).unwrap();
        assert_eq!(terminal_at, events.len() - 1, "kind {:?}", kind);
    }
}

#[test]
fn test_chunk_boundaries_do_not_change_events() {
    // Re-deliver each fixture byte-by-byte; the event sequence must be
    // identical to whole-chunk delivery.
    for kind in ALL_KINDS {
        let whole: Vec<u8> = fixture_chunks(kind).concat();

        let mut reference = adapter_for(kind).normalizer();
        let mut expected = reference.feed(&whole);
        expected.extend(reference.finish());

        let mut bytewise = adapter_for(kind).normalizer();
        let mut events = Vec::new();
        for byte in &whole {
            events.extend(bytewise.feed(std::slice::from_ref(byte)));
        }
        events.extend(bytewise.finish());

        assert_eq!(events, expected, "kind {:?}", kind);
    }
}

#[test]
fn test_round_trip_completion_text() {
    // Encoding a request and decoding the canned reply reproduces the
    // exact completion text the fixture was built from.
    let completion = "Hello, world!";

    for kind in ALL_KINDS {
        let adapter = adapter_for(kind);
        let wire = adapter.encode(&request(kind, "gpt-4o-mini", true, false)).unwrap();
        assert!(wire.url.starts_with("https://api.example.com/v1"));

        let mut normalizer = adapter.normalizer();
        let mut events = Vec::new();
        for chunk in fixture_chunks(kind) {
            events.extend(normalizer.feed(chunk));
        }

        let text: String = events
            .iter()
            .filter_map(|event| match event {
                CanonicalEvent::Delta { text } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(text, completion, "kind {:?}", kind);
    }
}

#[test]
fn test_non_stream_fixture_extraction() {
    let cases = [
        (
            BackendKind::ChatCompletions,
            serde_json::json!({
                "id": "cmpl-1",
                "choices": [{"index": 0, "message": {"role": "assistant", "content": "Hello, world!"}}]
            }),
        ),
        (
            BackendKind::Responses,
            serde_json::json!({
                "output": [{"type": "message", "content": [{"type": "output_text", "text": "Hello, world!"}]}]
            }),
        ),
        (
            BackendKind::LocalNdjson,
            serde_json::json!({
                "message": {"role": "assistant", "content": "Hello, world!"},
                "done": true
            }),
        ),
    ];

    for (kind, body) in cases {
        let text = adapter_for(kind).extract_completion(&body).unwrap();
        assert_eq!(text, "Hello, world!", "kind {:?}", kind);
    }
}

#[test]
fn test_reasoning_budget_field_rename() {
    // Reasoning-flagged model with max_tokens 100: the encoded request
    // must omit temperature and use the reasoning token-budget field.
    let adapter = adapter_for(BackendKind::ChatCompletions);
    let wire = adapter.encode(&request(BackendKind::ChatCompletions, "o3-mini", false, true)).unwrap();

    assert!(wire.body.get("temperature").is_none());
    assert!(wire.body.get("max_tokens").is_none());
    assert_eq!(wire.body["max_completion_tokens"], 100);
}

#[test]
fn test_ndjson_corrupt_line_among_five() {
    let mut normalizer = adapter_for(BackendKind::LocalNdjson).normalizer();

    let mut events = Vec::new();
    for chunk in [
        b"{\"message\":{\"content\":\"one \"},\"done\":false}\n".as_slice(),
        b"{\"message\":{\"content\":\"two \"},\"done\":false}\n",
        b"this line is not json at all\n",
        b"{\"message\":{\"content\":\"three \"},\"done\":false}\n",
        b"{\"message\":{\"content\":\"four\"},\"done\":false}\n",
        b"{\"done\":true}\n",
    ] {
        events.extend(normalizer.feed(chunk));
    }

    let deltas = events
        .iter()
        .filter(|event| matches!(event, CanonicalEvent::Delta { .. }))
        .count();
    assert_eq!(deltas, 4);
    assert_eq!(events.last(), Some(&CanonicalEvent::Done));
    assert!(!events
        .iter()
        .any(|event| matches!(event, CanonicalEvent::Error { .. })));
}

#[test]
fn test_responses_three_reply_shapes() {
    let adapter = adapter_for(BackendKind::Responses);

    let flat = serde_json::json!({"output_text": ["a", "b"]});
    assert_eq!(adapter.extract_completion(&flat).unwrap(), "ab");

    let nested = serde_json::json!({
        "output": [{"type": "message", "content": [{"type": "text", "text": "nested"}]}]
    });
    assert_eq!(adapter.extract_completion(&nested).unwrap(), "nested");

    let bare = serde_json::json!({"text": "bare"});
    assert_eq!(adapter.extract_completion(&bare).unwrap(), "bare");
}
