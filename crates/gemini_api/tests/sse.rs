use gemini_api::{GeminiFinishReason, GeminiStreamEvent, SseStreamParser};

#[test]
fn sse_frames_split_across_feeds_are_reassembled() {
    let mut parser = SseStreamParser::default();

    let first = parser.feed(b"data: {\"candidates\":[{\"content\":{\"parts\":[{\"te");
    assert!(first.is_empty());
    assert!(!parser.is_empty_buffer());

    let second = parser.feed(b"xt\":\"[+] Fixed\"}]}}]}\n\n");
    assert_eq!(
        second,
        vec![GeminiStreamEvent::TextDelta {
            text: "[+] Fixed".to_string()
        }]
    );
    assert!(parser.is_empty_buffer());
}

#[test]
fn sse_finish_flushes_unterminated_trailing_frame() {
    let mut parser = SseStreamParser::default();
    assert!(parser
        .feed(b"data: {\"candidates\":[{\"finishReason\":\"STOP\"}]}")
        .is_empty());

    assert_eq!(
        parser.finish(),
        vec![GeminiStreamEvent::Finished {
            reason: GeminiFinishReason::Stop
        }]
    );
    assert!(parser.finish().is_empty());
}

#[test]
fn sse_error_envelope_becomes_error_event() {
    let events = SseStreamParser::parse_frames(
        "data: {\"error\":{\"code\":429,\"status\":\"RESOURCE_EXHAUSTED\",\"message\":\"quota\"}}\n\n",
    );

    assert_eq!(
        events,
        vec![GeminiStreamEvent::Error {
            code: Some(429),
            status: Some("RESOURCE_EXHAUSTED".to_string()),
            message: Some("quota".to_string()),
        }]
    );
}

#[test]
fn sse_prompt_feedback_block_reason_is_reported() {
    let events = SseStreamParser::parse_frames(
        "data: {\"promptFeedback\":{\"blockReason\":\"SAFETY\"}}\n\n",
    );

    assert_eq!(
        events,
        vec![GeminiStreamEvent::PromptBlocked {
            reason: "SAFETY".to_string()
        }]
    );
}

#[test]
fn sse_usage_metadata_follows_text_and_finish() {
    let events = SseStreamParser::parse_frames(concat!(
        "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"a\"},{\"text\":\"b\"}]},",
        "\"finishReason\":\"MAX_TOKENS\"}],",
        "\"usageMetadata\":{\"promptTokenCount\":12,\"candidatesTokenCount\":3}}\n\n"
    ));

    assert_eq!(
        events,
        vec![
            GeminiStreamEvent::TextDelta {
                text: "a".to_string()
            },
            GeminiStreamEvent::TextDelta {
                text: "b".to_string()
            },
            GeminiStreamEvent::Finished {
                reason: GeminiFinishReason::MaxTokens
            },
            GeminiStreamEvent::Usage {
                prompt_tokens: 12,
                candidate_tokens: 3
            },
        ]
    );
}

#[test]
fn sse_ignores_malformed_json_and_comment_frames() {
    let events = SseStreamParser::parse_frames(concat!(
        ": keep-alive\n\n",
        "data: {not json}\n\n",
        "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"ok\"}]}}]}\n\n",
    ));

    assert_eq!(
        events,
        vec![GeminiStreamEvent::TextDelta {
            text: "ok".to_string()
        }]
    );
}

#[test]
fn finish_reason_parse_handles_unspecified_and_unknown_values() {
    assert_eq!(GeminiFinishReason::parse("FINISH_REASON_UNSPECIFIED"), None);
    assert_eq!(
        GeminiFinishReason::parse("MALFORMED_FUNCTION_CALL"),
        Some(GeminiFinishReason::Other)
    );
    assert!(GeminiFinishReason::MaxTokens.is_complete());
    assert!(!GeminiFinishReason::Safety.is_complete());
    assert_eq!(GeminiFinishReason::Recitation.as_str(), "RECITATION");
}

#[test]
fn multibyte_text_split_between_chunks_is_kept_intact() {
    let frame = "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"café ✅\"}]}}]}\n\n";
    let bytes = frame.as_bytes();
    // Cut between the two bytes of 'é'.
    let cut = frame.find('é').expect("frame contains é") + 1;

    let mut parser = SseStreamParser::default();
    assert!(parser.feed(&bytes[..cut]).is_empty());
    assert!(!parser.is_empty_buffer());

    assert_eq!(
        parser.feed(&bytes[cut..]),
        vec![GeminiStreamEvent::TextDelta {
            text: "café ✅".to_string()
        }]
    );
    assert!(parser.is_empty_buffer());
}

#[test]
fn invalid_bytes_are_replaced_without_stalling_the_stream() {
    let mut parser = SseStreamParser::default();
    let mut bytes = b"data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"a".to_vec();
    bytes.push(0xff);
    bytes.extend_from_slice(b"b\"}]}}]}\n\n");

    assert_eq!(
        parser.feed(&bytes),
        vec![GeminiStreamEvent::TextDelta {
            text: "a\u{FFFD}b".to_string()
        }]
    );
}
