use gemini_api::payload::{Content, GenerationConfig, Part};
use gemini_api::GenerateContentRequest;
use serde_json::json;

#[test]
fn prompt_request_serializes_as_single_user_turn() {
    let request = GenerateContentRequest::from_prompt("Convert this note");
    let value = serde_json::to_value(&request).expect("serialize request");

    assert_eq!(
        value,
        json!({
            "contents": [
                {"role": "user", "parts": [{"text": "Convert this note"}]}
            ]
        })
    );
}

#[test]
fn optional_sections_use_camel_case_keys() {
    let request = GenerateContentRequest::from_prompt("hi")
        .with_system_instruction("be terse")
        .with_generation_config(GenerationConfig {
            temperature: Some(0.2),
            max_output_tokens: Some(256),
            stop_sequences: vec!["END".to_string()],
            ..GenerationConfig::default()
        });
    let value = serde_json::to_value(&request).expect("serialize request");

    assert_eq!(value["systemInstruction"]["parts"][0]["text"], "be terse");
    assert!(value["systemInstruction"].get("role").is_none());
    assert_eq!(value["generationConfig"]["temperature"], 0.2);
    assert_eq!(value["generationConfig"]["maxOutputTokens"], 256);
    assert_eq!(value["generationConfig"]["stopSequences"][0], "END");
    assert!(value["generationConfig"].get("topP").is_none());
}

#[test]
fn has_text_ignores_blank_parts() {
    let blank = GenerateContentRequest {
        contents: vec![Content {
            role: Some("user".to_string()),
            parts: vec![Part::text("   "), Part::text("\n")],
        }],
        system_instruction: None,
        generation_config: None,
    };
    assert!(!blank.has_text());

    assert!(GenerateContentRequest::from_prompt("x").has_text());
}
