//! Normalization of caller request shapes into the single internal call
//! form, including recursive flattening of structured message content.

use chatbridge_core::{Error, Result};
use chatbridge_protocol::OutboundCall;

use crate::types::{CompletionMessage, MessageContent, RelayRequest};

/// Recursion bound for structured content. Anything nested deeper is
/// stringified rather than walked further.
const MAX_CONTENT_DEPTH: usize = 8;

/// Normalize an accepted request into the internal call shape.
///
/// Minimal requests pass their text through directly. Completion requests
/// extract the most recent user-authored message, falling back to the most
/// recent message carrying any content. Fails with `EmptyOrInvalidMessage`
/// when no non-blank text is extractable.
pub fn normalize(request: RelayRequest) -> Result<OutboundCall> {
    match request {
        RelayRequest::Minimal(req) => {
            let text = req.message.trim();
            if text.is_empty() {
                return Err(Error::EmptyOrInvalidMessage);
            }
            Ok(OutboundCall {
                text: text.to_string(),
                request_id: req.request_id,
                peer_id: req.peer_id,
                conversation_id: req.conversation_id,
            })
        }
        RelayRequest::Completion(req) => {
            let text = extract_text(&req.messages).ok_or(Error::EmptyOrInvalidMessage)?;
            Ok(OutboundCall {
                text,
                request_id: None,
                peer_id: req.peer_id,
                conversation_id: req.conversation_id,
            })
        }
    }
}

/// Most recent user-authored message with extractable text, or the most
/// recent message carrying any content.
fn extract_text(messages: &[CompletionMessage]) -> Option<String> {
    messages
        .iter()
        .rev()
        .filter(|m| m.role.as_deref() == Some("user"))
        .find_map(message_text)
        .or_else(|| messages.iter().rev().find_map(message_text))
}

fn message_text(message: &CompletionMessage) -> Option<String> {
    let content = message.content.as_ref()?;
    let text = flatten_content(content, MAX_CONTENT_DEPTH);
    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

/// Flatten structured content into a single string. Text nodes win over
/// nested content; list parts are joined with newlines; shapes outside the
/// recognized union are stringified rather than dropped.
fn flatten_content(content: &MessageContent, depth: usize) -> String {
    if depth == 0 {
        return serde_json::to_string(content).unwrap_or_default();
    }
    match content {
        MessageContent::Text(text) => text.clone(),
        MessageContent::Parts(parts) => parts
            .iter()
            .map(|part| flatten_content(part, depth - 1))
            .filter(|text| !text.trim().is_empty())
            .collect::<Vec<_>>()
            .join("\n"),
        MessageContent::Node { text: Some(text), .. } => text.clone(),
        MessageContent::Node { content: Some(inner), .. } => flatten_content(inner, depth - 1),
        MessageContent::Node { rest, .. } if !rest.is_empty() => {
            serde_json::Value::Object(rest.clone()).to_string()
        }
        MessageContent::Node { .. } => String::new(),
        MessageContent::Other(value) => match value {
            serde_json::Value::Null => String::new(),
            other => other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: serde_json::Value) -> RelayRequest {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn test_minimal_shape_passes_through() {
        let call = normalize(parse(serde_json::json!({
            "message": "  hello  ",
            "peerId": "p1",
            "conversationId": "c1",
        })))
        .unwrap();

        assert_eq!(call.text, "hello");
        assert_eq!(call.peer_id.as_deref(), Some("p1"));
        assert_eq!(call.conversation_id.as_deref(), Some("c1"));
    }

    #[test]
    fn test_minimal_blank_message_rejected() {
        let result = normalize(parse(serde_json::json!({ "message": "   " })));
        assert!(matches!(result, Err(Error::EmptyOrInvalidMessage)));
    }

    #[test]
    fn test_typed_parts_extract_text() {
        let call = normalize(parse(serde_json::json!({
            "messages": [
                {"role": "user", "content": [{"type": "text", "text": "hi"}]},
            ],
        })))
        .unwrap();
        assert_eq!(call.text, "hi");
    }

    #[test]
    fn test_empty_content_rejected() {
        let result = normalize(parse(serde_json::json!({
            "messages": [{"role": "user", "content": ""}],
        })));
        assert!(matches!(result, Err(Error::EmptyOrInvalidMessage)));
    }

    #[test]
    fn test_most_recent_user_message_wins() {
        let call = normalize(parse(serde_json::json!({
            "messages": [
                {"role": "user", "content": "first"},
                {"role": "assistant", "content": "reply"},
                {"role": "user", "content": "second"},
            ],
        })))
        .unwrap();
        assert_eq!(call.text, "second");
    }

    #[test]
    fn test_fallback_to_any_content() {
        let call = normalize(parse(serde_json::json!({
            "messages": [
                {"role": "system", "content": "be helpful"},
                {"role": "assistant", "content": "earlier reply"},
            ],
        })))
        .unwrap();
        assert_eq!(call.text, "earlier reply");
    }

    #[test]
    fn test_user_with_blank_content_falls_back() {
        let call = normalize(parse(serde_json::json!({
            "messages": [
                {"role": "assistant", "content": "usable"},
                {"role": "user", "content": "   "},
            ],
        })))
        .unwrap();
        assert_eq!(call.text, "usable");
    }

    #[test]
    fn test_nested_content_objects() {
        let call = normalize(parse(serde_json::json!({
            "messages": [
                {"role": "user", "content": {"content": {"text": "deep"}}},
            ],
        })))
        .unwrap();
        assert_eq!(call.text, "deep");
    }

    #[test]
    fn test_mixed_parts_joined() {
        let call = normalize(parse(serde_json::json!({
            "messages": [
                {"role": "user", "content": [
                    {"type": "text", "text": "line one"},
                    {"type": "image", "url": "ignored.png"},
                    "line two",
                ]},
            ],
        })))
        .unwrap();
        assert!(call.text.starts_with("line one"));
        assert!(call.text.ends_with("line two"));
    }

    #[test]
    fn test_unrecognized_object_is_stringified() {
        let call = normalize(parse(serde_json::json!({
            "messages": [
                {"role": "user", "content": {"blob": "opaque"}},
            ],
        })))
        .unwrap();
        assert!(call.text.contains("blob"));
        assert!(call.text.contains("opaque"));
    }

    #[test]
    fn test_scalar_content_is_stringified() {
        let call = normalize(parse(serde_json::json!({
            "messages": [{"role": "user", "content": 42}],
        })))
        .unwrap();
        assert_eq!(call.text, "42");
    }

    #[test]
    fn test_depth_bound_stringifies_remainder() {
        // Nest far past the bound; extraction must terminate and still
        // surface the buried text in stringified form.
        let mut content = serde_json::json!({"text": "buried"});
        for _ in 0..20 {
            content = serde_json::json!({"content": content});
        }
        let call = normalize(parse(serde_json::json!({
            "messages": [{"role": "user", "content": content}],
        })))
        .unwrap();
        assert!(call.text.contains("buried"));
    }

    #[test]
    fn test_no_messages_rejected() {
        let result = normalize(parse(serde_json::json!({ "messages": [] })));
        assert!(matches!(result, Err(Error::EmptyOrInvalidMessage)));

        let result = normalize(parse(serde_json::json!({
            "messages": [{"role": "user"}],
        })));
        assert!(matches!(result, Err(Error::EmptyOrInvalidMessage)));
    }

    #[test]
    fn test_null_content_rejected() {
        let result = normalize(parse(serde_json::json!({
            "messages": [{"role": "user", "content": null}],
        })));
        assert!(matches!(result, Err(Error::EmptyOrInvalidMessage)));
    }
}
