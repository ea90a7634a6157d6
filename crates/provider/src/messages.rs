//! Wire types for the Gemini `generateContent` endpoint.
//!
//! Requests carry the source image as a base64 `inlineData` part followed
//! by a text instruction, and ask for image-only output. Responses are
//! scanned for the first part holding `inlineData`.

use serde::{Deserialize, Serialize};

/// Output modality requested from the model.
pub const MODALITY_IMAGE: &str = "IMAGE";

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
}

impl GenerateContentRequest {
    /// Build an image-in, image-out request.
    ///
    /// * `data_b64` - base64-encoded source image.
    pub fn image_edit(data_b64: String, mime_type: &str, instruction: &str) -> Self {
        Self {
            contents: vec![Content {
                parts: vec![
                    Part {
                        inline_data: Some(InlineData {
                            mime_type: mime_type.to_string(),
                            data: data_b64,
                        }),
                        text: None,
                    },
                    Part {
                        inline_data: None,
                        text: Some(instruction.to_string()),
                    },
                ],
            }],
            generation_config: GenerationConfig {
                response_modalities: vec![MODALITY_IMAGE.to_string()],
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_modalities: Vec<String>,
}

// ---------------------------------------------------------------------------
// Shared
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
}

/// One part of a message. Exactly one field is normally set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Base64 payload with its content type.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    #[serde(default)]
    pub mime_type: String,
    pub data: String,
}

// ---------------------------------------------------------------------------
// Response
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

impl GenerateContentResponse {
    /// First inline image payload of the first candidate, if any.
    pub fn first_image(&self) -> Option<&InlineData> {
        self.candidates
            .first()?
            .content
            .as_ref()?
            .parts
            .iter()
            .find_map(|part| part.inline_data.as_ref())
    }

    /// Finish reason of the first candidate (e.g. `SAFETY`), for logging.
    pub fn finish_reason(&self) -> Option<&str> {
        self.candidates.first()?.finish_reason.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serializes_in_camel_case() {
        let req = GenerateContentRequest::image_edit("QUJD".into(), "image/jpeg", "do it");
        let json = serde_json::to_value(&req).unwrap();

        let parts = &json["contents"][0]["parts"];
        assert_eq!(parts[0]["inlineData"]["mimeType"], "image/jpeg");
        assert_eq!(parts[0]["inlineData"]["data"], "QUJD");
        assert!(parts[0].get("text").is_none());
        assert_eq!(parts[1]["text"], "do it");
        assert_eq!(json["generationConfig"]["responseModalities"][0], "IMAGE");
    }

    #[test]
    fn first_image_skips_text_parts() {
        let json = serde_json::json!({
            "candidates": [{
                "content": {"parts": [
                    {"text": "Here is your image"},
                    {"inlineData": {"mimeType": "image/png", "data": "AAA="}},
                    {"inlineData": {"mimeType": "image/png", "data": "BBB="}}
                ]},
                "finishReason": "STOP"
            }]
        });
        let resp: GenerateContentResponse = serde_json::from_value(json).unwrap();
        assert_eq!(resp.first_image().unwrap().data, "AAA=");
        assert_eq!(resp.finish_reason(), Some("STOP"));
    }

    #[test]
    fn text_only_response_has_no_image() {
        let json = serde_json::json!({
            "candidates": [{"content": {"parts": [{"text": "I can't do that"}]}}]
        });
        let resp: GenerateContentResponse = serde_json::from_value(json).unwrap();
        assert!(resp.first_image().is_none());
    }

    #[test]
    fn empty_or_contentless_response_has_no_image() {
        let resp: GenerateContentResponse = serde_json::from_str("{}").unwrap();
        assert!(resp.first_image().is_none());

        let json = serde_json::json!({"candidates": [{"finishReason": "SAFETY"}]});
        let resp: GenerateContentResponse = serde_json::from_value(json).unwrap();
        assert!(resp.first_image().is_none());
        assert_eq!(resp.finish_reason(), Some("SAFETY"));
    }
}
