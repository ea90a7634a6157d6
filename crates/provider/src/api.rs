//! REST client for the Gemini `generateContent` endpoint.
//!
//! Wraps the HTTP API using [`reqwest`] and implements
//! [`TransformProvider`] on top of it.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;

use crate::client::TransformProvider;
use crate::config::ProviderConfig;
use crate::error::ProviderError;
use crate::messages::{GenerateContentRequest, GenerateContentResponse};

/// Header carrying the API key.
const API_KEY_HEADER: &str = "x-goog-api-key";

/// HTTP client for the Gemini image model.
pub struct GeminiApi {
    client: reqwest::Client,
    config: ProviderConfig,
}

impl GeminiApi {
    /// Create a client, applying the configured request timeout.
    pub fn new(config: ProviderConfig) -> Result<Self, ProviderError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            config,
        })
    }

    /// Create a client reusing an existing [`reqwest::Client`]
    /// (useful for connection pooling).
    pub fn with_client(client: reqwest::Client, config: ProviderConfig) -> Self {
        Self { client, config }
    }

    /// Send one `generateContent` request and return the parsed body.
    pub async fn generate_content(
        &self,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, ProviderError> {
        let response = self
            .client
            .post(self.config.generate_url())
            .header(API_KEY_HEADER, &self.config.api_key)
            .json(request)
            .send()
            .await?;

        let response = Self::ensure_success(response).await?;
        Ok(response.json::<GenerateContentResponse>().await?)
    }

    // ---- private helpers ----

    /// Ensure the response has a success status code, or turn it into a
    /// [`ProviderError::Api`] carrying the status and body text.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, ProviderError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ProviderError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

/// Decode the first image payload of a response.
pub fn extract_image(response: &GenerateContentResponse) -> Result<Bytes, ProviderError> {
    let inline = response.first_image().ok_or(ProviderError::NoImageReturned)?;
    let decoded = STANDARD
        .decode(inline.data.trim())
        .map_err(|e| ProviderError::Decode(e.to_string()))?;
    if decoded.is_empty() {
        return Err(ProviderError::NoImageReturned);
    }
    Ok(Bytes::from(decoded))
}

#[async_trait]
impl TransformProvider for GeminiApi {
    async fn generate(
        &self,
        image: &[u8],
        mime_type: &str,
        instruction: &str,
    ) -> Result<Bytes, ProviderError> {
        let request =
            GenerateContentRequest::image_edit(STANDARD.encode(image), mime_type, instruction);

        let response = self.generate_content(&request).await.map_err(|e| {
            tracing::error!(model = %self.config.model, error = %e, "Gemini request failed");
            e
        })?;

        extract_image(&response).map_err(|e| {
            tracing::warn!(
                model = %self.config.model,
                finish_reason = response.finish_reason().unwrap_or("unknown"),
                error = %e,
                "Gemini response carried no usable image",
            );
            e
        })
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn response(json: serde_json::Value) -> GenerateContentResponse {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn extracts_first_inline_image() {
        let resp = response(serde_json::json!({
            "candidates": [{"content": {"parts": [
                {"inlineData": {"mimeType": "image/png", "data": STANDARD.encode(b"png-bytes")}}
            ]}}]
        }));
        assert_eq!(&extract_image(&resp).unwrap()[..], b"png-bytes");
    }

    #[test]
    fn missing_image_is_no_image_returned() {
        let resp = response(serde_json::json!({
            "candidates": [{"content": {"parts": [{"text": "sorry"}]}}]
        }));
        assert_matches!(extract_image(&resp), Err(ProviderError::NoImageReturned));
    }

    #[test]
    fn empty_payload_is_no_image_returned() {
        let resp = response(serde_json::json!({
            "candidates": [{"content": {"parts": [
                {"inlineData": {"mimeType": "image/png", "data": ""}}
            ]}}]
        }));
        assert_matches!(extract_image(&resp), Err(ProviderError::NoImageReturned));
    }

    #[test]
    fn invalid_base64_is_decode_error() {
        let resp = response(serde_json::json!({
            "candidates": [{"content": {"parts": [
                {"inlineData": {"mimeType": "image/png", "data": "!!not base64!!"}}
            ]}}]
        }));
        assert_matches!(extract_image(&resp), Err(ProviderError::Decode(_)));
    }

    #[tokio::test]
    async fn unreachable_host_is_request_error() {
        let mut config = ProviderConfig::new("k");
        config.api_url = "http://127.0.0.1:9".to_string();
        let api = GeminiApi::new(config).unwrap();

        let result = api.generate(b"img", "image/png", "x").await;
        assert_matches!(result, Err(ProviderError::Request(_)));
    }
}
