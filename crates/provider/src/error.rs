/// Errors from a transform provider call.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout, etc.).
    #[error("Provider request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The provider returned a non-2xx status code.
    #[error("Provider API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// A well-formed response carried no image payload.
    #[error("No image data found in provider response")]
    NoImageReturned,

    /// The image payload could not be decoded.
    #[error("Malformed image payload: {0}")]
    Decode(String),

    /// Any other provider-side failure (used by non-HTTP providers).
    #[error("Provider error: {0}")]
    Other(String),
}
