//! The transform capability and its two named operations.
//!
//! [`TransformProvider`] is the opaque capability: image bytes, a mime
//! type, and an instruction in; transformed image bytes out.
//! [`TransformClient`] binds the fixed instructions to it.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use studiostyle_core::job::OutputVariant;

use crate::error::ProviderError;
use crate::prompts;

/// An image-generation backend.
///
/// Implementations must not cache and must not retain the input bytes.
#[async_trait]
pub trait TransformProvider: Send + Sync {
    /// Transform `image` according to `instruction`, returning the first
    /// image the backend produced.
    async fn generate(
        &self,
        image: &[u8],
        mime_type: &str,
        instruction: &str,
    ) -> Result<Bytes, ProviderError>;
}

/// The named transforms a job runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transform {
    RemoveBackground,
    StudioWhiteBackground,
}

impl Transform {
    pub const ALL: [Transform; 2] = [Self::RemoveBackground, Self::StudioWhiteBackground];

    pub fn instruction(self) -> &'static str {
        match self {
            Self::RemoveBackground => prompts::REMOVE_BACKGROUND,
            Self::StudioWhiteBackground => prompts::STUDIO_WHITE_BACKGROUND,
        }
    }

    /// Which job output this transform fills.
    pub fn variant(self) -> OutputVariant {
        match self {
            Self::RemoveBackground => OutputVariant::Transparent,
            Self::StudioWhiteBackground => OutputVariant::WhiteBackground,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::RemoveBackground => "remove_background",
            Self::StudioWhiteBackground => "studio_white_background",
        }
    }
}

/// Cheaply cloneable handle exposing the two named operations.
#[derive(Clone)]
pub struct TransformClient {
    provider: Arc<dyn TransformProvider>,
}

impl TransformClient {
    pub fn new(provider: Arc<dyn TransformProvider>) -> Self {
        Self { provider }
    }

    /// Cut the subject out onto a transparent background.
    pub async fn remove_background(
        &self,
        image: &[u8],
        mime_type: &str,
    ) -> Result<Bytes, ProviderError> {
        self.run(Transform::RemoveBackground, image, mime_type).await
    }

    /// Place the subject on studio white with corrected lighting and a
    /// soft shadow.
    pub async fn add_studio_white_background(
        &self,
        image: &[u8],
        mime_type: &str,
    ) -> Result<Bytes, ProviderError> {
        self.run(Transform::StudioWhiteBackground, image, mime_type)
            .await
    }

    /// Run any named transform.
    pub async fn run(
        &self,
        transform: Transform,
        image: &[u8],
        mime_type: &str,
    ) -> Result<Bytes, ProviderError> {
        tracing::debug!(
            transform = transform.name(),
            mime_type,
            input_bytes = image.len(),
            "Calling transform provider",
        );
        let output = self
            .provider
            .generate(image, mime_type, transform.instruction())
            .await?;
        if output.is_empty() {
            return Err(ProviderError::NoImageReturned);
        }
        Ok(output)
    }
}
