//! Stand-in image model for dev and tests.

use std::time::Duration;

use async_trait::async_trait;

use renolens_generation::{GeneratedImage, ImageModel, JobInput, ModelError};

// Smallest valid PNG: 1x1 transparent pixel.
const PLACEHOLDER_PNG: &[u8] = &[
    0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0x00, 0x00, 0x0d, 0x49, 0x48, 0x44,
    0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1f,
    0x15, 0xc4, 0x89, 0x00, 0x00, 0x00, 0x0d, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9c, 0x62, 0x00,
    0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0d, 0x0a, 0x2d, 0xb4, 0x00, 0x00, 0x00, 0x00, 0x49,
    0x45, 0x4e, 0x44, 0xae, 0x42, 0x60, 0x82,
];

/// Image model that returns a fixed image after an optional simulated
/// latency. Lets the whole pipeline run without a provider key.
pub struct CannedImageModel {
    bytes: Vec<u8>,
    mime: String,
    latency: Option<Duration>,
}

impl CannedImageModel {
    pub fn new() -> Self {
        Self {
            bytes: PLACEHOLDER_PNG.to_vec(),
            mime: "image/png".to_string(),
            latency: None,
        }
    }

    pub fn with_output(bytes: Vec<u8>, mime: impl Into<String>) -> Self {
        Self {
            bytes,
            mime: mime.into(),
            latency: None,
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }
}

impl Default for CannedImageModel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImageModel for CannedImageModel {
    async fn invoke(&self, _input: JobInput) -> Result<GeneratedImage, ModelError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        Ok(GeneratedImage {
            bytes: self.bytes.clone(),
            mime: self.mime.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_placeholder_png() {
        let model = CannedImageModel::new();
        let image = model
            .invoke(JobInput {
                image_data: vec![1, 2, 3],
                mime_type: "image/jpeg".to_string(),
                prompt: "modern kitchen".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(image.mime, "image/png");
        assert_eq!(&image.bytes[..4], &[0x89, b'P', b'N', b'G']);
    }
}
