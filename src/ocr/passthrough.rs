use super::OcrEngine;
use crate::error::OcrError;
use crate::frame::{Frame, FrameFormat};
use async_trait::async_trait;
use tracing::trace;

/// Reads text frames back verbatim; image frames yield no text
#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughOcr;

#[async_trait]
impl OcrEngine for PassthroughOcr {
    async fn recognize(&self, frame: &Frame, whitelist: &str) -> Result<String, OcrError> {
        if frame.format != FrameFormat::Text {
            trace!("Passthrough OCR ignoring {:?} frame {}", frame.format, frame.id);
            return Ok(String::new());
        }

        // Whitelisting is applied like a real engine would, keeping line breaks
        let text = String::from_utf8_lossy(&frame.data)
            .chars()
            .filter(|c| c.is_whitespace() || whitelist.contains(c.to_ascii_uppercase()))
            .collect();
        Ok(text)
    }

    fn name(&self) -> &str {
        "passthrough"
    }
}
