use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::SystemTime;

/// Encoding of a frame's payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrameFormat {
    /// PNG encoded image (grayscale from the camera pipeline)
    Png,
    /// JPEG encoded image
    Jpeg,
    /// Text already recognized upstream, stored as UTF-8
    Text,
}

impl FrameFormat {
    /// Check if the payload is an encoded image
    pub fn is_image(&self) -> bool {
        matches!(self, FrameFormat::Png | FrameFormat::Jpeg)
    }

    /// Guess the format from a file extension
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "png" => Some(FrameFormat::Png),
            "jpg" | "jpeg" => Some(FrameFormat::Jpeg),
            "txt" => Some(FrameFormat::Text),
            _ => None,
        }
    }
}

/// Frame data structure containing raw frame data and metadata
#[derive(Debug, Clone)]
pub struct Frame {
    /// Unique frame identifier
    pub id: u64,
    /// Timestamp when frame was captured
    pub timestamp: SystemTime,
    /// Frame payload (shared ownership for efficiency)
    pub data: Arc<Vec<u8>>,
    /// Frame width in pixels (0 when unknown)
    pub width: u32,
    /// Frame height in pixels (0 when unknown)
    pub height: u32,
    pub format: FrameFormat,
}

impl Frame {
    /// Create a new frame instance
    pub fn new(
        id: u64,
        timestamp: SystemTime,
        data: Vec<u8>,
        width: u32,
        height: u32,
        format: FrameFormat,
    ) -> Self {
        Self {
            id,
            timestamp,
            data: Arc::new(data),
            width,
            height,
            format,
        }
    }

    /// Create a text frame carrying pre-recognized OCR output
    pub fn text(id: u64, text: impl Into<String>) -> Self {
        Self::new(
            id,
            SystemTime::now(),
            text.into().into_bytes(),
            0,
            0,
            FrameFormat::Text,
        )
    }

    /// Get frame age in milliseconds
    pub fn age_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(self.timestamp)
            .unwrap_or_default()
            .as_millis() as u64
    }
}
