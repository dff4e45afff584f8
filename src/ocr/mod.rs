//! OCR engines that turn a frame into raw text.

mod passthrough;
mod tesseract;

pub use passthrough::PassthroughOcr;
pub use tesseract::TesseractOcr;

use crate::error::OcrError;
use crate::frame::Frame;
use async_trait::async_trait;

/// Characters a plate can contain
pub const PLATE_CHARSET: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Recognize text in `frame`, restricted to the characters in `whitelist`.
    ///
    /// The result may contain noise, several lines or nothing plate-like.
    async fn recognize(&self, frame: &Frame, whitelist: &str) -> Result<String, OcrError>;

    fn name(&self) -> &str;
}
