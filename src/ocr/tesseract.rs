use super::OcrEngine;
use crate::config::OcrConfig;
use crate::error::OcrError;
use crate::frame::Frame;
use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, trace};

/// OCR through the `tesseract` command line tool.
///
/// Each frame is piped to `tesseract stdin stdout` as an encoded image.
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    command: String,
    page_segmentation_mode: u32,
}

impl TesseractOcr {
    pub fn new(config: &OcrConfig) -> Self {
        Self {
            command: config.command.clone(),
            page_segmentation_mode: config.page_segmentation_mode,
        }
    }

    fn arguments(&self, whitelist: &str) -> Vec<String> {
        vec![
            "stdin".to_string(),
            "stdout".to_string(),
            "--psm".to_string(),
            self.page_segmentation_mode.to_string(),
            "-c".to_string(),
            format!("tessedit_char_whitelist={}", whitelist),
        ]
    }
}

#[async_trait]
impl OcrEngine for TesseractOcr {
    async fn recognize(&self, frame: &Frame, whitelist: &str) -> Result<String, OcrError> {
        if !frame.format.is_image() {
            trace!("Tesseract skipping non-image frame {}", frame.id);
            return Ok(String::new());
        }

        let mut child = Command::new(&self.command)
            .args(self.arguments(whitelist))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| OcrError::Spawn {
                command: self.command.clone(),
                details: e.to_string(),
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(&frame.data).await?;
            // Closing stdin tells tesseract the image is complete
            drop(stdin);
        }

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            return Err(OcrError::Failed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        debug!("Tesseract read {} byte(s) of text from frame {}", text.len(), frame.id);
        Ok(text)
    }

    fn name(&self) -> &str {
        "tesseract"
    }
}
