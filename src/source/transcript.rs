use super::FrameSource;
use crate::error::SourceError;
use crate::frame::Frame;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::PathBuf;
use tokio::fs;
use tracing::info;

/// Replays recorded OCR output, one line per frame.
///
/// Useful to reproduce a lane session without a camera or OCR engine.
pub struct TranscriptSource {
    /// `None` for in-memory transcripts
    path: Option<PathBuf>,
    lines: VecDeque<String>,
    next_id: u64,
    opened: bool,
}

impl TranscriptSource {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path: Some(path),
            lines: VecDeque::new(),
            next_id: 0,
            opened: false,
        }
    }

    /// Build a source from in-memory lines, already open
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            path: None,
            lines: lines.into_iter().map(Into::into).collect(),
            next_id: 0,
            opened: true,
        }
    }
}

#[async_trait]
impl FrameSource for TranscriptSource {
    async fn open(&mut self) -> Result<(), SourceError> {
        let Some(path) = &self.path else {
            self.opened = true;
            return Ok(());
        };

        let contents = fs::read_to_string(path)
            .await
            .map_err(|e| SourceError::Open {
                source_name: path.display().to_string(),
                details: e.to_string(),
            })?;

        self.lines = contents
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(str::to_string)
            .collect();
        self.opened = true;

        info!("Replaying {} transcript line(s) from {}", self.lines.len(), path.display());
        Ok(())
    }

    async fn next_frame(&mut self) -> Result<Option<Frame>, SourceError> {
        if !self.opened {
            return Err(SourceError::NotOpen);
        }

        Ok(self.lines.pop_front().map(|line| {
            let id = self.next_id;
            self.next_id += 1;
            Frame::text(id, line)
        }))
    }

    async fn close(&mut self) -> Result<(), SourceError> {
        self.lines.clear();
        self.opened = false;
        Ok(())
    }

    fn describe(&self) -> String {
        match &self.path {
            Some(path) => format!("transcript:{}", path.display()),
            None => "transcript:<memory>".to_string(),
        }
    }
}
