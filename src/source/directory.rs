use super::FrameSource;
use crate::error::SourceError;
use crate::frame::{Frame, FrameFormat};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::time::SystemTime;
use tokio::fs;
use tracing::{debug, info};

/// Replays still images from a directory in file name order
pub struct DirectoryFrameSource {
    directory: PathBuf,
    pending: VecDeque<(PathBuf, FrameFormat)>,
    next_id: u64,
    opened: bool,
}

impl DirectoryFrameSource {
    pub fn new(directory: PathBuf) -> Self {
        Self {
            directory,
            pending: VecDeque::new(),
            next_id: 0,
            opened: false,
        }
    }

    pub fn remaining(&self) -> usize {
        self.pending.len()
    }
}

#[async_trait]
impl FrameSource for DirectoryFrameSource {
    async fn open(&mut self) -> Result<(), SourceError> {
        let open_error = |e: std::io::Error| SourceError::Open {
            source_name: self.directory.display().to_string(),
            details: e.to_string(),
        };

        let mut entries = fs::read_dir(&self.directory).await.map_err(open_error)?;
        let mut images = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(open_error)? {
            let path = entry.path();
            let format = path
                .extension()
                .and_then(|ext| ext.to_str())
                .and_then(FrameFormat::from_extension)
                .filter(FrameFormat::is_image);
            if let Some(format) = format {
                images.push((path, format));
            }
        }
        images.sort_by(|a, b| a.0.cmp(&b.0));

        info!(
            "Replaying {} image(s) from {}",
            images.len(),
            self.directory.display()
        );
        self.pending = images.into();
        self.opened = true;
        Ok(())
    }

    async fn next_frame(&mut self) -> Result<Option<Frame>, SourceError> {
        if !self.opened {
            return Err(SourceError::NotOpen);
        }

        let Some((path, format)) = self.pending.pop_front() else {
            return Ok(None);
        };

        let data = fs::read(&path).await.map_err(|e| SourceError::Read {
            details: format!("{}: {}", path.display(), e),
        })?;

        let id = self.next_id;
        self.next_id += 1;
        debug!("Read frame {} from {} ({} bytes)", id, path.display(), data.len());

        Ok(Some(Frame::new(id, SystemTime::now(), data, 0, 0, format)))
    }

    async fn close(&mut self) -> Result<(), SourceError> {
        self.pending.clear();
        self.opened = false;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("images:{}", self.directory.display())
    }
}
