//! Frame sources feeding the recognition loop.

#[cfg(all(feature = "camera", target_os = "linux"))]
mod camera;
mod directory;
mod transcript;

#[cfg(all(feature = "camera", target_os = "linux"))]
pub use camera::CameraSource;
pub use directory::DirectoryFrameSource;
pub use transcript::TranscriptSource;

use crate::config::CameraConfig;
use crate::error::{Result, SourceError};
use crate::frame::Frame;
use async_trait::async_trait;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// A producer of frames, read one at a time by the control loop
#[async_trait]
pub trait FrameSource: Send {
    /// Acquire the underlying device or files
    async fn open(&mut self) -> std::result::Result<(), SourceError>;

    /// The next frame, or `None` once the source is exhausted
    async fn next_frame(&mut self) -> std::result::Result<Option<Frame>, SourceError>;

    /// Release the underlying device or files. Safe to call more than once.
    async fn close(&mut self) -> std::result::Result<(), SourceError>;

    fn describe(&self) -> String;
}

/// Which frame source to run, as given on the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceSpec {
    Camera,
    Images(PathBuf),
    Transcript(PathBuf),
}

impl FromStr for SourceSpec {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s == "camera" {
            return Ok(SourceSpec::Camera);
        }
        match s.split_once(':') {
            Some(("images", path)) if !path.is_empty() => Ok(SourceSpec::Images(path.into())),
            Some(("transcript", path)) if !path.is_empty() => {
                Ok(SourceSpec::Transcript(path.into()))
            }
            _ => Err(format!(
                "invalid source '{}', expected camera, images:<dir> or transcript:<file>",
                s
            )),
        }
    }
}

impl fmt::Display for SourceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceSpec::Camera => f.write_str("camera"),
            SourceSpec::Images(path) => write!(f, "images:{}", path.display()),
            SourceSpec::Transcript(path) => write!(f, "transcript:{}", path.display()),
        }
    }
}

impl SourceSpec {
    /// Transcripts carry text that is already recognized
    pub fn is_pre_recognized(&self) -> bool {
        matches!(self, SourceSpec::Transcript(_))
    }

    /// Build the frame source this value names
    pub fn build(&self, camera: &CameraConfig) -> Result<Box<dyn FrameSource>> {
        match self {
            SourceSpec::Images(dir) => Ok(Box::new(DirectoryFrameSource::new(dir.clone()))),
            SourceSpec::Transcript(path) => Ok(Box::new(TranscriptSource::new(path.clone()))),
            SourceSpec::Camera => build_camera(camera),
        }
    }
}

#[cfg(all(feature = "camera", target_os = "linux"))]
fn build_camera(camera: &CameraConfig) -> Result<Box<dyn FrameSource>> {
    Ok(Box::new(CameraSource::new(camera.clone())))
}

#[cfg(not(all(feature = "camera", target_os = "linux")))]
fn build_camera(_camera: &CameraConfig) -> Result<Box<dyn FrameSource>> {
    Err(crate::error::PlatecamError::Source(SourceError::Open {
        source_name: "camera".to_string(),
        details: "built without the `camera` feature".to_string(),
    }))
}
