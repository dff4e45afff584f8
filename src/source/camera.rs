use super::FrameSource;
use crate::config::CameraConfig;
use crate::error::SourceError;
use crate::frame::{Frame, FrameFormat};
use async_trait::async_trait;
use gstreamer::prelude::*;
use gstreamer::Pipeline;
use gstreamer_app::AppSink;
use std::time::SystemTime;
use tracing::{debug, info, trace, warn};

/// Seconds to wait for each sample
const SAMPLE_TIMEOUT_SECONDS: u64 = 5;

/// Consecutive empty waits before the camera is treated as failed
const MAX_STALLED_PULLS: u32 = 3;

/// GStreamer camera delivering grayscale PNG frames sized for OCR
pub struct CameraSource {
    config: CameraConfig,
    pipeline: Option<Pipeline>,
    appsink: Option<AppSink>,
    next_id: u64,
    stalled: u32,
}

impl CameraSource {
    pub fn new(config: CameraConfig) -> Self {
        Self {
            config,
            pipeline: None,
            appsink: None,
            next_id: 0,
            stalled: 0,
        }
    }

    /// Build GStreamer pipeline string for grayscale PNG capture
    fn build_pipeline_string(&self) -> String {
        let (width, height) = self.config.resolution;
        format!(
            "v4l2src device=/dev/video{} ! \
             videoconvert ! videoscale ! videorate ! \
             video/x-raw,format=GRAY8,width={},height={},framerate={}/1 ! \
             pngenc ! \
             appsink name=sink sync=false max-buffers=1 drop=true emit-signals=false",
            self.config.index, width, height, self.config.fps
        )
    }

    /// Count a wait that produced no sample; fails once the camera has stalled too long
    fn note_stall(&mut self) -> Result<(), SourceError> {
        self.stalled += 1;
        if self.stalled >= MAX_STALLED_PULLS {
            return Err(SourceError::Read {
                details: format!(
                    "no frame within {}s, {} times in a row",
                    SAMPLE_TIMEOUT_SECONDS, self.stalled
                ),
            });
        }

        warn!(
            "No camera frame within {}s, retrying ({}/{})",
            SAMPLE_TIMEOUT_SECONDS, self.stalled, MAX_STALLED_PULLS
        );
        Ok(())
    }

    fn open_error(&self, details: impl std::fmt::Display) -> SourceError {
        SourceError::Open {
            source_name: format!("/dev/video{}", self.config.index),
            details: details.to_string(),
        }
    }
}

#[async_trait]
impl FrameSource for CameraSource {
    async fn open(&mut self) -> Result<(), SourceError> {
        gstreamer::init().map_err(|e| self.open_error(format!("Failed to initialize GStreamer: {}", e)))?;

        let pipeline_desc = self.build_pipeline_string();
        info!("Creating GStreamer pipeline: {}", pipeline_desc);

        let pipeline = gstreamer::parse::launch(&pipeline_desc)
            .map_err(|e| self.open_error(format!("Failed to create pipeline: {}", e)))?
            .downcast::<Pipeline>()
            .map_err(|_| self.open_error("Failed to downcast to Pipeline"))?;

        let appsink = pipeline
            .by_name("sink")
            .ok_or_else(|| self.open_error("Pipeline has no appsink"))?
            .downcast::<AppSink>()
            .map_err(|_| self.open_error("Failed to downcast to AppSink"))?;

        pipeline
            .set_state(gstreamer::State::Playing)
            .map_err(|e| self.open_error(format!("Failed to start pipeline: {}", e)))?;

        info!("GStreamer pipeline started successfully");
        self.pipeline = Some(pipeline);
        self.appsink = Some(appsink);
        self.stalled = 0;
        Ok(())
    }

    async fn next_frame(&mut self) -> Result<Option<Frame>, SourceError> {
        let appsink = self.appsink.clone().ok_or(SourceError::NotOpen)?;

        let sample = loop {
            let pull_sink = appsink.clone();
            let pulled = tokio::task::spawn_blocking(move || {
                let sample = pull_sink.try_pull_sample(gstreamer::ClockTime::from_seconds(
                    SAMPLE_TIMEOUT_SECONDS,
                ));
                (sample, pull_sink.is_eos())
            })
            .await
            .map_err(|e| SourceError::Read {
                details: format!("Capture task failed: {}", e),
            })?;

            match pulled {
                (Some(sample), _) => {
                    self.stalled = 0;
                    break sample;
                }
                (None, true) => {
                    info!("Camera stream reached end of stream");
                    return Ok(None);
                }
                (None, false) => self.note_stall()?,
            }
        };

        let buffer = sample.buffer().ok_or_else(|| SourceError::Read {
            details: "No buffer in sample".to_string(),
        })?;
        let map = buffer.map_readable().map_err(|e| SourceError::Read {
            details: format!("Failed to map buffer: {}", e),
        })?;

        let id = self.next_id;
        self.next_id += 1;
        let (width, height) = self.config.resolution;

        trace!("Captured PNG frame {} ({}x{}, {} bytes)", id, width, height, map.len());

        Ok(Some(Frame::new(
            id,
            SystemTime::now(),
            map.as_slice().to_vec(),
            width,
            height,
            FrameFormat::Png,
        )))
    }

    async fn close(&mut self) -> Result<(), SourceError> {
        self.appsink = None;
        if let Some(pipeline) = self.pipeline.take() {
            let _ = pipeline.set_state(gstreamer::State::Null);
            debug!("GStreamer pipeline stopped");
        }
        Ok(())
    }

    fn describe(&self) -> String {
        format!("camera:/dev/video{}", self.config.index)
    }
}

impl Drop for CameraSource {
    fn drop(&mut self) {
        if let Some(pipeline) = self.pipeline.take() {
            let _ = pipeline.set_state(gstreamer::State::Null);
        }
    }
}
