pub mod app;
pub mod config;
pub mod debounce;
pub mod engine;
pub mod error;
pub mod events;
pub mod frame;
pub mod keyboard_input;
pub mod log_store;
pub mod occupancy;
pub mod ocr;
pub mod plate;
pub mod sinks;
pub mod source;

pub use app::{Component, ComponentState, PlatecamOrchestrator, PlatecamOrchestratorBuilder, ShutdownReason};
pub use config::PlatecamConfig;
pub use engine::{CycleReport, Decision, EngineSettings, IgnoreReason, Mode, ReconciliationEngine};
pub use error::{OcrError, PlatecamError, Result, SourceError, StorageError};
pub use events::{AlertKind, EngineEvent};
pub use frame::{Frame, FrameFormat};
pub use keyboard_input::{KeyboardInputHandler, OperatorCommand};
pub use log_store::{CsvLogStore, LogCategory, LogStore, MemoryLogStore, PlateRecord};
pub use occupancy::Occupancy;
pub use ocr::{OcrEngine, PassthroughOcr, TesseractOcr, PLATE_CHARSET};
pub use plate::{PlateFormat, PlateNumber};
pub use source::{DirectoryFrameSource, FrameSource, SourceSpec, TranscriptSource};
