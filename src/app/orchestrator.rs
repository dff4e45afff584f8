use super::types::{Component, ComponentState, ShutdownReason};
use crate::config::PlatecamConfig;
use crate::engine::{EngineSettings, Mode, ReconciliationEngine};
use crate::error::{PlatecamError, Result};
use crate::keyboard_input::{KeyboardInputHandler, OperatorCommand};
use crate::log_store::{CsvLogStore, LogStore};
use crate::occupancy::Occupancy;
use crate::ocr::{OcrEngine, TesseractOcr};
use crate::plate::PlateFormat;
use crate::sinks::{
    AlertSink, DisplaySink, LogDisplay, NullAlert, TerminalBellAlert, TerminalDashboard,
};
use crate::source::FrameSource;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::Mutex;
use tracing::debug;

/// Main application coordinator: owns the lane mode, the engine and every
/// collaborator, and runs the capture-recognize-reconcile loop.
pub struct PlatecamOrchestrator {
    pub(super) config: PlatecamConfig,
    pub(super) mode: Mode,
    pub(super) engine: ReconciliationEngine<dyn LogStore>,
    pub(super) plate_format: PlateFormat,

    // Components
    pub(super) source: Box<dyn FrameSource>,
    pub(super) ocr: Arc<dyn OcrEngine>,
    pub(super) alert: Arc<dyn AlertSink>,
    pub(super) display: Box<dyn DisplaySink>,
    pub(super) keyboard_handler: Option<KeyboardInputHandler>,

    // Loop state
    pub(super) occupancy: Occupancy,
    pub(super) last_event: Option<String>,
    pub(super) cycles: u64,

    // Lifecycle management
    pub(super) component_states: Arc<Mutex<BTreeMap<Component, ComponentState>>>,
    pub(super) command_sender: UnboundedSender<OperatorCommand>,
    pub(super) command_receiver: UnboundedReceiver<OperatorCommand>,
    pub(super) shutdown_sender: UnboundedSender<ShutdownReason>,
    pub(super) shutdown_receiver: UnboundedReceiver<ShutdownReason>,
}

impl PlatecamOrchestrator {
    pub fn builder(config: PlatecamConfig) -> PlatecamOrchestratorBuilder {
        PlatecamOrchestratorBuilder::new(config)
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn occupancy(&self) -> Occupancy {
        self.occupancy
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn config(&self) -> &PlatecamConfig {
        &self.config
    }

    /// Sender for operator commands, applied at the start of the next cycle
    pub fn command_sender(&self) -> UnboundedSender<OperatorCommand> {
        self.command_sender.clone()
    }

    /// Sender that stops the loop at the next cycle boundary
    pub fn shutdown_sender(&self) -> UnboundedSender<ShutdownReason> {
        self.shutdown_sender.clone()
    }
}

/// Builder for [`PlatecamOrchestrator`].
///
/// Only the frame source is required. The log store, OCR engine and sinks
/// default to what the configuration asks for.
pub struct PlatecamOrchestratorBuilder {
    config: PlatecamConfig,
    mode: Option<Mode>,
    source: Option<Box<dyn FrameSource>>,
    ocr: Option<Arc<dyn OcrEngine>>,
    store: Option<Arc<dyn LogStore>>,
    alert: Option<Arc<dyn AlertSink>>,
    display: Option<Box<dyn DisplaySink>>,
    keyboard_enabled: bool,
}

impl PlatecamOrchestratorBuilder {
    pub fn new(config: PlatecamConfig) -> Self {
        let keyboard_enabled = config.keyboard.enabled;
        Self {
            config,
            mode: None,
            source: None,
            ocr: None,
            store: None,
            alert: None,
            display: None,
            keyboard_enabled,
        }
    }

    /// Start in this mode instead of `parking.initial_mode`
    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn with_source(mut self, source: Box<dyn FrameSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_ocr(mut self, ocr: Arc<dyn OcrEngine>) -> Self {
        self.ocr = Some(ocr);
        self
    }

    pub fn with_store(mut self, store: Arc<dyn LogStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_alert(mut self, alert: Arc<dyn AlertSink>) -> Self {
        self.alert = Some(alert);
        self
    }

    pub fn with_display(mut self, display: Box<dyn DisplaySink>) -> Self {
        self.display = Some(display);
        self
    }

    pub fn with_keyboard(mut self, enabled: bool) -> Self {
        self.keyboard_enabled = enabled;
        self
    }

    pub fn build(self) -> Result<PlatecamOrchestrator> {
        let config = self.config;
        let plate_format = config.plate_format()?;

        let source = self
            .source
            .ok_or_else(|| PlatecamError::component("orchestrator", "no frame source configured"))?;

        let store: Arc<dyn LogStore> = match self.store {
            Some(store) => store,
            None => Arc::new(CsvLogStore::from_config(&config.log)?),
        };

        let ocr: Arc<dyn OcrEngine> = self
            .ocr
            .unwrap_or_else(|| Arc::new(TesseractOcr::new(&config.ocr)));

        let alert: Arc<dyn AlertSink> = match self.alert {
            Some(alert) => alert,
            None if config.alert.enabled => Arc::new(TerminalBellAlert),
            None => Arc::new(NullAlert),
        };

        let display: Box<dyn DisplaySink> = match self.display {
            Some(display) => display,
            None if config.display.enabled => Box::new(TerminalDashboard::new()),
            None => Box::new(LogDisplay),
        };

        let (command_sender, command_receiver) = mpsc::unbounded_channel();
        let (shutdown_sender, shutdown_receiver) = mpsc::unbounded_channel();

        let keyboard_handler = self
            .keyboard_enabled
            .then(|| KeyboardInputHandler::new(command_sender.clone()));

        let settings = EngineSettings::from_config(&config.parking);
        let occupancy = Occupancy::compute(0, 0, settings.total_slots);
        let engine = ReconciliationEngine::new(store, settings);
        let mode = self.mode.unwrap_or(config.parking.initial_mode);

        debug!(
            "Orchestrator built: source={}, ocr={}, mode={}",
            source.describe(),
            ocr.name(),
            mode
        );

        Ok(PlatecamOrchestrator {
            config,
            mode,
            engine,
            plate_format,
            source,
            ocr,
            alert,
            display,
            keyboard_handler,
            occupancy,
            last_event: None,
            cycles: 0,
            component_states: Arc::new(Mutex::new(BTreeMap::new())),
            command_sender,
            command_receiver,
            shutdown_sender,
            shutdown_receiver,
        })
    }
}
