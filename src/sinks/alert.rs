use crate::config::{AlertConfig, Tone};
use crate::events::AlertKind;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;
use std::io::Write;
use tracing::{debug, info, warn};

/// A tone to play for one alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AlertDirective {
    pub kind: AlertKind,
    pub frequency_hz: u32,
    pub duration_ms: u32,
}

impl AlertDirective {
    /// Pick the configured tone for an alert kind
    pub fn for_kind(config: &AlertConfig, kind: AlertKind) -> Self {
        let tone: &Tone = match kind {
            AlertKind::Entry => &config.entry,
            AlertKind::Exit => &config.exit,
            AlertKind::Fishy => &config.fishy,
            AlertKind::StorageFault => &config.fault,
        };
        Self {
            kind,
            frequency_hz: tone.frequency_hz,
            duration_ms: tone.duration_ms,
        }
    }
}

#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn alert(&self, directive: &AlertDirective);
}

/// Rings the terminal bell once per alert.
///
/// Terminals cannot vary pitch, so the tone only reaches the log.
#[derive(Debug, Default)]
pub struct TerminalBellAlert;

#[async_trait]
impl AlertSink for TerminalBellAlert {
    async fn alert(&self, directive: &AlertDirective) {
        info!(
            kind = ?directive.kind,
            frequency_hz = directive.frequency_hz,
            duration_ms = directive.duration_ms,
            "Alert"
        );

        let mut stdout = std::io::stdout();
        if let Err(e) = stdout.write_all(b"\x07").and_then(|_| stdout.flush()) {
            warn!("Failed to ring terminal bell: {}", e);
        }
    }
}

/// Discards every alert
#[derive(Debug, Default)]
pub struct NullAlert;

#[async_trait]
impl AlertSink for NullAlert {
    async fn alert(&self, directive: &AlertDirective) {
        debug!("Alert suppressed: {:?}", directive.kind);
    }
}

/// Keeps every directive it receives, for replay checks and tests
#[derive(Debug, Default)]
pub struct RecordingAlert {
    directives: Mutex<Vec<AlertDirective>>,
}

impl RecordingAlert {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn directives(&self) -> Vec<AlertDirective> {
        self.directives.lock().clone()
    }

    pub fn kinds(&self) -> Vec<AlertKind> {
        self.directives.lock().iter().map(|d| d.kind).collect()
    }
}

#[async_trait]
impl AlertSink for RecordingAlert {
    async fn alert(&self, directive: &AlertDirective) {
        self.directives.lock().push(*directive);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlatecamConfig;

    #[test]
    fn test_default_tones() {
        let config = PlatecamConfig::default().alert;

        let entry = AlertDirective::for_kind(&config, AlertKind::Entry);
        assert_eq!((entry.frequency_hz, entry.duration_ms), (1000, 200));

        let exit = AlertDirective::for_kind(&config, AlertKind::Exit);
        assert_eq!((exit.frequency_hz, exit.duration_ms), (800, 200));

        let fishy = AlertDirective::for_kind(&config, AlertKind::Fishy);
        assert_eq!((fishy.frequency_hz, fishy.duration_ms), (600, 500));

        let fault = AlertDirective::for_kind(&config, AlertKind::StorageFault);
        assert_eq!((fault.frequency_hz, fault.duration_ms), (400, 800));
    }

    #[tokio::test]
    async fn test_recording_alert_keeps_order() {
        let config = PlatecamConfig::default().alert;
        let sink = RecordingAlert::new();

        sink.alert(&AlertDirective::for_kind(&config, AlertKind::Exit)).await;
        sink.alert(&AlertDirective::for_kind(&config, AlertKind::Fishy)).await;

        assert_eq!(sink.kinds(), vec![AlertKind::Exit, AlertKind::Fishy]);
        assert_eq!(sink.directives()[1].duration_ms, 500);
    }
}
