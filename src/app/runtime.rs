use super::{PlatecamOrchestrator, ShutdownReason};
use crate::error::Result;
use crate::events::AlertKind;
use crate::keyboard_input::OperatorCommand;
use crate::sinks::{AlertDirective, DisplayStatus};
use chrono::Utc;
use std::time::Duration;
use tokio::signal;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, error, info, warn};

impl PlatecamOrchestrator {
    /// Start components, run cycles until something asks to stop, then shut
    /// down. Shutdown runs on every path out of the loop.
    pub async fn run(&mut self) -> Result<i32> {
        self.setup_signal_handlers(self.shutdown_sender.clone());

        let reason = match self.start().await {
            Ok(()) => {
                info!("Platecam is running");
                self.run_cycles().await
            }
            Err(e) => ShutdownReason::Error(e.to_string()),
        };

        info!("Shutdown initiated: {:?}", reason);
        let exit_code = self.shutdown(&reason).await;

        info!("Platecam shutdown complete after {} cycle(s)", self.cycles);
        Ok(exit_code)
    }

    /// Run cycles back to back until a stop request or the source runs dry
    pub(super) async fn run_cycles(&mut self) -> ShutdownReason {
        let interval = Duration::from_millis(self.config.parking.cycle_interval_ms);

        loop {
            if let Some(reason) = self.step().await {
                return reason;
            }

            if !interval.is_zero() {
                tokio::select! {
                    Some(reason) = self.shutdown_receiver.recv() => return reason,
                    _ = tokio::time::sleep(interval) => {}
                }
            }
        }
    }

    /// Apply pending commands and run one cycle.
    ///
    /// Returns the reason to stop, if any.
    pub async fn step(&mut self) -> Option<ShutdownReason> {
        if let Ok(reason) = self.shutdown_receiver.try_recv() {
            return Some(reason);
        }
        if let Some(reason) = self.apply_commands() {
            return Some(reason);
        }

        match self.run_cycle().await {
            Ok(true) => None,
            Ok(false) => Some(ShutdownReason::SourceExhausted),
            Err(e) => {
                error!("Frame source failed: {}", e);
                Some(ShutdownReason::Error(e.to_string()))
            }
        }
    }

    /// Drain operator commands without waiting for new ones
    fn apply_commands(&mut self) -> Option<ShutdownReason> {
        while let Ok(command) = self.command_receiver.try_recv() {
            match command {
                OperatorCommand::SetMode(mode) => {
                    if mode != self.mode {
                        info!("Mode switched from {} to {}", self.mode, mode);
                        self.mode = mode;
                    }
                }
                OperatorCommand::Stop => return Some(ShutdownReason::Operator),
            }
        }
        None
    }

    /// One capture, recognize and reconcile pass.
    ///
    /// Returns `Ok(false)` once the source is exhausted.
    async fn run_cycle(&mut self) -> Result<bool> {
        let Some(frame) = self.source.next_frame().await? else {
            return Ok(false);
        };
        self.cycles += 1;

        let text = match self
            .ocr
            .recognize(&frame, &self.config.ocr.whitelist)
            .await
        {
            Ok(text) => text,
            Err(e) => {
                warn!("OCR failed on frame {}: {}", frame.id, e);
                String::new()
            }
        };

        let candidates = self.plate_format.extract(&text);
        if !candidates.is_empty() {
            debug!("Frame {} candidates: {:?}", frame.id, candidates);
        }

        match self
            .engine
            .process_cycle(self.mode, &candidates, Utc::now())
            .await
        {
            Ok(report) => {
                for event in &report.events {
                    self.dispatch_alert(event.alert_kind()).await;
                    self.last_event = Some(event.description());
                }
                self.occupancy = report.occupancy;
            }
            Err(e) => {
                error!("Plate logs unreadable, nothing recorded this cycle: {}", e);
                self.dispatch_alert(AlertKind::StorageFault).await;
                self.last_event = Some(format!("Storage unavailable: {}", e));
            }
        }

        let status = DisplayStatus {
            mode: self.mode,
            occupancy: self.occupancy,
            last_event: self.last_event.clone(),
            frame_id: frame.id,
        };
        self.display.render(&status, &frame).await;

        Ok(true)
    }

    async fn dispatch_alert(&self, kind: AlertKind) {
        let directive = AlertDirective::for_kind(&self.config.alert, kind);
        self.alert.alert(&directive).await;
    }

    /// Set up signal handlers for graceful shutdown
    fn setup_signal_handlers(&self, shutdown_sender: UnboundedSender<ShutdownReason>) {
        // Handle SIGTERM (systemd stop) - Unix only
        #[cfg(unix)]
        {
            let shutdown_sender_sigterm = shutdown_sender.clone();
            tokio::spawn(async move {
                let mut sigterm = match signal::unix::signal(signal::unix::SignalKind::terminate())
                {
                    Ok(sigterm) => sigterm,
                    Err(e) => {
                        warn!("Failed to register SIGTERM handler: {}", e);
                        return;
                    }
                };
                if sigterm.recv().await.is_some() {
                    info!("Received SIGTERM signal");
                    let _ = shutdown_sender_sigterm.send(ShutdownReason::Signal("SIGTERM".to_string()));
                }
            });
        }

        // Handle SIGINT (Ctrl+C) - Cross-platform
        tokio::spawn(async move {
            if let Ok(()) = signal::ctrl_c().await {
                info!("Received SIGINT signal (Ctrl+C)");
                let _ = shutdown_sender.send(ShutdownReason::Signal("SIGINT".to_string()));
            }
        });
    }
}
