use crate::engine::Mode;
use crate::error::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Requests from the operator, applied at the start of the next cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorCommand {
    SetMode(Mode),
    Stop,
}

impl OperatorCommand {
    /// Map a key to its command, if it has one
    pub fn from_key(code: KeyCode) -> Option<Self> {
        match code {
            KeyCode::Char('e') | KeyCode::Char('E') => Some(OperatorCommand::SetMode(Mode::Entry)),
            KeyCode::Char('x') | KeyCode::Char('X') => Some(OperatorCommand::SetMode(Mode::Exit)),
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => Some(OperatorCommand::Stop),
            _ => None,
        }
    }
}

/// Keyboard input handler for switching the lane mode
pub struct KeyboardInputHandler {
    commands: UnboundedSender<OperatorCommand>,
    cancellation_token: CancellationToken,
}

impl KeyboardInputHandler {
    pub fn new(commands: UnboundedSender<OperatorCommand>) -> Self {
        Self {
            commands,
            cancellation_token: CancellationToken::new(),
        }
    }

    /// Start listening for keyboard input
    pub async fn start(&self) -> Result<()> {
        info!("Starting keyboard input handler - press e (entry), x (exit) or q (quit)");

        let commands = self.commands.clone();
        let cancellation_token = self.cancellation_token.clone();

        task::spawn_blocking(move || {
            if let Err(e) = enable_raw_mode() {
                error!("Failed to enable raw mode for keyboard input: {}", e);
                return;
            }

            debug!("Raw mode enabled - keyboard handler active");

            loop {
                if cancellation_token.is_cancelled() {
                    debug!("Keyboard input handler stopping");
                    break;
                }

                match event::poll(Duration::from_millis(100)) {
                    Ok(true) => {
                        let Ok(Event::Key(key_event)) = event::read() else {
                            continue;
                        };
                        // Only handle key press events (not release)
                        if key_event.kind != KeyEventKind::Press {
                            continue;
                        }

                        match OperatorCommand::from_key(key_event.code) {
                            Some(command) => {
                                info!("Operator command: {:?}", command);
                                if commands.send(command).is_err() {
                                    debug!("Command receiver dropped");
                                    break;
                                }
                                if command == OperatorCommand::Stop {
                                    break;
                                }
                            }
                            None => debug!("Key pressed: {:?}", key_event.code),
                        }
                    }
                    Ok(false) => {}
                    Err(e) => {
                        warn!("Error polling for keyboard events: {}", e);
                    }
                }
            }

            if let Err(e) = disable_raw_mode() {
                error!("Failed to disable raw mode: {}", e);
            } else {
                debug!("Raw mode disabled");
            }

            debug!("Keyboard input handler task exited");
        });

        Ok(())
    }

    /// Stop the keyboard input handler
    pub async fn stop(&self) -> Result<()> {
        info!("Stopping keyboard input handler");
        self.cancellation_token.cancel();

        // Give the task a moment to clean up and disable raw mode
        tokio::time::sleep(Duration::from_millis(200)).await;

        // Ensure raw mode is disabled even if the task didn't clean up properly
        let _ = disable_raw_mode();

        Ok(())
    }
}
