use crate::engine::Mode;
use crate::frame::Frame;
use crate::occupancy::Occupancy;
use async_trait::async_trait;
use crossterm::{
    cursor::{Hide, MoveTo, Show},
    execute, queue,
    style::Print,
    terminal::{Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen},
};
use parking_lot::Mutex;
use std::io::{self, Write};
use tracing::{debug, warn};

/// What the operator sees after each cycle
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayStatus {
    pub mode: Mode,
    pub occupancy: Occupancy,
    pub last_event: Option<String>,
    pub frame_id: u64,
}

impl DisplayStatus {
    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![
            format!("Mode: {}", self.mode),
            format!("Occupied: {}", self.occupancy.occupied),
            format!("Vacant: {}", self.occupancy.vacant),
        ];
        if let Some(event) = &self.last_event {
            lines.push(event.clone());
        }
        lines
    }
}

#[async_trait]
pub trait DisplaySink: Send {
    async fn render(&mut self, status: &DisplayStatus, frame: &Frame);

    async fn close(&mut self);
}

/// Redraws a status block on the alternate screen
pub struct TerminalDashboard {
    active: bool,
}

impl TerminalDashboard {
    pub fn new() -> Self {
        Self { active: false }
    }

    fn draw(&mut self, status: &DisplayStatus, frame: &Frame) -> io::Result<()> {
        let mut stdout = io::stdout();

        if !self.active {
            execute!(stdout, EnterAlternateScreen, Hide)?;
            self.active = true;
        }

        queue!(stdout, MoveTo(0, 0), Clear(ClearType::All))?;
        queue!(
            stdout,
            MoveTo(0, 0),
            Print(format!(
                "platecam  frame {}  ({} ms old)",
                status.frame_id,
                frame.age_ms()
            ))
        )?;
        for (row, line) in status.lines().iter().enumerate() {
            queue!(stdout, MoveTo(0, row as u16 + 2), Print(line))?;
        }
        let footer_row = status.lines().len() as u16 + 3;
        queue!(
            stdout,
            MoveTo(0, footer_row),
            Print("[e] entry  [x] exit  [q] quit")
        )?;

        stdout.flush()
    }
}

impl Default for TerminalDashboard {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DisplaySink for TerminalDashboard {
    async fn render(&mut self, status: &DisplayStatus, frame: &Frame) {
        if let Err(e) = self.draw(status, frame) {
            warn!("Failed to draw dashboard: {}", e);
        }
    }

    async fn close(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        if let Err(e) = execute!(io::stdout(), Show, LeaveAlternateScreen) {
            warn!("Failed to restore terminal: {}", e);
        }
    }
}

impl Drop for TerminalDashboard {
    fn drop(&mut self) {
        if self.active {
            let _ = execute!(io::stdout(), Show, LeaveAlternateScreen);
        }
    }
}

/// Writes the status to the log instead of a screen
#[derive(Debug, Default)]
pub struct LogDisplay;

#[async_trait]
impl DisplaySink for LogDisplay {
    async fn render(&mut self, status: &DisplayStatus, _frame: &Frame) {
        debug!(
            mode = %status.mode,
            occupied = status.occupancy.occupied,
            vacant = status.occupancy.vacant,
            frame_id = status.frame_id,
            "{}",
            status.last_event.as_deref().unwrap_or("")
        );
    }

    async fn close(&mut self) {}
}

/// Keeps every rendered status, shared so callers can inspect it after the
/// sink is handed to the loop
#[derive(Debug, Clone, Default)]
pub struct RecordingDisplay {
    statuses: std::sync::Arc<Mutex<Vec<DisplayStatus>>>,
    closed: std::sync::Arc<Mutex<bool>>,
}

impl RecordingDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn statuses(&self) -> Vec<DisplayStatus> {
        self.statuses.lock().clone()
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.lock()
    }
}

#[async_trait]
impl DisplaySink for RecordingDisplay {
    async fn render(&mut self, status: &DisplayStatus, _frame: &Frame) {
        self.statuses.lock().push(status.clone());
    }

    async fn close(&mut self) {
        *self.closed.lock() = true;
    }
}
