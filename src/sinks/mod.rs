//! Operator-facing outputs: audible alerts and the status display.
//!
//! Both sinks are fire-and-forget. A sink that cannot reach its device logs
//! the problem and carries on; the control loop never stops because of one.

mod alert;
mod display;

pub use alert::{AlertDirective, AlertSink, NullAlert, RecordingAlert, TerminalBellAlert};
pub use display::{DisplaySink, DisplayStatus, LogDisplay, RecordingDisplay, TerminalDashboard};
