use std::fmt;

/// Parts of the lane the orchestrator starts and stops
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Component {
    /// The plate logs
    Storage,
    Source,
    Display,
    Keyboard,
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Component::Storage => f.write_str("storage"),
            Component::Source => f.write_str("source"),
            Component::Display => f.write_str("display"),
            Component::Keyboard => f.write_str("keyboard"),
        }
    }
}

/// Component lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentState {
    Stopped,
    Starting,
    Running,
    Stopping,
    Failed,
}

/// Why the control loop stopped
#[derive(Debug, Clone, PartialEq)]
pub enum ShutdownReason {
    /// The operator pressed q or Esc
    Operator,
    Signal(String),
    /// The frame source has nothing more to give
    SourceExhausted,
    Error(String),
}

impl ShutdownReason {
    pub fn exit_code(&self) -> i32 {
        match self {
            ShutdownReason::Error(_) => 1,
            _ => 0,
        }
    }
}
