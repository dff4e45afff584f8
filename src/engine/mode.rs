use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Direction the lane camera is currently watching, selected by the operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Entry,
    Exit,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Entry => f.write_str("ENTRY"),
            Mode::Exit => f.write_str("EXIT"),
        }
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "entry" | "e" => Ok(Mode::Entry),
            "exit" | "x" => Ok(Mode::Exit),
            other => Err(format!("unknown mode '{}', expected 'entry' or 'exit'", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_parsing() {
        assert_eq!("entry".parse::<Mode>().unwrap(), Mode::Entry);
        assert_eq!("EXIT".parse::<Mode>().unwrap(), Mode::Exit);
        assert_eq!(" x ".parse::<Mode>().unwrap(), Mode::Exit);
        assert!("sideways".parse::<Mode>().is_err());
    }

    #[test]
    fn test_mode_display_and_default() {
        assert_eq!(Mode::default(), Mode::Entry);
        assert_eq!(Mode::Entry.to_string(), "ENTRY");
        assert_eq!(Mode::Exit.to_string(), "EXIT");
    }
}
