use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::trace;

/// Region prefix, series digits, one or two series letters, four digit suffix
pub const DEFAULT_PLATE_PATTERN: &str = "[A-Z]{2}[0-9]{2}[A-Z]{1,2}[0-9]{4}";

/// A license plate string that has passed the format grammar
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlateNumber(String);

impl PlateNumber {
    /// Wrap a plate read back from a durable log. Log rows are trusted as
    /// written, including rows that were edited by hand.
    pub(crate) fn from_log_field(field: &str) -> Self {
        Self(field.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for PlateNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PlateNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Compiled plate grammar used to pull plate candidates out of OCR text
#[derive(Debug, Clone)]
pub struct PlateFormat {
    pattern: Regex,
    anchored: Regex,
}

impl PlateFormat {
    /// Compile a plate grammar from a regular expression
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
            anchored: Regex::new(&format!("^(?:{})$", pattern))?,
        })
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    /// Extract every plate candidate from raw OCR text, in order of appearance.
    ///
    /// The text is reduced to its alphanumeric characters and upper-cased
    /// before matching, so line breaks and punctuation between the plate
    /// fields do not split a plate. Repeated plates are kept.
    pub fn extract(&self, text: &str) -> Vec<PlateNumber> {
        let cleaned: String = text
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_uppercase())
            .collect();

        let plates: Vec<PlateNumber> = self
            .pattern
            .find_iter(&cleaned)
            .map(|m| PlateNumber(m.as_str().to_string()))
            .collect();

        trace!("Extracted {} plate candidate(s) from {:?}", plates.len(), cleaned);
        plates
    }

    /// Check a complete string against the grammar without any cleanup
    pub fn validate(&self, candidate: &str) -> Option<PlateNumber> {
        if self.anchored.is_match(candidate) {
            Some(PlateNumber(candidate.to_string()))
        } else {
            None
        }
    }
}

impl Default for PlateFormat {
    fn default() -> Self {
        // The built-in pattern is a compile-time constant known to be valid
        Self::new(DEFAULT_PLATE_PATTERN).unwrap_or_else(|e| {
            unreachable!("default plate pattern failed to compile: {}", e)
        })
    }
}

#[cfg(test)]
pub(crate) fn plate(s: &str) -> PlateNumber {
    PlateNumber(s.to_string())
}
