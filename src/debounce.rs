use crate::plate::PlateNumber;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::trace;

/// Independent debounce scopes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Entry,
    Exit,
    /// Only used when unmatched exits are debounced as well
    Fishy,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Entry => f.write_str("entry"),
            Direction::Exit => f.write_str("exit"),
            Direction::Fishy => f.write_str("fishy"),
        }
    }
}

/// In-memory record of when each plate was last accepted per direction.
///
/// This only stops a stationary vehicle from being logged on every frame.
/// It is not persisted; the durable logs decide whether a plate was seen.
#[derive(Debug, Default)]
pub struct DebounceTracker {
    last_accepted: HashMap<Direction, HashMap<PlateNumber, DateTime<Utc>>>,
}

impl DebounceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `plate` was accepted in `direction` no more than `window` before `now`
    pub fn should_suppress(
        &self,
        direction: Direction,
        plate: &PlateNumber,
        now: DateTime<Utc>,
        window: Duration,
    ) -> bool {
        let Some(last) = self
            .last_accepted
            .get(&direction)
            .and_then(|plates| plates.get(plate))
        else {
            return false;
        };

        // A clock that stepped backwards still counts as inside the window
        let suppressed = now.signed_duration_since(*last) <= window;
        if suppressed {
            trace!("Debounced {} plate {} (last accepted {})", direction, plate, last);
        }
        suppressed
    }

    pub fn mark_accepted(&mut self, direction: Direction, plate: &PlateNumber, now: DateTime<Utc>) {
        self.last_accepted
            .entry(direction)
            .or_default()
            .insert(plate.clone(), now);
    }

    pub fn len(&self) -> usize {
        self.last_accepted.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.last_accepted.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plate::plate;
    use chrono::TimeZone;

    fn at(seconds: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + seconds, 0).unwrap()
    }

    #[test]
    fn test_unknown_plate_never_suppressed() {
        let tracker = DebounceTracker::new();
        assert!(!tracker.should_suppress(
            Direction::Entry,
            &plate("MH12AB1234"),
            at(0),
            Duration::seconds(3)
        ));
    }

    #[test]
    fn test_window_boundaries() {
        let mut tracker = DebounceTracker::new();
        let p = plate("MH12AB1234");
        tracker.mark_accepted(Direction::Entry, &p, at(0));

        assert!(tracker.should_suppress(Direction::Entry, &p, at(1), Duration::seconds(3)));
        assert!(tracker.should_suppress(Direction::Entry, &p, at(3), Duration::seconds(3)));
        assert!(!tracker.should_suppress(Direction::Entry, &p, at(4), Duration::seconds(3)));
    }

    #[test]
    fn test_directions_are_independent() {
        let mut tracker = DebounceTracker::new();
        let p = plate("MH12AB1234");
        tracker.mark_accepted(Direction::Entry, &p, at(0));

        assert!(!tracker.should_suppress(Direction::Exit, &p, at(1), Duration::seconds(3)));
        assert!(!tracker.should_suppress(Direction::Fishy, &p, at(1), Duration::seconds(3)));
    }

    #[test]
    fn test_mark_overwrites_and_clock_skew() {
        let mut tracker = DebounceTracker::new();
        let p = plate("MH12AB1234");
        tracker.mark_accepted(Direction::Exit, &p, at(0));
        tracker.mark_accepted(Direction::Exit, &p, at(10));

        assert!(tracker.should_suppress(Direction::Exit, &p, at(12), Duration::seconds(3)));
        assert!(tracker.should_suppress(Direction::Exit, &p, at(5), Duration::seconds(3)));
        assert_eq!(tracker.len(), 1);

        tracker.clear();
        assert!(tracker.is_empty());
    }
}
