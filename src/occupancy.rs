use serde::{Deserialize, Serialize};

/// Derived parking lot occupancy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occupancy {
    pub occupied: usize,
    pub vacant: usize,
    pub total_slots: usize,
}

impl Occupancy {
    /// Compute occupancy from entry and exit counts.
    ///
    /// Both results are clamped at zero, so an exit log that is larger than
    /// the entry log (or more vehicles than slots) never goes negative.
    pub fn compute(entry_count: usize, exit_count: usize, total_slots: usize) -> Self {
        let occupied = entry_count.saturating_sub(exit_count);
        let vacant = total_slots.saturating_sub(occupied);
        Self {
            occupied,
            vacant,
            total_slots,
        }
    }

    pub fn is_full(&self) -> bool {
        self.vacant == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consistent_counts() {
        let occupancy = Occupancy::compute(12, 5, 30);
        assert_eq!(occupancy.occupied, 7);
        assert_eq!(occupancy.vacant, 23);
        assert!(!occupancy.is_full());
    }

    #[test]
    fn test_more_exits_than_entries_clamps() {
        let occupancy = Occupancy::compute(5, 9, 30);
        assert_eq!(occupancy.occupied, 0);
        assert_eq!(occupancy.vacant, 30);
    }

    #[test]
    fn test_overfull_lot_clamps_vacant() {
        let occupancy = Occupancy::compute(45, 5, 30);
        assert_eq!(occupancy.occupied, 40);
        assert_eq!(occupancy.vacant, 0);
        assert!(occupancy.is_full());
    }

    #[test]
    fn test_empty_lot() {
        let occupancy = Occupancy::compute(0, 0, 30);
        assert_eq!(occupancy, Occupancy { occupied: 0, vacant: 30, total_slots: 30 });
    }
}
