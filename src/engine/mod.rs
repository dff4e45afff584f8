mod mode;
mod reconcile;

#[cfg(test)]
mod tests;

pub use mode::Mode;
pub use reconcile::{CycleReport, Decision, EngineSettings, IgnoreReason, ReconciliationEngine};
