mod orchestrator;
mod runtime;
mod shutdown;
mod startup;
mod state;
mod types;


pub use orchestrator::{PlatecamOrchestrator, PlatecamOrchestratorBuilder};
pub use types::{Component, ComponentState, ShutdownReason};
