pub mod artifacts;
pub mod orchestrator;
pub mod state;
