pub mod backend;
pub mod cli;
pub mod data;
pub mod error;
pub mod executor;
pub mod oracle;
pub mod orchestrator;
pub mod plan;
pub mod report;
pub mod resolve;
pub mod trace;
pub mod tree;
