//! CLI command implementations.

mod agent;
mod config;
mod doctor;
mod notes;
mod serve;

pub use agent::run_agent;
pub use config::run_config;
pub use doctor::run_doctor;
pub use notes::run_notes;
pub use serve::run_serve;
