/// Shred module - Per-target state machine, directory walker and run summary
pub mod orchestrator;
pub mod summary;
pub mod target;

pub use orchestrator::Shredder;
