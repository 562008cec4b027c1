/// Overwrite module - Pattern plans, random sources and the pass engine
pub mod engine;
pub mod plan;
pub mod random;

pub use engine::OverwriteEngine;
pub use plan::PassPlan;
pub use random::RandomSource;
