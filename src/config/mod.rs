/// Configuration module - Build and validate the shredder configuration
pub mod schema;
pub mod loader;

pub use schema::ShredConfig;
pub use loader::load_config;
