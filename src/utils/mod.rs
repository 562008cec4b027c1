/// Utilities - OS capability shims and principal detection
pub mod platform;
pub mod principal;

pub use platform::{NativeFileOps, PlatformFileOps, optimal_block_size};
