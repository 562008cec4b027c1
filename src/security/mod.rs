/// Security module - Permission negotiation and obfuscated deletion
pub mod destruct;
pub mod permissions;

pub use destruct::ObfuscatedDeleter;
pub use permissions::PermissionNegotiator;
