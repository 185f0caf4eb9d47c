//! Keyring backend implementations
//!
//! - EnvKeyring: private keys read from environment variables
//! - MemoryKeyring: in-memory storage (for testing)

mod env;
mod memory;

pub use env::{env_var_for, EnvKeyring};
pub use memory::MemoryKeyring;
