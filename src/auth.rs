//! Credential secrets and access-token models.

pub mod access_token;
pub mod secret;

pub use access_token::*;
pub use secret::*;
