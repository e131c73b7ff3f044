//! Common types shared by the hosted-auth crates

mod error;
mod secret;

pub use error::{Error, Result};
pub use secret::Secret;
