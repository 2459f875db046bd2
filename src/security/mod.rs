//! Security Module
//!
//! Credentials for calls made on the user's behalf.

pub mod token;

pub use token::{RefreshingTokenSource, StaticToken, TokenSource};
