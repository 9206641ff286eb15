//! Filtered, paginated reads over the live session.
//!
//! The client delivers one logical request over two independent paths: a
//! direct call carrying the artifact's credentials, and an in-context
//! relay through the login collaborator as the fallback.

pub mod client;
pub mod filter;

pub use client::OperationsClient;
pub use filter::{FilterError, OperationKind, OperationsFilter};
