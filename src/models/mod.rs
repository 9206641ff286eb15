//! Data models for the operations feed.
//!
//! Everything here is parsed from the remote's responses and passed
//! through; this crate never constructs ledger entries itself.

pub mod operation;

pub use operation::{
    Currency, Money, Operation, OperationStatus, OperationsPage, ResourceRef,
};
