//! sberops — keep a SberBank Online web session alive indefinitely and
//! read the account operations feed through it.
//!
//! The remote's native session expires after minutes of inactivity. This
//! crate captures the session's transport credentials once, through an
//! interactive login driven by an external [`BrowserSession`]
//! collaborator, then holds the session open with two concurrent
//! background strategies while serving filtered, paginated reads against
//! whatever credential snapshot is currently valid.
//!
//! ```no_run
//! use std::sync::Arc;
//! use sberops::{Config, OperationKind, OperationsFilter, SessionManager};
//!
//! # async fn example(browser: Arc<dyn sberops::BrowserSession>) -> sberops::Result<()> {
//! let manager = SessionManager::connect(Config::default(), browser).await?;
//!
//! let filter = OperationsFilter {
//!     kind: Some(OperationKind::Income),
//!     from: Some("01.02.2025T00:00:00".to_string()),
//!     to: Some("15.02.2025T23:59:59".to_string()),
//!     ..OperationsFilter::default()
//! };
//!
//! let mut page = manager.operations(&filter).await?;
//! while !page.is_empty() {
//!     for operation in &page.operations {
//!         println!("{}: {:?}", operation.id, operation.description);
//!     }
//!     let next = OperationsFilter { offset: page.next_offset(), ..filter.clone() };
//!     page = manager.operations(&next).await?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod auth;
pub mod browser;
pub mod config;
pub mod error;
pub mod manager;
pub mod models;
pub mod output;
pub mod session;
pub mod store;

pub use api::{FilterError, OperationKind, OperationsClient, OperationsFilter};
pub use auth::{LoginStage, Validity};
pub use browser::{BrowserError, BrowserSession, CapturedRequest};
pub use config::{Config, Endpoints};
pub use error::{Error, Result};
pub use manager::SessionManager;
pub use models::{Operation, OperationsPage};
pub use output::{OperationsTable, OperationsView, OutputFormat};
pub use session::{KeepAlive, KeepAliveConfig, SessionHandle, SessionState};
pub use store::{ArtifactStore, RoutingIds, SessionArtifact, StoreError};
