//! drive_reconcile - idempotent uploads and folder traversal on Google Drive.
//!
//! The library is written against the [`RemoteStore`] trait:
//! - [`Reconciler`] uploads a file, updating an existing object with the same
//!   name in the target folder instead of adding a duplicate
//! - [`FolderWalker`] lists child folders (optionally recursively) and files,
//!   and creates folders
//! - [`Downloader`] streams an object's content with progress
//!
//! [`DriveClient`] implements the store over the Drive v3 REST API.
//!
//! # Example
//!
//! ```no_run
//! use drive_reconcile::{Authenticator, DriveClient, Reconciler, UploadRequest};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let auth = Authenticator::from_env()?;
//!     let client = DriveClient::new(auth);
//!
//!     let request = UploadRequest::from_path("report.csv", "folder-id");
//!     let outcome = Reconciler::new(&client).reconcile_upload(&request).await?;
//!     println!("{} {}", outcome.action, outcome.remote_id);
//!
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod error;
pub mod models;
pub mod reconcile;
pub mod store;
pub mod transfer;
pub mod url_parser;
pub mod walker;

pub use auth::Authenticator;
pub use client::DriveClient;
pub use error::{DriveError, ErrorKind, Result};
pub use models::{RemoteEntry, UploadAction, UploadOutcome};
pub use reconcile::{Reconciler, UploadContent, UploadRequest};
pub use store::RemoteStore;
pub use transfer::Downloader;
pub use url_parser::extract_id;
pub use walker::{FolderWalker, TraversalMode};
