//! Bundled adapters for the onboarding ports
//!
//! # Available Adapters
//!
//! - **LocalFileStore**: writes documents under a local directory
//! - **LoggingNotifier**: records submissions as structured log events
//! - **FormatOnlyBankVerifier**: checks account formats without contacting a bank
//!
//! The PostgreSQL store lives in `infra_db`. In-memory test doubles are in
//! [`crate::ports::mock`].
//!
//! ```rust,ignore
//! let files: Arc<dyn FileTransfer> =
//!     Arc::new(LocalFileStore::new("./uploads", "http://localhost:8080/files"));
//! ```

pub mod bank;
pub mod local_files;
pub mod notifier;

pub use bank::FormatOnlyBankVerifier;
pub use local_files::LocalFileStore;
pub use notifier::LoggingNotifier;
