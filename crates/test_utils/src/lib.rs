//! Test Utilities Crate
//!
//! Shared fixtures, builders and helpers for the onboarding test suites.
//!
//! # Modules
//!
//! - `fixtures`: valid identifiers, documents and payloads
//! - `builders`: payload and application builders, in-memory service harness
//! - `database`: PostgreSQL test containers with migrations applied
//! - `assertions`: assertion helpers for onboarding errors and lifecycles
//! - `generators`: property-based test data generators

pub mod assertions;
pub mod builders;
pub mod database;
pub mod fixtures;
pub mod generators;

pub use assertions::*;
pub use builders::*;
pub use database::*;
pub use fixtures::*;
pub use generators::*;
