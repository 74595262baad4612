//! Domain Adapters
//!
//! Adapter implementations for domain ports, connecting domain interfaces to
//! the PostgreSQL database layer.
//!
//! Each adapter implements the domain's port trait, translates between domain
//! models and database rows, and uses the repository layer for queries.

pub mod application;

pub use application::PostgresApplicationStore;
