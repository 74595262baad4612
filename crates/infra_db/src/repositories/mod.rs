//! Repository implementations for domain entities
//!
//! Repositories encapsulate SQL queries and map between database rows and
//! plain row types. Multi-statement writes run in a transaction; status
//! changes are compare-and-set on the stored status.

pub mod application;

pub use application::ApplicationRepository;
