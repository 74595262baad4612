//! Core Kernel - Foundational types shared by the onboarding crates
//!
//! This crate provides the building blocks used across the workspace:
//! - Strongly-typed identifiers for applications and companies
//! - The kernel error type
//! - Port infrastructure for the hexagonal (ports and adapters) layout

pub mod identifiers;
pub mod error;
pub mod ports;

pub use identifiers::{ApplicationId, CompanyId};
pub use error::CoreError;
pub use ports::{
    PortError, DomainPort, HealthCheckable, HealthCheckResult, AdapterHealth,
    OperationMetadata,
};
