//! Core Kernel - Foundational types for the billing system
//!
//! This crate provides the building blocks shared by every other crate:
//! - Money types with precise decimal arithmetic
//! - Strongly-typed identifiers for customers, products and bills
//! - Port abstractions (errors, health checks, pagination) used by store adapters

pub mod money;
pub mod identifiers;
pub mod ports;
pub mod error;

pub use money::{Money, Currency, MoneyError};
pub use identifiers::{CustomerId, ProductId, BillId, BillLineId};
pub use ports::{
    PortError, DomainPort, HealthCheckable, HealthCheckResult, AdapterHealth,
    PageRequest, Page,
};
pub use error::CoreError;
