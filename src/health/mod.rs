//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! GET {prefix}/health
//!     → report.rs (full_health_check)
//!     → checks.rs (probe upstream, cache, store concurrently)
//!     → HealthReport { status, circuit_breaker, dependencies, ... }
//! ```
//!
//! # Design Decisions
//! - Probes bypass the circuit breaker so an open circuit cannot hide a
//!   recovered provider
//! - Overall status is healthy only when every probed dependency is
//! - The store is probed only when one is configured

pub mod checks;
pub mod report;

pub use checks::{check_cache, check_store, check_upstream, DependencyStatus, HealthStatus};
pub use report::{full_health_check, HealthReport};
