//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request to provider:
//!     → circuit_breaker.rs (fail fast while open, count failures while closed)
//!     → upstream client (its own request timeout)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - No retries beyond the provider's empty-latest fallback
//! - Circuit breaker prevents hammering a provider that is down

pub mod circuit_breaker;

pub use circuit_breaker::{BreakerError, CircuitBreaker, CircuitState};
