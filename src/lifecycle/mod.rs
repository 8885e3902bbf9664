//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Config → Clock → Upstream client → Cache → Store → Breaker → RateService
//!
//! Shutdown (shutdown.rs):
//!     SIGTERM/SIGINT → trigger → Stop accepting → Drain connections → Exit
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then dependencies, then listeners
//! - Nothing at startup dials Redis or the provider; a cold dependency
//!   shows up in health checks, not as a boot failure

pub mod shutdown;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{build_service, StartupError};
