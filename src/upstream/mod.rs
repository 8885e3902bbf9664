//! Upstream rate provider subsystem.
//!
//! # Data Flow
//! ```text
//! RateService
//!     → CircuitBreaker::call
//!     → client.rs (HTTP GET latest or range, timeout, token)
//!     → types.rs (raw bmx.series[].datos[] → NormalizedSeries)
//! ```
//!
//! # Design Decisions
//! - Raw provider shapes never leave this module
//! - "N/E" observations are dropped; any other malformed value fails the call
//! - The only retry is the empty-latest fallback to a short trailing range

pub mod client;
pub mod types;

pub use client::{BanxicoClient, SeriesSource};
pub use types::SeriesResponse;
