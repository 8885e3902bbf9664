//! USD/MXN rate domain.
//!
//! # Data Flow
//! ```text
//! HTTP handler / CLI
//!     → service.rs (cache-aside orchestration)
//!     → calendar.rs (business-day filter, injectable clock)
//!     → types.rs (ExchangeRatePoint, DateRange, NormalizedSeries)
//! ```

pub mod calendar;
pub mod error;
pub mod service;
pub mod types;

pub use calendar::{Clock, FixedClock, SystemClock};
pub use error::{RateError, RateResult};
pub use service::RateService;
pub use types::{DateRange, ExchangeRatePoint, NormalizedSeries};
