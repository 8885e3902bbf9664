//! HTTP boundary subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (request ID, query parsing)
//!     → rates.rs / health.rs (handlers over RateService)
//!     → response.rs (error mapping, JSON envelope)
//!     → Send to client
//! ```

pub mod health;
pub mod rates;
pub mod request;
pub mod response;
pub mod server;

pub use request::{RequestId, X_REQUEST_ID};
pub use response::ApiError;
pub use server::{AppState, HttpServer};
