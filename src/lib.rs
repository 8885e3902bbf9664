//! USD/MXN exchange rate service library.

pub mod cache;
pub mod config;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod rates;
pub mod resilience;
pub mod store;
pub mod upstream;

pub use config::ServiceConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use rates::RateService;
