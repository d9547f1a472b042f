//! Middleware module
//!
//! HTTP middleware applied across routes.

pub mod logging;

pub use logging::request_logging_middleware;
