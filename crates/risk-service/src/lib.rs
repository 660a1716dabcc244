//! HTTP adapter for booking cancellation risk scoring

pub mod api;
pub mod config;
