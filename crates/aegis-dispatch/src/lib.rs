//! Core library for the venue-safety responder dispatch service.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod telemetry;
